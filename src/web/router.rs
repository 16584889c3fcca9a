use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/schedule", get(handlers::get_schedule))
        .route("/override", post(handlers::set_override));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tokio::sync::watch;
    use tower::ServiceExt;

    use super::*;
    use crate::brain::orchestrator::HeatingStatus;
    use crate::schedule::data::{ManualOverride, ScheduleData};
    use crate::schedule::zone::ScheduleZone;
    use crate::schedule::ScheduleStore;
    use crate::time_util::test_utils::utc_datetime;
    use crate::web::error::ApiError;

    fn state() -> (AppState, Arc<Mutex<ScheduleStore>>, watch::Sender<HeatingStatus>) {
        let store = Arc::new(Mutex::new(ScheduleStore::new(ScheduleData::default(), ScheduleZone::Utc).unwrap()));
        let (sender, receiver) = watch::channel(HeatingStatus::default());
        (AppState::new(store.clone(), receiver), store, sender)
    }

    fn post_override(json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/override")
            .header("content-type", "application/json")
            .body(Body::from(json.to_owned()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        let (state, _store, sender) = state();
        sender.send_modify(|status| {
            status.heater_enabled = true;
            status.evaluated_at = Some(utc_datetime(2024, 1, 8, 6, 40, 0));
        });

        let response = create_router(state)
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["heater_enabled"], true);
        assert_eq!(body["evaluated_at"], "2024-01-08T06:40:00Z");
        assert!(body["active_target"].is_null());
    }

    #[tokio::test]
    async fn test_schedule() {
        let (state, _store, _sender) = state();
        let response = create_router(state)
            .oneshot(Request::builder().uri("/api/schedule").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let schedule: ScheduleData = serde_json::from_value(body).unwrap();
        assert_eq!(schedule, ScheduleData::default());
    }

    #[tokio::test]
    async fn test_set_and_remove_override() {
        let (state, store, _sender) = state();
        let changes = Arc::new(Mutex::new(0));
        let changes_clone = changes.clone();
        store.lock().unwrap().subscribe(move |_| *changes_clone.lock().unwrap() += 1);

        let response = create_router(state.clone())
            .oneshot(post_override(
                r#"{"start_time": "2024-01-08T07:30:00Z", "end_time": "2024-01-08T09:00:00Z", "temperature": 23.5}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let expected = ManualOverride::new(utc_datetime(2024, 1, 8, 7, 30, 0), utc_datetime(2024, 1, 8, 9, 0, 0), 23.5).unwrap();
        assert_eq!(store.lock().unwrap().get_schedule().manual_override, Some(expected));

        let response = create_router(state).oneshot(post_override(r#"{"remove": true}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.lock().unwrap().get_schedule().manual_override, None);
        assert_eq!(*changes.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_override_bounds_rejected() {
        let (state, store, _sender) = state();

        let response = create_router(state)
            .oneshot(post_override(
                r#"{"start_time": "2024-01-08T09:00:00Z", "end_time": "2024-01-08T07:30:00Z", "temperature": 23.5}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(error.code, "BAD_REQUEST");
        assert_eq!(store.lock().unwrap().get_schedule().manual_override, None);
    }
}
