use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;

use crate::brain::orchestrator::HeatingStatus;
use crate::schedule::data::{ManualOverride, ScheduleData};

use super::error::AppError;
use super::state::AppState;

pub type HandlerResult<T> = Result<Json<T>, AppError>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OverrideRequest {
    Remove {
        remove: bool,
    },
    Set {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        temperature: f32,
    },
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> HandlerResult<HeatingStatus> {
    Ok(Json(state.current_status()))
}

/// GET /api/schedule
pub async fn get_schedule(State(state): State<AppState>) -> HandlerResult<ScheduleData> {
    Ok(Json(state.lock_store()?.get_schedule()))
}

/// POST /api/override
///
/// Sets or clears the manual override, answering with the resulting schedule.
pub async fn set_override(State(state): State<AppState>, Json(request): Json<OverrideRequest>) -> HandlerResult<ScheduleData> {
    let manual_override = match request {
        OverrideRequest::Remove { remove: true } => None,
        OverrideRequest::Remove { remove: false } => {
            return Err(AppError::BadRequest("nothing to do, expected remove to be true".to_owned()));
        }
        OverrideRequest::Set {
            start_time,
            end_time,
            temperature,
        } => Some(ManualOverride::new(start_time, end_time, temperature)?),
    };

    let mut store = state.lock_store()?;
    match &manual_override {
        Some(o) => info!("Manual override requested: {:.1} from {} to {}", o.temperature, o.start_time, o.end_time),
        None => info!("Manual override removal requested"),
    }
    store.set_manual_override(manual_override)?;
    Ok(Json(store.get_schedule()))
}
