use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::brain::orchestrator::HeatingStatus;
use crate::schedule::ScheduleStore;

use super::error::AppError;

/// Shared with every handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<ScheduleStore>>,
    status: watch::Receiver<HeatingStatus>,
}

impl AppState {
    pub fn new(store: Arc<Mutex<ScheduleStore>>, status: watch::Receiver<HeatingStatus>) -> Self {
        Self { store, status }
    }

    pub fn lock_store(&self) -> Result<MutexGuard<'_, ScheduleStore>, AppError> {
        self.store.lock().map_err(|_| AppError::Internal("schedule store lock poisoned".to_owned()))
    }

    pub fn current_status(&self) -> HeatingStatus {
        self.status.borrow().clone()
    }
}
