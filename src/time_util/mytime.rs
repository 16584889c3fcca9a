use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

pub trait TimeProvider {
    fn get_utc_time(&self) -> DateTime<Utc>;

    fn get_local_time(&self) -> DateTime<Local>;
}

#[derive(Default, Clone, Copy)]
pub struct RealTimeProvider {}

impl TimeProvider for RealTimeProvider {
    fn get_utc_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn get_local_time(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A time provider that only moves when told to.
/// Cloning it shares the underlying clock, so a test can advance time
/// while a running loop observes it.
#[derive(Debug, Clone)]
pub struct DummyTimeProvider {
    utc_time: Arc<Mutex<DateTime<Utc>>>,
}

impl DummyTimeProvider {
    pub fn new(utc_time: DateTime<Utc>) -> Self {
        Self {
            utc_time: Arc::new(Mutex::new(utc_time)),
        }
    }

    /// Change the time returned by this dummy time provider.
    pub fn set(&self, utc_time: DateTime<Utc>) {
        *self.lock() = utc_time;
    }

    /// Move the time returned by this dummy time provider forward by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid time.
        self.utc_time.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TimeProvider for DummyTimeProvider {
    fn get_utc_time(&self) -> DateTime<Utc> {
        *self.lock()
    }

    fn get_local_time(&self) -> DateTime<Local> {
        Local.from_utc_datetime(&self.lock().naive_utc())
    }
}
