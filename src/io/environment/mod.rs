use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::events::{ListenerId, Listeners};
use crate::time_util::mytime::TimeProvider;

pub mod command;
pub mod dummy;
pub mod file;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub temperature: f32,
    pub humidity: f32,
    #[serde(default)]
    pub outside_temperature: Option<f32>,
}

impl Environment {
    pub fn new(temperature: f32, humidity: f32, outside_temperature: Option<f32>) -> Self {
        Self {
            temperature,
            humidity,
            outside_temperature,
        }
    }
}

/// The result of polling the sensors. A missing reading means the temperature is unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentUpdate {
    pub reading: Option<Environment>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("io error reading sensor: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse sensor output: {0}")]
    Parse(String),
    #[error("sensor data is stale: {0}")]
    Stale(String),
    #[error("sensor did not respond within {0:?}")]
    Timeout(Duration),
    #[error("no reading available")]
    NoReading,
}

#[async_trait]
pub trait EnvironmentSource: Send {
    async fn read(&mut self) -> Result<Environment, SensorError>;
}

/// Polls an [EnvironmentSource] and fans the result out to subscribers.
pub struct EnvironmentProvider {
    source: Box<dyn EnvironmentSource>,
    read_timeout: Duration,
    latest: Option<EnvironmentUpdate>,
    listeners: Listeners<EnvironmentUpdate>,
}

impl EnvironmentProvider {
    pub fn new(source: Box<dyn EnvironmentSource>, read_timeout: Duration) -> Self {
        Self {
            source,
            read_timeout,
            latest: None,
            listeners: Listeners::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EnvironmentUpdate) + Send + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    /// The most recent successful reading.
    pub fn latest(&self) -> Option<&EnvironmentUpdate> {
        self.latest.as_ref()
    }

    /// Read the sensors once and inform the subscribers.
    pub async fn update(&mut self, now: DateTime<Utc>) -> EnvironmentUpdate {
        let reading = match tokio::time::timeout(self.read_timeout, self.source.read()).await {
            Ok(Ok(environment)) => {
                debug!(
                    "Temperature {:.1}, humidity {:.1}, outside {:?}",
                    environment.temperature, environment.humidity, environment.outside_temperature
                );
                Some(environment)
            }
            Ok(Err(e)) => {
                warn!("Failed to read environment, temperature unknown: {}", e);
                None
            }
            Err(_) => {
                warn!("Failed to read environment, temperature unknown: {}", SensorError::Timeout(self.read_timeout));
                None
            }
        };
        let update = EnvironmentUpdate { reading, at: now };
        if update.reading.is_some() {
            self.latest = Some(update.clone());
        }
        self.listeners.notify(&update);
        update
    }

    /// Poll forever at the given interval.
    /// Starts straight away unless a reading has already been taken.
    pub async fn run(mut self, poll_interval: Duration, time_provider: impl TimeProvider + Send + 'static) {
        let first_poll = match self.latest {
            Some(_) => Instant::now() + poll_interval,
            None => Instant::now(),
        };
        let mut interval = interval_at(first_poll, poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.update(time_provider.get_utc_time()).await;
        }
    }
}
