use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::io::gpio::GPIOError;

pub mod dummy;
pub mod gpio_relay;
pub mod http_plug;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("gpio error: {0}")]
    Gpio(#[from] GPIOError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("actuator did not respond within {0:?}")]
    Timeout(Duration),
    #[error("unexpected actuator response: {0}")]
    UnexpectedResponse(String),
    #[error("actuator unavailable: {0}")]
    Unavailable(String),
}

/// Switches the heater.
#[async_trait]
pub trait ActuatorControl: Send {
    async fn set_enabled(&mut self, enabled: bool) -> Result<(), ActuatorError>;

    async fn get_enabled(&mut self) -> Result<bool, ActuatorError>;
}
