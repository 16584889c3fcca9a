use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::events::{ListenerId, Listeners};
use crate::io::actuator::{ActuatorControl, ActuatorError};
use crate::io::dummy::to_on_off;

/// A target below zero means the heater should be off.
pub const OFF_TARGET: f32 = -1.0;

/// Emitted when the heater is toggled or the target changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub toggled: bool,
    pub enabled: bool,
    pub target: f32,
    pub at: DateTime<Utc>,
}

/// Keeps the room at the target temperature by switching the heater on and off.
///
/// The heater runs while the temperature is more than `hysteresis` below the target,
/// and while the temperature is unknown.
pub struct HeaterController {
    hysteresis: f32,
    actuator: Box<dyn ActuatorControl>,
    actuator_timeout: Duration,
    target: f32,
    current: Option<f32>,
    enabled: bool,
    listeners: Listeners<StatusChange>,
}

impl HeaterController {
    pub fn new(hysteresis: f32, actuator: Box<dyn ActuatorControl>, actuator_timeout: Duration) -> Self {
        Self {
            hysteresis,
            actuator,
            actuator_timeout,
            target: OFF_TARGET,
            current: None,
            enabled: false,
            listeners: Listeners::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StatusChange) + Send + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_target(&self) -> f32 {
        self.target
    }

    pub fn get_current(&self) -> Option<f32> {
        self.current
    }

    /// Pick up the actuator's actual state, e.g. after a restart.
    pub async fn sync_with_actuator(&mut self) -> Result<bool, ActuatorError> {
        let enabled = tokio::time::timeout(self.actuator_timeout, self.actuator.get_enabled())
            .await
            .map_err(|_| ActuatorError::Timeout(self.actuator_timeout))??;
        if enabled != self.enabled {
            info!("Heater found {}", to_on_off(enabled));
        }
        self.enabled = enabled;
        Ok(enabled)
    }

    fn should_heat(&self, target: f32, current: Option<f32>) -> bool {
        if target < 0.0 {
            return false;
        }
        match current {
            None => true,
            Some(current) => target - self.hysteresis > current,
        }
    }

    /// Call whenever a new reading is available or the target changes.
    /// The heater state is only recorded once the actuator has confirmed it.
    pub async fn update_current_status(&mut self, target: f32, current: Option<f32>, now: DateTime<Utc>) -> Result<(), ActuatorError> {
        let target_changed = self.target != target;
        let should_be_enabled = self.should_heat(target, current);
        let toggled = self.enabled != should_be_enabled;
        self.current = current;

        if toggled {
            debug!(
                "Switching heater {} (target {:.1}, current {:?})",
                to_on_off(should_be_enabled),
                target,
                current
            );
            self.command(should_be_enabled).await?;
            self.enabled = should_be_enabled;
        }
        self.target = target;

        if toggled || target_changed {
            let change = StatusChange {
                toggled,
                enabled: self.enabled,
                target,
                at: now,
            };
            self.listeners.notify(&change);
        }
        Ok(())
    }

    async fn command(&mut self, enabled: bool) -> Result<(), ActuatorError> {
        match tokio::time::timeout(self.actuator_timeout, self.actuator.set_enabled(enabled)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Failed to turn heater {}: {}", to_on_off(enabled), e);
                Err(e)
            }
            Err(_) => {
                error!("Timed out turning heater {}", to_on_off(enabled));
                Err(ActuatorError::Timeout(self.actuator_timeout))
            }
        }
    }

    /// Switch the heater off regardless of the recorded state.
    pub async fn shutdown(&mut self) -> Result<(), ActuatorError> {
        if let Err(e) = self.command(false).await {
            warn!("Heater may still be on!");
            return Err(e);
        }
        self.enabled = false;
        Ok(())
    }
}
