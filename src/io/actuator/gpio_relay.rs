use async_trait::async_trait;
use log::debug;

use crate::io::dummy::to_on_off;
use crate::io::gpio::{GPIOManager, GPIOMode, GPIOState};

use super::{ActuatorControl, ActuatorError};

/// A relay wired to a single GPIO pin.
pub struct GpioRelay<G: GPIOManager> {
    gpio: G,
    pin: usize,
    active_low: bool,
}

impl<G: GPIOManager> GpioRelay<G> {
    pub fn new(mut gpio: G, pin: usize, active_low: bool) -> Result<Self, ActuatorError> {
        gpio.setup(pin, &GPIOMode::Output)?;
        Ok(Self { gpio, pin, active_low })
    }

    fn state_for(&self, enabled: bool) -> GPIOState {
        match enabled != self.active_low {
            true => GPIOState::High,
            false => GPIOState::Low,
        }
    }
}

#[async_trait]
impl<G: GPIOManager> ActuatorControl for GpioRelay<G> {
    async fn set_enabled(&mut self, enabled: bool) -> Result<(), ActuatorError> {
        debug!("Turning heater relay (pin {}) {}", self.pin, to_on_off(enabled));
        let state = self.state_for(enabled);
        self.gpio.set_pin(self.pin, &state)?;
        Ok(())
    }

    async fn get_enabled(&mut self) -> Result<bool, ActuatorError> {
        let state = self.gpio.get_pin(self.pin)?;
        Ok(state == self.state_for(true))
    }
}
