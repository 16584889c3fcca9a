use std::collections::HashMap;

use log::info;

use crate::io::gpio::{GPIOError, GPIOManager, GPIOMode, GPIOState};

/// Pins held in memory, unset pins read as high.
#[derive(Default)]
pub struct Dummy {
    map: HashMap<usize, GPIOState>,
}

impl Dummy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GPIOManager for Dummy {
    fn setup(&mut self, _pin: usize, _mode: &GPIOMode) -> Result<(), GPIOError> {
        Ok(())
    }

    fn set_pin(&mut self, pin_id: usize, state: &GPIOState) -> Result<(), GPIOError> {
        info!("Setting pin {} to {:?}", pin_id, state);
        self.map.insert(pin_id, *state);
        Ok(())
    }

    fn get_pin(&self, pin: usize) -> Result<GPIOState, GPIOError> {
        Ok(self.map.get(&pin).copied().unwrap_or(GPIOState::High))
    }
}
