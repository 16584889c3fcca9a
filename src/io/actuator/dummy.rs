use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::info;

use crate::io::dummy::{read_all, to_on_off, DummyIO};

use super::{ActuatorControl, ActuatorError};

pub enum ModifyState {
    /// Fail every command until told otherwise.
    SetFailing(bool),
}

/// Commands sent to a [DummyActuator], shared so tests can inspect them.
pub type CommandLog = Arc<Mutex<Vec<bool>>>;

/// An actuator that only remembers what it was told.
pub struct DummyActuator {
    receiver: Receiver<ModifyState>,
    enabled: bool,
    failing: bool,
    commands: CommandLog,
}

impl DummyIO for DummyActuator {
    type MessageType = ModifyState;
    type Config = CommandLog;

    fn new(receiver: Receiver<Self::MessageType>, config: &Self::Config) -> Self {
        Self {
            receiver,
            enabled: false,
            failing: false,
            commands: config.clone(),
        }
    }
}

impl DummyActuator {
    fn update_state(&mut self) {
        let failing = &mut self.failing;
        read_all(&self.receiver, |message| match message {
            ModifyState::SetFailing(fail) => *failing = fail,
        });
    }
}

#[async_trait]
impl ActuatorControl for DummyActuator {
    async fn set_enabled(&mut self, enabled: bool) -> Result<(), ActuatorError> {
        self.update_state();
        if self.failing {
            return Err(ActuatorError::Unavailable("dummy actuator set to fail".to_owned()));
        }
        info!("Turning heater {}", to_on_off(enabled));
        self.enabled = enabled;
        self.commands.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(enabled);
        Ok(())
    }

    async fn get_enabled(&mut self) -> Result<bool, ActuatorError> {
        self.update_state();
        if self.failing {
            return Err(ActuatorError::Unavailable("dummy actuator set to fail".to_owned()));
        }
        Ok(self.enabled)
    }
}
