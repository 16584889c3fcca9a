use std::sync::mpsc::Receiver;

use async_trait::async_trait;

use crate::io::dummy::{read_all, DummyIO};

use super::{Environment, EnvironmentSource, SensorError};

pub enum ModifyState {
    SetEnvironment(Environment),
    SetTemperature(f32),
    Fail,
}

/// An environment source whose readings are set through its handle.
pub struct Dummy {
    receiver: Receiver<ModifyState>,
    environment: Option<Environment>,
    failing: bool,
}

impl DummyIO for Dummy {
    type MessageType = ModifyState;
    type Config = ();

    fn new(receiver: Receiver<Self::MessageType>, _config: &Self::Config) -> Self {
        Dummy {
            receiver,
            environment: None,
            failing: false,
        }
    }
}

impl Dummy {
    fn update_state(&mut self) {
        let environment = &mut self.environment;
        let failing = &mut self.failing;
        read_all(&self.receiver, |message| match message {
            ModifyState::SetEnvironment(env) => {
                *environment = Some(env);
                *failing = false;
            }
            ModifyState::SetTemperature(temperature) => {
                let env = environment.get_or_insert_with(|| Environment::new(temperature, 50.0, None));
                env.temperature = temperature;
                *failing = false;
            }
            ModifyState::Fail => *failing = true,
        });
    }
}

#[async_trait]
impl EnvironmentSource for Dummy {
    async fn read(&mut self) -> Result<Environment, SensorError> {
        self.update_state();
        if self.failing {
            return Err(SensorError::NoReading);
        }
        self.environment.clone().ok_or(SensorError::NoReading)
    }
}
