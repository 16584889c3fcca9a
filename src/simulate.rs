use std::time::Duration;

use log::debug;
use tokio::runtime::Runtime;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::io::actuator::dummy::{CommandLog, DummyActuator};
use crate::io::dummy::DummyIO;
use crate::io::environment::dummy::{Dummy, ModifyState};
use crate::io::environment::Environment;
use crate::logging::LoggingHandle;
use crate::time_util::mytime::RealTimeProvider;

const SIMULATION_CONFIG: &str = r#"
[environment]
poll_interval_secs = 5

[environment.source]
type = "Dummy"

[actuator]
type = "Dummy"

[storage]
schedule_file = "simulation/schedule.json"
training_file = "simulation/training.jsonl"
environment_history_file = "simulation/environment.csv"
status_history_file = "simulation/status.csv"

[web]
bind = "127.0.0.1:8080"
"#;

const STEP: Duration = Duration::from_secs(5);
const START_TEMPERATURE: f32 = 16.0;
/// Degrees per step.
const HEATING_RATE: f32 = 0.05;
const COOLING_RATE: f32 = 0.01;

/// Runs the whole pipeline against a simulated room that warms up while the heater is on.
pub fn simulate(rt: Runtime, logging_handle: LoggingHandle<EnvFilter, impl Subscriber + Send + Sync + 'static>) {
    debug!("{}", SIMULATION_CONFIG);
    let config: Config = toml::from_str(SIMULATION_CONFIG).expect("Failed to deserialize config");

    let (source, environment_handle) = Dummy::create(&());
    let commands = CommandLog::default();
    let (actuator, _actuator_handle) = DummyActuator::create(&commands);

    rt.spawn(async move {
        let mut temperature = START_TEMPERATURE;
        let mut interval = tokio::time::interval(STEP);
        let mut step = 0usize;
        loop {
            interval.tick().await;
            step += 1;

            let heating = commands
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .last()
                .copied()
                .unwrap_or(false);
            temperature += if heating { HEATING_RATE } else { -COOLING_RATE };

            let message = match step % 120 {
                100 => {
                    println!("## Sensor failing, heating should fail open");
                    ModifyState::Fail
                }
                101..=105 => ModifyState::Fail,
                106 => {
                    println!("## Sensor back at {:.2}", temperature);
                    ModifyState::SetEnvironment(Environment::new(temperature, 50.0, Some(4.0)))
                }
                _ => ModifyState::SetEnvironment(Environment::new(temperature, 50.0, Some(4.0))),
            };
            if environment_handle.send(message).is_err() {
                break;
            }
        }
    });

    crate::main_loop(
        &config,
        rt,
        Box::new(source),
        Box::new(actuator),
        RealTimeProvider::default(),
        logging_handle,
    );
}
