use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_with::serde_as;
use serde_with::DurationSeconds;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::predictor::NeighbourWeighting;
use crate::schedule::zone::ScheduleZone;
use crate::schedule::DEFAULT_LOOKAHEAD_MINS;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    environment: EnvironmentConfig,
    actuator: ActuatorConfig,
    #[serde(default)]
    control: ControlConfig,
    #[serde(default)]
    predictor: PredictorConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    schedule: ScheduleConfig,
    #[serde(default)]
    web: WebConfig,
}

impl Config {
    pub fn get_environment(&self) -> &EnvironmentConfig {
        &self.environment
    }

    pub fn get_actuator(&self) -> &ActuatorConfig {
        &self.actuator
    }

    pub fn get_control(&self) -> &ControlConfig {
        &self.control
    }

    pub fn get_predictor(&self) -> &PredictorConfig {
        &self.predictor
    }

    pub fn get_storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn get_schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn get_web(&self) -> &WebConfig {
        &self.web
    }
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ControlConfig {
    /// How far below the target the temperature may drop before heating starts.
    hysteresis: f32,
    /// How long the actuator gets to confirm a command.
    #[serde_as(as = "DurationSeconds")]
    actuator_timeout_secs: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            hysteresis: 0.3,
            actuator_timeout_secs: Duration::from_secs(10),
        }
    }
}

impl ControlConfig {
    pub fn get_hysteresis(&self) -> f32 {
        self.hysteresis
    }

    pub fn get_actuator_timeout(&self) -> &Duration {
        &self.actuator_timeout_secs
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct PredictorConfig {
    /// Number of nearest training items a prediction is based on.
    neighbours: usize,
    weighting: NeighbourWeighting,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            neighbours: 5,
            weighting: NeighbourWeighting::default(),
        }
    }
}

impl PredictorConfig {
    pub fn get_neighbours(&self) -> usize {
        self.neighbours
    }

    pub fn get_weighting(&self) -> NeighbourWeighting {
        self.weighting
    }
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct EnvironmentConfig {
    source: EnvironmentSourceConfig,
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_poll_interval")]
    poll_interval_secs: Duration,
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_read_timeout")]
    read_timeout_secs: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(30)
}

impl EnvironmentConfig {
    pub fn get_source(&self) -> &EnvironmentSourceConfig {
        &self.source
    }

    pub fn get_poll_interval(&self) -> &Duration {
        &self.poll_interval_secs
    }

    pub fn get_read_timeout(&self) -> &Duration {
        &self.read_timeout_secs
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum EnvironmentSourceConfig {
    /// A JSON file kept up to date by another process.
    File { file: PathBuf },
    /// A program printing a single `temperature humidity` line.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    Dummy,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ActuatorConfig {
    Gpio {
        pin: usize,
        #[serde(default)]
        active_low: bool,
    },
    HttpPlug {
        base_url: String,
        #[serde(default)]
        relay: usize,
        #[serde_as(as = "DurationSeconds")]
        #[serde(default = "default_request_timeout")]
        request_timeout_secs: Duration,
    },
    Dummy,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StorageConfig {
    schedule_file: PathBuf,
    training_file: PathBuf,
    environment_history_file: PathBuf,
    status_history_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data = PathBuf::from("data");
        Self {
            schedule_file: data.join("schedule.json"),
            training_file: data.join("training.jsonl"),
            environment_history_file: data.join("environment.csv"),
            status_history_file: data.join("status.csv"),
        }
    }
}

impl StorageConfig {
    pub fn get_schedule_file(&self) -> &PathBuf {
        &self.schedule_file
    }

    pub fn get_training_file(&self) -> &PathBuf {
        &self.training_file
    }

    pub fn get_environment_history_file(&self) -> &PathBuf {
        &self.environment_history_file
    }

    pub fn get_status_history_file(&self) -> &PathBuf {
        &self.status_history_file
    }
}

/// A year and a day, enough to see every rule and override at least once.
const MAX_LOOKAHEAD_MINS: i64 = 366 * 24 * 60;

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ScheduleConfig {
    zone: ScheduleZone,
    #[serde(rename = "lookahead_mins", deserialize_with = "deserialize_lookahead")]
    lookahead: chrono::Duration,
}

fn deserialize_lookahead<'de, D: Deserializer<'de>>(deserializer: D) -> Result<chrono::Duration, D::Error> {
    let minutes = i64::deserialize(deserializer)?;
    if !(1..=MAX_LOOKAHEAD_MINS).contains(&minutes) {
        return Err(D::Error::custom(format!(
            "lookahead_mins must be between 1 and {}, got {}",
            MAX_LOOKAHEAD_MINS, minutes
        )));
    }
    Ok(chrono::Duration::minutes(minutes))
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            zone: ScheduleZone::default(),
            lookahead: chrono::Duration::minutes(DEFAULT_LOOKAHEAD_MINS),
        }
    }
}

impl ScheduleConfig {
    pub fn get_zone(&self) -> ScheduleZone {
        self.zone
    }

    pub fn get_lookahead(&self) -> chrono::Duration {
        self.lookahead
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct WebConfig {
    enabled: bool,
    bind: SocketAddr,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
        }
    }
}

impl WebConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_bind(&self) -> &SocketAddr {
        &self.bind
    }
}
