use std::{fs, path::PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, trace, warn};
use serde::Deserialize;

use crate::io::live_data::{check_age, AgeType, CachedPrevious};
use crate::time_util::mytime::TimeProvider;

use super::{Environment, EnvironmentSource, SensorError};

/// How old the environment file is allowed to be before being considered invalid.
const MAX_FILE_AGE: i64 = 120;
/// How old a single reading is allowed to be before the reading being considered stale.
const MAX_READING_AGE: i64 = 600;

/// Reads the environment from a JSON file kept up to date by an external sensor process.
pub struct LiveFileEnvironment<T: TimeProvider> {
    file: PathBuf,
    time_provider: T,
    last_data: CachedPrevious<EnvironmentFileData>,
}

impl<T: TimeProvider> LiveFileEnvironment<T> {
    pub fn new(file: PathBuf, time_provider: T) -> Self {
        Self {
            file,
            time_provider,
            last_data: CachedPrevious::none(),
        }
    }

    fn read_file_data(&self) -> Result<EnvironmentFileData, SensorError> {
        let s = fs::read_to_string(&self.file)?;

        serde_json::from_str(&s).map_err(|e| SensorError::Parse(format!("{:?}: {}\n{}", self.file, e, s)))
    }

    fn to_environment(&self, data: EnvironmentFileData) -> Result<Environment, SensorError> {
        let now = self.time_provider.get_utc_time();

        let file_age = check_age(data.timestamp, now, MAX_FILE_AGE);
        match file_age.age_type() {
            AgeType::Good => trace!("{:?}: {}", self.file, file_age),
            AgeType::GettingOld => warn!("{:?}: {}", self.file, file_age),
            AgeType::TooOld => {
                return Err(SensorError::Stale(format!("{:?}: {} - is it being updated?", self.file, file_age)));
            }
        }

        let temperature_age = check_age(data.temperature.timestamp, now, MAX_READING_AGE);
        match temperature_age.age_type() {
            AgeType::Good => trace!("Temperature {}", temperature_age),
            AgeType::GettingOld => warn!("Temperature {} - will reject soon.", temperature_age),
            AgeType::TooOld => return Err(SensorError::Stale(format!("Temperature {}", temperature_age))),
        }

        let humidity_age = check_age(data.humidity.timestamp, now, MAX_READING_AGE);
        if !matches!(humidity_age.age_type(), AgeType::Good) {
            warn!("Humidity {}", humidity_age);
        }

        let outside_temperature = data.outside_temperature.and_then(|reading| {
            let reading_age = check_age(reading.timestamp, now, MAX_READING_AGE);
            match reading_age.age_type() {
                AgeType::TooOld => {
                    error!("Rejecting outside temperature {} - Treating it as having no value.", reading_age);
                    None
                }
                _ => Some(reading.value),
            }
        });

        Ok(Environment::new(data.temperature.value, data.humidity.value, outside_temperature))
    }
}

#[async_trait]
impl<T: TimeProvider + Send + Sync> EnvironmentSource for LiveFileEnvironment<T> {
    async fn read(&mut self) -> Result<Environment, SensorError> {
        let data = match self.read_file_data() {
            Ok(data) => {
                self.last_data.update(data.clone());
                data
            }
            Err(e) => {
                let previous_data = self.last_data.get().ok_or(e)?;
                warn!("Error reading {:?}, using last valid", self.file);
                previous_data
            }
        };
        self.to_environment(data)
    }
}

#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct EnvironmentFileData {
    timestamp: DateTime<Utc>,
    temperature: TimestampedValue,
    humidity: TimestampedValue,
    #[serde(default)]
    outside_temperature: Option<TimestampedValue>,
}

#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct TimestampedValue {
    value: f32,
    timestamp: DateTime<Utc>,
}
