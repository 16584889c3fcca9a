use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::control::StatusChange;
use crate::io::environment::EnvironmentUpdate;

use super::StorageError;

const ENVIRONMENT_HEADER: &str = "time, temperature, humidity, outsideTemperature";
const STATUS_HEADER: &str = "time, enabled, targetTemperature";

/// Appends readings and heater status changes to CSV files for later analysis.
pub struct CsvHistory {
    environment_file: PathBuf,
    status_file: PathBuf,
}

impl CsvHistory {
    pub fn new(environment_file: PathBuf, status_file: PathBuf) -> Self {
        Self {
            environment_file,
            status_file,
        }
    }

    /// Unknown readings are not recorded.
    pub fn record_environment(&self, update: &EnvironmentUpdate) -> Result<(), StorageError> {
        let Some(env) = &update.reading else {
            return Ok(());
        };
        let row = [
            update.at.timestamp().to_string(),
            env.temperature.to_string(),
            env.humidity.to_string(),
            env.outside_temperature.map(|t| t.to_string()).unwrap_or_default(),
        ];
        append_row(&self.environment_file, ENVIRONMENT_HEADER, &row)
    }

    pub fn record_status(&self, change: &StatusChange) -> Result<(), StorageError> {
        let row = [
            change.at.timestamp().to_string(),
            u8::from(change.enabled).to_string(),
            change.target.to_string(),
        ];
        append_row(&self.status_file, STATUS_HEADER, &row)
    }
}

fn append_row(path: &Path, header: &str, row: &[String]) -> Result<(), StorageError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let empty = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if empty {
        writer.write_record(header.split(','))?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}
