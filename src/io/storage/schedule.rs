use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use log::{error, info, warn};

use crate::schedule::data::ScheduleData;

use super::{ScheduleStorage, StorageError};

/// The schedule as a pretty printed JSON document.
pub struct JsonScheduleStorage {
    file: PathBuf,
}

impl JsonScheduleStorage {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }

    fn read(&self) -> Result<ScheduleData, StorageError> {
        let s = fs::read_to_string(&self.file)?;
        Ok(serde_json::from_str(&s)?)
    }
}

#[async_trait]
impl ScheduleStorage for JsonScheduleStorage {
    async fn load(&self) -> ScheduleData {
        match self.read() {
            Ok(schedule) => match schedule.validate() {
                Ok(()) => schedule,
                Err(e) => {
                    error!("Invalid schedule in {:?}: {}. Falling back to default schedule.", self.file, e);
                    ScheduleData::default()
                }
            },
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!("No schedule stored at {:?}, using default schedule.", self.file);
                ScheduleData::default()
            }
            Err(e) => {
                warn!("Failed to read schedule from {:?}: {}. Falling back to default schedule.", self.file, e);
                ScheduleData::default()
            }
        }
    }

    async fn save(&self, schedule: &ScheduleData) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(schedule)?;
        // Write then rename so a crash never leaves a half written schedule.
        let tmp = self.file.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.file)?;
        Ok(())
    }
}
