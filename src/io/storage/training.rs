use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use log::{info, warn};

use crate::predictor::TrainingItem;

use super::{StorageError, TrainingCorpusStorage};

/// One JSON encoded training item per line.
pub struct JsonLinesTrainingStorage {
    file: PathBuf,
}

impl JsonLinesTrainingStorage {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }
}

#[async_trait]
impl TrainingCorpusStorage for JsonLinesTrainingStorage {
    async fn append(&self, item: &TrainingItem) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(item)?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.file)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<TrainingItem>, StorageError> {
        let s = match fs::read_to_string(&self.file) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No training data at {:?}", self.file);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut items = Vec::new();
        for (i, line) in s.lines().enumerate().filter(|(_, line)| !line.trim().is_empty()) {
            match serde_json::from_str::<TrainingItem>(line) {
                Ok(item) if item.is_usable() => items.push(item),
                Ok(item) => warn!("Skipping training item on line {} with {} snapshot(s)", i + 1, item.snapshots.len()),
                Err(e) => warn!("Skipping unreadable training item on line {} of {:?}: {}", i + 1, self.file, e),
            }
        }
        info!("Loaded {} training items", items.len());
        Ok(items)
    }
}
