use async_trait::async_trait;
use log::{debug, error};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::control::StatusChange;
use crate::io::environment::EnvironmentUpdate;
use crate::predictor::TrainingItem;
use crate::schedule::data::ScheduleData;

use history::CsvHistory;

pub mod history;
pub mod schedule;
pub mod training;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[async_trait]
pub trait ScheduleStorage: Send + Sync {
    /// The stored schedule, or the default schedule if there is none or it can't be used.
    async fn load(&self) -> ScheduleData;

    async fn save(&self, schedule: &ScheduleData) -> Result<(), StorageError>;
}

#[async_trait]
pub trait TrainingCorpusStorage: Send + Sync {
    async fn append(&self, item: &TrainingItem) -> Result<(), StorageError>;

    /// Every usable stored item, in the order they were recorded.
    async fn load_all(&self) -> Result<Vec<TrainingItem>, StorageError>;
}

#[derive(Debug, Clone)]
pub enum PersistEvent {
    Schedule(ScheduleData),
    TrainingItem(TrainingItem),
    Environment(EnvironmentUpdate),
    Status(StatusChange),
}

/// Owns every store and writes whatever it is sent, off the evaluation path.
pub struct Persistence {
    schedule: Box<dyn ScheduleStorage>,
    training: Box<dyn TrainingCorpusStorage>,
    history: CsvHistory,
}

impl Persistence {
    pub fn new(schedule: Box<dyn ScheduleStorage>, training: Box<dyn TrainingCorpusStorage>, history: CsvHistory) -> Self {
        Self {
            schedule,
            training,
            history,
        }
    }

    pub async fn persist(&self, event: &PersistEvent) -> Result<(), StorageError> {
        match event {
            PersistEvent::Schedule(schedule) => self.schedule.save(schedule).await,
            PersistEvent::TrainingItem(item) => self.training.append(item).await,
            PersistEvent::Environment(update) => self.history.record_environment(update),
            PersistEvent::Status(change) => self.history.record_status(change),
        }
    }

    pub async fn run(self, mut receiver: UnboundedReceiver<PersistEvent>) {
        while let Some(event) = receiver.recv().await {
            if let Err(e) = self.persist(&event).await {
                error!("Failed to store {:?}: {}", event, e);
            }
        }
        debug!("Persistence stopped");
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::PathBuf;

    use super::schedule::JsonScheduleStorage;
    use super::training::JsonLinesTrainingStorage;
    use super::*;
    use crate::io::environment::Environment;
    use crate::time_util::test_utils::utc_datetime;

    fn temp_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("predictive_heating_persist_{}_{}", name, std::process::id()));
        let _ = fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn test_run_writes_every_event() {
        let files = [temp_file("schedule.json"), temp_file("training.jsonl"), temp_file("env.csv"), temp_file("status.csv")];
        let persistence = Persistence::new(
            Box::new(JsonScheduleStorage::new(files[0].clone())),
            Box::new(JsonLinesTrainingStorage::new(files[1].clone())),
            CsvHistory::new(files[2].clone(), files[3].clone()),
        );
        let at = utc_datetime(2024, 1, 8, 6, 40, 0);
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();

        sender.send(PersistEvent::Schedule(ScheduleData::default())).unwrap();
        sender.send(PersistEvent::Environment(EnvironmentUpdate { reading: Some(Environment::new(20.0, 40.0, None)), at })).unwrap();
        sender.send(PersistEvent::Status(StatusChange { toggled: true, enabled: true, target: 21.0, at })).unwrap();
        drop(sender);
        persistence.run(receiver).await;

        assert!(files[0].exists());
        assert!(!files[1].exists(), "No training item was sent");
        assert_eq!(fs::read_to_string(&files[2]).unwrap().lines().count(), 2);
        assert_eq!(fs::read_to_string(&files[3]).unwrap().lines().count(), 2);
        for file in files.iter().filter(|f| f.exists()) {
            fs::remove_file(file).unwrap();
        }
    }
}
