use log::{debug, info};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::control::StatusChange;
use crate::events::{ListenerId, Listeners};
use crate::io::environment::EnvironmentUpdate;

use super::{TrainingItem, TrainingSnapshot};

#[derive(Debug, Clone)]
pub enum RecorderEvent {
    Status(StatusChange),
    Environment(EnvironmentUpdate),
}

/// Records heating episodes: an episode starts when the heater is switched on and
/// is published once it is switched off again, if it collected more than one reading.
pub struct TrainingRecorder {
    current: Option<TrainingItem>,
    listeners: Listeners<TrainingItem>,
}

impl TrainingRecorder {
    pub fn new() -> Self {
        Self {
            current: None,
            listeners: Listeners::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TrainingItem) + Send + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn is_recording(&self) -> bool {
        self.current.is_some()
    }

    pub fn on_status_change(&mut self, change: &StatusChange) {
        if !change.toggled {
            return;
        }
        if !change.enabled {
            if let Some(item) = self.current.take() {
                if item.is_usable() {
                    info!("Heating episode finished with {} snapshots", item.snapshots.len());
                    self.listeners.notify(&item);
                } else {
                    debug!("Discarding heating episode with {} snapshot(s)", item.snapshots.len());
                }
            }
        } else {
            debug!("Heating episode started at {}", change.at);
            self.current = Some(TrainingItem {
                start_timestamp: change.at,
                snapshots: Vec::new(),
            });
        }
    }

    pub fn on_environment(&mut self, update: &EnvironmentUpdate) {
        let (Some(item), Some(environment)) = (self.current.as_mut(), update.reading.as_ref()) else {
            return;
        };
        let elapsed_secs = (update.at - item.start_timestamp).num_seconds() as f64;
        item.snapshots.push(TrainingSnapshot {
            mins_since_start: (elapsed_secs / 60.0).round() as i64,
            environment: environment.clone(),
        });
    }

    pub fn handle(&mut self, event: &RecorderEvent) {
        match event {
            RecorderEvent::Status(change) => self.on_status_change(change),
            RecorderEvent::Environment(update) => self.on_environment(update),
        }
    }

    /// Process events until every sender has gone away.
    pub async fn run(mut self, mut receiver: UnboundedReceiver<RecorderEvent>) {
        while let Some(event) = receiver.recv().await {
            self.handle(&event);
        }
        debug!("Training recorder stopped");
    }
}

impl Default for TrainingRecorder {
    fn default() -> Self {
        Self::new()
    }
}
