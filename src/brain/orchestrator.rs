use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use crate::brain::{BrainFailure, CorrectiveActions};
use crate::brain_fail;
use crate::control::HeaterController;
use crate::io::environment::{Environment, EnvironmentUpdate};
use crate::predictor::{HeatTimePredictor, TrainingItem};
use crate::schedule::target::{wins, HeatingTarget};
use crate::schedule::ScheduleStore;
use crate::time_util::mytime::TimeProvider;

/// Why the orchestrator should act.
#[derive(Debug, Clone)]
pub enum Trigger {
    Environment(EnvironmentUpdate),
    ScheduleChanged,
    NewTrainingItem(TrainingItem),
    Shutdown,
}

enum Wake {
    Trigger(Option<Trigger>),
    Expired(DateTime<Utc>),
}

/// The target currently being heated towards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveTarget {
    pub target: HeatingTarget,
    /// None when the temperature is unknown and nothing could be predicted.
    pub lead_time_secs: Option<i64>,
    pub predicted_start: DateTime<Utc>,
}

/// A snapshot of the controller for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeatingStatus {
    pub heater_enabled: bool,
    pub environment: Option<Environment>,
    pub environment_at: Option<DateTime<Utc>>,
    pub active_target: Option<ActiveTarget>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
}

/// The single pending re-evaluation, at the end of the active target.
#[derive(Debug, Default)]
pub struct ExpiryTimer {
    armed: Option<(DateTime<Utc>, Instant)>,
}

impl ExpiryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever was armed before.
    pub fn arm(&mut self, deadline: DateTime<Utc>, now: DateTime<Utc>) {
        let wait = (deadline - now).to_std().unwrap_or_default();
        self.armed = Some((deadline, Instant::now() + wait));
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.armed.map(|(deadline, _)| deadline)
    }

    /// Resolves with the deadline once it has passed, never if nothing is armed.
    pub async fn expired(&self) -> DateTime<Utc> {
        match self.armed {
            Some((deadline, at)) => {
                sleep_until(at).await;
                deadline
            }
            None => std::future::pending().await,
        }
    }
}

/// Combines the schedule, the predictor and the heater controller: picks the target to
/// heat towards right now and re-evaluates whenever something changes.
pub struct HeatingOrchestrator<T: TimeProvider> {
    store: Arc<Mutex<ScheduleStore>>,
    predictor: HeatTimePredictor,
    controller: HeaterController,
    time_provider: T,
    lookahead: Duration,
    environment: Option<EnvironmentUpdate>,
    expiry: ExpiryTimer,
    status: watch::Sender<HeatingStatus>,
}

impl<T: TimeProvider> HeatingOrchestrator<T> {
    pub fn new(
        store: Arc<Mutex<ScheduleStore>>,
        predictor: HeatTimePredictor,
        controller: HeaterController,
        time_provider: T,
        lookahead: Duration,
        cached_environment: Option<EnvironmentUpdate>,
    ) -> (Self, watch::Receiver<HeatingStatus>) {
        let (status, status_receiver) = watch::channel(HeatingStatus::default());
        let orchestrator = Self {
            store,
            predictor,
            controller,
            time_provider,
            lookahead,
            environment: cached_environment,
            expiry: ExpiryTimer::new(),
            status,
        };
        (orchestrator, status_receiver)
    }

    pub fn get_expiry(&self) -> &ExpiryTimer {
        &self.expiry
    }

    /// Process triggers until told to shut down or every sender is gone,
    /// then switch the heater off.
    pub async fn run(mut self, mut triggers: mpsc::Receiver<Trigger>) {
        if self.environment.is_some() {
            let now = self.time_provider.get_utc_time();
            self.evaluate_and_publish(now).await;
        }

        loop {
            let wake = tokio::select! {
                trigger = triggers.recv() => Wake::Trigger(trigger),
                deadline = self.expiry.expired() => Wake::Expired(deadline),
            };

            let now = self.time_provider.get_utc_time();
            match wake {
                Wake::Expired(deadline) => {
                    debug!("Active target expired at {}", deadline);
                    self.expiry.cancel();
                    // The timer may fire slightly before the clock reaches the deadline.
                    self.evaluate_and_publish(now.max(deadline)).await;
                }
                Wake::Trigger(Some(Trigger::Environment(update))) => {
                    self.environment = Some(update);
                    self.evaluate_and_publish(now).await;
                }
                Wake::Trigger(Some(Trigger::ScheduleChanged)) => {
                    info!("Schedule changed, re-evaluating");
                    self.evaluate_and_publish(now).await;
                }
                Wake::Trigger(Some(Trigger::NewTrainingItem(item))) => {
                    if let Err(e) = self.predictor.add_training_item(item) {
                        warn!("Ignoring training item: {}", e);
                    }
                }
                Wake::Trigger(Some(Trigger::Shutdown)) | Wake::Trigger(None) => break,
            }
        }

        info!("Stopping, turning heater off");
        self.expiry.cancel();
        if let Err(e) = self.controller.shutdown().await {
            error!("FAILED TO TURN OFF HEATER: {}", e);
        }
        self.publish(|status| status.heater_enabled = false);
    }

    async fn evaluate_and_publish(&mut self, now: DateTime<Utc>) {
        let result = self.evaluate(now).await;
        let enabled = self.controller.is_enabled();
        let environment = self.environment.clone();
        self.publish(|status| {
            status.heater_enabled = enabled;
            status.environment = environment.as_ref().and_then(|u| u.reading.clone());
            status.environment_at = environment.as_ref().map(|u| u.at);
            status.evaluated_at = Some(now);
            match &result {
                Ok(active) => {
                    status.active_target = Some(active.clone());
                    status.last_failure = None;
                }
                Err(failure) => {
                    status.active_target = None;
                    status.last_failure = Some(failure.get_description().to_owned());
                }
            }
        });
        if let Err(failure) = result {
            error!("{}", failure);
        }
    }

    fn publish(&self, modify: impl FnOnce(&mut HeatingStatus)) {
        self.status.send_modify(modify);
    }

    /// One evaluation cycle. Arms the expiry timer for the selected target.
    pub async fn evaluate(&mut self, now: DateTime<Utc>) -> Result<ActiveTarget, BrainFailure> {
        let targets = {
            let mut store = self.store.lock().map_err(|_| brain_fail!("Schedule store lock poisoned"))?;
            store
                .get_heating_targets(now, self.lookahead)
                .map_err(|e| brain_fail!(format!("Failed to resolve schedule: {}", e)))?
        };

        let current = self.environment.as_ref().and_then(|update| update.reading.as_ref());
        let mut winner: Option<ActiveTarget> = None;
        for target in targets {
            let candidate = match current {
                Some(env) => {
                    let lead = self
                        .predictor
                        .calculate_heat_time(target.temperature, env)
                        .map_err(|e| brain_fail!(format!("Failed to predict heat time: {}", e)))?;
                    ActiveTarget {
                        predicted_start: target.start - lead,
                        lead_time_secs: Some(lead.num_seconds()),
                        target,
                    }
                }
                // Nothing to predict with, only what applies right now.
                None => ActiveTarget {
                    predicted_start: target.start,
                    lead_time_secs: None,
                    target,
                },
            };
            if candidate.predicted_start > now {
                continue;
            }
            if winner.as_ref().is_none_or(|w| wins(&w.target, &candidate.target)) {
                winner = Some(candidate);
            }
        }

        let Some(winner) = winner else {
            self.expiry.cancel();
            return Err(brain_fail!(format!("No heating target is due at {}", now)));
        };
        debug!("Selected {} (predicted start {})", winner.target, winner.predicted_start);
        self.expiry.arm(winner.target.end, now);

        let current_temperature = current.map(|env| env.temperature);
        self.controller
            .update_current_status(winner.target.temperature, current_temperature, now)
            .await
            .map_err(|e| brain_fail!(format!("Failed to switch heater: {}", e), CorrectiveActions::unknown_actuator()))?;

        Ok(winner)
    }
}
