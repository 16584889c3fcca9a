use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::environment::Environment;

pub mod recorder;

/// Returned when nothing is known, long enough that heating starts straight away.
pub const NO_DATA_HEAT_TIME_DAYS: i64 = 365;
/// Distance of an item with no usable snapshots.
const INITIAL_DISTANCE: f64 = 127.0;

#[derive(Debug, Error, PartialEq)]
pub enum PredictorError {
    #[error("invalid training item starting {start}: needs at least 2 snapshots, has {snapshots}")]
    InvalidTrainingItem { start: DateTime<Utc>, snapshots: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub mins_since_start: i64,
    pub environment: Environment,
}

/// A recorded heating episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingItem {
    /// When the heater was switched on.
    pub start_timestamp: DateTime<Utc>,
    /// Ordered by increasing minutes since start.
    pub snapshots: Vec<TrainingSnapshot>,
}

impl TrainingItem {
    pub fn is_usable(&self) -> bool {
        self.snapshots.len() > 1
    }

    fn validate(&self) -> Result<(), PredictorError> {
        if !self.is_usable() {
            return Err(PredictorError::InvalidTrainingItem {
                start: self.start_timestamp,
                snapshots: self.snapshots.len(),
            });
        }
        Ok(())
    }
}

/// How the predictions of the nearest neighbours are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum NeighbourWeighting {
    /// Sum of prediction times weight over the sum of the weights.
    #[default]
    WeightedMean,
    /// Only the last of the selected neighbours contributes to the numerator,
    /// the denominator is still the sum of all weights.
    LastNeighbour,
}

/// Estimates how long it takes to heat up to a temperature using k-nearest neighbours
/// over previously recorded heating episodes.
pub struct HeatTimePredictor {
    corpus: Vec<TrainingItem>,
    neighbours: usize,
    weighting: NeighbourWeighting,
}

impl HeatTimePredictor {
    pub fn new(corpus: Vec<TrainingItem>, neighbours: usize, weighting: NeighbourWeighting) -> Self {
        Self {
            corpus,
            neighbours: neighbours.max(1),
            weighting,
        }
    }

    pub fn corpus_len(&self) -> usize {
        self.corpus.len()
    }

    pub fn add_training_item(&mut self, item: TrainingItem) -> Result<(), PredictorError> {
        item.validate()?;
        debug!("Adding training item starting {} with {} snapshots", item.start_timestamp, item.snapshots.len());
        self.corpus.push(item);
        Ok(())
    }

    pub fn calculate_heat_time(&self, target: f32, env: &Environment) -> Result<Duration, PredictorError> {
        if env.temperature == target {
            return Ok(Duration::zero());
        }
        if self.corpus.is_empty() {
            return Ok(Duration::days(NO_DATA_HEAT_TIME_DAYS));
        }

        let current = env.temperature as f64;
        let target = target as f64;

        let nearest: Vec<(&TrainingItem, f64)> = self
            .corpus
            .iter()
            .map(|item| (item, 1.0 / (1.0 + distance(current, item))))
            .sorted_by(|(_, a), (_, b)| b.total_cmp(a))
            .take(self.neighbours)
            .collect();

        let mut weight_sum = 0.0;
        let mut numerator = 0.0;
        for (item, weight) in nearest {
            item.validate()?;
            let Some(seconds_per_degree) = seconds_per_degree(item, current, target) else {
                warn!("Training item starting {} has no temperature change, skipping it", item.start_timestamp);
                continue;
            };
            let prediction_ms = ((target - current).abs() * seconds_per_degree).ceil() * 1000.0;
            trace!("Neighbour {} (weight {:.3}) predicts {}ms", item.start_timestamp, weight, prediction_ms);

            weight_sum += weight;
            numerator = match self.weighting {
                NeighbourWeighting::WeightedMean => numerator + prediction_ms * weight,
                NeighbourWeighting::LastNeighbour => prediction_ms * weight,
            };
        }

        if weight_sum <= 0.0 {
            warn!("None of the nearest training items were usable, heating immediately");
            return Ok(Duration::days(NO_DATA_HEAT_TIME_DAYS));
        }

        let millis = (numerator / weight_sum).ceil() as i64;
        Ok(Duration::milliseconds(millis))
    }
}

/// Smallest difference between the current temperature and any snapshot but the last.
fn distance(current: f64, item: &TrainingItem) -> f64 {
    let considered = item.snapshots.len().saturating_sub(1);
    item.snapshots[..considered]
        .iter()
        .map(|snapshot| (current - snapshot.environment.temperature as f64).abs())
        .fold(INITIAL_DISTANCE, f64::min)
}

/// Heating rate of an episode between the point it was at the current temperature
/// and the point it reached the target.
fn seconds_per_degree(item: &TrainingItem, current: f64, target: f64) -> Option<f64> {
    let snapshots = &item.snapshots;
    let first = snapshots.first()?;
    let last = snapshots.last()?;

    let start_index = snapshots
        .iter()
        .position(|s| s.environment.temperature as f64 >= current)
        .unwrap_or(0);
    let start = &snapshots[start_index];
    let end = snapshots[start_index + 1..]
        .iter()
        .find(|s| s.environment.temperature as f64 >= target)
        .unwrap_or(last);

    rate_between(start, end).or_else(|| rate_between(first, last))
}

fn rate_between(start: &TrainingSnapshot, end: &TrainingSnapshot) -> Option<f64> {
    let elapsed_secs = ((end.mins_since_start - start.mins_since_start) * 60) as f64;
    let temp_diff = (end.environment.temperature as f64 - start.environment.temperature as f64).abs();
    (elapsed_secs > 0.0 && temp_diff > 0.0).then(|| elapsed_secs / temp_diff)
}
