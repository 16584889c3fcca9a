use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// The priority of the different schedule layers.
/// Default temperature has the lowest priority and the manual override the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetPriority {
    Default,
    Schedule,
    OneTimeOverride,
    ManualOverride,
}

/// A resolved, concrete interval with the temperature that should be reached at its start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatingTarget {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub temperature: f32,
    pub priority: TargetPriority,
}

impl HeatingTarget {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, temperature: f32, priority: TargetPriority) -> Self {
        Self {
            start,
            end,
            temperature,
            priority,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.start <= *time && *time < self.end
    }

    pub fn with_start(&self, start: DateTime<Utc>) -> Self {
        Self { start, ..self.clone() }
    }

    pub fn with_end(&self, end: DateTime<Utc>) -> Self {
        Self { end, ..self.clone() }
    }

    /// The part of this target within `[from, to)`, if any.
    pub fn clipped(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Self> {
        let clipped = Self {
            start: self.start.max(from),
            end: self.end.min(to),
            ..self.clone()
        };
        (!clipped.is_empty()).then_some(clipped)
    }
}

impl Display for HeatingTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{} @ {:.1} ({})",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M"),
            self.temperature,
            self.priority
        )
    }
}

/// Whether `other` should take precedence over `target`.
/// Higher priority always wins, between equal priorities the warmer target wins
/// (we accept heating slightly too much to reach a target on time).
pub fn wins(target: &HeatingTarget, other: &HeatingTarget) -> bool {
    let is_higher_priority = other.priority > target.priority;
    let is_same_priority_but_warmer = other.priority == target.priority && other.temperature > target.temperature;
    is_higher_priority || is_same_priority_but_warmer
}
