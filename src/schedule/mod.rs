use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use thiserror::Error;

use crate::events::{ListenerId, Listeners};

use data::{ManualOverride, ScheduleData, ScheduleItem};
use merge::merge_into;
use target::{HeatingTarget, TargetPriority};
use zone::{days_in_period, DayInfo, ScheduleZone};

pub mod data;
pub mod merge;
pub mod target;
pub mod zone;

#[cfg(test)]
mod test;

/// How far ahead targets are resolved unless asked otherwise.
pub const DEFAULT_LOOKAHEAD_MINS: i64 = 24 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("day of week must be within 0 to 6 (inclusive), got {0}")]
    InvalidWeekday(u32),
    #[error("override must end after it starts: {start} - {end}")]
    InvalidOverrideBounds { start: DateTime<Utc>, end: DateTime<Utc> },
    #[error("minute of day out of range: {0}")]
    InvalidMinuteOfDay(u32),
    #[error("invalid temperature: {0}")]
    InvalidTemperature(f32),
}

/// Fired whenever the schedule is replaced.
#[derive(Debug, Clone)]
pub struct ScheduleChange {
    pub old: ScheduleData,
    pub new: ScheduleData,
}

/// Holds the layered schedule and resolves it into concrete heating targets.
///
/// The target temperature can be defined on four levels:
/// 1. a default temperature applied whenever nothing else is,
/// 2. recurring rules for some times of day on some days of the week,
/// 3. one-time overrides, recurring rules only valid within a window (e.g. holidays),
/// 4. a manual override enforcing a temperature for a fixed window.
pub struct ScheduleStore {
    data: ScheduleData,
    zone: ScheduleZone,
    listeners: Listeners<ScheduleChange>,
}

impl ScheduleStore {
    pub fn new(data: ScheduleData, zone: ScheduleZone) -> Result<Self, ScheduleError> {
        data.validate()?;
        Ok(Self {
            data,
            zone,
            listeners: Listeners::new(),
        })
    }

    pub fn get_schedule(&self) -> ScheduleData {
        self.data.clone()
    }

    pub fn get_zone(&self) -> &ScheduleZone {
        &self.zone
    }

    /// Replaces the whole schedule and informs the listeners.
    pub fn set_schedule(&mut self, schedule: ScheduleData) -> Result<(), ScheduleError> {
        schedule.validate()?;
        let old = std::mem::replace(&mut self.data, schedule);
        info!("Schedule replaced");
        let change = ScheduleChange {
            old,
            new: self.data.clone(),
        };
        self.listeners.notify(&change);
        Ok(())
    }

    /// Set or clear the manual override, keeping the rest of the schedule.
    pub fn set_manual_override(&mut self, manual_override: Option<ManualOverride>) -> Result<(), ScheduleError> {
        let schedule = ScheduleData {
            manual_override,
            ..self.data.clone()
        };
        self.set_schedule(schedule)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ScheduleChange) + Send + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Drops overrides that have ended. This is not a schedule change, listeners are not informed.
    pub fn remove_outdated_overrides(&mut self, now: &DateTime<Utc>) {
        if self.data.manual_override.as_ref().is_some_and(|o| o.end_time <= *now) {
            debug!("Manual override expired");
            self.data.manual_override = None;
        }
        let before = self.data.one_time_overrides.len();
        self.data.one_time_overrides.retain(|o| o.end_time > *now);
        let removed = before - self.data.one_time_overrides.len();
        if removed > 0 {
            debug!("{} one time override(s) expired", removed);
        }
    }

    /// Resolves the schedule into disjoint targets sorted by start time,
    /// exactly covering `[now, now + lookahead)`.
    pub fn get_heating_targets(&mut self, now: DateTime<Utc>, lookahead: Duration) -> Result<Vec<HeatingTarget>, ScheduleError> {
        self.remove_outdated_overrides(&now);
        let end = now + lookahead;
        let mut targets = Vec::new();

        if let Some(manual_override) = &self.data.manual_override {
            let manual = HeatingTarget::new(
                manual_override.start_time,
                manual_override.end_time,
                manual_override.temperature,
                TargetPriority::ManualOverride,
            );
            if let Some(manual) = manual.clipped(now, end) {
                targets = merge_into(targets, manual);
            }
        }

        let days = days_in_period(&self.zone, &now, &end);

        for one_time in &self.data.one_time_overrides {
            let window_start = one_time.start_time.max(now);
            let window_end = one_time.end_time.min(end);
            if window_start >= window_end {
                continue;
            }
            for target in expand_item(&one_time.schedule, TargetPriority::OneTimeOverride, &self.zone, &days, &now)? {
                if let Some(target) = target.clipped(window_start, window_end) {
                    targets = merge_into(targets, target);
                }
            }
        }

        for item in &self.data.schedule {
            for target in expand_item(item, TargetPriority::Schedule, &self.zone, &days, &now)? {
                if let Some(target) = target.clipped(now, end) {
                    targets = merge_into(targets, target);
                }
            }
        }

        let default = HeatingTarget::new(now, end, self.data.default_temperature, TargetPriority::Default);
        targets = merge_into(targets, default);

        Ok(targets)
    }
}

/// Concrete occurrences of a recurring rule on the given days which have not yet ended,
/// starting no earlier than now.
fn expand_item(
    item: &ScheduleItem,
    priority: TargetPriority,
    zone: &ScheduleZone,
    days: &[DayInfo],
    now: &DateTime<Utc>,
) -> Result<Vec<HeatingTarget>, ScheduleError> {
    let mut targets = Vec::new();
    for day in days {
        if !item.days.matches_day(day.day_of_week)? {
            continue;
        }
        let start = zone.at_minute(day.date, item.start_minute);
        let end = zone.at_minute(day.date, item.end_offset_minutes());
        if end > *now {
            targets.push(HeatingTarget::new(start.max(*now), end, item.temperature, priority));
        }
    }
    Ok(targets)
}
