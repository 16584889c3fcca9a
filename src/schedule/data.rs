use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ScheduleError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Which days of the week a recurring rule applies to.
/// Days left out are not matched, so an empty mask never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DayOfWeekMask {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl DayOfWeekMask {
    pub fn weekdays() -> Self {
        Self {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            ..Self::default()
        }
    }

    pub fn weekends() -> Self {
        Self {
            saturday: true,
            sunday: true,
            ..Self::default()
        }
    }

    pub fn every_day() -> Self {
        Self {
            saturday: true,
            sunday: true,
            ..Self::weekdays()
        }
    }

    /// Whether the given day is selected.
    /// `day_of_week` is 0 for Sunday through to 6 for Saturday.
    pub fn matches_day(&self, day_of_week: u32) -> Result<bool, ScheduleError> {
        match day_of_week {
            0 => Ok(self.sunday),
            1 => Ok(self.monday),
            2 => Ok(self.tuesday),
            3 => Ok(self.wednesday),
            4 => Ok(self.thursday),
            5 => Ok(self.friday),
            6 => Ok(self.saturday),
            _ => Err(ScheduleError::InvalidWeekday(day_of_week)),
        }
    }
}

/// A recurring rule: a temperature between two times of day on some days of the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub days: DayOfWeekMask,
    /// Minutes since midnight.
    pub start_minute: u32,
    /// Minutes since midnight. If this is not after `start_minute`
    /// the rule runs over midnight into the next day.
    pub end_minute: u32,
    pub temperature: f32,
}

impl ScheduleItem {
    pub fn new(days: DayOfWeekMask, start_minute: u32, end_minute: u32, temperature: f32) -> Self {
        Self {
            days,
            start_minute,
            end_minute,
            temperature,
        }
    }

    pub fn is_overnight(&self) -> bool {
        self.end_minute <= self.start_minute
    }

    /// Minutes from the start of the day in which the rule starts until it ends.
    pub fn end_offset_minutes(&self) -> u32 {
        if self.is_overnight() {
            self.end_minute + MINUTES_PER_DAY
        } else {
            self.end_minute
        }
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_minute >= MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidMinuteOfDay(self.start_minute));
        }
        if self.end_minute > MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidMinuteOfDay(self.end_minute));
        }
        validate_temperature(self.temperature)
    }
}

/// A recurring rule that only applies within an absolute window, e.g. holidays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeTarget {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub schedule: ScheduleItem,
}

/// Enforce a temperature over everything else for a fixed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub temperature: f32,
}

impl ManualOverride {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, temperature: f32) -> Result<Self, ScheduleError> {
        let manual_override = Self {
            start_time,
            end_time,
            temperature,
        };
        manual_override.validate()?;
        Ok(manual_override)
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        validate_bounds(&self.start_time, &self.end_time)?;
        validate_temperature(self.temperature)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleData {
    pub default_temperature: f32,
    #[serde(default)]
    pub schedule: Vec<ScheduleItem>,
    #[serde(default)]
    pub one_time_overrides: Vec<OneTimeTarget>,
    #[serde(default)]
    pub manual_override: Option<ManualOverride>,
}

impl ScheduleData {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        validate_temperature(self.default_temperature)?;
        for item in &self.schedule {
            item.validate()?;
        }
        for one_time in &self.one_time_overrides {
            validate_bounds(&one_time.start_time, &one_time.end_time)?;
            one_time.schedule.validate()?;
        }
        if let Some(manual_override) = &self.manual_override {
            manual_override.validate()?;
        }
        Ok(())
    }
}

/// The schedule used when nothing has been stored yet.
impl Default for ScheduleData {
    fn default() -> Self {
        ScheduleData {
            default_temperature: 19.0,
            schedule: vec![
                ScheduleItem::new(DayOfWeekMask::weekdays(), 7 * 60, 8 * 60, 21.0),
                ScheduleItem::new(DayOfWeekMask::weekdays(), 19 * 60, 22 * 60, 21.0),
                ScheduleItem::new(DayOfWeekMask::weekends(), 9 * 60, 23 * 60, 23.0),
            ],
            one_time_overrides: vec![],
            manual_override: None,
        }
    }
}

fn validate_bounds(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<(), ScheduleError> {
    if start >= end {
        return Err(ScheduleError::InvalidOverrideBounds { start: *start, end: *end });
    }
    Ok(())
}

fn validate_temperature(temperature: f32) -> Result<(), ScheduleError> {
    if !temperature.is_finite() {
        return Err(ScheduleError::InvalidTemperature(temperature));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::time_util::test_utils::utc_datetime;

    #[test]
    fn test_matches_day() {
        let weekdays = DayOfWeekMask::weekdays();
        assert!(!weekdays.matches_day(0).unwrap());
        for day in 1..=5 {
            assert!(weekdays.matches_day(day).unwrap(), "Day {} should match", day);
        }
        assert!(!weekdays.matches_day(6).unwrap());
    }

    #[test]
    fn test_empty_mask_never_matches() {
        let mask = DayOfWeekMask::default();
        for day in 0..7 {
            assert!(!mask.matches_day(day).unwrap());
        }
    }

    #[test]
    fn test_out_of_range_weekday_is_rejected() {
        let result = DayOfWeekMask::every_day().matches_day(7);
        assert!(matches!(result, Err(ScheduleError::InvalidWeekday(7))), "Got {:?}", result);
    }

    #[test]
    fn test_manual_override_bounds() {
        let start = utc_datetime(2024, 1, 8, 8, 0, 0);
        let end = utc_datetime(2024, 1, 8, 9, 0, 0);
        assert!(ManualOverride::new(start, end, 22.0).is_ok());
        assert!(matches!(
            ManualOverride::new(end, start, 22.0),
            Err(ScheduleError::InvalidOverrideBounds { .. })
        ));
        assert!(matches!(ManualOverride::new(start, start, 22.0), Err(ScheduleError::InvalidOverrideBounds { .. })));
        assert!(matches!(ManualOverride::new(start, end, f32::NAN), Err(ScheduleError::InvalidTemperature(_))));
    }

    #[test]
    fn test_validate_minutes() {
        let mut data = ScheduleData::default();
        assert!(data.validate().is_ok());

        data.schedule.push(ScheduleItem::new(DayOfWeekMask::every_day(), 24 * 60, 60, 20.0));
        assert!(matches!(data.validate(), Err(ScheduleError::InvalidMinuteOfDay(1440))));
    }

    #[test]
    fn test_overnight_item() {
        let item = ScheduleItem::new(DayOfWeekMask::every_day(), 22 * 60, 6 * 60, 17.0);
        assert!(item.is_overnight());
        assert_eq!(item.end_offset_minutes(), 30 * 60);

        let until_midnight = ScheduleItem::new(DayOfWeekMask::every_day(), 22 * 60, 24 * 60, 17.0);
        assert!(!until_midnight.is_overnight());
    }

    #[test]
    fn test_deserialize_schedule() {
        let json = r#"
        {
            "default_temperature": 18.5,
            "schedule": [
                {
                    "days": { "monday": true, "friday": true },
                    "start_minute": 420,
                    "end_minute": 480,
                    "temperature": 21.0
                }
            ],
            "manual_override": {
                "start_time": "2024-01-08T08:00:00Z",
                "end_time": "2024-01-08T10:00:00Z",
                "temperature": 23.0
            }
        }
        "#;
        let data: ScheduleData = serde_json::from_str(json).unwrap();

        assert_eq!(data.default_temperature, 18.5);
        assert_eq!(
            data.schedule,
            vec![ScheduleItem::new(
                DayOfWeekMask { monday: true, friday: true, ..DayOfWeekMask::default() },
                420,
                480,
                21.0
            )]
        );
        assert!(data.one_time_overrides.is_empty());
        assert_eq!(
            data.manual_override,
            Some(ManualOverride {
                start_time: utc_datetime(2024, 1, 8, 8, 0, 0),
                end_time: utc_datetime(2024, 1, 8, 10, 0, 0),
                temperature: 23.0,
            })
        );
    }
}
