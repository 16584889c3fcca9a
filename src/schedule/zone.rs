use std::fmt::{Display, Formatter};

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::Deserialize;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Which time zone the minutes of day in the recurring schedule refer to.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ScheduleZone {
    Utc,
    #[default]
    Local,
}

impl ScheduleZone {
    /// The calendar date of the given instant in this zone.
    pub fn date_of(&self, time: &DateTime<Utc>) -> NaiveDate {
        match self {
            ScheduleZone::Utc => time.date_naive(),
            ScheduleZone::Local => time.with_timezone(&Local).date_naive(),
        }
    }

    /// The instant at which the given date begins in this zone.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.at_minute(date, 0)
    }

    /// The instant the wall clock in this zone shows `minute` minutes past midnight on `date`.
    /// Minutes beyond the end of the day carry over into the following days.
    pub fn at_minute(&self, date: NaiveDate, minute: u32) -> DateTime<Utc> {
        match self {
            ScheduleZone::Utc => wall_clock_to_utc(&Utc, date, minute),
            ScheduleZone::Local => wall_clock_to_utc(&Local, date, minute),
        }
    }
}

fn wall_clock_to_utc<Tz: TimeZone>(zone: &Tz, date: NaiveDate, minute: u32) -> DateTime<Utc> {
    let date = date.checked_add_days(Days::new((minute / MINUTES_PER_DAY) as u64)).unwrap_or(date);
    let time = NaiveTime::from_num_seconds_from_midnight_opt((minute % MINUTES_PER_DAY) * 60, 0).unwrap_or(NaiveTime::MIN);
    let wall_clock = date.and_time(time);
    // Times skipped when the clocks go forward happen an hour later.
    [wall_clock, wall_clock + TimeDelta::hours(1)]
        .into_iter()
        .find_map(|local| zone.from_local_datetime(&local).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&wall_clock))
}

impl Display for ScheduleZone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleZone::Utc => write!(f, "UTC"),
            ScheduleZone::Local => write!(f, "Local Time"),
        }
    }
}

/// A calendar day within a lookahead period.
#[derive(Debug, Clone, PartialEq)]
pub struct DayInfo {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    /// 0 for Sunday through to 6 for Saturday.
    pub day_of_week: u32,
}

/// The days overlapping `[from, to]`.
/// Starts a day early so that rules running over midnight from the previous day are seen.
pub fn days_in_period(zone: &ScheduleZone, from: &DateTime<Utc>, to: &DateTime<Utc>) -> Vec<DayInfo> {
    let first = zone.date_of(from);
    let mut date = first.pred_opt().unwrap_or(first);
    let mut days = Vec::new();
    loop {
        let start = zone.start_of_day(date);
        if start > *to {
            break;
        }
        days.push(DayInfo {
            date,
            start,
            day_of_week: date.weekday().num_days_from_sunday(),
        });
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    days
}

#[cfg(test)]
mod test {
    use chrono::{FixedOffset, LocalResult, NaiveDateTime};

    use super::*;
    use crate::time_util::test_utils::{date, time, utc_datetime};

    #[test]
    fn test_utc_start_of_day() {
        assert_eq!(ScheduleZone::Utc.start_of_day(date(2024, 1, 8)), utc_datetime(2024, 1, 8, 0, 0, 0));
        assert_eq!(ScheduleZone::Utc.date_of(&utc_datetime(2024, 1, 8, 23, 59, 59)), date(2024, 1, 8));
    }

    #[test]
    fn test_days_in_period() {
        // 2024-01-08 is a Monday.
        let from = utc_datetime(2024, 1, 8, 6, 40, 0);
        let to = utc_datetime(2024, 1, 9, 6, 40, 0);

        let days = days_in_period(&ScheduleZone::Utc, &from, &to);

        assert_eq!(
            days,
            vec![
                DayInfo { date: date(2024, 1, 7), start: utc_datetime(2024, 1, 7, 0, 0, 0), day_of_week: 0 },
                DayInfo { date: date(2024, 1, 8), start: utc_datetime(2024, 1, 8, 0, 0, 0), day_of_week: 1 },
                DayInfo { date: date(2024, 1, 9), start: utc_datetime(2024, 1, 9, 0, 0, 0), day_of_week: 2 },
            ]
        );
    }

    #[test]
    fn test_local_start_of_day_is_midnight_locally() {
        let start = ScheduleZone::Local.start_of_day(date(2024, 6, 10));
        let local = start.with_timezone(&Local);
        assert_eq!(local.date_naive(), date(2024, 6, 10));
        assert!(local.time() <= NaiveTime::from_hms_opt(1, 0, 0).unwrap());
    }

    /// Central European time: clocks go forward at 01:00 UTC on 2024-03-31 and back at 01:00 UTC on 2024-10-27.
    #[derive(Debug, Clone, Copy)]
    struct CentralEurope;

    impl CentralEurope {
        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(2 * 3600).unwrap()
        }

        fn offset_at(utc: &NaiveDateTime) -> FixedOffset {
            let forward = date(2024, 3, 31).and_time(time(1, 0, 0));
            let back = date(2024, 10, 27).and_time(time(1, 0, 0));
            if *utc >= forward && *utc < back {
                Self::summer()
            } else {
                Self::winter()
            }
        }
    }

    impl TimeZone for CentralEurope {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            CentralEurope
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let candidates: Vec<FixedOffset> = [Self::summer(), Self::winter()]
                .into_iter()
                .filter(|offset| Self::offset_at(&(*local - TimeDelta::seconds(offset.local_minus_utc() as i64))) == *offset)
                .collect();
            match candidates.as_slice() {
                [] => LocalResult::None,
                [offset] => LocalResult::Single(*offset),
                [first, second, ..] => LocalResult::Ambiguous(*first, *second),
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            Self::offset_at(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            Self::offset_at(utc)
        }
    }

    #[test]
    fn test_wall_clock_on_spring_forward_day() {
        // Every day 07:00 - 08:00, on the day the clocks go forward.
        let day = date(2024, 3, 31);
        assert_eq!(wall_clock_to_utc(&CentralEurope, day, 0), utc_datetime(2024, 3, 30, 23, 0, 0));
        assert_eq!(wall_clock_to_utc(&CentralEurope, day, 7 * 60), utc_datetime(2024, 3, 31, 5, 0, 0));
        assert_eq!(wall_clock_to_utc(&CentralEurope, day, 8 * 60), utc_datetime(2024, 3, 31, 6, 0, 0));
        // 02:30 does not exist that night.
        assert_eq!(wall_clock_to_utc(&CentralEurope, day, 2 * 60 + 30), utc_datetime(2024, 3, 31, 1, 30, 0));
    }

    #[test]
    fn test_wall_clock_on_fall_back_day() {
        let day = date(2024, 10, 27);
        // 02:30 happens twice, the first one is used.
        assert_eq!(wall_clock_to_utc(&CentralEurope, day, 2 * 60 + 30), utc_datetime(2024, 10, 27, 0, 30, 0));
        assert_eq!(wall_clock_to_utc(&CentralEurope, day, 7 * 60), utc_datetime(2024, 10, 27, 6, 0, 0));
    }

    #[test]
    fn test_wall_clock_overnight_end_uses_next_date() {
        // 22:00 Saturday until 06:00 Sunday, across the switch to summer time.
        let saturday = date(2024, 3, 30);
        assert_eq!(wall_clock_to_utc(&CentralEurope, saturday, 22 * 60), utc_datetime(2024, 3, 30, 21, 0, 0));
        assert_eq!(wall_clock_to_utc(&CentralEurope, saturday, 30 * 60), utc_datetime(2024, 3, 31, 4, 0, 0));
        assert_eq!(ScheduleZone::Utc.at_minute(saturday, 24 * 60), utc_datetime(2024, 3, 31, 0, 0, 0));
    }
}
