//! Weekly reset boundary calculations.
//!
//! All arithmetic happens in UTC so two processes asking at the same instant
//! agree on the period regardless of the local timezone.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Length of one reward period.
pub const PERIOD_LENGTH_DAYS: i64 = 7;

/// Source of the current time for the stores.
pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// Server region, used to pick a reset schedule preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Americas and Oceania (Tuesday 15:00 UTC)
    #[default]
    Us,
    /// Europe (Wednesday 04:00 UTC)
    Eu,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Us => write!(f, "US"),
            Region::Eu => write!(f, "EU"),
        }
    }
}

/// The fixed weekly reset instant: a weekday at a UTC hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSchedule {
    /// Day of week the reset happens on
    pub weekday: Weekday,
    /// Hour of day (UTC, 0-23)
    pub hour_utc: u8,
}

impl Default for ResetSchedule {
    fn default() -> Self {
        Self::for_region(Region::default())
    }
}

impl ResetSchedule {
    /// Create a schedule, validating the hour.
    pub fn new(weekday: Weekday, hour_utc: u8) -> TrackerResult<Self> {
        if hour_utc > 23 {
            return Err(TrackerError::Validation(format!(
                "reset hour must be 0-23, got {hour_utc}"
            )));
        }
        Ok(Self { weekday, hour_utc })
    }

    /// Schedule preset for a region.
    pub fn for_region(region: Region) -> Self {
        match region {
            Region::Us => Self {
                weekday: Weekday::Tue,
                hour_utc: 15,
            },
            Region::Eu => Self {
                weekday: Weekday::Wed,
                hour_utc: 4,
            },
        }
    }

    fn reset_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour_utc.min(23)), 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl std::fmt::Display for ResetSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:02}:00 UTC", self.weekday, self.hour_utc)
    }
}

/// Time left in a period, floored to whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRemaining {
    pub days: i64,
    pub hours: i64,
}

impl std::fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d {}h", self.days, self.hours)
    }
}

/// Pure period arithmetic over a reset schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodCalculator {
    schedule: ResetSchedule,
}

impl PeriodCalculator {
    /// Create a calculator for the given schedule.
    pub fn new(schedule: ResetSchedule) -> Self {
        Self { schedule }
    }

    /// The schedule this calculator works against.
    pub fn schedule(&self) -> ResetSchedule {
        self.schedule
    }

    /// Most recent reset instant that is at or before `now`.
    pub fn canonical_period_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let days_back = (7 + today.weekday().num_days_from_monday()
            - self.schedule.weekday.num_days_from_monday())
            % 7;
        let reset_date = today - Duration::days(i64::from(days_back));
        let candidate = Utc.from_utc_datetime(&reset_date.and_time(self.schedule.reset_time()));

        if candidate > now {
            candidate - Duration::days(PERIOD_LENGTH_DAYS)
        } else {
            candidate
        }
    }

    /// Whether a stored period start no longer matches the current period.
    pub fn is_stale(&self, stored_period_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.canonical_period_start(now) != stored_period_start
    }

    /// Start of the period after the one containing `now`.
    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.canonical_period_start(now) + Duration::days(PERIOD_LENGTH_DAYS)
    }

    /// Time until `period_start + 7 days`, never negative.
    pub fn time_remaining(&self, period_start: DateTime<Utc>, now: DateTime<Utc>) -> TimeRemaining {
        let end = period_start + Duration::days(PERIOD_LENGTH_DAYS);
        let seconds = (end - now).num_seconds().max(0);

        TimeRemaining {
            days: seconds / 86_400,
            hours: (seconds % 86_400) / 3_600,
        }
    }
}
