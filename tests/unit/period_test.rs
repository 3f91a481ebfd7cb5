//! Unit tests for weekly period arithmetic.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};

use vaulttrack::period::{PeriodCalculator, Region, ResetSchedule, TimeRemaining};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[test]
fn test_period_start_is_always_a_reset_instant() {
    for region in [Region::Us, Region::Eu] {
        let schedule = ResetSchedule::for_region(region);
        let calc = PeriodCalculator::new(schedule);
        let mut now = utc(2026, 10, 1, 0, 0);

        // Every 5 hours for four weeks
        while now < utc(2026, 10, 29, 0, 0) {
            let start = calc.canonical_period_start(now);
            assert_eq!(start.weekday(), schedule.weekday);
            assert_eq!(start.hour(), u32::from(schedule.hour_utc));
            assert!(start <= now);
            assert!(now - start < Duration::days(7));
            now += Duration::hours(5);
        }
    }
}

#[test]
fn test_period_changes_only_at_reset() {
    let calc = PeriodCalculator::default();
    let reset = utc(2026, 10, 20, 15, 0);

    let before = calc.canonical_period_start(reset - Duration::seconds(1));
    let after = calc.canonical_period_start(reset);
    assert_eq!(after - before, Duration::days(7));
    assert_eq!(calc.next_reset(reset - Duration::seconds(1)), reset);
}

#[test]
fn test_year_boundary() {
    let calc = PeriodCalculator::default();
    // 2027-01-01 is a Friday
    let start = calc.canonical_period_start(utc(2027, 1, 1, 8, 0));
    assert_eq!(start, utc(2026, 12, 29, 15, 0));
}

#[test]
fn test_custom_schedule() {
    let calc = PeriodCalculator::new(ResetSchedule::new(Weekday::Sun, 0).unwrap());
    let start = calc.canonical_period_start(utc(2026, 10, 15, 12, 0));
    assert_eq!(start, utc(2026, 10, 11, 0, 0));
}

#[test]
fn test_time_remaining_never_negative() {
    let calc = PeriodCalculator::default();
    let start = utc(2026, 10, 13, 15, 0);

    assert_eq!(
        calc.time_remaining(start, start),
        TimeRemaining { days: 7, hours: 0 }
    );
    assert_eq!(
        calc.time_remaining(start, start + Duration::days(30)),
        TimeRemaining { days: 0, hours: 0 }
    );
}
