//! Weekly period module.
//!
//! Computes reward period boundaries:
//! - Canonical start of the current period for a reset schedule
//! - Staleness checks for stored period starts
//! - Time remaining until the next weekly reset

pub mod calculator;

// Re-exports for convenience
pub use calculator::{
    Clock, PeriodCalculator, Region, ResetSchedule, TimeRemaining, PERIOD_LENGTH_DAYS,
};
