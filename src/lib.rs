//! VaultTrack - Weekly Vault Progress Tracker
//!
//! Tracks per-character weekly progress toward the three vault reward
//! domains (raid, Mythic+ dungeons, world activities), the weekly checklist,
//! and profession knowledge. All progress resets automatically at the fixed
//! weekly reset instant; one-time profession items survive the reset.

pub mod activity;
pub mod error;
pub mod events;
pub mod period;
pub mod professions;
pub mod storage;
pub mod vault;

// Re-export commonly used types
pub use activity::store::ActivityStore;
pub use error::{TrackerError, TrackerResult};
pub use events::{EventSink, StoreEvent};
pub use period::{PeriodCalculator, ResetSchedule};
pub use professions::store::ProfessionStore;
pub use storage::config::AppConfig;
pub use storage::kv::{DurableStore, KvStore};
