//! Weekly activity module.
//!
//! Tracks each character's progress in the current reward period:
//! - Mythic+ dungeon runs and key levels
//! - Raid boss kills per difficulty
//! - Qualifying open-world wins
//! - The weekly one-off checklist

pub mod store;
pub mod summary;
pub mod types;

// Re-exports for convenience
pub use store::{ActivityStore, ACTIVITY_STORAGE_KEY};
pub use summary::{DomainSummary, VaultSummary};
pub use types::{
    ActivitySnapshot, CharacterWeeklyState, ChecklistPatch, MythicPlusPatch, MythicPlusProgress,
    MythicPlusRun, OwnerId, RaidPatch, RaidProgress, WeeklyChecklist, WeeklyRecord, WorldPatch,
    WorldProgress,
};
