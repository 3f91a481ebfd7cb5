//! Profession knowledge module.
//!
//! Tracks each character's (at most two) professions: weekly knowledge
//! quests and harvesting points, plus one-time collectibles and vendor
//! purchases that survive the weekly reset.

pub mod store;
pub mod types;

// Re-exports for convenience
pub use store::{ItemKind, ProfessionStore, PROFESSION_STORAGE_KEY};
pub use types::{
    CharacterProfessionState, ItemId, Profession, ProfessionKnowledge, ProfessionPatch,
    ProfessionSnapshot,
};
