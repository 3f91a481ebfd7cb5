//! Great Vault threshold module.
//!
//! Converts raw weekly activity counters into vault state:
//! - Slots earned, progress percentage and next milestone per domain
//! - Reward quality for Mythic+ slots (ranked by key level)
//! - Reward difficulty for raid slots (ranked by kill difficulty)

pub mod rewards;
pub mod thresholds;

// Re-exports for convenience
pub use rewards::{
    mythic_plus_slot_rewards, raid_kill_at, raid_slot_rewards, rank_runs, MythicPlusSlotReward,
    RaidDifficulty, RewardQuality, HIGH_TIER_KEY_LEVEL,
};
pub use thresholds::{
    Milestone, SlotState, VaultDomain, MYTHIC_PLUS_THRESHOLDS, RAID_THRESHOLDS, SLOT_COUNT,
    WORLD_THRESHOLDS,
};
