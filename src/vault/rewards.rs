//! Reward quality for earned vault slots.
//!
//! A slot's reward is decided by ranking the week's activity best-first and
//! reading the entry at the slot's threshold position: the second Mythic+
//! slot (threshold 4) looks at the 4th best run, the third raid slot
//! (threshold 6) looks at the 6th hardest kill.

use serde::{Deserialize, Serialize};

use super::thresholds::{MYTHIC_PLUS_THRESHOLDS, RAID_THRESHOLDS, SLOT_COUNT};
use crate::activity::types::{MythicPlusRun, RaidProgress};

/// Minimum key level whose run grants a high-tier reward.
pub const HIGH_TIER_KEY_LEVEL: u32 = 10;

/// Reward tier granted by a Mythic+ slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewardQuality {
    /// Key level below the high-tier line
    Standard,
    /// Key level at or above the high-tier line
    High,
}

impl RewardQuality {
    /// Quality earned by a run at `key_level`.
    pub fn for_key_level(key_level: u32) -> Self {
        if key_level >= HIGH_TIER_KEY_LEVEL {
            RewardQuality::High
        } else {
            RewardQuality::Standard
        }
    }
}

/// Reward for one Mythic+ slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MythicPlusSlotReward {
    /// Key level of the run the slot is keyed off
    pub key_level: u32,
    /// Resulting reward tier
    pub quality: RewardQuality,
}

/// Raid difficulty tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RaidDifficulty {
    Lfr,
    Normal,
    Heroic,
    Mythic,
}

impl RaidDifficulty {
    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            RaidDifficulty::Lfr => "Raid Finder",
            RaidDifficulty::Normal => "Normal",
            RaidDifficulty::Heroic => "Heroic",
            RaidDifficulty::Mythic => "Mythic",
        }
    }
}

impl std::fmt::Display for RaidDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Runs ordered best-first: key level descending, earliest timestamp on ties.
pub fn rank_runs(runs: &[MythicPlusRun]) -> Vec<&MythicPlusRun> {
    let mut ranked: Vec<&MythicPlusRun> = runs.iter().collect();
    ranked.sort_by(|a, b| {
        b.key_level
            .cmp(&a.key_level)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });
    ranked
}

/// Reward for each Mythic+ slot, `None` where the slot is not earned or no
/// run is recorded at its rank.
pub fn mythic_plus_slot_rewards(
    dungeon_count: u32,
    runs: &[MythicPlusRun],
) -> [Option<MythicPlusSlotReward>; SLOT_COUNT] {
    let ranked = rank_runs(runs);

    MYTHIC_PLUS_THRESHOLDS.map(|threshold| {
        if dungeon_count < threshold {
            return None;
        }
        ranked.get(threshold as usize - 1).map(|run| MythicPlusSlotReward {
            key_level: run.key_level,
            quality: RewardQuality::for_key_level(run.key_level),
        })
    })
}

/// Difficulty of the kill at 1-based `rank` when kills are ordered hardest
/// first, or `None` if fewer kills were recorded.
pub fn raid_kill_at(raid: &RaidProgress, rank: u32) -> Option<RaidDifficulty> {
    if rank == 0 {
        return None;
    }

    let mut covered: u64 = 0;
    for (difficulty, kills) in [
        (RaidDifficulty::Mythic, raid.mythic),
        (RaidDifficulty::Heroic, raid.heroic),
        (RaidDifficulty::Normal, raid.normal),
        (RaidDifficulty::Lfr, raid.lfr),
    ] {
        covered += u64::from(kills);
        if u64::from(rank) <= covered {
            return Some(difficulty);
        }
    }

    None
}

/// Difficulty rewarded by each raid slot, `None` where the slot is not earned.
pub fn raid_slot_rewards(raid: &RaidProgress) -> [Option<RaidDifficulty>; SLOT_COUNT] {
    RAID_THRESHOLDS.map(|threshold| raid_kill_at(raid, threshold))
}
