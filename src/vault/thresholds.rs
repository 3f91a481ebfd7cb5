//! Threshold arithmetic shared by every vault domain.
//!
//! Every domain has the same shape: an ascending list of activity counts,
//! one per vault slot. The functions here take the table explicitly so the
//! same code serves raid, Mythic+ and world progress.

use serde::{Deserialize, Serialize};

/// Number of vault slots per domain.
pub const SLOT_COUNT: usize = 3;

/// Dungeon completions needed for each Mythic+ slot.
pub const MYTHIC_PLUS_THRESHOLDS: [u32; SLOT_COUNT] = [1, 4, 8];

/// Boss kills needed for each raid slot.
pub const RAID_THRESHOLDS: [u32; SLOT_COUNT] = [2, 4, 6];

/// Qualifying wins needed for each world slot.
pub const WORLD_THRESHOLDS: [u32; SLOT_COUNT] = [5, 10, 15];

/// Derived per-slot unlock flags.
pub type SlotState = [bool; SLOT_COUNT];

/// One of the independently thresholded activity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VaultDomain {
    /// Raid boss kills
    Raid,
    /// Mythic+ dungeon completions
    MythicPlus,
    /// Qualifying wins in the open world
    World,
}

impl VaultDomain {
    /// All domains in display order.
    pub const ALL: [VaultDomain; 3] = [
        VaultDomain::Raid,
        VaultDomain::MythicPlus,
        VaultDomain::World,
    ];

    /// Threshold table for this domain.
    pub fn thresholds(&self) -> &'static [u32; SLOT_COUNT] {
        match self {
            VaultDomain::Raid => &RAID_THRESHOLDS,
            VaultDomain::MythicPlus => &MYTHIC_PLUS_THRESHOLDS,
            VaultDomain::World => &WORLD_THRESHOLDS,
        }
    }

    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            VaultDomain::Raid => "Raid",
            VaultDomain::MythicPlus => "Mythic+",
            VaultDomain::World => "World",
        }
    }
}

impl std::fmt::Display for VaultDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Distance to the next unmet threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Threshold being worked toward
    pub target: u32,
    /// Activity still needed (0 once every threshold is met)
    pub remaining: u32,
}

/// Number of thresholds met by `count`.
pub fn slots_earned(count: u32, thresholds: &[u32]) -> usize {
    thresholds.iter().filter(|&&t| count >= t).count()
}

/// Unlock flags for every slot in the table.
pub fn slot_state(count: u32, thresholds: &[u32; SLOT_COUNT]) -> SlotState {
    thresholds.map(|t| count >= t)
}

/// Progress toward the next unmet threshold, in whole percent.
///
/// Returns 100 once every threshold is met.
pub fn percentage(count: u32, thresholds: &[u32]) -> u8 {
    match next_unmet(count, thresholds) {
        Some(0) | None => 100,
        Some(target) => {
            let pct = (f64::from(count) / f64::from(target) * 100.0).round();
            pct.clamp(0.0, 100.0) as u8
        }
    }
}

/// The smallest unmet threshold and the gap to it.
pub fn next_milestone(count: u32, thresholds: &[u32]) -> Milestone {
    match next_unmet(count, thresholds) {
        Some(target) => Milestone {
            target,
            remaining: target - count,
        },
        None => Milestone {
            target: thresholds.last().copied().unwrap_or(0),
            remaining: 0,
        },
    }
}

/// Human-readable "current/required" label used by notifications.
pub fn progress_label(count: u32, thresholds: &[u32]) -> String {
    format!("{}/{}", count, next_milestone(count, thresholds).target)
}

fn next_unmet(count: u32, thresholds: &[u32]) -> Option<u32> {
    thresholds.iter().copied().find(|&t| count < t)
}
