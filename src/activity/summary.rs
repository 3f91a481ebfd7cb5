//! Derived vault overview for a character.

use chrono::{DateTime, Utc};

use super::types::{CharacterWeeklyState, OwnerId};
use crate::vault::rewards::{
    mythic_plus_slot_rewards, raid_slot_rewards, MythicPlusSlotReward, RaidDifficulty,
};
use crate::vault::thresholds::{self, Milestone, SlotState, VaultDomain, SLOT_COUNT};

/// Threshold state of one vault domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSummary {
    pub domain: VaultDomain,
    /// Raw activity count the thresholds apply to
    pub count: u32,
    pub slots: usize,
    pub percentage: u8,
    pub next_milestone: Milestone,
    pub slot_state: SlotState,
}

impl DomainSummary {
    /// Compute the summary for `count` against the domain's table.
    pub fn for_count(domain: VaultDomain, count: u32) -> Self {
        let table = domain.thresholds();
        Self {
            domain,
            count,
            slots: thresholds::slots_earned(count, table),
            percentage: thresholds::percentage(count, table),
            next_milestone: thresholds::next_milestone(count, table),
            slot_state: thresholds::slot_state(count, table),
        }
    }

    /// "current/required" progress text.
    pub fn progress_label(&self) -> String {
        thresholds::progress_label(self.count, self.domain.thresholds())
    }
}

/// Everything the vault screen needs for one character.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultSummary {
    pub owner_id: OwnerId,
    pub period_start: DateTime<Utc>,
    pub domains: Vec<DomainSummary>,
    pub mythic_plus_rewards: [Option<MythicPlusSlotReward>; SLOT_COUNT],
    pub raid_rewards: [Option<RaidDifficulty>; SLOT_COUNT],
    pub checklist_done: u32,
    pub checklist_total: u32,
}

impl VaultSummary {
    /// Derive the summary from a character's weekly state.
    pub fn from_state(state: &CharacterWeeklyState) -> Self {
        Self {
            owner_id: state.owner_id,
            period_start: state.period_start,
            domains: VaultDomain::ALL
                .iter()
                .map(|&domain| DomainSummary::for_count(domain, domain_count(state, domain)))
                .collect(),
            mythic_plus_rewards: mythic_plus_slot_rewards(
                state.mythic_plus.dungeon_count,
                &state.mythic_plus.runs,
            ),
            raid_rewards: raid_slot_rewards(&state.raid),
            checklist_done: state.checklist.completed_tasks(),
            checklist_total: state.checklist.total_tasks(),
        }
    }

    /// Summary for a single domain.
    pub fn domain(&self, domain: VaultDomain) -> Option<&DomainSummary> {
        self.domains.iter().find(|d| d.domain == domain)
    }

    /// Vault slots earned across every domain.
    pub fn total_slots(&self) -> usize {
        self.domains.iter().map(|d| d.slots).sum()
    }
}

/// Raw count the domain's thresholds apply to.
pub fn domain_count(state: &CharacterWeeklyState, domain: VaultDomain) -> u32 {
    match domain {
        VaultDomain::Raid => state.raid.total_kills(),
        VaultDomain::MythicPlus => state.mythic_plus.dungeon_count,
        VaultDomain::World => state.world.qualifying_wins,
    }
}
