//! Profession knowledge type definitions.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::types::{OwnerId, MAX_PROFESSIONS};
use crate::error::{TrackerError, TrackerResult};

/// Identifier of a collectible or purchasable knowledge item.
pub type ItemId = String;

/// A character profession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Profession {
    Alchemy,
    Blacksmithing,
    Enchanting,
    Engineering,
    Herbalism,
    Inscription,
    Jewelcrafting,
    Leatherworking,
    Mining,
    Skinning,
    Tailoring,
}

impl Profession {
    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Profession::Alchemy => "Alchemy",
            Profession::Blacksmithing => "Blacksmithing",
            Profession::Enchanting => "Enchanting",
            Profession::Engineering => "Engineering",
            Profession::Herbalism => "Herbalism",
            Profession::Inscription => "Inscription",
            Profession::Jewelcrafting => "Jewelcrafting",
            Profession::Leatherworking => "Leatherworking",
            Profession::Mining => "Mining",
            Profession::Skinning => "Skinning",
            Profession::Tailoring => "Tailoring",
        }
    }

    /// Whether knowledge is earned by harvesting in the world.
    pub fn is_gathering(&self) -> bool {
        matches!(
            self,
            Profession::Herbalism | Profession::Mining | Profession::Skinning
        )
    }

    /// Weekly harvesting point cap before overrides (0 for crafting).
    pub fn default_harvesting_cap(&self) -> u32 {
        match self {
            Profession::Herbalism | Profession::Mining => 5,
            Profession::Skinning => 4,
            _ => 0,
        }
    }
}

impl std::fmt::Display for Profession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Knowledge progress for one profession on one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionKnowledge {
    pub profession: Profession,
    /// Weekly knowledge quest turned in
    pub weekly_quest_done: bool,
    /// Knowledge points harvested this week
    pub harvesting_points: u32,
    /// Weekly cap on harvested points
    pub harvesting_cap: u32,
    /// One-time treasures found (kept across weeks)
    #[serde(default)]
    pub collectibles_obtained: BTreeSet<ItemId>,
    /// One-time vendor purchases made (kept across weeks)
    #[serde(default)]
    pub buyables_obtained: BTreeSet<ItemId>,
}

impl ProfessionKnowledge {
    /// Fresh knowledge entry with the given cap.
    pub fn new(profession: Profession, harvesting_cap: u32) -> Self {
        Self {
            profession,
            weekly_quest_done: false,
            harvesting_points: 0,
            harvesting_cap,
            collectibles_obtained: BTreeSet::new(),
            buyables_obtained: BTreeSet::new(),
        }
    }

    /// Apply a patch. Harvesting points are clamped to the cap.
    pub fn merged(&self, patch: &ProfessionPatch) -> TrackerResult<Self> {
        let mut next = self.clone();

        if let Some(done) = patch.weekly_quest_done {
            next.weekly_quest_done = done;
        }
        if let Some(points) = patch.harvesting_points {
            let points = points.min(self.harvesting_cap);
            if points < self.harvesting_points {
                return Err(TrackerError::validation(format!(
                    "harvestingPoints cannot decrease within a period ({} -> {})",
                    self.harvesting_points, points
                )));
            }
            next.harvesting_points = points;
        }

        Ok(next)
    }

    /// Entry for a new period: weekly fields cleared, one-time items kept.
    pub fn rolled_over(&self) -> Self {
        Self {
            weekly_quest_done: false,
            harvesting_points: 0,
            ..self.clone()
        }
    }

    /// Apply a new cap, clamping current points to it.
    pub fn with_cap(mut self, cap: u32) -> Self {
        self.harvesting_cap = cap;
        self.harvesting_points = self.harvesting_points.min(cap);
        self
    }

    /// Progress text for notifications.
    pub fn progress_label(&self) -> String {
        let quest = u32::from(self.weekly_quest_done);
        if self.harvesting_cap > 0 {
            format!(
                "quest {}/1, harvesting {}/{}",
                quest, self.harvesting_points, self.harvesting_cap
            )
        } else {
            format!("quest {}/1", quest)
        }
    }
}

/// Profession knowledge for one character in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProfessionState {
    pub owner_id: OwnerId,
    pub period_start: DateTime<Utc>,
    pub professions: Vec<ProfessionKnowledge>,
    pub last_updated: DateTime<Utc>,
}

impl CharacterProfessionState {
    /// Empty state for a character.
    pub fn new(owner_id: OwnerId, period_start: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            period_start,
            professions: Vec::new(),
            last_updated: period_start,
        }
    }

    /// Knowledge entry for a profession, if the character has it.
    pub fn profession(&self, profession: Profession) -> Option<&ProfessionKnowledge> {
        self.professions.iter().find(|p| p.profession == profession)
    }

    /// State with `profession` added, failing when both slots are taken.
    pub fn with_profession(&self, profession: Profession, cap: u32) -> TrackerResult<Self> {
        if self.profession(profession).is_some() {
            return Ok(self.clone());
        }
        if self.professions.len() >= usize::from(MAX_PROFESSIONS) {
            return Err(TrackerError::validation(format!(
                "character already has {MAX_PROFESSIONS} professions, cannot add {profession}"
            )));
        }

        let mut next = self.clone();
        next.professions.push(ProfessionKnowledge::new(profession, cap));
        Ok(next)
    }

    /// State with the entry for `profession` replaced by `update(entry)`.
    pub fn map_profession<F>(&self, profession: Profession, update: F) -> TrackerResult<Self>
    where
        F: FnOnce(&ProfessionKnowledge) -> TrackerResult<ProfessionKnowledge>,
    {
        let index = self
            .professions
            .iter()
            .position(|p| p.profession == profession)
            .ok_or_else(|| {
                TrackerError::validation(format!("character does not have {profession}"))
            })?;

        let mut next = self.clone();
        next.professions[index] = update(&self.professions[index])?;
        Ok(next)
    }

    /// State for a new period, keeping one-time items.
    pub fn rolled_over(&self, period_start: DateTime<Utc>) -> Self {
        Self {
            owner_id: self.owner_id,
            period_start,
            professions: self.professions.iter().map(ProfessionKnowledge::rolled_over).collect(),
            last_updated: period_start,
        }
    }
}

/// Partial update for one profession.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfessionPatch {
    pub weekly_quest_done: Option<bool>,
    pub harvesting_points: Option<u32>,
}

/// Persisted profession snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionSnapshot {
    pub professions: BTreeMap<OwnerId, CharacterProfessionState>,
    pub current_period_start: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Per-profession cap overrides
    #[serde(default)]
    pub harvesting_caps: BTreeMap<Profession, u32>,
    /// Collectibles that may be recorded, per profession
    #[serde(default)]
    pub available_collectibles: BTreeMap<Profession, BTreeSet<ItemId>>,
    /// Buyables that may be recorded, per profession
    #[serde(default)]
    pub available_buyables: BTreeMap<Profession, BTreeSet<ItemId>>,
}

impl ProfessionSnapshot {
    /// Snapshot with no characters and no policy overrides.
    pub fn empty(period_start: DateTime<Utc>) -> Self {
        Self {
            professions: BTreeMap::new(),
            current_period_start: period_start,
            last_updated: period_start,
            harvesting_caps: BTreeMap::new(),
            available_collectibles: BTreeMap::new(),
            available_buyables: BTreeMap::new(),
        }
    }

    /// Effective harvesting cap for a profession.
    pub fn harvesting_cap(&self, profession: Profession) -> u32 {
        self.harvesting_caps
            .get(&profession)
            .copied()
            .unwrap_or_else(|| profession.default_harvesting_cap())
    }
}
