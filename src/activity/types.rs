//! Weekly activity record definitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TrackerError, TrackerResult};
use crate::vault::thresholds::{
    self, SlotState, MYTHIC_PLUS_THRESHOLDS, RAID_THRESHOLDS, WORLD_THRESHOLDS,
};

/// Character identifier.
pub type OwnerId = Uuid;

/// Highest number of spark fragments a character can hold.
pub const MAX_SPARK_FRAGMENTS: u8 = 2;

/// Highest number of professions a character can have.
pub const MAX_PROFESSIONS: u8 = 2;

/// Fields shared by every weekly sub-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRecord {
    /// Character this record belongs to
    pub owner_id: OwnerId,
    /// Start of the reward period the record counts toward
    pub period_start: DateTime<Utc>,
    /// Last time the record changed
    pub last_updated: DateTime<Utc>,
}

impl WeeklyRecord {
    /// Create a record for a period.
    pub fn new(owner_id: OwnerId, period_start: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            period_start,
            last_updated: period_start,
        }
    }

    /// Record with `last_updated` advanced to `now`, never moving backwards.
    pub fn touched(&self, now: DateTime<Utc>) -> Self {
        Self {
            last_updated: self.last_updated.max(now),
            ..self.clone()
        }
    }
}

/// A single completed Mythic+ dungeon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MythicPlusRun {
    /// Keystone level
    pub key_level: u32,
    /// Dungeon name, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dungeon_name: Option<String>,
    /// Whether the run beat the timer, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_in_time: Option<bool>,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
}

impl MythicPlusRun {
    /// Create a run with only a key level and completion time.
    pub fn new(key_level: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            key_level,
            dungeon_name: None,
            completed_in_time: None,
            timestamp,
        }
    }

    /// Set the dungeon name.
    pub fn with_dungeon(mut self, name: impl Into<String>) -> Self {
        self.dungeon_name = Some(name.into());
        self
    }

    /// Set whether the run was timed.
    pub fn in_time(mut self, in_time: bool) -> Self {
        self.completed_in_time = Some(in_time);
        self
    }
}

/// Weekly Mythic+ progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MythicPlusProgress {
    #[serde(flatten)]
    pub record: WeeklyRecord,
    pub dungeon_count: u32,
    pub highest_key_level: u32,
    #[serde(default)]
    pub average_key_level: Option<f64>,
    #[serde(default)]
    pub in_time_run_count: Option<u32>,
    #[serde(default)]
    pub runs: Vec<MythicPlusRun>,
    pub(crate) slot_state: SlotState,
}

impl MythicPlusProgress {
    /// Zeroed progress for a period.
    pub fn empty(owner_id: OwnerId, period_start: DateTime<Utc>) -> Self {
        Self {
            record: WeeklyRecord::new(owner_id, period_start),
            dungeon_count: 0,
            highest_key_level: 0,
            average_key_level: None,
            in_time_run_count: None,
            runs: Vec::new(),
            slot_state: [false; 3],
        }
    }

    /// Derived slot unlock flags.
    pub fn slot_state(&self) -> SlotState {
        self.slot_state
    }

    /// Apply a patch, returning the updated progress.
    pub fn merged(&self, patch: &MythicPlusPatch, now: DateTime<Utc>) -> TrackerResult<Self> {
        let mut next = self.clone();

        if let Some(count) = patch.dungeon_count {
            ensure_not_lower("dungeonCount", self.dungeon_count, count)?;
            next.dungeon_count = count;
        }
        if let Some(level) = patch.highest_key_level {
            ensure_not_lower("highestKeyLevel", self.highest_key_level, level)?;
            next.highest_key_level = level;
        }
        if let Some(in_time) = patch.in_time_run_count {
            ensure_not_lower("inTimeRunCount", self.in_time_run_count.unwrap_or(0), in_time)?;
            next.in_time_run_count = Some(in_time);
        }
        if let Some(runs) = &patch.runs {
            if !runs.starts_with(&self.runs) {
                return Err(TrackerError::validation(
                    "runs are append-only within a period",
                ));
            }
            next.runs = runs.clone();
        }

        next.record = self.record.touched(now);
        Ok(next.recomputed())
    }

    /// Re-derive every computed field from the raw counters and runs.
    pub fn recomputed(mut self) -> Self {
        let run_count = u32::try_from(self.runs.len()).unwrap_or(u32::MAX);
        self.dungeon_count = self.dungeon_count.max(run_count);

        if let Some(best) = self.runs.iter().map(|r| r.key_level).max() {
            self.highest_key_level = self.highest_key_level.max(best);
        }

        self.average_key_level = if self.runs.is_empty() {
            None
        } else {
            let total: u64 = self.runs.iter().map(|r| u64::from(r.key_level)).sum();
            Some(total as f64 / self.runs.len() as f64)
        };

        let timed = self
            .runs
            .iter()
            .filter(|r| r.completed_in_time == Some(true))
            .count() as u32;
        if timed > 0 {
            self.in_time_run_count = Some(self.in_time_run_count.unwrap_or(0).max(timed));
        }

        self.slot_state = thresholds::slot_state(self.dungeon_count, &MYTHIC_PLUS_THRESHOLDS);
        self
    }
}

/// Weekly raid boss kills per difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidProgress {
    #[serde(flatten)]
    pub record: WeeklyRecord,
    pub lfr: u32,
    pub normal: u32,
    pub heroic: u32,
    pub mythic: u32,
    pub(crate) slot_state: SlotState,
}

impl RaidProgress {
    /// Zeroed progress for a period.
    pub fn empty(owner_id: OwnerId, period_start: DateTime<Utc>) -> Self {
        Self {
            record: WeeklyRecord::new(owner_id, period_start),
            lfr: 0,
            normal: 0,
            heroic: 0,
            mythic: 0,
            slot_state: [false; 3],
        }
    }

    /// Boss kills across all difficulties, saturating at `u32::MAX`.
    pub fn total_kills(&self) -> u32 {
        self.lfr
            .saturating_add(self.normal)
            .saturating_add(self.heroic)
            .saturating_add(self.mythic)
    }

    /// Derived slot unlock flags.
    pub fn slot_state(&self) -> SlotState {
        self.slot_state
    }

    /// Apply a patch, returning the updated progress.
    pub fn merged(&self, patch: &RaidPatch, now: DateTime<Utc>) -> TrackerResult<Self> {
        let mut next = self.clone();

        for (field, current, update, target) in [
            ("lfr", self.lfr, patch.lfr, &mut next.lfr),
            ("normal", self.normal, patch.normal, &mut next.normal),
            ("heroic", self.heroic, patch.heroic, &mut next.heroic),
            ("mythic", self.mythic, patch.mythic, &mut next.mythic),
        ] {
            if let Some(value) = update {
                ensure_not_lower(field, current, value)?;
                *target = value;
            }
        }

        next.record = self.record.touched(now);
        Ok(next.recomputed())
    }

    /// Re-derive the slot state from the kill counters.
    pub fn recomputed(mut self) -> Self {
        self.slot_state = thresholds::slot_state(self.total_kills(), &RAID_THRESHOLDS);
        self
    }
}

/// Weekly qualifying wins in the open world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldProgress {
    #[serde(flatten)]
    pub record: WeeklyRecord,
    pub qualifying_wins: u32,
    pub(crate) slot_state: SlotState,
}

impl WorldProgress {
    /// Zeroed progress for a period.
    pub fn empty(owner_id: OwnerId, period_start: DateTime<Utc>) -> Self {
        Self {
            record: WeeklyRecord::new(owner_id, period_start),
            qualifying_wins: 0,
            slot_state: [false; 3],
        }
    }

    /// Derived slot unlock flags.
    pub fn slot_state(&self) -> SlotState {
        self.slot_state
    }

    /// Apply a patch, returning the updated progress.
    pub fn merged(&self, patch: &WorldPatch, now: DateTime<Utc>) -> TrackerResult<Self> {
        let mut next = self.clone();
        if let Some(wins) = patch.qualifying_wins {
            ensure_not_lower("qualifyingWins", self.qualifying_wins, wins)?;
            next.qualifying_wins = wins;
        }
        next.record = self.record.touched(now);
        Ok(next.recomputed())
    }

    /// Re-derive the slot state from the win counter.
    pub fn recomputed(mut self) -> Self {
        self.slot_state = thresholds::slot_state(self.qualifying_wins, &WORLD_THRESHOLDS);
        self
    }
}

/// Weekly one-off tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyChecklist {
    #[serde(flatten)]
    pub record: WeeklyRecord,
    pub world_boss_done: bool,
    pub spark_fragments: u8,
    pub profession_quests_done: u8,
    pub bonus_event_done: bool,
    /// Professions the character has, bounding `profession_quests_done`
    #[serde(default = "default_profession_count")]
    pub profession_count: u8,
}

fn default_profession_count() -> u8 {
    MAX_PROFESSIONS
}

impl WeeklyChecklist {
    /// Empty checklist for a period.
    pub fn empty(owner_id: OwnerId, period_start: DateTime<Utc>) -> Self {
        Self {
            record: WeeklyRecord::new(owner_id, period_start),
            world_boss_done: false,
            spark_fragments: 0,
            profession_quests_done: 0,
            bonus_event_done: false,
            profession_count: MAX_PROFESSIONS,
        }
    }

    /// Apply a patch, returning the updated checklist.
    pub fn merged(&self, patch: &ChecklistPatch, now: DateTime<Utc>) -> TrackerResult<Self> {
        let mut next = self.clone();

        if let Some(count) = patch.profession_count {
            if count > MAX_PROFESSIONS {
                return Err(TrackerError::validation(format!(
                    "a character has at most {MAX_PROFESSIONS} professions, got {count}"
                )));
            }
            next.profession_count = count;
        }

        if let Some(done) = patch.profession_quests_done {
            ensure_not_lower("professionQuestsDone", self.profession_quests_done, done)?;
            next.profession_quests_done = done;
        }
        if next.profession_quests_done > next.profession_count {
            return Err(TrackerError::validation(format!(
                "professionQuestsDone ({}) exceeds profession count ({})",
                next.profession_quests_done, next.profession_count
            )));
        }

        if let Some(fragments) = patch.spark_fragments {
            next.spark_fragments = if fragments > MAX_SPARK_FRAGMENTS {
                tracing::debug!("Spark fragments passed cap, wrapping to 0");
                0
            } else {
                ensure_not_lower("sparkFragments", self.spark_fragments, fragments)?;
                fragments
            };
        }

        if let Some(done) = patch.world_boss_done {
            next.world_boss_done = done;
        }
        if let Some(done) = patch.bonus_event_done {
            next.bonus_event_done = done;
        }

        next.record = self.record.touched(now);
        Ok(next)
    }

    /// Checklist tasks finished this period.
    pub fn completed_tasks(&self) -> u32 {
        u32::from(self.world_boss_done)
            + u32::from(self.bonus_event_done)
            + u32::from(self.profession_quests_done)
    }

    /// Checklist tasks available this period.
    pub fn total_tasks(&self) -> u32 {
        2 + u32::from(self.profession_count)
    }
}

/// All weekly progress for one character in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterWeeklyState {
    pub owner_id: OwnerId,
    pub period_start: DateTime<Utc>,
    pub mythic_plus: MythicPlusProgress,
    pub raid: RaidProgress,
    pub world: WorldProgress,
    pub checklist: WeeklyChecklist,
    pub last_updated: DateTime<Utc>,
}

impl CharacterWeeklyState {
    /// Zeroed state for a character at the start of a period.
    pub fn new(owner_id: OwnerId, period_start: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            period_start,
            mythic_plus: MythicPlusProgress::empty(owner_id, period_start),
            raid: RaidProgress::empty(owner_id, period_start),
            world: WorldProgress::empty(owner_id, period_start),
            checklist: WeeklyChecklist::empty(owner_id, period_start),
            last_updated: period_start,
        }
    }

    /// Zeroed state for a new period that keeps the character's profession
    /// count.
    pub fn rolled_over(&self, period_start: DateTime<Utc>) -> Self {
        let mut fresh = Self::new(self.owner_id, period_start);
        fresh.checklist.profession_count = self.checklist.profession_count;
        fresh
    }

    /// Re-derive every computed field.
    pub fn recomputed(mut self) -> Self {
        self.mythic_plus = self.mythic_plus.recomputed();
        self.raid = self.raid.recomputed();
        self.world = self.world.recomputed();
        self
    }

    /// Whether every record carries the same period start as the aggregate.
    pub fn is_consistent(&self) -> bool {
        [
            &self.mythic_plus.record,
            &self.raid.record,
            &self.world.record,
            &self.checklist.record,
        ]
        .iter()
        .all(|r| r.period_start == self.period_start && r.owner_id == self.owner_id)
    }

    /// State with `last_updated` advanced to `now`, never moving backwards.
    pub(crate) fn touched(mut self, now: DateTime<Utc>) -> Self {
        self.last_updated = self.last_updated.max(now);
        self
    }
}

/// Partial update for Mythic+ progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MythicPlusPatch {
    pub dungeon_count: Option<u32>,
    pub highest_key_level: Option<u32>,
    pub in_time_run_count: Option<u32>,
    /// Full run list; must extend the stored list
    pub runs: Option<Vec<MythicPlusRun>>,
}

/// Partial update for raid kills.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaidPatch {
    pub lfr: Option<u32>,
    pub normal: Option<u32>,
    pub heroic: Option<u32>,
    pub mythic: Option<u32>,
}

/// Partial update for world progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldPatch {
    pub qualifying_wins: Option<u32>,
}

/// Partial update for the weekly checklist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecklistPatch {
    pub world_boss_done: Option<bool>,
    pub spark_fragments: Option<u8>,
    pub profession_quests_done: Option<u8>,
    pub bonus_event_done: Option<bool>,
    pub profession_count: Option<u8>,
}

/// Persisted activity snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub activities: BTreeMap<OwnerId, CharacterWeeklyState>,
    pub current_period_start: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ActivitySnapshot {
    /// Snapshot with no characters.
    pub fn empty(period_start: DateTime<Utc>) -> Self {
        Self {
            activities: BTreeMap::new(),
            current_period_start: period_start,
            last_updated: period_start,
        }
    }
}

fn ensure_not_lower<T: PartialOrd + std::fmt::Display>(
    field: &str,
    current: T,
    update: T,
) -> TrackerResult<()> {
    if update < current {
        return Err(TrackerError::validation(format!(
            "{field} cannot decrease within a period ({current} -> {update})"
        )));
    }
    Ok(())
}
