//! Weekly activity aggregation store.
//!
//! Holds one [`CharacterWeeklyState`] per character for the current period.
//! The keyed map sits behind an `Arc` and is replaced wholesale on every
//! mutation, so a snapshot handed out by [`ActivityStore::snapshot`] never
//! changes underneath its holder.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::summary::{domain_count, VaultSummary};
use super::types::{
    ActivitySnapshot, CharacterWeeklyState, ChecklistPatch, MythicPlusPatch, MythicPlusRun,
    OwnerId, RaidPatch, WorldPatch, MAX_PROFESSIONS,
};
use crate::error::{TrackerError, TrackerResult};
use crate::events::{EventSink, ProgressDomain, StoreEvent, StoreKind};
use crate::period::{Clock, PeriodCalculator, TimeRemaining};
use crate::professions::types::ProfessionSnapshot;
use crate::storage::codec::{self, FieldKind};
use crate::storage::kv::DurableStore;
use crate::vault::thresholds::{self, VaultDomain};

/// Storage key of the activity snapshot.
pub const ACTIVITY_STORAGE_KEY: &str = "vault.activities";

const SNAPSHOT_SHAPE: &[(&str, FieldKind)] = &[
    ("activities", FieldKind::Object),
    ("currentPeriodStart", FieldKind::String),
];

/// Store for per-character weekly activity.
pub struct ActivityStore<S> {
    storage: S,
    calculator: PeriodCalculator,
    state: Arc<ActivitySnapshot>,
    events: EventSink,
    clock: Clock,
}

impl<S: DurableStore> ActivityStore<S> {
    /// Create an empty store using the system clock.
    ///
    /// Call [`ActivityStore::load_or_reset`] before accepting mutations.
    pub fn new(storage: S, calculator: PeriodCalculator) -> Self {
        Self::with_clock(storage, calculator, Box::new(Utc::now))
    }

    /// Create an empty store reading time from `clock`.
    pub fn with_clock(storage: S, calculator: PeriodCalculator, clock: Clock) -> Self {
        let period_start = calculator.canonical_period_start(clock());
        Self {
            storage,
            calculator,
            state: Arc::new(ActivitySnapshot::empty(period_start)),
            events: EventSink::disabled(),
            clock,
        }
    }

    /// Publish store events to `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<ActivitySnapshot> {
        Arc::clone(&self.state)
    }

    /// Period start every record currently belongs to.
    pub fn current_period_start(&self) -> DateTime<Utc> {
        self.state.current_period_start
    }

    /// Time left before the next weekly reset.
    pub fn time_remaining(&self) -> TimeRemaining {
        self.calculator
            .time_remaining(self.state.current_period_start, (self.clock)())
    }

    /// Weekly state for a character, if tracked.
    pub fn get(&self, owner_id: OwnerId) -> Option<CharacterWeeklyState> {
        self.state.activities.get(&owner_id).cloned()
    }

    /// Tracked characters.
    pub fn characters(&self) -> Vec<OwnerId> {
        self.state.activities.keys().copied().collect()
    }

    /// Vault overview for a character, if tracked.
    pub fn vault_summary(&self, owner_id: OwnerId) -> Option<VaultSummary> {
        self.state.activities.get(&owner_id).map(VaultSummary::from_state)
    }

    /// Create a zeroed record for the current period with the character's
    /// profession count.
    ///
    /// Does nothing if the character already has a record; use
    /// [`ActivityStore::sync_profession_counts`] to update the count later.
    pub fn initialize(
        &mut self,
        owner_id: OwnerId,
        profession_count: u8,
    ) -> TrackerResult<CharacterWeeklyState> {
        if profession_count > MAX_PROFESSIONS {
            return Err(TrackerError::validation(format!(
                "a character has at most {MAX_PROFESSIONS} professions, got {profession_count}"
            )));
        }

        let now = (self.clock)();
        let reset = self.roll_over_in_memory(now);

        let state = match self.state.activities.get(&owner_id) {
            Some(existing) => {
                let existing = existing.clone();
                if reset {
                    self.persist();
                }
                existing
            }
            None => {
                let mut fresh =
                    CharacterWeeklyState::new(owner_id, self.state.current_period_start);
                fresh.checklist.profession_count = profession_count;
                self.commit(fresh.clone(), now);
                tracing::debug!("Initialized weekly state for {}", owner_id);
                fresh
            }
        };

        if reset {
            self.announce_reset();
        }
        Ok(state)
    }

    /// Merge Mythic+ fields into a character's record.
    pub fn merge_mythic_plus(
        &mut self,
        owner_id: OwnerId,
        patch: &MythicPlusPatch,
    ) -> TrackerResult<CharacterWeeklyState> {
        self.update(owner_id, ProgressDomain::Vault(VaultDomain::MythicPlus), |state, now| {
            Ok(CharacterWeeklyState {
                mythic_plus: state.mythic_plus.merged(patch, now)?,
                ..state.clone()
            })
        })
    }

    /// Append one completed run, advancing the derived Mythic+ counters.
    pub fn record_mythic_plus_run(
        &mut self,
        owner_id: OwnerId,
        run: MythicPlusRun,
    ) -> TrackerResult<CharacterWeeklyState> {
        self.update(owner_id, ProgressDomain::Vault(VaultDomain::MythicPlus), |state, now| {
            let mut runs = state.mythic_plus.runs.clone();
            runs.push(run);
            let patch = MythicPlusPatch {
                dungeon_count: Some(state.mythic_plus.dungeon_count + 1),
                runs: Some(runs),
                ..Default::default()
            };
            Ok(CharacterWeeklyState {
                mythic_plus: state.mythic_plus.merged(&patch, now)?,
                ..state.clone()
            })
        })
    }

    /// Merge raid kill counters into a character's record.
    pub fn merge_raid(
        &mut self,
        owner_id: OwnerId,
        patch: &RaidPatch,
    ) -> TrackerResult<CharacterWeeklyState> {
        self.update(owner_id, ProgressDomain::Vault(VaultDomain::Raid), |state, now| {
            Ok(CharacterWeeklyState {
                raid: state.raid.merged(patch, now)?,
                ..state.clone()
            })
        })
    }

    /// Merge world progress into a character's record.
    pub fn merge_world(
        &mut self,
        owner_id: OwnerId,
        patch: &WorldPatch,
    ) -> TrackerResult<CharacterWeeklyState> {
        self.update(owner_id, ProgressDomain::Vault(VaultDomain::World), |state, now| {
            Ok(CharacterWeeklyState {
                world: state.world.merged(patch, now)?,
                ..state.clone()
            })
        })
    }

    /// Merge checklist fields into a character's record.
    pub fn merge_checklist(
        &mut self,
        owner_id: OwnerId,
        patch: &ChecklistPatch,
    ) -> TrackerResult<CharacterWeeklyState> {
        self.update(owner_id, ProgressDomain::Checklist, |state, now| {
            Ok(CharacterWeeklyState {
                checklist: state.checklist.merged(patch, now)?,
                ..state.clone()
            })
        })
    }

    /// Bring every character's checklist profession count in line with the
    /// professions recorded in `professions`.
    ///
    /// Characters missing from this store are created. A character whose
    /// finished profession quests exceed its new count is left unchanged and
    /// logged. Returns the number of records updated.
    pub fn sync_profession_counts(&mut self, professions: &ProfessionSnapshot) -> usize {
        let mut updated = 0;

        for (owner_id, state) in &professions.professions {
            let count = u8::try_from(state.professions.len()).unwrap_or(MAX_PROFESSIONS);
            let current = self
                .state
                .activities
                .get(owner_id)
                .map(|s| s.checklist.profession_count);
            if current == Some(count) {
                continue;
            }

            let patch = ChecklistPatch {
                profession_count: Some(count),
                ..Default::default()
            };
            match self.merge_checklist(*owner_id, &patch) {
                Ok(_) => updated += 1,
                Err(e) => tracing::warn!("Profession count for {} not synced: {}", owner_id, e),
            }
        }

        updated
    }

    /// Stop tracking a character. Returns false if it was not tracked.
    pub fn remove(&mut self, owner_id: OwnerId) -> bool {
        if !self.state.activities.contains_key(&owner_id) {
            return false;
        }

        let mut next = (*self.state).clone();
        next.activities.remove(&owner_id);
        next.last_updated = (self.clock)();
        self.state = Arc::new(next);
        self.persist();
        true
    }

    /// Replace every character's state with a zeroed one for the current
    /// period, in a single transition.
    pub fn reset_all_for_new_period(&mut self) -> Arc<ActivitySnapshot> {
        let now = (self.clock)();
        self.state = Arc::new(self.next_period_snapshot(now));
        self.persist();
        self.announce_reset();
        self.snapshot()
    }

    /// Load the stored snapshot, resetting it if its period has ended.
    ///
    /// A missing or malformed snapshot is a cold start with no characters.
    pub fn load_or_reset(&mut self) -> Arc<ActivitySnapshot> {
        let now = (self.clock)();
        let current_start = self.calculator.canonical_period_start(now);

        let Some(loaded) = codec::load_snapshot::<_, ActivitySnapshot>(
            &self.storage,
            ACTIVITY_STORAGE_KEY,
            SNAPSHOT_SHAPE,
        ) else {
            tracing::info!("No stored activity snapshot, starting empty");
            self.state = Arc::new(ActivitySnapshot::empty(current_start));
            return self.snapshot();
        };

        tracing::info!(
            "Loaded activity snapshot with {} characters for period {}",
            loaded.activities.len(),
            loaded.current_period_start
        );
        self.state = Arc::new(normalized(loaded));

        if self.calculator.is_stale(self.state.current_period_start, now) {
            return self.reset_all_for_new_period();
        }

        self.snapshot()
    }

    /// Write the current snapshot to storage.
    pub fn flush(&self) -> TrackerResult<()> {
        codec::persist_snapshot(&self.storage, ACTIVITY_STORAGE_KEY, &*self.state)
    }

    fn next_period_snapshot(&self, now: DateTime<Utc>) -> ActivitySnapshot {
        let period_start = self.calculator.canonical_period_start(now);

        ActivitySnapshot {
            activities: self
                .state
                .activities
                .iter()
                .map(|(owner_id, state)| (*owner_id, state.rolled_over(period_start)))
                .collect(),
            current_period_start: period_start,
            last_updated: now,
        }
    }

    /// Swap in the next period's snapshot without persisting it. Returns
    /// whether a rollover happened.
    fn roll_over_in_memory(&mut self, now: DateTime<Utc>) -> bool {
        if !self.calculator.is_stale(self.state.current_period_start, now) {
            return false;
        }
        self.state = Arc::new(self.next_period_snapshot(now));
        true
    }

    fn announce_reset(&self) {
        let period_start = self.state.current_period_start;
        let characters = self.state.activities.len();
        tracing::info!(
            "Weekly reset: {} characters moved to period starting {}",
            characters,
            period_start
        );
        self.events.emit(StoreEvent::PeriodReset {
            store: StoreKind::Activity,
            period_start,
            characters,
        });
    }

    /// Apply `apply` to the character's record.
    ///
    /// A rollover due at `now` is applied first and written together with
    /// the mutation, so each call performs at most one write.
    fn update<F>(
        &mut self,
        owner_id: OwnerId,
        domain: ProgressDomain,
        apply: F,
    ) -> TrackerResult<CharacterWeeklyState>
    where
        F: FnOnce(&CharacterWeeklyState, DateTime<Utc>) -> TrackerResult<CharacterWeeklyState>,
    {
        let now = (self.clock)();
        let reset = self.roll_over_in_memory(now);

        let current = self
            .state
            .activities
            .get(&owner_id)
            .cloned()
            .unwrap_or_else(|| {
                CharacterWeeklyState::new(owner_id, self.state.current_period_start)
            });

        let outcome = apply(&current, now).map(|state| state.touched(now));
        match &outcome {
            Ok(updated) => self.commit(updated.clone(), now),
            Err(_) if reset => self.persist(),
            Err(_) => {}
        }
        if reset {
            self.announce_reset();
        }

        let updated = outcome?;
        tracing::debug!("Updated {} progress for {}", domain, owner_id);
        self.events.emit(progress_event(&updated, domain));

        Ok(updated)
    }

    fn commit(&mut self, state: CharacterWeeklyState, now: DateTime<Utc>) {
        let mut next = (*self.state).clone();
        next.activities.insert(state.owner_id, state);
        next.last_updated = next.last_updated.max(now);
        self.state = Arc::new(next);
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Activity snapshot not saved: {}", e);
            self.events.emit(StoreEvent::PersistenceFailed {
                key: ACTIVITY_STORAGE_KEY.to_string(),
                message: e.to_string(),
            });
        }
    }
}

/// Re-derive computed fields and drop records that disagree with the
/// snapshot's period.
fn normalized(mut snapshot: ActivitySnapshot) -> ActivitySnapshot {
    let period_start = snapshot.current_period_start;

    snapshot.activities = snapshot
        .activities
        .into_iter()
        .map(|(owner_id, state)| {
            let state = if state.owner_id == owner_id
                && state.period_start == period_start
                && state.is_consistent()
            {
                state.recomputed()
            } else {
                tracing::warn!("Stored state for {} has a mismatched period, zeroing", owner_id);
                CharacterWeeklyState::new(owner_id, period_start)
            };
            (owner_id, state)
        })
        .collect();

    snapshot
}

fn progress_event(state: &CharacterWeeklyState, domain: ProgressDomain) -> StoreEvent {
    let (slots, progress) = match domain {
        ProgressDomain::Vault(vault) => {
            let count = domain_count(state, vault);
            (
                Some(thresholds::slots_earned(count, vault.thresholds())),
                thresholds::progress_label(count, vault.thresholds()),
            )
        }
        _ => (
            None,
            format!(
                "{}/{}",
                state.checklist.completed_tasks(),
                state.checklist.total_tasks()
            ),
        ),
    };

    StoreEvent::Progress {
        owner_id: state.owner_id,
        domain,
        slots,
        progress,
    }
}
