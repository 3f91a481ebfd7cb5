//! Profession knowledge store.
//!
//! Mirrors the activity store: copy-on-write snapshot, full-snapshot
//! persistence after every mutation, and the same weekly rollover. Rollover
//! here only clears weekly fields; collectibles and buyables are kept.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::types::{
    CharacterProfessionState, ItemId, Profession, ProfessionPatch, ProfessionSnapshot,
};
use crate::activity::types::{OwnerId, MAX_PROFESSIONS};
use crate::error::{TrackerError, TrackerResult};
use crate::events::{EventSink, ProgressDomain, StoreEvent, StoreKind};
use crate::period::{Clock, PeriodCalculator};
use crate::storage::codec::{self, FieldKind};
use crate::storage::kv::DurableStore;

/// Storage key of the profession snapshot.
pub const PROFESSION_STORAGE_KEY: &str = "vault.professions";

const SNAPSHOT_SHAPE: &[(&str, FieldKind)] = &[
    ("professions", FieldKind::Object),
    ("currentPeriodStart", FieldKind::String),
];

/// One-time item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Collectible,
    Buyable,
}

/// Store for per-character profession knowledge.
pub struct ProfessionStore<S> {
    storage: S,
    calculator: PeriodCalculator,
    state: Arc<ProfessionSnapshot>,
    events: EventSink,
    clock: Clock,
}

impl<S: DurableStore> ProfessionStore<S> {
    /// Create an empty store using the system clock.
    pub fn new(storage: S, calculator: PeriodCalculator) -> Self {
        Self::with_clock(storage, calculator, Box::new(Utc::now))
    }

    /// Create an empty store reading time from `clock`.
    pub fn with_clock(storage: S, calculator: PeriodCalculator, clock: Clock) -> Self {
        let period_start = calculator.canonical_period_start(clock());
        Self {
            storage,
            calculator,
            state: Arc::new(ProfessionSnapshot::empty(period_start)),
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
    pub fn snapshot(&self) -> Arc<ProfessionSnapshot> {
        Arc::clone(&self.state)
    }

    /// Period start every record currently belongs to.
    pub fn current_period_start(&self) -> DateTime<Utc> {
        self.state.current_period_start
    }

    /// Profession state for a character, if tracked.
    pub fn get(&self, owner_id: OwnerId) -> Option<CharacterProfessionState> {
        self.state.professions.get(&owner_id).cloned()
    }

    /// Tracked characters.
    pub fn characters(&self) -> Vec<OwnerId> {
        self.state.professions.keys().copied().collect()
    }

    /// Create a record with the given professions.
    ///
    /// Rejects more than two professions or duplicates. Does nothing if the
    /// character already has a record.
    pub fn initialize(
        &mut self,
        owner_id: OwnerId,
        professions: &[Profession],
    ) -> TrackerResult<CharacterProfessionState> {
        if professions.len() > usize::from(MAX_PROFESSIONS) {
            return Err(TrackerError::validation(format!(
                "a character has at most {MAX_PROFESSIONS} professions, got {}",
                professions.len()
            )));
        }
        let unique: BTreeSet<_> = professions.iter().collect();
        if unique.len() != professions.len() {
            return Err(TrackerError::validation("duplicate profession"));
        }

        let now = (self.clock)();
        let reset = self.roll_over_in_memory(now);

        let outcome = match self.state.professions.get(&owner_id) {
            Some(existing) => Ok(existing.clone()),
            None => professions.iter().try_fold(
                CharacterProfessionState::new(owner_id, self.state.current_period_start),
                |state, &profession| {
                    state.with_profession(profession, self.state.harvesting_cap(profession))
                },
            ),
        };

        let created = !self.state.professions.contains_key(&owner_id);
        match &outcome {
            Ok(fresh) if created => {
                self.commit(fresh.clone(), now);
                tracing::debug!("Initialized professions for {}: {:?}", owner_id, professions);
            }
            _ if reset => self.persist(),
            _ => {}
        }
        if reset {
            self.announce_reset();
        }

        outcome
    }

    /// Merge weekly fields for one profession.
    ///
    /// Adds the profession to the character if a slot is free.
    pub fn merge_profession(
        &mut self,
        owner_id: OwnerId,
        profession: Profession,
        patch: &ProfessionPatch,
    ) -> TrackerResult<CharacterProfessionState> {
        self.update(owner_id, profession, |state| {
            state.map_profession(profession, |knowledge| knowledge.merged(patch))
        })
    }

    /// Record a one-time collectible for a profession.
    pub fn record_collectible(
        &mut self,
        owner_id: OwnerId,
        profession: Profession,
        item_id: impl Into<ItemId>,
    ) -> TrackerResult<CharacterProfessionState> {
        self.record_item(owner_id, profession, ItemKind::Collectible, item_id.into())
    }

    /// Record a one-time vendor purchase for a profession.
    pub fn record_buyable(
        &mut self,
        owner_id: OwnerId,
        profession: Profession,
        item_id: impl Into<ItemId>,
    ) -> TrackerResult<CharacterProfessionState> {
        self.record_item(owner_id, profession, ItemKind::Buyable, item_id.into())
    }

    /// Override the weekly harvesting cap for a profession.
    ///
    /// Existing records take the new cap immediately.
    pub fn set_harvesting_cap(&mut self, profession: Profession, cap: u32) {
        let mut next = (*self.state).clone();
        next.harvesting_caps.insert(profession, cap);

        for state in next.professions.values_mut() {
            if let Some(knowledge) = state
                .professions
                .iter_mut()
                .find(|p| p.profession == profession)
            {
                *knowledge = knowledge.clone().with_cap(cap);
            }
        }

        next.last_updated = (self.clock)();
        self.state = Arc::new(next);
        tracing::info!("Harvesting cap for {} set to {}", profession, cap);
        self.persist();
    }

    /// Restrict which collectibles may be recorded for a profession.
    pub fn set_available_collectibles(&mut self, profession: Profession, items: BTreeSet<ItemId>) {
        let mut next = (*self.state).clone();
        next.available_collectibles.insert(profession, items);
        next.last_updated = (self.clock)();
        self.state = Arc::new(next);
        self.persist();
    }

    /// Restrict which buyables may be recorded for a profession.
    pub fn set_available_buyables(&mut self, profession: Profession, items: BTreeSet<ItemId>) {
        let mut next = (*self.state).clone();
        next.available_buyables.insert(profession, items);
        next.last_updated = (self.clock)();
        self.state = Arc::new(next);
        self.persist();
    }

    /// Stop tracking a character. Returns false if it was not tracked.
    pub fn remove(&mut self, owner_id: OwnerId) -> bool {
        if !self.state.professions.contains_key(&owner_id) {
            return false;
        }

        let mut next = (*self.state).clone();
        next.professions.remove(&owner_id);
        next.last_updated = (self.clock)();
        self.state = Arc::new(next);
        self.persist();
        true
    }

    /// Clear weekly fields for every character in a single transition.
    pub fn reset_all_for_new_period(&mut self) -> Arc<ProfessionSnapshot> {
        let now = (self.clock)();
        self.state = Arc::new(self.next_period_snapshot(now));
        self.persist();
        self.announce_reset();
        self.snapshot()
    }

    /// Load the stored snapshot, resetting it if its period has ended.
    pub fn load_or_reset(&mut self) -> Arc<ProfessionSnapshot> {
        let now = (self.clock)();

        let Some(loaded) = codec::load_snapshot::<_, ProfessionSnapshot>(
            &self.storage,
            PROFESSION_STORAGE_KEY,
            SNAPSHOT_SHAPE,
        ) else {
            tracing::info!("No stored profession snapshot, starting empty");
            self.state = Arc::new(ProfessionSnapshot::empty(
                self.calculator.canonical_period_start(now),
            ));
            return self.snapshot();
        };

        tracing::info!(
            "Loaded profession snapshot with {} characters for period {}",
            loaded.professions.len(),
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
        codec::persist_snapshot(&self.storage, PROFESSION_STORAGE_KEY, &*self.state)
    }

    fn record_item(
        &mut self,
        owner_id: OwnerId,
        profession: Profession,
        kind: ItemKind,
        item_id: ItemId,
    ) -> TrackerResult<CharacterProfessionState> {
        let allowed = match kind {
            ItemKind::Collectible => self.state.available_collectibles.get(&profession),
            ItemKind::Buyable => self.state.available_buyables.get(&profession),
        };
        if let Some(allowed) = allowed {
            if !allowed.contains(&item_id) {
                return Err(TrackerError::validation(format!(
                    "{item_id} is not a known {kind:?} for {profession}"
                )));
            }
        }

        self.update(owner_id, profession, |state| {
            state.map_profession(profession, |knowledge| {
                let mut next = knowledge.clone();
                match kind {
                    ItemKind::Collectible => next.collectibles_obtained.insert(item_id),
                    ItemKind::Buyable => next.buyables_obtained.insert(item_id),
                };
                Ok(next)
            })
        })
    }

    fn next_period_snapshot(&self, now: DateTime<Utc>) -> ProfessionSnapshot {
        let period_start = self.calculator.canonical_period_start(now);

        let mut next = (*self.state).clone();
        next.professions = self
            .state
            .professions
            .iter()
            .map(|(owner_id, state)| (*owner_id, state.rolled_over(period_start)))
            .collect();
        next.current_period_start = period_start;
        next.last_updated = now;
        next
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
        let characters = self.state.professions.len();
        tracing::info!(
            "Weekly profession reset: {} characters moved to period starting {}",
            characters,
            period_start
        );
        self.events.emit(StoreEvent::PeriodReset {
            store: StoreKind::Profession,
            period_start,
            characters,
        });
    }

    /// Apply `apply` to the character's record, adding `profession` first.
    ///
    /// A rollover due at `now` is written together with the mutation.
    fn update<F>(
        &mut self,
        owner_id: OwnerId,
        profession: Profession,
        apply: F,
    ) -> TrackerResult<CharacterProfessionState>
    where
        F: FnOnce(&CharacterProfessionState) -> TrackerResult<CharacterProfessionState>,
    {
        let now = (self.clock)();
        let reset = self.roll_over_in_memory(now);

        let outcome = self
            .state
            .professions
            .get(&owner_id)
            .cloned()
            .unwrap_or_else(|| {
                CharacterProfessionState::new(owner_id, self.state.current_period_start)
            })
            .with_profession(profession, self.state.harvesting_cap(profession))
            .and_then(|current| apply(&current))
            .map(|mut updated| {
                updated.last_updated = updated.last_updated.max(now);
                updated
            });

        match &outcome {
            Ok(updated) => self.commit(updated.clone(), now),
            Err(_) if reset => self.persist(),
            Err(_) => {}
        }
        if reset {
            self.announce_reset();
        }

        let updated = outcome?;
        if let Some(knowledge) = updated.profession(profession) {
            tracing::debug!("Updated {} knowledge for {}", profession, owner_id);
            self.events.emit(StoreEvent::Progress {
                owner_id,
                domain: ProgressDomain::Profession(profession),
                slots: None,
                progress: knowledge.progress_label(),
            });
        }

        Ok(updated)
    }

    fn commit(&mut self, state: CharacterProfessionState, now: DateTime<Utc>) {
        let mut next = (*self.state).clone();
        next.professions.insert(state.owner_id, state);
        next.last_updated = next.last_updated.max(now);
        self.state = Arc::new(next);
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Profession snapshot not saved: {}", e);
            self.events.emit(StoreEvent::PersistenceFailed {
                key: PROFESSION_STORAGE_KEY.to_string(),
                message: e.to_string(),
            });
        }
    }
}

/// Zero weekly fields on records whose period disagrees with the snapshot.
fn normalized(mut snapshot: ProfessionSnapshot) -> ProfessionSnapshot {
    let period_start = snapshot.current_period_start;

    for (owner_id, state) in snapshot.professions.iter_mut() {
        if state.period_start != period_start || state.owner_id != *owner_id {
            tracing::warn!(
                "Stored professions for {} have a mismatched period, clearing weekly fields",
                owner_id
            );
            *state = CharacterProfessionState {
                owner_id: *owner_id,
                ..state.rolled_over(period_start)
            };
        }
    }

    snapshot
}
