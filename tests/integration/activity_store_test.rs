//! Integration tests for the weekly activity store.
//!
//! Tests persistence round-trips, automatic weekly reset on load, and the
//! vault reward scenarios end to end.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use tempfile::tempdir;
use uuid::Uuid;

use vaulttrack::activity::{
    ActivitySnapshot, ActivityStore, ChecklistPatch, MythicPlusRun, RaidPatch, WorldPatch,
    ACTIVITY_STORAGE_KEY,
};
use vaulttrack::events::{EventSink, StoreEvent};
use vaulttrack::period::PeriodCalculator;
use vaulttrack::storage::codec::{self, FieldKind};
use vaulttrack::storage::{DurableStore, KvStore};
use vaulttrack::vault::{MythicPlusSlotReward, RaidDifficulty, RewardQuality, VaultDomain};

const SNAPSHOT_FIELDS: &[(&str, FieldKind)] = &[
    ("activities", FieldKind::Object),
    ("currentPeriodStart", FieldKind::String),
];

fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn store_at<S: DurableStore>(storage: S, now: DateTime<Utc>) -> ActivityStore<S> {
    ActivityStore::with_clock(storage, PeriodCalculator::default(), Box::new(move || now))
}

/// Backing store whose writes always fail.
struct FailingStore;

impl DurableStore for FailingStore {
    fn get_raw(&self, _key: &str) -> Option<String> {
        None
    }

    fn set_raw(&self, _key: &str, _json: &str) -> bool {
        false
    }

    fn remove(&self, _key: &str) -> bool {
        false
    }
}

#[test]
fn test_snapshot_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    let now = utc(2026, 10, 15, 12);
    let owner = Uuid::new_v4();

    {
        let mut store = store_at(KvStore::open(&path).unwrap(), now);
        store.load_or_reset();
        store
            .merge_raid(
                owner,
                &RaidPatch {
                    heroic: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .merge_checklist(
                owner,
                &ChecklistPatch {
                    world_boss_done: Some(true),
                    spark_fragments: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let mut reopened = store_at(KvStore::open(&path).unwrap(), now + Duration::hours(2));
    let snapshot = reopened.load_or_reset();

    let state = &snapshot.activities[&owner];
    assert_eq!(state.raid.heroic, 3);
    assert_eq!(state.raid.slot_state(), [true, false, false]);
    assert!(state.checklist.world_boss_done);
    assert_eq!(state.checklist.spark_fragments, 1);
    assert_eq!(snapshot.current_period_start, utc(2026, 10, 13, 15));
}

#[test]
fn test_stale_snapshot_resets_exactly_once_on_load() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    let owners = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

    // Written during the week starting Tuesday 2026-10-06
    let mut old = store_at(Rc::clone(&storage), utc(2026, 10, 7, 10));
    for owner in owners {
        old.merge_world(
            owner,
            &WorldPatch {
                qualifying_wins: Some(7),
            },
        )
        .unwrap();
    }
    drop(old);

    let (events, rx) = EventSink::channel();
    let mut store = store_at(Rc::clone(&storage), utc(2026, 10, 14, 16)).with_events(events);
    let snapshot = store.load_or_reset();

    let resets = rx
        .try_iter()
        .filter(|e| matches!(e, StoreEvent::PeriodReset { characters: 3, .. }))
        .count();
    assert_eq!(resets, 1);

    assert_eq!(snapshot.current_period_start, utc(2026, 10, 13, 15));
    assert_eq!(snapshot.activities.len(), 3);
    for owner in owners {
        let state = &snapshot.activities[&owner];
        assert_eq!(state.world.qualifying_wins, 0);
        assert_eq!(state.period_start, snapshot.current_period_start);
        assert!(state.is_consistent());
    }

    // A second load in the same period is a no-op
    store.load_or_reset();
    assert_eq!(rx.try_iter().count(), 0);
}

#[test]
fn test_invalid_snapshot_shape_is_cold_start() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    storage.set(
        ACTIVITY_STORAGE_KEY,
        &json!({ "activities": [], "currentPeriodStart": "2026-10-13T15:00:00Z" }),
    );

    let mut store = store_at(Rc::clone(&storage), utc(2026, 10, 15, 12));
    let snapshot = store.load_or_reset();
    assert!(snapshot.activities.is_empty());
    assert_eq!(snapshot.current_period_start, utc(2026, 10, 13, 15));

    storage.set(
        ACTIVITY_STORAGE_KEY,
        &json!({ "activities": {}, "currentPeriodStart": "last tuesday" }),
    );
    assert!(store.load_or_reset().activities.is_empty());
}

#[test]
fn test_persistence_failure_keeps_state_and_notifies() {
    let (events, rx) = EventSink::channel();
    let mut store = store_at(FailingStore, utc(2026, 10, 15, 12)).with_events(events);
    let owner = Uuid::new_v4();

    let state = store
        .merge_raid(
            owner,
            &RaidPatch {
                normal: Some(2),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(state.raid.normal, 2);
    assert_eq!(store.get(owner).unwrap().raid.normal, 2);
    assert!(rx.try_iter().any(|e| matches!(
        e,
        StoreEvent::PersistenceFailed { ref key, .. } if key == ACTIVITY_STORAGE_KEY
    )));
    assert!(store.flush().is_err());
}

#[test]
fn test_mythic_plus_slot_rewards_scenario() {
    let (events, rx) = EventSink::channel();
    let mut store = store_at(KvStore::open_in_memory().unwrap(), utc(2026, 10, 15, 12))
        .with_events(events);
    let owner = Uuid::new_v4();
    let base = utc(2026, 10, 14, 18);

    for (i, level) in [15, 12, 10, 9, 9].into_iter().enumerate() {
        let run = MythicPlusRun::new(level, base + Duration::hours(i as i64)).in_time(true);
        store.record_mythic_plus_run(owner, run).unwrap();
    }

    let state = store.get(owner).unwrap();
    assert_eq!(state.mythic_plus.dungeon_count, 5);
    assert_eq!(state.mythic_plus.highest_key_level, 15);
    assert_eq!(state.mythic_plus.slot_state(), [true, true, false]);

    let summary = store.vault_summary(owner).unwrap();
    assert_eq!(summary.domain(VaultDomain::MythicPlus).unwrap().slots, 2);
    assert_eq!(
        summary.mythic_plus_rewards,
        [
            Some(MythicPlusSlotReward {
                key_level: 15,
                quality: RewardQuality::High,
            }),
            Some(MythicPlusSlotReward {
                key_level: 9,
                quality: RewardQuality::Standard,
            }),
            None,
        ]
    );

    let last = rx.try_iter().last().unwrap();
    assert_eq!(
        last,
        StoreEvent::Progress {
            owner_id: owner,
            domain: vaulttrack::events::ProgressDomain::Vault(VaultDomain::MythicPlus),
            slots: Some(2),
            progress: "5/8".to_string(),
        }
    );
}

#[test]
fn test_raid_scenario() {
    let mut store = store_at(KvStore::open_in_memory().unwrap(), utc(2026, 10, 15, 12));
    let owner = Uuid::new_v4();

    store
        .merge_raid(
            owner,
            &RaidPatch {
                normal: Some(4),
                heroic: Some(6),
                mythic: Some(2),
                ..Default::default()
            },
        )
        .unwrap();

    let summary = store.vault_summary(owner).unwrap();
    let raid = summary.domain(VaultDomain::Raid).unwrap();
    assert_eq!(raid.slots, 3);
    assert_eq!(raid.next_milestone.target, 6);
    assert_eq!(raid.next_milestone.remaining, 0);
    assert_eq!(summary.raid_rewards[0], Some(RaidDifficulty::Mythic));
}

#[test]
fn test_decreasing_counter_rejected() {
    let mut store = store_at(KvStore::open_in_memory().unwrap(), utc(2026, 10, 15, 12));
    let owner = Uuid::new_v4();

    store
        .merge_world(
            owner,
            &WorldPatch {
                qualifying_wins: Some(4),
            },
        )
        .unwrap();
    let result = store.merge_world(
        owner,
        &WorldPatch {
            qualifying_wins: Some(2),
        },
    );

    assert!(result.is_err());
    assert_eq!(store.get(owner).unwrap().world.qualifying_wins, 4);
}

#[test]
fn test_reset_keeps_every_character() {
    let now = Rc::new(Cell::new(utc(2026, 10, 15, 12)));
    let clock = Rc::clone(&now);
    let mut store = ActivityStore::with_clock(
        KvStore::open_in_memory().unwrap(),
        PeriodCalculator::default(),
        Box::new(move || clock.get()),
    );

    let owners: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    for (i, owner) in owners.iter().enumerate() {
        store.initialize(*owner, 2).unwrap();
        let kills = 2 * (i as u32 + 1);
        store
            .merge_raid(
                *owner,
                &RaidPatch {
                    heroic: Some(kills),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .merge_world(
                *owner,
                &WorldPatch {
                    qualifying_wins: Some(kills * 2),
                },
            )
            .unwrap();
        store
            .record_mythic_plus_run(*owner, MythicPlusRun::new(12, utc(2026, 10, 15, 12)))
            .unwrap();
        assert!(store.vault_summary(*owner).unwrap().total_slots() > 0);
    }

    now.set(utc(2026, 10, 21, 9));
    let snapshot = store.reset_all_for_new_period();

    assert_eq!(snapshot.current_period_start, utc(2026, 10, 20, 15));
    let mut kept: Vec<Uuid> = snapshot.activities.keys().copied().collect();
    let mut expected = owners.clone();
    kept.sort();
    expected.sort();
    assert_eq!(kept, expected);
    assert!(snapshot
        .activities
        .values()
        .all(|s| s.period_start == snapshot.current_period_start));

    for owner in &owners {
        let summary = store.vault_summary(*owner).unwrap();
        assert_eq!(summary.total_slots(), 0);
        assert!(summary.domains.iter().all(|d| d.slots == 0 && d.count == 0));
        assert_eq!(summary.checklist_done, 0);
    }
}

#[test]
fn test_snapshot_round_trips_through_storage() {
    let now = utc(2026, 10, 15, 12) + Duration::nanoseconds(123_456_789);
    let mut store = store_at(KvStore::open_in_memory().unwrap(), now);
    let owner = Uuid::new_v4();

    store.initialize(owner, 1).unwrap();
    for (i, level) in [15, 12, 10, 9, 9, 8].into_iter().enumerate() {
        let finished = utc(2026, 10, 14, 18) + Duration::milliseconds(61_017 * (i as i64 + 1));
        let run = MythicPlusRun::new(level, finished)
            .with_dungeon(format!("Dungeon {i}"))
            .in_time(i % 2 == 0);
        store.record_mythic_plus_run(owner, run).unwrap();
    }
    store
        .merge_raid(
            owner,
            &RaidPatch {
                lfr: Some(1),
                normal: Some(2),
                heroic: Some(3),
                mythic: Some(1),
            },
        )
        .unwrap();
    store
        .merge_world(
            owner,
            &WorldPatch {
                qualifying_wins: Some(11),
            },
        )
        .unwrap();
    store
        .merge_checklist(
            owner,
            &ChecklistPatch {
                world_boss_done: Some(true),
                spark_fragments: Some(2),
                profession_quests_done: Some(1),
                bonus_event_done: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
    store.initialize(Uuid::new_v4(), 0).unwrap();

    let original = store.snapshot();
    assert_eq!(
        original.activities[&owner].mythic_plus.average_key_level,
        Some(10.5)
    );

    let storage = KvStore::open_in_memory().unwrap();
    codec::persist_snapshot(&storage, ACTIVITY_STORAGE_KEY, &*original).unwrap();
    let revived: ActivitySnapshot =
        codec::load_snapshot(&storage, ACTIVITY_STORAGE_KEY, SNAPSHOT_FIELDS).unwrap();

    assert_eq!(revived, *original);
    assert_eq!(revived.last_updated, now);
}
