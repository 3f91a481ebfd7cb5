//! Integration tests for the profession knowledge store.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use vaulttrack::activity::{ActivityStore, ChecklistPatch};
use vaulttrack::error::TrackerError;
use vaulttrack::events::{EventSink, StoreEvent, StoreKind};
use vaulttrack::period::PeriodCalculator;
use vaulttrack::professions::{
    Profession, ProfessionPatch, ProfessionSnapshot, ProfessionStore, PROFESSION_STORAGE_KEY,
};
use vaulttrack::storage::codec::{self, FieldKind};
use vaulttrack::storage::KvStore;

fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn test_store(
    storage: Rc<KvStore>,
    now: DateTime<Utc>,
) -> (ProfessionStore<Rc<KvStore>>, Rc<Cell<DateTime<Utc>>>) {
    let time = Rc::new(Cell::new(now));
    let clock = Rc::clone(&time);
    let store = ProfessionStore::with_clock(
        storage,
        PeriodCalculator::default(),
        Box::new(move || clock.get()),
    );
    (store, time)
}

#[test]
fn test_reset_preserves_collectibles() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    let (mut store, time) = test_store(Rc::clone(&storage), utc(2026, 10, 15, 12));
    let owner = Uuid::new_v4();

    store
        .initialize(owner, &[Profession::Herbalism, Profession::Alchemy])
        .unwrap();
    store
        .merge_profession(
            owner,
            Profession::Herbalism,
            &ProfessionPatch {
                weekly_quest_done: Some(true),
                harvesting_points: Some(4),
            },
        )
        .unwrap();
    store
        .record_collectible(owner, Profession::Herbalism, "x")
        .unwrap();

    time.set(utc(2026, 10, 20, 15));
    let snapshot = store.reset_all_for_new_period();

    let herbalism = snapshot.professions[&owner]
        .profession(Profession::Herbalism)
        .unwrap()
        .clone();
    assert_eq!(herbalism.harvesting_points, 0);
    assert!(!herbalism.weekly_quest_done);
    assert_eq!(
        herbalism.collectibles_obtained,
        BTreeSet::from(["x".to_string()])
    );
    assert_eq!(snapshot.professions[&owner].professions.len(), 2);
}

#[test]
fn test_stale_snapshot_resets_on_load() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    let owner = Uuid::new_v4();
    {
        let (mut store, _) = test_store(Rc::clone(&storage), utc(2026, 10, 7, 10));
        store
            .merge_profession(
                owner,
                Profession::Mining,
                &ProfessionPatch {
                    harvesting_points: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        store.record_buyable(owner, Profession::Mining, "pick").unwrap();
    }

    let (events, rx) = EventSink::channel();
    let (store, _) = test_store(Rc::clone(&storage), utc(2026, 10, 15, 12));
    let mut store = store.with_events(events);
    let snapshot = store.load_or_reset();

    let mining = snapshot.professions[&owner]
        .profession(Profession::Mining)
        .unwrap();
    assert_eq!(mining.harvesting_points, 0);
    assert!(mining.buyables_obtained.contains("pick"));
    assert_eq!(snapshot.current_period_start, utc(2026, 10, 13, 15));

    let resets: Vec<StoreEvent> = rx.try_iter().collect();
    assert_eq!(resets.len(), 1);
    assert!(matches!(
        resets[0],
        StoreEvent::PeriodReset {
            store: StoreKind::Profession,
            characters: 1,
            ..
        }
    ));
}

#[test]
fn test_more_than_two_professions_rejected() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    let (mut store, _) = test_store(storage, utc(2026, 10, 15, 12));
    let owner = Uuid::new_v4();

    let result = store.initialize(
        owner,
        &[
            Profession::Mining,
            Profession::Blacksmithing,
            Profession::Engineering,
        ],
    );
    assert!(matches!(result, Err(TrackerError::Validation(_))));

    store
        .initialize(owner, &[Profession::Mining, Profession::Blacksmithing])
        .unwrap();
    let third = store.merge_profession(
        owner,
        Profession::Engineering,
        &ProfessionPatch {
            weekly_quest_done: Some(true),
            ..Default::default()
        },
    );
    assert!(matches!(third, Err(TrackerError::Validation(_))));
    assert_eq!(store.get(owner).unwrap().professions.len(), 2);
}

#[test]
fn test_allow_list_rejects_unknown_items() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    let (mut store, _) = test_store(storage, utc(2026, 10, 15, 12));
    let owner = Uuid::new_v4();

    store.set_available_collectibles(
        Profession::Skinning,
        BTreeSet::from(["hide-cache".to_string()]),
    );

    assert!(store
        .record_collectible(owner, Profession::Skinning, "mystery")
        .is_err());
    assert!(store.get(owner).is_none());

    let state = store
        .record_collectible(owner, Profession::Skinning, "hide-cache")
        .unwrap();
    assert!(state
        .profession(Profession::Skinning)
        .unwrap()
        .collectibles_obtained
        .contains("hide-cache"));

    // No list configured for buyables, anything goes
    assert!(store
        .record_buyable(owner, Profession::Skinning, "knife")
        .is_ok());
}

#[test]
fn test_policy_survives_reload() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    {
        let (mut store, _) = test_store(Rc::clone(&storage), utc(2026, 10, 15, 12));
        store.set_harvesting_cap(Profession::Herbalism, 8);
        store.set_available_buyables(
            Profession::Herbalism,
            BTreeSet::from(["sickle".to_string()]),
        );
    }

    let (mut store, _) = test_store(storage, utc(2026, 10, 16, 12));
    let snapshot = store.load_or_reset();
    assert_eq!(snapshot.harvesting_cap(Profession::Herbalism), 8);
    assert!(snapshot.available_buyables[&Profession::Herbalism].contains("sickle"));

    let state = store
        .initialize(Uuid::new_v4(), &[Profession::Herbalism])
        .unwrap();
    assert_eq!(state.professions[0].harvesting_cap, 8);
}

#[test]
fn test_profession_quests_limited_to_known_professions() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    let now = utc(2026, 10, 15, 12);
    let (mut professions, _) = test_store(Rc::clone(&storage), now);
    let mut activities = ActivityStore::with_clock(
        Rc::clone(&storage),
        PeriodCalculator::default(),
        Box::new(move || now),
    );
    let owner = Uuid::new_v4();

    professions.initialize(owner, &[Profession::Mining]).unwrap();
    assert_eq!(activities.sync_profession_counts(&professions.snapshot()), 1);
    assert_eq!(activities.get(owner).unwrap().checklist.profession_count, 1);

    let both_quests = ChecklistPatch {
        profession_quests_done: Some(2),
        ..Default::default()
    };
    assert!(matches!(
        activities.merge_checklist(owner, &both_quests),
        Err(TrackerError::Validation(_))
    ));

    let one_quest = ChecklistPatch {
        profession_quests_done: Some(1),
        ..Default::default()
    };
    assert!(activities.merge_checklist(owner, &one_quest).is_ok());

    // Already in line, nothing to do
    assert_eq!(activities.sync_profession_counts(&professions.snapshot()), 0);
}

#[test]
fn test_snapshot_round_trips_through_storage() {
    let storage = Rc::new(KvStore::open_in_memory().unwrap());
    let now = utc(2026, 10, 15, 12) + Duration::nanoseconds(987_654_321);
    let (mut store, _) = test_store(Rc::clone(&storage), now);
    let owner = Uuid::new_v4();

    store.set_harvesting_cap(Profession::Skinning, 6);
    store.set_available_collectibles(
        Profession::Skinning,
        BTreeSet::from(["hide-cache".to_string(), "bone-pile".to_string()]),
    );
    store
        .initialize(owner, &[Profession::Skinning, Profession::Leatherworking])
        .unwrap();
    store
        .merge_profession(
            owner,
            Profession::Skinning,
            &ProfessionPatch {
                weekly_quest_done: Some(true),
                harvesting_points: Some(5),
            },
        )
        .unwrap();
    store
        .record_collectible(owner, Profession::Skinning, "bone-pile")
        .unwrap();
    store
        .record_buyable(owner, Profession::Leatherworking, "pattern")
        .unwrap();

    let original = store.snapshot();
    let fields: &[(&str, FieldKind)] = &[
        ("professions", FieldKind::Object),
        ("currentPeriodStart", FieldKind::String),
    ];

    let target = KvStore::open_in_memory().unwrap();
    codec::persist_snapshot(&target, PROFESSION_STORAGE_KEY, &*original).unwrap();
    let revived: ProfessionSnapshot =
        codec::load_snapshot(&target, PROFESSION_STORAGE_KEY, fields).unwrap();

    assert_eq!(revived, *original);
    assert_eq!(revived.last_updated, now);
}
