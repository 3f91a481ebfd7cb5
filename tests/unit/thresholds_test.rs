//! Unit tests for the vault threshold tables.
//!
//! Sweeps every domain across a range of counts rather than spot checks.

use vaulttrack::vault::thresholds::{
    next_milestone, percentage, progress_label, slot_state, slots_earned,
};
use vaulttrack::vault::{VaultDomain, SLOT_COUNT};

#[test]
fn test_slots_are_monotonic_and_bounded() {
    for domain in VaultDomain::ALL {
        let table = domain.thresholds();
        let mut previous = 0;
        for count in 0..=30 {
            let slots = slots_earned(count, table);
            assert!(slots <= SLOT_COUNT, "{domain} at {count}");
            assert!(slots >= previous, "{domain} went backwards at {count}");
            previous = slots;
        }
        assert_eq!(previous, SLOT_COUNT);
    }
}

#[test]
fn test_slot_state_matches_slot_count() {
    for domain in VaultDomain::ALL {
        let table = domain.thresholds();
        for count in 0..=30 {
            let state = slot_state(count, table);
            let unlocked = state.iter().filter(|&&s| s).count();
            assert_eq!(unlocked, slots_earned(count, table));
            // Unlocks fill from the first slot
            assert!(state.windows(2).all(|w| w[0] || !w[1]));
        }
    }
}

#[test]
fn test_percentage_stays_in_range() {
    for domain in VaultDomain::ALL {
        let table = domain.thresholds();
        for count in 0..=30 {
            let pct = percentage(count, table);
            assert!(pct <= 100);
            if count >= table[SLOT_COUNT - 1] {
                assert_eq!(pct, 100);
            }
        }
    }
}

#[test]
fn test_raid_percentage_uses_next_threshold() {
    let table = VaultDomain::Raid.thresholds();
    assert_eq!(percentage(0, table), 0);
    assert_eq!(percentage(1, table), 50);
    assert_eq!(percentage(3, table), 75);
    assert_eq!(percentage(5, table), 83);
    assert_eq!(percentage(20, table), 100);
}

#[test]
fn test_next_milestone_boundaries() {
    let table = VaultDomain::MythicPlus.thresholds();

    let at_zero = next_milestone(0, table);
    assert_eq!((at_zero.target, at_zero.remaining), (1, 1));

    let on_threshold = next_milestone(4, table);
    assert_eq!((on_threshold.target, on_threshold.remaining), (8, 4));

    let done = next_milestone(12, table);
    assert_eq!((done.target, done.remaining), (8, 0));
}

#[test]
fn test_progress_labels() {
    assert_eq!(progress_label(3, VaultDomain::World.thresholds()), "3/5");
    assert_eq!(progress_label(12, VaultDomain::World.thresholds()), "12/15");
    assert_eq!(progress_label(16, VaultDomain::World.thresholds()), "16/15");
}
