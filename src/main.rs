//! VaultTrack - Weekly Vault Progress Tracker
//!
//! Main entry point. Loads both stores (resetting them if the weekly reset
//! passed while the tracker was closed), prints a progress overview and
//! flushes on exit.
//!
//! Usage: `vaulttrack [status|reset]`

use std::rc::Rc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vaulttrack::activity::ActivityStore;
use vaulttrack::events::EventSink;
use vaulttrack::period::PeriodCalculator;
use vaulttrack::professions::ProfessionStore;
use vaulttrack::storage::{config, KvStore};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VaultTrack v{}", env!("CARGO_PKG_VERSION"));

    let command = std::env::args().nth(1).unwrap_or_else(|| "status".to_string());
    if command != "status" && command != "reset" {
        bail!("unknown command '{}', expected 'status' or 'reset'", command);
    }

    let config = config::load_config().context("failed to load configuration")?;
    let schedule = config.reset_schedule();
    tracing::info!("Weekly reset: {} ({})", schedule, config.tracker.region);

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;
    let storage = Rc::new(
        KvStore::open(&config.database_path()).context("failed to open tracker database")?,
    );

    let calculator = PeriodCalculator::new(schedule);
    let (events, receiver) = EventSink::channel();

    let mut activities =
        ActivityStore::new(Rc::clone(&storage), calculator).with_events(events.clone());
    let mut professions = ProfessionStore::new(Rc::clone(&storage), calculator).with_events(events);

    activities.load_or_reset();
    professions.load_or_reset();

    if command == "reset" {
        activities.reset_all_for_new_period();
        professions.reset_all_for_new_period();
    }

    let synced = activities.sync_profession_counts(&professions.snapshot());
    if synced > 0 {
        tracing::info!("Synced profession counts for {} characters", synced);
    }

    for event in receiver.try_iter() {
        tracing::info!("{}", event.message());
    }

    println!(
        "Period started {} - {} remaining",
        activities.current_period_start(),
        activities.time_remaining()
    );

    for owner_id in activities.characters() {
        let Some(summary) = activities.vault_summary(owner_id) else {
            continue;
        };

        println!("{} - {} vault slots", owner_id, summary.total_slots());
        for domain in &summary.domains {
            println!(
                "  {:<8} {:>6}  {} slots  {}%",
                domain.domain.display_name(),
                domain.progress_label(),
                domain.slots,
                domain.percentage
            );
        }
        println!("  Checklist {}/{}", summary.checklist_done, summary.checklist_total);

        if let Some(state) = professions.get(owner_id) {
            for knowledge in &state.professions {
                println!("  {:<8} {}", knowledge.profession, knowledge.progress_label());
            }
        }
    }

    activities.flush().context("failed to save activity snapshot")?;
    professions.flush().context("failed to save profession snapshot")?;

    tracing::info!("VaultTrack shutdown complete");
    Ok(())
}
