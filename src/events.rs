//! Store notification events.
//!
//! Stores publish events after a mutation has been applied. Delivery is
//! fire-and-forget over a crossbeam channel: a missing or disconnected
//! receiver never affects the mutation.

use chrono::{DateTime, Utc};
use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::activity::types::OwnerId;
use crate::professions::types::Profession;
use crate::vault::VaultDomain;

/// What a progress event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressDomain {
    /// One of the vault activity domains
    Vault(VaultDomain),
    /// The weekly checklist
    Checklist,
    /// Weekly profession knowledge
    Profession(Profession),
}

impl std::fmt::Display for ProgressDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressDomain::Vault(domain) => write!(f, "{}", domain),
            ProgressDomain::Checklist => write!(f, "Weekly Checklist"),
            ProgressDomain::Profession(profession) => write!(f, "{}", profession),
        }
    }
}

/// Which store emitted a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Activity,
    Profession,
}

/// Event published by a tracker store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A character's progress changed.
    Progress {
        owner_id: OwnerId,
        domain: ProgressDomain,
        /// Vault slots now earned, for vault domains
        slots: Option<usize>,
        /// "current/required" style progress text
        progress: String,
    },
    /// Every character was rolled over into a new period.
    PeriodReset {
        store: StoreKind,
        period_start: DateTime<Utc>,
        characters: usize,
    },
    /// A snapshot write failed; in-memory state was kept.
    PersistenceFailed { key: String, message: String },
}

impl StoreEvent {
    /// Human-readable one-line summary, suitable for a toast.
    pub fn message(&self) -> String {
        match self {
            StoreEvent::Progress {
                domain,
                slots: Some(slots),
                progress,
                ..
            } => format!("{domain}: {progress} ({slots} slots)"),
            StoreEvent::Progress {
                domain, progress, ..
            } => format!("{domain}: {progress}"),
            StoreEvent::PeriodReset { characters, .. } => {
                format!("Weekly reset: {characters} characters refreshed")
            }
            StoreEvent::PersistenceFailed { message, .. } => format!("Save failed: {message}"),
        }
    }
}

/// Sending half of a store's event channel.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<StoreEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver that observes it.
    pub fn channel() -> (Self, Receiver<StoreEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Publish an event without blocking.
    pub fn emit(&self, event: StoreEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::debug!("Event receiver dropped");
            }
        }
    }
}
