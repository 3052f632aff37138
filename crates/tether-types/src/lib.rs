//! `tether-types` – the host-facing data model shared by every Tether crate.
//!
//! Tether never owns agents, verbs or their sources; the host simulation
//! does.  This crate only names them (identity newtypes), describes the
//! accessors Tether needs from the host ([`host`]) and the optional hooks a
//! host build may or may not expose ([`extension`]).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod extension;
pub mod host;

pub use extension::{
    AbilityLink, HostExtensions, MaintainerLookup, MeleeRoster, NoExtensions, RecalcResolver,
    Recalculate,
};
pub use host::{Agent, Verb, VerbStore, World};

// ────────────────────────────────────────────────────────────────────────────
// Identity
// ────────────────────────────────────────────────────────────────────────────

macro_rules! identity {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

identity!(
    /// Host identity of an agent (a combatant owning a verb store).
    AgentId,
    "agent"
);
identity!(
    /// Host identity of a verb.  Verbs compare by identity only.
    VerbId,
    "verb"
);
identity!(
    /// Host identity of a verb store.
    StoreId,
    "store"
);
identity!(
    /// An attached item (equipment, apparel) that can source verbs.
    ItemId,
    "item"
);
identity!(
    /// An active status effect that can source verbs.
    EffectId,
    "effect"
);
identity!(
    /// A learned ability that can source verbs.
    AbilityId,
    "ability"
);

// ────────────────────────────────────────────────────────────────────────────
// Verb properties
// ────────────────────────────────────────────────────────────────────────────

/// Host-configured description of a verb.
///
/// A verb without properties is malformed and is always treated as
/// orphaned by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbProperties {
    pub label: String,
    /// Raw configured range, before any owner- or target-derived modifiers.
    pub range: f32,
    /// The verb is one of the host's melee attacks.
    pub melee_attack: bool,
    /// The verb harms its target.
    pub violent: bool,
}

impl VerbProperties {
    pub fn melee(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            range: 1.42,
            melee_attack: true,
            violent: true,
        }
    }

    pub fn ranged(label: impl Into<String>, range: f32) -> Self {
        Self {
            label: label.into(),
            range,
            melee_attack: false,
            violent: true,
        }
    }

    /// A non-violent utility verb (healing touch, shield projection, ...).
    pub fn utility(label: impl Into<String>, range: f32) -> Self {
        Self {
            label: label.into(),
            range,
            melee_attack: false,
            violent: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

/// Summary of a reconciliation pass over many agents (the one-time full
/// pass after load, or any host-driven batch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub agents_visited: usize,
    pub agents_changed: usize,
    pub verbs_removed: usize,
}

impl PassReport {
    /// Open a new, empty report stamped with the current time.
    pub fn begin() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            agents_visited: 0,
            agents_changed: 0,
            verbs_removed: 0,
        }
    }

    /// Fold the result of one agent's reconciliation into the report.
    pub fn record(&mut self, removed: usize) {
        self.agents_visited += 1;
        if removed > 0 {
            self.agents_changed += 1;
            self.verbs_removed += removed;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// A failure reported by a host accessor or an optional extension hook.
///
/// Host faults are never fatal: Tether degrades to "absent" or to the
/// operation's safe default when it sees one.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostFault {
    #[error("Host collection unavailable: {0}")]
    Unavailable(String),

    #[error("Host rejected {what}: {details}")]
    Rejected { what: String, details: String },

    #[error("Agent {0} was destroyed")]
    Destroyed(AgentId),
}

/// Errors surfaced to the embedding layer (configuration, session state).
#[derive(Error, Debug)]
pub enum TetherError {
    #[error("Host Fault: {0}")]
    Host(#[from] HostFault),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Session State Error: {0}")]
    Session(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_display_carries_category() {
        assert_eq!(AgentId::new(7).to_string(), "agent#7");
        assert_eq!(EffectId::new(3).to_string(), "effect#3");
    }

    #[test]
    fn identity_serializes_transparently() {
        let json = serde_json::to_string(&ItemId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: ItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ItemId::new(42));
    }

    #[test]
    fn pass_report_counts_only_changed_agents() {
        let mut report = PassReport::begin();
        report.record(0);
        report.record(2);
        report.record(1);
        assert_eq!(report.agents_visited, 3);
        assert_eq!(report.agents_changed, 2);
        assert_eq!(report.verbs_removed, 3);
    }

    #[test]
    fn host_fault_display() {
        let fault = HostFault::Unavailable("active effects".to_string());
        assert!(fault.to_string().contains("active effects"));

        let err: TetherError = HostFault::Destroyed(AgentId::new(9)).into();
        assert!(err.to_string().contains("agent#9"));
    }

    #[test]
    fn melee_preset_is_violent_melee() {
        let props = VerbProperties::melee("fist");
        assert!(props.melee_attack);
        assert!(props.violent);
        assert!(!VerbProperties::utility("mend", 3.0).violent);
    }
}
