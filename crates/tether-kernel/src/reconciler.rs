//! [`Reconciler`] – removes orphaned verbs from an agent's verb store.
//!
//! One call to [`Reconciler::reconcile`] is one pass:
//!
//! 1. A missing, destroyed or store-less agent is a definitive no-op
//!    (`success == false`, nothing removed).
//! 2. The store is read once into a position-stable snapshot; an empty
//!    store succeeds immediately.
//! 3. The agent's live sources are resolved once for the whole pass.
//! 4. Each slot is classified by the [`Classifier`].
//! 5. Orphans are removed from the highest index down, so no removal
//!    shifts a slot that is still to be removed.
//! 6. When anything was removed, in-progress verb use is interrupted and
//!    the third-party maintainer (if discovered) is refreshed.  Neither
//!    side effect can undo the removal or fail the call.
//!
//! Sources attached or detached by the host while the pass runs are not
//! observed; the next pass sees them.

use std::collections::HashSet;
use std::rc::Rc;

use tether_types::{Agent, AgentId, HostFault, PassReport, World};
use tracing::{debug, info};

use crate::boundary;
use crate::classifier::{ClassifyContext, Classifier, OrphanReason};
use crate::discovery::Discovery;
use crate::sources;
use crate::store_access;

/// Result of one reconciliation pass over one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// `false` when there was nothing to reconcile (no agent, destroyed
    /// agent, no store) or the pass hit a contained fault.
    pub success: bool,
    pub removed: usize,
}

impl ReconcileOutcome {
    pub const NOOP: Self = Self {
        success: false,
        removed: 0,
    };

    pub const CLEAN: Self = Self {
        success: true,
        removed: 0,
    };
}

/// Classifies and removes orphaned verbs.
pub struct Reconciler {
    classifier: Classifier,
    discovery: Rc<Discovery>,
}

impl Reconciler {
    pub fn new(discovery: Rc<Discovery>) -> Self {
        Self::with_classifier(discovery, Classifier::default())
    }

    pub fn with_classifier(discovery: Rc<Discovery>, classifier: Classifier) -> Self {
        Self {
            classifier,
            discovery,
        }
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Run one pass over `agent`.  Never panics and never returns an error;
    /// contained faults yield [`ReconcileOutcome::NOOP`].
    pub fn reconcile(&self, agent: Option<&mut dyn Agent>) -> ReconcileOutcome {
        match agent {
            Some(agent) => self.reconcile_agent(agent),
            None => ReconcileOutcome::NOOP,
        }
    }

    /// [`reconcile`][Self::reconcile] for an agent the caller already holds.
    pub fn reconcile_agent(&self, agent: &mut dyn Agent) -> ReconcileOutcome {
        boundary::shield("reconcile", ReconcileOutcome::NOOP, || {
            self.try_reconcile(agent)
        })
    }

    fn try_reconcile(&self, agent: &mut dyn Agent) -> Result<ReconcileOutcome, HostFault> {
        if agent.is_destroyed() {
            return Ok(ReconcileOutcome::NOOP);
        }
        let agent_id = agent.id();

        let orphans = {
            let agent: &dyn Agent = &*agent;
            let Some(store) = store_access::list(agent) else {
                return Ok(ReconcileOutcome::NOOP);
            };
            let snapshot = store_access::snapshot(store);
            if snapshot.is_empty() {
                return Ok(ReconcileOutcome::CLEAN);
            }

            let live = sources::resolve(agent);
            let ctx = ClassifyContext {
                agent: agent_id,
                live: &live,
                ability_link: self.discovery.ability_link(),
            };
            snapshot
                .iter()
                .enumerate()
                .filter_map(|(index, verb)| {
                    self.classifier
                        .explain(*verb, &ctx)
                        .map(|(rule, reason)| (index, rule, reason))
                })
                .collect::<Vec<(usize, &str, OrphanReason)>>()
        };

        if orphans.is_empty() {
            return Ok(ReconcileOutcome::CLEAN);
        }

        let Some(store) = agent.verb_store_mut() else {
            return Ok(ReconcileOutcome::NOOP);
        };
        let mut removed = 0;
        for &(index, rule, reason) in orphans.iter().rev() {
            if store_access::remove_at(store, index) {
                removed += 1;
                debug!(agent = %agent_id, index, rule, ?reason, "removed orphaned verb");
            }
        }

        if removed > 0 {
            // The removal already happened; a failed interrupt must not
            // turn the outcome into a no-op.
            boundary::shield("interrupt_verb_use", (), || {
                if let Err(fault) = agent.interrupt_verb_use() {
                    debug!(agent = %agent_id, %fault, "could not interrupt verb use");
                }
                Ok(())
            });
            self.discovery.try_refresh_external_maintainer(agent);
            info!(agent = %agent_id, removed, "reconciled verb store");
        }

        Ok(ReconcileOutcome {
            success: true,
            removed,
        })
    }

    /// Reconcile every agent the world knows about, spawned or not.
    ///
    /// Agents listed in both rosters are visited once; ids with no backing
    /// agent are skipped.
    pub fn reconcile_world(&self, world: &mut dyn World) -> PassReport {
        let mut report = PassReport::begin();
        let mut seen: HashSet<AgentId> = HashSet::new();
        let roster = boundary::shield("collect_world_roster", Vec::new(), || {
            let mut ids = world.spawned_agents();
            ids.extend(world.unspawned_agents());
            Ok(ids)
        });

        for id in roster {
            if !seen.insert(id) {
                continue;
            }
            let outcome = boundary::shield("reconcile_world_agent", ReconcileOutcome::NOOP, || {
                Ok(self.reconcile(world.agent_mut(id)))
            });
            if outcome.success {
                report.record(outcome.removed);
            }
        }

        info!(
            pass = %report.id,
            agents_visited = report.agents_visited,
            agents_changed = report.agents_changed,
            verbs_removed = report.verbs_removed,
            "full verb reconciliation pass finished"
        );
        report
    }
}
