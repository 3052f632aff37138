//! [`Guards`] – interception points wrapped around host call sites that
//! would otherwise dereference a verb or its source.
//!
//! Every guard answers with a [`Verdict`]: either let the host's own logic
//! run ([`Verdict::Proceed`]) or skip it and use a substitute result
//! ([`Verdict::Substitute`]).  Guards are independent of each other and of
//! whether reconciliation has run; each one validates its own minimal
//! preconditions.
//!
//! | Guard | Host call site | Reconciles? | On fault |
//! |-------|----------------|-------------|----------|
//! | [`guard_range`][Guards::guard_range] | derived range of a verb | never (hot path) | proceed |
//! | [`guard_hostile_response`][Guards::guard_hostile_response] | attack job selection | yes, configurable | skip |
//! | [`guard_melee_selection`][Guards::guard_melee_selection] | melee verb selection | yes, configurable | skip |
//! | [`guard_melee_gizmo`][Guards::guard_melee_gizmo] | melee UI affordance | no | skip |
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use tether_kernel::{Discovery, GuardConfig, Guards, Reconciler, Verdict};
//!
//! let discovery = Rc::new(Discovery::unbound());
//! let reconciler = Rc::new(Reconciler::new(Rc::clone(&discovery)));
//! let guards = Guards::new(reconciler, discovery, GuardConfig::default());
//!
//! // No verb at all: the host must not evaluate it; use the floor range.
//! assert_eq!(guards.guard_range(None, None, true), Verdict::Substitute(1.0));
//! // No agent: never select an attack job.
//! assert_eq!(guards.guard_hostile_response(None), Verdict::skip());
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tether_types::{Agent, Verb, VerbProperties};
use tracing::debug;

use crate::boundary;
use crate::discovery::Discovery;
use crate::melee::{MeleeAvailability, melee_availability};
use crate::reconciler::Reconciler;
use crate::store_access;

/// Range used when a verb's own configured range is missing or unusable.
pub const MIN_FALLBACK_RANGE: f32 = 1.0;

// ────────────────────────────────────────────────────────────────────────────
// Verdict
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of a guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict<T = ()> {
    /// Defer to the host's own logic.
    Proceed,
    /// Skip the host's logic and use this result instead.
    Substitute(T),
}

impl Verdict<()> {
    /// Skip the host call site, producing "nothing" (no job, no
    /// affordance, no selected verb).
    pub const fn skip() -> Self {
        Verdict::Substitute(())
    }
}

impl<T> Verdict<T> {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Verdict::Proceed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Tunables for the guard layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Reconcile the agent before deciding on an attack job.
    pub reconcile_on_hostile_response: bool,
    /// Reconcile the agent before melee verb selection.
    pub reconcile_on_melee_selection: bool,
    /// Floor for substituted ranges.  Must be positive and finite.
    pub min_fallback_range: f32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            reconcile_on_hostile_response: true,
            reconcile_on_melee_selection: true,
            min_fallback_range: MIN_FALLBACK_RANGE,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Guards
// ────────────────────────────────────────────────────────────────────────────

/// The host-facing guard layer.
pub struct Guards {
    reconciler: Rc<Reconciler>,
    discovery: Rc<Discovery>,
    config: GuardConfig,
    range_floor: f32,
}

impl Guards {
    pub fn new(reconciler: Rc<Reconciler>, discovery: Rc<Discovery>, config: GuardConfig) -> Self {
        let range_floor = if config.min_fallback_range.is_finite() && config.min_fallback_range > 0.0
        {
            config.min_fallback_range
        } else {
            MIN_FALLBACK_RANGE
        };
        Self {
            reconciler,
            discovery,
            config,
            range_floor,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Guard for the host's derived-range computation.
    ///
    /// When the verb, its properties, its caster, or the second actor is
    /// missing, the host must not run; the substitute is the verb's raw
    /// configured range floored at the configured minimum.  Allocation-free
    /// and never reconciles.  Fails open.
    pub fn guard_range(
        &self,
        verb: Option<&dyn Verb>,
        caster: Option<&dyn Agent>,
        target_present: bool,
    ) -> Verdict<f32> {
        boundary::shield("range_guard", Verdict::Proceed, || {
            let Some(verb) = verb else {
                return Ok(Verdict::Substitute(self.range_floor));
            };
            let props = verb.properties();
            let intact = props.is_some()
                && target_present
                && verb.caster().is_some()
                && caster.is_some_and(|c| !c.is_destroyed());
            Ok(if intact {
                Verdict::Proceed
            } else {
                Verdict::Substitute(self.fallback_range(props))
            })
        })
    }

    fn fallback_range(&self, props: Option<&VerbProperties>) -> f32 {
        match props.map(|p| p.range) {
            Some(raw) if raw.is_finite() && raw > self.range_floor => raw,
            _ => self.range_floor,
        }
    }

    /// Guard for the host's attack-job selection.
    ///
    /// Skips ("no job") when the agent is not actionable, or when after
    /// opportunistic reconciliation no verb is both usable and violent.
    pub fn guard_hostile_response(&self, agent: Option<&mut dyn Agent>) -> Verdict {
        let Some(agent) = agent else {
            return Verdict::skip();
        };
        boundary::shield("hostile_response_guard", Verdict::skip(), || {
            if !is_actionable(agent, false) {
                return Ok(Verdict::skip());
            }
            if self.config.reconcile_on_hostile_response {
                self.reconciler.reconcile_agent(agent);
            }

            let agent: &dyn Agent = &*agent;
            let Some(store) = store_access::list(agent) else {
                return Ok(Verdict::skip());
            };
            let armed = store_access::snapshot(store)
                .into_iter()
                .flatten()
                .any(|v| v.is_usable() && v.is_violent());
            if !armed {
                debug!(agent = %agent.id(), "no usable violent verb; skipping attack job");
                return Ok(Verdict::skip());
            }
            Ok(Verdict::Proceed)
        })
    }

    /// Guard for the host's melee-verb selection.
    ///
    /// Skips when the agent is not actionable or has no melee verb after
    /// opportunistic reconciliation, suppressing the host's own "no melee
    /// verb" error.  An inconclusive melee check defers to the host.
    pub fn guard_melee_selection(&self, agent: Option<&mut dyn Agent>) -> Verdict {
        let Some(agent) = agent else {
            return Verdict::skip();
        };
        boundary::shield("melee_selection_guard", Verdict::skip(), || {
            if !is_actionable(agent, false) {
                return Ok(Verdict::skip());
            }
            if self.config.reconcile_on_melee_selection {
                self.reconciler.reconcile_agent(agent);
            }
            Ok(self.melee_verdict(agent))
        })
    }

    /// Guard for the host's melee UI affordance.
    ///
    /// Skips when the agent is dead, downed, destroyed, has no melee
    /// subsystem, or has no melee verb.  Runs every frame the affordance
    /// is drawn, so it never reconciles.
    pub fn guard_melee_gizmo(&self, agent: Option<&dyn Agent>) -> Verdict {
        let Some(agent) = agent else {
            return Verdict::skip();
        };
        boundary::shield("melee_gizmo_guard", Verdict::skip(), || {
            if !is_actionable(agent, true) || !agent.has_melee_tracker() {
                return Ok(Verdict::skip());
            }
            Ok(self.melee_verdict(agent))
        })
    }

    fn melee_verdict(&self, agent: &dyn Agent) -> Verdict {
        match melee_availability(agent, &self.discovery) {
            MeleeAvailability::Absent => {
                debug!(agent = %agent.id(), "no melee verb; skipping host melee logic");
                Verdict::skip()
            }
            MeleeAvailability::Present | MeleeAvailability::Unknown => Verdict::Proceed,
        }
    }
}

fn is_actionable(agent: &dyn Agent, downed_counts: bool) -> bool {
    !agent.is_destroyed() && !agent.is_dead() && !(downed_counts && agent.is_downed())
}
