//! [`Lifecycle`] – maps host lifecycle signals onto reconciliation.
//!
//! | Host signal | Entry point | Effect |
//! |---|---|---|
//! | combat stance / participation flag changed | [`Lifecycle::on_stance_changed`] | reconcile that agent |
//! | world fully loaded | [`Lifecycle::on_world_loaded`] | one-time full pass |
//! | new session started | [`Lifecycle::on_new_session`] | one-time full pass |
//!
//! Discovery of the host's optional hooks is deferred until the first
//! signal (or guard) actually needs it, so constructing a `Lifecycle` during
//! host start-up never probes a half-initialised host.

use std::cell::OnceCell;

use tether_kernel::{Guards, ReconcileOutcome, Tether};
use tether_types::{Agent, HostExtensions, PassReport, World};
use tracing::{debug, info};

use crate::config::TetherConfig;
use crate::session::SessionState;

pub struct Lifecycle {
    extensions: Box<dyn HostExtensions>,
    config: TetherConfig,
    tether: OnceCell<Tether>,
}

impl Lifecycle {
    pub fn new(extensions: Box<dyn HostExtensions>, config: TetherConfig) -> Self {
        Self {
            extensions,
            config,
            tether: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    /// The shared kernel context, resolving discovery on first access.
    pub fn tether(&self) -> &Tether {
        self.tether
            .get_or_init(|| Tether::new(self.extensions.as_ref(), self.config.guards.clone()))
    }

    /// Guards to install at the host's call sites.
    pub fn guards(&self) -> &Guards {
        self.tether().guards()
    }

    /// Whether discovery has run yet.
    pub fn is_resolved(&self) -> bool {
        self.tether.get().is_some()
    }

    pub fn on_stance_changed(&self, agent: &mut dyn Agent) -> ReconcileOutcome {
        if !self.config.lifecycle.reconcile_on_stance_change {
            return ReconcileOutcome::NOOP;
        }
        self.tether().reconcile(Some(agent))
    }

    pub fn on_world_loaded(
        &self,
        world: &mut dyn World,
        session: &mut SessionState,
    ) -> Option<PassReport> {
        self.full_pass_once("world_loaded", world, session)
    }

    pub fn on_new_session(
        &self,
        world: &mut dyn World,
        session: &mut SessionState,
    ) -> Option<PassReport> {
        self.full_pass_once("new_session", world, session)
    }

    /// Run the full pass unless this session already had one.  The flag is
    /// set only after a pass actually ran.
    fn full_pass_once(
        &self,
        signal: &'static str,
        world: &mut dyn World,
        session: &mut SessionState,
    ) -> Option<PassReport> {
        if !self.config.lifecycle.full_pass_on_load {
            debug!(signal, "full pass disabled by configuration");
            return None;
        }
        if session.full_pass_done {
            debug!(signal, "full pass already done for this session");
            return None;
        }
        let report = self.tether().reconcile_world(world);
        session.full_pass_done = true;
        info!(signal, pass = %report.id, "one-time full pass complete");
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sim::{SimAgent, SimExtensions, SimVerb, SimWorld};
    use tether_types::{EffectId, ItemId, VerbProperties};

    fn lifecycle(config: TetherConfig) -> Lifecycle {
        Lifecycle::new(Box::new(SimExtensions::none()), config)
    }

    fn orphaned_agent(id: u64) -> SimAgent {
        let item = ItemId::new(id * 10);
        let mut agent = SimAgent::new(id)
            .with_store(id * 100)
            .with_item(item)
            .with_verb(SimVerb::new(id * 1000, VerbProperties::melee("blade")).from_item(item))
            .with_verb(SimVerb::new(id * 1000 + 1, VerbProperties::melee("fist")));
        agent.detach_item(item);
        agent
    }

    fn world() -> SimWorld {
        let mut stashed = SimAgent::new(3)
            .with_store(300)
            .with_effect(EffectId::new(30))
            .with_verb(SimVerb::new(3000, VerbProperties::melee("claws")).from_effect(EffectId::new(30)));
        stashed.remove_effect(EffectId::new(30));
        SimWorld::new()
            .spawn(orphaned_agent(1))
            .spawn(orphaned_agent(2))
            .stash(stashed)
            .also_unspawned(1)
    }

    #[test]
    fn discovery_is_deferred_until_first_use() {
        let lc = lifecycle(TetherConfig::default());
        assert!(!lc.is_resolved());
        let mut agent = orphaned_agent(1);
        lc.on_stance_changed(&mut agent);
        assert!(lc.is_resolved());
    }

    #[test]
    fn stance_change_reconciles_agent() {
        let lc = lifecycle(TetherConfig::default());
        let mut agent = orphaned_agent(1);
        let outcome = lc.on_stance_changed(&mut agent);
        assert!(outcome.success);
        assert_eq!(outcome.removed, 1);
        assert_eq!(agent.verb_ids().len(), 1);
    }

    #[test]
    fn stance_change_can_be_disabled() {
        let mut config = TetherConfig::default();
        config.lifecycle.reconcile_on_stance_change = false;
        let lc = lifecycle(config);
        let mut agent = orphaned_agent(1);
        assert_eq!(lc.on_stance_changed(&mut agent), ReconcileOutcome::NOOP);
        assert_eq!(agent.verb_ids().len(), 2);
        assert!(!lc.is_resolved());
    }

    #[test]
    fn full_pass_runs_once_per_session() {
        let lc = lifecycle(TetherConfig::default());
        let mut world = world();
        let mut session = SessionState::default();

        let report = lc
            .on_world_loaded(&mut world, &mut session)
            .expect("first signal runs the pass");
        assert_eq!(report.agents_visited, 3);
        assert_eq!(report.agents_changed, 3);
        assert_eq!(report.verbs_removed, 3);
        assert!(session.full_pass_done);

        assert!(lc.on_new_session(&mut world, &mut session).is_none());
        assert!(lc.on_world_loaded(&mut world, &mut session).is_none());
    }

    #[test]
    fn full_pass_completes_when_one_lookup_panics() {
        let lc = lifecycle(TetherConfig::default());
        let mut world = world().explode_on_lookup(2);
        let mut session = SessionState::default();

        let report = lc
            .on_world_loaded(&mut world, &mut session)
            .expect("pass still runs");
        assert_eq!(report.agents_visited, 2);
        assert!(session.full_pass_done);
    }

    #[test]
    fn restored_session_skips_full_pass() {
        let lc = lifecycle(TetherConfig::default());
        let mut world = world();
        let mut session =
            SessionState::from_json(r#"{"full_pass_done":true}"#).expect("saved state");

        assert!(lc.on_world_loaded(&mut world, &mut session).is_none());
        assert_eq!(
            world.agent(1).expect("agent 1").verb_ids().len(),
            2,
            "no pass means the orphan is still there"
        );
    }

    #[test]
    fn disabled_full_pass_leaves_flag_unset() {
        let mut config = TetherConfig::default();
        config.lifecycle.full_pass_on_load = false;
        let lc = lifecycle(config);
        let mut world = world();
        let mut session = SessionState::default();

        assert!(lc.on_new_session(&mut world, &mut session).is_none());
        assert!(!session.full_pass_done);
    }

    #[test]
    fn guards_use_configured_floor() {
        let mut config = TetherConfig::default();
        config.guards.min_fallback_range = 4.0;
        let lc = lifecycle(config);
        assert_eq!(
            lc.guards().guard_range(None, None, true),
            tether_kernel::Verdict::Substitute(4.0)
        );
    }
}
