//! [`Tether`] – the explicitly constructed context the host holds.
//!
//! Resolves discovery once, then shares it between the [`Reconciler`] and
//! the [`Guards`].  There is no global state: the host (or
//! `tether-runtime`) owns one `Tether` and passes it where needed.

use std::rc::Rc;

use tether_types::{Agent, HostExtensions, PassReport, World};

use crate::discovery::Discovery;
use crate::guards::{GuardConfig, Guards};
use crate::reconciler::{ReconcileOutcome, Reconciler};

pub struct Tether {
    discovery: Rc<Discovery>,
    reconciler: Rc<Reconciler>,
    guards: Guards,
}

impl Tether {
    /// Probe the host's optional hooks and assemble the reconciler and
    /// guards around the result.
    pub fn new(extensions: &dyn HostExtensions, config: GuardConfig) -> Self {
        Self::from_discovery(Discovery::resolve(extensions), config)
    }

    pub fn from_discovery(discovery: Discovery, config: GuardConfig) -> Self {
        let discovery = Rc::new(discovery);
        let reconciler = Rc::new(Reconciler::new(Rc::clone(&discovery)));
        let guards = Guards::new(Rc::clone(&reconciler), Rc::clone(&discovery), config);
        Self {
            discovery,
            reconciler,
            guards,
        }
    }

    pub fn reconcile(&self, agent: Option<&mut dyn Agent>) -> ReconcileOutcome {
        self.reconciler.reconcile(agent)
    }

    pub fn reconcile_world(&self, world: &mut dyn World) -> PassReport {
        self.reconciler.reconcile_world(world)
    }

    pub fn guards(&self) -> &Guards {
        &self.guards
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::Verdict;
    use tether_sim::{SimAgent, SimExtensions, SimMaintainer, SimVerb};
    use tether_types::{EffectId, ItemId, VerbProperties};

    #[test]
    fn guards_and_reconciler_share_one_discovery() {
        let maintainer = SimMaintainer::new();
        let ext = SimExtensions::none().with_maintainers();
        let probes = ext.recalc_probes();
        let tether = Tether::new(&ext, GuardConfig::default());

        let mut first = SimAgent::new(1)
            .with_store(100)
            .with_item(ItemId::new(5))
            .with_maintainer(std::rc::Rc::clone(&maintainer))
            .with_verb(SimVerb::new(10, VerbProperties::melee("knife")).from_item(ItemId::new(5)))
            .with_verb(SimVerb::new(11, VerbProperties::melee("fist")));
        first.detach_item(ItemId::new(5));
        assert_eq!(tether.reconcile(Some(&mut first as &mut dyn Agent)).removed, 1);

        let mut second = SimAgent::new(2)
            .with_store(200)
            .with_effect(EffectId::new(6))
            .with_maintainer(std::rc::Rc::clone(&maintainer))
            .with_verb(SimVerb::new(20, VerbProperties::melee("claws")).from_effect(EffectId::new(6)))
            .with_verb(SimVerb::new(21, VerbProperties::melee("bite")));
        second.remove_effect(EffectId::new(6));
        assert_eq!(
            tether
                .guards()
                .guard_hostile_response(Some(&mut second as &mut dyn Agent)),
            Verdict::Proceed
        );

        assert_eq!(maintainer.recalculations(), 2);
        assert_eq!(probes.get(), 1);
        assert_eq!(tether.discovery().cached_maintainer_types(), 1);
    }
}
