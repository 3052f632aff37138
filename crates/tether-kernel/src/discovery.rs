//! [`Discovery`] – one-time resolution of the host's optional hooks.
//!
//! Host builds differ: some have ability-sourced verbs, some ship a
//! third-party verb maintainer, some expose an up-to-date melee roster.
//! [`Discovery::resolve`] asks the host's [`HostExtensions`] once and keeps
//! the answer for the lifetime of the context.  The only state that grows
//! afterwards is the per-maintainer-type recalculation table: the lookup
//! can return maintainers of different concrete types, and each type's
//! binding is resolved on first encounter and cached, absent included.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tether_types::{
    AbilityLink, Agent, HostExtensions, MaintainerLookup, MeleeRoster, RecalcResolver,
    Recalculate,
};
use tracing::{debug, info};

use crate::boundary;

/// Whether a third-party maintainer can be refreshed on this host build.
pub enum MaintainerBinding {
    Bound {
        lookup: Box<dyn MaintainerLookup>,
        resolver: Box<dyn RecalcResolver>,
        recalc_by_type: RefCell<HashMap<TypeId, Option<Rc<dyn Recalculate>>>>,
    },
    Unbound,
}

impl MaintainerBinding {
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound { .. })
    }
}

/// Resolved optional hooks, shared by the reconciler and the guards.
pub struct Discovery {
    ability_link: Option<Box<dyn AbilityLink>>,
    maintainer: MaintainerBinding,
    melee_roster: Option<Box<dyn MeleeRoster>>,
}

impl Discovery {
    /// Probe `extensions` once.
    ///
    /// The maintainer binding is only `Bound` when both the lookup and a
    /// recalculation resolver exist; a lookup with nothing to invoke on its
    /// result is useless.  A probe that panics leaves only its own hook
    /// absent.
    pub fn resolve(extensions: &dyn HostExtensions) -> Self {
        let ability_link =
            boundary::shield("probe_ability_link", None, || Ok(extensions.ability_link()));
        let lookup = boundary::shield("probe_maintainer_lookup", None, || {
            Ok(extensions.maintainer_lookup())
        });
        let resolver = boundary::shield("probe_recalc_resolver", None, || {
            Ok(extensions.recalc_resolver())
        });
        let maintainer = match (lookup, resolver) {
            (Some(lookup), Some(resolver)) => MaintainerBinding::Bound {
                lookup,
                resolver,
                recalc_by_type: RefCell::new(HashMap::new()),
            },
            _ => MaintainerBinding::Unbound,
        };
        let melee_roster =
            boundary::shield("probe_melee_roster", None, || Ok(extensions.melee_roster()));

        info!(
            ability_link = ability_link.is_some(),
            maintainer = maintainer.is_bound(),
            melee_roster = melee_roster.is_some(),
            "verb discovery resolved"
        );

        Self {
            ability_link,
            maintainer,
            melee_roster,
        }
    }

    /// Discovery for a host build with no optional hooks at all.
    pub fn unbound() -> Self {
        Self {
            ability_link: None,
            maintainer: MaintainerBinding::Unbound,
            melee_roster: None,
        }
    }

    pub fn ability_link(&self) -> Option<&dyn AbilityLink> {
        self.ability_link.as_deref()
    }

    pub fn melee_roster(&self) -> Option<&dyn MeleeRoster> {
        self.melee_roster.as_deref()
    }

    pub fn maintainer(&self) -> &MaintainerBinding {
        &self.maintainer
    }

    /// Number of maintainer types whose recalculation binding has been
    /// resolved (successfully or not).
    pub fn cached_maintainer_types(&self) -> usize {
        match &self.maintainer {
            MaintainerBinding::Bound { recalc_by_type, .. } => recalc_by_type.borrow().len(),
            MaintainerBinding::Unbound => 0,
        }
    }

    /// Ask the agent's third-party maintainer, if any, to rebuild its verbs.
    ///
    /// Never fails from the caller's point of view: a failed lookup, a
    /// missing maintainer, a type with no recalculation binding and a
    /// failed recalculation are all silent no-ops.
    pub fn try_refresh_external_maintainer(&self, agent: &dyn Agent) {
        let MaintainerBinding::Bound {
            lookup,
            resolver,
            recalc_by_type,
        } = &self.maintainer
        else {
            return;
        };

        boundary::shield("refresh_external_maintainer", (), || {
            let maintainer = match lookup.lookup(agent) {
                Ok(Some(maintainer)) => maintainer,
                Ok(None) => return Ok(()),
                Err(fault) => {
                    debug!(agent = %agent.id(), %fault, "maintainer lookup failed");
                    return Ok(());
                }
            };

            let Some(recalc) = recalc_for(&**resolver, recalc_by_type, &*maintainer) else {
                debug!(agent = %agent.id(), "maintainer type has no recalculation binding");
                return Ok(());
            };

            if let Err(fault) = recalc.recalculate(&*maintainer) {
                debug!(agent = %agent.id(), %fault, "maintainer recalculation failed");
            }
            Ok(())
        });
    }
}

fn recalc_for(
    resolver: &dyn RecalcResolver,
    table: &RefCell<HashMap<TypeId, Option<Rc<dyn Recalculate>>>>,
    maintainer: &dyn Any,
) -> Option<Rc<dyn Recalculate>> {
    let type_id = maintainer.type_id();
    if let Some(cached) = table.borrow().get(&type_id) {
        return cached.clone();
    }
    let resolved = resolver.resolve(type_id);
    table.borrow_mut().insert(type_id, resolved.clone());
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sim::{RosterMode, SimAgent, SimExtensions, SimMaintainer};
    use tether_types::{HostFault, NoExtensions};

    #[test]
    fn no_extensions_resolve_unbound() {
        let discovery = Discovery::resolve(&NoExtensions);
        assert!(discovery.ability_link().is_none());
        assert!(discovery.melee_roster().is_none());
        assert!(!discovery.maintainer().is_bound());
    }

    #[test]
    fn full_extensions_resolve_bound() {
        let ext = SimExtensions::none()
            .with_ability_link()
            .with_maintainers()
            .with_melee_roster(RosterMode::Live);
        let discovery = Discovery::resolve(&ext);
        assert!(discovery.ability_link().is_some());
        assert!(discovery.melee_roster().is_some());
        assert!(discovery.maintainer().is_bound());
    }

    #[test]
    fn lookup_without_resolver_stays_unbound() {
        struct LookupOnly;
        struct NeverFinds;
        impl MaintainerLookup for NeverFinds {
            fn lookup(&self, _agent: &dyn Agent) -> Result<Option<Rc<dyn Any>>, HostFault> {
                Ok(None)
            }
        }
        impl HostExtensions for LookupOnly {
            fn maintainer_lookup(&self) -> Option<Box<dyn MaintainerLookup>> {
                Some(Box::new(NeverFinds))
            }
        }
        assert!(!Discovery::resolve(&LookupOnly).maintainer().is_bound());
    }

    #[test]
    fn panicking_probe_leaves_only_that_hook_absent() {
        struct Exploding(SimExtensions);
        impl HostExtensions for Exploding {
            fn ability_link(&self) -> Option<Box<dyn AbilityLink>> {
                panic!("ability registry torn down");
            }
            fn melee_roster(&self) -> Option<Box<dyn MeleeRoster>> {
                self.0.melee_roster()
            }
        }

        let ext = Exploding(SimExtensions::none().with_melee_roster(RosterMode::Live));
        let discovery = Discovery::resolve(&ext);
        assert!(discovery.ability_link().is_none());
        assert!(discovery.melee_roster().is_some());
        assert!(!discovery.maintainer().is_bound());
    }

    #[test]
    fn refresh_recalculates_found_maintainer() {
        let maintainer = SimMaintainer::new();
        let agent = SimAgent::new(1).with_maintainer(Rc::clone(&maintainer));
        let discovery = Discovery::resolve(&SimExtensions::none().with_maintainers());

        discovery.try_refresh_external_maintainer(&agent);
        discovery.try_refresh_external_maintainer(&agent);

        assert_eq!(maintainer.recalculations(), 2);
    }

    #[test]
    fn recalc_binding_resolved_once_per_type() {
        let ext = SimExtensions::none().with_maintainers();
        let probes = ext.recalc_probes();
        let discovery = Discovery::resolve(&ext);
        let first = SimAgent::new(1).with_maintainer(SimMaintainer::new());
        let second = SimAgent::new(2).with_maintainer(SimMaintainer::new());

        discovery.try_refresh_external_maintainer(&first);
        discovery.try_refresh_external_maintainer(&second);
        discovery.try_refresh_external_maintainer(&first);

        assert_eq!(probes.get(), 1);
        assert_eq!(discovery.cached_maintainer_types(), 1);
    }

    #[test]
    fn refresh_without_maintainer_is_noop() {
        let ext = SimExtensions::none().with_maintainers();
        let probes = ext.recalc_probes();
        let discovery = Discovery::resolve(&ext);
        discovery.try_refresh_external_maintainer(&SimAgent::new(1));
        assert_eq!(probes.get(), 0);
    }

    #[test]
    fn failing_recalculation_is_swallowed() {
        let maintainer = SimMaintainer::failing();
        let agent = SimAgent::new(1).with_maintainer(Rc::clone(&maintainer));
        let discovery = Discovery::resolve(&SimExtensions::none().with_maintainers());
        discovery.try_refresh_external_maintainer(&agent);
        assert_eq!(maintainer.recalculations(), 0);
    }

    #[test]
    fn unknown_maintainer_type_is_cached_as_absent() {
        struct StrangeLookup;
        impl MaintainerLookup for StrangeLookup {
            fn lookup(&self, _agent: &dyn Agent) -> Result<Option<Rc<dyn Any>>, HostFault> {
                Ok(Some(Rc::new(String::from("not a maintainer")) as Rc<dyn Any>))
            }
        }
        struct Strange(SimExtensions);
        impl HostExtensions for Strange {
            fn maintainer_lookup(&self) -> Option<Box<dyn MaintainerLookup>> {
                Some(Box::new(StrangeLookup))
            }
            fn recalc_resolver(&self) -> Option<Box<dyn RecalcResolver>> {
                self.0.recalc_resolver()
            }
        }

        let ext = SimExtensions::none().with_maintainers();
        let probes = ext.recalc_probes();
        let discovery = Discovery::resolve(&Strange(ext));
        let agent = SimAgent::new(1);

        discovery.try_refresh_external_maintainer(&agent);
        discovery.try_refresh_external_maintainer(&agent);

        assert_eq!(probes.get(), 1);
        assert_eq!(discovery.cached_maintainer_types(), 1);
    }

    #[test]
    fn panicking_lookup_is_contained() {
        struct Explodes;
        impl MaintainerLookup for Explodes {
            fn lookup(&self, _agent: &dyn Agent) -> Result<Option<Rc<dyn Any>>, HostFault> {
                panic!("third-party lookup exploded");
            }
        }
        struct Volatile(SimExtensions);
        impl HostExtensions for Volatile {
            fn maintainer_lookup(&self) -> Option<Box<dyn MaintainerLookup>> {
                Some(Box::new(Explodes))
            }
            fn recalc_resolver(&self) -> Option<Box<dyn RecalcResolver>> {
                self.0.recalc_resolver()
            }
        }

        let discovery = Discovery::resolve(&Volatile(SimExtensions::none().with_maintainers()));
        // Must return normally.
        discovery.try_refresh_external_maintainer(&SimAgent::new(1));
    }
}
