//! Optional hooks a host build may or may not provide.
//!
//! Not every host build links verbs to abilities, and the third-party verb
//! maintainer is an optional add-on whose concrete type varies.  Instead of
//! probing types at runtime on every call, the host hands Tether a
//! [`HostExtensions`] once; every hook defaults to "not present".

use std::any::{Any, TypeId};
use std::rc::Rc;

use crate::{AbilityId, Agent, HostFault, Verb};

/// Reads the ability a verb was derived from, on host builds that have
/// ability-sourced verbs.
pub trait AbilityLink {
    fn ability_of(&self, verb: &dyn Verb) -> Option<AbilityId>;
}

/// Finds the third-party verb maintainer attached to an agent, if any.
pub trait MaintainerLookup {
    fn lookup(&self, agent: &dyn Agent) -> Result<Option<Rc<dyn Any>>, HostFault>;
}

/// Asks a maintainer to rebuild its derived verb state.
pub trait Recalculate {
    fn recalculate(&self, maintainer: &dyn Any) -> Result<(), HostFault>;
}

/// Produces the [`Recalculate`] binding for one concrete maintainer type.
pub trait RecalcResolver {
    fn resolve(&self, maintainer_type: TypeId) -> Option<Rc<dyn Recalculate>>;
}

/// The host's internal, always up-to-date view of an agent's melee verbs.
pub trait MeleeRoster {
    fn has_melee_verbs(&self, agent: &dyn Agent) -> Result<bool, HostFault>;
}

/// Entry point through which the host exposes its optional hooks.
pub trait HostExtensions {
    fn ability_link(&self) -> Option<Box<dyn AbilityLink>> {
        None
    }

    fn maintainer_lookup(&self) -> Option<Box<dyn MaintainerLookup>> {
        None
    }

    fn recalc_resolver(&self) -> Option<Box<dyn RecalcResolver>> {
        None
    }

    fn melee_roster(&self) -> Option<Box<dyn MeleeRoster>> {
        None
    }
}

/// A host build with none of the optional hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExtensions;

impl HostExtensions for NoExtensions {}
