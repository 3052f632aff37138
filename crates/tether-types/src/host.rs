//! Accessors Tether consumes from the host simulation.
//!
//! The host implements these traits over its own entity model.  Every
//! accessor that can legitimately be missing returns `Option`; every
//! accessor that can fail mid-mutation returns `Result<_, HostFault>`.

use std::any::Any;

use crate::{AbilityId, AgentId, EffectId, HostFault, ItemId, StoreId, VerbId, VerbProperties};

/// A cached action descriptor held in an agent's [`VerbStore`].
pub trait Verb: Any {
    fn id(&self) -> VerbId;

    /// The agent this verb believes it belongs to.
    fn caster(&self) -> Option<AgentId>;

    fn properties(&self) -> Option<&VerbProperties>;

    /// Attached item this verb was derived from, if item-sourced.
    fn item_source(&self) -> Option<ItemId>;

    /// Status effect this verb was derived from, if effect-sourced.
    fn effect_source(&self) -> Option<EffectId>;

    /// Back-link to the store that holds this verb.
    fn store_link(&self) -> Option<StoreId>;

    /// Host's own availability check (cooldowns, ammo, ...).
    fn is_usable(&self) -> bool;

    /// Composition-time hooks (see [`AbilityLink`][crate::AbilityLink])
    /// downcast through this to reach the host's concrete verb type.
    fn as_any(&self) -> &dyn Any;

    fn is_violent(&self) -> bool {
        self.properties().is_some_and(|p| p.violent)
    }

    fn is_melee_attack(&self) -> bool {
        self.properties().is_some_and(|p| p.melee_attack)
    }
}

/// Ordered verb collection owned by exactly one agent.
pub trait VerbStore {
    fn id(&self) -> StoreId;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `None` for an out-of-range index or an entry the host can no longer
    /// describe.
    fn get(&self, index: usize) -> Option<&dyn Verb>;

    /// Remove the entry at `index`, shifting later entries down.  Returns
    /// `false` when `index` is out of range.
    fn remove_at(&mut self, index: usize) -> bool;
}

/// A combatant in the host simulation.
pub trait Agent {
    fn id(&self) -> AgentId;

    fn is_destroyed(&self) -> bool;

    fn is_dead(&self) -> bool;

    /// Incapacitated but alive.
    fn is_downed(&self) -> bool;

    fn verb_store(&self) -> Option<&dyn VerbStore>;

    fn verb_store_mut(&mut self) -> Option<&mut dyn VerbStore>;

    fn attached_items(&self) -> Result<Vec<ItemId>, HostFault>;

    fn active_effects(&self) -> Result<Vec<EffectId>, HostFault>;

    fn active_abilities(&self) -> Result<Vec<AbilityId>, HostFault>;

    /// Stop any verb use currently in progress.  A no-op when none is.
    fn interrupt_verb_use(&mut self) -> Result<(), HostFault>;

    /// Whether the agent has the host's melee subsystem at all.
    fn has_melee_tracker(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// The set of agents known to the host, spawned or not.
pub trait World {
    fn spawned_agents(&self) -> Vec<AgentId>;

    /// Agents that exist but are not on a map (travelling, in storage, ...).
    /// May overlap with [`spawned_agents`][World::spawned_agents].
    fn unspawned_agents(&self) -> Vec<AgentId>;

    fn agent_mut(&mut self, id: AgentId) -> Option<&mut dyn Agent>;
}
