//! Source set resolver: snapshots an agent's live sources into
//! membership sets, once per reconciliation pass.

use std::collections::HashSet;
use std::hash::Hash;

use tether_types::{AbilityId, Agent, EffectId, HostFault, ItemId};
use tracing::debug;

/// Live sources of one agent at one instant.
///
/// An empty category is stored as `None`; absent and empty both mean
/// "nothing in this category is live".
#[derive(Debug, Default, Clone)]
pub struct LiveSources {
    items: Option<HashSet<ItemId>>,
    effects: Option<HashSet<EffectId>>,
    abilities: Option<HashSet<AbilityId>>,
}

impl LiveSources {
    pub fn has_item(&self, item: ItemId) -> bool {
        self.items.as_ref().is_some_and(|s| s.contains(&item))
    }

    pub fn has_effect(&self, effect: EffectId) -> bool {
        self.effects.as_ref().is_some_and(|s| s.contains(&effect))
    }

    pub fn has_ability(&self, ability: AbilityId) -> bool {
        self.abilities.as_ref().is_some_and(|s| s.contains(&ability))
    }
}

/// Snapshot every live source category of `agent`.
///
/// A category the host cannot enumerate right now degrades to absent.
pub fn resolve(agent: &dyn Agent) -> LiveSources {
    LiveSources {
        items: membership(agent, "attached items", agent.attached_items()),
        effects: membership(agent, "active effects", agent.active_effects()),
        abilities: membership(agent, "active abilities", agent.active_abilities()),
    }
}

fn membership<T: Eq + Hash>(
    agent: &dyn Agent,
    category: &'static str,
    members: Result<Vec<T>, HostFault>,
) -> Option<HashSet<T>> {
    match members {
        Ok(members) if members.is_empty() => None,
        Ok(members) => Some(members.into_iter().collect()),
        Err(fault) => {
            debug!(agent = %agent.id(), category, %fault, "source category unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sim::SimAgent;

    #[test]
    fn resolves_each_category() {
        let agent = SimAgent::new(1)
            .with_item(ItemId::new(1))
            .with_effect(EffectId::new(2))
            .with_ability(AbilityId::new(3));
        let live = resolve(&agent);
        assert!(live.has_item(ItemId::new(1)));
        assert!(live.has_effect(EffectId::new(2)));
        assert!(live.has_ability(AbilityId::new(3)));
        assert!(!live.has_item(ItemId::new(2)));
    }

    #[test]
    fn ids_do_not_leak_across_categories() {
        let agent = SimAgent::new(1).with_item(ItemId::new(7));
        let live = resolve(&agent);
        assert!(!live.has_effect(EffectId::new(7)));
        assert!(!live.has_ability(AbilityId::new(7)));
    }

    #[test]
    fn empty_category_is_absent() {
        let live = resolve(&SimAgent::new(1));
        assert!(live.items.is_none());
        assert!(live.effects.is_none());
        assert!(live.abilities.is_none());
    }

    #[test]
    fn unavailable_category_degrades_to_absent() {
        let mut agent = SimAgent::new(1)
            .with_item(ItemId::new(1))
            .with_effect(EffectId::new(2));
        agent.set_effects_unavailable(true);

        let live = resolve(&agent);
        assert!(live.has_item(ItemId::new(1)));
        assert!(!live.has_effect(EffectId::new(2)));
    }
}
