//! Verb store accessor: typed read and in-place removal over an agent's
//! verb store, with no knowledge of orphan semantics.
//!
//! An agent without a store is a normal "nothing to do" condition, so
//! [`list`] returns `None` rather than an error.

use tether_types::{Agent, Verb, VerbStore};

/// The agent's verb store, or `None` when it has none.
pub fn list(agent: &dyn Agent) -> Option<&dyn VerbStore> {
    agent.verb_store()
}

/// Remove the entry at `index`.  Returns `true` iff an entry was removed.
pub fn remove_at(store: &mut dyn VerbStore, index: usize) -> bool {
    store.remove_at(index)
}

/// Materialise a position-stable view of the store.
///
/// Slot `i` of the returned vector is the verb at index `i` at the moment
/// of the call (`None` for a null entry), so callers can decide what to
/// remove before any index shifts.
pub fn snapshot(store: &dyn VerbStore) -> Vec<Option<&dyn Verb>> {
    (0..store.len()).map(|index| store.get(index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sim::{SimAgent, SimVerb};
    use tether_types::{VerbId, VerbProperties};

    #[test]
    fn list_is_none_without_store() {
        let agent = SimAgent::new(1);
        assert!(list(&agent).is_none());
    }

    #[test]
    fn snapshot_preserves_positions_and_null_entries() {
        let agent = SimAgent::new(1)
            .with_store(100)
            .with_verb(SimVerb::new(10, VerbProperties::melee("fist")))
            .with_null_verb()
            .with_verb(SimVerb::new(11, VerbProperties::melee("kick")));

        let store = list(&agent).unwrap();
        let view = snapshot(store);
        let ids: Vec<Option<VerbId>> = view.iter().map(|v| v.map(|v| v.id())).collect();
        assert_eq!(ids, vec![Some(VerbId::new(10)), None, Some(VerbId::new(11))]);
    }

    #[test]
    fn remove_at_reports_success_only_for_valid_index() {
        let mut agent = SimAgent::new(1)
            .with_store(100)
            .with_verb(SimVerb::new(10, VerbProperties::melee("fist")));

        let store = agent.verb_store_mut().unwrap();
        assert!(!remove_at(store, 3));
        assert!(remove_at(store, 0));
        assert!(store.is_empty());
    }
}
