//! In-process simulated host for headless tests.
//!
//! [`SimAgent`], [`SimVerb`], [`SimStore`] and [`SimWorld`] implement the
//! host traits from `tether-types` over plain vectors, and
//! [`SimExtensions`] exposes configurable optional hooks.  Host-side
//! mutations such as [`SimAgent::detach_item`] deliberately leave the verb
//! store untouched, which is exactly how orphaned verbs arise in a real host.
//!
//! # Example
//!
//! ```rust
//! use tether_sim::{SimAgent, SimVerb};
//! use tether_types::{Agent, ItemId, VerbId, VerbProperties};
//!
//! let mut agent = SimAgent::new(1)
//!     .with_store(100)
//!     .with_item(ItemId::new(5))
//!     .with_verb(SimVerb::new(10, VerbProperties::melee("knife")).from_item(ItemId::new(5)));
//!
//! agent.detach_item(ItemId::new(5));
//! assert_eq!(agent.verb_ids().len(), 1); // the knife verb is now orphaned
//! assert!(agent.attached_items().unwrap().is_empty());
//! ```

use std::any::{Any, TypeId};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tether_types::{
    AbilityId, AbilityLink, Agent, AgentId, EffectId, HostExtensions, HostFault, ItemId,
    MaintainerLookup, MeleeRoster, RecalcResolver, Recalculate, StoreId, Verb, VerbId,
    VerbProperties, VerbStore, World,
};
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Verbs
// ────────────────────────────────────────────────────────────────────────────

/// A simulated verb.  Built with [`SimVerb::new`] and the `from_*` /
/// `cast_by` / `linked_to` builders.
#[derive(Debug, Clone)]
pub struct SimVerb {
    id: VerbId,
    caster: Option<AgentId>,
    properties: Option<VerbProperties>,
    item: Option<ItemId>,
    effect: Option<EffectId>,
    ability: Option<AbilityId>,
    store_link: Option<StoreId>,
    usable: bool,
}

impl SimVerb {
    /// A sourceless (innate) verb with the given properties.
    pub fn new(id: u64, properties: VerbProperties) -> Self {
        Self {
            id: VerbId::new(id),
            caster: None,
            properties: Some(properties),
            item: None,
            effect: None,
            ability: None,
            store_link: None,
            usable: true,
        }
    }

    /// A verb whose host properties are missing.
    pub fn malformed(id: u64) -> Self {
        Self {
            properties: None,
            ..Self::new(id, VerbProperties::utility("malformed", 0.0))
        }
    }

    pub fn from_item(mut self, item: ItemId) -> Self {
        self.item = Some(item);
        self
    }

    pub fn from_effect(mut self, effect: EffectId) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn from_ability(mut self, ability: AbilityId) -> Self {
        self.ability = Some(ability);
        self
    }

    pub fn cast_by(mut self, agent: AgentId) -> Self {
        self.caster = Some(agent);
        self
    }

    pub fn linked_to(mut self, store: StoreId) -> Self {
        self.store_link = Some(store);
        self
    }

    /// Clear the store back-link, as a half-initialised host verb has.
    pub fn unlinked(mut self) -> Self {
        self.store_link = None;
        self
    }

    pub fn unusable(mut self) -> Self {
        self.usable = false;
        self
    }

    pub fn ability(&self) -> Option<AbilityId> {
        self.ability
    }
}

impl Verb for SimVerb {
    fn id(&self) -> VerbId {
        self.id
    }

    fn caster(&self) -> Option<AgentId> {
        self.caster
    }

    fn properties(&self) -> Option<&VerbProperties> {
        self.properties.as_ref()
    }

    fn item_source(&self) -> Option<ItemId> {
        self.item
    }

    fn effect_source(&self) -> Option<EffectId> {
        self.effect
    }

    fn store_link(&self) -> Option<StoreId> {
        self.store_link
    }

    fn is_usable(&self) -> bool {
        self.usable
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

/// A simulated verb store.  `None` slots model null entries left behind by
/// a host that failed halfway through building a verb.
#[derive(Debug, Clone)]
pub struct SimStore {
    id: StoreId,
    slots: Vec<Option<SimVerb>>,
}

impl SimStore {
    pub fn new(id: u64) -> Self {
        Self {
            id: StoreId::new(id),
            slots: Vec::new(),
        }
    }

    pub fn push(&mut self, verb: SimVerb) {
        self.slots.push(Some(verb));
    }

    pub fn push_null(&mut self) {
        self.slots.push(None);
    }
}

impl VerbStore for SimStore {
    fn id(&self) -> StoreId {
        self.id
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, index: usize) -> Option<&dyn Verb> {
        self.slots
            .get(index)
            .and_then(|slot| slot.as_ref())
            .map(|verb| verb as &dyn Verb)
    }

    fn remove_at(&mut self, index: usize) -> bool {
        if index < self.slots.len() {
            self.slots.remove(index);
            true
        } else {
            false
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Maintainer
// ────────────────────────────────────────────────────────────────────────────

/// A simulated third-party verb maintainer that counts recalculations.
#[derive(Debug, Default)]
pub struct SimMaintainer {
    recalculations: Cell<u32>,
    failing: bool,
}

impl SimMaintainer {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A maintainer whose recalculation always reports a fault.
    pub fn failing() -> Rc<Self> {
        Rc::new(Self {
            recalculations: Cell::new(0),
            failing: true,
        })
    }

    pub fn recalculations(&self) -> u32 {
        self.recalculations.get()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Agent
// ────────────────────────────────────────────────────────────────────────────

/// A simulated agent with its own verb store and source collections.
#[derive(Debug)]
pub struct SimAgent {
    id: AgentId,
    destroyed: bool,
    dead: bool,
    downed: bool,
    melee_tracker: bool,
    store: Option<SimStore>,
    items: Vec<ItemId>,
    effects: Vec<EffectId>,
    abilities: Vec<AbilityId>,
    effects_unavailable: bool,
    panic_on_store_access: bool,
    interrupt_mode: InterruptMode,
    interrupts: u32,
    maintainer: Option<Rc<SimMaintainer>>,
}

/// How [`SimAgent`] answers `interrupt_verb_use`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    Normal,
    /// The host already despawned the agent and rejects the call.
    Despawned,
    /// The host panics.
    Panics,
}

impl SimAgent {
    /// A live agent with a melee subsystem and no verb store.
    pub fn new(id: u64) -> Self {
        Self {
            id: AgentId::new(id),
            destroyed: false,
            dead: false,
            downed: false,
            melee_tracker: true,
            store: None,
            items: Vec::new(),
            effects: Vec::new(),
            abilities: Vec::new(),
            effects_unavailable: false,
            panic_on_store_access: false,
            interrupt_mode: InterruptMode::Normal,
            interrupts: 0,
            maintainer: None,
        }
    }

    pub fn with_store(mut self, store_id: u64) -> Self {
        self.store = Some(SimStore::new(store_id));
        self
    }

    pub fn with_item(mut self, item: ItemId) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_effect(mut self, effect: EffectId) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_ability(mut self, ability: AbilityId) -> Self {
        self.abilities.push(ability);
        self
    }

    pub fn with_maintainer(mut self, maintainer: Rc<SimMaintainer>) -> Self {
        self.maintainer = Some(maintainer);
        self
    }

    pub fn without_melee_tracker(mut self) -> Self {
        self.melee_tracker = false;
        self
    }

    /// Bind `verb` to this agent and its store, then append it.
    ///
    /// # Panics
    ///
    /// Panics when the agent has no store; call [`with_store`][Self::with_store]
    /// first.
    pub fn with_verb(mut self, verb: SimVerb) -> Self {
        self.grant(verb);
        self
    }

    /// Append `verb` exactly as given, without binding caster or store link.
    pub fn with_raw_verb(mut self, verb: SimVerb) -> Self {
        self.store_mut().push(verb);
        self
    }

    pub fn with_null_verb(mut self) -> Self {
        self.store_mut().push_null();
        self
    }

    /// Host-side append of a freshly derived verb.
    pub fn grant(&mut self, verb: SimVerb) {
        let id = self.id;
        let store = self.store_mut();
        let verb = verb.cast_by(id).linked_to(store.id);
        store.push(verb);
    }

    pub fn detach_item(&mut self, item: ItemId) {
        debug!(agent = %self.id, %item, "sim host detached item");
        self.items.retain(|i| *i != item);
    }

    pub fn remove_effect(&mut self, effect: EffectId) {
        debug!(agent = %self.id, %effect, "sim host removed effect");
        self.effects.retain(|e| *e != effect);
    }

    pub fn forget_ability(&mut self, ability: AbilityId) {
        debug!(agent = %self.id, %ability, "sim host removed ability");
        self.abilities.retain(|a| *a != ability);
    }

    pub fn kill(&mut self) {
        self.dead = true;
    }

    pub fn down(&mut self) {
        self.downed = true;
    }

    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    /// Make the active-effect collection report a transient fault.
    pub fn set_effects_unavailable(&mut self, unavailable: bool) {
        self.effects_unavailable = unavailable;
    }

    /// Make every verb store access panic, as a host mid-teardown might.
    pub fn set_panic_on_store_access(&mut self, panic: bool) {
        self.panic_on_store_access = panic;
    }

    pub fn set_interrupt_mode(&mut self, mode: InterruptMode) {
        self.interrupt_mode = mode;
    }

    /// Successful interrupts so far.
    pub fn interrupts(&self) -> u32 {
        self.interrupts
    }

    pub fn verb_ids(&self) -> Vec<Option<VerbId>> {
        self.store
            .as_ref()
            .map(|s| s.slots.iter().map(|v| v.as_ref().map(|v| v.id)).collect())
            .unwrap_or_default()
    }

    fn store_mut(&mut self) -> &mut SimStore {
        self.store
            .as_mut()
            .expect("SimAgent has no verb store; call with_store first")
    }

    fn live_melee_verbs(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        store
            .slots
            .iter()
            .flatten()
            .filter(|v| v.is_melee_attack())
            .filter(|v| v.item.is_none_or(|i| self.items.contains(&i)))
            .filter(|v| v.effect.is_none_or(|e| self.effects.contains(&e)))
            .count()
    }
}

impl Agent for SimAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn is_downed(&self) -> bool {
        self.downed
    }

    fn verb_store(&self) -> Option<&dyn VerbStore> {
        if self.panic_on_store_access {
            panic!("sim host: verb store of {} accessed mid-teardown", self.id);
        }
        self.store.as_ref().map(|s| s as &dyn VerbStore)
    }

    fn verb_store_mut(&mut self) -> Option<&mut dyn VerbStore> {
        if self.panic_on_store_access {
            panic!("sim host: verb store of {} accessed mid-teardown", self.id);
        }
        self.store.as_mut().map(|s| s as &mut dyn VerbStore)
    }

    fn attached_items(&self) -> Result<Vec<ItemId>, HostFault> {
        Ok(self.items.clone())
    }

    fn active_effects(&self) -> Result<Vec<EffectId>, HostFault> {
        if self.effects_unavailable {
            return Err(HostFault::Unavailable("active effects".to_string()));
        }
        Ok(self.effects.clone())
    }

    fn active_abilities(&self) -> Result<Vec<AbilityId>, HostFault> {
        Ok(self.abilities.clone())
    }

    fn interrupt_verb_use(&mut self) -> Result<(), HostFault> {
        match self.interrupt_mode {
            InterruptMode::Normal => {
                self.interrupts += 1;
                Ok(())
            }
            InterruptMode::Despawned => Err(HostFault::Destroyed(self.id)),
            InterruptMode::Panics => panic!("sim host: job tracker of {} is gone", self.id),
        }
    }

    fn has_melee_tracker(&self) -> bool {
        self.melee_tracker
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// World
// ────────────────────────────────────────────────────────────────────────────

/// A simulated world holding agents, each listed as spawned, unspawned or
/// (to mirror host bookkeeping quirks) both.
#[derive(Debug, Default)]
pub struct SimWorld {
    agents: BTreeMap<AgentId, SimAgent>,
    spawned: Vec<AgentId>,
    unspawned: Vec<AgentId>,
    exploding: Vec<AgentId>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(mut self, agent: SimAgent) -> Self {
        self.spawned.push(agent.id);
        self.agents.insert(agent.id, agent);
        self
    }

    pub fn stash(mut self, agent: SimAgent) -> Self {
        self.unspawned.push(agent.id);
        self.agents.insert(agent.id, agent);
        self
    }

    /// List an already-known agent in the unspawned roster as well.
    pub fn also_unspawned(mut self, id: u64) -> Self {
        self.unspawned.push(AgentId::new(id));
        self
    }

    /// List an id in the spawned roster without any backing agent.
    pub fn dangling(mut self, id: u64) -> Self {
        self.spawned.push(AgentId::new(id));
        self
    }

    pub fn agent(&self, id: u64) -> Option<&SimAgent> {
        self.agents.get(&AgentId::new(id))
    }

    /// Make looking up `id` panic, as a host with a corrupt agent table
    /// might.
    pub fn explode_on_lookup(mut self, id: u64) -> Self {
        self.exploding.push(AgentId::new(id));
        self
    }
}

impl World for SimWorld {
    fn spawned_agents(&self) -> Vec<AgentId> {
        self.spawned.clone()
    }

    fn unspawned_agents(&self) -> Vec<AgentId> {
        self.unspawned.clone()
    }

    fn agent_mut(&mut self, id: AgentId) -> Option<&mut dyn Agent> {
        if self.exploding.contains(&id) {
            panic!("sim host: agent table entry for {id} is corrupt");
        }
        self.agents.get_mut(&id).map(|a| a as &mut dyn Agent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extensions
// ────────────────────────────────────────────────────────────────────────────

/// How the simulated melee roster answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterMode {
    /// Counts the agent's melee verbs whose sources are still live.
    Live,
    /// Every query reports a host fault.
    Faulty,
}

/// Configurable optional hooks for the simulated host.
#[derive(Debug, Clone, Default)]
pub struct SimExtensions {
    ability_link: bool,
    maintainers: bool,
    roster: Option<RosterMode>,
    recalc_probes: Rc<Cell<u32>>,
}

impl SimExtensions {
    /// A host build without any optional hooks.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_ability_link(mut self) -> Self {
        self.ability_link = true;
        self
    }

    pub fn with_maintainers(mut self) -> Self {
        self.maintainers = true;
        self
    }

    pub fn with_melee_roster(mut self, mode: RosterMode) -> Self {
        self.roster = Some(mode);
        self
    }

    /// Shared counter of how many times a recalculation binding was
    /// resolved for a maintainer type.
    pub fn recalc_probes(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.recalc_probes)
    }
}

impl HostExtensions for SimExtensions {
    fn ability_link(&self) -> Option<Box<dyn AbilityLink>> {
        self.ability_link
            .then(|| Box::new(SimAbilityLink) as Box<dyn AbilityLink>)
    }

    fn maintainer_lookup(&self) -> Option<Box<dyn MaintainerLookup>> {
        self.maintainers
            .then(|| Box::new(SimMaintainerLookup) as Box<dyn MaintainerLookup>)
    }

    fn recalc_resolver(&self) -> Option<Box<dyn RecalcResolver>> {
        self.maintainers.then(|| {
            Box::new(SimRecalcResolver {
                probes: Rc::clone(&self.recalc_probes),
            }) as Box<dyn RecalcResolver>
        })
    }

    fn melee_roster(&self) -> Option<Box<dyn MeleeRoster>> {
        self.roster
            .map(|mode| Box::new(SimMeleeRoster { mode }) as Box<dyn MeleeRoster>)
    }
}

struct SimAbilityLink;

impl AbilityLink for SimAbilityLink {
    fn ability_of(&self, verb: &dyn Verb) -> Option<AbilityId> {
        verb.as_any().downcast_ref::<SimVerb>()?.ability()
    }
}

struct SimMaintainerLookup;

impl MaintainerLookup for SimMaintainerLookup {
    fn lookup(&self, agent: &dyn Agent) -> Result<Option<Rc<dyn Any>>, HostFault> {
        let sim = agent
            .as_any()
            .downcast_ref::<SimAgent>()
            .ok_or_else(|| HostFault::Rejected {
                what: "maintainer lookup".to_string(),
                details: format!("{} is not a simulated agent", agent.id()),
            })?;
        Ok(sim
            .maintainer
            .as_ref()
            .map(|m| Rc::clone(m) as Rc<dyn Any>))
    }
}

struct SimRecalcResolver {
    probes: Rc<Cell<u32>>,
}

impl RecalcResolver for SimRecalcResolver {
    fn resolve(&self, maintainer_type: TypeId) -> Option<Rc<dyn Recalculate>> {
        self.probes.set(self.probes.get() + 1);
        (maintainer_type == TypeId::of::<SimMaintainer>())
            .then(|| Rc::new(SimRecalculate) as Rc<dyn Recalculate>)
    }
}

struct SimRecalculate;

impl Recalculate for SimRecalculate {
    fn recalculate(&self, maintainer: &dyn Any) -> Result<(), HostFault> {
        let maintainer =
            maintainer
                .downcast_ref::<SimMaintainer>()
                .ok_or_else(|| HostFault::Rejected {
                    what: "recalculate".to_string(),
                    details: "unexpected maintainer type".to_string(),
                })?;
        if maintainer.failing {
            return Err(HostFault::Rejected {
                what: "recalculate".to_string(),
                details: "maintainer refused".to_string(),
            });
        }
        maintainer
            .recalculations
            .set(maintainer.recalculations.get() + 1);
        Ok(())
    }
}

struct SimMeleeRoster {
    mode: RosterMode,
}

impl MeleeRoster for SimMeleeRoster {
    fn has_melee_verbs(&self, agent: &dyn Agent) -> Result<bool, HostFault> {
        if self.mode == RosterMode::Faulty {
            return Err(HostFault::Unavailable("melee roster".to_string()));
        }
        let sim = agent
            .as_any()
            .downcast_ref::<SimAgent>()
            .ok_or_else(|| HostFault::Unavailable("melee roster".to_string()))?;
        Ok(sim.live_melee_verbs() > 0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_binds_caster_and_store() {
        let agent = SimAgent::new(1)
            .with_store(100)
            .with_verb(SimVerb::new(10, VerbProperties::melee("fist")));
        let store = agent.verb_store().unwrap();
        let verb = store.get(0).unwrap();
        assert_eq!(verb.caster(), Some(AgentId::new(1)));
        assert_eq!(verb.store_link(), Some(StoreId::new(100)));
    }

    #[test]
    fn raw_verb_keeps_its_own_links() {
        let agent = SimAgent::new(1)
            .with_store(100)
            .with_raw_verb(SimVerb::new(10, VerbProperties::melee("fist")).cast_by(AgentId::new(2)));
        let verb = agent.verb_store().unwrap().get(0).unwrap();
        assert_eq!(verb.caster(), Some(AgentId::new(2)));
        assert_eq!(verb.store_link(), None);
    }

    #[test]
    fn null_slot_reads_as_absent() {
        let agent = SimAgent::new(1).with_store(100).with_null_verb();
        let store = agent.verb_store().unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(0).is_none());
    }

    #[test]
    fn store_remove_at_shifts_and_rejects_out_of_range() {
        let mut store = SimStore::new(1);
        store.push(SimVerb::new(1, VerbProperties::melee("a")));
        store.push(SimVerb::new(2, VerbProperties::melee("b")));
        assert!(store.remove_at(0));
        assert_eq!(store.get(0).unwrap().id(), VerbId::new(2));
        assert!(!store.remove_at(5));
    }

    #[test]
    fn detaching_item_leaves_store_untouched() {
        let mut agent = SimAgent::new(1)
            .with_store(100)
            .with_item(ItemId::new(5))
            .with_verb(SimVerb::new(10, VerbProperties::melee("knife")).from_item(ItemId::new(5)));
        agent.detach_item(ItemId::new(5));
        assert_eq!(agent.verb_ids(), vec![Some(VerbId::new(10))]);
        assert!(agent.attached_items().unwrap().is_empty());
    }

    #[test]
    fn unavailable_effects_report_fault() {
        let mut agent = SimAgent::new(1).with_effect(EffectId::new(3));
        agent.set_effects_unavailable(true);
        assert!(matches!(
            agent.active_effects(),
            Err(HostFault::Unavailable(_))
        ));
    }

    #[test]
    fn ability_link_reads_sim_verbs() {
        let ext = SimExtensions::none().with_ability_link();
        let link = ext.ability_link().unwrap();
        let verb = SimVerb::new(1, VerbProperties::ranged("bolt", 20.0))
            .from_ability(AbilityId::new(9));
        assert_eq!(link.ability_of(&verb), Some(AbilityId::new(9)));
        assert!(SimExtensions::none().ability_link().is_none());
    }

    #[test]
    fn maintainer_recalculation_counts() {
        let maintainer = SimMaintainer::new();
        let agent = SimAgent::new(1).with_maintainer(Rc::clone(&maintainer));
        let ext = SimExtensions::none().with_maintainers();

        let found = ext.maintainer_lookup().unwrap().lookup(&agent).unwrap().unwrap();
        let recalc = ext
            .recalc_resolver()
            .unwrap()
            .resolve((*found).type_id())
            .unwrap();
        recalc.recalculate(&*found).unwrap();

        assert_eq!(maintainer.recalculations(), 1);
        assert_eq!(ext.recalc_probes().get(), 1);
    }

    #[test]
    fn resolver_ignores_foreign_types() {
        let ext = SimExtensions::none().with_maintainers();
        assert!(ext
            .recalc_resolver()
            .unwrap()
            .resolve(TypeId::of::<String>())
            .is_none());
    }

    #[test]
    fn live_roster_ignores_orphaned_melee_verbs() {
        let mut agent = SimAgent::new(1)
            .with_store(100)
            .with_item(ItemId::new(5))
            .with_verb(SimVerb::new(10, VerbProperties::melee("knife")).from_item(ItemId::new(5)));
        let roster = SimExtensions::none()
            .with_melee_roster(RosterMode::Live)
            .melee_roster()
            .unwrap();
        assert_eq!(roster.has_melee_verbs(&agent), Ok(true));
        agent.detach_item(ItemId::new(5));
        assert_eq!(roster.has_melee_verbs(&agent), Ok(false));
    }

    #[test]
    fn world_rosters_may_overlap() {
        let world = SimWorld::new()
            .spawn(SimAgent::new(1))
            .stash(SimAgent::new(2))
            .also_unspawned(1);
        assert_eq!(world.spawned_agents(), vec![AgentId::new(1)]);
        assert_eq!(
            world.unspawned_agents(),
            vec![AgentId::new(2), AgentId::new(1)]
        );
    }
}
