//! [`Classifier`] – orphan rule engine.
//!
//! Every verb in a store is passed through [`Classifier::classify`].  Each
//! registered [`OrphanRule`] is evaluated in order; the first rule that
//! fires names the [`OrphanReason`] and the verb is scheduled for removal.
//! Because every rule independently implies orphan status, the order only
//! affects how early classification stops, never the verdict.
//!
//! The default rule set, in order:
//! - [`MalformedRule`] – the verb has no host properties.
//! - [`OwnerMismatchRule`] – the verb's caster is not the agent under
//!   inspection.
//! - [`ItemSourceRule`], [`EffectSourceRule`], [`AbilitySourceRule`] – the
//!   verb's source is not in the live-source snapshot.
//! - [`StoreLinkRule`] – the verb has no back-link to any store.
//!
//! A sourceless verb passes all three source rules.

use tether_types::{AbilityId, AbilityLink, AgentId, EffectId, ItemId, Verb};

use crate::sources::LiveSources;

// ────────────────────────────────────────────────────────────────────────────
// Reasons
// ────────────────────────────────────────────────────────────────────────────

/// Why a verb was classified as orphaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanReason {
    /// The store slot holds no verb at all.
    Missing,
    Malformed,
    OwnerMismatch {
        expected: AgentId,
        found: Option<AgentId>,
    },
    ItemGone(ItemId),
    EffectGone(EffectId),
    AbilityGone(AbilityId),
    NoStoreLink,
}

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// Per-pass facts every rule may consult.
pub struct ClassifyContext<'a> {
    /// The agent whose store is being reconciled.
    pub agent: AgentId,
    pub live: &'a LiveSources,
    /// `None` on host builds without ability-sourced verbs.
    pub ability_link: Option<&'a dyn AbilityLink>,
}

/// A single condition under which a verb is orphaned.
pub trait OrphanRule {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return the reason when the rule fires for `verb`, `None` otherwise.
    fn check(&self, verb: &dyn Verb, ctx: &ClassifyContext<'_>) -> Option<OrphanReason>;
}

// ────────────────────────────────────────────────────────────────────────────
// Classifier
// ────────────────────────────────────────────────────────────────────────────

/// Ordered set of [`OrphanRule`]s.
pub struct Classifier {
    rules: Vec<Box<dyn OrphanRule>>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(MalformedRule),
                Box::new(OwnerMismatchRule),
                Box::new(ItemSourceRule),
                Box::new(EffectSourceRule),
                Box::new(AbilitySourceRule),
                Box::new(StoreLinkRule),
            ],
        }
    }
}

impl Classifier {
    /// A classifier with no rules; every present verb is valid.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule.  Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn OrphanRule>) {
        self.rules.push(rule);
    }

    /// Classify one store slot.  `None` means the verb is valid.
    pub fn classify(
        &self,
        verb: Option<&dyn Verb>,
        ctx: &ClassifyContext<'_>,
    ) -> Option<OrphanReason> {
        self.explain(verb, ctx).map(|(_, reason)| reason)
    }

    /// [`classify`][Self::classify], also naming the rule that fired.  An
    /// empty slot is reported under `"missing"`.
    pub fn explain(
        &self,
        verb: Option<&dyn Verb>,
        ctx: &ClassifyContext<'_>,
    ) -> Option<(&str, OrphanReason)> {
        let Some(verb) = verb else {
            return Some(("missing", OrphanReason::Missing));
        };
        self.rules
            .iter()
            .find_map(|rule| rule.check(verb, ctx).map(|reason| (rule.name(), reason)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

pub struct MalformedRule;

impl OrphanRule for MalformedRule {
    fn name(&self) -> &str {
        "malformed"
    }

    fn check(&self, verb: &dyn Verb, _ctx: &ClassifyContext<'_>) -> Option<OrphanReason> {
        verb.properties().is_none().then_some(OrphanReason::Malformed)
    }
}

pub struct OwnerMismatchRule;

impl OrphanRule for OwnerMismatchRule {
    fn name(&self) -> &str {
        "owner_mismatch"
    }

    fn check(&self, verb: &dyn Verb, ctx: &ClassifyContext<'_>) -> Option<OrphanReason> {
        let found = verb.caster();
        (found != Some(ctx.agent)).then_some(OrphanReason::OwnerMismatch {
            expected: ctx.agent,
            found,
        })
    }
}

pub struct ItemSourceRule;

impl OrphanRule for ItemSourceRule {
    fn name(&self) -> &str {
        "item_source"
    }

    fn check(&self, verb: &dyn Verb, ctx: &ClassifyContext<'_>) -> Option<OrphanReason> {
        let item = verb.item_source()?;
        (!ctx.live.has_item(item)).then_some(OrphanReason::ItemGone(item))
    }
}

pub struct EffectSourceRule;

impl OrphanRule for EffectSourceRule {
    fn name(&self) -> &str {
        "effect_source"
    }

    fn check(&self, verb: &dyn Verb, ctx: &ClassifyContext<'_>) -> Option<OrphanReason> {
        let effect = verb.effect_source()?;
        (!ctx.live.has_effect(effect)).then_some(OrphanReason::EffectGone(effect))
    }
}

/// Skipped entirely when the host build exposes no [`AbilityLink`]: a verb
/// is never removed merely because its ability source cannot be checked.
pub struct AbilitySourceRule;

impl OrphanRule for AbilitySourceRule {
    fn name(&self) -> &str {
        "ability_source"
    }

    fn check(&self, verb: &dyn Verb, ctx: &ClassifyContext<'_>) -> Option<OrphanReason> {
        let ability = ctx.ability_link?.ability_of(verb)?;
        (!ctx.live.has_ability(ability)).then_some(OrphanReason::AbilityGone(ability))
    }
}

pub struct StoreLinkRule;

impl OrphanRule for StoreLinkRule {
    fn name(&self) -> &str {
        "store_link"
    }

    fn check(&self, verb: &dyn Verb, _ctx: &ClassifyContext<'_>) -> Option<OrphanReason> {
        verb.store_link().is_none().then_some(OrphanReason::NoStoreLink)
    }
}
