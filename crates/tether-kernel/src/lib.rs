//! `tether-kernel` – verb/source referential integrity
//!
//! Keeps an agent's verb store consistent with the sources (items, effects,
//! abilities) its verbs were derived from, and guards the host call sites
//! that would crash on a dangling verb.
//!
//! # Modules
//!
//! - [`store_access`] – read and in-place removal over an agent's verb
//!   store, plus the position-stable snapshot used before mutation.
//! - [`sources`] – [`LiveSources`][sources::LiveSources]: one snapshot of
//!   an agent's live sources per pass.
//! - [`classifier`] – [`Classifier`][classifier::Classifier]: ordered
//!   [`OrphanRule`][classifier::OrphanRule]s deciding whether a verb is
//!   orphaned and why.
//! - [`reconciler`] – [`Reconciler`][reconciler::Reconciler]: the
//!   classify-and-remove pass, for one agent or a whole world.
//! - [`guards`] – [`Guards`][guards::Guards]: the four host interception
//!   points and their [`Verdict`][guards::Verdict]s.
//! - [`melee`] – best-effort melee-verb existence check used by the melee
//!   guards.
//! - [`discovery`] – [`Discovery`][discovery::Discovery]: one-time
//!   resolution of the host's optional hooks.
//! - [`boundary`] – the outermost fault boundary every host-facing
//!   operation runs inside.
//! - [`context`] – [`Tether`][context::Tether]: discovery, reconciler and
//!   guards wired together.

pub mod boundary;
pub mod classifier;
pub mod context;
pub mod discovery;
pub mod guards;
pub mod melee;
pub mod reconciler;
pub mod sources;
pub mod store_access;

pub use classifier::{Classifier, OrphanReason, OrphanRule};
pub use context::Tether;
pub use discovery::{Discovery, MaintainerBinding};
pub use guards::{GuardConfig, Guards, MIN_FALLBACK_RANGE, Verdict};
pub use melee::MeleeAvailability;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use sources::LiveSources;
