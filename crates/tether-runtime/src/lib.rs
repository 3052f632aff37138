//! `tether-runtime` – host-facing wiring for the Tether kernel
//!
//! # Modules
//!
//! - [`lifecycle`] – [`Lifecycle`][lifecycle::Lifecycle]: turns the host's
//!   stance-change, world-loaded and new-session signals into
//!   reconciliation, running the full pass at most once per session.
//! - [`session`] – [`SessionState`][session::SessionState]: the persisted
//!   "full pass already ran" flag, round-tripped through JSON.
//! - [`config`] – [`TetherConfig`][config::TetherConfig]: TOML
//!   configuration with `TETHER_*` environment overrides.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   installs the global `tracing` subscriber with an optional OTLP span
//!   exporter.
//!
//! # Example
//!
//! ```
//! use tether_runtime::{Lifecycle, SessionState, TetherConfig};
//! use tether_types::NoExtensions;
//!
//! let lifecycle = Lifecycle::new(Box::new(NoExtensions), TetherConfig::default());
//! let session = SessionState::default();
//! assert!(!session.full_pass_done);
//! assert!(!lifecycle.is_resolved());
//! ```

pub mod config;
pub mod lifecycle;
pub mod session;
pub mod telemetry;

pub use config::{ConfigError, LifecycleConfig, TetherConfig};
pub use lifecycle::Lifecycle;
pub use session::SessionState;
pub use telemetry::{TracerProviderGuard, init_tracing};

// Re-exported so hosts can install guards without a direct dependency on
// tether-kernel.
pub use tether_kernel::{Guards, ReconcileOutcome, Verdict};
