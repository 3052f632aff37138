//! Configuration – reads/writes the host-provided `tether.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! `TETHER_*` environment variables override whatever the file says.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tether_kernel::GuardConfig;
use tether_types::TetherError;
use thiserror::Error;

/// Lifecycle tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Run the one-time full reconciliation pass on load / new session.
    pub full_pass_on_load: bool,
    /// Reconcile an agent whenever its stance changes.
    pub reconcile_on_stance_change: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            full_pass_on_load: true,
            reconcile_on_stance_change: true,
        }
    }
}

/// Persisted configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub guards: GuardConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<ConfigError> for TetherError {
    fn from(err: ConfigError) -> Self {
        TetherError::Config(err.to_string())
    }
}

impl TetherConfig {
    /// Reject values the guards cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let range = self.guards.min_fallback_range;
        if !range.is_finite() || range <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "guards.min_fallback_range",
                reason: format!("must be positive and finite, got {range}"),
            });
        }
        Ok(())
    }
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
///
/// Environment overrides are applied before validation.
pub fn load_from(path: &Path) -> Result<Option<TetherConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut cfg: TetherConfig = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Like [`load_from`], falling back to defaults (plus environment
/// overrides) when the file is absent.
pub fn load_or_default(path: &Path) -> Result<TetherConfig, ConfigError> {
    match load_from(path)? {
        Some(cfg) => Ok(cfg),
        None => {
            let mut cfg = TetherConfig::default();
            apply_env_overrides(&mut cfg);
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

/// Apply `TETHER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TETHER_RECONCILE_ON_HOSTILE` | `guards.reconcile_on_hostile_response` |
/// | `TETHER_RECONCILE_ON_MELEE` | `guards.reconcile_on_melee_selection` |
/// | `TETHER_MIN_FALLBACK_RANGE` | `guards.min_fallback_range` |
/// | `TETHER_FULL_PASS_ON_LOAD` | `lifecycle.full_pass_on_load` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut TetherConfig) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides_from(cfg: &mut TetherConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TETHER_RECONCILE_ON_HOSTILE").and_then(|v| parse_flag(&v)) {
        cfg.guards.reconcile_on_hostile_response = v;
    }
    if let Some(v) = lookup("TETHER_RECONCILE_ON_MELEE").and_then(|v| parse_flag(&v)) {
        cfg.guards.reconcile_on_melee_selection = v;
    }
    if let Some(v) = lookup("TETHER_MIN_FALLBACK_RANGE").and_then(|v| v.trim().parse::<f32>().ok())
    {
        cfg.guards.min_fallback_range = v;
    }
    if let Some(v) = lookup("TETHER_FULL_PASS_ON_LOAD").and_then(|v| parse_flag(&v)) {
        cfg.lifecycle.full_pass_on_load = v;
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save the config to `path`, creating parent directories if necessary.
pub fn save_to(cfg: &TetherConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    fs::write(path, raw).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}
