//! [`SessionState`] – the one bit of state that survives a save/load.
//!
//! The host stores the JSON produced by [`SessionState::to_json`] through its
//! own save mechanism and hands it back on load.

use serde::{Deserialize, Serialize};
use tether_types::TetherError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// The one-time full reconciliation pass has already run for this
    /// session.
    #[serde(default)]
    pub full_pass_done: bool,
}

impl SessionState {
    pub fn to_json(&self) -> Result<String, TetherError> {
        serde_json::to_string(self).map_err(|e| TetherError::Session(e.to_string()))
    }

    /// Restore from the host's save data.  An empty payload (a save made
    /// before this state existed) yields the default.
    pub fn from_json(raw: &str) -> Result<Self, TetherError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| TetherError::Session(e.to_string()))
    }
}
