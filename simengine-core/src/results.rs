//! Event results - immutable descriptors of what a transition did.

use serde::{Deserialize, Serialize};

use crate::state::{AssetKey, AssetType, Load, PowerStatus};

/// Outcome of a power transition (requested or voltage-driven).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerEventResult {
    pub asset_key: AssetKey,
    pub asset_type: AssetType,
    pub old_state: PowerStatus,
    pub new_state: PowerStatus,
    /// Load delta caused by the transition itself.
    pub load_change: Load,
    /// `true` when the asset went down through a graceful shutdown.
    pub graceful: bool,
}

impl PowerEventResult {
    /// Did the power status flip?
    #[must_use]
    pub fn changed(&self) -> bool {
        self.old_state != self.new_state
    }
}

/// Outcome of a load-only change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadEventResult {
    pub asset_key: AssetKey,
    pub old_load: Load,
    pub new_load: Load,
}

impl LoadEventResult {
    /// Signed change (`new - old`).
    #[must_use]
    pub fn difference(&self) -> Load {
        self.new_load - self.old_load
    }
}
