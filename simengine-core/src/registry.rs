//! Asset-type registry - which behavior each asset type gets
//!
//! An explicit object handed to whatever assembles the graph. There is no
//! process-wide registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::asset::variants::{Outlet, Pdu, Server, StorageController, Ups};
use crate::asset::{Asset, PowerBehavior};
use crate::clock::SharedClock;
use crate::error::ConfigError;
use crate::state::{AssetState, AssetType};
use crate::topology::{AssetSpec, TopologySnapshot};

/// Maps asset-type names to hardware behavior.
#[derive(Debug, Default, Clone)]
pub struct AssetRegistry {
    behaviors: HashMap<AssetType, Arc<dyn PowerBehavior>>,
}

impl AssetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in variants under their canonical names.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register("outlet", Arc::new(Outlet))
            .register("ups", Arc::new(Ups))
            .register("pdu", Arc::new(Pdu))
            .register("server", Arc::new(Server))
            .register("storage_controller", Arc::new(StorageController));
        registry
    }

    /// Register (or replace) the behavior for an asset type.
    pub fn register(
        &mut self,
        asset_type: impl Into<AssetType>,
        behavior: Arc<dyn PowerBehavior>,
    ) -> &mut Self {
        self.behaviors.insert(asset_type.into(), behavior);
        self
    }

    /// Is this asset type known?
    #[must_use]
    pub fn contains(&self, asset_type: &AssetType) -> bool {
        self.behaviors.contains_key(asset_type)
    }

    /// Build the asset described by `spec`, reading its static properties
    /// from the snapshot.
    pub fn build(
        &self,
        spec: &AssetSpec,
        topology: &TopologySnapshot,
        clock: SharedClock,
    ) -> Result<Asset, ConfigError> {
        let behavior = self
            .behaviors
            .get(&spec.asset_type)
            .cloned()
            .ok_or_else(|| ConfigError::UnregisteredAssetType(spec.asset_type.to_string()))?;
        let properties = topology.properties(&spec.asset_type)?;

        let state = AssetState::new(spec.key, spec.asset_type.clone(), properties, clock);
        Ok(Asset::new(state, behavior))
    }
}
