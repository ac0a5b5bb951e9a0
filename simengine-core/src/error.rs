//! Errors raised by the engine.
//!
//! Configuration problems surface when the topology is attached, before
//! any event is processed. Dispatch problems surface from the bus.

use crate::state::AssetKey;

/// Result alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Missing or malformed topology / threshold / property data.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("threshold {0} is malformed (only -1 may be negative)")]
    MalformedThreshold(i64),

    #[error("severity table '{0}' has no statuses")]
    EmptySeverityTable(String),

    #[error("severity table '{category}' does not list its optimal status '{optimal}'")]
    MissingOptimalStatus { category: String, optimal: String },

    #[error("no severity table for category '{0}'")]
    MissingSeverityTable(String),

    #[error("no static properties for asset type '{0}'")]
    MissingAssetType(String),

    #[error("asset type '{asset_type}' has invalid {property}: {value}")]
    InvalidProperty {
        asset_type: String,
        property: &'static str,
        value: f64,
    },

    #[error("asset type '{0}' is not registered")]
    UnregisteredAssetType(String),

    #[error("duplicate asset key {0}")]
    DuplicateKey(AssetKey),

    #[error("asset {parent} lists unknown child {child}")]
    UnknownChild { parent: AssetKey, child: AssetKey },

    #[error("asset {child} is fed by both {first} and {second}")]
    SharedChild {
        child: AssetKey,
        first: AssetKey,
        second: AssetKey,
    },

    #[error("asset {0} powers itself")]
    SelfLoop(AssetKey),

    #[error("power graph contains a cycle through asset {0}")]
    Cycle(AssetKey),

    #[error("asset {key} has invalid input voltage {value}")]
    InvalidVoltage { key: AssetKey, value: f64 },

    #[error("topology has {count} assets, max is {max}")]
    TooManyAssets { count: usize, max: usize },

    #[error("failed to parse topology: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read topology: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while delivering events across the asset graph.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("asset not found: {0}")]
    UnknownAsset(AssetKey),

    #[error("voltage {value} for asset {key} is outside 0..={max}")]
    VoltageOutOfRange { key: AssetKey, value: f64, max: f64 },

    #[error("cascade from asset {origin} exceeded {max} deliveries")]
    CascadeLimit { origin: AssetKey, max: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by the storage-controller model.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no physical drive in slot {0}")]
    UnknownSlot(u32),

    #[error("no virtual drive with id {0}")]
    UnknownVirtualDrive(u32),

    #[error("virtual drive {vd} references missing slot {slot}")]
    DanglingSlot { vd: u32, slot: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
