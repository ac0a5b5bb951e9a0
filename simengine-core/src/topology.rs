//! Topology snapshot - read-only view of the asset graph and its data
//!
//! TigerStyle: Validate everything up front, trust it afterwards.
//!
//! The snapshot is handed to the bus when assets are attached. Per-type
//! static properties and severity tables are read from it once; nothing is
//! re-fetched while events are flowing.
//!
//! # Format
//!
//! ```json
//! {
//!   "asset_types": {
//!     "outlet": { "min_voltage": 0.0, "power_consumption": 0.0 },
//!     "server": { "min_voltage": 90.0, "power_consumption": 480.0 }
//!   },
//!   "severity_tables": {
//!     "controller": {
//!       "optimal": "Optimal",
//!       "statuses": {
//!         "Optimal":    { "numPdOffline": 0 },
//!         "NeedsAttention": { "numPdOffline": 1 }
//!       }
//!     }
//!   },
//!   "assets": [
//!     { "key": 1, "asset_type": "outlet", "children": [2], "input_voltage": 120.0 },
//!     { "key": 2, "asset_type": "server" }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::{TOPOLOGY_ASSETS_COUNT_MAX, VOLTAGE_VOLTS_MAX};
use crate::error::ConfigError;
use crate::state::{AssetKey, AssetProperties, AssetType};
use crate::threshold::SeverityTable;

/// One asset in the power graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub key: AssetKey,
    pub asset_type: AssetType,
    /// Assets powered by this one.
    #[serde(default)]
    pub children: Vec<AssetKey>,
    /// Feed voltage applied when the graph is energized (root feeds).
    #[serde(default)]
    pub input_voltage: Option<f64>,
}

/// Everything the engine needs from the topology store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub asset_types: IndexMap<AssetType, AssetProperties>,
    #[serde(default)]
    pub severity_tables: IndexMap<String, SeverityTable>,
    pub assets: Vec<AssetSpec>,
}

impl TopologySnapshot {
    /// Parse and validate a JSON snapshot.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Read, parse and validate a snapshot file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = tokio::fs::read_to_string(path).await?;
        let snapshot = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            assets = snapshot.assets.len(),
            "loaded topology"
        );
        Ok(snapshot)
    }

    /// Static properties for an asset type.
    pub fn properties(&self, asset_type: &AssetType) -> Result<AssetProperties, ConfigError> {
        self.asset_types
            .get(asset_type)
            .copied()
            .ok_or_else(|| ConfigError::MissingAssetType(asset_type.to_string()))
    }

    /// Severity table for a category.
    pub fn severity_table(&self, category: &str) -> Result<&SeverityTable, ConfigError> {
        self.severity_tables
            .get(category)
            .ok_or_else(|| ConfigError::MissingSeverityTable(category.to_string()))
    }

    /// Parent keys for every asset (assets without parents map to empty).
    ///
    /// A validated snapshot gives every asset at most one parent.
    #[must_use]
    pub fn parents(&self) -> HashMap<AssetKey, Vec<AssetKey>> {
        let mut parents: HashMap<AssetKey, Vec<AssetKey>> =
            self.assets.iter().map(|a| (a.key, Vec::new())).collect();
        for asset in &self.assets {
            for child in &asset.children {
                parents.entry(*child).or_default().push(asset.key);
            }
        }
        parents
    }

    /// Check every reference and value before any asset is attached.
    ///
    /// Each asset has at most one feeding parent, so its load is booked
    /// exactly once on the way to the root.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assets.len() > TOPOLOGY_ASSETS_COUNT_MAX {
            return Err(ConfigError::TooManyAssets {
                count: self.assets.len(),
                max: TOPOLOGY_ASSETS_COUNT_MAX,
            });
        }

        for (asset_type, props) in &self.asset_types {
            check_property(asset_type, "min_voltage", props.min_voltage)?;
            check_property(asset_type, "power_consumption", props.power_consumption)?;
        }

        for (category, table) in &self.severity_tables {
            table.validate(category)?;
        }

        let mut keys = HashSet::new();
        for asset in &self.assets {
            if !keys.insert(asset.key) {
                return Err(ConfigError::DuplicateKey(asset.key));
            }
            self.properties(&asset.asset_type)?;
            if let Some(volts) = asset.input_voltage {
                if !volts.is_finite() || !(0.0..=VOLTAGE_VOLTS_MAX).contains(&volts) {
                    return Err(ConfigError::InvalidVoltage {
                        key: asset.key,
                        value: volts,
                    });
                }
            }
        }

        let mut fed_by: HashMap<AssetKey, AssetKey> = HashMap::new();
        for asset in &self.assets {
            for child in &asset.children {
                if *child == asset.key {
                    return Err(ConfigError::SelfLoop(asset.key));
                }
                if !keys.contains(child) {
                    return Err(ConfigError::UnknownChild {
                        parent: asset.key,
                        child: *child,
                    });
                }
                if let Some(first) = fed_by.insert(*child, asset.key) {
                    return Err(ConfigError::SharedChild {
                        child: *child,
                        first,
                        second: asset.key,
                    });
                }
            }
        }

        self.check_acyclic()
    }

    fn check_acyclic(&self) -> Result<(), ConfigError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let children: HashMap<AssetKey, &[AssetKey]> = self
            .assets
            .iter()
            .map(|a| (a.key, a.children.as_slice()))
            .collect();
        let mut marks: HashMap<AssetKey, Mark> = HashMap::new();

        for start in self.assets.iter().map(|a| a.key) {
            if marks.contains_key(&start) {
                continue;
            }
            // iterative DFS: (node, next child index)
            let mut stack = vec![(start, 0usize)];
            marks.insert(start, Mark::Visiting);

            while let Some((node, index)) = stack.pop() {
                let kids = children.get(&node).copied().unwrap_or_default();
                if let Some(child) = kids.get(index) {
                    stack.push((node, index + 1));
                    match marks.get(child) {
                        Some(Mark::Visiting) => return Err(ConfigError::Cycle(*child)),
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(*child, Mark::Visiting);
                            stack.push((*child, 0));
                        }
                    }
                } else {
                    marks.insert(node, Mark::Done);
                }
            }
        }

        Ok(())
    }
}

fn check_property(
    asset_type: &AssetType,
    property: &'static str,
    value: f64,
) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidProperty {
            asset_type: asset_type.to_string(),
            property,
            value,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RACK: &str = r#"{
        "asset_types": {
            "outlet": { "min_voltage": 0.0, "power_consumption": 0.0 },
            "pdu":    { "min_voltage": 90.0, "power_consumption": 24.0 },
            "server": { "min_voltage": 100.0, "power_consumption": 240.0 }
        },
        "severity_tables": {
            "controller": {
                "optimal": "Optimal",
                "statuses": { "Optimal": { "numPdOffline": 0 }, "Degraded": { "numPdOffline": 1 } }
            }
        },
        "assets": [
            { "key": 1, "asset_type": "outlet", "children": [2], "input_voltage": 120.0 },
            { "key": 2, "asset_type": "pdu", "children": [3, 4] },
            { "key": 3, "asset_type": "server" },
            { "key": 4, "asset_type": "server" }
        ]
    }"#;

    fn rack() -> TopologySnapshot {
        TopologySnapshot::from_json_str(RACK).expect("valid topology")
    }

    #[test]
    fn test_parse_valid_topology() {
        let topo = rack();
        assert_eq!(topo.assets.len(), 4);
        assert_eq!(
            topo.properties(&AssetType::new("server")).unwrap().power_consumption,
            240.0
        );
        assert_eq!(topo.severity_table("controller").unwrap().optimal, "Optimal");
    }

    #[test]
    fn test_parents_are_derived() {
        let parents = rack().parents();
        assert_eq!(parents[&3], vec![2]);
        assert!(parents[&1].is_empty());
    }

    #[test]
    fn test_missing_asset_type_is_rejected() {
        let mut topo = rack();
        topo.assets[2].asset_type = AssetType::new("storage_controller");
        assert!(matches!(topo.validate(), Err(ConfigError::MissingAssetType(_))));
    }

    #[test]
    fn test_missing_severity_table_is_an_error() {
        assert!(matches!(
            rack().severity_table("virtual_drive"),
            Err(ConfigError::MissingSeverityTable(_))
        ));
    }

    #[test]
    fn test_unknown_child_is_rejected() {
        let mut topo = rack();
        topo.assets[3].children.push(99);
        assert!(matches!(
            topo.validate(),
            Err(ConfigError::UnknownChild { parent: 4, child: 99 })
        ));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut topo = rack();
        topo.assets[3].children.push(1);
        assert!(matches!(topo.validate(), Err(ConfigError::Cycle(_))));
    }

    #[test]
    fn test_child_with_two_parents_is_rejected() {
        let json = RACK.replace(
            r#"{ "key": 4, "asset_type": "server" }"#,
            r#"{ "key": 4, "asset_type": "server" },
            { "key": 5, "asset_type": "pdu", "children": [4] }"#,
        );
        assert!(matches!(
            TopologySnapshot::from_json_str(&json),
            Err(ConfigError::SharedChild { child: 4, first: 2, second: 5 })
        ));
    }

    #[test]
    fn test_child_listed_twice_by_one_parent_is_rejected() {
        let mut topo = rack();
        topo.assets[1].children.push(3);
        assert!(matches!(
            topo.validate(),
            Err(ConfigError::SharedChild { child: 3, first: 2, second: 2 })
        ));
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut topo = rack();
        topo.assets[3].key = 3;
        assert!(matches!(topo.validate(), Err(ConfigError::DuplicateKey(3))));
    }

    #[test]
    fn test_negative_property_is_rejected() {
        let mut topo = rack();
        topo.asset_types[1].min_voltage = -5.0;
        assert!(matches!(
            topo.validate(),
            Err(ConfigError::InvalidProperty { property: "min_voltage", .. })
        ));
    }

    #[test]
    fn test_malformed_threshold_fails_parsing() {
        let bad = RACK.replace(r#""Degraded": { "numPdOffline": 1 }"#, r#""Degraded": { "numPdOffline": -3 }"#);
        assert!(TopologySnapshot::from_json_str(&bad).is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        tokio::fs::write(&path, RACK).await.unwrap();

        let topo = TopologySnapshot::load(&path).await.unwrap();
        assert_eq!(topo, rack());
    }
}
