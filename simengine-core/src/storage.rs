//! Storage controller model - drive health counters and severity
//!
//! A controller owns physical drives grouped into virtual drives. Health is
//! never stored: it is derived on demand by feeding the counters below
//! through the severity tables carried by the topology snapshot.
//!
//! ```text
//!   PhysicalDrive ──┐
//!   PhysicalDrive ──┼─► virtual_drive_counters ─► "virtual_drive" table ─► "Optl" / "Dgrd" / ...
//!   PhysicalDrive ──┘
//!   memory errors  ───► controller_counters ────► "controller" table ────► "Optimal" / ...
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::{
    COUNTER_MEDIA_ERRORS, COUNTER_MEMORY_CORRECTABLE, COUNTER_MEMORY_UNCORRECTABLE,
    COUNTER_OTHER_ERRORS, COUNTER_PD_OFFLINE, SEVERITY_CATEGORY_CONTROLLER,
    SEVERITY_CATEGORY_VIRTUAL_DRIVE,
};
use crate::error::StorageError;
use crate::threshold::Counters;
use crate::topology::TopologySnapshot;

// =============================================================================
// Drives
// =============================================================================

/// State of one physical drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriveState {
    #[default]
    #[serde(rename = "Onln")]
    Online,
    #[serde(rename = "Offln")]
    Offline,
}

/// A physical drive in a controller slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalDrive {
    pub slot: u32,
    #[serde(default)]
    pub state: DriveState,
    #[serde(default)]
    pub media_error_count: i64,
    #[serde(default)]
    pub other_error_count: i64,
}

impl PhysicalDrive {
    /// A healthy drive.
    #[must_use]
    pub fn new(slot: u32) -> Self {
        Self {
            slot,
            state: DriveState::Online,
            media_error_count: 0,
            other_error_count: 0,
        }
    }

    fn is_offline(&self) -> bool {
        self.state == DriveState::Offline
    }
}

/// A group of physical drives presented as one volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDrive {
    pub id: u32,
    pub slots: Vec<u32>,
}

// =============================================================================
// StorageArray
// =============================================================================

/// Drives and memory counters of one storage controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageArray {
    drives: IndexMap<u32, PhysicalDrive>,
    virtual_drives: Vec<VirtualDrive>,
    #[serde(default)]
    memory_correctable_errors: i64,
    #[serde(default)]
    memory_uncorrectable_errors: i64,
}

impl StorageArray {
    /// Build an array, checking every virtual drive points at real slots.
    pub fn new(
        drives: impl IntoIterator<Item = PhysicalDrive>,
        virtual_drives: Vec<VirtualDrive>,
    ) -> Result<Self, StorageError> {
        let drives: IndexMap<u32, PhysicalDrive> = drives.into_iter().map(|d| (d.slot, d)).collect();

        for vd in &virtual_drives {
            if let Some(slot) = vd.slots.iter().find(|s| !drives.contains_key(*s)) {
                return Err(StorageError::DanglingSlot { vd: vd.id, slot: *slot });
            }
        }

        Ok(Self {
            drives,
            virtual_drives,
            memory_correctable_errors: 0,
            memory_uncorrectable_errors: 0,
        })
    }

    /// Drive in `slot`.
    pub fn drive(&self, slot: u32) -> Result<&PhysicalDrive, StorageError> {
        self.drives.get(&slot).ok_or(StorageError::UnknownSlot(slot))
    }

    fn drive_mut(&mut self, slot: u32) -> Result<&mut PhysicalDrive, StorageError> {
        self.drives.get_mut(&slot).ok_or(StorageError::UnknownSlot(slot))
    }

    fn virtual_drive(&self, id: u32) -> Result<&VirtualDrive, StorageError> {
        self.virtual_drives
            .iter()
            .find(|vd| vd.id == id)
            .ok_or(StorageError::UnknownVirtualDrive(id))
    }

    // -------------------------------------------------------------------------
    // Fault injection
    // -------------------------------------------------------------------------

    /// Take the drive in `slot` offline.
    pub fn fail_drive(&mut self, slot: u32) -> Result<(), StorageError> {
        self.drive_mut(slot)?.state = DriveState::Offline;
        tracing::info!(slot, "drive failed");
        Ok(())
    }

    /// Bring the drive in `slot` back online.
    pub fn restore_drive(&mut self, slot: u32) -> Result<(), StorageError> {
        self.drive_mut(slot)?.state = DriveState::Online;
        tracing::info!(slot, "drive restored");
        Ok(())
    }

    /// Count one media error on the drive in `slot`.
    pub fn record_media_error(&mut self, slot: u32) -> Result<i64, StorageError> {
        let drive = self.drive_mut(slot)?;
        drive.media_error_count = drive.media_error_count.saturating_add(1);
        tracing::debug!(slot, count = drive.media_error_count, "media error recorded");
        Ok(drive.media_error_count)
    }

    /// Count one "other" error on the drive in `slot`.
    pub fn record_other_error(&mut self, slot: u32) -> Result<i64, StorageError> {
        let drive = self.drive_mut(slot)?;
        drive.other_error_count = drive.other_error_count.saturating_add(1);
        tracing::debug!(slot, count = drive.other_error_count, "other error recorded");
        Ok(drive.other_error_count)
    }

    /// Record controller memory errors.
    pub fn record_memory_errors(&mut self, correctable: i64, uncorrectable: i64) {
        self.memory_correctable_errors = self.memory_correctable_errors.saturating_add(correctable.max(0));
        self.memory_uncorrectable_errors =
            self.memory_uncorrectable_errors.saturating_add(uncorrectable.max(0));
    }

    // -------------------------------------------------------------------------
    // Counters
    // -------------------------------------------------------------------------

    /// Error totals and offline count across one virtual drive.
    pub fn virtual_drive_counters(&self, id: u32) -> Result<Counters, StorageError> {
        let vd = self.virtual_drive(id)?;

        let mut media = 0i64;
        let mut other = 0i64;
        let mut offline = 0i64;
        for slot in &vd.slots {
            let drive = self.drive(*slot)?;
            media = media.saturating_add(drive.media_error_count);
            other = other.saturating_add(drive.other_error_count);
            offline += i64::from(drive.is_offline());
        }

        let mut counters = Counters::new();
        counters.insert(COUNTER_MEDIA_ERRORS.to_string(), media);
        counters.insert(COUNTER_OTHER_ERRORS.to_string(), other);
        counters.insert(COUNTER_PD_OFFLINE.to_string(), offline);
        Ok(counters)
    }

    /// Memory error counts and offline drives across the controller.
    #[must_use]
    pub fn controller_counters(&self) -> Counters {
        let offline = self.drives.values().filter(|d| d.is_offline()).count();

        let mut counters = Counters::new();
        counters.insert(COUNTER_MEMORY_CORRECTABLE.to_string(), self.memory_correctable_errors);
        counters.insert(
            COUNTER_MEMORY_UNCORRECTABLE.to_string(),
            self.memory_uncorrectable_errors,
        );
        counters.insert(
            COUNTER_PD_OFFLINE.to_string(),
            i64::try_from(offline).unwrap_or(i64::MAX),
        );
        counters
    }

    // -------------------------------------------------------------------------
    // Severity
    // -------------------------------------------------------------------------

    /// Status of one virtual drive per the topology's severity table.
    pub fn virtual_drive_status(
        &self,
        id: u32,
        topology: &TopologySnapshot,
    ) -> Result<String, StorageError> {
        let table = topology.severity_table(SEVERITY_CATEGORY_VIRTUAL_DRIVE)?;
        let counters = self.virtual_drive_counters(id)?;
        Ok(table.evaluate(&counters).to_string())
    }

    /// Status of the controller per the topology's severity table.
    pub fn controller_status(&self, topology: &TopologySnapshot) -> Result<String, StorageError> {
        let table = topology.severity_table(SEVERITY_CATEGORY_CONTROLLER)?;
        Ok(table.evaluate(&self.controller_counters()).to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"{
        "asset_types": {},
        "severity_tables": {
            "virtual_drive": {
                "optimal": "Optl",
                "statuses": {
                    "Offln": { "numPdOffline": 2 },
                    "Dgrd":  { "numPdOffline": 1, "mediaErrorCount": 10, "otherErrorCount": 3 },
                    "Optl":  { "numPdOffline": 0 }
                }
            },
            "controller": {
                "optimal": "Optimal",
                "statuses": {
                    "Failed":         { "memoryUncorrectableErrors": 1 },
                    "NeedsAttention": { "memoryCorrectableErrors": 5, "numPdOffline": -1 },
                    "Optimal":        { "memoryCorrectableErrors": 0 }
                }
            }
        },
        "assets": []
    }"#;

    fn topology() -> TopologySnapshot {
        TopologySnapshot::from_json_str(TABLES).unwrap()
    }

    /// Two mirrored pairs: vd 0 on slots 0/1, vd 1 on slots 2/3.
    fn array() -> StorageArray {
        StorageArray::new(
            (0..4).map(PhysicalDrive::new),
            vec![
                VirtualDrive { id: 0, slots: vec![0, 1] },
                VirtualDrive { id: 1, slots: vec![2, 3] },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_healthy_array_is_optimal() {
        let topo = topology();
        let arr = array();
        assert_eq!(arr.virtual_drive_status(0, &topo).unwrap(), "Optl");
        assert_eq!(arr.controller_status(&topo).unwrap(), "Optimal");
    }

    #[test]
    fn test_failed_drive_degrades_its_virtual_drive_only() {
        let topo = topology();
        let mut arr = array();
        arr.fail_drive(1).unwrap();

        assert_eq!(arr.virtual_drive_status(0, &topo).unwrap(), "Dgrd");
        assert_eq!(arr.virtual_drive_status(1, &topo).unwrap(), "Optl");

        arr.fail_drive(0).unwrap();
        assert_eq!(arr.virtual_drive_status(0, &topo).unwrap(), "Offln");

        arr.restore_drive(0).unwrap();
        arr.restore_drive(1).unwrap();
        assert_eq!(arr.virtual_drive_status(0, &topo).unwrap(), "Optl");
    }

    #[test]
    fn test_media_errors_accumulate_across_drives() {
        let topo = topology();
        let mut arr = array();
        for _ in 0..5 {
            arr.record_media_error(2).unwrap();
            arr.record_media_error(3).unwrap();
        }

        let counters = arr.virtual_drive_counters(1).unwrap();
        assert_eq!(counters[COUNTER_MEDIA_ERRORS], 10);
        assert_eq!(arr.virtual_drive_status(1, &topo).unwrap(), "Dgrd");
    }

    #[test]
    fn test_other_errors_degrade_virtual_drive() {
        let topo = topology();
        let mut arr = array();
        arr.record_other_error(0).unwrap();
        arr.record_other_error(1).unwrap();
        assert_eq!(arr.virtual_drive_status(0, &topo).unwrap(), "Optl");

        assert_eq!(arr.record_other_error(1).unwrap(), 2);
        assert_eq!(arr.virtual_drive_counters(0).unwrap()[COUNTER_OTHER_ERRORS], 3);
        assert_eq!(arr.virtual_drive_status(0, &topo).unwrap(), "Dgrd");
        assert_eq!(arr.virtual_drive_status(1, &topo).unwrap(), "Optl");
    }

    #[test]
    fn test_never_sentinel_ignores_offline_drives_for_controller() {
        let topo = topology();
        let mut arr = array();
        arr.fail_drive(0).unwrap();

        assert_eq!(arr.controller_counters()[COUNTER_PD_OFFLINE], 1);
        assert_eq!(arr.controller_status(&topo).unwrap(), "Optimal");

        arr.record_memory_errors(5, 0);
        assert_eq!(arr.controller_status(&topo).unwrap(), "NeedsAttention");

        arr.record_memory_errors(0, 1);
        assert_eq!(arr.controller_status(&topo).unwrap(), "Failed");
    }

    #[test]
    fn test_unknown_slot_and_virtual_drive() {
        let mut arr = array();
        assert!(matches!(arr.fail_drive(9), Err(StorageError::UnknownSlot(9))));
        assert!(matches!(
            arr.virtual_drive_counters(7),
            Err(StorageError::UnknownVirtualDrive(7))
        ));
    }

    #[test]
    fn test_dangling_slot_is_rejected() {
        let result = StorageArray::new(
            vec![PhysicalDrive::new(0)],
            vec![VirtualDrive { id: 0, slots: vec![0, 5] }],
        );
        assert!(matches!(result, Err(StorageError::DanglingSlot { vd: 0, slot: 5 })));
    }

    #[test]
    fn test_missing_table_is_a_config_error() {
        let topo = TopologySnapshot::default();
        assert!(matches!(
            array().controller_status(&topo),
            Err(StorageError::Config(_))
        ));
    }
}
