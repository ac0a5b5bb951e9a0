//! TigerStyle constants for the propagation engine.
//!
//! Units are in the name: `_MS` for milliseconds, `_VOLTS` for volts,
//! `_MICROS` for fixed-point micro-units of load.

// =============================================================================
// Time
// =============================================================================

/// Milliseconds per second.
pub const TIME_MS_PER_SEC: u64 = 1_000;

/// Largest single clock advance accepted by `SimClock` (one day).
pub const SIM_TIME_ADVANCE_MS_MAX: u64 = 24 * 60 * 60 * TIME_MS_PER_SEC;

// =============================================================================
// Electrical
// =============================================================================

/// Highest input voltage the engine accepts from a stimulus.
pub const VOLTAGE_VOLTS_MAX: f64 = 100_000.0;

/// Fixed-point scale for load bookkeeping (1 unit = 1e-6 A).
pub const LOAD_MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Largest load a single asset may book, in micro-units.
pub const LOAD_MICROS_MAX: i64 = i64::MAX / 4;

// =============================================================================
// Thresholds
// =============================================================================

/// Threshold value meaning "this counter never triggers this status".
pub const THRESHOLD_NEVER_SENTINEL: i64 = -1;

/// Severity-table category used for storage controllers.
pub const SEVERITY_CATEGORY_CONTROLLER: &str = "controller";

/// Severity-table category used for virtual drives.
pub const SEVERITY_CATEGORY_VIRTUAL_DRIVE: &str = "virtual_drive";

// =============================================================================
// Topology / dispatch
// =============================================================================

/// Maximum number of assets in one topology snapshot.
pub const TOPOLOGY_ASSETS_COUNT_MAX: usize = 100_000;

/// Maximum deliveries the bus performs for a single stimulus before it
/// gives up on reaching quiescence.
pub const DISPATCH_DELIVERIES_MAX: usize = 1_000_000;

/// Priority of handlers that compute transitions.
pub const HANDLER_PRIORITY_DEFAULT: i32 = 0;

/// Priority of the handler that commits a new input voltage. Runs after
/// every default-priority handler of the same event.
pub const HANDLER_PRIORITY_VOLTAGE_COMMIT: i32 = -1;

// =============================================================================
// Storage
// =============================================================================

/// Counter name: summed media errors across drives.
pub const COUNTER_MEDIA_ERRORS: &str = "mediaErrorCount";

/// Counter name: summed non-media errors across drives.
pub const COUNTER_OTHER_ERRORS: &str = "otherErrorCount";

/// Counter name: number of offline physical drives.
pub const COUNTER_PD_OFFLINE: &str = "numPdOffline";

/// Counter name: correctable controller memory errors.
pub const COUNTER_MEMORY_CORRECTABLE: &str = "memoryCorrectableErrors";

/// Counter name: uncorrectable controller memory errors.
pub const COUNTER_MEMORY_UNCORRECTABLE: &str = "memoryUncorrectableErrors";
