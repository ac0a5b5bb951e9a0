//! Asset State - the mutable record owned by one hardware node
//!
//! TigerStyle: Explicit types, invariants checked at the mutators.
//!
//! Mutators are crate-private. Only the owning [`Asset`](crate::asset::Asset)
//! writes to its state; everything else reads through getters or an
//! [`AssetSnapshot`].

use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::clock::SharedClock;
use crate::constants::{LOAD_MICROS_MAX, LOAD_MICROS_PER_UNIT};

/// Externally assigned asset identifier, stable for the whole run.
pub type AssetKey = u64;

// =============================================================================
// Asset Type
// =============================================================================

/// Tag selecting static properties, severity tables and hardware behavior.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetType(String);

impl AssetType {
    /// Create a type tag.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// =============================================================================
// Power Status
// =============================================================================

/// Power state of an asset. `Down` until explicitly powered up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    #[default]
    Down,
    Up,
}

impl PowerStatus {
    /// Is the asset powered?
    #[must_use]
    pub fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

// =============================================================================
// Load
// =============================================================================

/// Load in fixed-point micro-units (1 unit = 1e-6 A).
///
/// Adding and then subtracting the same `Load` restores the original value
/// exactly, which `f64` arithmetic does not guarantee. A `Load` may be
/// negative when it represents a difference; booked asset load never is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Load(i64);

impl Load {
    /// No load.
    pub const ZERO: Self = Self(0);

    /// Convert from amps. Non-finite input maps to zero.
    #[must_use]
    pub fn from_amps(amps: f64) -> Self {
        if !amps.is_finite() {
            return Self::ZERO;
        }
        let micros = (amps * LOAD_MICROS_PER_UNIT).round();
        Self(micros.clamp(-(LOAD_MICROS_MAX as f64), LOAD_MICROS_MAX as f64) as i64)
    }

    /// Load drawn at `voltage` by something consuming `power_consumption`.
    /// Zero voltage draws nothing.
    #[must_use]
    pub fn at_voltage(power_consumption: f64, voltage: f64) -> Self {
        if voltage == 0.0 {
            return Self::ZERO;
        }
        Self::from_amps(power_consumption / voltage)
    }

    /// Raw micro-units.
    #[must_use]
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Raw micro-units.
    #[must_use]
    pub fn micros(self) -> i64 {
        self.0
    }

    /// Value in amps.
    #[must_use]
    pub fn as_amps(self) -> f64 {
        self.0 as f64 / LOAD_MICROS_PER_UNIT
    }

    /// Is this value below zero?
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Load {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Load {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Load {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}A", self.as_amps())
    }
}

// =============================================================================
// Static properties
// =============================================================================

/// Read-only per-type properties from the topology snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetProperties {
    /// Voltage at or below which the asset cannot stay powered.
    pub min_voltage: f64,
    /// Nominal draw used for load calculation.
    pub power_consumption: f64,
}

// =============================================================================
// Asset State
// =============================================================================

/// Electrical/operational record of one asset.
#[derive(Debug)]
pub struct AssetState {
    key: AssetKey,
    asset_type: AssetType,
    properties: AssetProperties,
    input_voltage: f64,
    load: Load,
    status: PowerStatus,
    boot_time: u64,
    clock: SharedClock,
}

impl AssetState {
    /// Create the state for a freshly attached asset: `Down`, unpowered,
    /// no load, boot time stamped from `clock`.
    #[must_use]
    pub fn new(
        key: AssetKey,
        asset_type: AssetType,
        properties: AssetProperties,
        clock: SharedClock,
    ) -> Self {
        let boot_time = clock.now_ms();
        Self {
            key,
            asset_type,
            properties,
            input_voltage: 0.0,
            load: Load::ZERO,
            status: PowerStatus::Down,
            boot_time,
            clock,
        }
    }

    /// Asset key.
    #[must_use]
    pub fn key(&self) -> AssetKey {
        self.key
    }

    /// Asset type tag.
    #[must_use]
    pub fn asset_type(&self) -> &AssetType {
        &self.asset_type
    }

    /// Measured input voltage (0 = unpowered).
    #[must_use]
    pub fn input_voltage(&self) -> f64 {
        self.input_voltage
    }

    /// Currently booked load.
    #[must_use]
    pub fn load(&self) -> Load {
        self.load
    }

    /// Power status.
    #[must_use]
    pub fn status(&self) -> PowerStatus {
        self.status
    }

    /// Timestamp (ms) of the last transition to `Up`.
    #[must_use]
    pub fn boot_time(&self) -> u64 {
        self.boot_time
    }

    /// Minimum voltage for this asset type.
    #[must_use]
    pub fn min_voltage(&self) -> f64 {
        self.properties.min_voltage
    }

    /// Nominal power consumption for this asset type.
    #[must_use]
    pub fn power_consumption(&self) -> f64 {
        self.properties.power_consumption
    }

    /// Load this asset itself draws when fed `voltage`.
    #[must_use]
    pub fn own_load_at(&self, voltage: f64) -> Load {
        Load::at_voltage(self.properties.power_consumption, voltage)
    }

    // -------------------------------------------------------------------------
    // Mutators (crate-private)
    // -------------------------------------------------------------------------

    pub(crate) fn power_up(&mut self) -> PowerStatus {
        self.status = PowerStatus::Up;
        self.reset_boot_time();
        self.status
    }

    pub(crate) fn power_off(&mut self) -> PowerStatus {
        self.status = PowerStatus::Down;
        self.status
    }

    pub(crate) fn shut_down(&mut self) -> PowerStatus {
        self.status = PowerStatus::Down;
        self.status
    }

    pub(crate) fn reset_boot_time(&mut self) {
        self.boot_time = self.clock.now_ms();
    }

    pub(crate) fn update_input_voltage(&mut self, voltage: f64) {
        assert!(
            voltage.is_finite() && voltage >= 0.0,
            "input voltage must be finite and non-negative, got {}",
            voltage
        );
        self.input_voltage = voltage;
    }

    /// Book a new load value, saturating at zero.
    pub(crate) fn update_load(&mut self, load: Load) -> Load {
        let booked = if load.is_negative() {
            tracing::warn!(
                asset_key = self.key,
                requested = %load,
                "load would go negative, clamping to zero"
            );
            Load::ZERO
        } else {
            load
        };

        self.load = booked;

        // Postcondition
        assert!(!self.load.is_negative(), "load must never be negative");
        booked
    }

    /// Copy the observable fields.
    #[must_use]
    pub fn snapshot(&self) -> AssetSnapshot {
        AssetSnapshot {
            key: self.key,
            asset_type: self.asset_type.clone(),
            status: self.status,
            input_voltage: self.input_voltage,
            load_amps: self.load.as_amps(),
            boot_time_ms: self.boot_time,
        }
    }
}

/// Read-only copy of an asset's state for observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub key: AssetKey,
    pub asset_type: AssetType,
    pub status: PowerStatus,
    pub input_voltage: f64,
    pub load_amps: f64,
    pub boot_time_ms: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use std::sync::Arc;

    fn state_with(clock: Arc<SimClock>) -> AssetState {
        AssetState::new(
            7,
            AssetType::new("server"),
            AssetProperties {
                min_voltage: 100.0,
                power_consumption: 240.0,
            },
            clock,
        )
    }

    #[test]
    fn test_new_state_is_down_and_unloaded() {
        let state = state_with(SimClock::at_ms(42).shared());
        assert_eq!(state.status(), PowerStatus::Down);
        assert_eq!(state.load(), Load::ZERO);
        assert_eq!(state.input_voltage(), 0.0);
        assert_eq!(state.boot_time(), 42);
    }

    #[test]
    fn test_power_up_resets_boot_time() {
        let clock = SimClock::new().shared();
        let mut state = state_with(clock.clone());

        clock.advance_ms(1_000);
        assert_eq!(state.power_up(), PowerStatus::Up);
        assert_eq!(state.boot_time(), 1_000);

        clock.advance_ms(1_000);
        assert_eq!(state.power_off(), PowerStatus::Down);
        assert_eq!(state.boot_time(), 1_000);
    }

    #[test]
    fn test_update_load_clamps_negative() {
        let mut state = state_with(SimClock::new().shared());
        assert_eq!(state.update_load(Load::from_amps(-3.0)), Load::ZERO);
        assert_eq!(state.load(), Load::ZERO);
    }

    #[test]
    fn test_load_at_zero_voltage_is_zero() {
        assert_eq!(Load::at_voltage(240.0, 0.0), Load::ZERO);
        assert_eq!(Load::at_voltage(240.0, 120.0), Load::from_amps(2.0));
    }

    #[test]
    fn test_load_round_trip_is_exact() {
        let base = Load::from_amps(0.1);
        let step = Load::from_amps(0.2);
        assert_eq!(base + step - step, base);
    }

    #[test]
    fn test_non_finite_amps_map_to_zero() {
        assert_eq!(Load::from_amps(f64::NAN), Load::ZERO);
        assert_eq!(Load::from_amps(f64::INFINITY), Load::ZERO);
    }

    #[test]
    #[should_panic(expected = "input voltage must be finite")]
    fn test_negative_voltage_rejected() {
        let mut state = state_with(SimClock::new().shared());
        state.update_input_voltage(-1.0);
    }
}
