//! Event vocabulary delivered to assets.
//!
//! Events are **passive data**: they describe something that happened to a
//! neighbour (a child drew more load, the feed voltage dropped). An asset
//! handles the event and produces a result; the bus turns that result into
//! new events scoped to the asset's own neighbours.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{AssetKey, Load, PowerStatus};

// =============================================================================
// Old/New pair
// =============================================================================

/// A quantity in flux: the value before and after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OldNew<T> {
    pub old: T,
    pub new: T,
}

impl<T> OldNew<T> {
    /// Pair up two values.
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }
}

// =============================================================================
// Cascading events
// =============================================================================

/// Voltage change as seen at the output of one asset.
///
/// Built fresh by every asset that handles an input-voltage event; the bus
/// hands `out_volt.new` to the asset's children.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageEvent {
    /// Asset that produced this event.
    pub asset_key: AssetKey,
    pub state: OldNew<PowerStatus>,
    pub out_volt: OldNew<f64>,
    /// The asset's own load component before and after.
    pub load: OldNew<Load>,
}

impl VoltageEvent {
    /// Did the asset's own load component change?
    #[must_use]
    pub fn load_difference(&self) -> Load {
        self.load.new - self.load.old
    }

    /// Did the power status flip?
    #[must_use]
    pub fn status_changed(&self) -> bool {
        self.state.old != self.state.new
    }
}

/// Load change travelling from a child up to its parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadEvent {
    /// Asset whose load is described.
    pub asset_key: AssetKey,
    pub load: OldNew<Load>,
}

impl LoadEvent {
    /// Create an event describing `asset_key` moving from `old` to `new`.
    #[must_use]
    pub fn new(asset_key: AssetKey, old: Load, new: Load) -> Self {
        Self {
            asset_key,
            load: OldNew::new(old, new),
        }
    }

    /// Signed difference carried by the event.
    #[must_use]
    pub fn difference(&self) -> Load {
        self.load.new - self.load.old
    }

    /// Narrow this event to the next hop: `asset_key` currently booking
    /// `current` gets the same difference applied on top.
    #[must_use]
    pub fn next_for(&self, asset_key: AssetKey, current: Load) -> Self {
        Self::new(asset_key, current, current + self.difference())
    }
}

// =============================================================================
// Inbound vocabulary
// =============================================================================

/// Names of the events an asset subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    ChildAssetPowerUp,
    ChildAssetPowerDown,
    ChildAssetLoadIncreased,
    ChildAssetLoadDecreased,
    ChildLoadUpEvent,
    ChildLoadDownEvent,
    ButtonPowerUpPressed,
    ButtonPowerDownPressed,
    InputVoltageUpEvent,
    InputVoltageDownEvent,
}

impl EventKind {
    /// Every event kind, in declaration order.
    #[must_use]
    pub fn all() -> &'static [EventKind] {
        &[
            Self::ChildAssetPowerUp,
            Self::ChildAssetPowerDown,
            Self::ChildAssetLoadIncreased,
            Self::ChildAssetLoadDecreased,
            Self::ChildLoadUpEvent,
            Self::ChildLoadDownEvent,
            Self::ButtonPowerUpPressed,
            Self::ButtonPowerDownPressed,
            Self::InputVoltageUpEvent,
            Self::InputVoltageDownEvent,
        ]
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An event delivered to one asset, with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AssetEvent {
    ChildAssetPowerUp { child_load: f64 },
    ChildAssetPowerDown { child_load: f64 },
    ChildAssetLoadIncreased { child_load: f64 },
    ChildAssetLoadDecreased { child_load: f64 },
    ChildLoadUpEvent(LoadEvent),
    ChildLoadDownEvent(LoadEvent),
    ButtonPowerUpPressed,
    ButtonPowerDownPressed,
    InputVoltageUpEvent { new_in_volt: f64 },
    InputVoltageDownEvent { new_in_volt: f64 },
}

impl AssetEvent {
    /// Kind used to look up handlers.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ChildAssetPowerUp { .. } => EventKind::ChildAssetPowerUp,
            Self::ChildAssetPowerDown { .. } => EventKind::ChildAssetPowerDown,
            Self::ChildAssetLoadIncreased { .. } => EventKind::ChildAssetLoadIncreased,
            Self::ChildAssetLoadDecreased { .. } => EventKind::ChildAssetLoadDecreased,
            Self::ChildLoadUpEvent(_) => EventKind::ChildLoadUpEvent,
            Self::ChildLoadDownEvent(_) => EventKind::ChildLoadDownEvent,
            Self::ButtonPowerUpPressed => EventKind::ButtonPowerUpPressed,
            Self::ButtonPowerDownPressed => EventKind::ButtonPowerDownPressed,
            Self::InputVoltageUpEvent { .. } => EventKind::InputVoltageUpEvent,
            Self::InputVoltageDownEvent { .. } => EventKind::InputVoltageDownEvent,
        }
    }

    /// Input voltage event matching the direction of a change.
    /// `None` when the voltage did not move.
    #[must_use]
    pub fn input_voltage(old: f64, new: f64) -> Option<Self> {
        if new > old {
            Some(Self::InputVoltageUpEvent { new_in_volt: new })
        } else if new < old {
            Some(Self::InputVoltageDownEvent { new_in_volt: new })
        } else {
            None
        }
    }

    /// Child load event matching the sign of `event`'s difference.
    /// `None` when nothing changed.
    #[must_use]
    pub fn child_load(event: LoadEvent) -> Option<Self> {
        let difference = event.difference();
        if difference > Load::ZERO {
            Some(Self::ChildLoadUpEvent(event))
        } else if difference < Load::ZERO {
            Some(Self::ChildLoadDownEvent(event))
        } else {
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
