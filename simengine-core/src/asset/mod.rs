//! Asset - the power/load propagation engine for one hardware node
//!
//! An [`Asset`] owns its [`AssetState`] and reacts to the fixed event
//! vocabulary in [`crate::events`]. Each handler mutates only this asset's
//! state and returns a [`HandlerOutcome`] describing what changed; the bus
//! turns outcomes into events for the neighbours.
//!
//! Hardware-specific reactions to power requests live behind the
//! [`PowerBehavior`] trait (see [`variants`]).

pub mod handlers;
pub mod variants;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::events::{LoadEvent, OldNew, VoltageEvent};
use crate::results::{LoadEventResult, PowerEventResult};
use crate::state::{AssetKey, AssetSnapshot, AssetState, Load, PowerStatus};

// =============================================================================
// Extension points
// =============================================================================

/// Hardware-specific reaction to power requests.
///
/// Both request hooks are required: a variant that does not say how it
/// powers up and down does not compile.
pub trait PowerBehavior: Send + Sync + fmt::Debug {
    /// Variant name for logs.
    fn name(&self) -> &'static str;

    /// Input voltage rose above the minimum while the asset was down.
    fn on_power_up_request_received(&self, asset: &mut Asset) -> PowerEventResult;

    /// Input voltage fell to or below the minimum while the asset was up.
    fn on_power_off_request_received(&self, asset: &mut Asset) -> PowerEventResult;

    /// Should the asset come back when input power returns?
    fn power_on_when_ac_restore(&self) -> bool {
        true
    }
}

/// Why the asset is in its current power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerCause {
    /// User pressed the power-up button.
    UserPowerUp,
    /// User pressed the power-down button.
    UserPowerDown,
    /// Input voltage crossed the minimum.
    InputVoltage,
}

/// What a handler did, for the bus to propagate.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// Booked load moved by a child's contribution.
    Load(LoadEventResult),
    /// A child load event rewritten for this asset.
    ChildLoad(LoadEvent),
    /// This asset's output voltage event for its children.
    Voltage(VoltageEvent),
    /// Bookkeeping only; nothing to propagate.
    Recorded,
}

// =============================================================================
// Asset
// =============================================================================

/// One simulated hardware node.
pub struct Asset {
    state: AssetState,
    behavior: Arc<dyn PowerBehavior>,
    cause: PowerCause,
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("key", &self.state.key())
            .field("behavior", &self.behavior.name())
            .field("status", &self.state.status())
            .field("load", &self.state.load())
            .field("cause", &self.cause)
            .finish()
    }
}

impl Asset {
    /// Attach behavior to freshly created state.
    #[must_use]
    pub fn new(state: AssetState, behavior: Arc<dyn PowerBehavior>) -> Self {
        Self {
            state,
            behavior,
            cause: PowerCause::UserPowerUp,
        }
    }

    /// Asset key.
    #[must_use]
    pub fn key(&self) -> AssetKey {
        self.state.key()
    }

    /// Read-only view of the state.
    #[must_use]
    pub fn state(&self) -> &AssetState {
        &self.state
    }

    /// Observable copy of the state.
    #[must_use]
    pub fn snapshot(&self) -> AssetSnapshot {
        self.state.snapshot()
    }

    /// Why the asset is in its current power state.
    #[must_use]
    pub fn cause(&self) -> PowerCause {
        self.cause
    }

    /// Did a user (rather than input power) cause the current state?
    #[must_use]
    pub fn power_state_caused_by_user(&self) -> bool {
        matches!(self.cause, PowerCause::UserPowerUp | PowerCause::UserPowerDown)
    }

    /// Should the asset come back when input power returns?
    #[must_use]
    pub fn power_on_when_ac_restore(&self) -> bool {
        self.behavior.power_on_when_ac_restore()
    }

    // -------------------------------------------------------------------------
    // Power transitions
    // -------------------------------------------------------------------------

    fn power_result(&self, old_state: PowerStatus, graceful: bool) -> PowerEventResult {
        PowerEventResult {
            asset_key: self.state.key(),
            asset_type: self.state.asset_type().clone(),
            old_state,
            new_state: self.state.status(),
            load_change: Load::ZERO,
            graceful,
        }
    }

    /// Power up unconditionally. Load is left to the voltage handlers.
    pub fn power_up(&mut self) -> PowerEventResult {
        let old_state = self.state.status();
        self.state.power_up();
        tracing::info!(asset_key = self.key(), %old_state, "powered up");
        self.power_result(old_state, false)
    }

    /// Power down unconditionally (forced).
    pub fn power_off(&mut self) -> PowerEventResult {
        let old_state = self.state.status();
        self.state.power_off();
        tracing::info!(asset_key = self.key(), %old_state, "powered off");
        self.power_result(old_state, false)
    }

    /// Power down unconditionally (graceful).
    pub fn shut_down(&mut self) -> PowerEventResult {
        let old_state = self.state.status();
        self.state.shut_down();
        tracing::info!(asset_key = self.key(), %old_state, "shut down");
        self.power_result(old_state, true)
    }

    /// Re-book this asset's own consumption after a transition requested
    /// from outside the voltage cascade.
    ///
    /// Going down releases the component drawn at the current input
    /// voltage; coming up books it again. Returns the load change for the
    /// parents, or `None` if the status did not flip.
    pub fn rebook_own_load(&mut self, result: &PowerEventResult) -> Option<LoadEvent> {
        let own = self.state.own_load_at(self.state.input_voltage());
        let before = self.state.load();
        let target = match (result.old_state, result.new_state) {
            (PowerStatus::Up, PowerStatus::Down) => before - own,
            (PowerStatus::Down, PowerStatus::Up) => before + own,
            _ => return None,
        };
        let after = self.state.update_load(target);
        Some(LoadEvent::new(self.key(), before, after))
    }

    // -------------------------------------------------------------------------
    // Load handlers
    // -------------------------------------------------------------------------

    fn apply_load_change(&mut self, change: Load) -> LoadEventResult {
        let old_load = self.state.load();
        let new_load = self.state.update_load(old_load + change);

        tracing::debug!(asset_key = self.key(), %old_load, %new_load, "load updated");

        LoadEventResult {
            asset_key: self.key(),
            old_load,
            new_load,
        }
    }

    /// A child powered up or drew more load.
    pub fn on_load_increase(&mut self, child_load: f64) -> LoadEventResult {
        self.apply_load_change(Load::from_amps(child_load))
    }

    /// A child powered down or drew less load.
    pub fn on_load_decrease(&mut self, child_load: f64) -> LoadEventResult {
        self.apply_load_change(-Load::from_amps(child_load))
    }

    /// A child's load moved; book the same difference here and rewrite the
    /// event for this asset's own parents.
    pub fn on_child_load_update(&mut self, event: &LoadEvent) -> LoadEvent {
        let mut next = event.next_for(self.key(), self.state.load());
        next.load.new = self.state.update_load(next.load.new);

        tracing::debug!(
            asset_key = self.key(),
            child_key = event.asset_key,
            old_load = %next.load.old,
            new_load = %next.load.new,
            "child load propagated"
        );
        next
    }

    // -------------------------------------------------------------------------
    // Buttons
    // -------------------------------------------------------------------------

    /// User pressed the power-down button.
    pub fn on_btn_power_down(&mut self) {
        self.cause = PowerCause::UserPowerDown;
    }

    /// User pressed the power-up button.
    pub fn on_btn_power_up(&mut self) {
        self.cause = PowerCause::UserPowerUp;
    }

    // -------------------------------------------------------------------------
    // Voltage handlers
    // -------------------------------------------------------------------------

    /// Work out the effect of the feed moving to `new_in_volt`.
    ///
    /// Reads the input voltage stored *before* this event; the commit
    /// handler ([`Asset::detect_input_voltage`]) runs afterwards. Children
    /// see the old voltage only if this asset was up and the new voltage
    /// only if it is up now; otherwise they see `0`. The asset's own load
    /// component is adjusted by delta so contributions booked by children
    /// survive.
    pub fn on_input_voltage_change(&mut self, new_in_volt: f64) -> VoltageEvent {
        let old_in_volt = self.state.input_voltage();
        let old_state = self.state.status();
        let min_voltage = self.state.min_voltage();

        let behavior = Arc::clone(&self.behavior);
        let transition = if new_in_volt <= min_voltage && old_state.is_up() {
            Some(behavior.on_power_off_request_received(self))
        } else if new_in_volt > min_voltage && !old_state.is_up() {
            Some(behavior.on_power_up_request_received(self))
        } else {
            None
        };

        if let Some(result) = &transition {
            if result.changed() {
                self.cause = PowerCause::InputVoltage;
            }
        }

        let new_state = self.state.status();
        let out_volt = OldNew::new(
            if old_state.is_up() { old_in_volt } else { 0.0 },
            if new_state.is_up() { new_in_volt } else { 0.0 },
        );

        let old_load = self.state.own_load_at(out_volt.old);
        let new_load = self.state.own_load_at(out_volt.new);
        if new_load != old_load {
            self.state
                .update_load(self.state.load() - old_load + new_load);
        }

        tracing::debug!(
            asset_key = self.key(),
            old_in_volt,
            new_in_volt,
            min_voltage,
            %old_state,
            %new_state,
            "processed input voltage"
        );

        VoltageEvent {
            asset_key: self.key(),
            state: OldNew::new(old_state, new_state),
            out_volt,
            load: OldNew::new(old_load, new_load),
        }
    }

    /// Commit the new input voltage. Runs after the transition handler.
    pub fn detect_input_voltage(&mut self, new_in_volt: f64) {
        self.state.update_input_voltage(new_in_volt);
        tracing::trace!(asset_key = self.key(), in_volt = new_in_volt, "input voltage committed");
    }
}

// =============================================================================
// Tests
// =============================================================================
