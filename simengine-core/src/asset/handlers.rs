//! Handler registration: event kind → handlers ordered by priority.
//!
//! The table is built once at startup and shared by the bus. Within one
//! event kind, higher priority runs first and equal priorities keep their
//! registration order.

use std::collections::HashMap;

use super::{Asset, HandlerOutcome};
use crate::constants::{HANDLER_PRIORITY_DEFAULT, HANDLER_PRIORITY_VOLTAGE_COMMIT};
use crate::events::{AssetEvent, EventKind};

/// A handler bound to an asset.
pub type HandlerFn = fn(&mut Asset, &AssetEvent) -> HandlerOutcome;

/// One registered handler.
#[derive(Debug, Clone, Copy)]
pub struct HandlerEntry {
    pub priority: i32,
    pub name: &'static str,
    pub handler: HandlerFn,
}

/// Registration table consulted by the dispatcher.
#[derive(Debug, Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<EventKind, Vec<HandlerEntry>>,
}

impl HandlerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to every kind in `kinds`.
    pub fn register(
        &mut self,
        kinds: &[EventKind],
        priority: i32,
        name: &'static str,
        handler: HandlerFn,
    ) -> &mut Self {
        for kind in kinds {
            let entries = self.handlers.entry(*kind).or_default();
            let position = entries
                .iter()
                .position(|e| e.priority < priority)
                .unwrap_or(entries.len());
            entries.insert(
                position,
                HandlerEntry {
                    priority,
                    name,
                    handler,
                },
            );
        }
        self
    }

    /// Handlers for `kind`, highest priority first.
    #[must_use]
    pub fn handlers_for(&self, kind: EventKind) -> &[HandlerEntry] {
        self.handlers.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// The subscriptions every asset carries.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::new();
        table
            .register(
                &[EventKind::ChildAssetLoadIncreased, EventKind::ChildAssetPowerUp],
                HANDLER_PRIORITY_DEFAULT,
                "on_load_increase",
                on_load_increase,
            )
            .register(
                &[EventKind::ChildAssetLoadDecreased, EventKind::ChildAssetPowerDown],
                HANDLER_PRIORITY_DEFAULT,
                "on_load_decrease",
                on_load_decrease,
            )
            .register(
                &[EventKind::ChildLoadUpEvent, EventKind::ChildLoadDownEvent],
                HANDLER_PRIORITY_DEFAULT,
                "on_child_load_update",
                on_child_load_update,
            )
            .register(
                &[EventKind::ButtonPowerDownPressed],
                HANDLER_PRIORITY_DEFAULT,
                "on_btn_power_down",
                on_btn_power_down,
            )
            .register(
                &[EventKind::ButtonPowerUpPressed],
                HANDLER_PRIORITY_DEFAULT,
                "on_btn_power_up",
                on_btn_power_up,
            )
            .register(
                &[EventKind::InputVoltageUpEvent, EventKind::InputVoltageDownEvent],
                HANDLER_PRIORITY_VOLTAGE_COMMIT,
                "detect_input_voltage",
                detect_input_voltage,
            )
            .register(
                &[EventKind::InputVoltageUpEvent, EventKind::InputVoltageDownEvent],
                HANDLER_PRIORITY_DEFAULT,
                "on_parent_volt_change",
                on_parent_volt_change,
            );
        table
    }
}

fn mismatched(asset: &Asset, event: &AssetEvent, handler: &'static str) -> HandlerOutcome {
    tracing::warn!(asset_key = asset.key(), ?event, handler, "handler received foreign event");
    HandlerOutcome::Recorded
}

fn on_load_increase(asset: &mut Asset, event: &AssetEvent) -> HandlerOutcome {
    match event {
        AssetEvent::ChildAssetLoadIncreased { child_load }
        | AssetEvent::ChildAssetPowerUp { child_load } => {
            HandlerOutcome::Load(asset.on_load_increase(*child_load))
        }
        other => mismatched(asset, other, "on_load_increase"),
    }
}

fn on_load_decrease(asset: &mut Asset, event: &AssetEvent) -> HandlerOutcome {
    match event {
        AssetEvent::ChildAssetLoadDecreased { child_load }
        | AssetEvent::ChildAssetPowerDown { child_load } => {
            HandlerOutcome::Load(asset.on_load_decrease(*child_load))
        }
        other => mismatched(asset, other, "on_load_decrease"),
    }
}

fn on_child_load_update(asset: &mut Asset, event: &AssetEvent) -> HandlerOutcome {
    match event {
        AssetEvent::ChildLoadUpEvent(load) | AssetEvent::ChildLoadDownEvent(load) => {
            HandlerOutcome::ChildLoad(asset.on_child_load_update(load))
        }
        other => mismatched(asset, other, "on_child_load_update"),
    }
}

fn on_btn_power_down(asset: &mut Asset, _event: &AssetEvent) -> HandlerOutcome {
    asset.on_btn_power_down();
    HandlerOutcome::Recorded
}

fn on_btn_power_up(asset: &mut Asset, _event: &AssetEvent) -> HandlerOutcome {
    asset.on_btn_power_up();
    HandlerOutcome::Recorded
}

fn on_parent_volt_change(asset: &mut Asset, event: &AssetEvent) -> HandlerOutcome {
    match event {
        AssetEvent::InputVoltageUpEvent { new_in_volt }
        | AssetEvent::InputVoltageDownEvent { new_in_volt } => {
            HandlerOutcome::Voltage(asset.on_input_voltage_change(*new_in_volt))
        }
        other => mismatched(asset, other, "on_parent_volt_change"),
    }
}

fn detect_input_voltage(asset: &mut Asset, event: &AssetEvent) -> HandlerOutcome {
    match event {
        AssetEvent::InputVoltageUpEvent { new_in_volt }
        | AssetEvent::InputVoltageDownEvent { new_in_volt } => {
            asset.detect_input_voltage(*new_in_volt);
            HandlerOutcome::Recorded
        }
        other => mismatched(asset, other, "detect_input_voltage"),
    }
}
