//! Event Bus - delivers events across the asset graph until quiescent
//!
//! TigerStyle: One lock per asset, one asset per delivery.
//!
//! # Architecture
//!
//! ```text
//!   stimulus ──► queue ──► lock asset ──► handlers (priority order) ──► unlock
//!                  ▲                                   │
//!                  │                                   ▼
//!                  └──────────── follow-on events ◄── outcomes
//! ```
//!
//! Voltage results travel down to children, load results travel up to
//! parents. Each delivery is a serialized single-asset mutation; a cascade
//! as a whole is not atomic, so concurrent stimuli interleave between
//! deliveries the way a physical fault would.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::asset::handlers::HandlerTable;
use crate::asset::{Asset, HandlerOutcome};
use crate::clock::SharedClock;
use crate::constants::{DISPATCH_DELIVERIES_MAX, VOLTAGE_VOLTS_MAX};
use crate::error::{BusError, BusResult, ConfigError};
use crate::events::{AssetEvent, EventKind, LoadEvent, VoltageEvent};
use crate::registry::AssetRegistry;
use crate::results::PowerEventResult;
use crate::state::{AssetKey, AssetSnapshot};
use crate::topology::TopologySnapshot;

// =============================================================================
// Dispatch report
// =============================================================================

/// One handler invocation during a cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub asset_key: AssetKey,
    pub kind: EventKind,
    pub handler: &'static str,
    pub outcome: HandlerOutcome,
}

/// Everything that happened while a stimulus settled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Number of (asset, event) deliveries.
    pub deliveries: usize,
    /// Handler outcomes in execution order.
    pub outcomes: Vec<Delivery>,
}

impl DispatchReport {
    /// Voltage events in which the asset's power status flipped.
    pub fn transitions(&self) -> impl Iterator<Item = &VoltageEvent> {
        self.outcomes.iter().filter_map(|d| match &d.outcome {
            HandlerOutcome::Voltage(v) if v.status_changed() => Some(v),
            _ => None,
        })
    }

    fn merge(&mut self, other: DispatchReport) {
        self.deliveries += other.deliveries;
        self.outcomes.extend(other.outcomes);
    }
}

#[derive(Debug, Clone, Copy)]
enum PowerRequest {
    Up,
    Off,
    ShutDown,
}

// =============================================================================
// EventBus
// =============================================================================

/// The attached asset graph plus the dispatcher.
#[derive(Debug)]
pub struct EventBus {
    assets: BTreeMap<AssetKey, Arc<Mutex<Asset>>>,
    children: HashMap<AssetKey, Vec<AssetKey>>,
    parents: HashMap<AssetKey, Vec<AssetKey>>,
    feeds: Vec<(AssetKey, f64)>,
    handlers: Arc<HandlerTable>,
    clock: SharedClock,
}

impl EventBus {
    /// Validate the snapshot and build every asset it describes.
    ///
    /// Fails before any event is processed if data is missing or malformed.
    pub fn attach(
        topology: &TopologySnapshot,
        registry: &AssetRegistry,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        topology.validate()?;

        let mut assets = BTreeMap::new();
        for spec in &topology.assets {
            let asset = registry.build(spec, topology, Arc::clone(&clock))?;
            assets.insert(spec.key, Arc::new(Mutex::new(asset)));
        }

        let children = topology
            .assets
            .iter()
            .map(|spec| (spec.key, spec.children.clone()))
            .collect();
        let feeds = topology
            .assets
            .iter()
            .filter_map(|spec| spec.input_voltage.map(|v| (spec.key, v)))
            .collect();

        tracing::info!(assets = assets.len(), "attached topology");

        Ok(Self {
            assets,
            children,
            parents: topology.parents(),
            feeds,
            handlers: Arc::new(HandlerTable::standard()),
            clock,
        })
    }

    /// Replace the handler table.
    #[must_use]
    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = Arc::new(handlers);
        self
    }

    /// Clock shared by every asset.
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Attached asset keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<AssetKey> {
        self.assets.keys().copied().collect()
    }

    /// Assets powered by `key`.
    #[must_use]
    pub fn children_of(&self, key: AssetKey) -> &[AssetKey] {
        self.children.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Assets feeding `key`.
    #[must_use]
    pub fn parents_of(&self, key: AssetKey) -> &[AssetKey] {
        self.parents.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    fn asset(&self, key: AssetKey) -> BusResult<&Arc<Mutex<Asset>>> {
        self.assets.get(&key).ok_or(BusError::UnknownAsset(key))
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    /// Copy of one asset's state.
    pub async fn snapshot(&self, key: AssetKey) -> BusResult<AssetSnapshot> {
        Ok(self.asset(key)?.lock().await.snapshot())
    }

    /// Copies of every asset's state, ordered by key.
    pub async fn snapshots(&self) -> Vec<AssetSnapshot> {
        let mut snapshots = Vec::with_capacity(self.assets.len());
        for asset in self.assets.values() {
            snapshots.push(asset.lock().await.snapshot());
        }
        snapshots
    }

    // -------------------------------------------------------------------------
    // Stimuli
    // -------------------------------------------------------------------------

    /// Deliver `event` to `key` and everything it cascades into.
    pub async fn dispatch(&self, key: AssetKey, event: AssetEvent) -> BusResult<DispatchReport> {
        self.asset(key)?;
        if let AssetEvent::InputVoltageUpEvent { new_in_volt }
        | AssetEvent::InputVoltageDownEvent { new_in_volt } = event
        {
            check_voltage(key, new_in_volt)?;
        }
        self.run_cascade(key, vec![(key, event)]).await
    }

    /// Apply the feed voltages declared in the topology.
    pub async fn energize(&self) -> BusResult<DispatchReport> {
        let mut report = DispatchReport::default();
        for (key, volts) in &self.feeds {
            report.merge(self.set_input_voltage(*key, *volts).await?);
        }
        Ok(report)
    }

    /// Move the input voltage of `key` (typically a root feed).
    pub async fn set_input_voltage(&self, key: AssetKey, volts: f64) -> BusResult<DispatchReport> {
        check_voltage(key, volts)?;

        let current = self.asset(key)?.lock().await.state().input_voltage();
        match AssetEvent::input_voltage(current, volts) {
            Some(event) => {
                tracing::info!(asset_key = key, from = current, to = volts, "input voltage stimulus");
                self.run_cascade(key, vec![(key, event)]).await
            }
            None => Ok(DispatchReport::default()),
        }
    }

    /// Operator power-up.
    pub async fn power_up(&self, key: AssetKey) -> BusResult<PowerEventResult> {
        self.request_power(key, PowerRequest::Up).await
    }

    /// Operator forced power-off.
    pub async fn power_off(&self, key: AssetKey) -> BusResult<PowerEventResult> {
        self.request_power(key, PowerRequest::Off).await
    }

    /// Operator graceful shutdown.
    pub async fn shut_down(&self, key: AssetKey) -> BusResult<PowerEventResult> {
        self.request_power(key, PowerRequest::ShutDown).await
    }

    /// User pressed the power button: record the cause, then act.
    pub async fn press_power_button(&self, key: AssetKey, up: bool) -> BusResult<PowerEventResult> {
        let button = if up {
            AssetEvent::ButtonPowerUpPressed
        } else {
            AssetEvent::ButtonPowerDownPressed
        };
        self.dispatch(key, button).await?;

        if up {
            self.power_up(key).await
        } else {
            self.power_off(key).await
        }
    }

    async fn request_power(&self, key: AssetKey, request: PowerRequest) -> BusResult<PowerEventResult> {
        let (result, rebooked, in_volt) = {
            let mut asset = self.asset(key)?.lock().await;
            let result = match request {
                PowerRequest::Up => asset.power_up(),
                PowerRequest::Off => asset.power_off(),
                PowerRequest::ShutDown => asset.shut_down(),
            };
            let rebooked = asset.rebook_own_load(&result);
            (result, rebooked, asset.state().input_voltage())
        };

        if !result.changed() {
            return Ok(result);
        }

        let mut initial = Vec::new();
        if let Some(event) = rebooked.and_then(AssetEvent::child_load) {
            initial.extend(self.parents_of(key).iter().map(|p| (*p, event)));
        }

        let (old_out, new_out) = if result.new_state.is_up() {
            (0.0, in_volt)
        } else {
            (in_volt, 0.0)
        };
        if let Some(event) = AssetEvent::input_voltage(old_out, new_out) {
            initial.extend(self.children_of(key).iter().map(|c| (*c, event)));
        }

        let report = self.run_cascade(key, initial).await?;
        tracing::info!(
            asset_key = key,
            old_state = %result.old_state,
            new_state = %result.new_state,
            deliveries = report.deliveries,
            "operator power request settled"
        );
        Ok(result)
    }

    // -------------------------------------------------------------------------
    // Dispatcher
    // -------------------------------------------------------------------------

    async fn run_cascade(
        &self,
        origin: AssetKey,
        initial: Vec<(AssetKey, AssetEvent)>,
    ) -> BusResult<DispatchReport> {
        let mut queue: VecDeque<(AssetKey, AssetEvent)> = initial.into();
        let mut report = DispatchReport::default();

        while let Some((key, event)) = queue.pop_front() {
            if report.deliveries >= DISPATCH_DELIVERIES_MAX {
                return Err(BusError::CascadeLimit {
                    origin,
                    max: DISPATCH_DELIVERIES_MAX,
                });
            }
            report.deliveries += 1;

            for delivery in self.deliver(key, &event).await? {
                self.enqueue_follow_on(key, &delivery.outcome, &mut queue);
                report.outcomes.push(delivery);
            }
        }

        tracing::debug!(origin, deliveries = report.deliveries, "cascade quiescent");
        Ok(report)
    }

    /// Run every handler for `event` on one asset under its lock.
    async fn deliver(&self, key: AssetKey, event: &AssetEvent) -> BusResult<Vec<Delivery>> {
        let kind = event.kind();
        let mut asset = self.asset(key)?.lock().await;

        let deliveries = self
            .handlers
            .handlers_for(kind)
            .iter()
            .map(|entry| {
                tracing::trace!(asset_key = key, %kind, handler = entry.name, "deliver");
                Delivery {
                    asset_key: key,
                    kind,
                    handler: entry.name,
                    outcome: (entry.handler)(&mut *asset, event),
                }
            })
            .collect();
        Ok(deliveries)
    }

    fn enqueue_follow_on(
        &self,
        key: AssetKey,
        outcome: &HandlerOutcome,
        queue: &mut VecDeque<(AssetKey, AssetEvent)>,
    ) {
        let upstream = match outcome {
            HandlerOutcome::Voltage(voltage) => {
                if let Some(event) = AssetEvent::input_voltage(voltage.out_volt.old, voltage.out_volt.new) {
                    queue.extend(self.children_of(key).iter().map(|c| (*c, event)));
                }
                Some(LoadEvent::new(key, voltage.load.old, voltage.load.new))
            }
            HandlerOutcome::Load(result) => Some(LoadEvent::new(key, result.old_load, result.new_load)),
            HandlerOutcome::ChildLoad(event) => Some(*event),
            HandlerOutcome::Recorded => None,
        };

        if let Some(event) = upstream.and_then(AssetEvent::child_load) {
            queue.extend(self.parents_of(key).iter().map(|p| (*p, event)));
        }
    }
}

fn check_voltage(key: AssetKey, volts: f64) -> BusResult<()> {
    if volts.is_finite() && (0.0..=VOLTAGE_VOLTS_MAX).contains(&volts) {
        Ok(())
    } else {
        Err(BusError::VoltageOutOfRange {
            key,
            value: volts,
            max: VOLTAGE_VOLTS_MAX,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
