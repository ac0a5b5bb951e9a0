//! SimEngine Core - power/load propagation for a data-center digital twin
//!
//! TigerStyle: every asset is a small state machine, the bus is the only
//! thing that moves events between them.
//!
//! # Philosophy
//!
//! > "Power flows down, load flows up."
//!
//! 1. Assets never touch their neighbours: they return outcomes
//! 2. The bus turns outcomes into events for children (voltage) and
//!    parents (load)
//! 3. Static data is validated once, when the topology is attached
//! 4. Time is injectable, so cascades replay deterministically
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               SimEngine Core                │
//! ├─────────────────────────────────────────────┤
//! │  EventBus             │ queue, per-asset    │
//! │                       │ locks, handlers     │
//! │  Asset + PowerBehavior│ voltage & load      │
//! │  AssetState           │ status, load, boot  │
//! ├─────────────────────────────────────────────┤
//! │  Topology snapshot    │ graph, properties,  │
//! │                       │ severity tables     │
//! │  Threshold evaluator  │ counters → status   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use simengine_core::{AssetRegistry, EventBus, SimClock, TopologySnapshot};
//!
//! # async fn demo(json: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let topology = TopologySnapshot::from_json_str(json)?;
//! let bus = EventBus::attach(&topology, &AssetRegistry::standard(), SimClock::new().shared())?;
//!
//! bus.energize().await?;
//! bus.set_input_voltage(1, 0.0).await?;
//! for snapshot in bus.snapshots().await {
//!     println!("{} {} {:.3}A", snapshot.key, snapshot.status, snapshot.load_amps);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod asset;
pub mod bus;
pub mod clock;
pub mod constants;
pub mod error;
pub mod events;
pub mod registry;
pub mod results;
pub mod state;
pub mod storage;
pub mod threshold;
pub mod topology;

// Re-export common types
pub use asset::handlers::{HandlerEntry, HandlerFn, HandlerTable};
pub use asset::variants::{Outlet, Pdu, Server, StorageController, Ups};
pub use asset::{Asset, HandlerOutcome, PowerBehavior, PowerCause};
pub use bus::{Delivery, DispatchReport, EventBus};
pub use clock::{Clock, SharedClock, SimClock, SystemClock};
pub use error::{BusError, BusResult, ConfigError, StorageError};
pub use events::{AssetEvent, EventKind, LoadEvent, OldNew, VoltageEvent};
pub use registry::AssetRegistry;
pub use results::{LoadEventResult, PowerEventResult};
pub use state::{AssetKey, AssetProperties, AssetSnapshot, AssetState, AssetType, Load, PowerStatus};
pub use storage::{DriveState, PhysicalDrive, StorageArray, VirtualDrive};
pub use threshold::{evaluate, Counters, SeverityTable, StatusThresholds, Threshold};
pub use topology::{AssetSpec, TopologySnapshot};
