//! Integration tests for cascading power and load across a rack.

use std::sync::Arc;

use proptest::prelude::*;
use simengine_core::{
    AssetEvent, AssetKey, AssetRegistry, EventBus, Load, PowerStatus, SimClock, TopologySnapshot,
};

/// utility(1) -> ups(2) -> pdu(3) -> server(5), server(6)
///                        -> pdu(4) -> server(7), storage_controller(8)
const RACK: &str = r#"{
    "asset_types": {
        "outlet":             { "min_voltage": 0.0,   "power_consumption": 0.0 },
        "ups":                { "min_voltage": 90.0,  "power_consumption": 36.0 },
        "pdu":                { "min_voltage": 90.0,  "power_consumption": 12.0 },
        "server":             { "min_voltage": 100.0, "power_consumption": 480.0 },
        "storage_controller": { "min_voltage": 100.0, "power_consumption": 24.0 }
    },
    "assets": [
        { "key": 1, "asset_type": "outlet", "children": [2], "input_voltage": 120.0 },
        { "key": 2, "asset_type": "ups", "children": [3, 4] },
        { "key": 3, "asset_type": "pdu", "children": [5, 6] },
        { "key": 4, "asset_type": "pdu", "children": [7, 8] },
        { "key": 5, "asset_type": "server" },
        { "key": 6, "asset_type": "server" },
        { "key": 7, "asset_type": "server" },
        { "key": 8, "asset_type": "storage_controller" }
    ]
}"#;

const KEYS: [AssetKey; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

fn topology() -> TopologySnapshot {
    TopologySnapshot::from_json_str(RACK).expect("valid rack")
}

async fn energized() -> EventBus {
    let bus = EventBus::attach(&topology(), &AssetRegistry::standard(), SimClock::new().shared())
        .expect("attach");
    bus.energize().await.expect("energize");
    bus
}

/// Root load must equal the sum of every powered asset's own draw.
async fn assert_root_balances(bus: &EventBus, topology: &TopologySnapshot) {
    let mut expected = Load::ZERO;
    for snapshot in bus.snapshots().await {
        assert!(snapshot.load_amps >= 0.0, "asset {} negative", snapshot.key);
        if snapshot.status == PowerStatus::Down {
            assert_eq!(snapshot.load_amps, 0.0, "asset {} is down but drawing", snapshot.key);
            continue;
        }
        let props = topology.properties(&snapshot.asset_type).unwrap();
        expected = expected + Load::at_voltage(props.power_consumption, snapshot.input_voltage);
    }

    let root = bus.snapshot(1).await.unwrap();
    assert_eq!(Load::from_amps(root.load_amps), expected);
}

#[tokio::test]
async fn test_full_rack_draws_from_utility() {
    let bus = energized().await;
    let topo = topology();

    assert_root_balances(&bus, &topo).await;
    // 3 servers at 4.0, controller 0.2, pdus 0.1 each, ups 0.3
    assert_eq!(bus.snapshot(1).await.unwrap().load_amps, 12.7);
}

#[tokio::test]
async fn test_utility_loss_and_restore() {
    let bus = energized().await;
    let before = bus.snapshots().await;

    let report = bus.set_input_voltage(1, 0.0).await.unwrap();
    assert_eq!(report.transitions().count(), KEYS.len());
    for snapshot in bus.snapshots().await {
        assert_eq!(snapshot.status, PowerStatus::Down);
        assert_eq!(snapshot.load_amps, 0.0);
    }

    bus.set_input_voltage(1, 120.0).await.unwrap();
    let after = bus.snapshots().await;
    for (b, a) in before.iter().zip(&after) {
        assert_eq!((b.key, b.status, b.load_amps), (a.key, a.status, a.load_amps));
    }
}

#[tokio::test]
async fn test_brownout_drops_servers_keeps_distribution() {
    let bus = energized().await;

    bus.set_input_voltage(1, 95.0).await.unwrap();

    for key in [5, 6, 7, 8] {
        assert_eq!(bus.snapshot(key).await.unwrap().status, PowerStatus::Down);
    }
    for key in [1, 2, 3, 4] {
        assert_eq!(bus.snapshot(key).await.unwrap().status, PowerStatus::Up);
    }
    assert_root_balances(&bus, &topology()).await;
}

#[tokio::test]
async fn test_boot_time_reset_on_power_up() {
    let clock = SimClock::new().shared();
    let bus = EventBus::attach(&topology(), &AssetRegistry::standard(), clock.clone()).unwrap();
    bus.energize().await.unwrap();
    assert_eq!(bus.snapshot(5).await.unwrap().boot_time_ms, 0);

    clock.advance_ms(5_000);
    bus.power_off(5).await.unwrap();
    bus.power_up(5).await.unwrap();

    assert_eq!(bus.snapshot(5).await.unwrap().boot_time_ms, 5_000);
}

#[tokio::test]
async fn test_concurrent_sibling_load_changes() {
    let bus = Arc::new(energized().await);
    let baseline = bus.snapshot(1).await.unwrap().load_amps;

    let tasks: Vec<_> = [5, 6, 7, 8]
        .into_iter()
        .flat_map(|key| {
            let up = Arc::clone(&bus);
            let down = Arc::clone(&bus);
            [
                tokio::spawn(async move {
                    up.dispatch(key, AssetEvent::ChildAssetLoadIncreased { child_load: 0.6 })
                        .await
                }),
                tokio::spawn(async move {
                    down.dispatch(key, AssetEvent::ChildAssetLoadDecreased { child_load: 0.1 })
                        .await
                }),
            ]
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.expect("task").expect("dispatch");
    }

    // four assets each net +0.5
    let root = bus.snapshot(1).await.unwrap().load_amps;
    assert_eq!(Load::from_amps(root), Load::from_amps(baseline) + Load::from_amps(2.0));
}

// =============================================================================
// Property tests
// =============================================================================

#[derive(Debug, Clone)]
enum Step {
    Feed(f64),
    PowerUp(AssetKey),
    PowerOff(AssetKey),
    ShutDown(AssetKey),
    Button(AssetKey, bool),
}

fn step() -> impl Strategy<Value = Step> {
    let key = proptest::sample::select(KEYS.to_vec());
    prop_oneof![
        proptest::sample::select(vec![0.0, 50.0, 95.0, 110.0, 120.0, 208.0, 240.0]).prop_map(Step::Feed),
        key.clone().prop_map(Step::PowerUp),
        key.clone().prop_map(Step::PowerOff),
        key.clone().prop_map(Step::ShutDown),
        (key, any::<bool>()).prop_map(|(k, up)| Step::Button(k, up)),
    ]
}

async fn apply(bus: &EventBus, step: &Step) {
    match step {
        Step::Feed(volts) => {
            bus.set_input_voltage(1, *volts).await.unwrap();
        }
        Step::PowerUp(key) => {
            bus.power_up(*key).await.unwrap();
        }
        Step::PowerOff(key) => {
            bus.power_off(*key).await.unwrap();
        }
        Step::ShutDown(key) => {
            bus.shut_down(*key).await.unwrap();
        }
        Step::Button(key, up) => {
            bus.press_power_button(*key, *up).await.unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_root_load_balances_after_any_sequence(steps in proptest::collection::vec(step(), 1..24)) {
        tokio_test::block_on(async {
            let bus = energized().await;
            let topo = topology();
            for step in &steps {
                apply(&bus, step).await;
                assert_root_balances(&bus, &topo).await;
            }
        });
    }

    #[test]
    fn prop_load_increase_then_decrease_round_trips(
        changes in proptest::collection::vec(
            (proptest::sample::select(KEYS.to_vec()), 0.0f64..50.0),
            1..16,
        )
    ) {
        tokio_test::block_on(async {
            let bus = energized().await;
            let before = bus.snapshots().await;

            for (key, amps) in &changes {
                bus.dispatch(*key, AssetEvent::ChildAssetLoadIncreased { child_load: *amps })
                    .await
                    .unwrap();
            }
            for (key, amps) in changes.iter().rev() {
                bus.dispatch(*key, AssetEvent::ChildAssetLoadDecreased { child_load: *amps })
                    .await
                    .unwrap();
            }

            assert_eq!(bus.snapshots().await, before);
        });
    }
}
