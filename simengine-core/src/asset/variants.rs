//! Hardware variants: how each kind of asset answers power requests.
//!
//! Every variant powers up the same way. They differ in how they go down
//! when input power is lost: equipment with an operating system or a
//! battery controller shuts down gracefully, passive distribution gear just
//! drops.

use super::{Asset, PowerBehavior};
use crate::results::PowerEventResult;

/// Root power feed (wall outlet / utility).
#[derive(Debug, Default, Clone, Copy)]
pub struct Outlet;

impl PowerBehavior for Outlet {
    fn name(&self) -> &'static str {
        "outlet"
    }

    fn on_power_up_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.power_up()
    }

    fn on_power_off_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.power_off()
    }
}

/// Uninterruptible power supply.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ups;

impl PowerBehavior for Ups {
    fn name(&self) -> &'static str {
        "ups"
    }

    fn on_power_up_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.power_up()
    }

    fn on_power_off_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.shut_down()
    }
}

/// Power distribution unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pdu;

impl PowerBehavior for Pdu {
    fn name(&self) -> &'static str {
        "pdu"
    }

    fn on_power_up_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.power_up()
    }

    fn on_power_off_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.power_off()
    }
}

/// Server chassis.
#[derive(Debug, Default, Clone, Copy)]
pub struct Server;

impl PowerBehavior for Server {
    fn name(&self) -> &'static str {
        "server"
    }

    fn on_power_up_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.power_up()
    }

    fn on_power_off_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.shut_down()
    }
}

/// RAID/storage controller inside a server.
#[derive(Debug, Default, Clone, Copy)]
pub struct StorageController;

impl PowerBehavior for StorageController {
    fn name(&self) -> &'static str {
        "storage_controller"
    }

    fn on_power_up_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.power_up()
    }

    fn on_power_off_request_received(&self, asset: &mut Asset) -> PowerEventResult {
        asset.power_off()
    }
}
