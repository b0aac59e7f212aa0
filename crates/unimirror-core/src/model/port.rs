// ── Switch port ──

use super::fields::raw_fields;
use super::{RawItem, SubItem};

/// One entry of a device's `port_table`.
///
/// Indexed by `port_idx`; ports reported without one fall back to `ifname`.
#[derive(Debug, Clone)]
pub struct Port {
    raw: RawItem,
    device_mac: String,
}

impl Port {
    /// MAC of the device this port belongs to.
    pub fn device_mac(&self) -> &str {
        &self.device_mac
    }

    pub fn poe_power_watts(&self) -> Option<f64> {
        // Reported as a decimal string.
        super::fields::read_str(&self.raw, "poe_power").and_then(|w| w.parse().ok())
    }
}

raw_fields!(Port {
    port_idx: opt_u64["port_idx"] = None;
    name: str["name"] = "";
    ifname: str["ifname"] = "";
    media: str["media"] = "";
    up: bool["up"] = false;
    enable: bool["enable"] = true;
    /// Negotiated speed in Mbps.
    speed: u64["speed"] = 0;
    full_duplex: bool["full_duplex"] = false;
    port_poe: bool["port_poe"] = false;
    /// `auto`, `passv24`, `passthrough` or `off`.
    poe_mode: opt_str["poe_mode"] = None;
    portconf_id: str["portconf_id"] = "";
    rx_bytes: u64["rx_bytes"] = 0;
    tx_bytes: u64["tx_bytes"] = 0;
});

impl SubItem for Port {
    const LIST_KEY: &'static str = "port_table";
    const INDEX_KEY: &'static str = "port_idx";
    const FALLBACK_KEY: Option<&'static str> = Some("ifname");

    fn from_raw(parent_id: &str, raw: RawItem) -> Self {
        Self {
            raw,
            device_mac: parent_id.to_owned(),
        }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }
}
