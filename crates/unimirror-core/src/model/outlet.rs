// ── PDU / smart plug outlet ──

use super::fields::raw_fields;
use super::{RawItem, SubItem};

/// One entry of a device's `outlet_table`, indexed by `index`.
#[derive(Debug, Clone)]
pub struct Outlet {
    raw: RawItem,
    device_mac: String,
}

impl Outlet {
    pub fn device_mac(&self) -> &str {
        &self.device_mac
    }
}

raw_fields!(Outlet {
    index: opt_u64["index"] = None;
    name: str["name"] = "";
    /// Power switched on.
    relay_state: bool["relay_state"] = false;
    has_relay: bool["has_relay"] = false;
    has_metering: bool["has_metering"] = false;
    cycle_enabled: bool["cycle_enabled"] = false;
    outlet_voltage: opt_str["outlet_voltage"] = None;
    outlet_current: opt_str["outlet_current"] = None;
    outlet_power: opt_str["outlet_power"] = None;
    outlet_power_factor: opt_str["outlet_power_factor"] = None;
});

impl SubItem for Outlet {
    const LIST_KEY: &'static str = "outlet_table";
    const INDEX_KEY: &'static str = "index";

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
