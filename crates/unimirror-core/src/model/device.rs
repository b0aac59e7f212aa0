// ── Device ──

use std::sync::Arc;

use super::fields::raw_fields;
use super::{ApiItem, Event, EventKey, RawItem, Source};
use crate::messages::MessageKey;

/// An adopted UniFi device (AP, switch, gateway, PDU), keyed by MAC.
///
/// Its `port_table` and `outlet_table` feed the port and outlet
/// projections.
#[derive(Debug, Clone)]
pub struct Device {
    raw: RawItem,
    source: Source,
    last_event: Option<Arc<Event>>,
}

impl Device {
    pub fn source(&self) -> Source {
        self.source
    }

    pub fn last_event(&self) -> Option<&Arc<Event>> {
        self.last_event.as_ref()
    }

    /// Reachability according to the last event, if it says.
    pub fn event_online(&self) -> Option<bool> {
        let key = self.last_event.as_ref()?.key();
        if key.is_device_connect() {
            Some(true)
        } else if key.is_device_lost() {
            Some(false)
        } else {
            None
        }
    }

    /// `state == 1`, unless a later event says otherwise.
    pub fn is_online(&self) -> bool {
        self.event_online().unwrap_or(self.state() == 1)
    }

    pub fn port_count(&self) -> usize {
        self.raw
            .get("port_table")
            .and_then(serde_json::Value::as_array)
            .map_or(0, Vec::len)
    }
}

raw_fields!(Device {
    mac: str["mac"] = "";
    name: str["name"] = "";
    model: str["model"] = "";
    /// Device family: `uap`, `usw`, `ugw`, `udm`, `uxg`, `usp`...
    device_type: str["type"] = "";
    ip: str["ip"] = "";
    version: str["version"] = "";
    upgradable: bool["upgradable"] = false;
    adopted: bool["adopted"] = false;
    /// 0 = disconnected, 1 = connected, other values are transitional.
    state: i64["state"] = 0;
    uptime: u64["uptime"] = 0;
    site_id: str["site_id"] = "";
    /// Thermal alarm raised by the device.
    overheating: bool["overheating"] = false;
    led_override: str["led_override"] = "default";
    num_sta: u64["num_sta"] = 0;
});

impl ApiItem for Device {
    const OBJ_ID_KEY: &'static str = "mac";
    const UPSERT_MESSAGES: &'static [MessageKey] = &[MessageKey::Device, MessageKey::DeviceUpdate];
    const EVENTS: &'static [EventKey] = &[
        EventKey::AccessPointConnected,
        EventKey::AccessPointLostContact,
        EventKey::AccessPointUpgraded,
        EventKey::AccessPointRestarted,
        EventKey::SwitchConnected,
        EventKey::SwitchLostContact,
        EventKey::SwitchUpgraded,
        EventKey::SwitchRestarted,
        EventKey::GatewayConnected,
        EventKey::GatewayLostContact,
        EventKey::GatewayUpgraded,
        EventKey::GatewayRestarted,
    ];

    fn from_raw(raw: RawItem) -> Self {
        Self {
            raw,
            source: Source::Snapshot,
            last_event: None,
        }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }

    fn apply_event(&mut self, event: &Arc<Event>) {
        self.source = Source::Event;
        self.last_event = Some(Arc::clone(event));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn device(value: serde_json::Value) -> Device {
        Device::from_raw(value.as_object().unwrap().clone())
    }

    #[test]
    fn state_drives_online_until_an_event() {
        let mut d = device(json!({ "mac": "aa:bb", "state": 1, "type": "usw" }));
        assert!(d.is_online());
        assert_eq!(d.device_type(), "usw");

        d.apply_event(&Arc::new(Event::new(
            json!({ "key": "EVT_SW_Lost_Contact", "sw": "aa:bb" })
                .as_object()
                .unwrap()
                .clone(),
        )));
        assert!(!d.is_online());
        assert_eq!(d.state(), 1);
    }

    #[test]
    fn defaults() {
        let d = device(json!({ "mac": "aa:bb" }));
        assert_eq!(d.led_override(), "default");
        assert_eq!(d.port_count(), 0);
        assert!(!d.is_online());
    }

    #[test]
    fn port_count_reads_nested_table() {
        let d = device(json!({ "mac": "aa:bb", "port_table": [{}, {}, {}] }));
        assert_eq!(d.port_count(), 3);
    }
}
