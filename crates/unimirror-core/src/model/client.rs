// ── Client ──

use std::sync::Arc;

use super::fields::raw_fields;
use super::{ApiItem, Event, EventKey, RawItem, Source};
use crate::messages::MessageKey;

/// A network client (station), keyed by MAC.
///
/// Connect, disconnect, roam and block events are merged on top of the
/// last snapshot: [`event_connected`](Self::event_connected) and
/// [`is_blocked`](Self::is_blocked) reflect them until the next snapshot
/// replaces the payload.
#[derive(Debug, Clone)]
pub struct Client {
    raw: RawItem,
    source: Source,
    last_event: Option<Arc<Event>>,
}

impl Client {
    pub fn source(&self) -> Source {
        self.source
    }

    /// The last event merged since the latest snapshot.
    pub fn last_event(&self) -> Option<&Arc<Event>> {
        self.last_event.as_ref()
    }

    /// Connection state according to the last event, if it says.
    pub fn event_connected(&self) -> Option<bool> {
        let key = self.last_event.as_ref()?.key();
        if key.is_client_connect() {
            Some(true)
        } else if key.is_client_disconnect() {
            Some(false)
        } else {
            None
        }
    }

    /// Blocked state, preferring the last block/unblock event.
    pub fn is_blocked(&self) -> bool {
        match self.last_event.as_ref().map(|e| e.key()) {
            Some(EventKey::WirelessClientBlocked) => true,
            Some(EventKey::WirelessClientUnblocked) => false,
            _ => self.blocked(),
        }
    }

    /// AP serving the client, preferring the target of the last roam.
    pub fn current_ap_mac(&self) -> &str {
        match &self.last_event {
            Some(e) if !e.ap_to().is_empty() => e.ap_to(),
            _ => self.ap_mac(),
        }
    }
}

raw_fields!(Client {
    mac: str["mac"] = "";
    hostname: str["hostname"] = "";
    /// User-assigned alias.
    name: str["name"] = "";
    ip: str["ip"] = "";
    oui: str["oui"] = "";
    essid: str["essid"] = "";
    is_wired: bool["is_wired"] = false;
    is_guest: bool["is_guest"] = false;
    blocked: bool["blocked"] = false;
    ap_mac: str["ap_mac"] = "";
    sw_mac: str["sw_mac"] = "";
    sw_port: opt_u64["sw_port"] = None;
    site_id: str["site_id"] = "";
    first_seen: opt_u64["first_seen"] = None;
    last_seen: opt_u64["last_seen"] = None;
    uptime: u64["uptime"] = 0;
    rx_bytes: u64["rx_bytes"] = 0;
    tx_bytes: u64["tx_bytes"] = 0;
    /// Signal strength in dBm (wireless only).
    signal: i64["signal"] = 0;
});

impl ApiItem for Client {
    const OBJ_ID_KEY: &'static str = "mac";
    const UPSERT_MESSAGES: &'static [MessageKey] = &[MessageKey::Client];
    const REMOVE_MESSAGES: &'static [MessageKey] = &[MessageKey::ClientRemoved];
    const EVENTS: &'static [EventKey] = &[
        EventKey::WirelessClientConnected,
        EventKey::WirelessClientDisconnected,
        EventKey::WirelessClientRoam,
        EventKey::WirelessClientRoamRadio,
        EventKey::WirelessGuestConnected,
        EventKey::WirelessGuestDisconnected,
        EventKey::WirelessGuestRoam,
        EventKey::WirelessGuestRoamRadio,
        EventKey::WiredClientConnected,
        EventKey::WiredClientDisconnected,
        EventKey::WiredGuestConnected,
        EventKey::WiredGuestDisconnected,
        EventKey::WirelessClientBlocked,
        EventKey::WirelessClientUnblocked,
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
