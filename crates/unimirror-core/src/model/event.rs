// ── Controller domain events ──
//
// Events arrive on the websocket under the `events` message kind. Each one
// names what happened (`key`) and to whom, spread over several MAC fields
// depending on whether the subject is a client or a device.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use strum::{EnumString, IntoStaticStr};

use super::RawItem;
use super::fields::{raw_fields, read_i64, read_str};

/// Event kinds the mirror understands.
///
/// Unrecognized keys parse to [`EventKey::Unknown`]; the original string is
/// kept on the [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
pub enum EventKey {
    // ── Clients ──────────────────────────────────────────────────────
    #[strum(serialize = "EVT_WU_Connected")]
    WirelessClientConnected,
    #[strum(serialize = "EVT_WU_Disconnected")]
    WirelessClientDisconnected,
    #[strum(serialize = "EVT_WU_Roam")]
    WirelessClientRoam,
    #[strum(serialize = "EVT_WU_RoamRadio")]
    WirelessClientRoamRadio,
    #[strum(serialize = "EVT_WG_Connected")]
    WirelessGuestConnected,
    #[strum(serialize = "EVT_WG_Disconnected")]
    WirelessGuestDisconnected,
    #[strum(serialize = "EVT_WG_Roam")]
    WirelessGuestRoam,
    #[strum(serialize = "EVT_WG_RoamRadio")]
    WirelessGuestRoamRadio,
    #[strum(serialize = "EVT_LU_Connected")]
    WiredClientConnected,
    #[strum(serialize = "EVT_LU_Disconnected")]
    WiredClientDisconnected,
    #[strum(serialize = "EVT_LG_Connected")]
    WiredGuestConnected,
    #[strum(serialize = "EVT_LG_Disconnected")]
    WiredGuestDisconnected,
    #[strum(serialize = "EVT_WC_Blocked")]
    WirelessClientBlocked,
    #[strum(serialize = "EVT_WC_Unblocked")]
    WirelessClientUnblocked,

    // ── Access points ────────────────────────────────────────────────
    #[strum(serialize = "EVT_AP_Connected")]
    AccessPointConnected,
    #[strum(serialize = "EVT_AP_Lost_Contact")]
    AccessPointLostContact,
    #[strum(serialize = "EVT_AP_Upgraded")]
    AccessPointUpgraded,
    #[strum(serialize = "EVT_AP_RestartedUnknown")]
    AccessPointRestarted,

    // ── Switches ─────────────────────────────────────────────────────
    #[strum(serialize = "EVT_SW_Connected")]
    SwitchConnected,
    #[strum(serialize = "EVT_SW_Lost_Contact")]
    SwitchLostContact,
    #[strum(serialize = "EVT_SW_Upgraded")]
    SwitchUpgraded,
    #[strum(serialize = "EVT_SW_RestartedUnknown")]
    SwitchRestarted,

    // ── Gateways ─────────────────────────────────────────────────────
    #[strum(serialize = "EVT_GW_Connected")]
    GatewayConnected,
    #[strum(serialize = "EVT_GW_Lost_Contact")]
    GatewayLostContact,
    #[strum(serialize = "EVT_GW_Upgraded")]
    GatewayUpgraded,
    #[strum(serialize = "EVT_GW_RestartedUnknown")]
    GatewayRestarted,
    #[strum(serialize = "EVT_GW_WANTransition")]
    GatewayWanTransition,

    // ── Everything else ──────────────────────────────────────────────
    #[strum(serialize = "unknown")]
    Unknown,
}

impl EventKey {
    /// Parse a controller event key. Never fails.
    pub fn parse(key: &str) -> Self {
        Self::from_str(key).unwrap_or(Self::Unknown)
    }

    /// The controller's spelling of this key (`"unknown"` for `Unknown`).
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// A client came online.
    pub fn is_client_connect(self) -> bool {
        matches!(
            self,
            Self::WirelessClientConnected
                | Self::WirelessGuestConnected
                | Self::WiredClientConnected
                | Self::WiredGuestConnected
        )
    }

    /// A client went offline.
    pub fn is_client_disconnect(self) -> bool {
        matches!(
            self,
            Self::WirelessClientDisconnected
                | Self::WirelessGuestDisconnected
                | Self::WiredClientDisconnected
                | Self::WiredGuestDisconnected
        )
    }

    /// A device (re)established contact with the controller.
    pub fn is_device_connect(self) -> bool {
        matches!(
            self,
            Self::AccessPointConnected | Self::SwitchConnected | Self::GatewayConnected
        )
    }

    /// A device stopped reporting to the controller.
    pub fn is_device_lost(self) -> bool {
        matches!(
            self,
            Self::AccessPointLostContact | Self::SwitchLostContact | Self::GatewayLostContact
        )
    }
}

/// MAC fields consulted for the event's subject, highest precedence first.
/// Client fields win over device fields.
const MAC_PRECEDENCE: [&str; 6] = ["client", "guest", "user", "ap", "gw", "sw"];

/// A controller event.
#[derive(Debug, Clone)]
pub struct Event {
    raw: RawItem,
    key: EventKey,
    mac: String,
}

impl Event {
    pub fn new(raw: RawItem) -> Self {
        let key = EventKey::parse(read_str(&raw, "key").unwrap_or_default());
        let mac = MAC_PRECEDENCE
            .iter()
            .filter_map(|field| read_str(&raw, field))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
            .to_owned();
        Self { raw, key, mac }
    }

    pub fn raw(&self) -> &RawItem {
        &self.raw
    }

    pub fn key(&self) -> EventKey {
        self.key
    }

    /// The key exactly as the controller sent it.
    pub fn key_str(&self) -> &str {
        read_str(&self.raw, "key").unwrap_or_default()
    }

    /// MAC of the event's subject, or `""` when the event names none.
    pub fn mac(&self) -> &str {
        &self.mac
    }

    /// When the event happened: `datetime` (RFC 3339), else `time` (epoch ms).
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        if let Some(text) = read_str(&self.raw, "datetime") {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.with_timezone(&Utc));
            }
        }
        read_i64(&self.raw, "time").and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

raw_fields!(Event {
    /// Human-readable description.
    msg: str["msg"] = "";
    subsystem: str["subsystem"] = "";
    site_id: str["site_id"] = "";
    /// Client hostname, when the subject is a client.
    hostname: str["hostname"] = "";
    ssid: str["ssid"] = "";
    /// Radio channel after a roam.
    channel: opt_str["channel"] = None;
    /// AP the client roamed away from.
    ap_from: str["ap_from"] = "";
    /// AP the client roamed to.
    ap_to: str["ap_to"] = "";
    /// Seconds connected, on disconnect events.
    duration: opt_u64["duration"] = None;
    /// Bytes transferred during the session, on disconnect events.
    bytes: opt_u64["bytes"] = None;
});
