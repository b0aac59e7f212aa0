// ── Wireless network ──

use super::fields::raw_fields;
use super::{ApiItem, RawItem};
use crate::messages::MessageKey;

/// A WLAN configuration (`wlanconf`), keyed by `_id`.
#[derive(Debug, Clone)]
pub struct Wlan {
    raw: RawItem,
}

raw_fields!(Wlan {
    record_id: str["_id"] = "";
    /// SSID.
    name: str["name"] = "";
    enabled: bool["enabled"] = false;
    security: str["security"] = "open";
    wpa_mode: str["wpa_mode"] = "";
    is_guest: bool["is_guest"] = false;
    hide_ssid: bool["hide_ssid"] = false;
    networkconf_id: str["networkconf_id"] = "";
    /// Passphrase, when the controller includes it.
    x_passphrase: opt_str["x_passphrase"] = None;
    site_id: str["site_id"] = "";
});

impl ApiItem for Wlan {
    const OBJ_ID_KEY: &'static str = "_id";
    const UPSERT_MESSAGES: &'static [MessageKey] =
        &[MessageKey::WlanConfAdded, MessageKey::WlanConfUpdated];
    const REMOVE_MESSAGES: &'static [MessageKey] = &[MessageKey::WlanConfDeleted];

    fn from_raw(raw: RawItem) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }
}
