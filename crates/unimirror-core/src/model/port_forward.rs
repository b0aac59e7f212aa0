// ── Port forwarding rule ──

use super::fields::raw_fields;
use super::{ApiItem, RawItem};
use crate::messages::MessageKey;

/// A port forwarding rule (`portforward`), keyed by `_id`.
#[derive(Debug, Clone)]
pub struct PortForward {
    raw: RawItem,
}

raw_fields!(PortForward {
    record_id: str["_id"] = "";
    name: str["name"] = "";
    enabled: bool["enabled"] = false;
    /// External port or range.
    dst_port: str["dst_port"] = "";
    /// Internal target address.
    fwd: str["fwd"] = "";
    fwd_port: str["fwd_port"] = "";
    /// `tcp`, `udp` or `tcp_udp`.
    proto: str["proto"] = "tcp_udp";
    src: str["src"] = "any";
    pfwd_interface: str["pfwd_interface"] = "wan";
    site_id: str["site_id"] = "";
});

impl ApiItem for PortForward {
    const OBJ_ID_KEY: &'static str = "_id";
    const UPSERT_MESSAGES: &'static [MessageKey] =
        &[MessageKey::PortForwardAdded, MessageKey::PortForwardUpdated];
    const REMOVE_MESSAGES: &'static [MessageKey] = &[MessageKey::PortForwardDeleted];

    fn from_raw(raw: RawItem) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }
}
