// ── Firewall rule ──

use super::fields::raw_fields;
use super::{ApiItem, RawItem};
use crate::messages::MessageKey;

/// A legacy firewall rule (`firewallrule`), keyed by `_id`.
#[derive(Debug, Clone)]
pub struct FirewallRule {
    raw: RawItem,
}

raw_fields!(FirewallRule {
    record_id: str["_id"] = "";
    name: str["name"] = "";
    enabled: bool["enabled"] = false;
    /// `accept`, `drop` or `reject`.
    action: str["action"] = "";
    /// e.g. `WAN_IN`, `LAN_OUT`, `GUEST_LOCAL`.
    ruleset: str["ruleset"] = "";
    rule_index: i64["rule_index"] = 0;
    protocol: str["protocol"] = "all";
    logging: bool["logging"] = false;
    src_address: str["src_address"] = "";
    dst_address: str["dst_address"] = "";
    dst_port: str["dst_port"] = "";
    site_id: str["site_id"] = "";
});

impl ApiItem for FirewallRule {
    const OBJ_ID_KEY: &'static str = "_id";
    const UPSERT_MESSAGES: &'static [MessageKey] =
        &[MessageKey::FirewallRuleAdded, MessageKey::FirewallRuleUpdated];
    const REMOVE_MESSAGES: &'static [MessageKey] = &[MessageKey::FirewallRuleDeleted];

    fn from_raw(raw: RawItem) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }
}
