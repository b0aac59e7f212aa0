// ── DPI restriction apps and groups ──
//
// A group bundles restriction apps; each app entry lists the application
// and category ids it blocks or logs.

use serde_json::Value;

use super::fields::raw_fields;
use super::{ApiItem, RawItem};
use crate::messages::MessageKey;

/// A DPI restriction app (`dpiapp`), keyed by `_id`.
#[derive(Debug, Clone)]
pub struct DpiRestrictionApp {
    raw: RawItem,
}

impl DpiRestrictionApp {
    /// Application ids covered by this restriction.
    pub fn apps(&self) -> Vec<u64> {
        id_list(&self.raw, "apps")
    }

    /// Category ids covered by this restriction.
    pub fn cats(&self) -> Vec<u64> {
        id_list(&self.raw, "cats")
    }
}

raw_fields!(DpiRestrictionApp {
    record_id: str["_id"] = "";
    enabled: bool["enabled"] = false;
    blocked: bool["blocked"] = false;
    log: bool["log"] = false;
    site_id: str["site_id"] = "";
});

impl ApiItem for DpiRestrictionApp {
    const OBJ_ID_KEY: &'static str = "_id";
    const UPSERT_MESSAGES: &'static [MessageKey] =
        &[MessageKey::DpiAppAdded, MessageKey::DpiAppUpdated];
    const REMOVE_MESSAGES: &'static [MessageKey] = &[MessageKey::DpiAppDeleted];

    fn from_raw(raw: RawItem) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }
}

/// A DPI restriction group (`dpigroup`), keyed by `_id`.
#[derive(Debug, Clone)]
pub struct DpiRestrictionGroup {
    raw: RawItem,
}

impl DpiRestrictionGroup {
    /// Ids of the [`DpiRestrictionApp`]s in this group.
    pub fn dpiapp_ids(&self) -> Vec<&str> {
        self.raw
            .get("dpiapp_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

raw_fields!(DpiRestrictionGroup {
    record_id: str["_id"] = "";
    name: str["name"] = "";
    attr_no_delete: bool["attr_no_delete"] = false;
    attr_hidden_id: str["attr_hidden_id"] = "";
    site_id: str["site_id"] = "";
});

impl ApiItem for DpiRestrictionGroup {
    const OBJ_ID_KEY: &'static str = "_id";
    const UPSERT_MESSAGES: &'static [MessageKey] =
        &[MessageKey::DpiGroupAdded, MessageKey::DpiGroupUpdated];
    const REMOVE_MESSAGES: &'static [MessageKey] = &[MessageKey::DpiGroupDeleted];

    fn from_raw(raw: RawItem) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }
}

fn id_list(raw: &RawItem, key: &str) -> Vec<u64> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}
