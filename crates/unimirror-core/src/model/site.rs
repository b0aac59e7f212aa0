// ── Site ──

use super::fields::raw_fields;
use super::{ApiItem, RawItem};

/// A controller site, keyed by its short `name` (the `{site}` in API paths).
#[derive(Debug, Clone)]
pub struct Site {
    raw: RawItem,
}

raw_fields!(Site {
    record_id: str["_id"] = "";
    name: str["name"] = "";
    /// Display name.
    desc: str["desc"] = "";
    role: str["role"] = "";
});

impl ApiItem for Site {
    const OBJ_ID_KEY: &'static str = "name";

    fn from_raw(raw: RawItem) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }
}
