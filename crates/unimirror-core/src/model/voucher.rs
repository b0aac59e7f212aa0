// ── Hotspot voucher ──

use super::fields::raw_fields;
use super::{ApiItem, RawItem};

/// A hotspot voucher, keyed by `_id`. Refreshed from snapshots only.
#[derive(Debug, Clone)]
pub struct Voucher {
    raw: RawItem,
}

impl Voucher {
    /// Uses left, or `None` for unlimited vouchers (`quota == 0`).
    pub fn remaining_uses(&self) -> Option<u64> {
        match self.quota() {
            0 => None,
            quota => Some(quota.saturating_sub(self.used())),
        }
    }
}

raw_fields!(Voucher {
    record_id: str["_id"] = "";
    code: str["code"] = "";
    /// Number of allowed uses; 0 means unlimited.
    quota: u64["quota"] = 0;
    used: u64["used"] = 0;
    /// Validity in minutes.
    duration: u64["duration"] = 0;
    qos_usage_quota: opt_u64["qos_usage_quota"] = None;
    qos_rate_max_up: opt_u64["qos_rate_max_up"] = None;
    qos_rate_max_down: opt_u64["qos_rate_max_down"] = None;
    note: str["note"] = "";
    create_time: u64["create_time"] = 0;
    site_id: str["site_id"] = "";
});

impl ApiItem for Voucher {
    const OBJ_ID_KEY: &'static str = "_id";

    fn from_raw(raw: RawItem) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &RawItem {
        &self.raw
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn voucher(value: serde_json::Value) -> Voucher {
        Voucher::from_raw(value.as_object().unwrap().clone())
    }

    #[test]
    fn remaining_uses() {
        assert_eq!(voucher(json!({ "quota": 3, "used": 1 })).remaining_uses(), Some(2));
        assert_eq!(voucher(json!({ "quota": 1, "used": 4 })).remaining_uses(), Some(0));
        assert_eq!(voucher(json!({ "quota": 0 })).remaining_uses(), None);
    }
}
