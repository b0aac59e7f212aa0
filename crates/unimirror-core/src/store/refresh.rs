// ── Full refresh application ──
//
// HTTP snapshots are union-merged into their table: items the controller
// no longer lists stay in the mirror until a websocket delete removes them.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use unimirror_api::Resource;

use super::DataStore;

impl DataStore {
    /// Merge the raw `data` of one resource listing into its table.
    pub fn apply_snapshot(&self, resource: Resource, items: Vec<Value>) {
        debug!(?resource, count = items.len(), "applying snapshot");
        match resource {
            Resource::Clients => self.clients.full_refresh(items),
            Resource::Devices => self.devices.full_refresh(items),
            Resource::Wlans => self.wlans.full_refresh(items),
            Resource::PortForwards => self.port_forwards.full_refresh(items),
            Resource::DpiRestrictionApps => self.dpi_apps.full_refresh(items),
            Resource::DpiRestrictionGroups => self.dpi_groups.full_refresh(items),
            Resource::FirewallRules => self.firewall_rules.full_refresh(items),
            Resource::Vouchers => self.vouchers.full_refresh(items),
            Resource::Sites => self.sites.full_refresh(items),
            other => debug!(resource = ?other, "no table for resource"),
        }
    }

    /// Record that a full refresh of every resource finished.
    pub(crate) fn mark_refreshed(&self) {
        self.last_full_refresh.send_replace(Some(Utc::now()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn snapshot_lands_in_matching_table() {
        let store = DataStore::new();
        store.apply_snapshot(
            Resource::Devices,
            vec![json!({ "mac": "aa:bb", "outlet_table": [{ "index": 1 }, { "index": 2 }] })],
        );
        store.apply_snapshot(Resource::Sites, vec![json!({ "name": "default", "desc": "Default" })]);
        store.apply_snapshot(Resource::Vouchers, vec![json!({ "_id": "v1", "code": "12345" })]);

        assert!(store.devices().contains("aa:bb"));
        assert_eq!(store.outlets().len(), 2);
        assert_eq!(store.sites().get("default").unwrap().desc(), "Default");
        assert_eq!(store.vouchers().get("v1").unwrap().code(), "12345");
    }

    #[test]
    fn mark_refreshed_records_time() {
        let store = DataStore::new();
        assert!(store.last_full_refresh().is_none());
        store.mark_refreshed();
        assert!(store.last_full_refresh().is_some());
    }
}
