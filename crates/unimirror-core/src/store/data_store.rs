// ── Central mirror of one controller site ──
//
// Owns the message router, one table per resource, the port and outlet
// projections, and the event classifier. Nothing here is global: a
// `Controller` owns exactly one `DataStore`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use super::projection::DerivedTable;
use super::table::{EntityTable, EventSink};
use crate::events::EventClassifier;
use crate::messages::MessageRouter;
use crate::model::{
    Client, Device, DpiRestrictionApp, DpiRestrictionGroup, FirewallRule, Outlet, Port,
    PortForward, Site, Voucher, Wlan,
};

/// Every table of a mirrored site, wired for websocket updates.
pub struct DataStore {
    pub(crate) router: Arc<MessageRouter>,
    pub(crate) clients: Arc<EntityTable<Client>>,
    pub(crate) devices: Arc<EntityTable<Device>>,
    pub(crate) wlans: Arc<EntityTable<Wlan>>,
    pub(crate) port_forwards: Arc<EntityTable<PortForward>>,
    pub(crate) dpi_apps: Arc<EntityTable<DpiRestrictionApp>>,
    pub(crate) dpi_groups: Arc<EntityTable<DpiRestrictionGroup>>,
    pub(crate) firewall_rules: Arc<EntityTable<FirewallRule>>,
    pub(crate) vouchers: Arc<EntityTable<Voucher>>,
    pub(crate) sites: Arc<EntityTable<Site>>,
    pub(crate) ports: DerivedTable<Port>,
    pub(crate) outlets: DerivedTable<Outlet>,
    pub(crate) events: EventClassifier,
    pub(crate) last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_ws_message: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let router = Arc::new(MessageRouter::new());

        let clients = Arc::new(EntityTable::<Client>::new());
        let devices = Arc::new(EntityTable::<Device>::new());
        let wlans = Arc::new(EntityTable::<Wlan>::new());
        let port_forwards = Arc::new(EntityTable::<PortForward>::new());
        let dpi_apps = Arc::new(EntityTable::<DpiRestrictionApp>::new());
        let dpi_groups = Arc::new(EntityTable::<DpiRestrictionGroup>::new());
        let firewall_rules = Arc::new(EntityTable::<FirewallRule>::new());
        let vouchers = Arc::new(EntityTable::<Voucher>::new());
        let sites = Arc::new(EntityTable::<Site>::new());

        // Projections only see devices added after they attach.
        let ports = DerivedTable::<Port>::attach(&devices);
        let outlets = DerivedTable::<Outlet>::attach(&devices);

        clients.attach(&router);
        devices.attach(&router);
        wlans.attach(&router);
        port_forwards.attach(&router);
        dpi_apps.attach(&router);
        dpi_groups.attach(&router);
        firewall_rules.attach(&router);
        vouchers.attach(&router);
        sites.attach(&router);

        let events = EventClassifier::attach(&router);
        events.register_sink(Arc::clone(&clients) as Arc<dyn EventSink>);
        events.register_sink(Arc::clone(&devices) as Arc<dyn EventSink>);

        let (last_full_refresh, _) = watch::channel(None);
        let (last_ws_message, _) = watch::channel(None);

        Self {
            router,
            clients,
            devices,
            wlans,
            port_forwards,
            dpi_apps,
            dpi_groups,
            firewall_rules,
            vouchers,
            sites,
            ports,
            outlets,
            events,
            last_full_refresh,
            last_ws_message,
        }
    }

    /// Feed one websocket frame through the router.
    /// Returns the number of messages dispatched.
    pub fn dispatch(&self, frame: &Value) -> usize {
        let dispatched = self.router.dispatch(frame);
        if dispatched > 0 {
            self.last_ws_message.send_replace(Some(Utc::now()));
        }
        dispatched
    }

    // ── Table accessors ──────────────────────────────────────────────

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn clients(&self) -> &Arc<EntityTable<Client>> {
        &self.clients
    }

    pub fn devices(&self) -> &Arc<EntityTable<Device>> {
        &self.devices
    }

    pub fn wlans(&self) -> &Arc<EntityTable<Wlan>> {
        &self.wlans
    }

    pub fn port_forwards(&self) -> &Arc<EntityTable<PortForward>> {
        &self.port_forwards
    }

    pub fn dpi_apps(&self) -> &Arc<EntityTable<DpiRestrictionApp>> {
        &self.dpi_apps
    }

    pub fn dpi_groups(&self) -> &Arc<EntityTable<DpiRestrictionGroup>> {
        &self.dpi_groups
    }

    pub fn firewall_rules(&self) -> &Arc<EntityTable<FirewallRule>> {
        &self.firewall_rules
    }

    pub fn vouchers(&self) -> &Arc<EntityTable<Voucher>> {
        &self.vouchers
    }

    pub fn sites(&self) -> &Arc<EntityTable<Site>> {
        &self.sites
    }

    pub fn ports(&self) -> &DerivedTable<Port> {
        &self.ports
    }

    pub fn outlets(&self) -> &DerivedTable<Outlet> {
        &self.outlets
    }

    pub fn events(&self) -> &EventClassifier {
        &self.events
    }

    // ── Freshness ────────────────────────────────────────────────────

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub fn last_ws_message(&self) -> Option<DateTime<Utc>> {
        *self.last_ws_message.borrow()
    }

    pub fn subscribe_last_full_refresh(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_full_refresh.subscribe()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::Source;
    use crate::store::ItemEvent;

    #[test]
    fn websocket_frames_reach_their_tables() {
        let store = DataStore::new();

        store.dispatch(&json!({
            "meta": { "rc": "ok", "message": "device:sync" },
            "data": [{ "mac": "aa:bb", "port_table": [{ "port_idx": 1 }, { "port_idx": 2 }] }]
        }));
        store.dispatch(&json!({
            "meta": { "rc": "ok", "message": "wlanconf:add" },
            "data": [{ "_id": "w1", "name": "Home" }]
        }));
        store.dispatch(&json!({
            "meta": { "rc": "ok", "message": "firewallrule:add" },
            "data": [{ "_id": "f1", "name": "Block IoT" }]
        }));

        assert!(store.devices().contains("aa:bb"));
        assert_eq!(store.ports().len(), 2);
        assert_eq!(store.wlans().get("w1").unwrap().name(), "Home");
        assert!(store.firewall_rules().contains("f1"));
        assert!(store.clients().is_empty());
        assert!(store.last_ws_message().is_some());
    }

    #[test]
    fn deletes_flow_through_router() {
        let store = DataStore::new();
        store.dispatch(&json!({
            "meta": { "message": "portforward:add" },
            "data": [{ "_id": "p1" }, { "_id": "p2" }]
        }));
        store.dispatch(&json!({
            "meta": { "message": "portforward:delete" },
            "data": [{ "_id": "p1" }]
        }));
        assert_eq!(store.port_forwards().ids(), vec!["p2".to_owned()]);
    }

    #[test]
    fn events_update_clients_through_store() {
        let store = DataStore::new();
        store.clients().full_refresh(vec![json!({ "mac": "aa:bb" })]);
        let seen: Arc<Mutex<Vec<ItemEvent>>> = Arc::default();
        let sink = Arc::clone(&seen);
        store
            .clients()
            .subscribe(move |e, _| sink.lock().unwrap().push(e), None, Some("aa:bb"));

        store.dispatch(&json!({
            "meta": { "message": "events" },
            "data": [{ "key": "EVT_WU_Connected", "user": "aa:bb" }]
        }));

        assert_eq!(store.clients().get("aa:bb").unwrap().source(), Source::Event);
        assert_eq!(*seen.lock().unwrap(), vec![ItemEvent::Changed]);
    }

    #[test]
    fn malformed_frames_change_nothing() {
        let store = DataStore::new();
        assert_eq!(store.dispatch(&json!({ "data": [{ "mac": "aa:bb" }] })), 0);
        assert_eq!(store.dispatch(&json!({ "meta": { "message": "sta:sync" } })), 0);
        assert!(store.clients().is_empty());
        assert!(store.last_ws_message().is_none());
    }

    #[test]
    fn unknown_messages_are_harmless() {
        let store = DataStore::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&seen);
        store.router().subscribe(
            move |m| sink.lock().unwrap().push(m.meta.raw_message.clone()),
            None,
        );
        assert_eq!(
            store.dispatch(&json!({ "meta": { "message": "hotspot:new" }, "data": [{}] })),
            1
        );
        assert_eq!(*seen.lock().unwrap(), vec!["hotspot:new".to_owned()]);
    }
}
