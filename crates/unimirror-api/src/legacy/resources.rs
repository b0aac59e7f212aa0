// Legacy API resource listing
//
// Every mirrored resource is fetched as raw JSON items. The core decides
// how to key and type them; this layer only knows where they live.

use tracing::debug;

use crate::error::Error;
use crate::legacy::client::LegacyClient;

/// A listable controller resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Resource {
    /// Active clients: `stat/sta`.
    Clients,
    /// Adopted devices: `stat/device`.
    Devices,
    /// Wireless networks: `rest/wlanconf`.
    Wlans,
    /// Port forwarding rules: `rest/portforward`.
    PortForwards,
    /// DPI restriction apps: `rest/dpiapp`.
    DpiRestrictionApps,
    /// DPI restriction groups: `rest/dpigroup`.
    DpiRestrictionGroups,
    /// Firewall rules: `rest/firewallrule`.
    FirewallRules,
    /// Hotspot vouchers: `stat/voucher`.
    Vouchers,
    /// Sites visible to the logged-in admin: `self/sites` (controller-scoped).
    Sites,
}

impl Resource {
    /// Every resource, in the order a full refresh fetches them.
    /// Devices come before the resources that reference them.
    pub const ALL: [Self; 9] = [
        Self::Sites,
        Self::Devices,
        Self::Clients,
        Self::Wlans,
        Self::PortForwards,
        Self::DpiRestrictionApps,
        Self::DpiRestrictionGroups,
        Self::FirewallRules,
        Self::Vouchers,
    ];

    /// The endpoint path, relative to the site (or controller) API root.
    pub fn path(self) -> &'static str {
        match self {
            Self::Clients => "stat/sta",
            Self::Devices => "stat/device",
            Self::Wlans => "rest/wlanconf",
            Self::PortForwards => "rest/portforward",
            Self::DpiRestrictionApps => "rest/dpiapp",
            Self::DpiRestrictionGroups => "rest/dpigroup",
            Self::FirewallRules => "rest/firewallrule",
            Self::Vouchers => "stat/voucher",
            Self::Sites => "self/sites",
        }
    }

    /// Whether the endpoint lives under `/api/s/{site}/`.
    pub fn is_site_scoped(self) -> bool {
        !matches!(self, Self::Sites)
    }
}

impl LegacyClient {
    /// List the raw items of a resource.
    ///
    /// `GET /api/s/{site}/{path}` for site-scoped resources,
    /// `GET /api/{path}` otherwise. Returns the unwrapped `data` array.
    pub async fn list_raw(&self, resource: Resource) -> Result<Vec<serde_json::Value>, Error> {
        let url = if resource.is_site_scoped() {
            self.site_url(resource.path())?
        } else {
            self.api_url(resource.path())?
        };
        debug!(?resource, "listing resource");
        self.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sites_is_controller_scoped() {
        let controller_scoped: Vec<_> = Resource::ALL
            .into_iter()
            .filter(|r| !r.is_site_scoped())
            .collect();
        assert_eq!(controller_scoped, vec![Resource::Sites]);
    }

    #[test]
    fn devices_refresh_before_clients() {
        let pos = |r: Resource| Resource::ALL.iter().position(|x| *x == r);
        assert!(pos(Resource::Devices) < pos(Resource::Clients));
    }
}
