/// The platform type of the UniFi controller.
///
/// Determines URL prefixes and login paths. Only platforms that expose the
/// legacy API and websocket are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPlatform {
    /// UniFi OS device (UDM, UCG, etc.) -- port 443, `/proxy/network/` prefix.
    UnifiOs,
    /// Standalone Network Application (Java) -- port 8443, no prefix.
    ClassicController,
}

impl ControllerPlatform {
    /// The path prefix for legacy API endpoints.
    pub fn legacy_prefix(self) -> &'static str {
        match self {
            Self::UnifiOs => "/proxy/network",
            Self::ClassicController => "",
        }
    }

    /// The login endpoint path.
    pub fn login_path(self) -> &'static str {
        match self {
            Self::UnifiOs => "/api/auth/login",
            Self::ClassicController => "/api/login",
        }
    }

    /// The logout endpoint path.
    pub fn logout_path(self) -> &'static str {
        match self {
            Self::UnifiOs => "/api/auth/logout",
            Self::ClassicController => "/api/logout",
        }
    }

    /// The WebSocket path template. `{site}` must be replaced by the caller.
    pub fn websocket_path(self) -> &'static str {
        match self {
            Self::UnifiOs => "/proxy/network/wss/s/{site}/events",
            Self::ClassicController => "/wss/s/{site}/events",
        }
    }

    /// Build the websocket URL for `site` from the controller base URL.
    ///
    /// `https` maps to `wss`, anything else to `ws`. The port, if any,
    /// is preserved.
    pub fn websocket_url(self, base_url: &url::Url, site: &str) -> Result<url::Url, url::ParseError> {
        let path = self.websocket_path().replace("{site}", site);
        let scheme = if base_url.scheme() == "https" { "wss" } else { "ws" };
        let host = base_url.host_str().unwrap_or("localhost");
        let raw = match base_url.port() {
            Some(p) => format!("{scheme}://{host}:{p}{path}"),
            None => format!("{scheme}://{host}{path}"),
        };
        url::Url::parse(&raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unifi_os_websocket_url() {
        let base = url::Url::parse("https://192.168.1.1").unwrap();
        let ws = ControllerPlatform::UnifiOs
            .websocket_url(&base, "default")
            .unwrap();
        assert_eq!(
            ws.as_str(),
            "wss://192.168.1.1/proxy/network/wss/s/default/events"
        );
    }

    #[test]
    fn classic_websocket_url_keeps_port() {
        let base = url::Url::parse("http://controller:8080").unwrap();
        let ws = ControllerPlatform::ClassicController
            .websocket_url(&base, "lab")
            .unwrap();
        assert_eq!(ws.as_str(), "ws://controller:8080/wss/s/lab/events");
    }

    #[test]
    fn login_paths_differ_by_platform() {
        assert_eq!(ControllerPlatform::UnifiOs.login_path(), "/api/auth/login");
        assert_eq!(ControllerPlatform::ClassicController.login_path(), "/api/login");
        assert_eq!(ControllerPlatform::ClassicController.legacy_prefix(), "");
    }
}
