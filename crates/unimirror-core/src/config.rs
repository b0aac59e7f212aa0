// ── Runtime connection configuration ──
//
// These types describe *how* to connect to a UniFi controller and how the
// mirror keeps itself fresh. They carry credential data and tuning, but
// never touch disk: `unimirror-config` builds a `ControllerConfig` and
// hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

pub use unimirror_api::ReconnectConfig;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs). Default for local controllers.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for mirroring a single controller site.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller URL (e.g., `https://192.168.1.1`).
    pub url: Url,
    /// Site to mirror (defaults to "default").
    pub site: String,
    /// Legacy API username.
    pub username: String,
    /// Legacy API password.
    pub password: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Follow the websocket message stream after the initial refresh.
    pub websocket_enabled: bool,
    /// How often to perform a full refresh (seconds). 0 = never.
    pub refresh_interval_secs: u64,
    /// Websocket reconnection backoff.
    pub reconnect: ReconnectConfig,
}

impl ControllerConfig {
    /// A config for `url` with default tuning and the given credentials.
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            site: "default".into(),
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            websocket_enabled: true,
            refresh_interval_secs: 300,
            reconnect: ReconnectConfig::default(),
        }
    }
}
