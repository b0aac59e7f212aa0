//! Profile configuration for unimirror.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `unimirror_core::ControllerConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use unimirror_core::{ControllerConfig, TlsVerification};

const KEYRING_SERVICE: &str = "unimirror";
const ENV_PREFIX: &str = "UNIMIRROR_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Global defaults, overridden per profile.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_true")]
    pub websocket: bool,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
            websocket: true,
            refresh_interval: default_refresh_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_refresh_interval() -> u64 {
    300
}

/// A named controller profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "https://192.168.1.1").
    pub controller: String,

    /// Site to mirror.
    #[serde(default = "default_site")]
    pub site: String,

    /// Username for session login.
    pub username: Option<String>,

    /// Password (plaintext, prefer keyring).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override websocket streaming.
    pub websocket: Option<bool>,

    /// Override full refresh interval (seconds, 0 = never).
    pub refresh_interval: Option<u64>,
}

fn default_site() -> String {
    "default".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "unimirror", "unimirror").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("unimirror");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Nested keys use a double underscore: `UNIMIRROR_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "loaded config");
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Store a profile's password in the OS keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))?;
    entry.set_password(password.expose_secret())?;
    Ok(())
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .ok()?
        .get_password()
        .ok()
}

/// Resolve login credentials for a profile.
///
/// Username: profile, then `UNIMIRROR_USERNAME`. Password: the profile's
/// `password_env` variable, `UNIMIRROR_PASSWORD`, the OS keyring, then the
/// plaintext `password` field.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    resolve_credentials_with(profile, profile_name, keyring_password)
}

fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    keyring: impl FnOnce(&str) -> Option<String>,
) -> Result<(String, SecretString), ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(format!("{ENV_PREFIX}USERNAME")).ok())
        .ok_or_else(no_credentials)?;

    // 1. Env vars
    let from_env = profile
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
        .or_else(|| std::env::var(format!("{ENV_PREFIX}PASSWORD")).ok());
    if let Some(pw) = from_env {
        debug!(profile = profile_name, "password from environment");
        return Ok((username, SecretString::from(pw)));
    }

    // 2. Keyring
    if let Some(pw) = keyring(profile_name) {
        debug!(profile = profile_name, "password from keyring");
        return Ok((username, SecretString::from(pw)));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok((username, SecretString::from(pw.clone())));
    }

    Err(no_credentials())
}

// ── ControllerConfig construction ───────────────────────────────────

/// Build a `ControllerConfig` from a profile, falling back to `defaults`.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let (username, password) = resolve_credentials(profile, profile_name)?;
    build_controller_config(profile, defaults, username, password)
}

fn build_controller_config(
    profile: &Profile,
    defaults: &Defaults,
    username: String,
    password: SecretString,
) -> Result<ControllerConfig, ConfigError> {
    let url: url::Url = profile
        .controller
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "controller".into(),
            reason: format!("invalid URL: {}", profile.controller),
        })?;

    if profile.site.is_empty() {
        return Err(ConfigError::Validation {
            field: "site".into(),
            reason: "must not be empty".into(),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::DangerAcceptInvalid // local controllers typically self-signed
    };

    let mut config = ControllerConfig::new(url, username, password);
    config.site.clone_from(&profile.site);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.websocket_enabled = profile.websocket.unwrap_or(defaults.websocket);
    config.refresh_interval_secs = profile.refresh_interval.unwrap_or(defaults.refresh_interval);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
timeout = 15
refresh_interval = 60

[profiles.home]
controller = "https://192.168.1.1"
username = "admin"
password = "plain"
ca_cert = "/etc/ssl/unifi.pem"

[profiles.lab]
controller = "https://lab.example:8443"
site = "lab"
username = "ops"
websocket = false
refresh_interval = 0
insecure = true
"#;

    fn sample() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.timeout, 30);
        assert!(config.defaults.websocket);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn profiles_and_defaults_parse() {
        let config = sample();
        let (name, home) = config.profile(None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(home.site, "default");
        assert_eq!(config.defaults.timeout, 15);
        assert_eq!(config.defaults.refresh_interval, 60);
        assert!(config.defaults.websocket);

        let (_, lab) = config.profile(Some("lab")).unwrap();
        assert_eq!(lab.site, "lab");
        assert_eq!(lab.websocket, Some(false));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let config = sample();
        assert!(matches!(
            config.profile(Some("office")),
            Err(ConfigError::UnknownProfile { profile }) if profile == "office"
        ));
    }

    #[test]
    fn profile_overrides_defaults() {
        let config = sample();

        let (_, home) = config.profile(Some("home")).unwrap();
        let cc = build_controller_config(home, &config.defaults, "admin".into(), "x".to_owned().into())
            .unwrap();
        assert_eq!(cc.url.as_str(), "https://192.168.1.1/");
        assert_eq!(cc.timeout, Duration::from_secs(15));
        assert_eq!(cc.refresh_interval_secs, 60);
        assert!(cc.websocket_enabled);
        assert_eq!(cc.tls, TlsVerification::CustomCa(PathBuf::from("/etc/ssl/unifi.pem")));

        let (_, lab) = config.profile(Some("lab")).unwrap();
        let cc = build_controller_config(lab, &config.defaults, "ops".into(), "x".to_owned().into())
            .unwrap();
        assert_eq!(cc.site, "lab");
        assert_eq!(cc.refresh_interval_secs, 0);
        assert!(!cc.websocket_enabled);
        assert_eq!(cc.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn invalid_controller_url_is_rejected() {
        let profile = Profile {
            controller: "not a url".into(),
            site: "default".into(),
            ..Profile::default()
        };
        let err = build_controller_config(
            &profile,
            &Defaults::default(),
            "admin".into(),
            "x".to_owned().into(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "controller"));
    }

    #[test]
    fn password_env_wins_over_keyring_and_plaintext() {
        let expected = std::env::var("PATH").unwrap();
        let profile = Profile {
            username: Some("admin".into()),
            password: Some("plain".into()),
            password_env: Some("PATH".into()),
            ..Profile::default()
        };
        let (_, pw) =
            resolve_credentials_with(&profile, "home", |_| Some("from-keyring".into())).unwrap();
        assert_eq!(pw.expose_secret(), expected);
    }

    #[test]
    fn keyring_wins_over_plaintext() {
        let profile = Profile {
            username: Some("admin".into()),
            password: Some("plain".into()),
            password_env: Some("UNIMIRROR_TEST_UNSET_VARIABLE".into()),
            ..Profile::default()
        };
        let (user, pw) = resolve_credentials_with(&profile, "home", |name| {
            (name == "home").then(|| "from-keyring".to_owned())
        })
        .unwrap();
        assert_eq!(user, "admin");
        assert_eq!(pw.expose_secret(), "from-keyring");
    }

    #[test]
    fn plaintext_is_the_last_resort() {
        let profile = Profile {
            username: Some("admin".into()),
            password: Some("plain".into()),
            ..Profile::default()
        };
        let (_, pw) = resolve_credentials_with(&profile, "home", |_| None).unwrap();
        assert_eq!(pw.expose_secret(), "plain");

        let bare = Profile {
            username: Some("admin".into()),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_credentials_with(&bare, "home", |_| None),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                controller: "https://10.0.0.1".into(),
                site: "default".into(),
                username: Some("admin".into()),
                refresh_interval: Some(120),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let (_, profile) = loaded.profile(None).unwrap();
        assert_eq!(profile.controller, "https://10.0.0.1");
        assert_eq!(profile.refresh_interval, Some(120));
    }
}
