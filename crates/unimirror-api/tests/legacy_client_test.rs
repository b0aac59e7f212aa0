#![allow(clippy::unwrap_used)]
// Integration tests for `LegacyClient` against a mock controller.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unimirror_api::{ControllerPlatform, Error, LegacyClient, Resource};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, LegacyClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = LegacyClient::with_client(
        reqwest::Client::new(),
        base_url,
        "default".into(),
        ControllerPlatform::ClassicController,
    );
    (server, client)
}

fn site_path(suffix: &str) -> String {
    format!("/api/s/default/{suffix}")
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn login_posts_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_partial_json(json!({ "username": "admin", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "hunter2".to_string().into();
    client.login("admin", &secret).await.unwrap();
}

#[tokio::test]
async fn login_failure_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(400).set_body_string("api.err.Invalid"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "wrong".to_string().into();
    let result = client.login("admin", &secret).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn logout_hits_platform_path() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.logout().await.unwrap();
}

#[tokio::test]
async fn detect_platform_on_redirect_is_classic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/manage"))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let platform = LegacyClient::detect_platform(&base).await.unwrap();
    assert_eq!(platform, ControllerPlatform::ClassicController);
}

#[tokio::test]
async fn detect_platform_on_ok_is_unifi_os() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let platform = LegacyClient::detect_platform(&base).await.unwrap();
    assert_eq!(platform, ControllerPlatform::UnifiOs);
}

// ── Resource listing ────────────────────────────────────────────────

#[tokio::test]
async fn list_raw_devices_unwraps_envelope() {
    let (server, client) = setup().await;

    let envelope = json!({
        "meta": { "rc": "ok" },
        "data": [
            { "mac": "aa:bb:cc:dd:ee:01", "name": "Switch-24", "port_table": [] },
            { "mac": "aa:bb:cc:dd:ee:02", "name": "AP-Lobby" }
        ]
    });

    Mock::given(method("GET"))
        .and(path(site_path("stat/device")))
        .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
        .mount(&server)
        .await;

    let devices = client.list_raw(Resource::Devices).await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["mac"], "aa:bb:cc:dd:ee:01");
    assert_eq!(devices[1]["name"], "AP-Lobby");
}

#[tokio::test]
async fn list_raw_sites_is_controller_scoped() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "ok" },
            "data": [{ "name": "default", "desc": "Default" }]
        })))
        .mount(&server)
        .await;

    let sites = client.list_raw(Resource::Sites).await.unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0]["desc"], "Default");
}

#[tokio::test]
async fn missing_data_is_empty_list() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(site_path("stat/voucher")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" } })))
        .mount(&server)
        .await;

    let vouchers = client.list_raw(Resource::Vouchers).await.unwrap();
    assert!(vouchers.is_empty());
}

// ── Error handling ──────────────────────────────────────────────────

#[tokio::test]
async fn rc_error_becomes_legacy_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(site_path("stat/sta")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "error", "msg": "api.err.NoSiteContext" },
            "data": []
        })))
        .mount(&server)
        .await;

    let result = client.list_raw(Resource::Clients).await;

    match result {
        Err(Error::LegacyApi { ref message }) => {
            assert_eq!(message, "api.err.NoSiteContext");
        }
        other => panic!("expected LegacyApi error, got: {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_is_auth_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(site_path("rest/wlanconf")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_raw(Resource::Wlans).await.unwrap_err();
    assert!(err.is_auth_expired(), "expected auth error, got: {err:?}");
}

#[tokio::test]
async fn missing_endpoint_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(site_path("rest/dpigroup")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.list_raw(Resource::DpiRestrictionGroups).await.unwrap_err();
    assert!(err.is_not_found(), "expected not found, got: {err:?}");
}

#[tokio::test]
async fn unifi_os_error_wrapper_is_translated() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(site_path("rest/firewallrule")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": 401, "message": "Unauthorized" }
        })))
        .mount(&server)
        .await;

    let err = client.list_raw(Resource::FirewallRules).await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "got: {err:?}");
}
