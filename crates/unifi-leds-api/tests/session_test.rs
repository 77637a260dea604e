#![allow(clippy::unwrap_used)]
// Integration tests for `Session` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unifi_leds_api::{
    ApiDialect, ApiRequest, Endpoint, Error, ErrorKind, LedUpdate, Session,
    models::DeviceClass,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;
    let session = session_for(&server.uri());
    (server, session)
}

fn session_for(uri: &str) -> Session {
    let base_url = Url::parse(uri).unwrap();
    let secret: secrecy::SecretString = "hunter2".to_string().into();
    Session::with_client(reqwest::Client::new(), base_url, "admin", secret)
}

fn jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

fn sites_envelope() -> serde_json::Value {
    json!({
        "meta": { "rc": "ok" },
        "data": [
            { "_id": "s1", "name": "default", "desc": "Home" },
            { "_id": "s2", "name": "x7kq", "desc": "Office" }
        ]
    })
}

fn device_envelope() -> serde_json::Value {
    json!({
        "meta": { "rc": "ok" },
        "data": [{ "_id": "ap1", "type": "uap", "model": "U6LR", "led_override": "on" }]
    })
}

/// Mount a classic-controller login (the UniFi OS probe 404s) and site list.
async fn mount_classic(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "unifises=abc123; Path=/; HttpOnly")
                .set_body_json(json!({ "meta": { "rc": "ok" }, "data": [] })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(server)
        .await;
}

/// Mount a UniFi OS login carrying `csrf` in the token claims, and site list.
async fn mount_unifi_os(server: &MockServer, csrf: &str) {
    let token = jwt(&json!({ "userId": "u1", "csrfToken": csrf }));
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("TOKEN={token}; Path=/; HttpOnly").as_str())
                .set_body_json(json!({ "username": "admin" })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy/network/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(server)
        .await;
}

fn device_list(site: &str) -> ApiRequest {
    ApiRequest::get(Endpoint::DeviceList { site: site.into() })
}

// ── Dialect detection ───────────────────────────────────────────────

#[tokio::test]
async fn test_detects_classic_controller() {
    let (server, session) = setup().await;
    mount_classic(&server).await;

    session.authenticate().await.unwrap();

    assert_eq!(session.detected_dialect(), Some(ApiDialect::Classic));
    assert!(session.is_authenticated());
    assert_eq!(session.resolve_site_name("Office").as_deref(), Some("x7kq"));
}

#[tokio::test]
async fn test_detects_unifi_os_and_attaches_csrf() {
    let (server, session) = setup().await;
    mount_unifi_os(&server, "csrf-1").await;

    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/device"))
        .and(header("x-csrf-token", "csrf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    assert_eq!(session.detected_dialect(), Some(ApiDialect::UnifiOs));

    let devices = session.list_site_devices("default").await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_class(), Some(DeviceClass::AccessPoint));
}

#[tokio::test]
async fn test_detected_dialect_is_reused() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "unifises=abc123; Path=/"),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    session.authenticate().await.unwrap();
}

#[tokio::test]
async fn test_both_logins_rejected() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = session.authenticate().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(err.to_string().contains("unable to detect controller API dialect"));
    assert!(!session.is_authenticated());
    assert_eq!(session.detected_dialect(), None);
}

#[tokio::test]
async fn test_token_without_csrf_claim_fails() {
    let (server, session) = setup().await;
    let token = jwt(&json!({ "userId": "u1" }));

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("TOKEN={token}; Path=/").as_str()),
        )
        .mount(&server)
        .await;

    let err = session.authenticate().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "got: {err:?}");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_login_without_cookie_fails() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = session.authenticate().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Port 1 is reserved (tcpmux) and refuses connections on test hosts.
    let session = session_for("http://127.0.0.1:1");

    let err = session.authenticate().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network, "got: {err:?}");
}

#[tokio::test]
async fn test_site_list_failure_fails_authentication() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "unifises=a"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "meta": { "rc": "ok" }, "data": { "oops": 1 } })),
        )
        .mount(&server)
        .await;

    let err = session.authenticate().await.unwrap_err();
    assert!(err.to_string().contains("unexpected data structure"));
    assert!(!session.is_authenticated());
    assert!(session.site_map().is_empty());
}

// ── Re-authentication ───────────────────────────────────────────────

/// Classic controller whose first login answers at once and every later
/// login after `delay`.
async fn mount_classic_slow_relogin(server: &MockServer, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "unifises=first"))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "unifises=second")
                .set_delay(delay),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_request_during_reauthentication_keeps_working() {
    let server = MockServer::start().await;
    mount_classic_slow_relogin(&server, Duration::from_millis(300)).await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(session_for(&server.uri()));
    session.authenticate().await.unwrap();

    let relogin = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.authenticate().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let data = session.request(&device_list("default")).await.unwrap();
    assert_eq!(data[0]["_id"], "ap1");
    assert_eq!(session.resolve_site_name("Home").as_deref(), Some("default"));

    relogin.await.unwrap().unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_request_waits_for_first_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "unifises=abc123")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .and(header("cookie", "unifises=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(session_for(&server.uri()));
    let login = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.authenticate().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let data = session.request(&device_list("default")).await.unwrap();
    assert_eq!(data[0]["_id"], "ap1");
    login.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failed_reauthentication_discards_site_map() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "unifises=a"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    assert_eq!(session.site_map().len(), 4);

    let err = session.authenticate().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(!session.is_authenticated());
    assert!(session.site_map().is_empty());
    assert_eq!(session.resolve_site_name("Home"), None);
}

#[tokio::test]
async fn test_empty_site_list_clears_previous_sites() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "unifises=a"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" }, "data": [] })),
        )
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    assert_eq!(session.resolve_site_name("Home").as_deref(), Some("default"));

    session.authenticate().await.unwrap();
    assert!(session.is_authenticated());
    assert!(session.site_map().is_empty());
    assert_eq!(session.resolve_site_name("Home"), None);
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_without_session_makes_no_call() {
    let (server, session) = setup().await;

    let err = session.request(&device_list("default")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_classic_cookie_is_attached() {
    let (server, session) = setup().await;
    mount_classic(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .and(header("cookie", "unifises=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    let data = session.request(&device_list("default")).await.unwrap();
    assert_eq!(data[0]["_id"], "ap1");
}

#[tokio::test]
async fn test_persistent_401_reauthenticates_once() {
    let server = MockServer::start().await;
    let session = session_for(&server.uri());

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // Initial login plus exactly one re-authentication.
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "unifises=abc"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    let err = session.request(&device_list("default")).await.unwrap_err();

    assert!(err.is_session_expired(), "got: {err:?}");
    server.verify().await;
}

#[tokio::test]
async fn test_401_then_success_returns_retry_result() {
    let (server, session) = setup().await;
    mount_classic(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    let devices = session.list_site_devices("default").await.unwrap();
    assert_eq!(devices.len(), 1);
}

#[tokio::test]
async fn test_unifi_os_error_body_401_triggers_reauth() {
    let (server, session) = setup().await;
    mount_unifi_os(&server, "csrf-1").await;

    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/device"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "error": { "code": 401, "message": "Unauthorized" } })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    let devices = session.list_site_devices("default").await.unwrap();
    assert_eq!(devices[0].id.as_deref(), Some("ap1"));
}

#[tokio::test]
async fn test_csrf_token_rotates() {
    let (server, session) = setup().await;
    mount_unifi_os(&server, "csrf-1").await;

    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/device"))
        .and(header("x-csrf-token", "csrf-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-updated-csrf-token", "csrf-2")
                .set_body_json(device_envelope()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/device"))
        .and(header("x-csrf-token", "csrf-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    session.list_site_devices("default").await.unwrap();
    session.list_site_devices("default").await.unwrap();
}

#[tokio::test]
async fn test_controller_error_message_surfaces() {
    let (server, session) = setup().await;
    mount_classic(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/s/nowhere/stat/device"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "meta": { "rc": "error", "msg": "api.err.NoSiteContext" },
            "data": []
        })))
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    let err = session.list_site_devices("nowhere").await.unwrap_err();

    assert!(err.is_unknown_site(), "got: {err:?}");
    assert!(matches!(err, Error::Api { status: Some(400), .. }));
}

#[tokio::test]
async fn test_update_led_payload_per_class() {
    let (server, session) = setup().await;
    mount_classic(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/s/default/rest/device/ap1"))
        .and(body_partial_json(json!({ "led_override": "off" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/s/default/rest/device/gw1"))
        .and(body_partial_json(json!({ "ledSettings": { "enabled": true } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" } })))
        .expect(1)
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    session
        .update_led("default", "ap1", LedUpdate::new(DeviceClass::AccessPoint, false))
        .await
        .unwrap();
    session
        .update_led("default", "gw1", LedUpdate::new(DeviceClass::Gateway, true))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_device_by_mac_is_tagged_with_site() {
    let (server, session) = setup().await;
    mount_classic(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device/aa:bb:cc:dd:ee:ff"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_envelope()))
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    let device = session
        .get_device_by_mac("default", "AA:BB:CC:DD:EE:FF")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(device.site.as_deref(), Some("default"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let (server, session) = setup().await;
    mount_classic(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    session.authenticate().await.unwrap();
    session.logout().await;
    assert!(!session.is_authenticated());

    // A second logout is a no-op.
    session.logout().await;
}
