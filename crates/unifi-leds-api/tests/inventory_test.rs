#![allow(clippy::unwrap_used)]
// Integration tests for the multi-site inventory fetcher.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unifi_leds_api::{ErrorKind, Session, fetch_devices, get_access_point};

// ── Helpers ─────────────────────────────────────────────────────────

/// Start a classic controller and return an authenticated session.
async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "unifises=abc"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "ok" },
            "data": [
                { "name": "site1", "desc": "Main" },
                { "name": "site2", "desc": "Annex" }
            ]
        })))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "hunter2".to_string().into();
    let session = Session::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        "admin",
        secret,
    );
    session.authenticate().await.unwrap();
    (server, session)
}

async fn mount_devices(server: &MockServer, site: &str, devices: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/s/{site}/stat/device")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "meta": { "rc": "ok" }, "data": devices })),
        )
        .mount(server)
        .await;
}

fn sites(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_site_is_skipped() {
    let (server, session) = setup().await;

    mount_devices(
        &server,
        "site1",
        json!([
            { "_id": "ap1", "type": "uap", "model": "U6LR" },
            { "_id": "ap2", "type": "uap", "model": "U7PRO" }
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/s/site2/stat/device"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let devices = fetch_devices(&session, &sites(&["site1", "site2"])).await.unwrap();

    let mut tagged: Vec<_> = devices
        .iter()
        .map(|d| (d.id.clone().unwrap(), d.site.clone().unwrap()))
        .collect();
    tagged.sort();
    assert_eq!(
        tagged,
        vec![
            ("ap1".to_string(), "site1".to_string()),
            ("ap2".to_string(), "site1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_only_led_capable_devices_are_kept() {
    let (server, session) = setup().await;

    mount_devices(
        &server,
        "site1",
        json!([
            { "_id": "ap1", "type": "uap", "model": "U6LR" },
            { "_id": "sw1", "type": "usw", "model": "US24" },
            { "_id": "gw1", "type": "udm", "model": "UDR" },
            { "_id": "gw2", "type": "udm", "model": "UDMPRO" }
        ]),
    )
    .await;

    let devices = fetch_devices(&session, &sites(&["site1"])).await.unwrap();

    let mut ids: Vec<_> = devices.iter().filter_map(|d| d.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["ap1".to_string(), "gw1".to_string()]);
}

#[tokio::test]
async fn test_unknown_site_does_not_abort_siblings() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/s/site1/stat/device"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "meta": { "rc": "error", "msg": "api.err.NoSiteContext" }
        })))
        .mount(&server)
        .await;
    mount_devices(&server, "site2", json!([{ "_id": "ap9", "type": "uap" }])).await;

    let devices = fetch_devices(&session, &sites(&["site1", "site2"])).await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].site.as_deref(), Some("site2"));
}

#[tokio::test]
async fn test_empty_aggregate_is_an_error() {
    let (server, session) = setup().await;

    mount_devices(&server, "site1", json!([{ "_id": "sw1", "type": "usw" }])).await;
    Mock::given(method("GET"))
        .and(path("/api/s/site2/stat/device"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = fetch_devices(&session, &sites(&["site1", "site2"]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(err.to_string().contains("no devices obtained from any site"));
}

#[tokio::test]
async fn test_get_access_point_by_id() {
    let (server, session) = setup().await;

    mount_devices(
        &server,
        "site1",
        json!([
            { "_id": "ap1", "type": "uap" },
            { "_id": "ap2", "type": "uap" }
        ]),
    )
    .await;

    let found = get_access_point(&session, "ap2", &sites(&["site1"])).await.unwrap();
    assert_eq!(found.and_then(|d| d.id).as_deref(), Some("ap2"));

    let missing = get_access_point(&session, "nope", &sites(&["site1"])).await.unwrap();
    assert!(missing.is_none());
}
