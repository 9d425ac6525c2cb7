//! # Scan Flow
//!
//! A truck enters, waits, loads and leaves; every step is a QR scan from
//! the driver's phone.

use super::support::{TestApp, PLATE};
use axum::http::StatusCode;
use qrlogix_gateway::{messages, GatewayConfig};

fn state_of(body: &serde_json::Value, punto: &str) -> String {
    body["states"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["checkpoint"] == punto)
        .map(|s| s["state"].as_str().unwrap().to_string())
        .unwrap()
}

#[tokio::test]
async fn health_reports_service_name() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        serde_json::json!({"status": "ok", "service": "QRLogix"})
    );
}

#[tokio::test]
async fn unknown_checkpoint_is_not_found() {
    let app = TestApp::new();

    let response = app.get("/scan/punto9", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["data"]["punto"], "punto9");

    let response = app.post_form("/scan/punto9", "placa=HE2345", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.repo.truck_count(), 0);
}

#[tokio::test]
async fn new_device_is_asked_for_plate() {
    let app = TestApp::new();
    let response = app.get("/scan/punto1", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "plate_required");
    assert_eq!(body["punto"], "punto1");
    assert!(response.device_cookie().is_none());
    assert_eq!(app.repo.scan_count(), 0);
}

#[tokio::test]
async fn first_scan_sets_device_cookie() {
    let app = TestApp::new();
    let response = app.post_form("/scan/punto1", "placa=he2345", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.device_cookie().unwrap();
    assert_eq!(cookie.len(), 32);
    assert!(cookie.chars().all(|c| c.is_ascii_hexdigit()));

    let header = response.set_cookie_header().unwrap();
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("SameSite=Lax"));
    assert!(header.contains("Max-Age=31536000"));

    let body = response.json();
    assert_eq!(body["plate"], PLATE);
    assert_eq!(body["checkpoint"], "punto1");
    assert_eq!(body["cycle"], "open");
    assert_eq!(body["reused"], false);
    assert_eq!(body["time"], "8:00:00 AM");
    assert!(body["reminder"]["title"].is_string());
}

#[tokio::test]
async fn json_body_is_accepted() {
    let app = TestApp::new();
    let response = app
        .post_json("/scan/punto1", serde_json::json!({"placa": PLATE}), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["plate"], PLATE);
}

#[tokio::test]
async fn missing_plate_is_rejected() {
    let app = TestApp::new();
    let response = app.post_form("/scan/punto1", "placa=", None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], messages::PLATE_REQUIRED);
    assert_eq!(app.repo.truck_count(), 0);
}

#[tokio::test]
async fn known_device_scans_without_plate() {
    let app = TestApp::new();
    let cookie = app.scan_with_plate("punto1", PLATE, None).await;

    app.advance_minutes(5);
    let body = app.scan_with_cookie("punto2", &cookie).await;

    assert_eq!(body["plate"], PLATE);
    assert_eq!(body["checkpoint"], "punto2");
    assert_eq!(state_of(&body, "punto1"), "completed");
    assert_eq!(state_of(&body, "punto2"), "completed");
    assert_eq!(state_of(&body, "punto3"), "pending");
    assert_eq!(app.repo.cycle_count(), 1);
}

#[tokio::test]
async fn full_cycle_completes() {
    let app = TestApp::new();
    let cookie = app.scan_with_plate("punto1", PLATE, None).await;

    for punto in ["punto2", "punto3"] {
        app.advance_minutes(10);
        let body = app.scan_with_cookie(punto, &cookie).await;
        assert_eq!(body["cycle"], "open");
    }

    app.advance_minutes(10);
    let body = app.scan_with_cookie("punto4", &cookie).await;
    assert_eq!(body["cycle"], "completed");

    let summary = app.get("/tablero", None).await.json();
    assert_eq!(summary["open_cycles"], 0);
    assert_eq!(summary["completed_today"], 1);
    assert_eq!(summary["active_sessions"], 0);

    // Exit ended the session; the next lap needs the plate again
    app.advance_minutes(5);
    let response = app.get("/scan/punto1", Some(&cookie)).await;
    assert_eq!(response.json()["status"], "plate_required");
}

#[tokio::test]
async fn exit_without_loading_discards_cycle() {
    let app = TestApp::new();
    let cookie = app.scan_with_plate("punto1", PLATE, None).await;

    app.advance_minutes(15);
    let body = app.scan_with_cookie("punto4", &cookie).await;

    assert_eq!(body["cycle"], "discarded");
    assert_eq!(state_of(&body, "punto3"), "skipped");
    assert_eq!(app.repo.cycle_count(), 0);

    let cycles = app.get("/ciclos", None).await.json();
    assert_eq!(cycles["total"], 0);
}

#[tokio::test]
async fn repeated_scan_keeps_first_time() {
    let app = TestApp::new();
    let cookie = app.scan_with_plate("punto1", PLATE, None).await;

    app.advance_minutes(3);
    let body = app.scan_with_cookie("punto1", &cookie).await;

    assert_eq!(body["time"], "8:00:00 AM");
    assert_eq!(app.repo.scan_count(), 1);
}

#[tokio::test]
async fn second_phone_takes_over_open_cycle() {
    let app = TestApp::new();
    let first = app.scan_with_plate("punto1", PLATE, None).await;

    app.advance_minutes(10);
    let response = app.post_form("/scan/punto2", "placa=HE2345", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.device_cookie().as_deref(), Some(first.as_str()));
    let body = response.json();
    assert_eq!(body["reused"], true);
    assert_eq!(state_of(&body, "punto1"), "completed");
    assert_eq!(app.repo.cycle_count(), 1);
}

#[tokio::test]
async fn expired_session_asks_for_plate_again() {
    let app = TestApp::new();
    let cookie = app.scan_with_plate("punto1", PLATE, None).await;

    app.advance_minutes(61);
    let response = app.get("/scan/punto2", Some(&cookie)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "plate_required");
}

#[tokio::test]
async fn whitelist_blocks_unknown_plates() {
    let mut config = GatewayConfig::default();
    config.security.enforce_plate_whitelist = true;
    let app = TestApp::with_config(config);

    let response = app.post_form("/scan/punto1", "placa=ZZ0001", None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"], messages::PLATE_NOT_AUTHORIZED);

    app.checkin.authorize_plate("ZZ0001").await.unwrap();
    let response = app.post_form("/scan/punto1", "placa=ZZ0001", None).await;
    assert_eq!(response.status, StatusCode::OK);
}
