//! # Device Registration
//!
//! Linking a phone to an authorized plate.

use super::support::{TestApp, PLATE};
use axum::http::StatusCode;
use qrlogix_gateway::messages;

#[tokio::test]
async fn unauthorized_plate_is_forbidden() {
    let app = TestApp::new();
    let response = app
        .post_form("/registro_dispositivo", "placa=HE2345", None)
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"], messages::PLATE_NOT_AUTHORIZED);
    assert!(response.device_cookie().is_none());
}

#[tokio::test]
async fn authorized_plate_redirects_and_sets_cookie() {
    let app = TestApp::new();
    app.checkin.authorize_plate(PLATE).await.unwrap();

    let response = app
        .post_form("/registro_dispositivo", "placa=he2345", None)
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/registro_ok?placa=HE2345"));
    let cookie = response.device_cookie().unwrap();
    assert!(app
        .checkin
        .is_device_registered(&cookie, PLATE)
        .await
        .unwrap());

    let ok = app.get("/registro_ok?placa=HE2345", None).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(
        ok.json(),
        serde_json::json!({"registered": true, "placa": PLATE})
    );
}

#[tokio::test]
async fn existing_cookie_is_kept() {
    let app = TestApp::new();
    app.checkin.authorize_plate(PLATE).await.unwrap();
    let cookie = "0af7651916cd43dd8448eb211c80319c";

    for _ in 0..2 {
        let response = app
            .post_form("/registro_dispositivo", "placa=HE2345", Some(cookie))
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert!(response.device_cookie().is_none());
    }

    assert!(app
        .checkin
        .is_device_registered(cookie, PLATE)
        .await
        .unwrap());
}
