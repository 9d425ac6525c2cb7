//! # Supervision
//!
//! The cycle board, supervisor close/delete actions, the dashboard and the
//! gateway counters.

use super::support::{TestApp, PLATE};
use axum::http::StatusCode;
use qrlogix_gateway::messages;
use qrlogix_tracking::AuditAction;

#[tokio::test]
async fn open_cycles_are_listed_oldest_first() {
    let app = TestApp::new();
    app.scan_with_plate("punto1", "AB1111", None).await;
    app.advance_minutes(5);
    let cookie = app.scan_with_plate("punto1", "CD2222", None).await;
    app.advance_minutes(7);
    app.scan_with_cookie("punto2", &cookie).await;

    let response = app.get("/ciclos", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["total"], 2);
    let ciclos = body["ciclos"].as_array().unwrap();
    assert_eq!(ciclos[0]["plate"], "AB1111");
    assert_eq!(ciclos[1]["plate"], "CD2222");
    assert_eq!(
        ciclos[1]["checkpoints"],
        serde_json::json!(["punto1", "punto2"])
    );
    assert_eq!(ciclos[1]["minutes_elapsed"], 7.0);
}

#[tokio::test]
async fn supervisor_closes_cycle() {
    let app = TestApp::new();
    app.scan_with_plate("punto1", PLATE, None).await;

    let response = app
        .post_json(
            "/ciclos/accion",
            serde_json::json!({
                "placa": PLATE,
                "accion": "cerrar",
                "motivo": "Salida sin escanear",
                "detalles": "{\"nota\": \"portón\"}",
                "registrado_por": "supervisor1",
            }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        serde_json::json!({"success": true, "msg": "Ciclo cerrado correctamente."})
    );

    let audit = app.checkin.audit_trail(PLATE).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::Closed);
    assert_eq!(audit[0].recorded_by, "supervisor1");
    assert_eq!(audit[0].details, serde_json::json!({"nota": "portón"}));

    let summary = app.get("/tablero", None).await.json();
    assert_eq!(summary["open_cycles"], 0);
    assert_eq!(summary["completed_today"], 1);

    let response = app
        .post_json(
            "/ciclos/accion",
            serde_json::json!({"placa": PLATE, "accion": "cerrar"}),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], messages::OPEN_CYCLE_NOT_FOUND);
}

#[tokio::test]
async fn supervisor_deletes_cycle() {
    let app = TestApp::new();
    app.scan_with_plate("punto1", PLATE, None).await;

    let response = app
        .post_json(
            "/ciclos/accion",
            serde_json::json!({"placa": PLATE, "accion": "eliminar", "motivo": "Prueba"}),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["msg"], "Ciclo eliminado correctamente.");
    assert_eq!(app.repo.cycle_count(), 0);
    assert_eq!(app.repo.scan_count(), 0);

    let audit = app.checkin.audit_trail(PLATE).await.unwrap();
    assert_eq!(audit[0].action, AuditAction::Deleted);
    assert_eq!(audit[0].details, serde_json::json!({}));
}

#[tokio::test]
async fn action_errors() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/ciclos/accion",
            serde_json::json!({"placa": "XX9999", "accion": "cerrar"}),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], messages::SESSION_NOT_FOUND);

    // Plate lookup comes before the action check
    let response = app
        .post_json(
            "/ciclos/accion",
            serde_json::json!({"placa": PLATE, "accion": "archivar"}),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], messages::SESSION_NOT_FOUND);

    app.scan_with_plate("punto1", PLATE, None).await;
    let response = app
        .post_json(
            "/ciclos/accion",
            serde_json::json!({"placa": PLATE, "accion": "archivar"}),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], messages::INVALID_ACTION);
    assert_eq!(app.repo.cycle_count(), 1);
}

#[tokio::test]
async fn malformed_action_bodies_get_json_errors() {
    let app = TestApp::new();
    app.scan_with_plate("punto1", PLATE, None).await;

    let response = app
        .post_json("/ciclos/accion", serde_json::json!({"accion": "cerrar"}), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], messages::SESSION_NOT_FOUND);

    let response = app
        .post_json("/ciclos/accion", serde_json::json!({"placa": PLATE}), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], messages::INVALID_ACTION);

    let response = app
        .post_json(
            "/ciclos/accion",
            serde_json::json!({"placa": 2345, "accion": "cerrar"}),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());

    let response = app
        .post_form("/ciclos/accion", "placa=HE2345&accion=cerrar", None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());

    assert_eq!(app.repo.cycle_count(), 1);
    assert_eq!(app.get("/tablero", None).await.json()["open_cycles"], 1);
}

#[tokio::test]
async fn dashboard_counts_active_sessions() {
    let app = TestApp::new();
    app.scan_with_plate("punto1", "AB1111", None).await;
    app.scan_with_plate("punto1", "CD2222", None).await;

    let summary = app.get("/tablero", None).await.json();
    assert_eq!(summary["open_cycles"], 2);
    assert_eq!(summary["active_sessions"], 2);
    assert_eq!(summary["completed_today"], 0);

    app.advance_minutes(90);
    let summary = app.get("/tablero", None).await.json();
    assert_eq!(summary["active_sessions"], 0);
}

#[tokio::test]
async fn metrics_track_checkins() {
    let app = TestApp::new();
    let cookie = app.scan_with_plate("punto1", PLATE, None).await;
    app.scan_with_cookie("punto4", &cookie).await;
    app.get("/scan/punto9", None).await;

    let metrics = app.get("/metrics", None).await.json();
    assert_eq!(metrics["checkins"]["scans"], 2);
    assert_eq!(metrics["checkins"]["cycles_discarded"], 1);
    assert_eq!(metrics["checkins"]["cycles_completed"], 0);
    assert_eq!(metrics["requests"]["error"], 0);
    assert!(metrics["requests"]["total"].as_u64().unwrap() >= 3);
}
