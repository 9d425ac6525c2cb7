//! # Report Download

use super::support::{TestApp, PLATE};
use axum::http::StatusCode;
use qrlogix_gateway::messages;
use qrlogix_tracking::XLSX_CONTENT_TYPE;

#[tokio::test]
async fn bad_dates_are_rejected() {
    let app = TestApp::new();

    for uri in [
        "/descargar_informe",
        "/descargar_informe?fechaInicio=2025-10-01",
        "/descargar_informe?fechaInicio=01-10-2025&fechaFin=2025-10-31",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response.json()["error"], messages::INVALID_DATES);
    }
}

#[tokio::test]
async fn reversed_range_is_rejected() {
    let app = TestApp::new();
    let response = app
        .get(
            "/descargar_informe?fechaInicio=2025-10-31&fechaFin=2025-10-01",
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_downloads_as_xlsx() {
    let app = TestApp::new();
    let cookie = app.scan_with_plate("punto1", PLATE, None).await;
    app.advance_minutes(20);
    app.scan_with_cookie("punto3", &cookie).await;
    app.advance_minutes(10);
    app.scan_with_cookie("punto4", &cookie).await;

    let response = app
        .get(
            "/descargar_informe?fechaInicio=2025-10-25&fechaFin=2025-10-25",
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some(XLSX_CONTENT_TYPE));
    assert_eq!(
        response.header("content-disposition"),
        Some("attachment; filename=informe_qrlogix_2025-10-25_a_2025-10-25.xlsx")
    );
    assert!(response.body.starts_with(b"PK"));

    let report = app
        .checkin
        .cycle_report(
            chrono::NaiveDate::from_ymd_opt(2025, 10, 25).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 10, 25).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(report.rows.len(), 1);
}
