//! Test fixtures: a router wired to an in-memory repository.

use axum::body::{to_bytes, Body, Bytes};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use qrlogix_gateway::{build_router, AppState, GatewayConfig, GatewayMetrics};
use qrlogix_tracking::{CheckinService, InMemoryRepository, ManualClock};
use std::sync::Arc;
use tower::ServiceExt;

pub const PLATE: &str = "HE2345";

/// 08:00 in Panama.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 25, 13, 0, 0).unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub checkin: Arc<CheckinService>,
    pub repo: Arc<InMemoryRepository>,
    pub clock: Arc<ManualClock>,
    pub metrics: Arc<GatewayMetrics>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let checkin = Arc::new(CheckinService::new(
            repo.clone(),
            clock.clone(),
            config.tracking(),
        ));
        let metrics = Arc::new(GatewayMetrics::new());
        let state = AppState::new(&config, Arc::clone(&checkin), Arc::clone(&metrics));

        Self {
            router: build_router(&config, state),
            checkin,
            repo,
            clock,
            metrics,
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, cookie, None).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> TestResponse {
        self.send(
            Method::POST,
            uri,
            cookie,
            Some(("application/x-www-form-urlencoded", body.to_string())),
        )
        .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
        cookie: Option<&str>,
    ) -> TestResponse {
        self.send(
            Method::POST,
            uri,
            cookie,
            Some(("application/json", body.to_string())),
        )
        .await
    }

    /// Scan with a typed plate and return the device cookie.
    pub async fn scan_with_plate(&self, punto: &str, plate: &str, cookie: Option<&str>) -> String {
        let response = self
            .post_form(&format!("/scan/{punto}"), &format!("placa={plate}"), cookie)
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.json());
        response.device_cookie().unwrap()
    }

    /// Scan from a device that already has an active session.
    pub async fn scan_with_cookie(&self, punto: &str, cookie: &str) -> serde_json::Value {
        let response = self.get(&format!("/scan/{punto}"), Some(cookie)).await;
        assert_eq!(response.status, StatusCode::OK);
        response.json()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<(&str, String)>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, format!("device_id={cookie}"));
        }
        let request = match body {
            Some((content_type, body)) => builder
                .header(CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// Value of the `device_id` cookie set by the response.
    pub fn device_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| *name == "device_id")
            .map(|(_, value)| value.to_string())
    }

    pub fn set_cookie_header(&self) -> Option<String> {
        self.headers
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
