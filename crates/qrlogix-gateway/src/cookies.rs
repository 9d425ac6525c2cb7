//! Device cookie handling.
//!
//! Each phone gets a long-lived `device_id` cookie that ties its scans to a
//! truck. Values are opaque tokens; anything that does not look like one is
//! treated as absent.

use crate::domain::CookieConfig;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

const MAX_COOKIE_VALUE_LEN: usize = 64;

/// Reads and writes the device cookie.
#[derive(Debug, Clone)]
pub struct DeviceCookies {
    config: CookieConfig,
}

impl DeviceCookies {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Device cookie sent with the request, if any.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.config.name)
            .map(|(_, value)| value.trim().trim_matches('"'))
            .filter(|value| is_valid_value(value))
            .map(str::to_string)
    }

    /// `Set-Cookie` value for `value`.
    pub fn header_value(&self, value: &str) -> Option<HeaderValue> {
        if !is_valid_value(value) {
            return None;
        }
        let secure = if self.config.secure { "; Secure" } else { "" };
        let cookie = format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax{}",
            self.config.name,
            value,
            self.config.max_age_secs(),
            secure
        );
        HeaderValue::from_str(&cookie).ok()
    }

    /// Append a `Set-Cookie` for `value` to `headers`.
    pub fn write(&self, headers: &mut HeaderMap, value: &str) {
        if let Some(header) = self.header_value(value) {
            headers.append(SET_COOKIE, header);
        }
    }
}

fn is_valid_value(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_COOKIE_VALUE_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
