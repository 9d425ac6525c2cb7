//! Gateway configuration with validation.

use qrlogix_tracking::TrackingConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Application identity
    pub app: AppConfig,
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Session and cycle tunables
    pub session: SessionConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Device cookie configuration
    pub cookie: CookieConfig,
    /// Security configuration
    pub security: SecurityConfig,
}

impl GatewayConfig {
    /// Load configuration from environment variables over the defaults.
    ///
    /// # Environment Variables
    ///
    /// - `QRLOGIX_HOST`: Bind address (default: 0.0.0.0)
    /// - `QRLOGIX_PORT`: Port (default: 8000)
    /// - `SESSION_DURATION_MINUTES`: Session lifetime (default: 60)
    /// - `REUSE_WINDOW_MINUTES`: Cross-device reuse window (default: 60)
    /// - `APP_NAME`: Service name in health checks (default: QRLogix)
    /// - `DEBUG`: Debug mode (default: false)
    /// - `QRLOGIX_ENFORCE_PLATE_WHITELIST`: Only authorized plates may scan (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = env_var("QRLOGIX_HOST") {
            config.http.host = host
                .parse()
                .map_err(|_| ConfigError::InvalidValue("QRLOGIX_HOST", host))?;
        }
        if let Some(port) = env_var("QRLOGIX_PORT") {
            config.http.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("QRLOGIX_PORT", port))?;
        }
        if let Some(minutes) = env_var("SESSION_DURATION_MINUTES") {
            config.session.session_duration_minutes = minutes
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SESSION_DURATION_MINUTES", minutes))?;
        }
        if let Some(minutes) = env_var("REUSE_WINDOW_MINUTES") {
            config.session.reuse_window_minutes = minutes
                .parse()
                .map_err(|_| ConfigError::InvalidValue("REUSE_WINDOW_MINUTES", minutes))?;
        }
        if let Some(name) = env_var("APP_NAME") {
            config.app.name = name;
        }
        if let Some(debug) = env_var("DEBUG") {
            config.app.debug = parse_bool(&debug)
                .ok_or(ConfigError::InvalidValue("DEBUG", debug))?;
        }
        if let Some(enforce) = env_var("QRLOGIX_ENFORCE_PLATE_WHITELIST") {
            config.security.enforce_plate_whitelist = parse_bool(&enforce)
                .ok_or(ConfigError::InvalidValue("QRLOGIX_ENFORCE_PLATE_WHITELIST", enforce))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.session_duration_minutes == 0 {
            return Err(ConfigError::InvalidDuration(
                "session duration cannot be 0".into(),
            ));
        }

        if self.session.reuse_window_minutes > self.session.session_duration_minutes {
            return Err(ConfigError::InvalidDuration(
                "reuse window cannot exceed the session duration".into(),
            ));
        }

        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidDuration(
                "request timeout cannot be 0".into(),
            ));
        }

        if self.cookie.name.is_empty() || self.cookie.name.contains([';', '=', ' ']) {
            return Err(ConfigError::Invalid(format!(
                "invalid cookie name: {:?}",
                self.cookie.name
            )));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Tunables handed to the check-in service.
    pub fn tracking(&self) -> TrackingConfig {
        TrackingConfig {
            session_duration: chrono::Duration::minutes(self.session.session_duration_minutes as i64),
            reuse_window: chrono::Duration::minutes(self.session.reuse_window_minutes as i64),
            enforce_plate_whitelist: self.security.enforce_plate_whitelist,
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Application identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Service name reported by `/health`
    pub name: String,
    /// Debug mode: verbose logging unless a level is set explicitly
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "QRLogix".to_string(),
            debug: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8000)
    pub port: u16,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8000,
            request_timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of a new session
    pub session_duration_minutes: u32,
    /// How recent another device's cycle must be for a plate to take it over
    pub reuse_window_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_duration_minutes: 60,
            reuse_window_minutes: 60,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers ("*" for all)
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
    /// Allow credentials (ignored with a wildcard origin)
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["*".to_string()],
            max_age: 86400, // 24 hours
            allow_credentials: false,
        }
    }
}

/// Device cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name
    pub name: String,
    /// Lifetime in days
    pub max_age_days: u32,
    /// Add the `Secure` attribute (HTTPS deployments)
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "device_id".to_string(),
            max_age_days: 365,
            secure: false,
        }
    }
}

impl CookieConfig {
    pub fn max_age_secs(&self) -> u64 {
        u64::from(self.max_age_days) * 24 * 60 * 60
    }
}

/// Security configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Reject scans from plates missing in the authorized list
    pub enforce_plate_whitelist: bool,
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable could not be parsed
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
    /// Invalid duration or timeout
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
