use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::telemetry::LogFormat;

const DEVELOPMENT_JWT_SECRET: &str = "iniastra-development-secret";
const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,https://university-platform-seven.vercel.app";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let database = DatabaseConfig {
            uri: env::var("MONGO_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: env::var("MONGO_DATABASE").unwrap_or_else(|_| "iniastra".to_string()),
            server_selection_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.is_production() => return Err(ConfigError::MissingJwtSecret),
            _ => DEVELOPMENT_JWT_SECRET.to_string(),
        };
        let raw_ttl = env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "7d".to_string());
        let token_ttl = parse_duration(&raw_ttl).ok_or(ConfigError::InvalidDuration {
            variable: "JWT_EXPIRES_IN",
            value: raw_ttl.clone(),
        })?;

        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let rate_limit_max = parse_number("RATE_LIMIT_MAX", 100)?;
        let rate_limit_window = Duration::from_secs(parse_number("RATE_LIMIT_WINDOW_SECS", 900)?);
        let trust_proxy = parse_flag("TRUST_PROXY");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            database,
            auth: AuthConfig {
                jwt_secret,
                token_ttl,
                expose_reset_token: !environment.is_production(),
            },
            http: HttpConfig {
                allowed_origins,
                rate_limit_max: rate_limit_max as u32,
                rate_limit_window,
                trust_proxy,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// MongoDB connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub database: String,
    pub server_selection_timeout: Duration,
    pub connect_timeout: Duration,
}

/// Token signing and password reset behavior.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// Echo raw reset tokens in the forgot-password response (never in production).
    pub expose_reset_token: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("expose_reset_token", &self.expose_reset_token)
            .finish()
    }
}

/// Edge concerns applied to the `/api` surface.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub allowed_origins: Vec<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    /// Key clients on the first `X-Forwarded-For` hop instead of the peer address.
    pub trust_proxy: bool,
}

fn parse_number(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { variable, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(variable: &'static str) -> bool {
    env::var(variable)
        .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Parses `7d`, `12h`, `30m`, `45s`, or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (digits, multiplier) = match trimmed.chars().last()? {
        'd' => (&trimmed[..trimmed.len() - 1], 86_400),
        'h' => (&trimmed[..trimmed.len() - 1], 3_600),
        'm' => (&trimmed[..trimmed.len() - 1], 60),
        's' => (&trimmed[..trimmed.len() - 1], 1),
        _ => (trimmed, 1),
    };

    let value = digits.trim().parse::<u64>().ok()?;
    if value == 0 {
        return None;
    }
    value.checked_mul(multiplier).map(Duration::from_secs)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingJwtSecret,
    InvalidDuration { variable: &'static str, value: String },
    InvalidNumber { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingJwtSecret => {
                write!(f, "JWT_SECRET must be set when APP_ENV=production")
            }
            ConfigError::InvalidDuration { variable, value } => {
                write!(f, "{variable} must look like 7d, 12h, 30m or 45s (found '{value}')")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a positive integer (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
