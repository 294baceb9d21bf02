//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - HMAC key for session tokens (min 32 chars)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `JWT_TTL_HOURS` - Token lifetime (default: 168)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `CORS_ORIGIN` - Allowed frontend origin; permissive when unset
//! - `COOKIE_SECURE` - Mark the auth cookie `Secure` (default: false)
//! - `ADMIN_PASSWORD` - Enables the simple admin password guard
//! - `NATS_URL` - Publish domain events to NATS
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat { #[default] Text, Json }

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: SecretString,
    pub jwt_ttl_hours: i64,
    pub db_max_connections: u32,
    pub cors_origin: Option<String>,
    pub cookie_secure: bool,
    pub admin_password: Option<SecretString>,
    pub nats_url: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, so tests don't have to touch the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| get(key).filter(|v| !v.is_empty()).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidEnvVar("JWT_SECRET".into(), format!("must be at least {MIN_JWT_SECRET_LENGTH} characters")));
        }

        Ok(Self {
            database_url: SecretString::from(required("DATABASE_URL")?),
            host: parse_or(&get, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&get, "PORT", 5000)?,
            jwt_secret: SecretString::from(jwt_secret),
            jwt_ttl_hours: parse_or(&get, "JWT_TTL_HOURS", 168)?,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            cors_origin: get("CORS_ORIGIN").filter(|v| !v.is_empty()),
            cookie_secure: parse_or(&get, "COOKIE_SECURE", false)?,
            admin_password: get("ADMIN_PASSWORD").filter(|v| !v.is_empty()).map(SecretString::from),
            nats_url: get("NATS_URL").filter(|v| !v.is_empty()),
            log_format: match get("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }

    pub fn jwt_secret_bytes(&self) -> &[u8] { self.jwt_secret.expose_secret().as_bytes() }
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match get(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
