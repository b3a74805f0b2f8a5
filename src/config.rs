use chrono::Duration;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::AuthConfig;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// | Env Var                       | Default        |
/// |-------------------------------|----------------|
/// | `JWT_SECRET`                  | required       |
/// | `ACCESS_TOKEN_DURATION_SECS`  | `900`          |
/// | `REFRESH_TOKEN_DURATION_SECS` | `86400`        |
/// | `HTTP_SERVER_ADDRESS`         | `0.0.0.0:8080` |
/// | `DATABASE_URL`                | in-memory      |
/// | `DATABASE_MAX_CONNECTIONS`    | `2`            |
/// | `REQUEST_TIMEOUT_SECS`        | `30`           |
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub access_token_duration: Duration,
    pub refresh_token_duration: Duration,
    pub http_server_address: SocketAddr,
    /// Unset means the in-memory stores are used
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch the process env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let access_secs: i64 = parse_or(&lookup, "ACCESS_TOKEN_DURATION_SECS", 900)?;
        let refresh_secs: i64 = parse_or(&lookup, "REFRESH_TOKEN_DURATION_SECS", 86_400)?;

        Ok(Self {
            jwt_secret,
            access_token_duration: Duration::seconds(access_secs),
            refresh_token_duration: Duration::seconds(refresh_secs),
            http_server_address: parse_or(
                &lookup,
                "HTTP_SERVER_ADDRESS",
                SocketAddr::from(([0, 0, 0, 0], 8080)),
            )?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 2)?,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            access_token_duration: self.access_token_duration,
            refresh_token_duration: self.refresh_token_duration,
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
