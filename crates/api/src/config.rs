//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// API server configuration.
///
/// The model gateway and WeChat have their own settings
/// (`GatewayConfig`, `WechatConfig`, `CoachConfig`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Lifetime of a WeChat QR login attempt.
    pub login_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `COACH_API_ADDR` | Server bind address | `127.0.0.1:8787` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:coach.db?mode=rwc` |
    /// | `WECHAT_LOGIN_TTL_SECS` | QR login attempt lifetime | `300` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("COACH_API_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8787".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "sqlite:coach.db?mode=rwc".to_string());

        let login_ttl_secs = match env::var("WECHAT_LOGIN_TTL_SECS") {
            Ok(value) => value
                .parse()
                .ok()
                .filter(|ttl: &i64| *ttl > 0)
                .ok_or(ConfigError::InvalidLoginTtl)?,
            Err(_) => 300,
        };

        Ok(Self {
            addr,
            database_url,
            login_ttl_secs,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid COACH_API_ADDR format")]
    InvalidAddr,

    #[error("WECHAT_LOGIN_TTL_SECS must be a positive number of seconds")]
    InvalidLoginTtl,
}
