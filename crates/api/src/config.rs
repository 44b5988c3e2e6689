//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use thiserror::Error;

use adportal_core::UserId;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub bind: SocketAddr,
    pub token_ttl_minutes: i64,
    /// Username the monitoring scraper logs in with.
    pub prometheus_login: String,
    /// Accounts of clients at or above this id are exported to monitoring.
    pub whalesmedia_user_id: UserId,
    pub admin: Option<AdminBootstrap>,
    pub database_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            token_ttl_minutes: 720,
            prometheus_login: "prometheus".to_string(),
            whalesmedia_user_id: UserId::new(888),
            admin: None,
            database_url: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => config.jwt_secret = secret,
            None => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }
        if let Some(bind) = lookup("PORTAL_BIND") {
            config.bind = parse("PORTAL_BIND", &bind)?;
        }
        if let Some(ttl) = lookup("PORTAL_TOKEN_TTL_MINUTES") {
            config.token_ttl_minutes = parse("PORTAL_TOKEN_TTL_MINUTES", &ttl)?;
            if config.token_ttl_minutes <= 0 {
                return Err(ConfigError::Invalid {
                    var: "PORTAL_TOKEN_TTL_MINUTES",
                    reason: "must be positive".to_string(),
                });
            }
        }
        if let Some(login) = lookup("PROMETHEUS_API_LOGIN") {
            config.prometheus_login = login;
        }
        if let Some(id) = lookup("WHALESMEDIA_USER_ID") {
            config.whalesmedia_user_id = parse("WHALESMEDIA_USER_ID", &id)?;
        }
        config.admin = match (lookup("PORTAL_ADMIN_USERNAME"), lookup("PORTAL_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("PORTAL_ADMIN_USERNAME and PORTAL_ADMIN_PASSWORD must be set together; skipping bootstrap");
                None
            }
            (None, None) => None,
        };
        config.database_url = lookup("DATABASE_URL");

        Ok(config)
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
