use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// How often the server pings each connection
    pub heartbeat_interval: Duration,
    /// Connections silent for longer than this are closed
    pub client_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            client_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` selects the in-memory store
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub client_origin: String,
    pub revocation_sweep_interval: Duration,
    pub websocket: WebSocketConfig,
}

impl Config {
    fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
        match env::var(key) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw}"))),
            Err(_) => Ok(default),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Config("JWT_SECRET missing".into()))?;
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let client_origin =
            env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let port = Self::parsed("PORT", 5100u16)?;
        let ttl_hours = Self::parsed("JWT_TTL_HOURS", 168i64)?;
        if ttl_hours <= 0 {
            return Err(AppError::Config("JWT_TTL_HOURS must be positive".into()));
        }
        let sweep_secs = Self::parsed("REVOCATION_SWEEP_SECS", 60u64)?.max(1);
        let heartbeat_secs = Self::parsed("WS_HEARTBEAT_SECS", 5u64)?.max(1);
        let timeout_secs = Self::parsed("WS_CLIENT_TIMEOUT_SECS", 30u64)?;
        if timeout_secs <= heartbeat_secs {
            return Err(AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must exceed WS_HEARTBEAT_SECS".into(),
            ));
        }

        Ok(Self {
            port,
            database_url,
            jwt_secret,
            jwt_ttl: chrono::Duration::hours(ttl_hours),
            client_origin,
            revocation_sweep_interval: Duration::from_secs(sweep_secs),
            websocket: WebSocketConfig {
                heartbeat_interval: Duration::from_secs(heartbeat_secs),
                client_timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}
