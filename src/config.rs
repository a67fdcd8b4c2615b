//! Runtime configuration from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;
use tracing::info;

use crate::{MarketError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub nats_url: Option<String>,
    pub admin_student_number: Option<String>,
    pub admin_password: Option<String>,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(port = config.port, persistent = config.database_url.is_some(), events = config.nats_url.is_some(), "configuration loaded");
        Ok(config)
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = or("PORT", "3000").parse::<u16>()
            .map_err(|e| MarketError::Config(format!("Invalid PORT: {e}")))?;
        let database_max_connections = or("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()
            .map_err(|e| MarketError::Config(format!("Invalid DATABASE_MAX_CONNECTIONS: {e}")))?;
        let public_base_url = get("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            upload_dir: PathBuf::from(or("UPLOAD_DIR", "uploads")),
            public_base_url,
            nats_url: get("NATS_URL"),
            admin_student_number: get("ADMIN_STUDENT_NUMBER"),
            admin_password: get("ADMIN_PASSWORD"),
            cors_origin: get("CORS_ORIGIN"),
        })
    }

    /// Admin bootstrap credentials, only when both halves are set.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        Some((self.admin_student_number.as_deref()?, self.admin_password.as_deref()?))
    }
}
