//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ACCESS_KEY_TOKEN` - token signing secret
//! - `MONGODB_URI`, or all of `DB_USER`, `DB_PASS` and `DB_HOST`
//!
//! ## Optional
//! - `HOST` - bind address (default: 0.0.0.0)
//! - `PORT` - listen port (default: 4000)
//! - `DB_NAME` - database name (default: gadgetShop)
//! - `CORS_ORIGINS` - comma-separated allowed origins (default: http://localhost:5173)
//! - `PAGE_SIZE` - default product page size (default: 10)

use std::{fmt, net::IpAddr, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Connection string; may embed credentials.
    pub mongodb_uri: String,
    pub db_name: String,
    pub token_secret: String,
    pub cors_origins: Vec<String>,
    pub page_size: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mongodb_uri", &"[REDACTED]")
            .field("db_name", &self.db_name)
            .field("token_secret", &"[REDACTED]")
            .field("cors_origins", &self.cors_origins)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Config {
    /// Reads the process environment. `main` loads `.env` beforehand.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| var(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let mongodb_uri = match var("MONGODB_URI") {
            Some(uri) => uri,
            None => format!(
                "mongodb+srv://{}:{}@{}/?retryWrites=true&w=majority",
                required("DB_USER")?,
                required("DB_PASS")?,
                required("DB_HOST")?
            ),
        };

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host: parse_or(&var, "HOST", "0.0.0.0")?,
            port: parse_or(&var, "PORT", "4000")?,
            mongodb_uri,
            db_name: var("DB_NAME").unwrap_or_else(|| "gadgetShop".to_string()),
            token_secret: required("ACCESS_KEY_TOKEN")?,
            cors_origins,
            page_size: parse_or(&var, "PAGE_SIZE", "10")?,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
