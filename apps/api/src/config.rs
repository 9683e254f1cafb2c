use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Which Record Store backend the server persists through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// One pretty-printed JSON file per collection under `DATA_DIR`.
    File,
    /// Process-local storage, lost on restart.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("STORE_BACKEND must be 'file' or 'memory', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every setting has a default; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub cors_origin: String,
    pub mapbox_token: Option<String>,
    pub geocode_country: String,
    pub geocode_confidence_threshold: f64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let threshold = env_or("GEOCODE_CONFIDENCE_THRESHOLD", "0.8")
            .parse::<f64>()
            .context("GEOCODE_CONFIDENCE_THRESHOLD must be a number")?;
        if !(0.0..=1.0).contains(&threshold) {
            bail!("GEOCODE_CONFIDENCE_THRESHOLD must be between 0 and 1, got {threshold}");
        }

        Ok(Config {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0"),
            port: env_or("PORT", "5000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            store_backend: env_or("STORE_BACKEND", "file").parse()?,
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:3001"),
            mapbox_token: std::env::var("MAPBOX_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            geocode_country: env_or("GEOCODE_COUNTRY", "gb"),
            geocode_confidence_threshold: threshold,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
