//! Application Configuration Module
//!
//! Loads the interviewer service settings from environment variables (and
//! `.env.local` / `.env` files during local development) into a single struct.

use std::env;
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_INSTRUCTIONS_PATH: &str = "instructions.txt";

/// Credentials for the hosted room service.
#[derive(Debug, Clone)]
pub struct RoomServiceConfig {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` when the service runs without publishing room metadata.
    pub room_service: Option<RoomServiceConfig>,
    pub instructions_path: PathBuf,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid room service URL: {0}")]
    InvalidUrl(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `LIVEKIT_URL`: Room service URL (`wss://`, `ws://`, `https://` or `http://`). Required unless `dry_run`.
    // *   `LIVEKIT_API_KEY`: API key used as the access token issuer. Required unless `dry_run`.
    // *   `LIVEKIT_API_SECRET`: Secret used to sign access tokens. Required unless `dry_run`.
    // *   `INSTRUCTIONS_PATH`: (Optional) Agent instructions file. Defaults to "instructions.txt".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env(dry_run: bool) -> Result<Self, ConfigError> {
        // Local overrides first; dotenvy never overwrites variables that are already set.
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();

        Self::from_lookup(dry_run, |key| env::var(key).ok())
    }

    fn from_lookup(
        dry_run: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let instructions_path = lookup("INSTRUCTIONS_PATH")
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS_PATH.to_string())
            .into();

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let room_service = if dry_run {
            None
        } else {
            let required = |key: &str| {
                lookup(key)
                    .filter(|v| !v.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
            };
            let url = required("LIVEKIT_URL")?;
            if !["wss://", "ws://", "https://", "http://"]
                .iter()
                .any(|scheme| url.starts_with(scheme))
            {
                return Err(ConfigError::InvalidUrl(url));
            }
            Some(RoomServiceConfig {
                url,
                api_key: required("LIVEKIT_API_KEY")?,
                api_secret: required("LIVEKIT_API_SECRET")?,
            })
        };

        Ok(Self {
            room_service,
            instructions_path,
            log_level,
        })
    }
}
