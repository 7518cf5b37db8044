//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// When absent, stories and users live in process memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub story_model: String,
    pub image_model: String,
    pub image_size: String,
    pub tts_voice: String,
    /// Origin used to build public share links.
    pub public_base_url: String,
    pub cors_origin: String,
    pub illustrate_on_create: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            log_level: Level::INFO,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            story_model: "gpt-4.1-nano".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            tts_voice: "alloy".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
            illustrate_on_create: false,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Load Server and Database Settings ---
        let bind_address = match lookup("BIND_ADDRESS") {
            Some(value) => value.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            None => defaults.bind_address,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_level = match lookup("RUST_LOG") {
            Some(value) => value.parse::<Level>().map_err(|_| {
                ConfigError::InvalidValue(
                    "RUST_LOG".to_string(),
                    format!("'{}' is not a valid log level", value),
                )
            })?,
            None => defaults.log_level,
        };

        // --- Load Provider Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY");
        let openai_base_url = lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url);
        let story_model = lookup("STORY_MODEL").unwrap_or(defaults.story_model);
        let image_model = lookup("IMAGE_MODEL").unwrap_or(defaults.image_model);
        let image_size = lookup("IMAGE_SIZE").unwrap_or(defaults.image_size);
        let tts_voice = lookup("TTS_VOICE").unwrap_or(defaults.tts_voice);

        // --- Load Web Settings ---
        let public_base_url = lookup("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url);
        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);
        let illustrate_on_create = match lookup("ILLUSTRATE_ON_CREATE") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "ILLUSTRATE_ON_CREATE".to_string(),
                    format!("'{}' is not a boolean", value),
                )
            })?,
            None => defaults.illustrate_on_create,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            openai_base_url,
            story_model,
            image_model,
            image_size,
            tts_voice,
            public_base_url,
            cors_origin,
            illustrate_on_create,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
