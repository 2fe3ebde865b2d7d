//! Runtime configuration. Settings are layered: built-in defaults, then an
//! optional TOML file, then `GEMINI_EXTRACT_*` environment variables. The API
//! key is kept apart from `Settings` and always comes from `GOOGLE_API_KEY`.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt::Debug;
use std::path::Path;
use thiserror::Error;

/// Config file looked up when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "gemini-extract.toml";

/// Environment variable holding the Google API key
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Prefix for environment overrides of `Settings`
pub const ENV_PREFIX: &str = "GEMINI_EXTRACT";

/// Shown when the process refuses to start without a key
pub const MISSING_API_KEY: &str =
    "API Key not found. Please set the GOOGLE_API_KEY in the .env file.";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("API Key not found. Please set the GOOGLE_API_KEY in the .env file.")]
    MissingApiKey,
}

/// The API secret. Never empty, and never printed.
#[derive(Clone, PartialEq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> std::result::Result<Self, ConfigError> {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(ApiKey(key.to_string()))
    }

    /// Read the key from `GOOGLE_API_KEY`
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        ApiKey::from_var(API_KEY_VAR)
    }

    pub fn from_var(var: &str) -> std::result::Result<Self, ConfigError> {
        match std::env::var(var) {
            Ok(key) => ApiKey::new(key),
            Err(_) => Err(ConfigError::MissingApiKey),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,

    /// Upper bound on a JSON request body, base64 images included
    pub max_payload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "127.0.0.1".into(),
            port: 8501,
            max_payload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    pub name: String,

    /// Sent in place of an empty prompt
    pub default_prompt: String,
    pub timeout_secs: Option<u64>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            base_url: "https://generativelanguage.googleapis.com/v1beta/".into(),
            name: "gemini-1.5-flash-001".into(),
            default_prompt: "What is in this image?".into(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageSettings {
    /// Edge length of the square preview thumbnails
    pub thumbnail_size: u32,
    pub accepted_extensions: Vec<String>,
    pub max_files: usize,
}

impl Default for ImageSettings {
    fn default() -> Self {
        ImageSettings {
            thumbnail_size: 150,
            accepted_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            max_files: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelaySettings {
    pub endpoint: String,
    pub port: u16,
    pub timeout_secs: Option<u64>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            endpoint: "https://gemini-pro-api.com/endpoint".into(),
            port: 8502,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub images: ImageSettings,
    pub relay: RelaySettings,
}

impl Settings {
    /// Load settings from `path` (or `DEFAULT_CONFIG_FILE`) and the
    /// environment. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        tracing::debug!("loaded settings: {settings:?}");
        Ok(settings)
    }
}
