//! Configuration management for groundsense
//!
//! Parses TOML configuration files and provides typed access to settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for `/analyze`, which carries base64 images
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Gemini's inline data ceiling
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

/// Which calls share the set of already-attempted models
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttemptedScope {
    /// Fresh set for every call
    #[default]
    PerCall,
    /// One set for the lifetime of the client; a model that was attempted
    /// once is never sent again. Not safe for overlapping calls.
    Client,
}

/// Generative endpoint configuration
///
/// Fields are private; values are validated by `Config::validate()` and read
/// through accessors.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    /// Inline API key. Takes precedence over `api_key_env`.
    #[serde(default)]
    api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    api_key_env: String,
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_primary_model")]
    primary_model: String,
    #[serde(default = "default_fallback_models")]
    fallback_models: Vec<String>,
    #[serde(default)]
    attempted_scope: AttemptedScope,
    #[serde(default = "default_request_timeout")]
    request_timeout_seconds: u64,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_top_k")]
    top_k: u32,
    #[serde(default = "default_top_p")]
    top_p: f64,
    #[serde(default = "default_max_output_tokens")]
    max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            primary_model: default_primary_model(),
            fallback_models: default_fallback_models(),
            attempted_scope: AttemptedScope::default(),
            request_timeout_seconds: default_request_timeout(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl GeminiConfig {
    /// API key from config, else from the configured environment variable
    ///
    /// Blank values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
            })
    }

    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    /// Base URL up to and including the API version, without trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn primary_model(&self) -> &str {
        &self.primary_model
    }

    pub fn fallback_models(&self) -> &[String] {
        &self.fallback_models
    }

    pub fn attempted_scope(&self) -> AttemptedScope {
        self.attempted_scope
    }

    pub fn request_timeout_seconds(&self) -> u64 {
        self.request_timeout_seconds
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    pub fn top_p(&self) -> f64 {
        self.top_p
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_primary_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_fallback_models() -> Vec<String> {
    [
        "gemini-1.5-flash",
        "gemini-1.5-pro-latest",
        "gemini-1.5-pro",
        "gemini-pro",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f64 {
    0.95
}

fn default_max_output_tokens() -> u32 {
    1024
}

/// Response catalog source
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// JSON catalog file; the built-in catalog is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when a
    /// Config is deserialized some other way.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(
                "server.port must be greater than 0".to_string(),
            ));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(AppError::Config(
                "server.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        let gemini = &self.gemini;

        if !gemini.base_url.starts_with("http://") && !gemini.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "gemini.base_url '{}' must start with 'http://' or 'https://'",
                gemini.base_url
            )));
        }

        validate_model_name("gemini.primary_model", &gemini.primary_model)?;
        for (position, model) in gemini.fallback_models.iter().enumerate() {
            validate_model_name(&format!("gemini.fallback_models[{}]", position), model)?;
        }

        if gemini.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "gemini.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if gemini.request_timeout_seconds > 300 {
            return Err(AppError::Config(format!(
                "gemini.request_timeout_seconds cannot exceed 300 seconds (5 minutes), got {}",
                gemini.request_timeout_seconds
            )));
        }

        if !(0.0..=2.0).contains(&gemini.temperature) {
            return Err(AppError::Config(format!(
                "gemini.temperature must be a finite number between 0.0 and 2.0, got {}",
                gemini.temperature
            )));
        }

        if !(0.0..=1.0).contains(&gemini.top_p) {
            return Err(AppError::Config(format!(
                "gemini.top_p must be between 0.0 and 1.0, got {}",
                gemini.top_p
            )));
        }

        if gemini.max_output_tokens == 0 {
            return Err(AppError::Config(
                "gemini.max_output_tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Model names go into request URLs verbatim
fn validate_model_name(field: &str, name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Config(format!("{} cannot be empty", field)));
    }
    if name.trim() != name {
        return Err(AppError::Config(format!(
            "{} '{}' has leading or trailing whitespace",
            field, name
        )));
    }
    Ok(())
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
