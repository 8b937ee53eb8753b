//! Configuration System
//!
//! Layered configuration: built-in defaults, then the global config file, then
//! `REZI_*` environment variables. Tests included.

use crate::error::ReziError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use crate::provider::ProviderConfig;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReziConfig {
    /// Image generation service
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Where the credit balance lives
    #[serde(default)]
    pub storage: StorageConfig,

    /// Workflow settings
    #[serde(default)]
    pub app: AppConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory (defaults to the platform data dir for `rezi`)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ReziError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        directories::ProjectDirs::from("", "", "rezi")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                ReziError::Config("Could not determine a data directory (is HOME set?)".to_string())
            })
    }

    /// Sled database holding the credit balance.
    pub fn credits_path(&self) -> Result<PathBuf, ReziError> {
        Ok(self.resolve_data_dir()?.join("credits"))
    }
}

/// Workflow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_prompt")]
    pub default_prompt: String,

    #[serde(default = "default_generation_cost")]
    pub generation_cost: u32,

    #[serde(default = "default_initial_credits")]
    pub initial_credits: u32,

    #[serde(default = "default_fact_interval_ms")]
    pub fact_interval_ms: u64,

    #[serde(default = "default_share_reset_ms")]
    pub share_reset_ms: u64,

    #[serde(default = "default_download_prefix")]
    pub download_prefix: String,

    /// Where downloads land (defaults to the user's download directory)
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

fn default_prompt() -> String {
    "Create a nostalgic, dreamlike scene.".to_string()
}

fn default_generation_cost() -> u32 {
    crate::ledger::GENERATION_COST
}

fn default_initial_credits() -> u32 {
    crate::ledger::DEFAULT_CREDITS
}

fn default_fact_interval_ms() -> u64 {
    crate::progress::FACT_INTERVAL.as_millis() as u64
}

fn default_share_reset_ms() -> u64 {
    crate::exporter::SHARE_RESET_DELAY.as_millis() as u64
}

fn default_download_prefix() -> String {
    crate::exporter::DOWNLOAD_PREFIX.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_prompt: default_prompt(),
            generation_cost: default_generation_cost(),
            initial_credits: default_initial_credits(),
            fact_interval_ms: default_fact_interval_ms(),
            share_reset_ms: default_share_reset_ms(),
            download_prefix: default_download_prefix(),
            download_dir: None,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.generation_cost == 0 {
            return Err("Generation cost must be greater than zero".to_string());
        }
        if self.fact_interval_ms == 0 {
            return Err("Fact interval must be greater than zero".to_string());
        }
        if self.download_prefix.trim().is_empty() {
            return Err("Download prefix cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn resolve_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(|| {
                directories::UserDirs::new()
                    .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    App(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::App(msg) => write!(f, "App: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ReziConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.app.validate() {
            errors.push(ValidationError::App(e));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// TOML rendering with the API key masked.
    pub fn to_redacted_toml(&self) -> Result<String, ReziError> {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| ReziError::Config(format!("Failed to render config: {}", e)))
    }
}

/// Loads [`ReziConfig`] from its sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global config file, then the environment.
    pub fn load() -> Result<ReziConfig, ReziError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::environment::add_to_builder(builder);
        Self::finish(builder)
    }

    /// Defaults, then `path` (which must exist), then the environment.
    pub fn load_from_file(path: &Path) -> Result<ReziConfig, ReziError> {
        if !path.exists() {
            return Err(ReziError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path).required(true));
        let builder = sources::environment::add_to_builder(builder);
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<ReziConfig, ReziError> {
        let mut config: ReziConfig = builder.build()?.try_deserialize()?;
        if config.provider.api_key.is_none() {
            config.provider.api_key = sources::environment::api_key_fallback();
        }
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ReziError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        debug!(model = %config.provider.model, "Configuration loaded");
        Ok(config)
    }
}
