//! Configuration System
//!
//! Hierarchical configuration for the workflow engine: seeded defaults, an
//! optional TOML file, then `COURSEFORGE_*` environment overrides, highest
//! last.

use crate::error::EngineError;
use crate::logging::LoggingConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use tracing::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the sled database lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".courseforge/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Connection settings for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_gateway_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Whole-request timeout; a timeout surfaces as a generation failure.
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_gateway_endpoint() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_gateway_model() -> String {
    "llama3".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_gateway_endpoint(),
            model: default_gateway_model(),
            api_key: None,
            timeout_secs: default_gateway_timeout_secs(),
            temperature: None,
        }
    }
}

/// Audit retention policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    90
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

/// Create a Config builder with defaults applied.
fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    Config::builder()
        .set_default("storage.path", ".courseforge/store")?
        .set_default("gateway.endpoint", default_gateway_endpoint())?
        .set_default("gateway.model", default_gateway_model())?
        .set_default("gateway.timeout_secs", default_gateway_timeout_secs())?
        .set_default("audit.retention_days", default_retention_days() as i64)
}

/// Loads configuration from defaults, an optional TOML file, and environment
/// variables (`COURSEFORGE_GATEWAY__MODEL`-style keys).
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(file: Option<&Path>) -> Result<EngineConfig, EngineError> {
        let mut builder = builder_with_defaults()?;
        if let Some(path) = file {
            if path.exists() {
                builder = builder.add_source(
                    File::with_name(path.to_str().ok_or_else(|| {
                        EngineError::Config(format!("non-UTF8 config path: {}", path.display()))
                    })?)
                    .required(false),
                );
            } else {
                warn!(config_path = %path.display(), "Configuration file not found, using defaults");
            }
        }
        builder = builder.add_source(Environment::with_prefix("COURSEFORGE").separator("__"));
        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }
}
