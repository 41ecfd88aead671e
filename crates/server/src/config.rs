//! Server configuration
//!
//! Read from `PENGUIN_*` environment variables, e.g. `PENGUIN_MODEL_PATH`,
//! `PENGUIN_HOST` and `PENGUIN_PORT`.

use classifier_lib::ClassifierError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "PENGUIN";

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    model_path: Option<PathBuf>,

    #[serde(default = "default_host")]
    host: String,

    #[serde(default = "default_port")]
    port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Validated server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Local model artifact (`.json` or `.onnx`)
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, ClassifierError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit environment source
    pub fn from_environment(environment: config::Environment) -> Result<Self, ClassifierError> {
        let raw: RawConfig = config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ClassifierError::Configuration(e.to_string()))?;

        let model_path = raw
            .model_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                ClassifierError::Configuration(format!("{}_MODEL_PATH is not set", ENV_PREFIX))
            })?;

        Ok(Self {
            model_path,
            host: raw.host,
            port: raw.port,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
