//! Pipeline configuration stored as TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mass::MassPoints;
use crate::ml::bdt::BdtOptions;
use crate::ml::param_nn::TrainOptions;

/// Errors that may occur while loading or saving a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Inline TOML text failed to parse.
    #[error("Invalid config: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// Parsed fine but describes an unusable pipeline.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which model to build and how to train it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    ParamNn {
        #[serde(default = "default_loss")]
        loss: String,
        #[serde(default)]
        training: TrainOptions,
    },
    Bdt {
        #[serde(default)]
        options: BdtOptions,
    },
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::ParamNn {
            loss: default_loss(),
            training: TrainOptions::default(),
        }
    }
}

/// Top-level pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub masses: MassPoints,
    /// Training feature names; the last one is the mass column.
    pub features: Vec<String>,
    #[serde(default)]
    pub model: ModelConfig,
}

fn default_seed() -> u64 {
    42
}

fn default_loss() -> String {
    "BCE".to_string()
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.features.is_empty() {
            return Err(ConfigError::Invalid(
                "features must list at least the mass column".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a configuration from TOML text.
pub fn from_toml_str(text: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = toml::from_str(text).map_err(ConfigError::Parse)?;
    config.validate()?;
    Ok(config)
}

pub fn load_from_path(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: PipelineConfig =
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// Write `config` as TOML, creating the parent directory if needed.
pub fn save_to_path(config: &PipelineConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
