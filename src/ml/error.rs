use std::path::PathBuf;

use thiserror::Error;

use super::bdt::TreeError;
use super::loss::LossError;
use super::metrics::MetricsError;
use crate::prep::{BalanceError, InflateError};
use crate::sample::SampleError;

/// Errors surfaced by model construction, training, prediction and storage.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Unknown loss-function name at construction.
    #[error(transparent)]
    Loss(#[from] LossError),
    /// A model needs at least the mass feature.
    #[error("A model needs at least one training feature (the mass)")]
    NoFeatures,
    /// Input width does not match the configured feature list.
    #[error("Model was built for {expected} features but the input has {actual}")]
    FeatureCount { expected: usize, actual: usize },
    /// Weight balancing hit a mass point without events.
    #[error(transparent)]
    Balance(#[from] BalanceError),
    #[error(transparent)]
    Inflate(#[from] InflateError),
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    /// The tree ensemble rejected its inputs.
    #[error(transparent)]
    Fit(#[from] TreeError),
    /// Prediction was requested from a BDT that has not been fitted.
    #[error("Model has not been trained yet")]
    NotTrained,
    /// A stored model failed structural validation.
    #[error("Invalid model: {0}")]
    Invalid(String),
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
    #[error("Invalid model JSON at {path}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize model for {path}: {source}")]
    SerializeJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}
