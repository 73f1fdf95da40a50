//! Per-event weighted loss functions for the parameterized network.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, Zip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Added inside the logarithms of the BCE loss so exact 0/1 predictions stay finite.
pub const BCE_EPSILON: f64 = 1e-16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LossError {
    #[error("The {0} loss function does not exist (expected BCE or MSE)")]
    Unknown(String),
}

/// Loss selected once by name when a network is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossKind {
    #[serde(rename = "BCE")]
    Bce,
    #[serde(rename = "MSE")]
    Mse,
}

impl LossKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bce => "BCE",
            Self::Mse => "MSE",
        }
    }

    /// Mean over the batch of the weighted per-event loss.
    pub fn value(
        self,
        predictions: ArrayView1<'_, f64>,
        targets: ArrayView1<'_, f64>,
        weights: ArrayView1<'_, f64>,
    ) -> f64 {
        if predictions.is_empty() {
            return 0.0;
        }
        let total = Zip::from(&predictions)
            .and(&targets)
            .and(&weights)
            .fold(0.0, |acc, &p, &y, &w| acc + self.event_loss(p, y, w));
        total / predictions.len() as f64
    }

    /// Derivative of [`LossKind::value`] with respect to each prediction.
    pub fn gradient(
        self,
        predictions: ArrayView1<'_, f64>,
        targets: ArrayView1<'_, f64>,
        weights: ArrayView1<'_, f64>,
    ) -> Array1<f64> {
        let n = predictions.len().max(1) as f64;
        Zip::from(&predictions)
            .and(&targets)
            .and(&weights)
            .map_collect(|&p, &y, &w| match self {
                Self::Bce => -w * (y / (p + BCE_EPSILON) - (1.0 - y) / (1.0 - p + BCE_EPSILON)) / n,
                Self::Mse => 2.0 * w * (p - y) / n,
            })
    }

    fn event_loss(self, p: f64, y: f64, w: f64) -> f64 {
        match self {
            Self::Bce => {
                -w * (y * (p + BCE_EPSILON).ln() + (1.0 - y) * (1.0 - p + BCE_EPSILON).ln())
            }
            Self::Mse => w * (p - y) * (p - y),
        }
    }
}

impl FromStr for LossKind {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BCE" => Ok(Self::Bce),
            "MSE" => Ok(Self::Mse),
            other => Err(LossError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
