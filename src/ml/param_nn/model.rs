use std::path::Path;

use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::network::ParamNetwork;
use super::train::TrainOptions;
use crate::context::ExecutionContext;
use crate::mass::MassPoints;
use crate::ml::error::ModelError;
use crate::ml::loss::LossKind;
use crate::ml::storage;

/// Rows per forward pass when predicting.
pub const PREDICT_BATCH_SIZE: usize = 1024;

const MODEL_VERSION: i64 = 1;

/// Parameterized neural network classifier.
///
/// The last training feature is the mass hypothesis, so one network serves
/// every configured mass point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamNn {
    pub model_version: i64,
    pub train_features: Vec<String>,
    pub masses: MassPoints,
    pub loss: LossKind,
    pub options: TrainOptions,
    pub(super) network: ParamNetwork,
}

impl ParamNn {
    /// Build an untrained network; `loss` must name `BCE` or `MSE`.
    pub fn new(
        train_features: Vec<String>,
        masses: MassPoints,
        loss: &str,
        options: TrainOptions,
        ctx: &mut ExecutionContext,
    ) -> Result<Self, ModelError> {
        let loss: LossKind = loss.parse()?;
        if train_features.is_empty() {
            return Err(ModelError::NoFeatures);
        }
        let network = ParamNetwork::new(train_features.len(), ctx.rng());
        Ok(Self {
            model_version: MODEL_VERSION,
            train_features,
            masses,
            loss,
            options,
            network,
        })
    }

    pub fn network(&self) -> &ParamNetwork {
        &self.network
    }

    pub(crate) fn check_feature_count(&self, actual: usize) -> Result<(), ModelError> {
        let expected = self.train_features.len();
        if actual != expected {
            return Err(ModelError::FeatureCount { expected, actual });
        }
        Ok(())
    }

    /// Signal probability per row, computed in batches of [`PREDICT_BATCH_SIZE`].
    pub fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        self.check_feature_count(features.ncols())?;
        let mut out = Vec::with_capacity(features.nrows());
        for chunk in features.axis_chunks_iter(Axis(0), PREDICT_BATCH_SIZE) {
            out.extend(self.network.predict(chunk));
        }
        Ok(Array1::from_vec(out))
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.model_version != MODEL_VERSION {
            return Err(ModelError::Invalid(format!(
                "unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            )));
        }
        self.network.validate().map_err(ModelError::Invalid)?;
        if self.network.n_inputs() != self.train_features.len() {
            return Err(ModelError::Invalid(format!(
                "network takes {} inputs but {} features are listed",
                self.network.n_inputs(),
                self.train_features.len()
            )));
        }
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        storage::save_json(self, path)
    }

    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let model: Self = storage::load_json(path)?;
        model.validate()?;
        Ok(model)
    }
}
