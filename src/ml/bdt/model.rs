use std::path::Path;

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::tree::{BoostOptions, TreeEnsemble};
use crate::mass::MassPoints;
use crate::ml::error::ModelError;
use crate::ml::loss::LossKind;
use crate::ml::prepare_sample;
use crate::ml::storage;
use crate::sample::Sample;

const MODEL_VERSION: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BdtOptions {
    pub boost: BoostOptions,
    /// Target per-class weight sum after balancing.
    pub weight_norm: f64,
}

impl Default for BdtOptions {
    fn default() -> Self {
        Self {
            boost: BoostOptions::default(),
            weight_norm: 10_000.0,
        }
    }
}

/// Summary of a single fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BdtReport {
    pub trees: usize,
    /// Weighted BCE of the balanced training sample.
    pub train_loss: f64,
    /// Weighted BCE of the balanced test sample.
    pub test_loss: f64,
}

/// Boosted decision tree classifier with the mass as its last feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bdt {
    pub model_version: i64,
    pub train_features: Vec<String>,
    pub masses: MassPoints,
    pub options: BdtOptions,
    ensemble: Option<TreeEnsemble>,
}

impl Bdt {
    pub fn new(
        train_features: Vec<String>,
        masses: MassPoints,
        options: BdtOptions,
    ) -> Result<Self, ModelError> {
        if train_features.is_empty() {
            return Err(ModelError::NoFeatures);
        }
        Ok(Self {
            model_version: MODEL_VERSION,
            train_features,
            masses,
            options,
            ensemble: None,
        })
    }

    pub fn ensemble(&self) -> Option<&TreeEnsemble> {
        self.ensemble.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.ensemble.is_some()
    }

    fn check_feature_count(&self, actual: usize) -> Result<(), ModelError> {
        let expected = self.train_features.len();
        if actual != expected {
            return Err(ModelError::FeatureCount { expected, actual });
        }
        Ok(())
    }

    /// Inflate and balance both samples, then fit the ensemble in one go.
    ///
    /// The test sample is only used for the reported loss.
    pub fn train(&mut self, train: &Sample, test: &Sample) -> Result<BdtReport, ModelError> {
        self.check_feature_count(train.n_features())?;
        self.check_feature_count(test.n_features())?;
        let norm = self.options.weight_norm;
        let train = prepare_sample(train, &self.masses, norm, "train")?;
        let test = prepare_sample(test, &self.masses, norm, "test")?;

        tracing::info!(
            rows = train.len(),
            trees = self.options.boost.n_estimators,
            max_depth = self.options.boost.max_depth,
            "Fitting BDT"
        );
        let ensemble = TreeEnsemble::fit(
            train.features(),
            train.labels(),
            train.weights(),
            &self.options.boost,
        )?;
        let train_loss = weighted_bce(&ensemble, &train)?;
        let test_loss = weighted_bce(&ensemble, &test)?;
        let report = BdtReport {
            trees: ensemble.trees.len(),
            train_loss,
            test_loss,
        };
        tracing::info!(trees = report.trees, train_loss, test_loss, "Finished BDT fit");
        self.ensemble = Some(ensemble);
        Ok(report)
    }

    /// Signal probability per row.
    pub fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        let ensemble = self.ensemble.as_ref().ok_or(ModelError::NotTrained)?;
        self.check_feature_count(features.ncols())?;
        let proba = ensemble.predict_proba(features)?;
        Ok(proba.column(1).to_owned())
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.model_version != MODEL_VERSION {
            return Err(ModelError::Invalid(format!(
                "unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            )));
        }
        if let Some(ensemble) = &self.ensemble {
            if ensemble.n_features != self.train_features.len() {
                return Err(ModelError::Invalid(format!(
                    "ensemble takes {} features but {} are listed",
                    ensemble.n_features,
                    self.train_features.len()
                )));
            }
            ensemble.validate().map_err(ModelError::Invalid)?;
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

fn weighted_bce(ensemble: &TreeEnsemble, sample: &Sample) -> Result<f64, ModelError> {
    let proba = ensemble.predict_proba(sample.features())?;
    Ok(LossKind::Bce.value(proba.column(1), sample.labels(), sample.weights()))
}
