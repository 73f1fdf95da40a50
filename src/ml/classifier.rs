//! Common surface over the two model variants.

use std::path::Path;

use ndarray::{Array1, ArrayView1, ArrayView2};

use super::bdt::{Bdt, BdtReport};
use super::error::ModelError;
use super::metrics::{RocResult, roc_with_auc};
use super::param_nn::{ParamNn, TrainingOutcome};
use crate::config::{ModelConfig, PipelineConfig};
use crate::context::ExecutionContext;
use crate::mass::MassPoints;
use crate::sample::Sample;

/// What a `train` call produced, per variant.
#[derive(Debug, Clone)]
pub enum TrainReport {
    Network(TrainingOutcome),
    Trees(BdtReport),
}

/// A signal/background classifier parameterized by mass.
pub trait Classifier {
    fn masses(&self) -> &MassPoints;

    /// Train on `train`, evaluating on `test`. Both are inflated and balanced
    /// internally; the caller's samples are left untouched.
    fn train(
        &mut self,
        train: &Sample,
        test: &Sample,
        ctx: &mut ExecutionContext,
    ) -> Result<TrainReport, ModelError>;

    /// Signal probability per row.
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError>;

    /// Weighted ROC curve and AUC of this model's predictions.
    ///
    /// A failed AUC is replaced by a trapezoidal integral over the curve and
    /// flagged on the result rather than returned as an error.
    fn get_roc(
        &self,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<RocResult, ModelError> {
        let scores = self.predict(features)?;
        Ok(roc_with_auc(labels, scores.view(), weights)?)
    }
}

impl Classifier for ParamNn {
    fn masses(&self) -> &MassPoints {
        &self.masses
    }

    fn train(
        &mut self,
        train: &Sample,
        test: &Sample,
        ctx: &mut ExecutionContext,
    ) -> Result<TrainReport, ModelError> {
        ParamNn::train(self, train, test, ctx).map(TrainReport::Network)
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        ParamNn::predict(self, features)
    }
}

impl Classifier for Bdt {
    fn masses(&self) -> &MassPoints {
        &self.masses
    }

    fn train(
        &mut self,
        train: &Sample,
        test: &Sample,
        _ctx: &mut ExecutionContext,
    ) -> Result<TrainReport, ModelError> {
        Bdt::train(self, train, test).map(TrainReport::Trees)
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        Bdt::predict(self, features)
    }
}

/// Either model variant, chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum ModelVariant {
    ParamNn(ParamNn),
    Bdt(Bdt),
}

impl ModelVariant {
    pub fn from_config(
        config: &PipelineConfig,
        ctx: &mut ExecutionContext,
    ) -> Result<Self, ModelError> {
        let features = config.features.clone();
        let masses = config.masses.clone();
        match &config.model {
            ModelConfig::ParamNn { loss, training } => Ok(Self::ParamNn(ParamNn::new(
                features, masses, loss, *training, ctx,
            )?)),
            ModelConfig::Bdt { options } => Ok(Self::Bdt(Bdt::new(features, masses, *options)?)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ParamNn(_) => "param_nn",
            Self::Bdt(_) => "bdt",
        }
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        match self {
            Self::ParamNn(model) => model.save_json(path),
            Self::Bdt(model) => model.save_json(path),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::ParamNn(model) => model,
            Self::Bdt(model) => model,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Self::ParamNn(model) => model,
            Self::Bdt(model) => model,
        }
    }
}

impl Classifier for ModelVariant {
    fn masses(&self) -> &MassPoints {
        self.inner().masses()
    }

    fn train(
        &mut self,
        train: &Sample,
        test: &Sample,
        ctx: &mut ExecutionContext,
    ) -> Result<TrainReport, ModelError> {
        self.inner_mut().train(train, test, ctx)
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        self.inner().predict(features)
    }
}
