//! Models, losses, training policies and evaluation metrics.
//!
//! Both model variants share the same preparation step: background inflation
//! over every mass point followed by per-mass weight equalisation.

pub mod bdt;
pub mod classifier;
pub mod error;
pub mod history;
pub mod loss;
pub mod metrics;
pub mod param_nn;
pub mod policy;
mod storage;

use crate::mass::MassPoints;
use crate::prep::{equalise_weights, inflate_bkg_with_masses};
use crate::sample::{Sample, summarize};

pub use classifier::{Classifier, ModelVariant, TrainReport};
pub use error::ModelError;
pub use history::LossHistory;
pub use loss::{LossError, LossKind};
pub use metrics::{MetricsError, RocCurve, RocResult};
pub use policy::{EarlyStopCheck, EarlyStopPolicy, SchedulingPolicy};

/// Inflate the background over every mass point, balance the weights to
/// `norm` per class and log the resulting totals under `name`.
pub(crate) fn prepare_sample(
    sample: &Sample,
    masses: &MassPoints,
    norm: f64,
    name: &str,
) -> Result<Sample, ModelError> {
    let inflated = inflate_bkg_with_masses(sample, masses)?;
    let weights = equalise_weights(&inflated, masses, Some(norm))?;
    let balanced = inflated.with_weights(weights)?;
    summarize(&balanced, masses).log(name);
    Ok(balanced)
}
