//! Parameterized signal/background classifiers.
//!
//! A single model is trained across a set of mass hypotheses by feeding the
//! mass as the last input feature. Background events are replicated at every
//! mass point and weights are balanced per mass before training.

/// Tracing subscriber setup.
pub mod logging;
/// `.paramfit` directory layout.
pub mod app_dirs;
/// Sequential and shuffled mini-batches over a sample.
pub mod batch;
/// TOML pipeline configuration.
pub mod config;
/// Seeded RNG and cancellation shared by a run.
pub mod context;
/// Validated mass hypotheses.
pub mod mass;
/// Classifiers, losses, training policies and ROC metrics.
pub mod ml;
/// Background inflation and weight balancing.
pub mod prep;
/// Feature matrix with labels and weights.
pub mod sample;
/// Synthetic samples for demos and benches.
pub mod toy;

pub use context::{CancelToken, ExecutionContext};
pub use mass::MassPoints;
pub use sample::Sample;
