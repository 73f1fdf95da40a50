//! Parameterized neural network: a small feed-forward classifier whose last
//! input is the mass hypothesis.

mod model;
pub mod network;
pub mod observer;
pub mod optim;
mod train;

pub use model::{PREDICT_BATCH_SIZE, ParamNn};
pub use observer::{EpochObserver, EpochReport, NoopObserver, TracingObserver};
pub use train::{StopReason, TrainOptions, TrainingOutcome};
