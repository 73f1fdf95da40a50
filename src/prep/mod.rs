//! Sample preparation applied before any model sees the data.
//!
//! - [`balance`]: per-mass and per-class weight equalisation.
//! - [`inflate`]: background replication across mass points and related
//!   resampling helpers.

pub mod balance;
pub mod inflate;

pub use balance::{BalanceError, equalise_weights, reweight_mass};
pub use inflate::{InflateError, cull_signal, inflate_bkg_with_masses, shuffle_bkg_masses};
