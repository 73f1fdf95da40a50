//! Weight equalisation across mass points and classes.
//!
//! Both operations are pure: they read a [`Sample`] and return a fresh weight
//! vector, which callers attach with [`Sample::with_weights`].

use ndarray::Array1;
use thiserror::Error;

use crate::mass::MassPoints;
use crate::sample::{BACKGROUND, SIGNAL, Sample};

/// Fatal configuration problems found while balancing weights.
#[derive(Debug, Error, PartialEq)]
pub enum BalanceError {
    /// A configured mass point has no weight for one of the classes, which
    /// would divide by zero.
    #[error("Mass point {mass} has no {class} weight to equalise")]
    EmptyMassPoint { mass: f64, class: &'static str },
    /// The requested normalisation is negative or not finite.
    #[error("Weight normalisation {0} must be finite and non-negative")]
    InvalidNorm(f64),
}

/// Equalise weights between mass points, then between classes.
///
/// At each mass point the signal weights and the background weights are both
/// rescaled to sum to `total signal weight / number of mass points`. Note that
/// background uses the signal average as its target too. Afterwards all signal
/// weights are scaled to sum to `norm` and all background weights likewise;
/// `norm` defaults to the signal sum at that point.
pub fn equalise_weights(
    sample: &Sample,
    masses: &MassPoints,
    norm: Option<f64>,
) -> Result<Array1<f64>, BalanceError> {
    if let Some(norm) = norm
        && (!norm.is_finite() || norm < 0.0)
    {
        return Err(BalanceError::InvalidNorm(norm));
    }
    let mut weights = sample.weights().to_owned();
    let avg_sig_sumw = sample.sum_weights(SIGNAL) / masses.len() as f64;

    for mass in masses.iter() {
        for (label, class) in [(SIGNAL, "signal"), (BACKGROUND, "background")] {
            let rows = sample.indices_where(|l, m| l == label && m == mass);
            let sum: f64 = rows.iter().map(|&i| weights[i]).sum();
            if sum <= 0.0 {
                return Err(BalanceError::EmptyMassPoint { mass, class });
            }
            let scale = avg_sig_sumw / sum;
            for i in rows {
                weights[i] *= scale;
            }
        }
    }

    let sig_rows = sample.indices_where(|l, _| l == SIGNAL);
    let bkg_rows = sample.indices_where(|l, _| l == BACKGROUND);
    let sig_sum: f64 = sig_rows.iter().map(|&i| weights[i]).sum();
    let bkg_sum: f64 = bkg_rows.iter().map(|&i| weights[i]).sum();
    let norm = norm.unwrap_or(sig_sum);
    for i in sig_rows {
        weights[i] *= norm / sig_sum;
    }
    for i in bkg_rows {
        weights[i] *= norm / bkg_sum;
    }
    Ok(weights)
}

/// Scale every weight at mass point `mass` (both classes) by `sf`.
pub fn reweight_mass(sample: &Sample, mass: f64, sf: f64) -> Array1<f64> {
    let mut weights = sample.weights().to_owned();
    for i in sample.indices_where(|_, m| m == mass) {
        weights[i] *= sf;
    }
    weights
}
