//! Synthetic signal/background samples for demos, tests and benches.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_distr::{Distribution, StandardNormal};

use crate::mass::MassPoints;
use crate::sample::{BACKGROUND, SIGNAL, Sample};

/// Shape of a generated sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToySpec {
    /// Signal events generated at each mass point.
    pub n_signal_per_mass: usize,
    pub n_background: usize,
    /// Feature columns before the mass column.
    pub n_observables: usize,
    /// Signal mean of observable `j` is `signal_shift * mass / (j + 1)`.
    pub signal_shift: f64,
    /// Standard deviation of the background observables.
    pub background_width: f64,
}

impl Default for ToySpec {
    fn default() -> Self {
        Self {
            n_signal_per_mass: 100,
            n_background: 200,
            n_observables: 3,
            signal_shift: 2.0,
            background_width: 1.5,
        }
    }
}

/// Signal blocks in mass order, then background with masses drawn uniformly
/// from `masses`. All weights are 1.
pub fn generate<R: Rng>(masses: &MassPoints, spec: &ToySpec, rng: &mut R) -> Sample {
    let n_signal = spec.n_signal_per_mass * masses.len();
    let n = n_signal + spec.n_background;
    let d = spec.n_observables + 1;
    let mut features = Array2::zeros((n, d));
    let mut labels = Array1::from_elem(n, BACKGROUND);

    let signal_masses = masses
        .iter()
        .flat_map(|m| std::iter::repeat_n(m, spec.n_signal_per_mass));
    for (row, mass) in signal_masses.enumerate() {
        for j in 0..spec.n_observables {
            features[[row, j]] = spec.signal_shift * mass / (j + 1) as f64 + unit_normal(rng);
        }
        features[[row, d - 1]] = mass;
        labels[row] = SIGNAL;
    }
    for row in n_signal..n {
        for j in 0..spec.n_observables {
            features[[row, j]] = spec.background_width * unit_normal(rng);
        }
        features[[row, d - 1]] = masses.as_slice().choose(rng).copied().unwrap_or_default();
    }
    Sample::from_parts_unchecked(features, labels, Array1::ones(n))
}

fn unit_normal<R: Rng>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}
