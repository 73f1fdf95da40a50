use ndarray::{Array1, Array2};
use paramfit::MassPoints;
use paramfit::sample::Sample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn two_masses() -> MassPoints {
    MassPoints::new(vec![0.5, 1.0]).expect("valid masses")
}

/// `n_signal` signal rows split evenly over the masses, then `n_background`
/// rows with masses assigned round-robin. Three observables plus mass, unit
/// weights.
pub fn unit_weight_sample(
    masses: &MassPoints,
    n_signal: usize,
    n_background: usize,
    seed: u64,
) -> Sample {
    let mut rng = StdRng::seed_from_u64(seed);
    let points = masses.as_slice();
    let n = n_signal + n_background;
    let mut features = Array2::zeros((n, 4));
    let mut labels = Array1::zeros(n);
    for row in 0..n {
        let signal = row < n_signal;
        let mass = if signal {
            points[row * points.len() / n_signal.max(1)]
        } else {
            points[(row - n_signal) % points.len()]
        };
        let shift = if signal { mass } else { 0.0 };
        for col in 0..3 {
            features[[row, col]] = shift + rng.random_range(-1.0..1.0);
        }
        features[[row, 3]] = mass;
        labels[row] = if signal { 1.0 } else { 0.0 };
    }
    Sample::new(features, labels, Array1::ones(n)).expect("valid sample")
}

pub fn feature_names() -> Vec<String> {
    ["x0", "x1", "x2", "mass"].map(String::from).to_vec()
}
