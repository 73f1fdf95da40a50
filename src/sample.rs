//! Event samples: features, binary labels and per-event weights.
//!
//! The last feature column always carries the mass parameter. Everything
//! downstream (inflation, balancing, per-mass loss evaluation) finds the mass
//! of an event by reading that column.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::mass::MassPoints;

/// Label value for signal events.
pub const SIGNAL: f64 = 1.0;
/// Label value for background events.
pub const BACKGROUND: f64 = 0.0;

/// Errors raised when constructing or combining samples.
#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    /// Samples need at least the mass column.
    #[error("Feature matrix has no columns; the mass column is required")]
    NoFeatures,
    /// Labels or weights do not line up with the feature rows.
    #[error("{what} has {actual} entries but the feature matrix has {expected} rows")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A label other than 0 or 1.
    #[error("Label at row {row} is {value}; expected 0 or 1")]
    InvalidLabel { row: usize, value: f64 },
    /// A weight that is negative, NaN or infinite.
    #[error("Weight at row {row} is {value}; weights must be finite and non-negative")]
    InvalidWeight { row: usize, value: f64 },
    /// Samples with different feature counts cannot be concatenated.
    #[error("Cannot combine samples with {left} and {right} features")]
    FeatureCountMismatch { left: usize, right: usize },
    /// `concat` was given no samples.
    #[error("No samples to concatenate")]
    NothingToConcat,
    /// Test fraction outside (0, 1).
    #[error("Test fraction {0} must lie strictly between 0 and 1")]
    InvalidSplitFraction(f64),
}

/// Ordered events with a constant feature dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    features: Array2<f64>,
    labels: Array1<f64>,
    weights: Array1<f64>,
}

impl Sample {
    /// Build a validated sample.
    pub fn new(
        features: Array2<f64>,
        labels: Array1<f64>,
        weights: Array1<f64>,
    ) -> Result<Self, SampleError> {
        if features.ncols() == 0 {
            return Err(SampleError::NoFeatures);
        }
        let rows = features.nrows();
        if labels.len() != rows {
            return Err(SampleError::LengthMismatch {
                what: "labels",
                expected: rows,
                actual: labels.len(),
            });
        }
        validate_weights(&weights, rows)?;
        if let Some((row, &value)) = labels
            .iter()
            .enumerate()
            .find(|(_, v)| **v != SIGNAL && **v != BACKGROUND)
        {
            return Err(SampleError::InvalidLabel { row, value });
        }
        Ok(Self {
            features,
            labels,
            weights,
        })
    }

    /// Rows already known to be consistent, e.g. selections of a valid sample.
    pub(crate) fn from_parts_unchecked(
        features: Array2<f64>,
        labels: Array1<f64>,
        weights: Array1<f64>,
    ) -> Self {
        debug_assert_eq!(features.nrows(), labels.len());
        debug_assert_eq!(features.nrows(), weights.len());
        Self {
            features,
            labels,
            weights,
        }
    }

    /// Concatenate samples in order.
    pub fn concat(parts: &[Sample]) -> Result<Self, SampleError> {
        let Some(first) = parts.first() else {
            return Err(SampleError::NothingToConcat);
        };
        let n_features = first.n_features();
        for part in parts {
            if part.n_features() != n_features {
                return Err(SampleError::FeatureCountMismatch {
                    left: n_features,
                    right: part.n_features(),
                });
            }
        }
        let total_rows: usize = parts.iter().map(Sample::len).sum();
        let mut features = Array2::zeros((total_rows, n_features));
        let mut labels = Vec::with_capacity(total_rows);
        let mut weights = Vec::with_capacity(total_rows);
        let mut offset = 0;
        for part in parts {
            features
                .slice_mut(s![offset..offset + part.len(), ..])
                .assign(&part.features);
            labels.extend(part.labels.iter().copied());
            weights.extend(part.weights.iter().copied());
            offset += part.len();
        }
        let (labels, weights) = (Array1::from_vec(labels), Array1::from_vec(weights));
        Ok(Self::from_parts_unchecked(features, labels, weights))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, f64> {
        self.labels.view()
    }

    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.weights.view()
    }

    /// The mass parameter of every event (last feature column).
    pub fn masses(&self) -> ArrayView1<'_, f64> {
        self.features.column(self.features.ncols() - 1)
    }

    /// Replace the weight vector, keeping features and labels.
    pub fn with_weights(mut self, weights: Array1<f64>) -> Result<Self, SampleError> {
        validate_weights(&weights, self.len())?;
        self.weights = weights;
        Ok(self)
    }

    /// Overwrite the mass column of every event.
    pub(crate) fn set_mass(&mut self, mass: f64) {
        let col = self.features.ncols() - 1;
        self.features.column_mut(col).fill(mass);
    }

    pub(crate) fn mass_column_mut(&mut self) -> ndarray::ArrayViewMut1<'_, f64> {
        let col = self.features.ncols() - 1;
        self.features.column_mut(col)
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self::from_parts_unchecked(
            self.features.select(Axis(0), indices),
            self.labels.select(Axis(0), indices),
            self.weights.select(Axis(0), indices),
        )
    }

    /// Indices of rows matching `predicate(label, mass)`.
    pub fn indices_where(&self, predicate: impl Fn(f64, f64) -> bool) -> Vec<usize> {
        self.labels
            .iter()
            .zip(self.masses())
            .enumerate()
            .filter(|(_, (label, mass))| predicate(**label, **mass))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn signal(&self) -> Self {
        self.select(&self.indices_where(|label, _| label == SIGNAL))
    }

    pub fn background(&self) -> Self {
        self.select(&self.indices_where(|label, _| label == BACKGROUND))
    }

    /// Events whose mass column equals `mass` exactly.
    pub fn at_mass(&self, mass: f64) -> Self {
        self.select(&self.indices_where(|_, m| m == mass))
    }

    pub fn signal_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == SIGNAL).count()
    }

    pub fn background_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == BACKGROUND).count()
    }

    /// Sum of weights of events with the given label.
    pub fn sum_weights(&self, label: f64) -> f64 {
        self.labels
            .iter()
            .zip(self.weights.iter())
            .filter(|(l, _)| **l == label)
            .map(|(_, w)| *w)
            .sum()
    }
}

fn validate_weights(weights: &Array1<f64>, rows: usize) -> Result<(), SampleError> {
    if weights.len() != rows {
        return Err(SampleError::LengthMismatch {
            what: "weights",
            expected: rows,
            actual: weights.len(),
        });
    }
    if let Some((row, &value)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(SampleError::InvalidWeight { row, value });
    }
    Ok(())
}

/// Shuffle and split a sample into `(train, test)`.
///
/// The test set receives `ceil(len * test_fraction)` events.
pub fn train_test_split<R: Rng>(
    sample: &Sample,
    test_fraction: f64,
    rng: &mut R,
) -> Result<(Sample, Sample), SampleError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SampleError::InvalidSplitFraction(test_fraction));
    }
    let mut indices: Vec<usize> = (0..sample.len()).collect();
    indices.shuffle(rng);
    let n_test = ((sample.len() as f64) * test_fraction).ceil() as usize;
    let (test_idx, train_idx) = indices.split_at(n_test.min(sample.len()));
    Ok((sample.select(train_idx), sample.select(test_idx)))
}

/// Event counts and weight sums for one class split.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassTotals {
    pub n_signal: usize,
    pub n_background: usize,
    pub sum_w_signal: f64,
    pub sum_w_background: f64,
}

impl ClassTotals {
    fn of(sample: &Sample) -> Self {
        Self {
            n_signal: sample.signal_count(),
            n_background: sample.background_count(),
            sum_w_signal: sample.sum_weights(SIGNAL),
            sum_w_background: sample.sum_weights(BACKGROUND),
        }
    }
}

/// Overall and per-mass totals for a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSummary {
    pub overall: ClassTotals,
    /// `(mass, totals)` in configuration order.
    pub per_mass: Vec<(f64, ClassTotals)>,
}

impl SampleSummary {
    /// Emit the summary as `info` events.
    pub fn log(&self, name: &str) {
        let o = &self.overall;
        tracing::info!(
            set = name,
            nsig = o.n_signal,
            nbkg = o.n_background,
            sumw_sig = o.sum_w_signal,
            sumw_bkg = o.sum_w_background,
            "sample totals"
        );
        for (mass, t) in &self.per_mass {
            tracing::info!(
                set = name,
                mass = *mass,
                nsig = t.n_signal,
                nbkg = t.n_background,
                sumw_sig = t.sum_w_signal,
                sumw_bkg = t.sum_w_background,
                "mass point totals"
            );
        }
    }
}

pub fn summarize(sample: &Sample, masses: &MassPoints) -> SampleSummary {
    SampleSummary {
        overall: ClassTotals::of(sample),
        per_mass: masses
            .iter()
            .map(|m| (m, ClassTotals::of(&sample.at_mass(m))))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small() -> Sample {
        Sample::new(
            array![[1.0, 0.5], [2.0, 1.0], [3.0, 0.5], [4.0, 1.0]],
            array![1.0, 1.0, 0.0, 0.0],
            array![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap()
    }

    #[test]
    fn rejects_bad_labels_and_weights() {
        let err = Sample::new(array![[0.0], [1.0]], array![1.0, 2.0], array![1.0, 1.0]);
        assert_eq!(err, Err(SampleError::InvalidLabel { row: 1, value: 2.0 }));
        let err = Sample::new(array![[0.0], [1.0]], array![1.0, 0.0], array![1.0, -1.0]);
        assert_eq!(err, Err(SampleError::InvalidWeight { row: 1, value: -1.0 }));
        let err = Sample::new(array![[0.0], [1.0]], array![1.0], array![1.0, 1.0]);
        assert!(matches!(err, Err(SampleError::LengthMismatch { .. })));
    }

    #[test]
    fn class_and_mass_views() {
        let sample = small();
        assert_eq!(sample.signal_count(), 2);
        assert_eq!(sample.background_count(), 2);
        assert_eq!(sample.sum_weights(SIGNAL), 3.0);
        assert_eq!(sample.sum_weights(BACKGROUND), 7.0);
        let at_half = sample.at_mass(0.5);
        assert_eq!(at_half.len(), 2);
        assert_eq!(at_half.weights().to_vec(), vec![1.0, 3.0]);
    }

    #[test]
    fn concat_keeps_order() {
        let sample = small();
        let joined = Sample::concat(&[sample.signal(), sample.background()]).unwrap();
        assert_eq!(joined, sample);
    }

    #[test]
    fn split_partitions_all_rows() {
        let sample = small();
        let mut rng = StdRng::seed_from_u64(7);
        let (train, test) = train_test_split(&sample, 0.25, &mut rng).unwrap();
        assert_eq!(test.len(), 1);
        assert_eq!(train.len(), 3);
        let total: f64 = train.weights().sum() + test.weights().sum();
        assert_eq!(total, 10.0);
        assert!(train_test_split(&sample, 1.0, &mut rng).is_err());
    }

    #[test]
    fn summary_counts_per_mass() {
        let masses = MassPoints::new(vec![0.5, 1.0]).unwrap();
        let summary = summarize(&small(), &masses);
        assert_eq!(summary.overall.n_signal, 2);
        assert_eq!(summary.per_mass[1].0, 1.0);
        assert_eq!(summary.per_mass[1].1.sum_w_background, 4.0);
    }
}
