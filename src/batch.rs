//! Fixed-size mini-batches over a sample.

use std::iter::FusedIterator;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::sample::Sample;

/// Lazy, single-pass batch sequence over a sample.
///
/// The row order is fixed when the iterator is built (identity or one random
/// permutation shared by features, labels and weights). Each yielded batch is
/// an owned [`Sample`] of `batch_size` rows; the last may be shorter.
#[derive(Debug)]
pub struct Batches<'a> {
    sample: &'a Sample,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Batches<'a> {
    /// Batches in row order. A `batch_size` of zero is treated as one.
    pub fn sequential(sample: &'a Sample, batch_size: usize) -> Self {
        Self {
            sample,
            order: (0..sample.len()).collect(),
            batch_size: batch_size.max(1),
            cursor: 0,
        }
    }

    /// Batches over one random permutation of the rows.
    pub fn shuffled<R: Rng>(sample: &'a Sample, batch_size: usize, rng: &mut R) -> Self {
        let mut batches = Self::sequential(sample, batch_size);
        batches.order.shuffle(rng);
        batches
    }

    /// Number of batches not yet yielded.
    pub fn remaining(&self) -> usize {
        (self.order.len() - self.cursor).div_ceil(self.batch_size)
    }
}

impl Iterator for Batches<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.sample.select(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for Batches<'_> {}

impl FusedIterator for Batches<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn numbered(n: usize) -> Sample {
        let features =
            Array2::from_shape_fn((n, 2), |(row, col)| (row * 10 + col) as f64);
        let labels = Array1::from_shape_fn(n, |row| (row % 2) as f64);
        let weights = Array1::from_shape_fn(n, |row| row as f64);
        Sample::new(features, labels, weights).unwrap()
    }

    #[test]
    fn sequential_batches_rebuild_the_sample() {
        let sample = numbered(10);
        let batches: Vec<Sample> = Batches::sequential(&sample, 4).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 2);
        assert_eq!(Sample::concat(&batches).unwrap(), sample);
    }

    #[test]
    fn shuffled_rows_keep_their_label_and_weight() {
        let sample = numbered(33);
        let mut rng = StdRng::seed_from_u64(9);
        let batches = Batches::shuffled(&sample, 8, &mut rng);
        assert_eq!(batches.len(), 5);
        let joined = Sample::concat(&batches.collect::<Vec<_>>()).unwrap();
        let mut seen: Vec<usize> = Vec::new();
        for ((row, label), weight) in joined
            .features()
            .rows()
            .into_iter()
            .zip(joined.labels())
            .zip(joined.weights())
        {
            let original = (row[0] / 10.0) as usize;
            assert_eq!(row[1], row[0] + 1.0);
            assert_eq!(*label, (original % 2) as f64);
            assert_eq!(*weight, original as f64);
            seen.push(original);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..33).collect::<Vec<_>>());
    }

    #[test]
    fn zero_batch_size_means_single_rows() {
        let sample = numbered(3);
        assert_eq!(Batches::sequential(&sample, 0).count(), 3);
    }

    #[test]
    fn empty_sample_yields_nothing() {
        let sample = Sample::new(Array2::zeros((0, 3)), Array1::zeros(0), Array1::zeros(0)).unwrap();
        assert_eq!(Batches::sequential(&sample, 4).next(), None);
    }
}
