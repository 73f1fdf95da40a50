use serde::{Deserialize, Serialize};

/// Per-epoch losses, one value per mass point in configuration order.
///
/// Append-only while training runs; policies only read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    records: Vec<Vec<f64>>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Vec<f64>) {
        debug_assert!(
            self.records.first().is_none_or(|first| first.len() == record.len()),
            "loss records must all cover the same mass points"
        );
        self.records.push(record);
    }

    /// Number of recorded epochs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Vec<f64>] {
        &self.records
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.records.last().map(Vec::as_slice)
    }

    /// Number of mass points per record (0 when empty).
    pub fn n_masses(&self) -> usize {
        self.records.first().map_or(0, Vec::len)
    }

    /// Loss of one mass point across all epochs.
    pub fn column(&self, mass_idx: usize) -> Vec<f64> {
        self.records.iter().map(|r| r[mass_idx]).collect()
    }

    /// Per-epoch loss summed over mass points.
    pub fn summed(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.iter().sum()).collect()
    }

    /// First epoch (1-based) reaching the minimum summed loss, with that loss.
    pub fn best_summed_epoch(&self) -> Option<(usize, f64)> {
        let summed = self.summed();
        let best = summed.iter().copied().fold(f64::INFINITY, f64::min);
        summed
            .iter()
            .position(|&s| s == best)
            .map(|idx| (idx + 1, best))
    }
}
