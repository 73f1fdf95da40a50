//! Learning-rate scheduling and early-stopping decisions over a loss history.

use serde::{Deserialize, Serialize};

use super::history::LossHistory;

/// Epochs that must pass after the best loss, and after the previous step,
/// before the learning rate is decayed again.
pub const SCHEDULER_PATIENCE: usize = 5;

/// Decides when to decay the learning rate.
///
/// Steps only when the summed loss has not improved for more than
/// [`SCHEDULER_PATIENCE`] epochs and the last step is equally far back, so a
/// single plateau never triggers two decays in a row.
#[derive(Debug, Clone, Default)]
pub struct SchedulingPolicy {
    last_step_epoch: usize,
}

impl SchedulingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epoch (1-based) of the most recent step, 0 if none yet.
    pub fn last_step_epoch(&self) -> usize {
        self.last_step_epoch
    }

    pub fn reset(&mut self) {
        self.last_step_epoch = 0;
    }

    /// Returns true, and records the current epoch, when a step is due.
    pub fn should_step(&mut self, history: &LossHistory) -> bool {
        let n_epochs = history.len();
        let Some((best_epoch, _)) = history.best_summed_epoch() else {
            return false;
        };
        let since_best = n_epochs - best_epoch;
        let since_step = n_epochs.saturating_sub(self.last_step_epoch);
        if since_best > SCHEDULER_PATIENCE && since_step > SCHEDULER_PATIENCE {
            self.last_step_epoch = n_epochs;
            true
        } else {
            false
        }
    }
}

/// Which early-stopping rule decided the outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarlyStopCheck {
    /// Fewer than `min_epoch` epochs recorded.
    TooEarly,
    /// Some mass point's loss is still moving by more than `tol` inside the
    /// grace window; stopping is deferred.
    Unstable,
    /// The best summed loss is more than `grace_epochs` old.
    Stale,
    /// No mass point improved its best loss by more than `tol` over the window.
    Stagnant,
    /// Keep training.
    Continue,
}

impl EarlyStopCheck {
    pub fn is_stop(self) -> bool {
        matches!(self, Self::Stale | Self::Stagnant)
    }
}

/// Stops training once the validation loss has plateaued.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyStopPolicy {
    pub min_epoch: usize,
    pub grace_epochs: usize,
    /// Relative tolerance, as a fraction of a mass point's best loss.
    pub tol: f64,
}

impl Default for EarlyStopPolicy {
    fn default() -> Self {
        Self {
            min_epoch: 10,
            grace_epochs: 5,
            tol: 0.01,
        }
    }
}

impl EarlyStopPolicy {
    pub fn new(min_epoch: usize, grace_epochs: usize, tol: f64) -> Self {
        Self {
            min_epoch,
            grace_epochs,
            tol,
        }
    }

    pub fn should_stop(&self, history: &LossHistory) -> bool {
        self.check(history).is_stop()
    }

    pub fn check(&self, history: &LossHistory) -> EarlyStopCheck {
        let n_epochs = history.len();
        if n_epochs == 0 || n_epochs < self.min_epoch {
            return EarlyStopCheck::TooEarly;
        }
        let grace = self.grace_epochs;
        let window_start = n_epochs.saturating_sub(grace);

        if n_epochs > grace {
            for i in 0..history.n_masses() {
                let losses = history.column(i);
                let best = min(&losses);
                let window = &losses[window_start..];
                let variation = max(window) - min(window);
                if variation / best > self.tol {
                    return EarlyStopCheck::Unstable;
                }
            }
        }

        if let Some((best_epoch, _)) = history.best_summed_epoch()
            && n_epochs - best_epoch > grace
        {
            return EarlyStopCheck::Stale;
        }

        if n_epochs > grace {
            let any_improving = (0..history.n_masses()).any(|i| {
                let losses = history.column(i);
                let best = min(&losses);
                let best_before = min(&losses[..window_start]);
                (best_before - best) / best > self.tol
            });
            if !any_improving {
                return EarlyStopCheck::Stagnant;
            }
        }

        EarlyStopCheck::Continue
    }
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(rows: &[(f64, f64)]) -> LossHistory {
        let mut h = LossHistory::new();
        for &(a, b) in rows {
            h.push(vec![a, b]);
        }
        h
    }

    /// Ten strictly decreasing epochs, then `flat` epochs at the last value.
    fn decreasing_then_flat(flat: usize) -> LossHistory {
        let mut rows: Vec<(f64, f64)> = (0..10)
            .map(|i| (10.0 - i as f64, 20.0 - 2.0 * i as f64))
            .collect();
        rows.extend(std::iter::repeat_n((1.0, 2.0), flat));
        history(&rows)
    }

    #[test]
    fn never_stops_before_min_epoch() {
        let policy = EarlyStopPolicy::new(20, 5, 0.01);
        let full = decreasing_then_flat(15);
        for n in 1..20 {
            let mut partial = LossHistory::new();
            for r in &full.records()[..n] {
                partial.push(r.clone());
            }
            assert_eq!(policy.check(&partial), EarlyStopCheck::TooEarly);
        }
        assert!(policy.should_stop(&full));
    }

    #[test]
    fn stops_once_flat_longer_than_grace() {
        let policy = EarlyStopPolicy::default();
        assert_eq!(
            policy.check(&decreasing_then_flat(4)),
            EarlyStopCheck::Continue
        );
        // The window no longer reaches back to any improvement.
        assert_eq!(
            policy.check(&decreasing_then_flat(5)),
            EarlyStopCheck::Stagnant
        );
        // The minimum first appeared at epoch 10; later ties do not refresh it.
        assert_eq!(
            policy.check(&decreasing_then_flat(6)),
            EarlyStopCheck::Stale
        );
    }

    #[test]
    fn decreasing_loss_keeps_training() {
        let policy = EarlyStopPolicy::default();
        let h = decreasing_then_flat(0);
        assert_eq!(policy.check(&h), EarlyStopCheck::Unstable);
    }

    #[test]
    fn unstable_window_defers_stale_stop() {
        let policy = EarlyStopPolicy::new(1, 2, 0.01);
        // Best at epoch 1, then oscillating above it.
        let h = history(&[(1.0, 1.0), (2.0, 2.0), (3.0, 2.0), (2.0, 2.0)]);
        assert_eq!(policy.check(&h), EarlyStopCheck::Unstable);
    }

    #[test]
    fn stagnant_when_window_barely_improves() {
        let policy = EarlyStopPolicy::new(1, 2, 0.01);
        let h = history(&[(1.0, 1.0), (1.0, 1.0), (0.9999, 1.0), (0.9999, 1.0)]);
        assert_eq!(policy.check(&h), EarlyStopCheck::Stagnant);
    }

    #[test]
    fn improving_window_continues() {
        let policy = EarlyStopPolicy::new(1, 2, 0.01);
        let h = history(&[(2.0, 1.0), (1.5, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        assert_eq!(policy.check(&h), EarlyStopCheck::Continue);
    }

    #[test]
    fn scheduler_waits_for_patience() {
        let mut policy = SchedulingPolicy::new();
        let mut h = LossHistory::new();
        h.push(vec![1.0]);
        for _ in 0..5 {
            h.push(vec![2.0]);
            assert!(!policy.should_step(&h));
        }
        h.push(vec![2.0]);
        assert!(policy.should_step(&h));
        assert_eq!(policy.last_step_epoch(), 7);
    }

    #[test]
    fn scheduler_steps_are_spaced_out() {
        let mut policy = SchedulingPolicy::new();
        let mut h = LossHistory::new();
        let mut steps = Vec::new();
        h.push(vec![0.0, 0.0]);
        for epoch in 2..=60 {
            h.push(vec![epoch as f64, 1.0]);
            if policy.should_step(&h) {
                steps.push(epoch);
            }
        }
        assert!(steps.len() > 3);
        for pair in steps.windows(2) {
            assert!(pair[1] - pair[0] > SCHEDULER_PATIENCE);
        }
    }

    #[test]
    fn scheduler_ignores_empty_history() {
        assert!(!SchedulingPolicy::new().should_step(&LossHistory::new()));
    }
}
