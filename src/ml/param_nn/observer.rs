use crate::ml::history::LossHistory;

/// Snapshot handed to observers after every completed epoch.
#[derive(Debug, Clone, Copy)]
pub struct EpochReport<'a> {
    /// 1-based epoch number.
    pub epoch: usize,
    pub train_loss: &'a LossHistory,
    pub test_loss: &'a LossHistory,
    pub learning_rate: f64,
    /// Epoch of the most recent learning-rate step, 0 if none.
    pub last_step_epoch: usize,
}

/// Receives per-epoch progress. Purely observational: training does not
/// depend on what an observer does, except through a shared cancel token.
pub trait EpochObserver {
    fn on_epoch_end(&mut self, report: &EpochReport<'_>);
}

impl<F> EpochObserver for F
where
    F: FnMut(&EpochReport<'_>),
{
    fn on_epoch_end(&mut self, report: &EpochReport<'_>) {
        self(report)
    }
}

/// Logs every epoch at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EpochObserver for TracingObserver {
    fn on_epoch_end(&mut self, report: &EpochReport<'_>) {
        tracing::info!(
            epoch = report.epoch,
            lr = report.learning_rate,
            last_step = report.last_step_epoch,
            train = ?report.train_loss.last().unwrap_or_default(),
            test = ?report.test_loss.last().unwrap_or_default(),
            "epoch finished"
        );
    }
}

/// Discards all reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EpochObserver for NoopObserver {
    fn on_epoch_end(&mut self, _report: &EpochReport<'_>) {}
}
