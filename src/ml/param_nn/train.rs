use serde::{Deserialize, Serialize};

use super::model::ParamNn;
use super::network::ParamNetwork;
use super::observer::{EpochObserver, EpochReport, TracingObserver};
use super::optim::{Adam, ExponentialLr};
use crate::batch::Batches;
use crate::context::ExecutionContext;
use crate::ml::error::ModelError;
use crate::ml::history::LossHistory;
use crate::ml::loss::LossKind;
use crate::ml::policy::{EarlyStopCheck, EarlyStopPolicy, SchedulingPolicy};
use crate::ml::prepare_sample;
use crate::sample::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub max_epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Multiplier applied to the learning rate on every scheduler step.
    pub gamma: f64,
    /// Rows per forward pass when evaluating per-mass losses.
    pub eval_batch_size: usize,
    /// Target per-class weight sum after balancing.
    pub weight_norm: f64,
    pub early_stop: EarlyStopPolicy,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            max_epochs: 100,
            batch_size: 32,
            learning_rate: 0.1,
            gamma: 1.0,
            eval_batch_size: 1024,
            weight_norm: 1000.0,
            early_stop: EarlyStopPolicy::default(),
        }
    }
}

/// Why the training loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EarlyStopped(EarlyStopCheck),
    MaxEpochsReached,
    Interrupted,
}

/// Everything the loop collected, including after an interrupt.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingOutcome {
    pub train_loss: LossHistory,
    pub test_loss: LossHistory,
    pub stop_reason: StopReason,
    /// Completed (recorded) epochs.
    pub epochs: usize,
    pub learning_rate: f64,
    pub last_step_epoch: usize,
}

/// Summed batch losses for each mass point, dropout disabled.
fn per_mass_losses(
    network: &ParamNetwork,
    loss: LossKind,
    subsets: &[Sample],
    eval_batch_size: usize,
) -> Vec<f64> {
    subsets
        .iter()
        .map(|subset| {
            Batches::sequential(subset, eval_batch_size)
                .map(|batch| {
                    let preds = network.predict(batch.features());
                    loss.value(preds.view(), batch.labels(), batch.weights())
                })
                .sum::<f64>()
        })
        .collect()
}

impl ParamNn {
    /// Train with epoch reports logged through `tracing`.
    pub fn train(
        &mut self,
        train: &Sample,
        test: &Sample,
        ctx: &mut ExecutionContext,
    ) -> Result<TrainingOutcome, ModelError> {
        self.train_with_observer(train, test, ctx, &mut TracingObserver)
    }

    /// Run the epoch loop until early stopping, `max_epochs` or an interrupt.
    ///
    /// The network is re-initialized first, so repeated calls retrain from
    /// scratch. Both samples are inflated and balanced before the first epoch.
    pub fn train_with_observer(
        &mut self,
        train: &Sample,
        test: &Sample,
        ctx: &mut ExecutionContext,
        observer: &mut dyn EpochObserver,
    ) -> Result<TrainingOutcome, ModelError> {
        self.check_feature_count(train.n_features())?;
        self.check_feature_count(test.n_features())?;
        let options = self.options;
        let train = prepare_sample(train, &self.masses, options.weight_norm, "train")?;
        let test = prepare_sample(test, &self.masses, options.weight_norm, "test")?;
        let train_subsets: Vec<Sample> = self.masses.iter().map(|m| train.at_mass(m)).collect();
        let test_subsets: Vec<Sample> = self.masses.iter().map(|m| test.at_mass(m)).collect();

        self.network = ParamNetwork::new(self.train_features.len(), ctx.rng());
        let mut adam = Adam::new(&self.network);
        let mut scheduler = ExponentialLr::new(options.learning_rate, options.gamma);
        let mut scheduling = SchedulingPolicy::new();
        let mut train_loss = LossHistory::new();
        let mut test_loss = LossHistory::new();
        let mut stop_reason = StopReason::MaxEpochsReached;

        tracing::info!(
            loss = self.loss.name(),
            max_epochs = options.max_epochs,
            batch_size = options.batch_size,
            lr = options.learning_rate,
            gamma = options.gamma,
            "Starting training"
        );

        for epoch in 1..=options.max_epochs {
            if ctx.is_cancelled() {
                stop_reason = StopReason::Interrupted;
                break;
            }
            let batches = Batches::shuffled(&train, options.batch_size, ctx.rng());
            for (i, batch) in batches.enumerate() {
                let pass = self.network.forward_train(batch.features(), ctx.rng());
                let d_output = self
                    .loss
                    .gradient(pass.output(), batch.labels(), batch.weights());
                let grads = self.network.backward(&pass, d_output.view());
                adam.step(&mut self.network, &grads, scheduler.learning_rate());
                tracing::debug!(epoch, batch = i, rows = batch.len(), "batch step");
            }
            if ctx.is_cancelled() {
                stop_reason = StopReason::Interrupted;
                break;
            }

            let eval = options.eval_batch_size.max(1);
            train_loss.push(per_mass_losses(&self.network, self.loss, &train_subsets, eval));
            test_loss.push(per_mass_losses(&self.network, self.loss, &test_subsets, eval));

            if scheduling.should_step(&train_loss) {
                scheduler.step();
                tracing::info!(epoch, lr = scheduler.learning_rate(), "Decayed learning rate");
            }

            observer.on_epoch_end(&EpochReport {
                epoch,
                train_loss: &train_loss,
                test_loss: &test_loss,
                learning_rate: scheduler.learning_rate(),
                last_step_epoch: scheduling.last_step_epoch(),
            });

            let check = options.early_stop.check(&test_loss);
            if check.is_stop() {
                stop_reason = StopReason::EarlyStopped(check);
                break;
            }
        }

        tracing::info!(
            reason = ?stop_reason,
            epochs = train_loss.len(),
            adam_steps = adam.step_count(),
            "Finished training"
        );
        Ok(TrainingOutcome {
            epochs: train_loss.len(),
            train_loss,
            test_loss,
            stop_reason,
            learning_rate: scheduler.learning_rate(),
            last_step_epoch: scheduling.last_step_epoch(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelToken;
    use crate::mass::MassPoints;
    use crate::toy::{ToySpec, generate};

    fn setup(n_per_class: usize, seed: u64) -> (ParamNn, Sample, Sample, ExecutionContext) {
        let masses = MassPoints::new(vec![0.5, 1.0]).unwrap();
        let mut ctx = ExecutionContext::seeded(seed);
        let spec = ToySpec {
            n_signal_per_mass: n_per_class / 2,
            n_background: n_per_class,
            n_observables: 3,
            ..ToySpec::default()
        };
        let train = generate(&masses, &spec, ctx.rng());
        let test = generate(&masses, &spec, ctx.rng());
        let features = vec!["a".into(), "b".into(), "c".into(), "mass".into()];
        let options = TrainOptions {
            max_epochs: 3,
            ..TrainOptions::default()
        };
        let model = ParamNn::new(features, masses, "BCE", options, &mut ctx).unwrap();
        (model, train, test, ctx)
    }

    #[test]
    fn runs_to_max_epochs_with_one_record_per_epoch() {
        let (mut model, train, test, mut ctx) = setup(40, 1);
        let outcome = model.train(&train, &test, &mut ctx).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::MaxEpochsReached);
        assert_eq!(outcome.epochs, 3);
        assert_eq!(outcome.train_loss.len(), 3);
        assert_eq!(outcome.test_loss.n_masses(), 2);
        assert!(
            outcome
                .train_loss
                .records()
                .iter()
                .flatten()
                .all(|v| v.is_finite() && *v >= 0.0)
        );
    }

    #[test]
    fn observer_sees_every_epoch_and_can_interrupt() {
        let (mut model, train, test, ctx) = setup(40, 2);
        let cancel = CancelToken::new();
        let mut ctx = ctx.with_cancel_token(cancel.clone());
        let mut seen = Vec::new();
        let mut observer = |report: &EpochReport<'_>| {
            seen.push(report.epoch);
            if report.epoch == 2 {
                cancel.cancel();
            }
        };
        let outcome = model
            .train_with_observer(&train, &test, &mut ctx, &mut observer)
            .unwrap();
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(outcome.stop_reason, StopReason::Interrupted);
        assert_eq!(outcome.train_loss.len(), 2);
        assert_eq!(outcome.test_loss.len(), 2);
    }

    #[test]
    fn cancelled_before_start_records_nothing() {
        let (mut model, train, test, ctx) = setup(20, 3);
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut ctx = ctx.with_cancel_token(cancel);
        let outcome = model.train(&train, &test, &mut ctx).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Interrupted);
        assert!(outcome.train_loss.is_empty());
    }

    #[test]
    fn feature_count_mismatch_is_rejected_before_training() {
        let (mut model, train, test, mut ctx) = setup(20, 4);
        let narrow = train.select(&[0, 1]);
        let narrow = Sample::new(
            narrow.features().slice(ndarray::s![.., 1..]).to_owned(),
            narrow.labels().to_owned(),
            narrow.weights().to_owned(),
        )
        .unwrap();
        let err = model.train(&narrow, &test, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            ModelError::FeatureCount {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn early_stop_ends_a_flat_run() {
        let (mut model, train, test, mut ctx) = setup(20, 5);
        model.options.max_epochs = 200;
        model.options.learning_rate = 0.0;
        let outcome = model.train(&train, &test, &mut ctx).unwrap();
        assert!(matches!(outcome.stop_reason, StopReason::EarlyStopped(_)));
        assert!(outcome.epochs < 200);
        assert!(outcome.epochs >= model.options.early_stop.min_epoch);
    }
}
