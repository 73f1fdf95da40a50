mod support;

use paramfit::ExecutionContext;
use paramfit::ml::param_nn::{EpochReport, ParamNn, StopReason, TrainOptions};
use paramfit::ml::{Classifier, ModelError};
use paramfit::prep::{equalise_weights, inflate_bkg_with_masses};
use paramfit::sample::{BACKGROUND, SIGNAL};
use support::samples::{feature_names, two_masses, unit_weight_sample};

#[test]
fn inflation_and_balancing_of_a_two_mass_sample() {
    let masses = two_masses();
    let sample = unit_weight_sample(&masses, 100, 100, 1);
    let inflated = inflate_bkg_with_masses(&sample, &masses).unwrap();
    assert_eq!(inflated.signal_count(), 100);
    assert_eq!(inflated.background_count(), 200);
    for mass in masses.iter() {
        assert_eq!(inflated.at_mass(mass).background_count(), 100);
    }

    let weights = equalise_weights(&inflated, &masses, Some(1000.0)).unwrap();
    let balanced = inflated.with_weights(weights).unwrap();
    assert!((balanced.sum_weights(SIGNAL) - 1000.0).abs() < 1e-6);
    assert!((balanced.sum_weights(BACKGROUND) - 1000.0).abs() < 1e-6);
}

#[test]
fn single_epoch_records_one_loss_per_mass() {
    let masses = two_masses();
    let train = unit_weight_sample(&masses, 100, 100, 2);
    let test = unit_weight_sample(&masses, 100, 100, 3);
    let mut ctx = ExecutionContext::seeded(7);
    let options = TrainOptions {
        max_epochs: 1,
        batch_size: 32,
        ..TrainOptions::default()
    };
    let mut model = ParamNn::new(feature_names(), masses, "BCE", options, &mut ctx).unwrap();
    let outcome = model.train(&train, &test, &mut ctx).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::MaxEpochsReached);
    for history in [&outcome.train_loss, &outcome.test_loss] {
        assert_eq!(history.len(), 1);
        let record = history.last().unwrap();
        assert_eq!(record.len(), 2);
        assert!(record.iter().all(|v| v.is_finite() && *v >= 0.0), "{record:?}");
    }
}

#[test]
fn same_seed_gives_same_losses() {
    let masses = two_masses();
    let train = unit_weight_sample(&masses, 60, 60, 4);
    let test = unit_weight_sample(&masses, 60, 60, 5);
    let run = || {
        let mut ctx = ExecutionContext::seeded(11);
        let options = TrainOptions {
            max_epochs: 3,
            ..TrainOptions::default()
        };
        let mut model =
            ParamNn::new(feature_names(), masses.clone(), "MSE", options, &mut ctx).unwrap();
        model.train(&train, &test, &mut ctx).unwrap().test_loss
    };
    assert_eq!(run().records(), run().records());
}

#[test]
fn interrupt_keeps_collected_history() {
    let masses = two_masses();
    let train = unit_weight_sample(&masses, 60, 60, 6);
    let test = unit_weight_sample(&masses, 60, 60, 7);
    let mut ctx = ExecutionContext::seeded(3);
    let cancel = ctx.cancel_token();
    let options = TrainOptions {
        max_epochs: 50,
        ..TrainOptions::default()
    };
    let mut model = ParamNn::new(feature_names(), masses, "BCE", options, &mut ctx).unwrap();
    let mut stop_after_three = |report: &EpochReport<'_>| {
        if report.epoch == 3 {
            cancel.cancel();
        }
    };
    let outcome = model
        .train_with_observer(&train, &test, &mut ctx, &mut stop_after_three)
        .unwrap();
    assert_eq!(outcome.stop_reason, StopReason::Interrupted);
    assert_eq!(outcome.train_loss.len(), 3);
    assert_eq!(outcome.test_loss.len(), 3);
}

#[test]
fn mass_point_without_signal_is_fatal() {
    let masses = paramfit::MassPoints::new(vec![0.5, 1.0, 2.0]).unwrap();
    let train = unit_weight_sample(&two_masses(), 40, 40, 8);
    let mut ctx = ExecutionContext::seeded(1);
    let mut model =
        ParamNn::new(feature_names(), masses, "BCE", TrainOptions::default(), &mut ctx).unwrap();
    let err = model.train(&train, &train, &mut ctx).unwrap_err();
    assert!(matches!(err, ModelError::Balance(_)), "{err}");
}

#[test]
fn trained_network_separates_the_toy_classes() {
    let masses = two_masses();
    let train = unit_weight_sample(&masses, 200, 200, 9);
    let test = unit_weight_sample(&masses, 200, 200, 10);
    let mut ctx = ExecutionContext::seeded(5);
    let options = TrainOptions {
        max_epochs: 15,
        learning_rate: 0.01,
        ..TrainOptions::default()
    };
    let mut model = ParamNn::new(feature_names(), masses, "BCE", options, &mut ctx).unwrap();
    model.train(&train, &test, &mut ctx).unwrap();
    let subset = test.at_mass(1.0);
    let roc = model
        .get_roc(subset.features(), subset.labels(), Some(subset.weights()))
        .unwrap();
    assert!(!roc.fallback);
    assert!(roc.auc > 0.8, "auc {}", roc.auc);
}
