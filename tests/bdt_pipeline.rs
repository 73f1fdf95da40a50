mod support;

use paramfit::ExecutionContext;
use paramfit::ml::bdt::{Bdt, BdtOptions, BoostOptions};
use paramfit::ml::{Classifier, ModelError, TrainReport};
use support::samples::{feature_names, two_masses, unit_weight_sample};

fn small_options() -> BdtOptions {
    BdtOptions {
        boost: BoostOptions {
            n_estimators: 20,
            max_depth: 3,
            ..BoostOptions::default()
        },
        ..BdtOptions::default()
    }
}

#[test]
fn fit_then_roc_per_mass() {
    let masses = two_masses();
    let train = unit_weight_sample(&masses, 200, 200, 1);
    let test = unit_weight_sample(&masses, 200, 200, 2);
    let mut bdt = Bdt::new(feature_names(), masses.clone(), small_options()).unwrap();
    let mut ctx = ExecutionContext::seeded(0);

    let report = Classifier::train(&mut bdt, &train, &test, &mut ctx).unwrap();
    let TrainReport::Trees(report) = report else {
        panic!("expected a tree report");
    };
    assert_eq!(report.trees, 20);
    assert!(report.train_loss.is_finite() && report.test_loss.is_finite());

    for mass in masses.iter() {
        let subset = test.at_mass(mass);
        let roc = bdt
            .get_roc(subset.features(), subset.labels(), Some(subset.weights()))
            .unwrap();
        assert!(!roc.fallback);
        assert!(roc.auc > 0.7, "mass {mass}: auc {}", roc.auc);
        assert_eq!(roc.curve.thresholds[0], f64::INFINITY);
    }
}

#[test]
fn predict_before_fit_is_an_error() {
    let bdt = Bdt::new(feature_names(), two_masses(), small_options()).unwrap();
    let sample = unit_weight_sample(&two_masses(), 4, 4, 3);
    assert!(matches!(
        bdt.predict(sample.features()),
        Err(ModelError::NotTrained)
    ));
}

#[test]
fn invalid_boost_options_surface_as_fit_errors() {
    let masses = two_masses();
    let train = unit_weight_sample(&masses, 20, 20, 4);
    let mut options = small_options();
    options.boost.learning_rate = 0.0;
    let mut bdt = Bdt::new(feature_names(), masses, options).unwrap();
    let err = bdt.train(&train, &train).unwrap_err();
    assert!(matches!(err, ModelError::Fit(_)), "{err}");
}
