mod support;

use paramfit::config::{self, ModelConfig};
use paramfit::ml::{Classifier, ModelVariant};
use paramfit::{ExecutionContext, app_dirs};
use support::home_env::HomeEnvGuard;
use support::samples::unit_weight_sample;
use tempfile::tempdir;

const PIPELINE: &str = r#"
seed = 3
masses = [0.5, 1.0]
features = ["x0", "x1", "x2", "mass"]

[model]
kind = "param_nn"
loss = "MSE"

[model.training]
max_epochs = 2
batch_size = 16

[model.training.early_stop]
min_epoch = 4
"#;

#[test]
fn config_file_drives_model_construction() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pipeline.toml");
    std::fs::write(&path, PIPELINE).unwrap();
    let pipeline = config::load_from_path(&path).unwrap();
    let ModelConfig::ParamNn { training, .. } = &pipeline.model else {
        panic!("expected param_nn");
    };
    assert_eq!(training.early_stop.min_epoch, 4);
    assert_eq!(training.early_stop.grace_epochs, 5);

    let mut ctx = ExecutionContext::seeded(pipeline.seed);
    let mut model = ModelVariant::from_config(&pipeline, &mut ctx).unwrap();
    let sample = unit_weight_sample(&pipeline.masses, 40, 40, 1);
    model.train(&sample, &sample, &mut ctx).unwrap();
    assert_eq!(model.predict(sample.features()).unwrap().len(), sample.len());
}

#[test]
fn missing_config_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn models_dir_follows_home_env() {
    let home = tempdir().unwrap();
    let _guard = HomeEnvGuard::set(home.path());
    let dir = app_dirs::models_dir().unwrap();
    assert!(dir.starts_with(home.path()));
    assert!(dir.is_dir());
}
