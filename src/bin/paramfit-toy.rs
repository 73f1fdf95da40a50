//! Trains a parameterized classifier on a generated toy sample and reports
//! the ROC AUC at every mass point.

use std::path::PathBuf;

use paramfit::config::{self, PipelineConfig};
use paramfit::ml::{Classifier, ModelVariant, TrainReport};
use paramfit::sample::train_test_split;
use paramfit::toy::{ToySpec, generate};
use paramfit::{ExecutionContext, app_dirs, logging};

const DEFAULT_CONFIG: &str = r#"
seed = 42
masses = [0.5, 1.0, 1.5]
features = ["x0", "x1", "x2", "mass"]

[model]
kind = "param_nn"
loss = "BCE"

[model.training]
max_epochs = 30
"#;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let pipeline: PipelineConfig = match &options.config {
        Some(path) => config::load_from_path(path).map_err(|err| err.to_string())?,
        None => config::from_toml_str(DEFAULT_CONFIG).map_err(|err| err.to_string())?,
    };
    let mut ctx = ExecutionContext::seeded(options.seed.unwrap_or(pipeline.seed));

    let spec = ToySpec {
        n_signal_per_mass: options.signal_per_mass,
        n_background: options.background,
        n_observables: pipeline.features.len().saturating_sub(1),
        ..ToySpec::default()
    };
    let sample = generate(&pipeline.masses, &spec, ctx.rng());
    let (train, test) = train_test_split(&sample, options.test_fraction, ctx.rng())
        .map_err(|err| err.to_string())?;
    tracing::info!(
        seed = ctx.seed(),
        train = train.len(),
        test = test.len(),
        "Generated toy sample"
    );

    let mut model = ModelVariant::from_config(&pipeline, &mut ctx).map_err(|err| err.to_string())?;
    match model
        .train(&train, &test, &mut ctx)
        .map_err(|err| err.to_string())?
    {
        TrainReport::Network(outcome) => tracing::info!(
            reason = ?outcome.stop_reason,
            epochs = outcome.epochs,
            lr = outcome.learning_rate,
            "Network trained"
        ),
        TrainReport::Trees(report) => tracing::info!(
            trees = report.trees,
            train_loss = report.train_loss,
            test_loss = report.test_loss,
            "Trees fitted"
        ),
    }

    for mass in pipeline.masses.iter() {
        let subset = test.at_mass(mass);
        let roc = model
            .get_roc(subset.features(), subset.labels(), Some(subset.weights()))
            .map_err(|err| err.to_string())?;
        tracing::info!(mass, auc = roc.auc, fallback = roc.fallback, "ROC");
    }

    let out = match options.model_out {
        Some(path) => path,
        None => app_dirs::models_dir()
            .map_err(|err| err.to_string())?
            .join(format!("{}.json", model.name())),
    };
    model.save_json(&out).map_err(|err| err.to_string())?;
    tracing::info!(path = %out.display(), "Saved model");
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    config: Option<PathBuf>,
    model_out: Option<PathBuf>,
    seed: Option<u64>,
    signal_per_mass: usize,
    background: usize,
    test_fraction: f64,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions {
        config: None,
        model_out: None,
        seed: None,
        signal_per_mass: 500,
        background: 1500,
        test_fraction: 0.25,
    };
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        if matches!(flag, "-h" | "--help") {
            return Err(help_text());
        }
        idx += 1;
        let value = args
            .get(idx)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--config" => options.config = Some(PathBuf::from(value)),
            "--out" => options.model_out = Some(PathBuf::from(value)),
            "--seed" => options.seed = Some(parse_value(flag, value)?),
            "--signal-per-mass" => options.signal_per_mass = parse_value(flag, value)?,
            "--background" => options.background = parse_value(flag, value)?,
            "--test-fraction" => options.test_fraction = parse_value(flag, value)?,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "paramfit-toy",
        "",
        "Trains a mass-parameterized classifier on a toy sample and writes the model JSON.",
        "",
        "Usage:",
        "  paramfit-toy [--config pipeline.toml] [--out model.json]",
        "",
        "Options:",
        "  --config <path>          Pipeline TOML (default: built-in 3-mass network setup)",
        "  --out <path>             Model output (default: <app dir>/models/<kind>.json)",
        "  --seed <n>               Overrides the config seed",
        "  --signal-per-mass <n>    Signal events per mass point (default 500)",
        "  --background <n>         Background events (default 1500)",
        "  --test-fraction <f>      Held-out fraction (default 0.25)",
        "",
        "Set PARAMFIT_LOG to change the log filter and PARAMFIT_HOME to move the app dir.",
    ]
    .join("\n")
}
