use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vectornet::data::ScenarioDataset;
use vectornet::models::vectornet::{TargetDrivenModelConfig, TargetSelectionPolicy};
use vectornet::training::{Trainer, TrainerConfig, TrainingConfig};

type TrainBackend = Autodiff<NdArray<f32>>;

#[derive(Parser, Debug)]
#[command(name = "train", about = "Train the target driven trajectory forecaster")]
struct Args {
    /// Directory of preprocessed training scenarios.
    #[arg(long)]
    train_dir: PathBuf,
    /// Directory of preprocessed validation scenarios.
    #[arg(long)]
    valid_dir: PathBuf,
    /// Where checkpoints and configs are written.
    #[arg(long, default_value = "artifacts")]
    artifact_dir: String,
    #[arg(long, default_value_t = 20)]
    cluster_size: usize,
    #[arg(long, default_value_t = 30)]
    trajectory_length: usize,
    #[arg(long, default_value_t = 14)]
    polyline_features: usize,
    #[arg(long, default_value_t = 6)]
    n_targets: usize,
    /// Keep fewer targets instead of failing on scenes with too few anchors.
    #[arg(long)]
    clamp_targets: bool,
    #[arg(long, default_value_t = 1e-3)]
    tg_lr: f64,
    #[arg(long, default_value_t = 1e-3)]
    tf_lr: f64,
    #[arg(long, default_value_t = 10)]
    tg_sched_step: usize,
    #[arg(long, default_value_t = 0.5)]
    tg_sched_gamma: f64,
    #[arg(long, default_value_t = 10)]
    epochs: usize,
    #[arg(long, default_value_t = 32)]
    batch_size: usize,
    #[arg(long, default_value_t = 2)]
    num_workers: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let policy = if args.clamp_targets {
        TargetSelectionPolicy::Clamp
    } else {
        TargetSelectionPolicy::Strict
    };
    let model_config = TargetDrivenModelConfig::new(
        args.cluster_size,
        args.trajectory_length,
        args.polyline_features,
        args.n_targets,
    )
    .with_target_policy(policy);
    let train_config =
        TrainingConfig::new(args.tg_lr, args.tf_lr, args.tg_sched_step, args.tg_sched_gamma);
    let trainer_config = TrainerConfig::new()
        .with_num_epochs(args.epochs)
        .with_batch_size(args.batch_size)
        .with_num_workers(args.num_workers)
        .with_seed(args.seed)
        .with_artifact_dir(args.artifact_dir.clone());

    fs::create_dir_all(&args.artifact_dir)?;
    fs::write(
        PathBuf::from(&args.artifact_dir).join("training.json"),
        serde_json::to_string_pretty(&train_config)?,
    )?;

    let train = ScenarioDataset::new(&args.train_dir)
        .with_context(|| format!("reading {}", args.train_dir.display()))?;
    let valid = ScenarioDataset::new(&args.valid_dir)
        .with_context(|| format!("reading {}", args.valid_dir.display()))?;

    let trainer = Trainer::<TrainBackend>::new(trainer_config, Default::default());
    let mut forecaster = trainer.init_forecaster(model_config, train_config)?;
    let mut optim = forecaster.configure_optimizers()?;

    trainer.fit(&mut forecaster, &mut optim, train, valid)?;

    Ok(())
}
