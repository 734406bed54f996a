use std::path::PathBuf;

use burn::backend::NdArray;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vectornet::checkpoint::{load_checkpoint, load_model_config, LAST};
use vectornet::data::ScenarioDataset;
use vectornet::evaluation::evaluate;
use vectornet::models::vectornet::LiteTntLoss;
use vectornet::models::{model_factory, ForecastModel, ModelKind};

type EvalBackend = NdArray<f32>;

#[derive(Parser, Debug)]
#[command(name = "evaluate", about = "Evaluate a forecaster on every dataset split")]
struct Args {
    /// `vectornet` or `constant_velocity`.
    #[arg(long, default_value = "vectornet")]
    model: String,
    /// Directory holding the `last` checkpoint.
    #[arg(long)]
    checkpoint_dir: PathBuf,
    /// Directory with one sub-directory per split.
    #[arg(long)]
    datasets_dir: PathBuf,
    #[arg(long)]
    output_dir: PathBuf,
    #[arg(long, value_delimiter = ',', default_value = "train,val,test")]
    splits: Vec<String>,
    /// Normalization parameter the scenarios were divided by.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
    #[arg(long)]
    visualize: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let kind: ModelKind = args.model.parse()?;
    let device = Default::default();

    let model: ForecastModel<EvalBackend> = match kind {
        ModelKind::VectorNet => {
            let (_, model) = load_checkpoint(&args.checkpoint_dir, LAST)?;
            ForecastModel::VectorNet(model)
        }
        ModelKind::ConstantVelocity => {
            let config = load_model_config(args.checkpoint_dir.join(format!("{LAST}.json")))?;
            model_factory(kind, &config)?
        }
    };
    let loss = LiteTntLoss::default();

    for split_name in args.splits.iter() {
        let dataset = ScenarioDataset::new(args.datasets_dir.join(split_name))?;
        evaluate(
            &model,
            &loss,
            &dataset,
            &args.output_dir.join(split_name),
            &device,
            args.visualize,
            args.scale,
            split_name,
        )?;
    }

    Ok(())
}
