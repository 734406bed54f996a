use std::fs;
use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use serde::Serialize;
use tracing::{info, warn};

use crate::data::{ScenarioBatcher, ScenarioItem};
use crate::error::{ForecastError, Result};
use crate::models::vectornet::loss::{scalar, LiteTntLoss};
use crate::models::{ForecastModel, ModelKind};
use crate::utils::to_vec;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub title: String,
    pub model: String,
    pub n_scenarios: usize,
    /// Mean end to end loss, only for models trained with it.
    pub end_to_end_loss: Option<f64>,
    /// Average displacement error of the best hypothesis, in world units.
    pub min_ade: f64,
    /// Final displacement error of the best hypothesis, in world units.
    pub min_fde: f64,
}

/// Best (ADE, FDE) among `n_hypotheses` trajectories of `trajectory_length` xy points.
pub fn displacement_errors(
    forecasts: &[f32],
    gt_traj: &[f32],
    n_hypotheses: usize,
    trajectory_length: usize,
) -> (f64, f64) {
    let step_errors: Vec<Vec<f64>> = forecasts
        .chunks(trajectory_length * 2)
        .take(n_hypotheses)
        .map(|trajectory| {
            trajectory
                .chunks(2)
                .zip(gt_traj.chunks(2))
                .map(|(p, g)| {
                    let dx = (p[0] - g[0]) as f64;
                    let dy = (p[1] - g[1]) as f64;
                    (dx * dx + dy * dy).sqrt()
                })
                .collect()
        })
        .collect();

    let min_ade = step_errors
        .iter()
        .map(|errors| errors.iter().sum::<f64>() / errors.len() as f64)
        .fold(f64::INFINITY, f64::min);
    let min_fde = step_errors
        .iter()
        .filter_map(|errors| errors.last().copied())
        .fold(f64::INFINITY, f64::min);

    (min_ade, min_fde)
}

/// Runs `model` over every scenario of `dataset` and writes `<output_path>/metrics.json`.
///
/// Displacement errors are multiplied by `scale` to undo the dataset normalization.
/// A scenario that cannot be read, or whose ground truth trajectory does not match the
/// forecast horizon, fails the whole split.
#[allow(clippy::too_many_arguments)]
pub fn evaluate<B: Backend, D: Dataset<ScenarioItem>>(
    model: &ForecastModel<B>,
    loss: &LiteTntLoss,
    dataset: &D,
    output_path: &Path,
    device: &B::Device,
    visualize: bool,
    scale: f64,
    title: &str,
) -> Result<EvaluationReport> {
    if dataset.is_empty() {
        return Err(ForecastError::EmptyDataset(title.to_string()));
    }
    if visualize {
        warn!("Visualization is not supported, only metrics are written for {title}");
    }

    let batcher = ScenarioBatcher::<B>::new(device.clone());
    let mut losses = Vec::new();
    let mut ades = Vec::new();
    let mut fdes = Vec::new();

    for index in 0..dataset.len() {
        let item = dataset.get(index).ok_or_else(|| {
            ForecastError::InvalidScenario(format!("{title} scenario {index} could not be read"))
        })?;
        let gt_length = item.gt_traj.len();
        let batch = batcher.batch(vec![item]);
        let (forecasts, outputs) = match model {
            ForecastModel::VectorNet(model) => {
                let outputs = model.forward(batch.polylines, batch.anchors)?;
                (outputs.forecasts.clone(), Some(outputs))
            }
            ForecastModel::ConstantVelocity(_) => {
                (model.predict(batch.polylines, batch.anchors)?, None)
            }
        };

        let [_, n_hypotheses, trajectory_length, _] = forecasts.dims();
        if gt_length != trajectory_length {
            return Err(ForecastError::InvalidScenario(format!(
                "{title} scenario {index} has {gt_length} ground truth steps, the model forecasts {trajectory_length}"
            )));
        }

        if let Some(outputs) = outputs {
            let output = loss.forward(
                outputs.all_anchors,
                outputs.all_offsets,
                outputs.all_confidences,
                batch.ground_truth,
                outputs.forecasts,
                batch.gt_traj.clone(),
            );
            losses.push(scalar(output.total));
        }

        let (ade, fde) = displacement_errors(
            &to_vec(forecasts),
            &to_vec(batch.gt_traj),
            n_hypotheses,
            trajectory_length,
        );
        ades.push(ade * scale);
        fdes.push(fde * scale);
    }

    let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
    let report = EvaluationReport {
        title: title.to_string(),
        model: model.kind().to_string(),
        n_scenarios: ades.len(),
        end_to_end_loss: match model.kind() {
            ModelKind::VectorNet if !losses.is_empty() => Some(mean(&losses)),
            _ => None,
        },
        min_ade: mean(&ades),
        min_fde: mean(&fdes),
    };

    fs::create_dir_all(output_path)?;
    fs::write(
        output_path.join("metrics.json"),
        serde_json::to_string_pretty(&report)?,
    )?;
    info!(
        "[{}] {} scenarios, minADE {:.4}, minFDE {:.4}",
        report.title, report.n_scenarios, report.min_ade, report.min_fde
    );

    Ok(report)
}
