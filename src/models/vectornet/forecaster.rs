use std::collections::BTreeMap;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use tracing::{debug, info};

use crate::data::ScenarioBatch;
use crate::error::{ForecastError, Result};
use crate::training::config::TrainingConfig;
use crate::training::log_history::{LogHistory, Metric};
use crate::training::optim::{DualOptimizer, OptimizerSetup};
use crate::training::scheduler::StepDecay;

use super::loss::{LiteTntLoss, LossOutput};
use super::model::{ForecastOutput, TargetDrivenModel, TargetDrivenModelConfig};
use super::target_generator::TargetGenerator;
use super::trajectory_forecaster::TrajectoryForecaster;

/// Target driven forecaster together with its loss and training bookkeeping.
///
/// Training is teacher forced: trajectories are regressed from the ground truth target
/// so the forecaster never sees the generator's mistakes. Validation reports both the
/// teacher forced loss and the loss of the actual inference path.
pub struct TargetDrivenForecaster<B: Backend> {
    config: TargetDrivenModelConfig,
    model: TargetDrivenModel<B>,
    loss: LiteTntLoss,
    train_config: Option<TrainingConfig>,
    log_history: LogHistory,
}

impl<B: Backend> TargetDrivenForecaster<B> {
    pub fn new(config: TargetDrivenModelConfig, train_config: Option<TrainingConfig>) -> Result<Self> {
        let model = config.init()?;
        Ok(Self::from_model(config, model, train_config))
    }

    pub fn from_model(
        config: TargetDrivenModelConfig,
        model: TargetDrivenModel<B>,
        train_config: Option<TrainingConfig>,
    ) -> Self {
        Self {
            config,
            model,
            loss: LiteTntLoss::default(),
            train_config,
            log_history: LogHistory::new(),
        }
    }

    pub fn config(&self) -> &TargetDrivenModelConfig {
        &self.config
    }

    pub fn model(&self) -> &TargetDrivenModel<B> {
        &self.model
    }

    pub fn log_history(&self) -> &LogHistory {
        &self.log_history
    }

    pub fn forward(&self, polylines: Tensor<B, 4>, anchors: Tensor<B, 3>) -> Result<ForecastOutput<B>> {
        self.model.forward(polylines, anchors)
    }

    /// Loss of the teacher forced pass, used for optimization.
    pub fn teacher_forced_loss(&self, batch: &ScenarioBatch<B>) -> LossOutput<B> {
        teacher_forced_loss(&self.model, &self.loss, batch)
    }

    /// Loss of the inference path: forecasts come from the filtered generated targets,
    /// target terms are computed over every anchor.
    pub fn end_to_end_loss(&self, batch: &ScenarioBatch<B>) -> Result<LossOutput<B>> {
        end_to_end_loss(&self.model, &self.loss, batch)
    }

    pub fn training_step(&mut self, batch: &ScenarioBatch<B>) -> Tensor<B, 1> {
        let output = self.teacher_forced_loss(batch);
        let [total, confidence, offset, forecast] = output.scalars();
        debug!(
            "Training step loss {:.6} (confidence {:.6}, offset {:.6}, forecast {:.6})",
            total, confidence, offset, forecast
        );

        self.log_history.record(Metric::TrainingLoss, total);
        self.log_history.record(Metric::TrainingConfidenceLoss, confidence);
        self.log_history.record(Metric::TrainingOffsetLoss, offset);
        self.log_history.record(Metric::TrainingForecastLoss, forecast);

        output.total
    }

    /// Records `end_to_end_val_loss` and the teacher forced `val_loss`, returning the latter.
    ///
    /// The teacher forced pass here only feeds `val_loss`, training metrics are untouched.
    pub fn validation_step(&mut self, batch: &ScenarioBatch<B>) -> Result<Tensor<B, 1>> {
        record_validation(&mut self.log_history, &self.model, &self.loss, batch)
    }

    /// Averages and emits every metric accumulated since the previous call.
    pub fn on_validation_epoch_end(&mut self) -> BTreeMap<Metric, f64> {
        let means = self.log_history.drain_means();
        for (metric, value) in means.iter() {
            info!("{}: {:.6}", metric, value);
        }

        means
    }
}

impl<B: AutodiffBackend> TargetDrivenForecaster<B> {
    /// Same as `validation_step`, on the inner backend so no autodiff graph is recorded.
    pub fn valid_step(
        &mut self,
        batch: &ScenarioBatch<B::InnerBackend>,
    ) -> Result<Tensor<B::InnerBackend, 1>> {
        let model = self.model.valid();
        record_validation(&mut self.log_history, &model, &self.loss, batch)
    }

    /// Adam for each sub-network, with a step decay on the target generator only.
    #[allow(clippy::type_complexity)]
    pub fn configure_optimizers(
        &self,
    ) -> Result<
        OptimizerSetup<
            impl Optimizer<TargetGenerator<B>, B>,
            impl Optimizer<TrajectoryForecaster<B>, B>,
        >,
    > {
        let train_config = self
            .train_config
            .as_ref()
            .ok_or(ForecastError::MissingTrainConfig)?;

        let tg_optim = AdamConfig::new().init::<B, TargetGenerator<B>>();
        let tf_optim = AdamConfig::new().init::<B, TrajectoryForecaster<B>>();
        let tg_sched = StepDecay::new(
            train_config.tg_lr,
            train_config.tg_sched_step,
            train_config.tg_sched_gamma,
        );

        Ok(OptimizerSetup::new(tg_optim, tf_optim, tg_sched, train_config.tf_lr))
    }

    /// Splits the gradients of a single backward pass between the two sub-networks and
    /// steps the target generator first, then the trajectory forecaster.
    pub fn apply_gradients<O: DualOptimizer<B>>(&mut self, optim: &mut O, grads: B::Gradients) {
        let mut grads = grads;
        let tg_grads = GradientsParams::from_module(&mut grads, self.model.target_generator());
        let tf_grads =
            GradientsParams::from_module(&mut grads, self.model.trajectory_forecaster());

        let target_generator =
            optim.step_target_generator(self.model.target_generator().clone(), tg_grads);
        let trajectory_forecaster =
            optim.step_trajectory_forecaster(self.model.trajectory_forecaster().clone(), tf_grads);

        self.model = self
            .model
            .clone()
            .with_parts(target_generator, trajectory_forecaster);
    }
}

fn teacher_forced_loss<B: Backend>(
    model: &TargetDrivenModel<B>,
    loss: &LiteTntLoss,
    batch: &ScenarioBatch<B>,
) -> LossOutput<B> {
    let (offsets, confidences, forecasts) = model.forward_teacher_forced(
        batch.polylines.clone(),
        batch.anchors.clone(),
        batch.ground_truth.clone(),
    );

    loss.forward(
        batch.anchors.clone(),
        offsets,
        confidences,
        batch.ground_truth.clone(),
        forecasts,
        batch.gt_traj.clone(),
    )
}

fn end_to_end_loss<B: Backend>(
    model: &TargetDrivenModel<B>,
    loss: &LiteTntLoss,
    batch: &ScenarioBatch<B>,
) -> Result<LossOutput<B>> {
    let outputs = model.forward(batch.polylines.clone(), batch.anchors.clone())?;

    Ok(loss.forward(
        outputs.all_anchors,
        outputs.all_offsets,
        outputs.all_confidences,
        batch.ground_truth.clone(),
        outputs.forecasts,
        batch.gt_traj.clone(),
    ))
}

fn record_validation<B: Backend>(
    log_history: &mut LogHistory,
    model: &TargetDrivenModel<B>,
    loss: &LiteTntLoss,
    batch: &ScenarioBatch<B>,
) -> Result<Tensor<B, 1>> {
    let end_to_end = end_to_end_loss(model, loss, batch)?;
    let [end_to_end_total, ..] = end_to_end.scalars();
    log_history.record(Metric::EndToEndValLoss, end_to_end_total);

    let output = teacher_forced_loss(model, loss, batch);
    let [total, ..] = output.scalars();
    log_history.record(Metric::ValLoss, total);
    debug!("Validation step loss {:.6} (end to end {:.6})", total, end_to_end_total);

    Ok(output.total)
}
