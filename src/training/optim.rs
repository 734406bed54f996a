use burn::lr_scheduler::LrScheduler;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;

use crate::models::vectornet::{TargetGenerator, TrajectoryForecaster};

use super::scheduler::StepDecay;

/// One optimizer per sub-network. Only the target generator's learning rate is scheduled.
pub struct OptimizerSetup<TG, TF> {
    tg_optim: TG,
    tf_optim: TF,
    tg_sched: StepDecay,
    tf_lr: f64,
}

impl<TG, TF> OptimizerSetup<TG, TF> {
    pub fn new(tg_optim: TG, tf_optim: TF, tg_sched: StepDecay, tf_lr: f64) -> Self {
        Self {
            tg_optim,
            tf_optim,
            tg_sched,
            tf_lr,
        }
    }

    pub fn tg_lr(&self) -> f64 {
        self.tg_sched.lr()
    }

    pub fn tf_lr(&self) -> f64 {
        self.tf_lr
    }
}

/// Optimizer pair able to update a target driven model.
pub trait DualOptimizer<B: AutodiffBackend> {
    fn step_target_generator(
        &mut self,
        module: TargetGenerator<B>,
        grads: GradientsParams,
    ) -> TargetGenerator<B>;

    fn step_trajectory_forecaster(
        &mut self,
        module: TrajectoryForecaster<B>,
        grads: GradientsParams,
    ) -> TrajectoryForecaster<B>;

    /// Advances the learning rate schedules by one epoch, returning the generator's rate.
    fn on_epoch_end(&mut self) -> f64;
}

impl<B, TG, TF> DualOptimizer<B> for OptimizerSetup<TG, TF>
where
    B: AutodiffBackend,
    TG: Optimizer<TargetGenerator<B>, B>,
    TF: Optimizer<TrajectoryForecaster<B>, B>,
{
    fn step_target_generator(
        &mut self,
        module: TargetGenerator<B>,
        grads: GradientsParams,
    ) -> TargetGenerator<B> {
        let lr = self.tg_lr();
        self.tg_optim.step(lr, module, grads)
    }

    fn step_trajectory_forecaster(
        &mut self,
        module: TrajectoryForecaster<B>,
        grads: GradientsParams,
    ) -> TrajectoryForecaster<B> {
        let lr = self.tf_lr;
        self.tf_optim.step(lr, module, grads)
    }

    fn on_epoch_end(&mut self) -> f64 {
        LrScheduler::step(&mut self.tg_sched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn only_the_target_generator_rate_decays() {
        let mut optim = OptimizerSetup::new(
            AdamConfig::new().init::<TestAutodiffBackend, TargetGenerator<TestAutodiffBackend>>(),
            AdamConfig::new()
                .init::<TestAutodiffBackend, TrajectoryForecaster<TestAutodiffBackend>>(),
            StepDecay::new(1e-3, 1, 0.5),
            2e-3,
        );

        for expected in [5e-4, 2.5e-4, 1.25e-4] {
            let tg_lr = DualOptimizer::<TestAutodiffBackend>::on_epoch_end(&mut optim);
            assert_eq!(tg_lr, expected);
            assert_eq!(optim.tg_lr(), expected);
            assert_eq!(optim.tf_lr(), 2e-3);
        }
    }
}
