use burn::config::Config;
use burn::module::Module;
use burn::tensor::{backend::Backend, Tensor};

use crate::modules::mlp::{Mlp, MlpConfig};

/// Regresses a full future trajectory for every target point.
#[derive(Module, Debug)]
pub struct TrajectoryForecaster<B: Backend> {
    trajectory_length: usize,
    decoder: Mlp<B>,
}

impl<B: Backend> TrajectoryForecaster<B> {
    /// features: [N, n_features], targets: [N, K, 2] -> [N, K, trajectory_length, 2]
    pub fn forward(&self, features: Tensor<B, 2>, targets: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch_size, n_targets, _] = targets.dims();
        let features: Tensor<B, 3> = features.unsqueeze_dim(1);
        let x = Tensor::cat(vec![features.repeat(1, n_targets), targets], 2);

        self.decoder
            .forward(x)
            .reshape([batch_size, n_targets, self.trajectory_length, 2])
    }
}

#[derive(Config, Debug)]
pub struct TrajectoryForecasterConfig {
    n_features: usize,
    trajectory_length: usize,

    #[config(default = 128)]
    d_hidden: usize,
}

impl TrajectoryForecasterConfig {
    pub fn init<B: Backend>(&self) -> TrajectoryForecaster<B> {
        TrajectoryForecaster {
            trajectory_length: self.trajectory_length,
            decoder: MlpConfig::new(self.n_features + 2, self.d_hidden, self.trajectory_length * 2)
                .init(),
        }
    }
}
