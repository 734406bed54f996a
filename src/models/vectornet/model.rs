use burn::config::Config;
use burn::module::Module;
use burn::tensor::{backend::Backend, Int, Tensor};
use serde::{Deserialize, Serialize};

use crate::error::{self, ForecastError};
use crate::utils::{gather_topk, index_tensor, to_vec, top_k_indices};

use super::target_generator::{TargetGenerator, TargetGeneratorConfig};
use super::trajectory_forecaster::{TrajectoryForecaster, TrajectoryForecasterConfig};

/// What to do when a scene has fewer anchors than the configured number of targets.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetSelectionPolicy {
    /// Fail with [`ForecastError::TooFewAnchors`].
    #[default]
    Strict,
    /// Keep every anchor, returning fewer than `n_targets` targets.
    Clamp,
}

/// Everything the inference path produces, before and after target filtering.
#[derive(Clone, Debug)]
pub struct ForecastOutput<B: Backend> {
    pub all_anchors: Tensor<B, 3>,     // [N, A, 2]
    pub all_offsets: Tensor<B, 3>,     // [N, A, 2]
    pub all_confidences: Tensor<B, 2>, // [N, A]
    pub anchors: Tensor<B, 3>,         // [N, K, 2]
    pub offsets: Tensor<B, 3>,         // [N, K, 2]
    pub targets: Tensor<B, 3>,         // [N, K, 2]
    pub confidences: Tensor<B, 2>,     // [N, K]
    pub forecasts: Tensor<B, 4>,       // [N, K, T, 2]
}

#[derive(Clone, Debug)]
pub struct FilteredTargets<B: Backend> {
    pub anchors: Tensor<B, 3>,
    pub offsets: Tensor<B, 3>,
    pub targets: Tensor<B, 3>,
    pub confidences: Tensor<B, 2>,
}

#[derive(Module, Debug)]
pub struct TargetDrivenModel<B: Backend> {
    n_targets: usize,
    clamp_targets: bool,
    target_generator: TargetGenerator<B>,
    trajectory_forecaster: TrajectoryForecaster<B>,
}

impl<B: Backend> TargetDrivenModel<B> {
    pub fn target_generator(&self) -> &TargetGenerator<B> {
        &self.target_generator
    }

    pub fn trajectory_forecaster(&self) -> &TrajectoryForecaster<B> {
        &self.trajectory_forecaster
    }

    pub(crate) fn with_parts(
        self,
        target_generator: TargetGenerator<B>,
        trajectory_forecaster: TrajectoryForecaster<B>,
    ) -> Self {
        Self {
            target_generator,
            trajectory_forecaster,
            ..self
        }
    }

    /// Full inference pipeline, forecasting from the top scoring targets of every scene.
    pub fn forward(&self, polylines: Tensor<B, 4>, anchors: Tensor<B, 3>) -> error::Result<ForecastOutput<B>> {
        let (features, offsets, confidences) =
            self.target_generator.forward(polylines, anchors.clone());
        let targets = anchors.clone() + offsets.clone();

        let filtered = self.filter_targets(
            anchors.clone(),
            offsets.clone(),
            targets,
            confidences.clone(),
        )?;

        let forecasts = self
            .trajectory_forecaster
            .forward(features, filtered.targets.clone());

        Ok(ForecastOutput {
            all_anchors: anchors,
            all_offsets: offsets,
            all_confidences: confidences,
            anchors: filtered.anchors,
            offsets: filtered.offsets,
            targets: filtered.targets,
            confidences: filtered.confidences,
            forecasts,
        })
    }

    /// Teacher forced pass: trajectories are forecast for `n_targets` copies of the
    /// ground truth target instead of the generated ones.
    ///
    /// Returns offsets [N, A, 2], confidences [N, A] and forecasts [N, n_targets, T, 2].
    pub fn forward_teacher_forced(
        &self,
        polylines: Tensor<B, 4>,
        anchors: Tensor<B, 3>,
        ground_truth: Tensor<B, 2>,
    ) -> (Tensor<B, 3>, Tensor<B, 2>, Tensor<B, 4>) {
        let (features, offsets, confidences) = self.target_generator.forward(polylines, anchors);

        let ground_truth: Tensor<B, 3> = ground_truth.unsqueeze_dim(1);
        let forecasts = self
            .trajectory_forecaster
            .forward(features, ground_truth.repeat(1, self.n_targets));

        (offsets, confidences, forecasts)
    }

    /// Number of targets kept for scenes with `n_anchors` anchors.
    pub fn targets_for(&self, n_anchors: usize) -> error::Result<usize> {
        if n_anchors >= self.n_targets {
            return Ok(self.n_targets);
        }

        if self.clamp_targets && n_anchors > 0 {
            Ok(n_anchors)
        } else {
            Err(ForecastError::TooFewAnchors {
                n_targets: self.n_targets,
                n_anchors,
            })
        }
    }

    /// Indices of the best anchors of each scene, ranked independently per instance.
    pub fn select_targets(&self, confidences: Tensor<B, 2>) -> error::Result<Tensor<B, 2, Int>> {
        let [batch_size, n_anchors] = confidences.dims();
        let n_selected = self.targets_for(n_anchors)?;
        let device = confidences.device();

        let scores = to_vec(confidences.detach());
        let indices: Vec<usize> = scores
            .chunks(n_anchors)
            .flat_map(|instance| top_k_indices(instance, n_selected))
            .collect();

        Ok(index_tensor(indices, [batch_size, n_selected]).to_device(&device))
    }

    pub fn filter_targets(
        &self,
        anchors: Tensor<B, 3>,
        offsets: Tensor<B, 3>,
        targets: Tensor<B, 3>,
        confidences: Tensor<B, 2>,
    ) -> error::Result<FilteredTargets<B>> {
        let indices = self.select_targets(confidences.clone())?;

        Ok(FilteredTargets {
            anchors: gather_topk(anchors, indices.clone()),
            offsets: gather_topk(offsets, indices.clone()),
            targets: gather_topk(targets, indices.clone()),
            confidences: confidences.gather(1, indices),
        })
    }
}

#[derive(Config, Debug)]
pub struct TargetDrivenModelConfig {
    pub cluster_size: usize,
    pub trajectory_length: usize,
    pub polyline_features: usize,
    pub n_targets: usize,

    #[config(default = 256)]
    pub n_features: usize,

    #[config(default = 64)]
    pub subgraph_hidden: usize,

    #[config(default = 3)]
    pub subgraph_layers: usize,

    #[config(default = 4)]
    pub num_heads: usize,

    #[config(default = 128)]
    pub head_hidden: usize,

    #[config(default = "TargetSelectionPolicy::Strict")]
    pub target_policy: TargetSelectionPolicy,
}

impl TargetDrivenModelConfig {
    pub fn validate(&self) -> error::Result<()> {
        let invalid = |msg: &str| Err(ForecastError::InvalidConfig(msg.to_string()));

        if self.n_targets == 0 {
            return invalid("n_targets must be positive");
        }
        if self.cluster_size == 0 || self.trajectory_length == 0 || self.polyline_features == 0 {
            return invalid("cluster_size, trajectory_length and polyline_features must be positive");
        }
        if self.subgraph_hidden == 0 || self.subgraph_hidden % 2 != 0 {
            return invalid("subgraph_hidden must be a positive even number");
        }
        if self.num_heads == 0 || self.subgraph_hidden % self.num_heads != 0 {
            return invalid("subgraph_hidden must be divisible by num_heads");
        }

        Ok(())
    }

    pub fn init<B: Backend>(&self) -> error::Result<TargetDrivenModel<B>> {
        self.validate()?;

        let target_generator = TargetGeneratorConfig::new(self.cluster_size, self.polyline_features)
            .with_n_features(self.n_features)
            .with_subgraph_hidden(self.subgraph_hidden)
            .with_subgraph_layers(self.subgraph_layers)
            .with_num_heads(self.num_heads)
            .with_head_hidden(self.head_hidden)
            .init();

        let trajectory_forecaster =
            TrajectoryForecasterConfig::new(self.n_features, self.trajectory_length)
                .with_d_hidden(self.head_hidden)
                .init();

        Ok(TargetDrivenModel {
            n_targets: self.n_targets,
            clamp_targets: self.target_policy == TargetSelectionPolicy::Clamp,
            target_generator,
            trajectory_forecaster,
        })
    }
}
