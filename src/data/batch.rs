use burn::data::dataloader::batcher::Batcher;
use burn::tensor::{backend::Backend, Tensor};

use crate::utils::float_tensor;

use super::scenario::ScenarioItem;

#[derive(Clone, Debug)]
pub struct ScenarioBatch<B: Backend> {
    pub polylines: Tensor<B, 4>,    // [N, P, L, F]
    pub anchors: Tensor<B, 3>,      // [N, A, 2]
    pub ground_truth: Tensor<B, 2>, // [N, 2]
    pub gt_traj: Tensor<B, 3>,      // [N, T, 2]
}

impl<B: Backend> ScenarioBatch<B> {
    pub fn n_scenarios(&self) -> usize {
        self.ground_truth.dims()[0]
    }
}

pub struct ScenarioBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> ScenarioBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ScenarioItem, ScenarioBatch<B>> for ScenarioBatcher<B> {
    /// Items of one batch must share their shapes, mismatches panic in `cat`.
    fn batch(&self, items: Vec<ScenarioItem>) -> ScenarioBatch<B> {
        let polylines: Vec<Tensor<B, 4>> = items
            .iter()
            .map(|item| {
                let [n_polylines, polyline_length, n_features] = item.polyline_shape();
                let values: Vec<f32> = item.polylines.iter().flatten().flatten().copied().collect();
                float_tensor(values, [1, n_polylines, polyline_length, n_features])
            })
            .collect();

        let anchors: Vec<Tensor<B, 3>> = items
            .iter()
            .map(|item| {
                let values: Vec<f32> = item.anchors.iter().flatten().copied().collect();
                float_tensor(values, [1, item.anchors.len(), 2])
            })
            .collect();

        let ground_truth: Vec<Tensor<B, 2>> = items
            .iter()
            .map(|item| float_tensor(item.ground_truth.to_vec(), [1, 2]))
            .collect();

        let gt_traj: Vec<Tensor<B, 3>> = items
            .iter()
            .map(|item| {
                let values: Vec<f32> = item.gt_traj.iter().flatten().copied().collect();
                float_tensor(values, [1, item.gt_traj.len(), 2])
            })
            .collect();

        ScenarioBatch {
            polylines: Tensor::cat(polylines, 0).to_device(&self.device),
            anchors: Tensor::cat(anchors, 0).to_device(&self.device),
            ground_truth: Tensor::cat(ground_truth, 0).to_device(&self.device),
            gt_traj: Tensor::cat(gt_traj, 0).to_device(&self.device),
        }
    }
}
