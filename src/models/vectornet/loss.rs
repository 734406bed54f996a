use burn::config::Config;
use burn::tensor::{backend::Backend, ElementConversion, Tensor};

use crate::utils::{closest_anchor, cross_entropy, gather_rows, huber_loss};

/// Every term of the composite loss. `total` is the one to optimize.
#[derive(Clone, Debug)]
pub struct LossOutput<B: Backend> {
    pub total: Tensor<B, 1>,
    pub confidence: Tensor<B, 1>,
    pub offset: Tensor<B, 1>,
    pub forecast: Tensor<B, 1>,
}

impl<B: Backend> LossOutput<B> {
    /// Detached host values in (total, confidence, offset, forecast) order.
    pub fn scalars(&self) -> [f64; 4] {
        [
            scalar(self.total.clone()),
            scalar(self.confidence.clone()),
            scalar(self.offset.clone()),
            scalar(self.forecast.clone()),
        ]
    }
}

pub fn scalar<B: Backend>(x: Tensor<B, 1>) -> f64 {
    x.detach().into_scalar().elem::<f64>()
}

/// Target confidence, target offset and trajectory terms of TNT.
#[derive(Clone, Debug)]
pub struct LiteTntLoss {
    confidence_weight: f32,
    offset_weight: f32,
    forecast_weight: f32,
    huber_delta: f32,
}

impl LiteTntLoss {
    /// anchors/offsets: [N, A, 2], confidences: [N, A], ground_truth: [N, 2],
    /// forecasts: [N, K, T, 2], gt_traj: [N, T, 2]
    pub fn forward<B: Backend>(
        &self,
        anchors: Tensor<B, 3>,
        offsets: Tensor<B, 3>,
        confidences: Tensor<B, 2>,
        ground_truth: Tensor<B, 2>,
        forecasts: Tensor<B, 4>,
        gt_traj: Tensor<B, 3>,
    ) -> LossOutput<B> {
        let closest = closest_anchor(anchors.clone(), ground_truth.clone());

        let confidence = cross_entropy(confidences, closest.clone());

        let closest_anchors = gather_rows(anchors, closest.clone());
        let closest_offsets = gather_rows(offsets, closest);
        let offset = huber_loss(closest_offsets, ground_truth - closest_anchors, self.huber_delta);

        let [_, n_targets, _, _] = forecasts.dims();
        let gt_traj: Tensor<B, 4> = gt_traj.unsqueeze_dim(1);
        let forecast = huber_loss(forecasts, gt_traj.repeat(1, n_targets), self.huber_delta);

        let total = self.combine(confidence.clone(), offset.clone(), forecast.clone());

        LossOutput {
            total,
            confidence,
            offset,
            forecast,
        }
    }

    pub fn combine<B: Backend>(
        &self,
        confidence: Tensor<B, 1>,
        offset: Tensor<B, 1>,
        forecast: Tensor<B, 1>,
    ) -> Tensor<B, 1> {
        confidence * self.confidence_weight
            + offset * self.offset_weight
            + forecast * self.forecast_weight
    }
}

#[derive(Config, Debug)]
pub struct LiteTntLossConfig {
    #[config(default = 0.1)]
    confidence_weight: f32,

    #[config(default = 1.0)]
    offset_weight: f32,

    #[config(default = 1.0)]
    forecast_weight: f32,

    #[config(default = 1.0)]
    huber_delta: f32,
}

impl LiteTntLossConfig {
    pub fn init(&self) -> LiteTntLoss {
        LiteTntLoss {
            confidence_weight: self.confidence_weight,
            offset_weight: self.offset_weight,
            forecast_weight: self.forecast_weight,
            huber_delta: self.huber_delta,
        }
    }
}

impl Default for LiteTntLoss {
    fn default() -> Self {
        LiteTntLossConfig::new().init()
    }
}
