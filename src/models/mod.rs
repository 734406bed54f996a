pub mod constant_velocity;
pub mod vectornet;

use std::fmt;
use std::str::FromStr;

use burn::tensor::{backend::Backend, Tensor};

use crate::error::{ForecastError, Result};
use constant_velocity::ConstantVelocityModel;
use vectornet::{TargetDrivenModel, TargetDrivenModelConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    ConstantVelocity,
    VectorNet,
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "constant_velocity" => Ok(ModelKind::ConstantVelocity),
            "vectornet" => Ok(ModelKind::VectorNet),
            _ => Err(ForecastError::UnknownModel(name.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::ConstantVelocity => write!(f, "constant_velocity"),
            ModelKind::VectorNet => write!(f, "vectornet"),
        }
    }
}

#[derive(Debug)]
pub enum ForecastModel<B: Backend> {
    ConstantVelocity(ConstantVelocityModel),
    VectorNet(TargetDrivenModel<B>),
}

impl<B: Backend> ForecastModel<B> {
    pub fn kind(&self) -> ModelKind {
        match self {
            ForecastModel::ConstantVelocity(_) => ModelKind::ConstantVelocity,
            ForecastModel::VectorNet(_) => ModelKind::VectorNet,
        }
    }

    /// Trajectory hypotheses [N, K, T, 2] for every scene of the batch.
    pub fn predict(&self, polylines: Tensor<B, 4>, anchors: Tensor<B, 3>) -> Result<Tensor<B, 4>> {
        match self {
            ForecastModel::ConstantVelocity(model) => Ok(model.forward(polylines)),
            ForecastModel::VectorNet(model) => Ok(model.forward(polylines, anchors)?.forecasts),
        }
    }
}

pub fn model_factory<B: Backend>(
    kind: ModelKind,
    config: &TargetDrivenModelConfig,
) -> Result<ForecastModel<B>> {
    match kind {
        ModelKind::ConstantVelocity => Ok(ForecastModel::ConstantVelocity(
            ConstantVelocityModel::new(config.trajectory_length),
        )),
        ModelKind::VectorNet => Ok(ForecastModel::VectorNet(config.init()?)),
    }
}
