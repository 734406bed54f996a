pub mod forecaster;
pub mod global_graph;
pub mod loss;
pub mod model;
pub mod subgraph;
pub mod target_generator;
pub mod trajectory_forecaster;

pub use forecaster::TargetDrivenForecaster;
pub use loss::{LiteTntLoss, LiteTntLossConfig, LossOutput};
pub use model::{
    FilteredTargets, ForecastOutput, TargetDrivenModel, TargetDrivenModelConfig,
    TargetSelectionPolicy,
};
pub use target_generator::{TargetGenerator, TargetGeneratorConfig};
pub use trajectory_forecaster::{TrajectoryForecaster, TrajectoryForecasterConfig};
