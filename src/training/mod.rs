pub mod config;
pub mod log_history;
pub mod optim;
pub mod scheduler;
pub mod trainer;

pub use config::{TrainerConfig, TrainingConfig};
pub use log_history::{LogHistory, Metric};
pub use optim::{DualOptimizer, OptimizerSetup};
pub use scheduler::StepDecay;
pub use trainer::Trainer;
