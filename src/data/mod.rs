pub mod batch;
pub mod scenario;

pub use batch::{ScenarioBatch, ScenarioBatcher};
pub use scenario::{ScenarioDataset, ScenarioItem};
