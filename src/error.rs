use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("cannot select {n_targets} targets out of {n_anchors} anchors")]
    TooFewAnchors { n_targets: usize, n_anchors: usize },

    #[error("training config not set")]
    MissingTrainConfig,

    #[error("unknown model type `{0}`, expected `constant_velocity` or `vectornet`")]
    UnknownModel(String),

    #[error("invalid model config: {0}")]
    InvalidConfig(String),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("dataset at {0} contains no scenarios")]
    EmptyDataset(String),

    #[error("record error: {0}")]
    Record(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
