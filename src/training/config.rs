use burn::config::Config;

/// Optimizer settings of the two sub-networks.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Target generator learning rate.
    pub tg_lr: f64,
    /// Trajectory forecaster learning rate.
    pub tf_lr: f64,
    /// Epochs between target generator learning rate decays.
    pub tg_sched_step: usize,
    /// Target generator learning rate decay factor.
    pub tg_sched_gamma: f64,
}

#[derive(Config, Debug)]
pub struct TrainerConfig {
    #[config(default = 10)]
    pub num_epochs: usize,

    #[config(default = 32)]
    pub batch_size: usize,

    #[config(default = 2)]
    pub num_workers: usize,

    #[config(default = 42)]
    pub seed: u64,

    #[config(default = "String::from(\"artifacts\")")]
    pub artifact_dir: String,
}
