use std::collections::BTreeMap;

use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::Dataset;
use burn::tensor::backend::AutodiffBackend;
use tracing::info;

use crate::checkpoint::{save_checkpoint, LAST};
use crate::data::{ScenarioBatcher, ScenarioItem};
use crate::error::{ForecastError, Result};
use crate::models::vectornet::{TargetDrivenForecaster, TargetDrivenModelConfig};

use super::config::{TrainerConfig, TrainingConfig};
use super::log_history::Metric;
use super::optim::DualOptimizer;

/// Epoch loop around the forecaster's step hooks.
pub struct Trainer<B: AutodiffBackend> {
    config: TrainerConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(config: TrainerConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Seeds the backend, then initializes the forecaster so its weights follow the seed.
    pub fn init_forecaster(
        &self,
        model_config: TargetDrivenModelConfig,
        train_config: TrainingConfig,
    ) -> Result<TargetDrivenForecaster<B>> {
        B::seed(self.config.seed);
        TargetDrivenForecaster::new(model_config, Some(train_config))
    }

    /// Trains for `num_epochs`, returning the metrics emitted at the end of every epoch.
    ///
    /// A `last` checkpoint is written to the artifact directory after each epoch. Fails if
    /// a split yields fewer scenarios than it holds, e.g. when a file cannot be read.
    pub fn fit<O, DT, DV>(
        &self,
        forecaster: &mut TargetDrivenForecaster<B>,
        optim: &mut O,
        train: DT,
        valid: DV,
    ) -> Result<Vec<BTreeMap<Metric, f64>>>
    where
        O: DualOptimizer<B>,
        DT: Dataset<ScenarioItem> + 'static,
        DV: Dataset<ScenarioItem> + 'static,
    {
        if train.is_empty() {
            return Err(ForecastError::EmptyDataset("training split".into()));
        }

        let (n_train, n_valid) = (train.len(), valid.len());
        info!("Training on {} scenarios, validating on {}", n_train, n_valid);

        let mut builder = DataLoaderBuilder::new(ScenarioBatcher::<B>::new(self.device.clone()))
            .batch_size(self.config.batch_size)
            .shuffle(self.config.seed);
        if self.config.num_workers > 0 {
            builder = builder.num_workers(self.config.num_workers);
        }
        let dataloader_train = builder.build(train);

        let mut builder = DataLoaderBuilder::new(ScenarioBatcher::<B::InnerBackend>::new(
            self.device.clone(),
        ))
        .batch_size(self.config.batch_size);
        if self.config.num_workers > 0 {
            builder = builder.num_workers(self.config.num_workers);
        }
        let dataloader_valid = builder.build(valid);

        let mut history = Vec::with_capacity(self.config.num_epochs);
        for epoch in 1..=self.config.num_epochs {
            let mut seen = 0;
            for batch in dataloader_train.iter() {
                seen += batch.n_scenarios();
                let loss = forecaster.training_step(&batch);
                forecaster.apply_gradients(optim, loss.backward());
            }
            check_split("training", seen, n_train)?;

            let mut seen = 0;
            for batch in dataloader_valid.iter() {
                seen += batch.n_scenarios();
                forecaster.valid_step(&batch)?;
            }
            check_split("validation", seen, n_valid)?;

            let metrics = forecaster.on_validation_epoch_end();
            let tg_lr = optim.on_epoch_end();
            info!(
                "Epoch {}/{} done, target generator lr {:e}",
                epoch, self.config.num_epochs, tg_lr
            );

            save_checkpoint(
                forecaster.model(),
                forecaster.config(),
                &self.config.artifact_dir,
                LAST,
            )?;
            history.push(metrics);
        }

        Ok(history)
    }
}

fn check_split(split: &str, seen: usize, expected: usize) -> Result<()> {
    if seen == expected {
        return Ok(());
    }

    Err(ForecastError::InvalidScenario(format!(
        "{split} split yielded {seen} of {expected} scenarios"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scenario::tests::synthetic_item;
    use crate::data::ScenarioDataset;
    use crate::models::vectornet::TargetDrivenModelConfig;
    use crate::training::config::TrainingConfig;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataset::InMemDataset;

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn dataset(offset: usize, len: usize) -> InMemDataset<ScenarioItem> {
        InMemDataset::new((offset..offset + len).map(|i| synthetic_item(i, 3, 8)).collect())
    }

    fn forecaster() -> TargetDrivenForecaster<TestAutodiffBackend> {
        TargetDrivenForecaster::new(
            TargetDrivenModelConfig::new(4, 6, 5, 3)
                .with_n_features(16)
                .with_subgraph_hidden(8)
                .with_head_hidden(16),
            Some(TrainingConfig::new(1e-3, 1e-3, 1, 0.5)),
        )
        .unwrap()
    }

    #[test]
    fn fits_and_checkpoints_every_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let model_config = TargetDrivenModelConfig::new(4, 6, 5, 3)
            .with_n_features(16)
            .with_subgraph_hidden(8)
            .with_head_hidden(16);
        let mut forecaster = TargetDrivenForecaster::<TestAutodiffBackend>::new(
            model_config,
            Some(TrainingConfig::new(1e-3, 1e-3, 1, 0.5)),
        )
        .unwrap();
        let mut optim = forecaster.configure_optimizers().unwrap();

        let trainer_config = TrainerConfig::new()
            .with_num_epochs(2)
            .with_batch_size(2)
            .with_num_workers(0)
            .with_artifact_dir(dir.path().display().to_string());
        let trainer = Trainer::<TestAutodiffBackend>::new(trainer_config, Default::default());

        let history = trainer
            .fit(&mut forecaster, &mut optim, dataset(0, 5), dataset(5, 2))
            .unwrap();

        assert_eq!(history.len(), 2);
        for metrics in history.iter() {
            assert_eq!(metrics.len(), Metric::ALL.len());
        }
        assert_eq!(optim.tg_lr(), 2.5e-4);
        assert_eq!(optim.tf_lr(), 1e-3);
        assert!(dir.path().join("last.json").exists());
        assert!(dir.path().join("last.mpk").exists());
    }

    #[test]
    fn unreadable_training_scenario_fails_the_epoch() {
        let scenes = tempfile::tempdir().unwrap();
        for i in 0..5 {
            let path = scenes.path().join(format!("s{i}.json"));
            if i == 1 {
                std::fs::write(path, "{").unwrap();
            } else {
                synthetic_item(i, 3, 8).save(path).unwrap();
            }
        }
        let train = ScenarioDataset::new(scenes.path()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut forecaster = forecaster();
        let mut optim = forecaster.configure_optimizers().unwrap();
        let trainer = Trainer::<TestAutodiffBackend>::new(
            TrainerConfig::new()
                .with_num_epochs(1)
                .with_batch_size(2)
                .with_num_workers(0)
                .with_artifact_dir(dir.path().display().to_string()),
            Default::default(),
        );

        assert!(matches!(
            trainer.fit(&mut forecaster, &mut optim, train, dataset(5, 1)),
            Err(ForecastError::InvalidScenario(_))
        ));
        assert!(!dir.path().join("last.mpk").exists());
    }

    #[test]
    fn empty_training_split_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut forecaster = forecaster();
        let mut optim = forecaster.configure_optimizers().unwrap();
        let trainer = Trainer::<TestAutodiffBackend>::new(
            TrainerConfig::new().with_artifact_dir(dir.path().display().to_string()),
            Default::default(),
        );

        assert!(matches!(
            trainer.fit(&mut forecaster, &mut optim, dataset(0, 0), dataset(0, 1)),
            Err(ForecastError::EmptyDataset(_))
        ));
    }
}
