use std::fs;
use std::path::Path;

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use tracing::info;

use crate::error::{ForecastError, Result};
use crate::models::vectornet::{TargetDrivenModel, TargetDrivenModelConfig};

/// Name of the checkpoint written at the end of every epoch.
pub const LAST: &str = "last";

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// Writes `<dir>/<name>.json` (model config) and `<dir>/<name>.mpk` (parameters).
pub fn save_checkpoint<B: Backend, P: AsRef<Path>>(
    model: &TargetDrivenModel<B>,
    config: &TargetDrivenModelConfig,
    dir: P,
    name: &str,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    fs::write(
        dir.join(format!("{name}.json")),
        serde_json::to_string_pretty(config)?,
    )?;
    model
        .clone()
        .save_file(dir.join(name), &recorder())
        .map_err(|err| ForecastError::Record(format!("{err:?}")))?;

    info!("Saved checkpoint {}", dir.join(name).display());
    Ok(())
}

pub fn load_model_config<P: AsRef<Path>>(path: P) -> Result<TargetDrivenModelConfig> {
    let config: TargetDrivenModelConfig = serde_json::from_slice(&fs::read(path)?)?;
    config.validate()?;
    Ok(config)
}

/// Rebuilds a model saved with [`save_checkpoint`]. No training config is needed.
pub fn load_checkpoint<B: Backend, P: AsRef<Path>>(
    dir: P,
    name: &str,
) -> Result<(TargetDrivenModelConfig, TargetDrivenModel<B>)> {
    let dir = dir.as_ref();
    let config = load_model_config(dir.join(format!("{name}.json")))?;

    let model = config
        .init::<B>()?
        .load_file(dir.join(name), &recorder())
        .map_err(|err| ForecastError::Record(format!("{err:?}")))?;

    Ok((config, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::to_vec;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, Tensor};

    type TestBackend = NdArray<f32>;

    #[test]
    fn checkpoint_round_trip_reproduces_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = TargetDrivenModelConfig::new(4, 6, 5, 2)
            .with_n_features(16)
            .with_subgraph_hidden(8)
            .with_head_hidden(16);
        let model: TargetDrivenModel<TestBackend> = config.init().unwrap();

        save_checkpoint(&model, &config, dir.path(), LAST).unwrap();
        let (loaded_config, loaded) = load_checkpoint::<TestBackend, _>(dir.path(), LAST).unwrap();
        assert_eq!(loaded_config.n_targets, 2);
        assert_eq!(loaded_config.trajectory_length, 6);

        let polylines = Tensor::<TestBackend, 4>::random([2, 3, 4, 5], Distribution::Default);
        let anchors = Tensor::<TestBackend, 3>::random([2, 7, 2], Distribution::Default);
        let expected = model.forward(polylines.clone(), anchors.clone()).unwrap();
        let actual = loaded.forward(polylines, anchors).unwrap();

        assert_eq!(to_vec(expected.forecasts), to_vec(actual.forecasts));
        assert_eq!(to_vec(expected.targets), to_vec(actual.targets));
    }

    #[test]
    fn missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_checkpoint::<TestBackend, _>(dir.path(), LAST),
            Err(ForecastError::Io(_))
        ));
    }
}
