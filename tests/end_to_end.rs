use burn::backend::NdArray;
use burn::tensor::{Distribution, Tensor};

use vectornet::checkpoint::{load_checkpoint, save_checkpoint, LAST};
use vectornet::models::vectornet::{TargetDrivenForecaster, TargetDrivenModelConfig};

type TestBackend = NdArray<f32>;

fn values<const D: usize>(x: Tensor<TestBackend, D>) -> Vec<f32> {
    x.into_data().convert::<f32>().value
}

#[test]
fn forecasts_top_targets_for_full_size_scene() {
    let config = TargetDrivenModelConfig::new(20, 20, 14, 10);
    let forecaster = TargetDrivenForecaster::<TestBackend>::new(config, None).unwrap();

    let polylines = Tensor::<TestBackend, 4>::random([4, 200, 20, 14], Distribution::Normal(0.0, 1.0));
    let anchors = Tensor::<TestBackend, 3>::random([4, 75, 2], Distribution::Normal(0.0, 1.0));

    let outputs = forecaster.forward(polylines, anchors).unwrap();
    assert_eq!(outputs.forecasts.dims(), [4, 10, 20, 2]);
    assert_eq!(outputs.confidences.dims(), [4, 10]);
    assert_eq!(outputs.targets.dims(), [4, 10, 2]);
    assert_eq!(outputs.all_confidences.dims(), [4, 75]);

    let confidences = values(outputs.confidences);
    for instance in confidences.chunks(10) {
        assert!(instance.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn checkpoint_restores_inference_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = TargetDrivenModelConfig::new(20, 30, 14, 6).with_n_features(64);
    let forecaster = TargetDrivenForecaster::<TestBackend>::new(config, None).unwrap();
    save_checkpoint(forecaster.model(), forecaster.config(), dir.path(), LAST).unwrap();

    let (config, model) = load_checkpoint::<TestBackend, _>(dir.path(), LAST).unwrap();
    let restored = TargetDrivenForecaster::from_model(config, model, None);

    let polylines = Tensor::<TestBackend, 4>::random([2, 16, 20, 14], Distribution::Default);
    let anchors = Tensor::<TestBackend, 3>::random([2, 30, 2], Distribution::Default);
    let expected = forecaster.forward(polylines.clone(), anchors.clone()).unwrap();
    let actual = restored.forward(polylines, anchors).unwrap();

    assert_eq!(values(expected.forecasts), values(actual.forecasts));
    assert_eq!(values(expected.confidences), values(actual.confidences));
}
