use burn::tensor::activation::log_softmax;
use burn::tensor::{backend::Backend, Data, Int, Shape, Tensor};

/// Smooth-L1 loss averaged over every element: quadratic below `delta`, linear above.
pub fn huber_loss<B: Backend, const D: usize>(
    pred: Tensor<B, D>,
    target: Tensor<B, D>,
    delta: f32,
) -> Tensor<B, 1> {
    let diff = (pred - target).abs();
    let quadratic = diff.clone().clamp_max(delta);
    let linear = diff - quadratic.clone();

    (quadratic.clone() * quadratic * 0.5 + linear * delta).mean()
}

/// Mean negative log likelihood of `classes` ([N]) under the unnormalized `logits` ([N, C]).
pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, classes: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [batch_size] = classes.dims();
    let log_probs = log_softmax(logits, 1);
    let picked = log_probs.gather(1, classes.reshape([batch_size, 1]));

    picked.mean().neg()
}

/// Index of the anchor closest to each ground truth point.
///
/// anchors: [N, A, 2], ground_truth: [N, 2] -> [N]
pub fn closest_anchor<B: Backend>(
    anchors: Tensor<B, 3>,
    ground_truth: Tensor<B, 2>,
) -> Tensor<B, 1, Int> {
    let [batch_size, _, _] = anchors.dims();
    let ground_truth: Tensor<B, 3> = ground_truth.unsqueeze_dim(1);
    let diff = anchors - ground_truth;
    let distance = (diff.clone() * diff).sum_dim(2);

    distance.argmin(1).reshape([batch_size])
}

/// Picks one row per batch instance: x [N, A, C], indices [N] -> [N, C]
pub fn gather_rows<B: Backend>(x: Tensor<B, 3>, indices: Tensor<B, 1, Int>) -> Tensor<B, 2> {
    let [batch_size, _, channels] = x.dims();
    let indices = indices.reshape([batch_size, 1, 1]);
    let indices = Tensor::cat(vec![indices; channels], 2);

    x.gather(1, indices).reshape([batch_size, channels])
}

/// Gathers `k` rows per batch instance: x [N, A, C], indices [N, K] -> [N, K, C]
pub fn gather_topk<B: Backend>(x: Tensor<B, 3>, indices: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    let [_, _, channels] = x.dims();
    let indices: Tensor<B, 3, Int> = indices.unsqueeze_dim(2);

    x.gather(1, Tensor::cat(vec![indices; channels], 2))
}

/// Positions of the `k` largest scores, highest first.
///
/// Ties keep ascending index order and NaN ranks by IEEE total order, so the result is
/// deterministic for any input.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(k);
    order
}

pub fn index_tensor<B: Backend, const D: usize>(
    indices: Vec<usize>,
    shape: [usize; D],
) -> Tensor<B, D, Int> {
    let values: Vec<i64> = indices.into_iter().map(|i| i as i64).collect();
    let data = Data::new(values, Shape::new(shape));

    Tensor::from_data(data.convert())
}

pub fn float_tensor<B: Backend, const D: usize>(values: Vec<f32>, shape: [usize; D]) -> Tensor<B, D> {
    let data = Data::new(values, Shape::new(shape));

    Tensor::from_data(data.convert())
}

pub fn to_vec<B: Backend, const D: usize>(x: Tensor<B, D>) -> Vec<f32> {
    x.into_data().convert::<f32>().value
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn huber_is_quadratic_then_linear() {
        let pred = float_tensor::<TestBackend, 1>(vec![0.5, 3.0], [2]);
        let target = float_tensor::<TestBackend, 1>(vec![0.0, 0.0], [2]);

        // 0.5 * 0.25 = 0.125 and 1.0 * (3.0 - 0.5) = 2.5
        let loss = to_vec(huber_loss(pred, target, 1.0));
        assert!((loss[0] - (0.125 + 2.5) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn cross_entropy_of_uniform_logits() {
        let logits = Tensor::<TestBackend, 2>::zeros([2, 4]);
        let classes = index_tensor::<TestBackend, 1>(vec![0, 3], [2]);

        let loss = to_vec(cross_entropy(logits, classes));
        assert!((loss[0] - 4f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn closest_anchor_per_instance() {
        let anchors = float_tensor::<TestBackend, 3>(
            vec![0.0, 0.0, 5.0, 5.0, 10.0, 0.0, 0.0, 0.0, 5.0, 5.0, 10.0, 0.0],
            [2, 3, 2],
        );
        let ground_truth = float_tensor::<TestBackend, 2>(vec![4.0, 6.0, 9.0, 1.0], [2, 2]);

        let closest = closest_anchor(anchors, ground_truth).into_data().convert::<i64>().value;
        assert_eq!(closest, vec![1, 2]);
    }

    #[test]
    fn gathers_rows_by_index() {
        let x = float_tensor::<TestBackend, 3>((0..12).map(|v| v as f32).collect(), [2, 3, 2]);
        let rows = to_vec(gather_rows(x.clone(), index_tensor(vec![2, 0], [2])));
        assert_eq!(rows, vec![4.0, 5.0, 6.0, 7.0]);

        let topk = to_vec(gather_topk(x, index_tensor(vec![1, 0, 2, 1], [2, 2])));
        assert_eq!(topk, vec![2.0, 3.0, 0.0, 1.0, 10.0, 11.0, 8.0, 9.0]);
    }

    #[test]
    fn top_k_is_descending_and_stable() {
        let scores = [0.3, 0.9, 0.3, -1.0, 0.9];
        assert_eq!(top_k_indices(&scores, 3), vec![1, 4, 0]);
        assert_eq!(top_k_indices(&scores, 10), vec![1, 4, 0, 2, 3]);
        assert!(top_k_indices(&scores, 0).is_empty());
    }
}
