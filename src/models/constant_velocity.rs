use burn::tensor::{backend::Backend, Tensor};

use crate::utils::float_tensor;

/// Baseline that keeps the agent moving with the velocity of its last observed vector.
#[derive(Clone, Debug)]
pub struct ConstantVelocityModel {
    trajectory_length: usize,
}

impl ConstantVelocityModel {
    pub fn new(trajectory_length: usize) -> Self {
        Self { trajectory_length }
    }

    /// polylines: [N, P, L, F] with F >= 4 -> one trajectory per scene [N, 1, T, 2]
    pub fn forward<B: Backend>(&self, polylines: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch_size, _, polyline_length, _] = polylines.dims();
        let device = polylines.device();

        let last = polylines
            .slice([0..batch_size, 0..1, polyline_length - 1..polyline_length, 0..4])
            .reshape([batch_size, 1, 4]);
        let start = last.clone().slice([0..batch_size, 0..1, 0..2]);
        let end = last.slice([0..batch_size, 0..1, 2..4]);
        let velocity = (end.clone() - start).repeat(1, self.trajectory_length);

        let steps: Tensor<B, 3> = float_tensor(
            (1..=self.trajectory_length).map(|t| t as f32).collect(),
            [1, self.trajectory_length, 1],
        )
        .to_device(&device);

        (end + velocity * steps).reshape([batch_size, 1, self.trajectory_length, 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::to_vec;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn extrapolates_last_vector() {
        // agent: (0,0)->(1,0), (1,0)->(2,1); second polyline is ignored
        let polylines = float_tensor::<TestBackend, 4>(
            vec![
                0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 2.0, 1.0, //
                9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0,
            ],
            [1, 2, 2, 4],
        );

        let trajectory = ConstantVelocityModel::new(3).forward(polylines);
        assert_eq!(trajectory.dims(), [1, 1, 3, 2]);
        assert_eq!(to_vec(trajectory), vec![3.0, 2.0, 4.0, 3.0, 5.0, 4.0]);
    }
}
