use burn::config::Config;
use burn::module::Module;
use burn::tensor::{backend::Backend, Tensor};

use crate::modules::mlp::{MlpBlock, MlpBlockConfig};

/// Encodes every polyline of a scene into a single vector.
///
/// Each layer encodes the polyline's vectors independently, max-pools them into a
/// polyline summary and appends that summary back to every vector. The last layer's
/// output is max-pooled once more to give one embedding per polyline.
#[derive(Module, Debug)]
pub struct PolylineSubgraph<B: Backend> {
    cluster_size: usize,
    d_hidden: usize,
    layers: Vec<MlpBlock<B>>,
}

impl<B: Backend> PolylineSubgraph<B> {
    /// polylines: [batch, n_polylines, cluster_size, n_features] -> [batch, n_polylines, d_hidden]
    pub fn forward(&self, polylines: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch_size, n_polylines, _, n_features] = polylines.dims();
        let x = polylines.reshape([batch_size * n_polylines, self.cluster_size, n_features]);

        let x = self.layers.iter().fold(x, |x, layer| {
            let encoded = layer.forward(x);
            let pooled = encoded.clone().max_dim(1).repeat(1, self.cluster_size);
            Tensor::cat(vec![encoded, pooled], 2)
        });

        x.max_dim(1)
            .reshape([batch_size, n_polylines, self.d_hidden])
    }
}

#[derive(Config, Debug)]
pub struct PolylineSubgraphConfig {
    polyline_features: usize,
    cluster_size: usize,

    #[config(default = 64)]
    d_hidden: usize,

    #[config(default = 3)]
    num_layers: usize,
}

impl PolylineSubgraphConfig {
    pub fn init<B: Backend>(&self) -> PolylineSubgraph<B> {
        assert!(self.num_layers > 0);
        assert!(self.d_hidden % 2 == 0);

        let layers: Vec<MlpBlock<B>> = (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 {
                    self.polyline_features
                } else {
                    self.d_hidden
                };
                MlpBlockConfig::new(d_input, self.d_hidden / 2).init()
            })
            .collect();

        PolylineSubgraph {
            cluster_size: self.cluster_size,
            d_hidden: self.d_hidden,
            layers,
        }
    }
}
