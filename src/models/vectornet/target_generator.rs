use burn::config::Config;
use burn::module::Module;
use burn::tensor::{backend::Backend, Tensor};

use crate::modules::mlp::{Mlp, MlpConfig};

use super::global_graph::{GlobalInteractionGraph, GlobalInteractionGraphConfig};
use super::subgraph::{PolylineSubgraph, PolylineSubgraphConfig};

/// Scores candidate anchors and predicts a refining offset for each of them.
#[derive(Module, Debug)]
pub struct TargetGenerator<B: Backend> {
    subgraph: PolylineSubgraph<B>,
    global_graph: GlobalInteractionGraph<B>,
    anchor_head: Mlp<B>,
}

impl<B: Backend> TargetGenerator<B> {
    /// polylines: [N, P, L, F], anchors: [N, A, 2]
    ///
    /// Returns the scene features [N, n_features], offsets [N, A, 2] and unnormalized
    /// confidences [N, A].
    pub fn forward(
        &self,
        polylines: Tensor<B, 4>,
        anchors: Tensor<B, 3>,
    ) -> (Tensor<B, 2>, Tensor<B, 3>, Tensor<B, 2>) {
        let polyline_features = self.subgraph.forward(polylines);
        let features = self.global_graph.forward(polyline_features);

        let [batch_size, n_anchors, _] = anchors.dims();
        let expanded: Tensor<B, 3> = features.clone().unsqueeze_dim(1);
        let x = Tensor::cat(vec![expanded.repeat(1, n_anchors), anchors], 2);
        let x = self.anchor_head.forward(x);

        let offsets = x.clone().slice([0..batch_size, 0..n_anchors, 0..2]);
        let confidences = x
            .slice([0..batch_size, 0..n_anchors, 2..3])
            .reshape([batch_size, n_anchors]);

        (features, offsets, confidences)
    }
}

#[derive(Config, Debug)]
pub struct TargetGeneratorConfig {
    cluster_size: usize,
    polyline_features: usize,

    #[config(default = 256)]
    n_features: usize,

    #[config(default = 64)]
    subgraph_hidden: usize,

    #[config(default = 3)]
    subgraph_layers: usize,

    #[config(default = 4)]
    num_heads: usize,

    #[config(default = 128)]
    head_hidden: usize,
}

impl TargetGeneratorConfig {
    pub fn init<B: Backend>(&self) -> TargetGenerator<B> {
        let subgraph = PolylineSubgraphConfig::new(self.polyline_features, self.cluster_size)
            .with_d_hidden(self.subgraph_hidden)
            .with_num_layers(self.subgraph_layers)
            .init();

        let global_graph = GlobalInteractionGraphConfig::new(self.subgraph_hidden, self.n_features)
            .with_num_heads(self.num_heads)
            .init();

        let anchor_head = MlpConfig::new(self.n_features + 2, self.head_hidden, 3).init();

        TargetGenerator {
            subgraph,
            global_graph,
            anchor_head,
        }
    }
}
