use burn::config::Config;
use burn::module::Module;
use burn::nn::attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig};
use burn::nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig};
use burn::tensor::activation;
use burn::tensor::{backend::Backend, Tensor};

/// Self-attention over the polylines of a scene, read out at the agent polyline.
#[derive(Module, Debug)]
pub struct GlobalInteractionGraph<B: Backend> {
    attention: MultiHeadAttention<B>,
    norm: LayerNorm<B>,
    output_proj: Linear<B>,
}

impl<B: Backend> GlobalInteractionGraph<B> {
    /// polylines: [batch, n_polylines, d_input] -> [batch, d_output]
    pub fn forward(&self, polylines: Tensor<B, 3>) -> Tensor<B, 2> {
        let mha_output = self
            .attention
            .forward(MhaInput::self_attn(polylines.clone()));
        let x = self.norm.forward(polylines + mha_output.context);

        // agent polyline is always first
        let agent = {
            let [batch_size, _, d_input] = x.dims();
            x.slice([0..batch_size, 0..1, 0..d_input])
                .reshape([batch_size, d_input])
        };

        activation::relu(self.output_proj.forward(agent))
    }
}

#[derive(Config, Debug)]
pub struct GlobalInteractionGraphConfig {
    d_input: usize,
    d_output: usize,

    #[config(default = 4)]
    num_heads: usize,

    #[config(default = 0.0)]
    dropout: f64,
}

impl GlobalInteractionGraphConfig {
    pub fn init<B: Backend>(&self) -> GlobalInteractionGraph<B> {
        let attention = MultiHeadAttentionConfig::new(self.d_input, self.num_heads)
            .with_dropout(self.dropout)
            .init();

        GlobalInteractionGraph {
            attention,
            norm: LayerNormConfig::new(self.d_input).init(),
            output_proj: LinearConfig::new(self.d_input, self.d_output).init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    #[test]
    fn reads_out_scene_feature() {
        let graph: GlobalInteractionGraph<TestBackend> =
            GlobalInteractionGraphConfig::new(32, 256).init();
        let polylines = Tensor::<TestBackend, 3>::random([3, 11, 32], Distribution::Default);

        assert_eq!(graph.forward(polylines).dims(), [3, 256]);
    }
}
