use burn::config::Config;
use burn::module::Module;
use burn::nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig};
use burn::tensor::activation;
use burn::tensor::{backend::Backend, Tensor};

/// Linear -> LayerNorm -> ReLU
#[derive(Module, Debug)]
pub struct MlpBlock<B: Backend> {
    linear: Linear<B>,
    norm: LayerNorm<B>,
}

impl<B: Backend> MlpBlock<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let x = self.linear.forward(x);
        let x = self.norm.forward(x);

        activation::relu(x)
    }
}

#[derive(Config, Debug)]
pub struct MlpBlockConfig {
    d_input: usize,
    d_output: usize,
}

impl MlpBlockConfig {
    pub fn init<B: Backend>(&self) -> MlpBlock<B> {
        MlpBlock {
            linear: LinearConfig::new(self.d_input, self.d_output).init(),
            norm: LayerNormConfig::new(self.d_output).init(),
        }
    }
}

/// Stack of hidden [`MlpBlock`]s followed by a plain linear projection.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    hidden: Vec<MlpBlock<B>>,
    output: Linear<B>,
}

impl<B: Backend> Mlp<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let x = self.hidden.iter().fold(x, |x, block| block.forward(x));

        self.output.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct MlpConfig {
    d_input: usize,
    d_hidden: usize,
    d_output: usize,

    #[config(default = 2)]
    num_hidden: usize,
}

impl MlpConfig {
    pub fn init<B: Backend>(&self) -> Mlp<B> {
        let hidden: Vec<MlpBlock<B>> = (0..self.num_hidden)
            .map(|i| {
                let d_input = if i == 0 { self.d_input } else { self.d_hidden };
                MlpBlockConfig::new(d_input, self.d_hidden).init()
            })
            .collect();

        let d_last = if self.num_hidden == 0 {
            self.d_input
        } else {
            self.d_hidden
        };

        Mlp {
            hidden,
            output: LinearConfig::new(d_last, self.d_output).init(),
        }
    }
}
