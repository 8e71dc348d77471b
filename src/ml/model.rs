use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::domain::error::{PipelineError, PipelineResult};

/// The only thing the training loop and evaluator know about a model:
/// images `[N, 1, H, W]` in, one logit vector per image `[N, classes]` out.
///
/// Implemented for every backend so the same architecture serves the
/// autodiff training pass and the plain validation/inference pass.
pub trait ImageClassifier<B: Backend> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct CharCnnConfig {
    pub num_classes:   usize,
    /// Square kernel size of each of the three conv blocks.
    #[config(default = "[4, 4, 4]")]
    pub filter_sizes:  [usize; 3],
    /// Output channels of each conv block.
    #[config(default = "[32, 64, 128]")]
    pub channels:      [usize; 3],
    /// Zero, one or two hidden Linear layers before the head.
    #[config(default = "Vec::new()")]
    pub hidden_layers: Vec<usize>,
}

impl CharCnnConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.num_classes == 0 {
            return Err(PipelineError::config("model needs at least one class"));
        }
        if self.filter_sizes.contains(&0) {
            return Err(PipelineError::config("conv filter sizes must be positive"));
        }
        if self.channels.contains(&0) {
            return Err(PipelineError::config("conv channel widths must be positive"));
        }
        if self.hidden_layers.len() > 2 || self.hidden_layers.contains(&0) {
            return Err(PipelineError::config(
                "hidden layers must be absent or one/two positive sizes",
            ));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> CharCnn<B> {
        let mut in_channels = 1;
        let blocks = self
            .filter_sizes
            .iter()
            .zip(self.channels)
            .map(|(&k, out)| {
                let block = ConvBlock {
                    conv: Conv2dConfig::new([in_channels, out], [k, k])
                        .with_padding(PaddingConfig2d::Explicit(k / 2, k / 2))
                        .init(device),
                    pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
                    activation: Relu::new(),
                };
                in_channels = out;
                block
            })
            .collect();

        let mut width = in_channels;
        let hidden = self
            .hidden_layers
            .iter()
            .map(|&size| {
                let layer = LinearConfig::new(width, size).init(device);
                width = size;
                layer
            })
            .collect();

        CharCnn {
            blocks,
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            hidden,
            head: LinearConfig::new(width, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv:       Conv2d<B>,
    pub pool:       MaxPool2d,
    pub activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(self.activation.forward(self.conv.forward(x)))
    }
}

/// Three conv → ReLU → max-pool blocks, global average pooling, optional
/// hidden layers and a linear classification head.
#[derive(Module, Debug)]
pub struct CharCnn<B: Backend> {
    pub blocks:      Vec<ConvBlock<B>>,
    pub global_pool: AdaptiveAvgPool2d,
    pub hidden:      Vec<Linear<B>>,
    pub head:        Linear<B>,
    pub activation:  Relu,
}

impl<B: Backend> ImageClassifier<B> for CharCnn<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for block in &self.blocks {
            x = block.forward(x);
        }
        // [N, C, 1, 1] → [N, C]
        let mut x = self.global_pool.forward(x).flatten::<2>(1, 3);
        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }
        self.head.forward(x)
    }
}
