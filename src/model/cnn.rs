//! CNN Architecture for Bird Species Classification
//!
//! Implements a MobileNet-style network with the Burn framework: a
//! standard convolutional stem followed by depthwise separable blocks,
//! global average pooling, and a small fully connected head over the
//! species vocabulary.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the BirdNet model
#[derive(Config, Debug)]
pub struct BirdNetConfig {
    /// Number of output classes
    #[config(default = 200)]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = 224)]
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = 3)]
    pub in_channels: usize,

    /// Base number of convolutional filters
    #[config(default = 32)]
    pub base_filters: usize,

    /// Units in the fully connected layer before the classifier
    #[config(default = 512)]
    pub hidden_units: usize,

    /// Dropout rate inside each depthwise block
    #[config(default = 0.25)]
    pub block_dropout: f64,

    /// Dropout rate in the classifier head
    #[config(default = 0.3)]
    pub head_dropout: f64,
}

impl BirdNetConfig {
    /// Initialize a model from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> BirdNet<B> {
        BirdNet::new(self, device)
    }
}

/// A depthwise separable block: depthwise 3x3 conv, pointwise 1x1 conv,
/// each followed by batch norm and ReLU, then 2x2 max pooling and dropout.
#[derive(Module, Debug)]
pub struct DepthwiseBlock<B: Backend> {
    depthwise: Conv2d<B>,
    bn1: BatchNorm<B>,
    pointwise: Conv2d<B>,
    bn2: BatchNorm<B>,
    relu: Relu,
    pool: MaxPool2d,
    dropout: Dropout,
}

impl<B: Backend> DepthwiseBlock<B> {
    /// Create a new depthwise separable block
    pub fn new(in_channels: usize, out_channels: usize, dropout: f64, device: &B::Device) -> Self {
        let depthwise = Conv2dConfig::new([in_channels, in_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .with_groups(in_channels)
            .init(device);
        let bn1 = BatchNormConfig::new(in_channels).init(device);

        let pointwise = Conv2dConfig::new([in_channels, out_channels], [1, 1]).init(device);
        let bn2 = BatchNormConfig::new(out_channels).init(device);

        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let dropout = DropoutConfig::new(dropout).init();

        Self {
            depthwise,
            bn1,
            pointwise,
            bn2,
            relu: Relu::new(),
            pool,
            dropout,
        }
    }

    /// Forward pass through the block, halving the spatial resolution
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.depthwise.forward(x);
        let x = self.bn1.forward(x);
        let x = self.relu.forward(x);

        let x = self.pointwise.forward(x);
        let x = self.bn2.forward(x);
        let x = self.relu.forward(x);

        let x = self.pool.forward(x);
        self.dropout.forward(x)
    }
}

/// Bird species classifier
///
/// Architecture:
/// - Conv stem (3x3, same padding) with BatchNorm and ReLU
/// - 4 depthwise separable blocks with doubling filter counts,
///   each halving the spatial resolution
/// - Global average pooling
/// - Fully connected layer with ReLU and dropout
/// - Linear classifier over the species vocabulary
#[derive(Module, Debug)]
pub struct BirdNet<B: Backend> {
    stem_conv: Conv2d<B>,
    stem_bn: BatchNorm<B>,

    block1: DepthwiseBlock<B>,
    block2: DepthwiseBlock<B>,
    block3: DepthwiseBlock<B>,
    block4: DepthwiseBlock<B>,

    global_pool: AdaptiveAvgPool2d,

    fc1: Linear<B>,
    dropout: Dropout,
    fc2: Linear<B>,

    relu: Relu,
    num_classes: usize,
}

impl<B: Backend> BirdNet<B> {
    /// Create a new BirdNet from configuration
    pub fn new(config: &BirdNetConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        let stem_conv = Conv2dConfig::new([config.in_channels, base], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let stem_bn = BatchNormConfig::new(base).init(device);

        // Channels: base -> 2b -> 4b -> 8b, resolution halved per block
        let block1 = DepthwiseBlock::new(base, base * 2, config.block_dropout, device);
        let block2 = DepthwiseBlock::new(base * 2, base * 4, config.block_dropout, device);
        let block3 = DepthwiseBlock::new(base * 4, base * 8, config.block_dropout, device);
        let block4 = DepthwiseBlock::new(base * 8, base * 8, config.block_dropout, device);

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        let fc1 = LinearConfig::new(base * 8, config.hidden_units).init(device);
        let dropout = DropoutConfig::new(config.head_dropout).init();
        let fc2 = LinearConfig::new(config.hidden_units, config.num_classes).init(device);

        Self {
            stem_conv,
            stem_bn,
            block1,
            block2,
            block3,
            block4,
            global_pool,
            fc1,
            dropout,
            fc2,
            relu: Relu::new(),
            num_classes: config.num_classes,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.stem_conv.forward(x);
        let x = self.stem_bn.forward(x);
        let x = self.relu.forward(x);

        let x = self.block1.forward(x);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);
        let x = self.block4.forward(x);

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_birdnet_output_shape() {
        let device = Default::default();
        let config = BirdNetConfig::new()
            .with_num_classes(12)
            .with_input_size(64)
            .with_base_filters(8);
        let model = BirdNet::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 64, 64], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 12]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let device = Default::default();
        let config = BirdNetConfig::new()
            .with_num_classes(7)
            .with_input_size(32)
            .with_base_filters(4);
        let model = BirdNet::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let probs = model.forward_softmax(input);

        let values: Vec<f32> = probs.into_data().to_vec().unwrap();
        assert_eq!(values.len(), 7);
        let sum: f32 = values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(values.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_depthwise_block_halves_resolution() {
        let device = Default::default();
        let block = DepthwiseBlock::<TestBackend>::new(4, 8, 0.25, &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 4, 32, 32], &device);
        let output = block.forward(input);

        assert_eq!(output.dims(), [1, 8, 16, 16]);
    }
}
