//! Fruit classifier CNN architecture
//!
//! A fixed-topology convolutional stack: three valid-padded 3x3
//! convolutions with 32 filters, each followed by 2x2 max-pooling, then a
//! flatten, a 128-unit dense layer, and a 3-unit linear output producing
//! logits. The activation function is configurable and defaults to
//! rectified-linear.

use burn::{
    module::{Ignored, Module},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d,
    },
    tensor::{activation, backend::Backend, Tensor},
};

use super::config::{ActivationKind, ModelConfig};
use super::{CONV_FILTERS, DENSE_UNITS, KERNEL_SIZE};

/// Apply the configured activation function
fn activate<B: Backend, const D: usize>(kind: ActivationKind, x: Tensor<B, D>) -> Tensor<B, D> {
    match kind {
        ActivationKind::Relu => activation::relu(x),
        ActivationKind::Gelu => activation::gelu(x),
        ActivationKind::Silu => activation::silu(x),
    }
}

/// Fruit classification CNN
///
/// The final layer emits unnormalized scores (logits); callers that need
/// probabilities apply softmax via [`forward_softmax`](Self::forward_softmax).
#[derive(Module, Debug)]
pub struct FruitClassifier<B: Backend> {
    conv1: Conv2d<B>,
    pool1: MaxPool2d,
    conv2: Conv2d<B>,
    pool2: MaxPool2d,
    conv3: Conv2d<B>,
    pool3: MaxPool2d,

    fc1: Linear<B>,
    fc2: Linear<B>,

    activation: Ignored<ActivationKind>,
    num_classes: usize,
}

impl<B: Backend> FruitClassifier<B> {
    /// Create a new classifier from configuration
    ///
    /// Parameters are randomly initialized on the given device; no other
    /// side effects.
    pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
        let kernel = [KERNEL_SIZE, KERNEL_SIZE];

        let conv1 = Conv2dConfig::new([3, CONV_FILTERS], kernel)
            .with_padding(PaddingConfig2d::Valid)
            .init(device);
        let conv2 = Conv2dConfig::new([CONV_FILTERS, CONV_FILTERS], kernel)
            .with_padding(PaddingConfig2d::Valid)
            .init(device);
        let conv3 = Conv2dConfig::new([CONV_FILTERS, CONV_FILTERS], kernel)
            .with_padding(PaddingConfig2d::Valid)
            .init(device);

        let pool = || MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        let fc1 = LinearConfig::new(config.conv_output_size(), DENSE_UNITS).init(device);
        let fc2 = LinearConfig::new(DENSE_UNITS, config.num_classes).init(device);

        Self {
            conv1,
            pool1: pool(),
            conv2,
            pool2: pool(),
            conv3,
            pool3: pool(),
            fc1,
            fc2,
            activation: Ignored(config.activation),
            num_classes: config.num_classes,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape `[batch_size, 3, height, width]`
    ///
    /// # Returns
    /// * Logits tensor of shape `[batch_size, num_classes]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let act = self.activation.0;

        let x = self.pool1.forward(activate(act, self.conv1.forward(x)));
        let x = self.pool2.forward(activate(act, self.conv2.forward(x)));
        let x = self.pool3.forward(activate(act, self.conv3.forward(x)));

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = activate(act, self.fc1.forward(x));
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        activation::softmax(self.forward(x), 1)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_output_shape_matches_label_count() {
        let device = Default::default();
        let config = ModelConfig::default();
        let model = FruitClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 3]);
    }

    #[test]
    fn test_output_shape_for_larger_images() {
        let device = Default::default();
        let config = ModelConfig::new(64, 64, 8);
        let model = FruitClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 64, 64], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [1, 3]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let device = Default::default();
        let config = ModelConfig::default();
        let model = FruitClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device);
        let probs: Vec<f32> = model.forward_softmax(input).into_data().to_vec().unwrap();

        for row in probs.chunks(3) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_gelu_activation_variant() {
        let device = Default::default();
        let config = ModelConfig {
            activation: ActivationKind::Gelu,
            ..Default::default()
        };
        let model = FruitClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [1, 3]);
    }
}
