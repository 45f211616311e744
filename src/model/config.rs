//! Model and training configuration
//!
//! The image dimensions and batch size are fixed at construction time and
//! invariant for the configuration's lifetime.

use serde::{Deserialize, Serialize};

use crate::utils::error::FruitClassifierError;
use crate::{DEFAULT_BATCH_SIZE, DEFAULT_IMAGE_SIZE, NUM_CLASSES};

use super::{CONV_FILTERS, KERNEL_SIZE};

/// Configuration for the fruit classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Input image height in pixels
    pub image_height: usize,

    /// Input image width in pixels
    pub image_width: usize,

    /// Batch size for training and batched inference
    pub batch_size: usize,

    /// Number of output classes
    pub num_classes: usize,

    /// Activation function used after each convolution and the hidden
    /// dense layer
    pub activation: ActivationKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            image_height: DEFAULT_IMAGE_SIZE,
            image_width: DEFAULT_IMAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            num_classes: NUM_CLASSES,
            activation: ActivationKind::default(),
        }
    }
}

impl ModelConfig {
    /// Create a configuration with explicit image dimensions and batch size
    pub fn new(image_height: usize, image_width: usize, batch_size: usize) -> Self {
        Self {
            image_height,
            image_width,
            batch_size,
            ..Default::default()
        }
    }

    /// Image size as (width, height) for the dataset loader
    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width as u32, self.image_height as u32)
    }

    /// Validate the configuration
    ///
    /// The convolution stack uses valid padding, so each stage shrinks the
    /// feature map; images too small to survive all three stages are
    /// rejected here rather than as a shape error at forward time.
    pub fn validate(&self) -> Result<(), FruitClassifierError> {
        if self.num_classes == 0 {
            return Err(FruitClassifierError::Config(
                "num_classes must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(FruitClassifierError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        let (h, w) = (
            conv_stack_output(self.image_height),
            conv_stack_output(self.image_width),
        );
        if h == 0 || w == 0 {
            return Err(FruitClassifierError::Config(format!(
                "image size {}x{} is too small for the convolution stack",
                self.image_height, self.image_width
            )));
        }

        Ok(())
    }

    /// Width of the flattened feature vector entering the dense layers
    pub fn conv_output_size(&self) -> usize {
        conv_stack_output(self.image_height) * conv_stack_output(self.image_width) * CONV_FILTERS
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

/// Feature map edge length after the three conv + pool stages
fn conv_stack_output(mut size: usize) -> usize {
    for _ in 0..3 {
        // Valid 3x3 convolution followed by 2x2 max-pooling
        size = size.saturating_sub(KERNEL_SIZE - 1) / 2;
    }
    size
}

/// Supported activation functions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivationKind {
    Relu,
    Gelu,
    Silu,
}

impl Default for ActivationKind {
    fn default() -> Self {
        Self::Relu
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of training epochs
    pub epochs: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Random seed for shuffling and parameter initialization
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 1e-3,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_default() {
        let config = ModelConfig::default();
        assert_eq!(config.image_height, 32);
        assert_eq!(config.image_width, 32);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.num_classes, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_conv_output_size() {
        // 32 -> 30 -> 15 -> 13 -> 6 -> 4 -> 2; flatten: 2 * 2 * 32 = 128
        let config = ModelConfig::default();
        assert_eq!(config.conv_output_size(), 128);
    }

    #[test]
    fn test_validate_rejects_small_images() {
        let config = ModelConfig::new(16, 16, 32);
        assert!(config.validate().is_err());

        // 22 is the smallest edge that survives all three stages
        let config = ModelConfig::new(22, 22, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_classes() {
        let mut config = ModelConfig::default();
        config.num_classes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_train_config_default() {
        let config = TrainConfig::default();
        assert_eq!(config.epochs, 10);
        assert_eq!(config.learning_rate, 1e-3);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = ModelConfig::new(64, 48, 16);
        let json = serde_json::to_string(&config).unwrap();
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.image_height, 64);
        assert_eq!(back.image_width, 48);
        assert_eq!(back.batch_size, 16);
    }
}
