//! # Fruit Classifier
//!
//! A small convolutional image classifier for fruit photos, built with the
//! Burn framework. The pipeline is a straight line: scan a directory-
//! structured dataset, build the network, train it with Adam and
//! cross-entropy, evaluate it, and export it as a compact binary record for
//! mobile inference.
//!
//! ## Modules
//!
//! - `dataset`: directory scanning, image decoding, and Burn batching
//! - `model`: the CNN architecture and its configuration
//! - `training`: the training loop, validation, and checkpointing
//! - `inference`: argmax prediction and per-file classification reports
//! - `export`: conversion to the half-precision edge inference format
//! - `utils`: error type and logging setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fruit_classifier::backend::TrainBackend;
//! use fruit_classifier::dataset::FruitDataset;
//! use fruit_classifier::model::{FruitClassifier, ModelConfig};
//! use fruit_classifier::training::{TrainConfig, Trainer};
//!
//! let config = ModelConfig::default();
//! let train = FruitDataset::scan("data/fruits/train", config.image_size())?;
//! let valid = FruitDataset::scan("data/fruits/validation", config.image_size())?;
//!
//! let device = Default::default();
//! let model = FruitClassifier::<TrainBackend>::new(&config, &device);
//! let mut trainer = Trainer::new(model, config, TrainConfig::default(), device);
//! trainer.fit(&train, &valid)?;
//! ```

pub mod backend;
pub mod dataset;
pub mod export;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::batcher::{FruitBatch, FruitBatcher, FruitImageDataset, FruitItem};
pub use dataset::loader::{DatasetStats, FruitDataset, ImageSample};
pub use export::{export_model, import_model};
pub use inference::predictor::{Prediction, Predictor};
pub use model::cnn::FruitClassifier;
pub use model::config::{ActivationKind, ModelConfig};
pub use training::trainer::{EpochStats, EvalReport, Trainer};
pub use training::TrainConfig;
pub use utils::error::{FruitClassifierError, Result};

/// Number of fruit classes
pub const NUM_CLASSES: usize = 3;

/// Fruit class names, index-aligned with the network's output layer
pub const CLASS_NAMES: [&str; NUM_CLASSES] = ["apple", "banana", "orange"];

/// Default image edge length (the exported model's consumer feeds 32x32 RGB)
pub const DEFAULT_IMAGE_SIZE: usize = 32;

/// Default batch size
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
