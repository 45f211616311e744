//! Training module
//!
//! A hand-rolled training loop over the Burn framework: Adam optimization,
//! cross-entropy loss computed from logits against integer class targets,
//! and an accuracy metric, with validation after every epoch. There is no
//! early stopping, no mid-training checkpointing, and no retry logic; any
//! failure aborts the run.

pub mod trainer;

// Re-export main types for convenience
pub use trainer::{evaluate_model, EpochStats, EvalReport, Trainer};

// Re-export TrainConfig from model::config where it's defined
pub use crate::model::config::TrainConfig;

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 10;

/// Default Adam learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
