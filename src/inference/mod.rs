//! Inference module
//!
//! This module provides:
//! - Argmax prediction with per-class confidence
//! - Batch classification display (predicted vs. true label)
//! - Per-class file listing reports over a freshly scanned test directory
//! - Optional contact-sheet rendering of a classified batch

pub mod predictor;

// Re-export main types for convenience
pub use predictor::{Prediction, Predictor};
