//! Error type for the fruit classifier library
//!
//! Everything here is fatal by design: a missing dataset path, a label set
//! that does not match the network's output width, or a failed record write
//! aborts the run. No recovery paths exist.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for fruit classifier operations
#[derive(Error, Debug)]
pub enum FruitClassifierError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model construction or weights
    #[error("Model error: {0}")]
    Model(String),

    /// Error during training
    #[error("Training error: {0}")]
    Training(String),

    /// Error during inference
    #[error("Inference error: {0}")]
    Inference(String),

    /// Error exporting or importing the edge model record
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Convenience Result type for fruit classifier operations
pub type Result<T> = std::result::Result<T, FruitClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FruitClassifierError::Dataset("no label directories".to_string());
        assert_eq!(format!("{}", err), "Dataset error: no label directories");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/data/fruits/train/apple/a1.jpg");
        let err = FruitClassifierError::ImageLoad(path, "decode failed".to_string());
        assert!(format!("{}", err).contains("a1.jpg"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FruitClassifierError = io.into();
        assert!(matches!(err, FruitClassifierError::Io(_)));
    }
}
