//! Edge model export
//!
//! Converts the trained network into a single half-precision binary record
//! (Burn's `BinFileRecorder`), the format loaded by the mobile inference
//! side. The byte layout is entirely defined by the framework's recorder;
//! no custom serialization exists here. Reloading the exported record must
//! reproduce the pre-export predictions within half-precision tolerance.

use std::path::{Path, PathBuf};

use anyhow::Result;
use burn::module::Module;
use burn::record::{BinFileRecorder, HalfPrecisionSettings};
use burn::tensor::backend::Backend;
use tracing::info;

use crate::model::cnn::FruitClassifier;
use crate::model::config::ModelConfig;

/// Write the trained model to `path` in the edge inference format
///
/// The recorder appends its own `.bin` extension; the returned path is the
/// one passed in.
pub fn export_model<B: Backend>(model: &FruitClassifier<B>, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let recorder = BinFileRecorder::<HalfPrecisionSettings>::new();
    model
        .clone()
        .save_file(path, &recorder)
        .map_err(|e| anyhow::anyhow!("Failed to export model: {:?}", e))?;

    info!("Exported edge model to {:?}", path);
    Ok(path.to_path_buf())
}

/// Load an exported edge model record into a freshly built network
pub fn import_model<B: Backend>(
    config: &ModelConfig,
    path: &Path,
    device: &B::Device,
) -> Result<FruitClassifier<B>> {
    let recorder = BinFileRecorder::<HalfPrecisionSettings>::new();
    let model = FruitClassifier::<B>::new(config, device)
        .load_file(path, &recorder, device)
        .map_err(|e| anyhow::anyhow!("Failed to import model: {:?}", e))?;

    info!("Imported edge model from {:?}", path);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_export_reload_roundtrip_is_close() {
        let device = Default::default();
        let config = ModelConfig::default();
        let model = FruitClassifier::<TestBackend>::new(&config, &device);

        let dir = std::env::temp_dir().join("fruit_classifier_export_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fruit_model");

        export_model(&model, &path).unwrap();
        let reloaded = import_model::<TestBackend>(&config, &path, &device).unwrap();

        let input = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device);
        let before: Vec<f32> = model.forward(input.clone()).into_data().to_vec().unwrap();
        let after: Vec<f32> = reloaded.forward(input).into_data().to_vec().unwrap();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            // Half-precision storage loses a little accuracy
            assert!((b - a).abs() < 5e-2, "logits diverged: {} vs {}", b, a);
        }
    }

    #[test]
    fn test_import_missing_record_fails() {
        let device = Default::default();
        let config = ModelConfig::default();
        let result = import_model::<TestBackend>(
            &config,
            Path::new("/nonexistent/fruit_model"),
            &device,
        );
        assert!(result.is_err());
    }
}
