//! Prediction and classification reports
//!
//! Runs the trained network on test batches and reports the predicted class
//! (argmax of the output scores) alongside the true label. The per-class
//! listing procedures re-scan the test directory in deterministic order and
//! print a prediction for every file of one class; each class's index range
//! is derived from the scanned labels rather than assumed from fixed file
//! counts.

use std::path::Path;

use anyhow::Result;
use burn::data::dataloader::batcher::Batcher;
use burn::tensor::backend::Backend;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::batcher::{FruitBatcher, FruitItem};
use crate::dataset::loader::FruitDataset;
use crate::dataset::{class_index, class_name};
use crate::model::cnn::FruitClassifier;
use crate::model::config::ModelConfig;
use crate::utils::error::FruitClassifierError;

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Source image path, when known
    pub path: Option<String>,

    /// Predicted class index (argmax of the logits)
    pub predicted: usize,

    /// Predicted class name
    pub class_name: String,

    /// Softmax probability of the predicted class
    pub confidence: f32,

    /// Raw logits for all classes
    pub logits: Vec<f32>,
}

impl Prediction {
    /// Build a prediction from one row of logits
    pub fn from_logits(logits: Vec<f32>, path: Option<String>) -> Self {
        let predicted = argmax(&logits);
        let confidence = softmax_confidence(&logits, predicted);
        let class_name = class_name(predicted).unwrap_or("unknown").to_string();

        Self {
            path,
            predicted,
            class_name,
            confidence,
            logits,
        }
    }
}

/// Index of the highest score
fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Softmax probability of `index` within `logits`
fn softmax_confidence(logits: &[f32], index: usize) -> f32 {
    if logits.is_empty() {
        return 0.0;
    }
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let denom: f32 = logits.iter().map(|&l| (l - max).exp()).sum();
    (logits[index] - max).exp() / denom
}

/// Runs inference with a trained model
pub struct Predictor<B: Backend> {
    model: FruitClassifier<B>,
    config: ModelConfig,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Create a new predictor
    pub fn new(model: FruitClassifier<B>, config: ModelConfig, device: B::Device) -> Self {
        Self {
            model,
            config,
            device,
        }
    }

    /// Predict a batch of preprocessed items
    pub fn predict_items(&self, items: Vec<FruitItem>) -> Vec<Prediction> {
        if items.is_empty() {
            return Vec::new();
        }

        let paths: Vec<String> = items.iter().map(|item| item.path.clone()).collect();
        let batcher = FruitBatcher::<B>::new(
            self.device.clone(),
            self.config.image_width,
            self.config.image_height,
        );
        let batch = batcher.batch(items);

        let output = self.model.forward(batch.images);
        let num_classes = self.model.num_classes();
        let logits: Vec<f32> = output.into_data().to_vec().unwrap();

        logits
            .chunks(num_classes)
            .zip(paths)
            .map(|(row, path)| Prediction::from_logits(row.to_vec(), Some(path)))
            .collect()
    }

    /// Load the first `batch_size` samples of a dataset in scan order
    fn first_batch(&self, dataset: &FruitDataset) -> Result<Vec<FruitItem>> {
        if dataset.is_empty() {
            anyhow::bail!("Test dataset is empty: {:?}", dataset.root_dir);
        }

        dataset
            .samples
            .iter()
            .take(self.config.batch_size)
            .map(|s| FruitItem::from_path(&s.path, s.label, dataset.image_size.0, dataset.image_size.1))
            .collect()
    }

    /// Classify the first test batch and print predicted vs. true labels
    ///
    /// When `render` is given, the batch is additionally written as a
    /// contact-sheet PNG.
    pub fn display_classification(
        &self,
        dataset: &FruitDataset,
        render: Option<&Path>,
    ) -> Result<()> {
        let items = self.first_batch(dataset)?;
        let predictions = self.predict_items(items.clone());

        println!("{}", "Batch classification:".cyan().bold());
        for (item, prediction) in items.iter().zip(&predictions) {
            let actual = class_name(item.label).unwrap_or("unknown");
            let correct = prediction.predicted == item.label;
            println!(
                "  {:40} Pred: {:8} | Real: {:8} ({:.1}%) {}",
                item.path,
                prediction.class_name,
                actual,
                prediction.confidence * 100.0,
                if correct { "✓".green() } else { "✗".red() }
            );
        }

        if let Some(path) = render {
            render_grid(&items, &self.config, path)?;
            println!("  Rendered batch to {:?}", path);
        }

        Ok(())
    }

    /// Print the raw logit rows for the first test batch
    pub fn show_logits(&self, dataset: &FruitDataset) -> Result<()> {
        let items = self.first_batch(dataset)?;
        let predictions = self.predict_items(items);

        println!("{}", "Raw output scores:".cyan().bold());
        for prediction in &predictions {
            let row: Vec<String> = prediction
                .logits
                .iter()
                .map(|l| format!("{:8.3}", l))
                .collect();
            println!("  [{}]", row.join(", "));
        }

        Ok(())
    }

    /// Re-scan the test directory and print a prediction for every file of
    /// one class
    ///
    /// The scan is ordered, so each class occupies one contiguous index
    /// range; the range is taken from the scanned labels.
    pub fn print_class_predictions(&self, test_dir: &Path, class: &str) -> Result<()> {
        let label = class_index(class).ok_or_else(|| {
            FruitClassifierError::Inference(format!("unknown class '{}'", class))
        })?;

        let dataset = FruitDataset::scan(test_dir, self.config.image_size())?;
        let ranges = dataset.class_ranges();
        let range = ranges
            .iter()
            .find(|(name, _)| name == class)
            .map(|(_, range)| range.clone())
            .ok_or_else(|| {
                FruitClassifierError::Inference(format!(
                    "class '{}' not present in {:?}",
                    class, test_dir
                ))
            })?;

        info!(
            "Predicting {} '{}' files (indices {}..{})",
            range.len(),
            class,
            range.start,
            range.end
        );

        let items: Result<Vec<FruitItem>> = dataset.samples[range]
            .iter()
            .map(|s| {
                FruitItem::from_path(&s.path, s.label, dataset.image_size.0, dataset.image_size.1)
            })
            .collect();
        let items = items?;

        let predictions = self.predict_items(items);
        for prediction in &predictions {
            let mark = if prediction.predicted == label {
                "✓".green()
            } else {
                "✗".red()
            };
            println!(
                "  {} {} {}",
                prediction.path.as_deref().unwrap_or("<unknown>"),
                prediction.class_name,
                mark
            );
        }

        Ok(())
    }

    /// Print predictions for every apple file in the test directory
    pub fn print_apple_predictions(&self, test_dir: &Path) -> Result<()> {
        self.print_class_predictions(test_dir, "apple")
    }

    /// Print predictions for every banana file in the test directory
    pub fn print_banana_predictions(&self, test_dir: &Path) -> Result<()> {
        self.print_class_predictions(test_dir, "banana")
    }

    /// Print predictions for every orange file in the test directory
    pub fn print_orange_predictions(&self, test_dir: &Path) -> Result<()> {
        self.print_class_predictions(test_dir, "orange")
    }
}

/// Write a batch of items as a 3-column contact sheet PNG
fn render_grid(items: &[FruitItem], config: &ModelConfig, path: &Path) -> Result<()> {
    let (w, h) = (config.image_width as u32, config.image_height as u32);
    let cols = 3u32;
    let rows = (items.len() as u32 + cols - 1) / cols;
    let pad = 2u32;

    let mut sheet = image::RgbImage::from_pixel(
        cols * (w + pad) + pad,
        rows * (h + pad) + pad,
        image::Rgb([255, 255, 255]),
    );

    for (i, item) in items.iter().enumerate() {
        let (width, height) = (w as usize, h as usize);
        let origin_x = pad + (i as u32 % cols) * (w + pad);
        let origin_y = pad + (i as u32 / cols) * (h + pad);

        for y in 0..height {
            for x in 0..width {
                let r = item.image[y * width + x] as u8;
                let g = item.image[height * width + y * width + x] as u8;
                let b = item.image[2 * height * width + y * width + x] as u8;
                sheet.put_pixel(origin_x + x as u32, origin_y + y as u32, image::Rgb([r, g, b]));
            }
        }
    }

    sheet.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_from_logits() {
        let prediction = Prediction::from_logits(vec![0.1, 4.2, -1.0], None);

        assert_eq!(prediction.predicted, 1);
        assert_eq!(prediction.class_name, "banana");
        assert!(prediction.confidence > 0.9);
    }

    #[test]
    fn test_argmax_first_wins_on_ties() {
        assert_eq!(argmax(&[1.0, 1.0, 0.0]), 0);
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), 1);
    }

    #[test]
    fn test_softmax_confidence_sums_to_one() {
        let logits = vec![1.0f32, 2.0, 3.0];
        let total: f32 = (0..3).map(|i| softmax_confidence(&logits, i)).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_predict_items_on_model() {
        type TestBackend = burn::backend::NdArray;

        let device = Default::default();
        let config = ModelConfig {
            batch_size: 2,
            ..Default::default()
        };
        let model = FruitClassifier::<TestBackend>::new(&config, &device);
        let predictor = Predictor::new(model, config, device);

        let items: Vec<FruitItem> = (0..2)
            .map(|i| FruitItem::from_data(vec![64.0; 3 * 32 * 32], i, format!("{}.jpg", i)))
            .collect();

        let predictions = predictor.predict_items(items);
        assert_eq!(predictions.len(), 2);
        for prediction in &predictions {
            assert!(prediction.predicted < 3);
            assert_eq!(prediction.logits.len(), 3);
        }
    }

    #[test]
    fn test_predict_items_empty() {
        type TestBackend = burn::backend::NdArray;

        let device = Default::default();
        let config = ModelConfig::default();
        let model = FruitClassifier::<TestBackend>::new(&config, &device);
        let predictor = Predictor::new(model, config, device);

        assert!(predictor.predict_items(Vec::new()).is_empty());
    }
}
