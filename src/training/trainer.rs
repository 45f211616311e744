//! Training loop for the fruit classifier
//!
//! Uses Burn's API directly with an explicit loop over shuffled batches
//! rather than the high-level learner: forward pass, cross-entropy loss,
//! backward pass, Adam step. The validation set is evaluated after each
//! epoch on the non-autodiff model.

use std::path::{Path, PathBuf};

use anyhow::Result;
use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::{AutodiffModule, Module},
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    record::CompactRecorder,
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use chrono::Local;
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::batcher::{FruitBatcher, FruitImageDataset};
use crate::model::cnn::FruitClassifier;
use crate::model::config::{ModelConfig, TrainConfig};

/// Per-epoch training and validation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// Epoch number (0-indexed)
    pub epoch: usize,
    /// Average training loss over the epoch
    pub train_loss: f64,
    /// Training accuracy over the epoch
    pub train_accuracy: f64,
    /// Validation loss after the epoch
    pub val_loss: f64,
    /// Validation accuracy after the epoch
    pub val_accuracy: f64,
}

/// Aggregate loss and accuracy over a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub loss: f64,
    pub accuracy: f64,
    pub samples: usize,
}

/// Trainer owning the model and its configuration
///
/// Construction attaches the optimizer settings and loss selection; no
/// computation happens until [`fit`](Self::fit).
pub struct Trainer<B: AutodiffBackend> {
    /// Model being trained
    pub model: FruitClassifier<B>,
    /// Model configuration (image size, batch size)
    pub model_config: ModelConfig,
    /// Training hyperparameters
    pub train_config: TrainConfig,
    /// Metrics recorded per epoch
    pub history: Vec<EpochStats>,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a new trainer
    pub fn new(
        model: FruitClassifier<B>,
        model_config: ModelConfig,
        train_config: TrainConfig,
        device: B::Device,
    ) -> Self {
        Self {
            model,
            model_config,
            train_config,
            history: Vec::new(),
            device,
        }
    }

    /// Train for the configured number of epochs
    ///
    /// Each epoch shuffles the training set with a seeded RNG, updates the
    /// model batch by batch, then evaluates against the validation set.
    pub fn fit(
        &mut self,
        train: &FruitImageDataset,
        valid: &FruitImageDataset,
    ) -> Result<&[EpochStats]> {
        if train.len() == 0 {
            anyhow::bail!("Training dataset is empty");
        }

        B::seed(self.train_config.seed);

        let batch_size = self.model_config.batch_size;
        let batcher = FruitBatcher::<B>::new(
            self.device.clone(),
            self.model_config.image_width,
            self.model_config.image_height,
        );

        let mut optimizer = AdamConfig::new().init();
        let mut rng = ChaCha8Rng::seed_from_u64(self.train_config.seed);

        for epoch in 0..self.train_config.epochs {
            println!(
                "{}",
                format!("Epoch {}/{}", epoch + 1, self.train_config.epochs)
                    .yellow()
                    .bold()
            );

            let mut epoch_loss = 0.0f64;
            let mut correct = 0usize;
            let mut seen = 0usize;

            let mut indices: Vec<usize> = (0..train.len()).collect();
            indices.shuffle(&mut rng);
            let num_batches = (indices.len() + batch_size - 1) / batch_size;

            for batch_idx in 0..num_batches {
                let start = batch_idx * batch_size;
                let end = (start + batch_size).min(indices.len());
                let items: Vec<_> = indices[start..end]
                    .iter()
                    .filter_map(|&i| train.get(i))
                    .collect();

                if items.is_empty() {
                    continue;
                }

                let batch = batcher.batch(items);

                // Forward pass
                let output = self.model.forward(batch.images.clone());

                let loss = CrossEntropyLossConfig::new()
                    .init(&output.device())
                    .forward(output.clone(), batch.targets.clone());

                let loss_value: f64 = loss.clone().into_scalar().elem();
                epoch_loss += loss_value;

                correct += count_correct(output, batch.targets.clone());
                seen += batch.targets.dims()[0];

                // Backward pass and parameter update
                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &self.model);
                self.model =
                    optimizer.step(self.train_config.learning_rate, self.model.clone(), grads);

                if (batch_idx + 1) % 10 == 0 || batch_idx == num_batches - 1 {
                    println!(
                        "  Batch {:>4}/{}: loss = {:.4}, acc = {:.2}%",
                        batch_idx + 1,
                        num_batches,
                        loss_value,
                        100.0 * correct as f64 / seen as f64
                    );
                }
            }

            let train_loss = epoch_loss / num_batches.max(1) as f64;
            let train_accuracy = correct as f64 / seen.max(1) as f64;

            // Validation phase
            let report = self.evaluate(valid);

            info!(
                "Epoch {}: train loss {:.4}, train acc {:.2}%, val loss {:.4}, val acc {:.2}%",
                epoch + 1,
                train_loss,
                train_accuracy * 100.0,
                report.loss,
                report.accuracy * 100.0
            );
            println!(
                "  {} Loss: {:.4} | Train Acc: {:.2}% | Val Loss: {:.4} | Val Acc: {:.2}%",
                "→".cyan(),
                train_loss,
                train_accuracy * 100.0,
                report.loss,
                report.accuracy * 100.0
            );
            println!();

            self.history.push(EpochStats {
                epoch,
                train_loss,
                train_accuracy,
                val_loss: report.loss,
                val_accuracy: report.accuracy,
            });
        }

        Ok(&self.history)
    }

    /// Evaluate the model on a dataset using the non-autodiff backend
    pub fn evaluate(&self, dataset: &FruitImageDataset) -> EvalReport {
        let device = <B::InnerBackend as Backend>::Device::default();
        let model = self.model.valid();
        evaluate_model(
            &model,
            dataset,
            &device,
            &self.model_config,
        )
    }

    /// Save the model under a timestamped name in `dir`
    pub fn save_checkpoint(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("fruit_classifier_{}", timestamp));

        let recorder = CompactRecorder::new();
        self.model
            .clone()
            .save_file(&path, &recorder)
            .map_err(|e| anyhow::anyhow!("Failed to save model: {:?}", e))?;

        info!("Checkpoint saved to {:?}", path);
        Ok(path)
    }

    /// Load model weights from a checkpoint
    pub fn load_checkpoint(&mut self, path: &Path) -> Result<()> {
        let recorder = CompactRecorder::new();
        self.model = self
            .model
            .clone()
            .load_file(path, &recorder, &self.device)
            .map_err(|e| anyhow::anyhow!("Failed to load model: {:?}", e))?;

        info!("Checkpoint loaded from {:?}", path);
        Ok(())
    }

    /// Get the device
    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

/// Compute aggregate loss and accuracy for a model over a dataset
pub fn evaluate_model<B: Backend>(
    model: &FruitClassifier<B>,
    dataset: &FruitImageDataset,
    device: &B::Device,
    config: &ModelConfig,
) -> EvalReport {
    let batcher = FruitBatcher::<B>::new(
        device.clone(),
        config.image_width,
        config.image_height,
    );

    let len = dataset.len();
    let batch_size = config.batch_size;
    let mut total_loss = 0.0f64;
    let mut num_batches = 0usize;
    let mut correct = 0usize;
    let mut total = 0usize;

    for start in (0..len).step_by(batch_size) {
        let end = (start + batch_size).min(len);
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();

        if items.is_empty() {
            continue;
        }

        let count = items.len();
        let batch = batcher.batch(items);
        let output = model.forward(batch.images);

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        total_loss += loss.into_scalar().elem::<f64>();
        num_batches += 1;

        correct += count_correct(output, batch.targets);
        total += count;
    }

    EvalReport {
        loss: total_loss / num_batches.max(1) as f64,
        accuracy: correct as f64 / total.max(1) as f64,
        samples: total,
    }
}

/// Count correct argmax predictions in a batch
fn count_correct<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predictions = output.argmax(1).squeeze::<1>(1);
    let correct: i64 = predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem();
    correct as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::batcher::FruitItem;

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    fn tiny_config() -> ModelConfig {
        ModelConfig {
            batch_size: 4,
            ..Default::default()
        }
    }

    fn synthetic_items(n: usize) -> Vec<FruitItem> {
        (0..n)
            .map(|i| {
                // Give each class a distinct constant image so one step has
                // a learnable signal.
                let value = (i % 3) as f32 * 100.0;
                FruitItem::from_data(vec![value; 3 * 32 * 32], i % 3, format!("{}.jpg", i))
            })
            .collect()
    }

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let output = Tensor::<burn::backend::NdArray, 2>::from_floats(
            burn::tensor::TensorData::new(
                vec![5.0f32, 0.0, 0.0, 0.0, 0.0, 5.0],
                [2, 3],
            ),
            &device,
        );
        let targets = Tensor::<burn::backend::NdArray, 1, Int>::from_data(
            burn::tensor::TensorData::new(vec![0i64, 1], [2]),
            &device,
        );

        // First row argmax 0 (correct), second row argmax 2 (wrong)
        assert_eq!(count_correct(output, targets), 1);
    }

    #[test]
    fn test_single_training_step_updates_model() {
        let device = Default::default();
        let config = tiny_config();
        let model = FruitClassifier::<TestBackend>::new(&config, &device);

        let batcher = FruitBatcher::<TestBackend>::new(device, 32, 32);
        let batch = batcher.batch(synthetic_items(4));

        let output = model.forward(batch.images.clone());
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());

        let loss_value: f64 = loss.clone().into_scalar().elem();
        assert!(loss_value.is_finite());

        let mut optimizer = AdamConfig::new().init();
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let updated = optimizer.step(1e-3, model.clone(), grads);

        // The step must actually move the parameters.
        let before = model.forward(batch.images.clone());
        let after = updated.forward(batch.images);
        let diff: f32 = (before - after).abs().sum().into_scalar().elem();
        assert!(diff > 0.0);
    }

    #[test]
    fn test_evaluate_model_on_empty_dataset() {
        let device = Default::default();
        let config = tiny_config();
        let model = FruitClassifier::<burn::backend::NdArray>::new(&config, &device);
        let dataset = FruitImageDataset::new(Vec::new(), 32, 32);

        let report = evaluate_model(&model, &dataset, &device, &config);
        assert_eq!(report.samples, 0);
        assert_eq!(report.accuracy, 0.0);
    }
}
