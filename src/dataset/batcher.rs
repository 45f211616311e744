//! Burn dataset and batcher integration
//!
//! Implements Burn's `Dataset` trait over the scanned sample list and a
//! `Batcher` that assembles `[batch, 3, height, width]` image tensors with
//! integer class targets.

use std::path::PathBuf;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::ImageReader;
use serde::{Deserialize, Serialize};

/// A single image ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FruitItem {
    /// Image data as a flattened CHW float array `[3 * height * width]`
    pub image: Vec<f32>,
    /// Class label index
    pub label: usize,
    /// Source path (for per-file prediction reports)
    pub path: String,
}

impl FruitItem {
    /// Load and preprocess an image from disk
    ///
    /// The image is resized to `width x height` and laid out CHW. Pixels
    /// stay in the raw 0-255 range: no rescaling layer exists anywhere in
    /// the pipeline, and the exported model's consumer feeds unscaled
    /// floats.
    pub fn from_path(path: &PathBuf, label: usize, width: u32, height: u32) -> anyhow::Result<Self> {
        let img = ImageReader::open(path)?
            .decode()?
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8();

        let (width, height) = (width as usize, height as usize);
        let mut image = vec![0.0f32; 3 * height * width];

        for y in 0..height {
            for x in 0..width {
                let pixel = img.get_pixel(x as u32, y as u32);
                image[y * width + x] = pixel[0] as f32;
                image[height * width + y * width + x] = pixel[1] as f32;
                image[2 * height * width + y * width + x] = pixel[2] as f32;
            }
        }

        Ok(Self {
            image,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create from pre-loaded image data
    pub fn from_data(image: Vec<f32>, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

/// Lazily-loading dataset over (path, label) pairs
#[derive(Debug, Clone)]
pub struct FruitImageDataset {
    samples: Vec<(PathBuf, usize)>,
    width: u32,
    height: u32,
}

impl FruitImageDataset {
    /// Create a new dataset from a list of samples
    pub fn new(samples: Vec<(PathBuf, usize)>, width: u32, height: u32) -> Self {
        Self {
            samples,
            width,
            height,
        }
    }

    /// Create from a scanned [`FruitDataset`](super::loader::FruitDataset)
    pub fn from_loader(loader: &super::loader::FruitDataset) -> Self {
        let samples: Vec<_> = loader
            .samples
            .iter()
            .map(|s| (s.path.clone(), s.label))
            .collect();

        Self::new(samples, loader.image_size.0, loader.image_size.1)
    }
}

impl Dataset<FruitItem> for FruitImageDataset {
    fn get(&self, index: usize) -> Option<FruitItem> {
        let (path, label) = self.samples.get(index)?;
        FruitItem::from_path(path, *label, self.width, self.height).ok()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A batch of fruit images
#[derive(Clone, Debug)]
pub struct FruitBatch<B: Backend> {
    /// Images with shape `[batch_size, 3, height, width]`
    pub images: Tensor<B, 4>,
    /// Labels with shape `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher assembling [`FruitBatch`]es on a device
#[derive(Clone, Debug)]
pub struct FruitBatcher<B: Backend> {
    device: B::Device,
    width: usize,
    height: usize,
}

impl<B: Backend> FruitBatcher<B> {
    /// Create a new batcher for the given device and image size
    pub fn new(device: B::Device, width: usize, height: usize) -> Self {
        Self {
            device,
            width,
            height,
        }
    }
}

impl<B: Backend> Batcher<FruitItem, FruitBatch<B>> for FruitBatcher<B> {
    fn batch(&self, items: Vec<FruitItem>) -> FruitBatch<B> {
        let batch_size = items.len();
        let channels = 3;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, self.height, self.width]),
            &self.device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets_data, [batch_size]),
            &self.device,
        );

        FruitBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_fruit_item_from_data() {
        let image = vec![127.0f32; 3 * 32 * 32];
        let item = FruitItem::from_data(image, 2, "orange/o_001.jpg".to_string());

        assert_eq!(item.label, 2);
        assert_eq!(item.image.len(), 3 * 32 * 32);
    }

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let batcher = FruitBatcher::<TestBackend>::new(device, 32, 32);

        let items: Vec<FruitItem> = (0..4)
            .map(|i| FruitItem::from_data(vec![0.0; 3 * 32 * 32], i % 3, format!("{}.jpg", i)))
            .collect();

        let batch = batcher.batch(items);
        assert_eq!(batch.images.dims(), [4, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [4]);
    }

    #[test]
    fn test_batch_targets_preserve_order() {
        let device = Default::default();
        let batcher = FruitBatcher::<TestBackend>::new(device, 8, 8);

        let items: Vec<FruitItem> = [0usize, 2, 1]
            .iter()
            .map(|&label| FruitItem::from_data(vec![0.0; 3 * 8 * 8], label, String::new()))
            .collect();

        let batch = batcher.batch(items);
        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![0, 2, 1]);
    }

    #[test]
    fn test_dataset_len_and_missing_index() {
        let dataset = FruitImageDataset::new(
            vec![(PathBuf::from("missing/a.jpg"), 0)],
            32,
            32,
        );
        assert_eq!(dataset.len(), 1);
        // Index out of range is None rather than a panic
        assert!(dataset.get(5).is_none());
    }
}
