//! Fruit dataset loader
//!
//! Scans a directory tree where each second-level subdirectory name is a
//! class label, and produces a deterministic, ordered sample list. Images
//! are decoded and resized lazily.

use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::FruitClassifierError;

/// File extensions recognized as images
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// A single image sample with its label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (e.g., "apple")
    pub class_name: String,
}

/// A directory-backed fruit dataset with lazy image loading
///
/// Samples are ordered: class directories are sorted lexicographically and
/// files within each class are sorted by name, so every class occupies one
/// contiguous index range.
#[derive(Debug)]
pub struct FruitDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples, in scan order
    pub samples: Vec<ImageSample>,
    /// Discovered class names, sorted
    pub classes: Vec<String>,
    /// Target image size (width, height)
    pub image_size: (u32, u32),
}

impl FruitDataset {
    /// Scan a dataset directory
    ///
    /// Fails fast if the path does not exist or contains no label
    /// subdirectories.
    pub fn scan<P: AsRef<Path>>(root_dir: P, image_size: (u32, u32)) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Scanning dataset directory: {:?}", root_dir);

        if !root_dir.exists() {
            anyhow::bail!("Dataset directory does not exist: {:?}", root_dir);
        }

        // Discover class directories
        let mut classes: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    classes.push(name.to_string());
                }
            }
        }
        classes.sort();

        if classes.is_empty() {
            anyhow::bail!(
                "Dataset directory contains no label subdirectories: {:?}",
                root_dir
            );
        }

        info!("Found {} classes", classes.len());

        // Collect samples per class, files sorted by name
        let mut samples = Vec::new();
        for (label, class_name) in classes.iter().enumerate() {
            let class_dir = root_dir.join(class_name);
            let before = samples.len();

            for entry in WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path().to_path_buf();
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                        samples.push(ImageSample {
                            path,
                            label,
                            class_name: class_name.clone(),
                        });
                    }
                }
            }

            debug!(
                "Class '{}' (label {}): {} samples",
                class_name,
                label,
                samples.len() - before
            );
        }

        info!("Loaded {} total samples", samples.len());

        Ok(Self {
            root_dir,
            samples,
            classes,
            image_size,
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Verify that the discovered labels match an expected label set
    ///
    /// The label count must equal the network's output width; a mismatch is
    /// fatal at startup rather than a shape error mid-training.
    pub fn expect_classes(&self, expected: &[&str]) -> Result<(), FruitClassifierError> {
        let found: Vec<&str> = self.classes.iter().map(|c| c.as_str()).collect();
        if found != expected {
            return Err(FruitClassifierError::Dataset(format!(
                "label directories {:?} do not match expected classes {:?}",
                found, expected
            )));
        }
        Ok(())
    }

    /// Contiguous sample index range for each class, in scan order
    pub fn class_ranges(&self) -> Vec<(String, Range<usize>)> {
        let mut ranges: Vec<(String, Range<usize>)> = Vec::with_capacity(self.classes.len());
        let mut start = 0usize;
        for (label, class_name) in self.classes.iter().enumerate() {
            let count = self.samples.iter().filter(|s| s.label == label).count();
            ranges.push((class_name.clone(), start..start + count));
            start += count;
        }
        ranges
    }

    /// Load an image from disk and resize it to the configured size
    pub fn load_image(&self, sample: &ImageSample) -> Result<DynamicImage> {
        let img = ImageReader::open(&sample.path)
            .with_context(|| format!("Failed to open image: {:?}", sample.path))?
            .decode()
            .with_context(|| format!("Failed to decode image: {:?}", sample.path))?;

        Ok(img.resize_exact(
            self.image_size.0,
            self.image_size.1,
            image::imageops::FilterType::Triangle,
        ))
    }

    /// Get statistics about the dataset
    pub fn stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self
                .classes
                .iter()
                .enumerate()
                .map(|(idx, name)| (idx, name.clone()))
                .collect(),
        }
    }
}

/// Statistics about a scanned dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: HashMap<usize, String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\nDataset statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        let mut sorted: Vec<_> = self.class_names.iter().collect();
        sorted.sort_by_key(|(idx, _)| *idx);

        for (idx, name) in sorted {
            let count = self.class_counts[*idx];
            let bar_len = if self.total_samples > 0 {
                (count as f32 / self.total_samples as f32 * 40.0) as usize
            } else {
                0
            };
            let bar: String = "█".repeat(bar_len);
            println!("    {:2}. {:10} {:5} {}", idx, name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_with_labels(counts: &[usize]) -> FruitDataset {
        let classes: Vec<String> = crate::CLASS_NAMES.iter().map(|s| s.to_string()).collect();
        let mut samples = Vec::new();
        for (label, &count) in counts.iter().enumerate() {
            for i in 0..count {
                samples.push(ImageSample {
                    path: PathBuf::from(format!("{}/{:03}.jpg", classes[label], i)),
                    label,
                    class_name: classes[label].clone(),
                });
            }
        }
        FruitDataset {
            root_dir: PathBuf::from("test"),
            samples,
            classes,
            image_size: (32, 32),
        }
    }

    #[test]
    fn test_class_ranges_are_exhaustive_and_disjoint() {
        // The canonical test layout: 130 files split 47/43/40 in scan order.
        let dataset = dataset_with_labels(&[47, 43, 40]);

        let ranges = dataset.class_ranges();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0], ("apple".to_string(), 0..47));
        assert_eq!(ranges[1], ("banana".to_string(), 47..90));
        assert_eq!(ranges[2], ("orange".to_string(), 90..130));

        // Non-overlapping and exhaustive
        assert_eq!(ranges[0].1.end, ranges[1].1.start);
        assert_eq!(ranges[1].1.end, ranges[2].1.start);
        assert_eq!(ranges[2].1.end, dataset.len());
    }

    #[test]
    fn test_class_ranges_survive_count_changes() {
        let dataset = dataset_with_labels(&[5, 0, 2]);

        let ranges = dataset.class_ranges();
        assert_eq!(ranges[0].1, 0..5);
        assert_eq!(ranges[1].1, 5..5);
        assert_eq!(ranges[2].1, 5..7);
    }

    #[test]
    fn test_expect_classes() {
        let dataset = dataset_with_labels(&[1, 1, 1]);
        assert!(dataset.expect_classes(&["apple", "banana", "orange"]).is_ok());
        assert!(dataset.expect_classes(&["apple", "kiwi", "orange"]).is_err());
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let result = FruitDataset::scan("/nonexistent/fruit/data", (32, 32));
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_counts() {
        let dataset = dataset_with_labels(&[4, 2, 1]);
        let stats = dataset.stats();
        assert_eq!(stats.total_samples, 7);
        assert_eq!(stats.class_counts, vec![4, 2, 1]);
    }
}
