//! Burn Dataset Integration
//!
//! Implements Burn's `Dataset` trait and `Batcher` for loading and
//! batching bird images during training. Preprocessing lives here so the
//! trainer and the inference path share one input contract: resize to the
//! model edge length, RGB, [0,1] floats, CHW layout.

use std::path::{Path, PathBuf};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::utils::error::{CubError, Result};

/// Convert an image to a flat CHW float array normalized to [0, 1].
///
/// The image is resized to `image_size` x `image_size` with a triangle
/// filter and converted to RGB first.
pub fn image_to_chw(image: &DynamicImage, image_size: usize) -> Vec<f32> {
    let rgb = image
        .resize_exact(image_size as u32, image_size as u32, FilterType::Triangle)
        .to_rgb8();

    let num_pixels = image_size * image_size;
    let mut data = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in rgb.pixels().enumerate() {
        data[i] = pixel[0] as f32 / 255.0;
        data[num_pixels + i] = pixel[1] as f32 / 255.0;
        data[2 * num_pixels + i] = pixel[2] as f32 / 255.0;
    }

    data
}

/// A single preprocessed sample ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BirdItem {
    /// Image data as flattened CHW float array [3 * H * W]
    pub image: Vec<f32>,
    /// Class index into the species vocabulary
    pub label: usize,
    /// Image path (for logging)
    pub path: String,
}

impl BirdItem {
    /// Load and preprocess an image from disk
    pub fn from_path(path: &Path, label: usize, image_size: usize) -> Result<Self> {
        let img = image::open(path)
            .map_err(|e| CubError::ImageLoad(path.to_path_buf(), e.to_string()))?;

        Ok(Self {
            image: image_to_chw(&img, image_size),
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create from pre-loaded image data
    pub fn from_data(image: Vec<f32>, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

/// Image dataset implementing Burn's `Dataset` trait.
///
/// Images are loaded lazily by default; `new_cached` preloads everything
/// into memory for small datasets.
#[derive(Debug, Clone)]
pub struct BirdImageDataset {
    samples: Vec<(PathBuf, usize)>,
    image_size: usize,
    cached_items: Option<Vec<BirdItem>>,
}

impl BirdImageDataset {
    /// Create a lazy dataset from `(path, label)` pairs
    pub fn new(samples: Vec<(PathBuf, usize)>, image_size: usize) -> Self {
        Self {
            samples,
            image_size,
            cached_items: None,
        }
    }

    /// Create a dataset with all images preloaded into memory
    pub fn new_cached(samples: Vec<(PathBuf, usize)>, image_size: usize) -> Result<Self> {
        let cached_items = samples
            .iter()
            .map(|(path, label)| BirdItem::from_path(path, *label, image_size))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            samples,
            image_size,
            cached_items: Some(cached_items),
        })
    }

    /// Load one item, propagating decode failures.
    ///
    /// The training loop goes through this instead of `Dataset::get` so a
    /// missing or corrupt image aborts the run rather than being skipped.
    pub fn try_item(&self, index: usize) -> Result<BirdItem> {
        if let Some(ref cached) = self.cached_items {
            return cached
                .get(index)
                .cloned()
                .ok_or_else(|| CubError::Dataset(format!("index {} out of bounds", index)));
        }

        let (path, label) = self
            .samples
            .get(index)
            .ok_or_else(|| CubError::Dataset(format!("index {} out of bounds", index)))?;
        BirdItem::from_path(path, *label, self.image_size)
    }

    /// Per-class sample counts
    pub fn class_distribution(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for (_, label) in &self.samples {
            if *label < num_classes {
                counts[*label] += 1;
            }
        }
        counts
    }
}

impl Dataset<BirdItem> for BirdImageDataset {
    fn get(&self, index: usize) -> Option<BirdItem> {
        self.try_item(index).ok()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A batch of bird images for training or evaluation
#[derive(Clone, Debug)]
pub struct BirdBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher assembling `BirdItem`s into tensors
#[derive(Clone, Debug)]
pub struct BirdBatcher {
    image_size: usize,
}

impl BirdBatcher {
    /// Create a batcher for the given image edge length
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, BirdItem, BirdBatch<B>> for BirdBatcher {
    fn batch(&self, items: Vec<BirdItem>, device: &B::Device) -> BirdBatch<B> {
        let batch_size = items.len();
        let pixels_per_item = 3 * self.image_size * self.image_size;

        let mut pixels = Vec::with_capacity(batch_size * pixels_per_item);
        let mut targets = Vec::with_capacity(batch_size);
        for item in &items {
            pixels.extend_from_slice(&item.image);
            targets.push(item.label as i64);
        }

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), device).reshape([
            batch_size,
            3,
            self.image_size,
            self.image_size,
        ]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), device);

        BirdBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_image_to_chw_range_and_layout() {
        let mut img = image::RgbImage::new(8, 8);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([255, 0, 128]);
        }
        let data = image_to_chw(&DynamicImage::ImageRgb8(img), 8);

        assert_eq!(data.len(), 3 * 8 * 8);
        assert!(data.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // CHW: first plane is red, second green, third blue
        assert!((data[0] - 1.0).abs() < 1e-6);
        assert!(data[64].abs() < 1e-6);
        assert!((data[128] - 128.0 / 255.0).abs() < 1e-2);
    }

    #[test]
    fn test_item_from_disk() {
        let dir = std::env::temp_dir().join("cub_burn_dataset_item");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bird.png");
        image::RgbImage::new(10, 6).save(&path).unwrap();

        let item = BirdItem::from_path(&path, 3, 16).unwrap();
        assert_eq!(item.label, 3);
        assert_eq!(item.image.len(), 3 * 16 * 16);
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let err = BirdItem::from_path(Path::new("/nonexistent/bird.jpg"), 0, 16);
        assert!(matches!(err, Err(CubError::ImageLoad(_, _))));
    }

    #[test]
    fn test_batcher_shapes() {
        let items = vec![
            BirdItem::from_data(vec![0.5; 3 * 16 * 16], 1, "a.jpg".to_string()),
            BirdItem::from_data(vec![0.25; 3 * 16 * 16], 4, "b.jpg".to_string()),
        ];

        let batcher = BirdBatcher::new(16);
        let device = Default::default();
        let batch: BirdBatch<TestBackend> = batcher.batch(items, &device);

        assert_eq!(batch.images.dims(), [2, 3, 16, 16]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![1, 4]);
    }

    #[test]
    fn test_class_distribution() {
        let samples = vec![
            (PathBuf::from("a.jpg"), 0),
            (PathBuf::from("b.jpg"), 0),
            (PathBuf::from("c.jpg"), 1),
            (PathBuf::from("d.jpg"), 2),
        ];

        let dataset = BirdImageDataset::new(samples, 16);
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.class_distribution(3), vec![2, 1, 1]);
    }
}
