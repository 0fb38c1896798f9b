//! Inference Predictor
//!
//! Runs single-image predictions against a portable model bundle. The
//! predictor owns the loaded model and the species vocabulary, so the
//! class ordering used at serving time is exactly the one persisted at
//! training time.

use std::path::Path;
use std::time::{Duration, Instant};

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::dataset::burn_dataset::image_to_chw;
use crate::dataset::vocab::SpeciesVocab;
use crate::model::bundle;
use crate::model::cnn::BirdNet;
use crate::utils::error::{CubError, Result};
use crate::IMAGE_SIZE;

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted species name
    pub species: String,

    /// Predicted class index into the species vocabulary
    pub class_index: usize,

    /// Probability of the predicted class (0.0 - 1.0)
    pub confidence: f32,

    /// Full probability distribution over all species
    pub probabilities: Vec<f32>,

    /// Top-k predictions as (class_index, species, probability)
    pub top_k: Vec<(usize, String, f32)>,

    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

impl PredictionResult {
    /// Build a result from a probability vector
    pub fn new(probabilities: Vec<f32>, vocab: &SpeciesVocab, inference_time: Duration) -> Self {
        let (class_index, &confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, &0.0));

        let species = vocab.name(class_index).unwrap_or("Unknown").to_string();

        let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let top_k: Vec<(usize, String, f32)> = indexed
            .iter()
            .take(5)
            .map(|&(idx, prob)| {
                let name = vocab.name(idx).unwrap_or("Unknown").to_string();
                (idx, name, prob)
            })
            .collect();

        Self {
            species,
            class_index,
            confidence,
            probabilities,
            top_k,
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
        }
    }

    /// Confidence formatted as a percentage string, e.g. "97.31%"
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }

    /// Pretty print the prediction result
    pub fn display(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Prediction: {} (class {})\n",
            self.species, self.class_index
        ));
        output.push_str(&format!("Confidence: {}\n", self.confidence_percent()));
        output.push_str(&format!(
            "Inference time: {:.2} ms\n",
            self.inference_time_ms
        ));

        output.push_str("\nTop-5 predictions:\n");
        for (i, (idx, name, prob)) in self.top_k.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} (class {}) - {:.2}%\n",
                i + 1,
                name,
                idx,
                prob * 100.0
            ));
        }

        output
    }
}

/// Predictor holding a loaded model and its species vocabulary
pub struct Predictor<B: Backend> {
    model: BirdNet<B>,
    vocab: SpeciesVocab,
    device: B::Device,
    image_size: usize,
}

impl<B: Backend> Predictor<B> {
    /// Load a predictor from a portable model bundle
    pub fn from_bundle(dir: &Path, device: B::Device) -> Result<Self> {
        let (model, vocab) = bundle::load_bundle::<B>(dir, &device)?;
        Ok(Self {
            model,
            vocab,
            device,
            image_size: IMAGE_SIZE,
        })
    }

    /// Assemble a predictor from already-loaded parts
    pub fn from_parts(model: BirdNet<B>, vocab: SpeciesVocab, device: B::Device) -> Self {
        Self {
            model,
            vocab,
            device,
            image_size: IMAGE_SIZE,
        }
    }

    /// Override the preprocessing edge length
    pub fn with_image_size(mut self, image_size: usize) -> Self {
        self.image_size = image_size;
        self
    }

    /// The species vocabulary this predictor classifies into
    pub fn vocab(&self) -> &SpeciesVocab {
        &self.vocab
    }

    /// Classify a decoded image
    pub fn predict_image(&self, image: &DynamicImage) -> Result<PredictionResult> {
        let start = Instant::now();

        let data = image_to_chw(image, self.image_size);
        let input = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            3,
            self.image_size,
            self.image_size,
        ]);

        let probs = self.model.forward_softmax(input);
        let probabilities: Vec<f32> = probs
            .into_data()
            .to_vec()
            .map_err(|e| CubError::Inference(format!("failed to read probabilities: {:?}", e)))?;

        Ok(PredictionResult::new(
            probabilities,
            &self.vocab,
            start.elapsed(),
        ))
    }

    /// Decode and classify raw image bytes (e.g. an HTTP upload)
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<PredictionResult> {
        let image = image::load_from_memory(bytes)?;
        self.predict_image(&image)
    }

    /// Classify an image file
    pub fn predict_file(&self, path: &Path) -> Result<PredictionResult> {
        let image = image::open(path)
            .map_err(|e| CubError::ImageLoad(path.to_path_buf(), e.to_string()))?;
        self.predict_image(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cnn::BirdNetConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn test_vocab() -> SpeciesVocab {
        SpeciesVocab::from_species(["001.Albatross", "002.Finch", "003.Sparrow", "004.Warbler"])
    }

    fn test_predictor() -> Predictor<TestBackend> {
        let device = Default::default();
        let config = BirdNetConfig::new()
            .with_num_classes(4)
            .with_input_size(32)
            .with_base_filters(4)
            .with_hidden_units(16);
        let model = BirdNet::<TestBackend>::new(&config, &device);
        Predictor::from_parts(model, test_vocab(), device).with_image_size(32)
    }

    #[test]
    fn test_prediction_result_argmax() {
        let probs = vec![0.1, 0.7, 0.15, 0.05];
        let result = PredictionResult::new(probs, &test_vocab(), Duration::from_millis(5));

        assert_eq!(result.class_index, 1);
        assert_eq!(result.species, "002.Finch");
        assert!((result.confidence - 0.7).abs() < 1e-6);
        assert_eq!(result.top_k.len(), 4);
        assert_eq!(result.top_k[0].0, 1);
        assert_eq!(result.top_k[1].0, 2);
    }

    #[test]
    fn test_confidence_percent_format() {
        let probs = vec![0.05, 0.05, 0.9, 0.0];
        let result = PredictionResult::new(probs, &test_vocab(), Duration::from_millis(1));

        assert_eq!(result.confidence_percent(), "90.00%");
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let predictor = test_predictor();
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            50,
            40,
            image::Rgb([120, 200, 30]),
        ));

        let first = predictor.predict_image(&image).unwrap();
        let second = predictor.predict_image(&image).unwrap();

        assert_eq!(first.class_index, second.class_index);
        assert_eq!(first.probabilities, second.probabilities);
    }

    #[test]
    fn test_prediction_bounds() {
        let predictor = test_predictor();
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(20, 20));

        let result = predictor.predict_image(&image).unwrap();

        assert!(result.class_index < predictor.vocab().len());
        assert!((0.0..=1.0).contains(&result.confidence));
        assert_eq!(result.probabilities.len(), 4);
        let sum: f32 = result.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_non_image_bytes_fail() {
        let predictor = test_predictor();
        let err = predictor.predict_bytes(b"definitely not an image");
        assert!(matches!(err, Err(CubError::Image(_))));
    }
}
