//! Portable Model Bundle
//!
//! The trainer exports its final model as a self-contained directory that
//! the inference server loads without touching the training data:
//!
//! - `model.mpk` — full-precision weight record
//! - `manifest.json` — format version, input contract, architecture
//!   parameters, and the ordered species vocabulary
//!
//! Inputs are 224x224 RGB images normalized to [0, 1]; the manifest
//! records the edge length and channel count so a loader can verify the
//! contract before running anything.

use std::fs;
use std::path::Path;

use burn::module::Module;
use burn::record::{DefaultFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::vocab::SpeciesVocab;
use crate::model::cnn::{BirdNet, BirdNetConfig};
use crate::utils::error::{CubError, Result};

/// Version of the bundle layout
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Manifest file name inside the bundle directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Weight record base name (the recorder appends `.mpk`)
pub const WEIGHTS_FILE: &str = "model";

/// Bundle manifest describing the exported model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub format_version: u32,
    pub created_at: String,

    /// Input edge length; inputs are [1, in_channels, input_size, input_size]
    pub input_size: usize,
    pub in_channels: usize,

    /// Architecture parameters needed to rebuild the network
    pub base_filters: usize,
    pub hidden_units: usize,
    pub num_classes: usize,

    /// Ordered species vocabulary; position is the class index
    pub species: Vec<String>,
}

impl BundleManifest {
    /// Rebuild the model configuration recorded in this manifest
    pub fn model_config(&self) -> BirdNetConfig {
        BirdNetConfig::new()
            .with_num_classes(self.num_classes)
            .with_input_size(self.input_size)
            .with_in_channels(self.in_channels)
            .with_base_filters(self.base_filters)
            .with_hidden_units(self.hidden_units)
    }

    /// Check the manifest for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(CubError::Model(format!(
                "unsupported bundle version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }
        if self.species.len() != self.num_classes {
            return Err(CubError::Model(format!(
                "manifest lists {} species but the model has {} classes",
                self.species.len(),
                self.num_classes
            )));
        }
        Ok(())
    }
}

/// Export a trained model, its configuration, and the species vocabulary
/// as a portable bundle directory.
pub fn save_bundle<B: Backend>(
    model: &BirdNet<B>,
    config: &BirdNetConfig,
    vocab: &SpeciesVocab,
    dir: &Path,
) -> Result<()> {
    fs::create_dir_all(dir)?;

    let recorder = DefaultFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(dir.join(WEIGHTS_FILE), &recorder)
        .map_err(|e| CubError::Model(format!("failed to save weights: {:?}", e)))?;

    let manifest = BundleManifest {
        format_version: BUNDLE_FORMAT_VERSION,
        created_at: Utc::now().to_rfc3339(),
        input_size: config.input_size,
        in_channels: config.in_channels,
        base_filters: config.base_filters,
        hidden_units: config.hidden_units,
        num_classes: config.num_classes,
        species: vocab.species().to_vec(),
    };
    manifest.validate()?;

    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(dir.join(MANIFEST_FILE), json)?;

    info!(
        "Exported bundle to {:?} ({} species)",
        dir,
        manifest.species.len()
    );

    Ok(())
}

/// Read and validate a bundle manifest
pub fn read_manifest(dir: &Path) -> Result<BundleManifest> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let json = fs::read_to_string(&manifest_path)
        .map_err(|_| CubError::PathNotFound(manifest_path.clone()))?;
    let manifest: BundleManifest = serde_json::from_str(&json)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Load a bundle: rebuild the model from the manifest, restore the
/// weights, and return the species vocabulary alongside it.
pub fn load_bundle<B: Backend>(dir: &Path, device: &B::Device) -> Result<(BirdNet<B>, SpeciesVocab)> {
    let manifest = read_manifest(dir)?;

    let recorder = DefaultFileRecorder::<FullPrecisionSettings>::new();
    let model = BirdNet::<B>::new(&manifest.model_config(), device)
        .load_file(dir.join(WEIGHTS_FILE), &recorder, device)
        .map_err(|e| CubError::Model(format!("failed to load weights: {:?}", e)))?;

    let vocab = SpeciesVocab::from_ordered(manifest.species);

    info!("Loaded bundle from {:?} ({} species)", dir, vocab.len());

    Ok((model, vocab))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Tensor;

    type TestBackend = NdArray;

    fn test_config() -> BirdNetConfig {
        BirdNetConfig::new()
            .with_num_classes(3)
            .with_input_size(32)
            .with_base_filters(4)
            .with_hidden_units(16)
    }

    #[test]
    fn test_bundle_round_trip() {
        let dir = std::env::temp_dir().join("cub_bundle_roundtrip");
        let _ = fs::remove_dir_all(&dir);

        let device = Default::default();
        let config = test_config();
        let model = BirdNet::<TestBackend>::new(&config, &device);
        let vocab = SpeciesVocab::from_species(["c_bird", "a_bird", "b_bird"]);

        save_bundle(&model, &config, &vocab, &dir).unwrap();
        assert!(dir.join(MANIFEST_FILE).exists());

        let (loaded, loaded_vocab) = load_bundle::<TestBackend>(&dir, &device).unwrap();
        assert_eq!(loaded_vocab, vocab);
        assert_eq!(loaded_vocab.name(0), Some("a_bird"));

        // Restored weights produce the same outputs
        let input = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let original: Vec<f32> = model.forward(input.clone()).into_data().to_vec().unwrap();
        let restored: Vec<f32> = loaded.forward(input).into_data().to_vec().unwrap();

        for (a, b) in original.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_manifest_version_check() {
        let dir = std::env::temp_dir().join("cub_bundle_badversion");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            r#"{"format_version": 99, "created_at": "", "input_size": 32, "in_channels": 3,
                "base_filters": 4, "hidden_units": 16, "num_classes": 1, "species": ["a"]}"#,
        )
        .unwrap();

        let err = read_manifest(&dir);
        assert!(matches!(err, Err(CubError::Model(_))));
    }

    #[test]
    fn test_manifest_species_mismatch() {
        let manifest = BundleManifest {
            format_version: BUNDLE_FORMAT_VERSION,
            created_at: String::new(),
            input_size: 32,
            in_channels: 3,
            base_filters: 4,
            hidden_units: 16,
            num_classes: 5,
            species: vec!["a".to_string()],
        };
        assert!(manifest.validate().is_err());
    }
}
