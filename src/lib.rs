//! # CUB-200-2011 Bird Classifier
//!
//! A Rust library for bird species classification using the Burn framework.
//! Covers the full pipeline: building the label table from the CUB-200-2011
//! metadata files, training a MobileNet-style CNN, exporting a portable
//! inference bundle, and running predictions against it.
//!
//! ## Modules
//!
//! - `dataset`: metadata joining, species vocabulary, and Burn dataset glue
//! - `model`: CNN architecture and the portable model bundle
//! - `training`: the supervised training loop with validation-loss policies
//! - `inference`: bundle-backed prediction
//! - `utils`: logging, charts, and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cub_classifier::dataset::metadata::build_labels_csv;
//! use cub_classifier::inference::predictor::Predictor;
//!
//! // Build the label table once
//! build_labels_csv("data/CUB_200_2011".as_ref(), "model/labels.csv".as_ref())?;
//!
//! // ... train, then classify
//! let predictor = Predictor::from_bundle("model/export".as_ref(), Default::default())?;
//! let result = predictor.predict_file("bird.jpg".as_ref())?;
//! println!("{} ({})", result.species, result.confidence_percent());
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::loader::{BirdDataset, DatasetStats};
pub use dataset::metadata::build_labels_csv;
pub use dataset::split::{SplitConfig, TrainValSplit};
pub use dataset::vocab::SpeciesVocab;
pub use inference::predictor::{PredictionResult, Predictor};
pub use model::cnn::{BirdNet, BirdNetConfig};
pub use model::config::TrainingConfig;
pub use training::trainer::{run_training, TrainingHistory, TrainingState};
pub use utils::error::{CubError, Result};

/// Number of species in the full CUB-200-2011 dataset
pub const NUM_SPECIES: usize = 200;

/// Model input edge length (images are resized to IMAGE_SIZE x IMAGE_SIZE)
pub const IMAGE_SIZE: usize = 224;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
