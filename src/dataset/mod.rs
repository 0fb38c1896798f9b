//! Dataset module for CUB-200-2011 data handling
//!
//! This module provides functionality for:
//! - Joining the CUB metadata files into a single label table
//! - Deriving and persisting the species vocabulary
//! - Loading labeled samples and splitting them into train/validation pools
//! - Batching preprocessed images for the Burn framework

pub mod burn_dataset;
pub mod loader;
pub mod metadata;
pub mod split;
pub mod vocab;

// Re-export main types for convenience
pub use burn_dataset::{image_to_chw, BirdBatch, BirdBatcher, BirdImageDataset, BirdItem};
pub use loader::{BirdDataset, DatasetStats, ImageSample};
pub use metadata::{build_labels_csv, read_labels_csv, ImageRecord};
pub use split::{SplitConfig, TrainValSplit};
pub use vocab::{SpeciesVocab, VOCAB_FORMAT_VERSION};
