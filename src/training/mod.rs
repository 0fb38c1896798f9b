//! Training module
//!
//! Provides the supervised training loop with the policies the pipeline
//! relies on: per-epoch checkpoints, learning-rate reduction on a
//! validation-loss plateau, and early stopping with best-weight restore.

pub mod trainer;

// Re-export main types for convenience
pub use trainer::{run_training, TrainingHistory, TrainingState};

// Re-export TrainingConfig from model::config where it's defined
pub use crate::model::config::TrainingConfig;

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 30;

/// Default batch size
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Default learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
