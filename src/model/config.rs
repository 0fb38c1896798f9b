//! Training Configuration
//!
//! Hyperparameters and file locations for a training run, serializable so
//! a run's configuration can be saved next to its artifacts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{CubError, Result};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,

    /// Batch size for training
    pub batch_size: usize,

    /// Initial learning rate
    pub learning_rate: f64,

    /// Fraction of samples held out for validation
    pub validation_fraction: f64,

    /// Random seed for shuffling and splitting
    pub seed: u64,

    /// Stop after this many epochs without validation-loss improvement
    pub early_stopping_patience: usize,

    /// Halve the learning rate after this many epochs without improvement
    pub lr_reduce_patience: usize,

    /// Multiplier applied to the learning rate on plateau
    pub lr_reduce_factor: f64,

    /// Directory for per-epoch checkpoints
    pub checkpoint_dir: String,

    /// Directory for the final model, exported bundle, and charts
    pub output_dir: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 30,
            batch_size: 32,
            learning_rate: 1e-3,
            validation_fraction: 0.2,
            seed: 42,
            early_stopping_patience: 4,
            lr_reduce_patience: 2,
            lr_reduce_factor: 0.5,
            checkpoint_dir: "model/checkpoints".to_string(),
            output_dir: "model".to_string(),
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(CubError::Config("epochs must be greater than 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(CubError::Config("batch_size must be greater than 0".to_string()));
        }
        if self.learning_rate <= 0.0 {
            return Err(CubError::Config("learning_rate must be positive".to_string()));
        }
        if self.validation_fraction <= 0.0 || self.validation_fraction >= 1.0 {
            return Err(CubError::Config(
                "validation_fraction must be in (0.0, 1.0)".to_string(),
            ));
        }
        if self.lr_reduce_factor <= 0.0 || self.lr_reduce_factor >= 1.0 {
            return Err(CubError::Config(
                "lr_reduce_factor must be in (0.0, 1.0)".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|_| CubError::PathNotFound(path.to_path_buf()))?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 30);
        assert_eq!(config.batch_size, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = TrainingConfig::default();
        config.epochs = 0;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.validation_fraction = 1.0;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.lr_reduce_factor = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = std::env::temp_dir().join("cub_training_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let config = TrainingConfig {
            epochs: 5,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = TrainingConfig::load(&path).unwrap();
        assert_eq!(loaded.epochs, 5);
        assert_eq!(loaded.batch_size, config.batch_size);
    }
}
