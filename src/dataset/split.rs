//! Train/Validation Split
//!
//! Shuffles the sample list with a seeded RNG and carves off a validation
//! fraction, mirroring the original pipeline's shuffle-then-take split.

use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::loader::BirdDataset;
use crate::utils::error::{CubError, Result};

/// Split configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of samples held out for validation (0.0-1.0 exclusive)
    pub validation_fraction: f64,
    /// Random seed for the shuffle
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.validation_fraction <= 0.0 || self.validation_fraction >= 1.0 {
            return Err(CubError::Config(format!(
                "validation_fraction must be in (0.0, 1.0), got {}",
                self.validation_fraction
            )));
        }
        Ok(())
    }
}

/// The two sample pools produced by a split
#[derive(Debug, Clone)]
pub struct TrainValSplit {
    pub train: Vec<(PathBuf, usize)>,
    pub validation: Vec<(PathBuf, usize)>,
}

impl TrainValSplit {
    /// Shuffle the samples and split off the validation fraction
    pub fn new(mut samples: Vec<(PathBuf, usize)>, config: &SplitConfig) -> Result<Self> {
        config.validate()?;
        if samples.is_empty() {
            return Err(CubError::Dataset("cannot split an empty sample list".to_string()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        samples.shuffle(&mut rng);

        let val_size = (samples.len() as f64 * config.validation_fraction) as usize;
        let validation: Vec<_> = samples.drain(..val_size).collect();

        Ok(Self {
            train: samples,
            validation,
        })
    }

    /// Split a loaded dataset
    pub fn from_dataset(dataset: &BirdDataset, config: &SplitConfig) -> Result<Self> {
        let samples: Vec<(PathBuf, usize)> = dataset
            .samples
            .iter()
            .map(|s| (s.path.clone(), s.label))
            .collect();
        Self::new(samples, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<(PathBuf, usize)> {
        (0..n)
            .map(|i| (PathBuf::from(format!("img_{}.jpg", i)), i % 5))
            .collect()
    }

    #[test]
    fn test_split_sizes() {
        let config = SplitConfig::default();
        let split = TrainValSplit::new(samples(100), &config).unwrap();

        assert_eq!(split.validation.len(), 20);
        assert_eq!(split.train.len(), 80);
    }

    #[test]
    fn test_split_is_deterministic() {
        let config = SplitConfig {
            validation_fraction: 0.25,
            seed: 9,
        };
        let a = TrainValSplit::new(samples(40), &config).unwrap();
        let b = TrainValSplit::new(samples(40), &config).unwrap();

        assert_eq!(a.train, b.train);
        assert_eq!(a.validation, b.validation);
    }

    #[test]
    fn test_split_is_disjoint() {
        let config = SplitConfig::default();
        let split = TrainValSplit::new(samples(50), &config).unwrap();

        for item in &split.validation {
            assert!(!split.train.contains(item));
        }
        assert_eq!(split.train.len() + split.validation.len(), 50);
    }

    #[test]
    fn test_invalid_fraction() {
        let config = SplitConfig {
            validation_fraction: 1.5,
            seed: 0,
        };
        assert!(TrainValSplit::new(samples(10), &config).is_err());
    }

    #[test]
    fn test_empty_samples() {
        let config = SplitConfig::default();
        assert!(TrainValSplit::new(Vec::new(), &config).is_err());
    }
}
