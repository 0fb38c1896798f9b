//! CSV-Backed Dataset Loader
//!
//! Loads the joined `labels.csv` table and resolves every row into a
//! labeled image sample. Labels are assigned from the species vocabulary
//! derived from the same table, so the class ordering is exactly
//! `sorted(unique species)`.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::metadata::read_labels_csv;
use crate::dataset::vocab::SpeciesVocab;
use crate::utils::error::{CubError, Result};

/// A single image sample with its label and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Absolute or relative path to the image file
    pub path: PathBuf,
    /// Class index into the species vocabulary
    pub label: usize,
    /// Species name, e.g. "001.Black_footed_Albatross"
    pub species: String,
    /// Image id from the CUB metadata
    pub image_id: u32,
}

/// CUB dataset resolved from `labels.csv`
#[derive(Debug)]
pub struct BirdDataset {
    /// Directory containing the dataset images
    pub images_dir: PathBuf,
    /// All samples in CSV order (until shuffled)
    pub samples: Vec<ImageSample>,
    /// Species vocabulary derived from the CSV
    pub vocab: SpeciesVocab,
}

impl BirdDataset {
    /// Load the dataset from a `labels.csv` and the images directory
    pub fn from_labels_csv(csv_path: &Path, images_dir: &Path) -> Result<Self> {
        info!("Loading dataset from {:?}", csv_path);

        let records = read_labels_csv(csv_path)?;
        if records.is_empty() {
            return Err(CubError::Dataset(format!("{:?} contains no rows", csv_path)));
        }

        let vocab = SpeciesVocab::from_species(records.iter().map(|r| r.species.clone()));

        let samples = records
            .into_iter()
            .map(|record| {
                let label = vocab.index_of(&record.species).ok_or_else(|| {
                    CubError::Dataset(format!(
                        "species '{}' missing from vocabulary",
                        record.species
                    ))
                })?;
                Ok(ImageSample {
                    path: images_dir.join(&record.image_filename),
                    label,
                    species: record.species,
                    image_id: record.image_id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded {} samples across {} species",
            samples.len(),
            vocab.len()
        );

        Ok(Self {
            images_dir: images_dir.to_path_buf(),
            samples,
            vocab,
        })
    }

    /// Number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of species
    pub fn num_species(&self) -> usize {
        self.vocab.len()
    }

    /// Shuffle the samples in place with a given seed
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.samples.shuffle(&mut rng);
    }

    /// Get statistics about the dataset
    pub fn get_stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_species()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_species: self.num_species(),
            class_counts,
            species: self.vocab.species().to_vec(),
        }
    }
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_species: usize,
    pub class_counts: Vec<usize>,
    pub species: Vec<String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\nDataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of species: {}", self.num_species);
        println!("\n  Samples per species:");

        for (idx, name) in self.species.iter().enumerate() {
            let count = self.class_counts[idx];
            let bar_len = (count as f32 / self.total_samples.max(1) as f32 * 40.0) as usize;
            let bar: String = "█".repeat(bar_len);
            println!("    {:3}. {:40} {:5} {}", idx, name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_labels_csv(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cub_loader_{}", name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("labels.csv");
        fs::write(
            &path,
            "image_id,image_filename,label,species\n\
             1,002.Laysan_Albatross/a.jpg,2,002.Laysan_Albatross\n\
             2,001.Black_footed_Albatross/b.jpg,1,001.Black_footed_Albatross\n\
             3,001.Black_footed_Albatross/c.jpg,1,001.Black_footed_Albatross\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_labels_follow_sorted_vocabulary() {
        let csv = write_labels_csv("vocab_order");
        let dataset = BirdDataset::from_labels_csv(&csv, Path::new("images")).unwrap();

        assert_eq!(dataset.num_species(), 2);
        // CSV row order preserved, labels assigned from the sorted vocabulary
        assert_eq!(dataset.samples[0].label, 1); // 002.Laysan_Albatross
        assert_eq!(dataset.samples[1].label, 0); // 001.Black_footed_Albatross
        assert_eq!(
            dataset.samples[0].path,
            Path::new("images").join("002.Laysan_Albatross/a.jpg")
        );
    }

    #[test]
    fn test_stats_counts() {
        let csv = write_labels_csv("stats");
        let dataset = BirdDataset::from_labels_csv(&csv, Path::new("images")).unwrap();

        let stats = dataset.get_stats();
        assert_eq!(stats.total_samples, 3);
        assert_eq!(stats.class_counts, vec![2, 1]);
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let csv = write_labels_csv("shuffle");
        let mut a = BirdDataset::from_labels_csv(&csv, Path::new("images")).unwrap();
        let mut b = BirdDataset::from_labels_csv(&csv, Path::new("images")).unwrap();

        a.shuffle(7);
        b.shuffle(7);

        let ids_a: Vec<u32> = a.samples.iter().map(|s| s.image_id).collect();
        let ids_b: Vec<u32> = b.samples.iter().map(|s| s.image_id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_missing_csv() {
        let err = BirdDataset::from_labels_csv(Path::new("/nonexistent/labels.csv"), Path::new("images"));
        assert!(matches!(err, Err(CubError::PathNotFound(_))));
    }
}
