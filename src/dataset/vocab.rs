//! Species Vocabulary
//!
//! The sorted set of unique species names defines the class ordering: the
//! position of a species in the vocabulary is its class index, both during
//! training and serving.
//!
//! The vocabulary is an explicit, versioned artifact. The trainer derives
//! it once from `labels.csv` and persists it inside the exported model
//! bundle; the server loads it from there and never recomputes it, so the
//! two sides cannot drift apart.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{CubError, Result};

/// Version of the persisted vocabulary format
pub const VOCAB_FORMAT_VERSION: u32 = 1;

/// Ordered species vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesVocab {
    version: u32,
    species: Vec<String>,
}

impl SpeciesVocab {
    /// Build a vocabulary from an arbitrary collection of species names.
    /// Names are sorted and deduplicated; the sorted position is the index.
    pub fn from_species<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut species: Vec<String> = names.into_iter().map(Into::into).collect();
        species.sort();
        species.dedup();
        Self {
            version: VOCAB_FORMAT_VERSION,
            species,
        }
    }

    /// Rebuild a vocabulary from an already-ordered list, e.g. one read
    /// back from a bundle manifest. The order is trusted as-is.
    pub fn from_ordered(species: Vec<String>) -> Self {
        Self {
            version: VOCAB_FORMAT_VERSION,
            species,
        }
    }

    /// Derive the vocabulary from a `labels.csv` produced by the builder
    pub fn from_labels_csv(path: &Path) -> Result<Self> {
        let records = super::metadata::read_labels_csv(path)?;
        if records.is_empty() {
            return Err(CubError::Dataset(format!(
                "no species found in {:?}",
                path
            )));
        }
        Ok(Self::from_species(records.into_iter().map(|r| r.species)))
    }

    /// Class index for a species name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s == name)
    }

    /// Species name for a class index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.species.get(index).map(String::as_str)
    }

    /// Number of species
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Check if the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// The ordered species list
    pub fn species(&self) -> &[String] {
        &self.species
    }

    /// Save the vocabulary as a JSON artifact
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a vocabulary artifact, rejecting unknown format versions
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|_| CubError::PathNotFound(path.to_path_buf()))?;
        let vocab: Self = serde_json::from_str(&json)?;
        if vocab.version != VOCAB_FORMAT_VERSION {
            return Err(CubError::Config(format!(
                "unsupported vocabulary version {} (expected {})",
                vocab.version, VOCAB_FORMAT_VERSION
            )));
        }
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_unique_ordering() {
        let vocab = SpeciesVocab::from_species([
            "003.Sooty_Albatross",
            "001.Black_footed_Albatross",
            "002.Laysan_Albatross",
            "001.Black_footed_Albatross",
        ]);

        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.name(0), Some("001.Black_footed_Albatross"));
        assert_eq!(vocab.name(2), Some("003.Sooty_Albatross"));
        assert_eq!(vocab.index_of("002.Laysan_Albatross"), Some(1));
        assert_eq!(vocab.index_of("unknown"), None);
        assert_eq!(vocab.name(3), None);
    }

    #[test]
    fn test_from_ordered_preserves_order() {
        let vocab = SpeciesVocab::from_ordered(vec!["b".to_string(), "a".to_string()]);
        assert_eq!(vocab.name(0), Some("b"));
        assert_eq!(vocab.name(1), Some("a"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let path = std::env::temp_dir().join("cub_vocab_roundtrip/species.json");
        let vocab = SpeciesVocab::from_species(["b", "a", "c"]);

        vocab.save(&path).unwrap();
        let loaded = SpeciesVocab::load(&path).unwrap();

        assert_eq!(vocab, loaded);
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let path = std::env::temp_dir().join("cub_vocab_badversion.json");
        std::fs::write(&path, r#"{"version": 99, "species": ["a"]}"#).unwrap();

        let err = SpeciesVocab::load(&path);
        assert!(matches!(err, Err(CubError::Config(_))));
    }
}
