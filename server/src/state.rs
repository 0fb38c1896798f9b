//! Application state for the inference server
//!
//! Holds the model bundle loaded once at startup. The predictor and its
//! species vocabulary are read-only after loading, so requests share one
//! instance with no locking.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use cub_classifier::backend::{default_device, DefaultBackend};
use cub_classifier::inference::predictor::Predictor;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory containing the exported model bundle
    pub bundle_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bundle_dir: PathBuf::from("model/export"),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Loaded model and species vocabulary
    pub predictor: Predictor<DefaultBackend>,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    /// Load the model bundle and build the shared state
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let predictor = Predictor::from_bundle(&config.bundle_dir, default_device())?;

        Ok(Self {
            config,
            predictor,
            started_at: Instant::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
