//! Inference module
//!
//! Single-image prediction against an exported model bundle. The
//! predictor is read-only after loading, so one instance can be shared
//! across server requests.

pub mod predictor;

// Re-export main types for convenience
pub use predictor::{PredictionResult, Predictor};
