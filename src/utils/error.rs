//! Error Handling Module
//!
//! Defines custom error types for the CUB classifier library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for CUB classifier operations
#[derive(Error, Debug)]
pub enum CubError {
    /// Error loading or processing an image at a known path
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error decoding or processing image data
    #[error("Image error: {0}")]
    Image(String),

    /// Error parsing the CUB metadata files
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model operations
    #[error("Model error: {0}")]
    Model(String),

    /// Error with training
    #[error("Training error: {0}")]
    Training(String),

    /// Error with inference
    #[error("Inference error: {0}")]
    Inference(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl From<serde_json::Error> for CubError {
    fn from(err: serde_json::Error) -> Self {
        CubError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for CubError {
    fn from(err: image::ImageError) -> Self {
        CubError::Image(err.to_string())
    }
}

/// Convenience Result type for CUB classifier operations
pub type Result<T> = std::result::Result<T, CubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CubError::Dataset("test error".to_string());
        assert_eq!(format!("{}", err), "Dataset error: test error");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/image.jpg");
        let err = CubError::ImageLoad(path.clone(), "file not found".to_string());
        assert!(format!("{}", err).contains("image.jpg"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CubError = io_err.into();
        assert!(matches!(err, CubError::Io(_)));
    }
}
