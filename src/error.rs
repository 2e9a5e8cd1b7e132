//! Error types for visual secret sharing operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for visual secret sharing operations
pub type Result<T> = std::result::Result<T, VCError>;

/// Error types for visual secret sharing operations
#[derive(Debug, Error)]
pub enum VCError {
    /// Invalid threshold parameters or malformed image geometry
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Not enough distinct participants to reconstruct
    #[error("Insufficient shares: required {required}, provided {provided}")]
    InsufficientShares { required: usize, provided: usize },
    /// Shares disagree on geometry or scheme parameters
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// The image codec could not decode a file into a pixel grid
    #[error("Failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Image encoding error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
    /// Session manifest could not be read or written
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = VCError::InsufficientShares {
            required: 3,
            provided: 2,
        };
        assert_eq!(err.to_string(), "Insufficient shares: required 3, provided 2");

        let err = VCError::InvalidConfiguration("k must be at least 2".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: k must be at least 2");
    }
}
