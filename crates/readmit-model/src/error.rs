use std::path::PathBuf;

use readmit_features::FeatureError;
use readmit_rf::RfError;

/// Errors from building, persisting, loading, or scoring a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when an artifact's schema, trees, or header disagree.
    #[error("model artifact is inconsistent: {reason}")]
    SchemaMismatch {
        /// Human-readable description of the inconsistency.
        reason: String,
    },

    /// Returned when artifact serialization fails.
    #[error("failed to serialize model artifact")]
    Serialize {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when artifact bytes cannot be decoded.
    #[error("failed to deserialize model artifact")]
    Deserialize {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when reading the artifact file fails.
    #[error("failed to read model artifact from {path}")]
    Read {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when writing the artifact file fails.
    #[error("failed to write model artifact to {path}")]
    Write {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when feature encoding fails.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Returned when forest training or prediction fails.
    #[error(transparent)]
    Rf(#[from] RfError),
}
