//! Model artifacts and scoring for readmission risk.
//!
//! Freezes a fitted [`Schema`](readmit_features::Schema) and
//! [`RandomForest`](readmit_rf::RandomForest) into an immutable, versioned
//! [`ModelArtifact`], and serves it through a [`ScoringService`] whose
//! artifact can be replaced atomically while requests are in flight.

mod artifact;
mod error;
mod pipeline;
mod service;

pub use artifact::{ArtifactMetadata, FORMAT_VERSION, ModelArtifact};
pub use error::ModelError;
pub use pipeline::{EncodedDataset, encode_records, feature_kinds, train_artifact};
pub use service::{DECISION_THRESHOLD, Score, ScoringService};
