//! Training result types for Random Forest.

use crate::forest::RandomForest;
use crate::node::N_CLASSES;

/// Metadata about the training run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainingMetadata {
    /// Number of trees trained.
    pub n_trees: usize,
    /// Number of features in the dataset.
    pub n_features: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Number of samples labelled positive.
    pub n_positive: usize,
    /// Per-class sample weights used, `[negative, positive]`.
    pub class_weights: [f64; N_CLASSES],
    /// Resolved max_features value used.
    pub max_features_resolved: usize,
}

/// Result of Random Forest training: the fitted forest and run metadata.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    /// Create a new training result.
    pub(crate) fn new(forest: RandomForest, metadata: TrainingMetadata) -> Self {
        Self { forest, metadata }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Consume the result and return forest and metadata.
    #[must_use]
    pub fn into_parts(self) -> (RandomForest, TrainingMetadata) {
        (self.forest, self.metadata)
    }
}
