//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::node::{CLASS_LABELS, N_CLASSES};

impl RandomForest {
    /// Return the positive-class probability for a single sample.
    ///
    /// The arithmetic mean over trees of each leaf's positive-class fraction,
    /// so the result lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict_proba(sample)?[1];
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Return `true` when the positive-class probability is at least `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64], threshold: f64) -> Result<bool, RfError> {
        Ok(self.predict_proba(sample)? >= threshold)
    }

    /// Return positive-class probabilities for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_proba_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Return decisions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>], threshold: f64) -> Result<Vec<bool>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample, threshold))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the class labels, negative first.
    #[must_use]
    pub fn classes(&self) -> [usize; N_CLASSES] {
        CLASS_LABELS
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
