//! Stratified k-fold cross-validation for the binary Random Forest.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{info, instrument};

use crate::cancel::CancellationToken;
use crate::config::RandomForestConfig;
use crate::confusion::ConfusionMatrix;
use crate::error::RfError;
use crate::forest::train_rows;
use crate::metrics::roc_auc;
use crate::node::{FeatureKind, N_CLASSES};
use crate::tree::validate_training_data;

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_*` setters.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
    threshold: f64,
}

/// Results of stratified k-fold cross-validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CrossValidationResult {
    /// Accuracy for each fold.
    pub fold_accuracies: Vec<f64>,
    /// ROC AUC for each fold.
    pub fold_aucs: Vec<f64>,
    /// Mean accuracy across folds.
    pub mean_accuracy: f64,
    /// Standard deviation of fold accuracies.
    pub std_accuracy: f64,
    /// Mean ROC AUC across folds.
    pub mean_auc: f64,
    /// Confusion matrix summed across all folds.
    pub confusion_matrix: ConfusionMatrix,
    /// Number of folds.
    pub n_folds: usize,
    /// Total number of samples.
    pub n_samples: usize,
    /// Number of features.
    pub n_features: usize,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            seed: 42,
            threshold: 0.5,
        })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the probability at or above which a held-out row is predicted positive.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Run stratified k-fold cross-validation.
    ///
    /// Splits the data into `n_folds` folds with approximately equal class
    /// distribution in each fold. Each fold trains a forest on the remaining
    /// folds and scores the held-out fold.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero samples |
    /// | [`RfError::TooFewSamplesForFolds`] | A class has fewer samples than folds |
    /// | Other RF errors | From input validation or underlying training |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = features.len()))]
    pub fn evaluate(
        &self,
        config: &RandomForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
        kinds: &[FeatureKind],
    ) -> Result<CrossValidationResult, RfError> {
        let n_features = validate_training_data(features, labels, kinds)?;
        let n_samples = features.len();

        let fold_assignments = self.stratified_split(labels)?;

        let mut fold_accuracies = Vec::with_capacity(self.n_folds);
        let mut fold_aucs = Vec::with_capacity(self.n_folds);
        let mut confusion_matrix = ConfusionMatrix::default();

        // Folds are index lists into the shared rows; nothing is copied.
        let cancel = CancellationToken::new();
        for fold in 0..self.n_folds {
            let (test_idx, train_idx): (Vec<usize>, Vec<usize>) =
                (0..n_samples).partition(|&i| fold_assignments[i] == fold);
            let test_labels: Vec<usize> = test_idx.iter().map(|&i| labels[i]).collect();

            // Each fold trains with different randomness.
            let fold_config = config.clone().with_seed(config.seed.wrapping_add(fold as u64));
            let result =
                train_rows(&fold_config, features, labels, kinds, &train_idx, &cancel)?;

            let forest = result.forest();
            let probabilities = test_idx
                .par_iter()
                .map(|&i| forest.predict_proba(&features[i]))
                .collect::<Result<Vec<f64>, RfError>>()?;
            let decisions: Vec<bool> = probabilities.iter().map(|&p| p >= self.threshold).collect();

            let fold_matrix = ConfusionMatrix::from_decisions(&test_labels, &decisions)?;
            let accuracy = fold_matrix.accuracy();
            // Both classes are present in every stratified fold.
            let auc = roc_auc(&test_labels, &probabilities).unwrap_or(0.5);
            fold_accuracies.push(accuracy);
            fold_aucs.push(auc);

            info!(fold, accuracy, auc, "fold completed");

            confusion_matrix.merge(&fold_matrix);
        }

        let n = self.n_folds as f64;
        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / n;
        let std_accuracy = {
            let variance = fold_accuracies
                .iter()
                .map(|&a| (a - mean_accuracy).powi(2))
                .sum::<f64>()
                / n;
            variance.sqrt()
        };
        let mean_auc = fold_aucs.iter().sum::<f64>() / n;

        info!(mean_accuracy, std_accuracy, mean_auc, "cross-validation complete");

        Ok(CrossValidationResult {
            fold_accuracies,
            fold_aucs,
            mean_accuracy,
            std_accuracy,
            mean_auc,
            confusion_matrix,
            n_folds: self.n_folds,
            n_samples,
            n_features,
        })
    }

    /// Create stratified fold assignments.
    ///
    /// Groups samples by class, shuffles within each class, then
    /// round-robins across folds so each fold gets approximately
    /// equal representation of each class.
    fn stratified_split(&self, labels: &[usize]) -> Result<Vec<usize>, RfError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut class_indices: Vec<Vec<usize>> = vec![vec![]; N_CLASSES];
        for (i, &label) in labels.iter().enumerate() {
            class_indices[label].push(i);
        }

        // Every fold needs both classes for training and AUC.
        for (class, indices) in class_indices.iter().enumerate() {
            if indices.len() < self.n_folds {
                return Err(RfError::TooFewSamplesForFolds {
                    class,
                    count: indices.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut fold_assignments = vec![0usize; labels.len()];
        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            for (j, &idx) in indices.iter().enumerate() {
                fold_assignments[idx] = j % self.n_folds;
            }
        }

        Ok(fold_assignments)
    }
}
