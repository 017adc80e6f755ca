//! Configuration builder for Random Forest training.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cancel::CancellationToken;
use crate::error::RfError;
use crate::node::FeatureKind;
use crate::result::RandomForestResult;
use crate::weights::ClassWeight;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// Square root of total features, rounded up.
    Sqrt,
    /// Log base 2 of total features.
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete feature count for a dataset of width `n_features`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxFeatures`] when the result is 0 or exceeds `n_features`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default    |
/// |--------------------|------------|
/// | `max_features`     | `Sqrt`     |
/// | `max_depth`        | `None`     |
/// | `min_samples_leaf` | 1          |
/// | `class_weight`     | `Balanced` |
/// | `seed`             | 42         |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_leaf: usize,
    pub(crate) class_weight: ClassWeight,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_leaf: 1,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the class weighting mode.
    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the class weighting mode.
    #[must_use]
    pub fn class_weight(&self) -> ClassWeight {
        self.class_weight
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the bootstrap sample tree `tree_index` draws from `n_samples` rows.
    ///
    /// This is exactly the sample [`fit`](Self::fit) uses for that tree, so
    /// callers can reason about which rows a given seed puts in the bag.
    #[must_use]
    pub fn bootstrap_indices(&self, tree_index: usize, n_samples: usize) -> Vec<usize> {
        let mut rng = tree_rng(self.seed, tree_index);
        bootstrap_sample(n_samples, &mut rng)
    }

    /// Train a Random Forest on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]` is row-major, `labels[sample_idx]`
    /// is 0 or 1, and `kinds[feature_idx]` marks continuous and indicator columns.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                              |
    /// |------------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]          | `features` is empty                               |
    /// | [`RfError::ZeroFeatures`]          | rows have zero feature columns                    |
    /// | [`RfError::FeatureCountMismatch`]  | rows have inconsistent lengths                    |
    /// | [`RfError::LengthMismatch`]        | labels or kinds have the wrong length             |
    /// | [`RfError::NonFiniteValue`]        | any value is NaN or infinite                      |
    /// | [`RfError::InvalidLabel`]          | a label is not 0 or 1                             |
    /// | [`RfError::InvalidMaxFeatures`]    | resolved max_features is outside [1, n_features]  |
    /// | [`RfError::InvalidMaxDepth`]       | `max_depth` is `Some(0)`                          |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf` is zero                        |
    /// | [`RfError::TrainingAborted`]       | labels contain a single class                     |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        kinds: &[FeatureKind],
    ) -> Result<RandomForestResult, RfError> {
        self.fit_with_cancel(features, labels, kinds, &CancellationToken::new())
    }

    /// Train like [`fit`](Self::fit), checking `cancel` before each tree starts.
    ///
    /// # Errors
    ///
    /// Everything [`fit`](Self::fit) returns, plus [`RfError::TrainingAborted`]
    /// once `cancel` is set.
    pub fn fit_with_cancel(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        kinds: &[FeatureKind],
        cancel: &CancellationToken,
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, features, labels, kinds, cancel)
    }
}

/// Per-tree generator: the master seed on stream `tree_index`.
///
/// Streams are independent of scheduling, so forests are identical for any
/// thread count.
pub(crate) fn tree_rng(seed: u64, tree_index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(tree_index as u64);
    rng
}

/// Draw `n_samples` row indices with replacement.
pub(crate) fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(RfError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn defaults() {
        let config = RandomForestConfig::new(10).unwrap();
        assert_eq!(config.n_trees(), 10);
        assert_eq!(config.max_features(), MaxFeatures::Sqrt);
        assert_eq!(config.max_depth(), None);
        assert_eq!(config.min_samples_leaf(), 1);
        assert_eq!(config.class_weight(), ClassWeight::Balanced);
        assert_eq!(config.seed(), 42);
    }

    #[test]
    fn sqrt_rounds_up() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10).unwrap(), 4);
        assert_eq!(MaxFeatures::Sqrt.resolve(9).unwrap(), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(1).unwrap(), 1);
    }

    #[test]
    fn fixed_out_of_range_rejected() {
        assert!(matches!(
            MaxFeatures::Fixed(5).resolve(3),
            Err(RfError::InvalidMaxFeatures { max_features: 5, n_features: 3 })
        ));
        assert!(MaxFeatures::Fixed(0).resolve(3).is_err());
    }

    #[test]
    fn bootstrap_indices_are_reproducible_and_in_range() {
        let config = RandomForestConfig::new(3).unwrap().with_seed(7);
        let a = config.bootstrap_indices(1, 50);
        let b = config.bootstrap_indices(1, 50);
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.iter().all(|&i| i < 50));
    }

    #[test]
    fn trees_use_distinct_streams() {
        let config = RandomForestConfig::new(2).unwrap();
        assert_ne!(config.bootstrap_indices(0, 100), config.bootstrap_indices(1, 100));
    }
}
