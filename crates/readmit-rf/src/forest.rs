//! Random Forest training with parallel tree construction.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::cancel::CancellationToken;
use crate::config::{RandomForestConfig, bootstrap_sample, tree_rng};
use crate::error::RfError;
use crate::node::FeatureKind;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::split::TrainingView;
use crate::tree::{DecisionTree, DecisionTreeConfig, validate_training_data};
use crate::weights::class_counts;

/// A fitted binary Random Forest ensemble.
///
/// Every tree expects vectors of the same length, `n_features`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
}

impl RandomForest {
    /// Assemble a forest from already-built trees.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`validate`](Self::validate).
    pub fn from_trees(trees: Vec<DecisionTree>, n_features: usize) -> Result<Self, RfError> {
        let forest = Self { trees, n_features };
        forest.validate()?;
        Ok(forest)
    }

    /// Check the ensemble is non-empty and every tree is well formed for `n_features`.
    ///
    /// # Errors
    ///
    /// | Variant                    | When                                          |
    /// |----------------------------|-----------------------------------------------|
    /// | [`RfError::EmptyForest`]   | there are no trees                            |
    /// | [`RfError::MalformedTree`] | a tree disagrees on width or fails its checks |
    pub fn validate(&self) -> Result<(), RfError> {
        if self.trees.is_empty() {
            return Err(RfError::EmptyForest);
        }
        for (tree_index, tree) in self.trees.iter().enumerate() {
            if tree.n_features() != self.n_features {
                return Err(RfError::MalformedTree {
                    node_index: 0,
                    reason: format!(
                        "tree {tree_index} expects {} features, forest has {}",
                        tree.n_features(),
                        self.n_features
                    ),
                });
            }
            tree.validate()?;
        }
        Ok(())
    }

    /// Return the trees in ensemble order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    kinds: &[FeatureKind],
    cancel: &CancellationToken,
) -> Result<RandomForestResult, RfError> {
    validate_training_data(features, labels, kinds)?;
    let rows: Vec<usize> = (0..features.len()).collect();
    train_rows(config, features, labels, kinds, &rows, cancel)
}

/// Train on the subset `rows` of already validated data without copying it.
///
/// Bootstrap draws are positions into `rows`, so with `rows = 0..n` this
/// matches [`RandomForestConfig::bootstrap_indices`] exactly.
pub(crate) fn train_rows(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    kinds: &[FeatureKind],
    rows: &[usize],
    cancel: &CancellationToken,
) -> Result<RandomForestResult, RfError> {
    let n_features = kinds.len();
    let n_samples = rows.len();
    if n_samples == 0 {
        return Err(RfError::EmptyDataset);
    }

    let row_labels: Vec<usize> = rows.iter().map(|&r| labels[r]).collect();
    let counts = class_counts(&row_labels);
    if counts.contains(&0) {
        return Err(RfError::TrainingAborted {
            reason: format!(
                "labels contain a single class ({} negative, {} positive)",
                counts[0], counts[1]
            ),
        });
    }

    // --- Validate config ---
    let max_features_resolved = config.max_features.resolve(n_features)?;
    let tree_config = DecisionTreeConfig::new()
        .with_max_depth(config.max_depth)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));
    tree_config.validate(n_features)?;

    // Indexed by global row; rows outside the subset are never drawn.
    let class_weights = config.class_weight.resolve(counts);
    let sample_weights: Vec<f64> = labels.iter().map(|&l| class_weights[l]).collect();

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_positive = counts[1],
        max_features = max_features_resolved,
        ?class_weights,
        "training random forest"
    );

    let view = TrainingView {
        features,
        labels,
        weights: &sample_weights,
        kinds,
    };
    let seed = config.seed;

    // Parallel tree training. Each tree owns its rng stream and index list;
    // the feature rows are shared read-only.
    let trees: Vec<DecisionTree> = (0..config.n_trees)
        .into_par_iter()
        .map(|tree_index| {
            if cancel.is_cancelled() {
                return Err(RfError::TrainingAborted {
                    reason: format!("cancelled before tree {tree_index}"),
                });
            }
            let mut rng = tree_rng(seed, tree_index);
            let bootstrap_indices: Vec<usize> = bootstrap_sample(n_samples, &mut rng)
                .into_iter()
                .map(|pos| rows[pos])
                .collect();
            let tree =
                tree_config.fit_view(&view, &bootstrap_indices, max_features_resolved, &mut rng);
            debug!(tree_index, n_nodes = tree.n_nodes(), "tree trained");
            Ok(tree)
        })
        .collect::<Result<_, _>>()?;

    let forest = RandomForest { trees, n_features };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_samples,
        n_positive: counts[1],
        class_weights,
        max_features_resolved,
    };

    info!(n_trees_trained = forest.trees.len(), "random forest training complete");

    Ok(RandomForestResult::new(forest, metadata))
}
