use rand::Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{FeatureKind, N_CLASSES, Node, NodeIndex},
    split::{TrainingView, find_best_split, gini},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_leaf: 1,
            max_features: None,
        }
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until all leaves are pure or stopping conditions
    /// are met. `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    ///
    /// A node with fewer than twice this many samples becomes a leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features drawn at each node.
    ///
    /// `None` means consider all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
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

    /// Return the number of features drawn per node, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Train a decision tree on a row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]`, `labels[sample_idx]` in `{0, 1}`,
    /// `sample_weights[sample_idx] >= 0`, and `kinds[feature_idx]` telling
    /// whether a column is continuous or a one-hot indicator. `rng` drives
    /// the per-node feature draws.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                              |
    /// |------------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]          | `features` is empty                               |
    /// | [`RfError::ZeroFeatures`]          | rows have zero feature columns                    |
    /// | [`RfError::FeatureCountMismatch`]  | rows have inconsistent lengths                    |
    /// | [`RfError::LengthMismatch`]        | labels, weights, or kinds have the wrong length   |
    /// | [`RfError::NonFiniteValue`]        | any value is NaN or infinite                      |
    /// | [`RfError::InvalidLabel`]          | a label is not 0 or 1                             |
    /// | [`RfError::InvalidSampleWeight`]   | a weight is negative or non-finite                |
    /// | [`RfError::InvalidMaxFeatures`]    | `max_features` resolves outside [1, n_features]   |
    /// | [`RfError::InvalidMaxDepth`]       | `max_depth` is `Some(0)`                          |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1                            |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
        kinds: &[FeatureKind],
        rng: &mut impl Rng,
    ) -> Result<DecisionTree, RfError> {
        let n_features = validate_training_data(features, labels, kinds)?;
        validate_sample_weights(sample_weights, features.len())?;
        let max_features = self.validate(n_features)?;

        let view = TrainingView {
            features,
            labels,
            weights: sample_weights,
            kinds,
        };
        let sample_indices: Vec<usize> = (0..features.len()).collect();
        Ok(self.fit_view(&view, &sample_indices, max_features, rng))
    }

    /// Check the configuration against the data width and resolve `max_features`.
    pub(crate) fn validate(&self, n_features: usize) -> Result<usize, RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }

        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(max_features)
    }

    /// Grow a tree over `sample_indices` of pre-validated data.
    pub(crate) fn fit_view(
        &self,
        view: &TrainingView<'_>,
        sample_indices: &[usize],
        max_features: usize,
        rng: &mut impl Rng,
    ) -> DecisionTree {
        let mut arena: Vec<Node> = Vec::new();
        let root = build_tree(view, sample_indices, self, max_features, 0, rng, &mut arena);

        debug!(
            root_index = root.index(),
            n_nodes = arena.len(),
            n_samples = sample_indices.len(),
            "decision tree built"
        );

        DecisionTree {
            nodes: arena,
            n_features: view.kinds.len(),
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate row-major training data and return the feature count.
pub(crate) fn validate_training_data(
    features: &[Vec<f64>],
    labels: &[usize],
    kinds: &[FeatureKind],
) -> Result<usize, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }

    let n_samples = features.len();
    let n_features = features[0].len();

    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }

    if labels.len() != n_samples {
        return Err(RfError::LengthMismatch {
            what: "labels",
            expected: n_samples,
            got: labels.len(),
        });
    }

    if kinds.len() != n_features {
        return Err(RfError::LengthMismatch {
            what: "feature kinds",
            expected: n_features,
            got: kinds.len(),
        });
    }

    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(RfError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }

    if let Some((sample_index, &label)) = labels.iter().enumerate().find(|&(_, &l)| l >= N_CLASSES) {
        return Err(RfError::InvalidLabel {
            sample_index,
            label,
        });
    }

    Ok(n_features)
}

fn validate_sample_weights(weights: &[f64], n_samples: usize) -> Result<(), RfError> {
    if weights.len() != n_samples {
        return Err(RfError::LengthMismatch {
            what: "sample weights",
            expected: n_samples,
            got: weights.len(),
        });
    }
    match weights
        .iter()
        .enumerate()
        .find(|&(_, &w)| !w.is_finite() || w < 0.0)
    {
        Some((sample_index, &weight)) => Err(RfError::InvalidSampleWeight {
            sample_index,
            weight,
        }),
        None => Ok(()),
    }
}

/// Recursively build the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn build_tree(
    view: &TrainingView<'_>,
    sample_indices: &[usize],
    config: &DecisionTreeConfig,
    max_features: usize,
    depth: usize,
    rng: &mut impl Rng,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let n_samples = sample_indices.len();
    let class_weights = view.class_weights(sample_indices);
    let impurity = gini(&class_weights);

    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let total: f64 = class_weights.iter().sum();
        let distribution = if total > 0.0 {
            class_weights.map(|w| w / total)
        } else {
            [1.0 / N_CLASSES as f64; N_CLASSES]
        };
        let idx = arena.len();
        arena.push(Node::Leaf {
            distribution,
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    };

    // Stopping conditions -> leaf.
    let depth_exceeded = config.max_depth.is_some_and(|max_d| depth >= max_d);
    let too_few = n_samples < 2 * config.min_samples_leaf;
    let pure = impurity.value() == 0.0;

    if too_few || pure || depth_exceeded {
        return make_leaf(arena);
    }

    let split = match find_best_split(
        view,
        sample_indices,
        max_features,
        config.min_samples_leaf,
        rng,
    ) {
        Some(s) => s,
        None => return make_leaf(arena),
    };

    // Arena pattern: reserve index, recurse, then overwrite with the split.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        distribution: [0.0; N_CLASSES],
        impurity,
        n_samples,
    });

    let left_idx = build_tree(
        view,
        &split.left_indices,
        config,
        max_features,
        depth + 1,
        rng,
        arena,
    );
    let right_idx = build_tree(
        view,
        &split.right_indices,
        config,
        max_features,
        depth + 1,
        rng,
        arena,
    );

    arena[node_idx] = Node::Split {
        feature: split.feature,
        test: split.test,
        left: left_idx,
        right: right_idx,
        impurity,
        n_samples,
    };

    NodeIndex::new(node_idx)
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references for
/// cache-friendly traversal and trivial serialization. The root is node 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Assemble a tree from a node arena, checking its structure.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::MalformedTree`] when [`validate`](Self::validate) fails.
    pub fn from_nodes(nodes: Vec<Node>, n_features: usize) -> Result<Self, RfError> {
        let tree = Self { nodes, n_features };
        tree.validate()?;
        Ok(tree)
    }

    /// Check that the arena describes a well-formed tree.
    ///
    /// Every split must reference a feature below `n_features` and children
    /// that lie after it inside the arena (so traversal always terminates);
    /// every leaf distribution must be a finite probability vector.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::MalformedTree`] describing the first defect found.
    pub fn validate(&self) -> Result<(), RfError> {
        if self.nodes.is_empty() {
            return Err(RfError::MalformedTree {
                node_index: 0,
                reason: "tree has no nodes".to_string(),
            });
        }
        let n_nodes = self.nodes.len();
        for (node_index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    test,
                    left,
                    right,
                    ..
                } => {
                    if feature.index() >= self.n_features {
                        return Err(RfError::MalformedTree {
                            node_index,
                            reason: format!(
                                "feature {feature} out of range for {} features",
                                self.n_features
                            ),
                        });
                    }
                    for child in [left, right] {
                        if child.index() <= node_index || child.index() >= n_nodes {
                            return Err(RfError::MalformedTree {
                                node_index,
                                reason: format!("child {child} out of range"),
                            });
                        }
                    }
                    if let crate::node::SplitTest::Threshold(t) = test {
                        if !t.is_finite() {
                            return Err(RfError::MalformedTree {
                                node_index,
                                reason: "non-finite threshold".to_string(),
                            });
                        }
                    }
                }
                Node::Leaf { distribution, .. } => {
                    if distribution
                        .iter()
                        .any(|p| !p.is_finite() || !(0.0..=1.0).contains(p))
                    {
                        return Err(RfError::MalformedTree {
                            node_index,
                            reason: format!("invalid leaf distribution {distribution:?}"),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Return the class probability distribution `[negative, positive]` for a sample.
    ///
    /// Traverses from the root applying each split's test until a leaf.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<[f64; N_CLASSES], RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        match &self.nodes[self.traverse(sample)] {
            Node::Leaf { distribution, .. } => Ok(*distribution),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the node arena (root first).
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of features this tree expects.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        // BFS: (node_index, current_depth)
        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Traverse the tree from the root and return the arena index of the leaf.
    fn traverse(&self, sample: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    test,
                    left,
                    right,
                    ..
                } => {
                    idx = if test.goes_left(sample[feature.index()]) {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
