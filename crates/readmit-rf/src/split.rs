use rand::Rng;

use crate::node::{FeatureIndex, FeatureKind, Impurity, N_CLASSES, SplitTest};

/// Smallest weighted impurity decrease (per unit of node weight) that counts as progress.
const MIN_IMPURITY_DECREASE: f64 = 1e-12;

/// Borrowed view of the training data shared by every node of every tree.
///
/// `features` is row-major: `features[sample_idx][feature_idx]`. Sample
/// indices handed to the split search index into these rows and may repeat
/// (bootstrap draws).
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrainingView<'a> {
    pub(crate) features: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) weights: &'a [f64],
    pub(crate) kinds: &'a [FeatureKind],
}

impl TrainingView<'_> {
    /// Sum sample weights per class over `sample_indices`.
    pub(crate) fn class_weights(&self, sample_indices: &[usize]) -> [f64; N_CLASSES] {
        let mut totals = [0.0; N_CLASSES];
        for &si in sample_indices {
            totals[self.labels[si]] += self.weights[si];
        }
        totals
    }
}

/// Gini impurity `1 - Σ p_i²` over weighted class totals.
///
/// Returns zero for an empty (zero-weight) node.
#[must_use]
pub(crate) fn gini(class_weights: &[f64; N_CLASSES]) -> Impurity {
    let total: f64 = class_weights.iter().sum();
    if total <= 0.0 {
        return Impurity::new(0.0);
    }
    let sum_sq: f64 = class_weights
        .iter()
        .map(|&w| {
            let p = w / total;
            p * p
        })
        .sum();
    Impurity::new(1.0 - sum_sq)
}

/// Node weight times its Gini impurity; summing this over children gives the split score.
fn weighted_gini(class_weights: &[f64; N_CLASSES]) -> f64 {
    let total: f64 = class_weights.iter().sum();
    total * gini(class_weights).value()
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Routing test for the split.
    pub(crate) test: SplitTest,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    feature: usize,
    test: SplitTest,
}

/// Keep `candidate` only if it strictly beats the incumbent.
///
/// Features are scanned in ascending index order and thresholds in
/// ascending order, so ties resolve to the lowest feature, then the
/// lowest threshold.
fn consider(best: &mut Option<Candidate>, candidate: Candidate) {
    if best.is_none_or(|b| candidate.score < b.score) {
        *best = Some(candidate);
    }
}

/// Find the split minimizing weighted child impurity over a random feature subset.
///
/// Draws `max_features` distinct features with `rng` (partial Fisher-Yates),
/// then evaluates every candidate: presence versus absence for indicator
/// columns, midpoints between consecutive distinct values for continuous
/// columns. Each child must keep at least `min_samples_leaf` rows.
///
/// Returns `None` when no candidate lowers the node's weighted impurity.
pub(crate) fn find_best_split(
    view: &TrainingView<'_>,
    sample_indices: &[usize],
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = view.kinds.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent = view.class_weights(sample_indices);
    let parent_weight: f64 = parent.iter().sum();
    let parent_score = weighted_gini(&parent);

    // Partial Fisher-Yates: shuffle only the first `take` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }
    let mut selected = feature_order[..take].to_vec();
    selected.sort_unstable();

    let mut best: Option<Candidate> = None;

    for &feat_idx in &selected {
        match view.kinds[feat_idx] {
            FeatureKind::Indicator => {
                let mut left = [0.0; N_CLASSES];
                let mut n_left = 0usize;
                for &si in sample_indices {
                    if SplitTest::Indicator.goes_left(view.features[si][feat_idx]) {
                        left[view.labels[si]] += view.weights[si];
                        n_left += 1;
                    }
                }
                let n_right = n_samples - n_left;
                if n_left < min_samples_leaf || n_right < min_samples_leaf {
                    continue;
                }
                let mut right = parent;
                for (r, l) in right.iter_mut().zip(left) {
                    *r -= l;
                }
                consider(
                    &mut best,
                    Candidate {
                        score: weighted_gini(&left) + weighted_gini(&right),
                        feature: feat_idx,
                        test: SplitTest::Indicator,
                    },
                );
            }
            FeatureKind::Continuous => {
                let mut sorted: Vec<(f64, usize)> = sample_indices
                    .iter()
                    .map(|&si| (view.features[si][feat_idx], si))
                    .collect();
                sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

                // Incremental scan: left grows from empty, right shrinks from full.
                let mut left = [0.0; N_CLASSES];
                let mut right = parent;

                for i in 0..(n_samples - 1) {
                    let (val_i, si) = sorted[i];
                    let class_i = view.labels[si];
                    left[class_i] += view.weights[si];
                    right[class_i] -= view.weights[si];

                    let val_next = sorted[i + 1].0;
                    if val_i == val_next {
                        continue;
                    }

                    let n_left = i + 1;
                    let n_right = n_samples - n_left;
                    if n_left < min_samples_leaf {
                        continue;
                    }
                    if n_right < min_samples_leaf {
                        break;
                    }

                    // Guard against the midpoint rounding up to the next value.
                    let mut threshold = val_i + (val_next - val_i) / 2.0;
                    if threshold >= val_next {
                        threshold = val_i;
                    }

                    consider(
                        &mut best,
                        Candidate {
                            score: weighted_gini(&left) + weighted_gini(&right),
                            feature: feat_idx,
                            test: SplitTest::Threshold(threshold),
                        },
                    );
                }
            }
        }
    }

    let best = best?;
    if parent_score - best.score <= MIN_IMPURITY_DECREASE * parent_weight {
        return None;
    }

    let mut left_indices = Vec::with_capacity(n_samples / 2);
    let mut right_indices = Vec::with_capacity(n_samples / 2);
    for &si in sample_indices {
        if best.test.goes_left(view.features[si][best.feature]) {
            left_indices.push(si);
        } else {
            right_indices.push(si);
        }
    }

    Some(SplitResult {
        feature: FeatureIndex::new(best.feature),
        test: best.test,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn gini_pure_is_zero() {
        assert_eq!(gini(&[3.0, 0.0]).value(), 0.0);
        assert_eq!(gini(&[0.0, 0.0]).value(), 0.0);
    }

    #[test]
    fn gini_balanced_is_half() {
        assert!((gini(&[2.0, 2.0]).value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn gini_uses_weights() {
        // 9 negatives at weight 1 vs 1 positive at weight 9 balances out.
        assert!((gini(&[9.0, 9.0]).value() - 0.5).abs() < 1e-12);
        assert!(gini(&[9.0, 1.0]).value() < 0.5);
    }

    fn view<'a>(
        features: &'a [Vec<f64>],
        labels: &'a [usize],
        weights: &'a [f64],
        kinds: &'a [FeatureKind],
    ) -> TrainingView<'a> {
        TrainingView {
            features,
            labels,
            weights,
            kinds,
        }
    }

    #[test]
    fn continuous_split_at_midpoint() {
        let features = vec![vec![1.0], vec![1.0], vec![5.0], vec![5.0]];
        let labels = vec![0, 0, 1, 1];
        let weights = vec![1.0; 4];
        let kinds = vec![FeatureKind::Continuous];
        let v = view(&features, &labels, &weights, &kinds);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = find_best_split(&v, &[0, 1, 2, 3], 1, 1, &mut rng).unwrap();
        assert_eq!(split.feature.index(), 0);
        assert_eq!(split.test, SplitTest::Threshold(3.0));
        assert_eq!(split.left_indices, vec![0, 1]);
        assert_eq!(split.right_indices, vec![2, 3]);
    }

    #[test]
    fn indicator_split_is_presence() {
        let features = vec![vec![0.0], vec![0.0], vec![1.0], vec![1.0]];
        let labels = vec![0, 0, 1, 1];
        let weights = vec![1.0; 4];
        let kinds = vec![FeatureKind::Indicator];
        let v = view(&features, &labels, &weights, &kinds);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = find_best_split(&v, &[0, 1, 2, 3], 1, 1, &mut rng).unwrap();
        assert_eq!(split.test, SplitTest::Indicator);
        assert_eq!(split.left_indices, vec![0, 1]);
    }

    #[test]
    fn ties_prefer_lowest_feature() {
        // Both columns separate the classes perfectly.
        let features = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let labels = vec![0, 1];
        let weights = vec![1.0; 2];
        let kinds = vec![FeatureKind::Continuous; 2];
        let v = view(&features, &labels, &weights, &kinds);
        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let split = find_best_split(&v, &[0, 1], 2, 1, &mut rng).unwrap();
            assert_eq!(split.feature.index(), 0);
        }
    }

    #[test]
    fn no_split_when_nothing_improves() {
        let features = vec![vec![0.0], vec![1.0], vec![0.0], vec![1.0]];
        let labels = vec![0, 0, 1, 1];
        let weights = vec![1.0; 4];
        let kinds = vec![FeatureKind::Continuous];
        let v = view(&features, &labels, &weights, &kinds);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(find_best_split(&v, &[0, 1, 2, 3], 1, 1, &mut rng).is_none());
    }

    #[test]
    fn min_samples_leaf_blocks_small_children() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let labels = vec![1, 0, 0, 0];
        let weights = vec![1.0; 4];
        let kinds = vec![FeatureKind::Continuous];
        let v = view(&features, &labels, &weights, &kinds);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = find_best_split(&v, &[0, 1, 2, 3], 1, 2, &mut rng).unwrap();
        assert_eq!(split.left_indices.len(), 2);
        assert_eq!(split.right_indices.len(), 2);
    }

    #[test]
    fn repeated_bootstrap_indices_are_counted() {
        let features = vec![vec![1.0], vec![5.0]];
        let labels = vec![0, 1];
        let weights = vec![1.0; 2];
        let kinds = vec![FeatureKind::Continuous];
        let v = view(&features, &labels, &weights, &kinds);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = find_best_split(&v, &[0, 0, 1], 1, 1, &mut rng).unwrap();
        assert_eq!(split.left_indices, vec![0, 0]);
        assert_eq!(split.right_indices, vec![1]);
    }
}
