//! Threshold-free ranking metrics.

/// Area under the ROC curve via the Mann-Whitney U statistic.
///
/// `labels[i]` is 0 or 1 and `scores[i]` the predicted positive-class
/// probability. Tied scores count half. Returns `None` when the slices
/// differ in length or either class is absent.
#[must_use]
pub fn roc_auc(labels: &[usize], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() {
        return None;
    }

    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    // Sort by score ascending, then walk groups of tied scores.
    let mut pairs: Vec<(f64, usize)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut negatives_below = 0usize;
    let mut u = 0.0;
    let mut start = 0;
    while start < pairs.len() {
        let mut end = start;
        while end < pairs.len() && pairs[end].0 == pairs[start].0 {
            end += 1;
        }
        let group = &pairs[start..end];
        let pos = group.iter().filter(|p| p.1 == 1).count();
        let neg = group.len() - pos;
        u += pos as f64 * (negatives_below as f64 + 0.5 * neg as f64);
        negatives_below += neg;
        start = end;
    }

    Some(u / (n_pos as f64 * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking() {
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_ranking() {
        let auc = roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!(auc.abs() < 1e-12);
    }

    #[test]
    fn all_tied_is_half() {
        let auc = roc_auc(&[0, 1, 0, 1], &[0.5; 4]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn partial_ties() {
        // One positive above every negative, one positive tied with one negative.
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.5, 0.5, 0.9]).unwrap();
        assert!((auc - 0.875).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_undefined() {
        assert!(roc_auc(&[1, 1], &[0.2, 0.3]).is_none());
        assert!(roc_auc(&[0, 1], &[0.2]).is_none());
    }
}
