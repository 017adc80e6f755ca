//! Per-class sample weighting for imbalanced labels.

use crate::node::N_CLASSES;

/// How training rows are weighted by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ClassWeight {
    /// `w_c = n / (n_classes * count_c)`: each class carries equal total weight.
    #[default]
    Balanced,
    /// Every row weighs 1.
    None,
}

impl ClassWeight {
    /// Resolve per-class weights from class counts.
    ///
    /// Callers guarantee every count is non-zero.
    pub(crate) fn resolve(self, counts: [usize; N_CLASSES]) -> [f64; N_CLASSES] {
        match self {
            ClassWeight::Balanced => {
                let n: usize = counts.iter().sum();
                counts.map(|c| n as f64 / (N_CLASSES as f64 * c as f64))
            }
            ClassWeight::None => [1.0; N_CLASSES],
        }
    }
}

/// Count rows per class. Labels must already be validated as binary.
pub(crate) fn class_counts(labels: &[usize]) -> [usize; N_CLASSES] {
    let mut counts = [0usize; N_CLASSES];
    for &label in labels {
        counts[label] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_weights_sum_to_n() {
        let counts = [90, 10];
        let w = ClassWeight::Balanced.resolve(counts);
        assert!((w[0] - 100.0 / 180.0).abs() < 1e-12);
        assert!((w[1] - 5.0).abs() < 1e-12);
        let total = w[0] * 90.0 + w[1] * 10.0;
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn balanced_is_identity_on_even_classes() {
        assert_eq!(ClassWeight::Balanced.resolve([5, 5]), [1.0, 1.0]);
    }

    #[test]
    fn none_is_uniform() {
        assert_eq!(ClassWeight::None.resolve([90, 10]), [1.0, 1.0]);
    }

    #[test]
    fn counts_per_class() {
        assert_eq!(class_counts(&[0, 1, 1, 0, 0]), [3, 2]);
    }
}
