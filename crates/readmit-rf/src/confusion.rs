//! Binary confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::RfError;
use crate::node::N_CLASSES;

/// A confusion matrix for binary classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
///
/// The default matrix is all zeros, ready to [`merge`](Self::merge) into.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ConfusionMatrix {
    matrix: [[usize; N_CLASSES]; N_CLASSES],
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true labels and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero labels provided |
    /// | [`RfError::LengthMismatch`] | `predicted` and `true_labels` differ in length |
    /// | [`RfError::InvalidLabel`] | A label in either slice is not 0 or 1 |
    pub fn from_labels(true_labels: &[usize], predicted: &[usize]) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if predicted.len() != true_labels.len() {
            return Err(RfError::LengthMismatch {
                what: "predictions",
                expected: true_labels.len(),
                got: predicted.len(),
            });
        }
        let mut matrix = [[0usize; N_CLASSES]; N_CLASSES];
        for (sample_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if let Some(label) = [t, p].into_iter().find(|&l| l >= N_CLASSES) {
                return Err(RfError::InvalidLabel {
                    sample_index,
                    label,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix })
    }

    /// Build a confusion matrix from true labels and boolean decisions.
    ///
    /// # Errors
    ///
    /// Same as [`from_labels`](Self::from_labels).
    pub fn from_decisions(true_labels: &[usize], decisions: &[bool]) -> Result<Self, RfError> {
        let predicted: Vec<usize> = decisions.iter().map(|&d| usize::from(d)).collect();
        Self::from_labels(true_labels, &predicted)
    }

    /// Add another matrix's counts to this one.
    pub fn merge(&mut self, other: &ConfusionMatrix) {
        for (row, other_row) in self.matrix.iter_mut().zip(&other.matrix) {
            for (cell, other_cell) in row.iter_mut().zip(other_row) {
                *cell += other_cell;
            }
        }
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..N_CLASSES).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..N_CLASSES)
            .map(|c| {
                let other = 1 - c;
                let tp = self.matrix[c][c];
                let fp = self.matrix[other][c];
                let fn_ = self.matrix[c][other];
                let support = tp + fn_;
                let precision = if tp + fp == 0 {
                    0.0
                } else {
                    tp as f64 / (tp + fp) as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[[usize; N_CLASSES]; N_CLASSES] {
        &self.matrix
    }

    /// Return the total number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header row
        write!(f, "{:>8}", "")?;
        for j in 0..N_CLASSES {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;

        // Data rows
        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>7}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let labels = vec![0, 0, 1, 1];
        let cm = ConfusionMatrix::from_labels(&labels, &labels).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        for m in cm.class_metrics() {
            assert!((m.precision - 1.0).abs() < f64::EPSILON);
            assert!((m.recall - 1.0).abs() < f64::EPSILON);
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn known_confusion_matrix() {
        // True: [0,0,0,0, 1,1]
        // Pred: [0,0,0,1, 1,0]
        let cm = ConfusionMatrix::from_labels(&[0, 0, 0, 0, 1, 1], &[0, 0, 0, 1, 1, 0]).unwrap();
        assert_eq!(cm.as_rows(), &[[3, 1], [1, 1]]);

        let metrics = cm.class_metrics();
        // Positive class: TP=1, FP=1, FN=1.
        assert!((metrics[1].precision - 0.5).abs() < 1e-10);
        assert!((metrics[1].recall - 0.5).abs() < 1e-10);
        assert_eq!(metrics[1].support, 2);
        // Negative class: TP=3, FP=1, FN=1.
        assert!((metrics[0].precision - 0.75).abs() < 1e-10);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-10);
    }

    #[test]
    fn decisions_map_to_positive_class() {
        let cm = ConfusionMatrix::from_decisions(&[0, 1], &[true, true]).unwrap();
        assert_eq!(cm.as_rows(), &[[0, 1], [0, 1]]);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = ConfusionMatrix::from_labels(&[0, 1], &[0, 1]).unwrap();
        let b = ConfusionMatrix::from_labels(&[1], &[0]).unwrap();
        a.merge(&b);
        assert_eq!(a.as_rows(), &[[1, 0], [1, 1]]);
        assert_eq!(a.total(), 3);
    }

    #[test]
    fn empty_labels_error() {
        let err = ConfusionMatrix::from_labels(&[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn non_binary_label_error() {
        let err = ConfusionMatrix::from_labels(&[0, 2], &[0, 1]).unwrap_err();
        assert!(matches!(err, RfError::InvalidLabel { sample_index: 1, label: 2 }));
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1]).unwrap();
        let output = format!("{cm}");
        assert!(output.contains("pred_"));
        assert!(output.contains("true_"));
    }

    #[test]
    fn zero_support_class_metrics() {
        let cm = ConfusionMatrix::from_labels(&[0, 0], &[0, 0]).unwrap();
        let metrics = cm.class_metrics();
        assert_eq!(metrics[1].support, 0);
        assert!((metrics[1].recall - 0.0).abs() < f64::EPSILON);
    }
}
