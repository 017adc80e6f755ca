//! Binary Random Forest classification: train, evaluate, predict.
//!
//! Provides a hand-rolled Random Forest with CART decision trees split on
//! sample-weighted Gini impurity, balanced class weighting, per-tree RNG
//! streams for thread-count-independent reproducibility, parallel training
//! via rayon, cooperative cancellation, and stratified cross-validation.

mod cancel;
mod config;
mod confusion;
mod error;
mod eval;
mod forest;
mod metrics;
mod node;
mod predict;
mod result;
mod split;
mod tree;
mod weights;

pub use cancel::CancellationToken;
pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use eval::{CrossValidation, CrossValidationResult};
pub use forest::RandomForest;
pub use metrics::roc_auc;
pub use node::{
    CLASS_LABELS, FeatureIndex, FeatureKind, Impurity, N_CLASSES, Node, NodeIndex, SplitTest,
};
pub use result::{RandomForestResult, TrainingMetadata};
pub use tree::{DecisionTree, DecisionTreeConfig};
pub use weights::ClassWeight;
