//! Training pipeline: records to a frozen artifact.

use readmit_features::{FeatureMap, Record, Schema, Vectorizer, transform};
use readmit_rf::{CancellationToken, FeatureKind, RandomForestConfig};
use tracing::{info, instrument};

use crate::artifact::{ArtifactMetadata, FORMAT_VERSION, ModelArtifact};
use crate::error::ModelError;

/// Records encoded under a freshly fitted schema.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    /// Vectorizer fitted on the records.
    pub vectorizer: Vectorizer,
    /// One vector per record, in input order.
    pub vectors: Vec<Vec<f64>>,
    /// Split kind of each schema dimension.
    pub kinds: Vec<FeatureKind>,
}

/// Split kind for each dimension: indicators split on presence, numerics on thresholds.
#[must_use]
pub fn feature_kinds(schema: &Schema) -> Vec<FeatureKind> {
    schema
        .dimensions()
        .iter()
        .map(|d| {
            if d.is_indicator() {
                FeatureKind::Indicator
            } else {
                FeatureKind::Continuous
            }
        })
        .collect()
}

/// Derive features for every record, fit a vectorizer, and encode them.
///
/// # Errors
///
/// Never fails in practice; encoding right after fitting cannot hit
/// [`FeatureError::FitRequired`](readmit_features::FeatureError::FitRequired).
#[instrument(skip_all, fields(n_records = records.len()))]
pub fn encode_records(records: &[Record]) -> Result<EncodedDataset, ModelError> {
    let maps: Vec<FeatureMap> = records.iter().map(transform).collect();
    let mut vectorizer = Vectorizer::new();
    let kinds = feature_kinds(vectorizer.fit(&maps));
    let vectors = vectorizer.transform_batch(&maps)?;
    Ok(EncodedDataset {
        vectorizer,
        vectors,
        kinds,
    })
}

/// Train a forest on `records` and freeze it with its schema.
///
/// Runs feature derivation and the vectorizer fit sequentially, then the
/// parallel forest fit. Nothing is persisted; a failed run leaves no artifact.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::Rf`] | invalid inputs or config, single-class labels, or cancellation |
/// | [`ModelError::SchemaMismatch`] | the trained forest disagrees with its schema |
#[instrument(skip_all, fields(n_records = records.len(), n_trees = config.n_trees()))]
pub fn train_artifact(
    records: &[Record],
    labels: &[usize],
    config: &RandomForestConfig,
    cancel: &CancellationToken,
) -> Result<ModelArtifact, ModelError> {
    let EncodedDataset {
        vectorizer,
        vectors,
        kinds,
    } = encode_records(records)?;

    let result = config.fit_with_cancel(&vectors, labels, &kinds, cancel)?;
    drop(vectors);
    let (forest, training) = result.into_parts();

    let schema = vectorizer
        .into_schema()
        .ok_or(readmit_features::FeatureError::FitRequired)?;

    let metadata = ArtifactMetadata {
        format_version: FORMAT_VERSION,
        n_samples: training.n_samples,
        n_positive: training.n_positive,
        config: config.clone(),
        class_weights: training.class_weights,
        max_features_resolved: training.max_features_resolved,
    };

    info!(
        n_dimensions = schema.len(),
        n_samples = metadata.n_samples,
        n_positive = metadata.n_positive,
        "model artifact built"
    );

    ModelArtifact::new(schema, forest, metadata)
}
