//! Versioned, validated model artifact with atomic persistence.

use std::io::Write;
use std::path::Path;

use bincode::Options;
use readmit_features::{Dimension, Record, Schema, Vectorizer, transform};
use readmit_rf::{
    CLASS_LABELS, DecisionTree, N_CLASSES, Node, RandomForest, RandomForestConfig, SplitTest,
};
use tracing::{debug, info, instrument};

use crate::error::ModelError;

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

/// Leading bytes identifying a readmit artifact.
const MAGIC: [u8; 8] = *b"RDMTMODL";

/// Facts about the training run frozen alongside the model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArtifactMetadata {
    /// Binary format version the artifact was written with.
    pub format_version: u32,
    /// Number of training rows.
    pub n_samples: usize,
    /// Number of training rows labelled positive.
    pub n_positive: usize,
    /// Hyperparameters the forest was trained with.
    pub config: RandomForestConfig,
    /// Per-class sample weights used, `[negative, positive]`.
    pub class_weights: [f64; N_CLASSES],
    /// Features drawn per node.
    pub max_features_resolved: usize,
}

/// Fixed-size prefix decoded before the body so version changes fail cleanly.
#[derive(serde::Deserialize)]
struct ArtifactHeader {
    magic: [u8; 8],
    format_version: u32,
}

#[derive(serde::Serialize)]
struct ArtifactEnvelopeRef<'a> {
    magic: [u8; 8],
    format_version: u32,
    schema: &'a Schema,
    class_labels: &'a [usize],
    n_features: usize,
    trees: &'a [DecisionTree],
    metadata: &'a ArtifactMetadata,
}

#[derive(serde::Deserialize)]
struct ArtifactEnvelope {
    _header: ArtifactHeader,
    schema: Schema,
    class_labels: Vec<usize>,
    n_features: usize,
    trees: Vec<DecisionTree>,
    metadata: ArtifactMetadata,
}

/// An immutable bundle of schema, forest, and training metadata.
///
/// Every constructor validates that the forest only references dimensions
/// the schema defines, so a loaded artifact can score any record.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    vectorizer: Vectorizer,
    schema: Schema,
    forest: RandomForest,
    metadata: ArtifactMetadata,
}

impl ModelArtifact {
    /// Bundle a schema, forest, and metadata after checking they agree.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SchemaMismatch`] when the schema is not in
    /// canonical order, the metadata format version is unsupported, the
    /// forest width differs from the schema length, or a split node
    /// references a dimension it cannot test.
    pub fn new(
        schema: Schema,
        forest: RandomForest,
        metadata: ArtifactMetadata,
    ) -> Result<Self, ModelError> {
        validate(&schema, &forest, &metadata)?;
        Ok(Self {
            vectorizer: Vectorizer::from_schema(schema.clone()),
            schema,
            forest,
            metadata,
        })
    }

    /// Return the feature schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Return the training metadata.
    #[must_use]
    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    /// Return the vectorizer rebuilt from the schema.
    #[must_use]
    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Return the positive-class probability for a raw record.
    ///
    /// # Errors
    ///
    /// Propagates encoding and prediction errors; neither occurs for a
    /// validated artifact.
    pub fn predict_proba(&self, record: &Record) -> Result<f64, ModelError> {
        let vector = self.vectorizer.transform(&transform(record))?;
        Ok(self.forest.predict_proba(&vector)?)
    }

    /// Encode the artifact as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Serialize`] when bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let envelope = ArtifactEnvelopeRef {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            schema: &self.schema,
            class_labels: &CLASS_LABELS,
            n_features: self.forest.n_features(),
            trees: self.forest.trees(),
            metadata: &self.metadata,
        };
        bincode::serialize(&envelope).map_err(|source| ModelError::Serialize { source })
    }

    /// Decode and validate an artifact from bytes.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Deserialize`] | bytes are truncated, carry trailing data, or are not a bincode envelope |
    /// | [`ModelError::SchemaMismatch`] | wrong magic, unsupported version, or inconsistent contents |
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let header: ArtifactHeader =
            bincode::deserialize(bytes).map_err(|source| ModelError::Deserialize { source })?;
        if header.magic != MAGIC {
            return Err(ModelError::SchemaMismatch {
                reason: "not a readmit model artifact".to_string(),
            });
        }
        if header.format_version != FORMAT_VERSION {
            return Err(ModelError::SchemaMismatch {
                reason: format!(
                    "unsupported format version {}, expected {FORMAT_VERSION}",
                    header.format_version
                ),
            });
        }

        // Same layout as `bincode::serialize`, but the envelope must span every byte.
        let envelope: ArtifactEnvelope = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .reject_trailing_bytes()
            .deserialize(bytes)
            .map_err(|source| ModelError::Deserialize { source })?;

        if envelope.class_labels != CLASS_LABELS {
            return Err(ModelError::SchemaMismatch {
                reason: format!(
                    "class labels {:?}, expected {CLASS_LABELS:?}",
                    envelope.class_labels
                ),
            });
        }

        let forest = RandomForest::from_trees(envelope.trees, envelope.n_features).map_err(
            |e| ModelError::SchemaMismatch {
                reason: e.to_string(),
            },
        )?;

        Self::new(envelope.schema, forest, envelope.metadata)
    }

    /// Write the artifact to `path` atomically.
    ///
    /// Bytes go to a temporary file in the same directory, which then
    /// replaces `path` by rename. Readers never see a partial artifact.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::Serialize`] | bincode encoding failed |
    /// | [`ModelError::Write`] | the temporary file could not be written or renamed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        let write_err = |source| ModelError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.forest.n_trees(),
            n_dimensions = self.schema.len(),
            "model artifact saved"
        );
        Ok(())
    }

    /// Read and validate an artifact from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Read`] when the file cannot be read, otherwise
    /// whatever [`from_bytes`](Self::from_bytes) returns.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_bytes(&bytes)?;

        debug!(
            n_trees = artifact.forest.n_trees(),
            n_dimensions = artifact.schema.len(),
            "model artifact loaded"
        );
        Ok(artifact)
    }
}

fn validate(
    schema: &Schema,
    forest: &RandomForest,
    metadata: &ArtifactMetadata,
) -> Result<(), ModelError> {
    let mismatch = |reason: String| Err(ModelError::SchemaMismatch { reason });

    if metadata.format_version != FORMAT_VERSION {
        return mismatch(format!(
            "metadata format version {}, expected {FORMAT_VERSION}",
            metadata.format_version
        ));
    }
    if !schema.is_canonical() {
        return mismatch("schema dimensions are not in canonical order".to_string());
    }
    if forest.n_features() != schema.len() {
        return mismatch(format!(
            "forest expects {} dimensions, schema has {}",
            forest.n_features(),
            schema.len()
        ));
    }
    forest.validate().or_else(|e| mismatch(e.to_string()))?;

    for (tree_index, tree) in forest.trees().iter().enumerate() {
        for (node_index, node) in tree.nodes().iter().enumerate() {
            let Node::Split { feature, test, .. } = node else {
                continue;
            };
            let Some(dimension) = schema.get(feature.index()) else {
                return mismatch(format!(
                    "tree {tree_index} node {node_index} references dimension {feature}"
                ));
            };
            if *test == SplitTest::Indicator && !matches!(dimension, Dimension::Indicator { .. }) {
                return mismatch(format!(
                    "tree {tree_index} node {node_index} applies an indicator test to numeric \
                     dimension {dimension}"
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use readmit_features::{RawValue, Record};
    use readmit_rf::RandomForestConfig;
    use tempfile::TempDir;

    use super::*;
    use crate::pipeline::train_artifact;

    fn record(age: f64, race: &str) -> Record {
        [
            ("age", RawValue::Number(age)),
            ("race", RawValue::Text(race.to_string())),
            ("number_inpatient", RawValue::Number(if age > 60.0 { 2.0 } else { 0.0 })),
        ]
        .into_iter()
        .collect()
    }

    fn trained() -> ModelArtifact {
        let records = vec![
            record(25.0, "asian"),
            record(35.0, "caucasian"),
            record(45.0, "asian"),
            record(65.0, "caucasian"),
            record(75.0, "africanamerican"),
            record(85.0, "caucasian"),
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let config = RandomForestConfig::new(5).unwrap().with_seed(3);
        train_artifact(&records, &labels, &config, &Default::default()).unwrap()
    }

    #[test]
    fn save_load_round_trip_is_bit_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let artifact = trained();

        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), loaded.to_bytes().unwrap());
        assert_eq!(artifact.schema(), loaded.schema());
        assert_eq!(artifact.forest(), loaded.forest());
        assert_eq!(artifact.metadata(), loaded.metadata());
        for r in [record(30.0, "asian"), record(80.0, "other")] {
            assert_eq!(
                artifact.predict_proba(&r).unwrap(),
                loaded.predict_proba(&r).unwrap()
            );
        }
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"stale").unwrap();
        trained().save(&path).unwrap();
        assert!(ModelArtifact::load(&path).is_ok());
        // Only the artifact remains: the temporary file was renamed over it.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn forest_width_must_match_schema() {
        let artifact = trained();
        let narrow = Schema::from_dimensions(artifact.schema().dimensions()[1..].to_vec());
        let err = ModelArtifact::new(
            narrow,
            artifact.forest().clone(),
            artifact.metadata().clone(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { .. }));
    }

    fn tampered_bytes(artifact: &ModelArtifact, trees: &[DecisionTree], version: u32) -> Vec<u8> {
        bincode::serialize(&ArtifactEnvelopeRef {
            magic: MAGIC,
            format_version: version,
            schema: artifact.schema(),
            class_labels: &CLASS_LABELS,
            n_features: artifact.forest().n_features(),
            trees,
            metadata: artifact.metadata(),
        })
        .unwrap()
    }

    #[test]
    fn out_of_range_node_reference_is_schema_mismatch() {
        let artifact = trained();
        let n = artifact.schema().len();
        let bad_tree: DecisionTree = serde_json::from_value(serde_json::json!({
            "nodes": [
                {"Split": {
                    "feature": n + 3,
                    "test": {"Threshold": 0.5},
                    "left": 1,
                    "right": 2,
                    "impurity": 0.5,
                    "n_samples": 2
                }},
                {"Leaf": {"distribution": [1.0, 0.0], "impurity": 0.0, "n_samples": 1}},
                {"Leaf": {"distribution": [0.0, 1.0], "impurity": 0.0, "n_samples": 1}}
            ],
            "n_features": n
        }))
        .unwrap();

        let bytes = tampered_bytes(&artifact, &[bad_tree], FORMAT_VERSION);
        let err = ModelArtifact::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { .. }), "got {err:?}");
    }

    #[test]
    fn backward_child_reference_is_schema_mismatch() {
        let artifact = trained();
        let n = artifact.schema().len();
        let cyclic: DecisionTree = serde_json::from_value(serde_json::json!({
            "nodes": [
                {"Split": {
                    "feature": 0,
                    "test": {"Threshold": 0.5},
                    "left": 0,
                    "right": 1,
                    "impurity": 0.5,
                    "n_samples": 2
                }},
                {"Leaf": {"distribution": [0.0, 1.0], "impurity": 0.0, "n_samples": 1}}
            ],
            "n_features": n
        }))
        .unwrap();

        let bytes = tampered_bytes(&artifact, &[cyclic], FORMAT_VERSION);
        let err = ModelArtifact::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { .. }), "got {err:?}");
    }

    #[test]
    fn unsupported_version_is_schema_mismatch() {
        let artifact = trained();
        let bytes = tampered_bytes(&artifact, artifact.forest().trees(), FORMAT_VERSION + 1);
        let err = ModelArtifact::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { .. }));
    }

    #[test]
    fn foreign_bytes_rejected() {
        let err = ModelArtifact::from_bytes(b"definitely not an artifact file").unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { .. }));
        let err = ModelArtifact::from_bytes(b"abc").unwrap_err();
        assert!(matches!(err, ModelError::Deserialize { .. }));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = trained().to_bytes().unwrap();
        bytes.push(0);
        let err = ModelArtifact::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ModelError::Deserialize { .. }));
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = ModelArtifact::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, ModelError::Read { .. }));
    }
}
