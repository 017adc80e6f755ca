//! Scoring service with atomic artifact replacement.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use readmit_features::Record;
use tracing::{info, instrument, warn};

use crate::artifact::ModelArtifact;
use crate::error::ModelError;

/// Probability at or above which a record is flagged as likely readmitted.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Outcome of scoring one record.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Score {
    /// Positive-class probability in `[0, 1]`.
    pub probability: f64,
    /// `probability >= DECISION_THRESHOLD`.
    pub decision: bool,
}

/// Scores records against the current artifact.
///
/// Each call to [`score`](Self::score) takes a snapshot of the artifact
/// pointer, so a concurrent [`swap`](Self::swap) or [`reload`](Self::reload)
/// never mixes two models within one request.
#[derive(Debug)]
pub struct ScoringService {
    artifact: RwLock<Arc<ModelArtifact>>,
}

impl ScoringService {
    /// Serve `artifact`.
    #[must_use]
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            artifact: RwLock::new(Arc::new(artifact)),
        }
    }

    /// Load an artifact from `path` and serve it.
    ///
    /// # Errors
    ///
    /// Whatever [`ModelArtifact::load`] returns.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        Ok(Self::new(ModelArtifact::load(path)?))
    }

    /// Return the artifact currently in use.
    #[must_use]
    pub fn current(&self) -> Arc<ModelArtifact> {
        Arc::clone(&self.artifact.read())
    }

    /// Score a record: derive features, encode, and average the forest.
    ///
    /// # Errors
    ///
    /// Propagates encoding and prediction errors; neither occurs for a
    /// validated artifact.
    pub fn score(&self, record: &Record) -> Result<Score, ModelError> {
        let artifact = self.current();
        let probability = artifact.predict_proba(record)?;
        Ok(Score {
            probability,
            decision: probability >= DECISION_THRESHOLD,
        })
    }

    /// Replace the served artifact, returning the previous one.
    pub fn swap(&self, artifact: ModelArtifact) -> Arc<ModelArtifact> {
        std::mem::replace(&mut *self.artifact.write(), Arc::new(artifact))
    }

    /// Load an artifact from `path` and swap it in.
    ///
    /// Loading and validation finish before the swap, so on error the
    /// previous artifact keeps serving.
    ///
    /// # Errors
    ///
    /// Whatever [`ModelArtifact::load`] returns.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        match ModelArtifact::load(path) {
            Ok(artifact) => {
                let n_trees = artifact.forest().n_trees();
                self.swap(artifact);
                info!(n_trees, "model artifact reloaded");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "reload failed, keeping current artifact");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use readmit_features::RawValue;
    use readmit_rf::{CancellationToken, MaxFeatures, RandomForestConfig};
    use tempfile::TempDir;

    use super::*;
    use crate::pipeline::train_artifact;

    fn record(num_medications: f64) -> Record {
        [("num_medications", RawValue::Number(num_medications))]
            .into_iter()
            .collect()
    }

    fn artifact(seed: u64, flip: bool) -> ModelArtifact {
        let records: Vec<Record> = (0..20).map(|i| record(f64::from(i))).collect();
        let labels: Vec<usize> = (0..20).map(|i| usize::from((i >= 10) != flip)).collect();
        let config = RandomForestConfig::new(5)
            .unwrap()
            .with_seed(seed)
            .with_max_features(MaxFeatures::All);
        train_artifact(&records, &labels, &config, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn score_applies_threshold() {
        let service = ScoringService::new(artifact(1, false));
        let high = service.score(&record(18.0)).unwrap();
        let low = service.score(&record(1.0)).unwrap();
        assert!(high.probability > low.probability);
        assert_eq!(high.decision, high.probability >= DECISION_THRESHOLD);
        assert_eq!(low.decision, low.probability >= DECISION_THRESHOLD);
        assert!((0.0..=1.0).contains(&high.probability));
    }

    #[test]
    fn swap_replaces_model_but_not_held_snapshots() {
        let service = ScoringService::new(artifact(1, false));
        let before = service.current();
        let previous = service.swap(artifact(1, true));
        assert!(Arc::ptr_eq(&before, &previous));
        assert!(!Arc::ptr_eq(&before, &service.current()));
        // The old snapshot still scores with the old model.
        assert!(before.predict_proba(&record(18.0)).unwrap() > 0.5);
        assert!(service.score(&record(18.0)).unwrap().probability < 0.5);
    }

    #[test]
    fn concurrent_scoring_sees_whole_models_during_swaps() {
        let original = artifact(1, false);
        let flipped = artifact(1, true);
        let sample = record(18.0);
        let expected = [
            original.predict_proba(&sample).unwrap(),
            flipped.predict_proba(&sample).unwrap(),
        ];
        let service = ScoringService::new(original);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let p = service.score(&sample).unwrap().probability;
                        assert!(expected.contains(&p), "unexpected probability {p}");
                    }
                });
            }
            scope.spawn(|| {
                for i in 0..20 {
                    service.swap(artifact(1, i % 2 == 0));
                }
            });
        });
    }

    #[test]
    fn failed_reload_keeps_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.bin");
        std::fs::write(&bad, b"corrupt artifact bytes here").unwrap();

        let service = ScoringService::new(artifact(1, false));
        let before = service.current();
        assert!(service.reload(&bad).is_err());
        assert!(Arc::ptr_eq(&before, &service.current()));
    }

    #[test]
    fn reload_swaps_in_new_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let replacement = artifact(2, true);
        replacement.save(&path).unwrap();

        let service = ScoringService::new(artifact(1, false));
        service.reload(&path).unwrap();
        assert_eq!(
            service.current().to_bytes().unwrap(),
            replacement.to_bytes().unwrap()
        );
    }
}
