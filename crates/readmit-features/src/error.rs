/// Errors from feature vectorization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureError {
    /// Returned when `transform` is called on a vectorizer that was never fitted.
    #[error("vectorizer must be fitted before transform")]
    FitRequired,
}
