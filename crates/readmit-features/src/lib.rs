//! Feature derivation and vectorization for readmission scoring.
//!
//! Turns a raw clinical [`Record`] into a [`FeatureMap`] with the derived
//! visit and medication features appended, then encodes feature maps into
//! fixed-length vectors under a learned [`Schema`].

mod columns;
mod error;
mod record;
mod schema;
mod transform;
mod vectorizer;

pub use columns::{
    CATEGORICAL_ATTRIBUTES, DERIVED_FEATURES, MEDICATIONS, MISSING_MARKER, NUMERIC_ATTRIBUTES,
};
pub use error::FeatureError;
pub use record::{FeatureMap, FeatureValue, RawValue, Record};
pub use schema::{Dimension, Schema};
pub use transform::transform;
pub use vectorizer::Vectorizer;
