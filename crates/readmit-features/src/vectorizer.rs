//! One-hot vectorization of feature maps under a learned schema.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, instrument};

use crate::error::FeatureError;
use crate::record::{FeatureMap, FeatureValue};
use crate::schema::{Dimension, Schema};

/// Lookup tables from feature name (and category) to vector position.
#[derive(Debug, Clone)]
struct Layout {
    schema: Schema,
    numeric: HashMap<String, usize>,
    indicators: HashMap<String, HashMap<String, usize>>,
}

impl Layout {
    fn new(schema: Schema) -> Self {
        let mut numeric = HashMap::new();
        let mut indicators: HashMap<String, HashMap<String, usize>> = HashMap::new();
        for (index, dim) in schema.dimensions().iter().enumerate() {
            match dim {
                Dimension::Numeric { name } => {
                    numeric.insert(name.clone(), index);
                }
                Dimension::Indicator { name, category } => {
                    indicators
                        .entry(name.clone())
                        .or_default()
                        .insert(category.clone(), index);
                }
            }
        }
        Self {
            schema,
            numeric,
            indicators,
        }
    }
}

/// Learns a [`Schema`] from feature maps and encodes maps as vectors.
///
/// An unfitted vectorizer rejects [`transform`](Vectorizer::transform)
/// with [`FeatureError::FitRequired`].
#[derive(Debug, Clone, Default)]
pub struct Vectorizer {
    layout: Option<Layout>,
}

impl Vectorizer {
    /// Create an unfitted vectorizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fitted vectorizer from a previously learned schema.
    #[must_use]
    pub fn from_schema(schema: Schema) -> Self {
        Self {
            layout: Some(Layout::new(schema)),
        }
    }

    /// Learn the schema from `maps`, replacing any earlier fit.
    ///
    /// Allocates one dimension per numeric feature name and one indicator
    /// dimension per distinct `(name, category)` pair. Dimensions are sorted
    /// by feature name, then category, so two fits over the same data yield
    /// the same schema regardless of row order.
    #[instrument(skip_all, fields(n_maps = maps.len()))]
    pub fn fit(&mut self, maps: &[FeatureMap]) -> &Schema {
        let mut seen: BTreeSet<(String, Option<String>)> = BTreeSet::new();
        for map in maps {
            for (name, value) in map {
                let category = match value {
                    FeatureValue::Numeric(_) => None,
                    FeatureValue::Categorical(c) => Some(c.clone()),
                };
                seen.insert((name.clone(), category));
            }
        }

        let dimensions: Vec<Dimension> = seen
            .into_iter()
            .map(|(name, category)| match category {
                None => Dimension::Numeric { name },
                Some(category) => Dimension::Indicator { name, category },
            })
            .collect();

        let n_indicators = dimensions.iter().filter(|d| d.is_indicator()).count();
        debug!(
            n_dimensions = dimensions.len(),
            n_numeric = dimensions.len() - n_indicators,
            n_indicators,
            "vectorizer fitted"
        );

        let layout = self.layout.insert(Layout::new(Schema::from_dimensions(dimensions)));
        &layout.schema
    }

    /// Return the fitted schema, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&Schema> {
        self.layout.as_ref().map(|l| &l.schema)
    }

    /// Consume the vectorizer and return its schema, if fitted.
    #[must_use]
    pub fn into_schema(self) -> Option<Schema> {
        self.layout.map(|l| l.schema)
    }

    /// Encode `map` as a vector of length `schema.len()`.
    ///
    /// Numeric dimensions copy the feature value (0 when absent). Indicator
    /// dimensions are 1 when the map's category matches. Categories never
    /// seen during fit leave every dimension of that feature at 0.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::FitRequired`] if the vectorizer was never fitted.
    pub fn transform(&self, map: &FeatureMap) -> Result<Vec<f64>, FeatureError> {
        let layout = self.layout.as_ref().ok_or(FeatureError::FitRequired)?;
        let mut vector = vec![0.0; layout.schema.len()];
        for (name, value) in map {
            match value {
                FeatureValue::Numeric(v) => {
                    if let Some(&index) = layout.numeric.get(name) {
                        vector[index] = *v;
                    }
                }
                FeatureValue::Categorical(category) => {
                    if let Some(&index) = layout
                        .indicators
                        .get(name)
                        .and_then(|cats| cats.get(category))
                    {
                        vector[index] = 1.0;
                    }
                }
            }
        }
        Ok(vector)
    }

    /// Encode every map in `maps`.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::FitRequired`] if the vectorizer was never fitted.
    pub fn transform_batch(&self, maps: &[FeatureMap]) -> Result<Vec<Vec<f64>>, FeatureError> {
        maps.iter().map(|m| self.transform(m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, FeatureValue)]) -> FeatureMap {
        entries.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    fn cat(s: &str) -> FeatureValue {
        FeatureValue::Categorical(s.into())
    }

    fn training_maps() -> Vec<FeatureMap> {
        vec![
            map(&[("race", cat("caucasian")), ("age", FeatureValue::Numeric(65.0))]),
            map(&[("race", cat("asian")), ("age", FeatureValue::Numeric(45.0))]),
            map(&[("gender", cat("female"))]),
        ]
    }

    #[test]
    fn transform_before_fit_fails() {
        let vectorizer = Vectorizer::new();
        let err = vectorizer.transform(&FeatureMap::new()).unwrap_err();
        assert_eq!(err, FeatureError::FitRequired);
    }

    #[test]
    fn schema_is_sorted_by_name_then_category() {
        let mut vectorizer = Vectorizer::new();
        let schema = vectorizer.fit(&training_maps());
        let names: Vec<String> = schema.dimensions().iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["age", "gender=female", "race=asian", "race=caucasian"]
        );
        assert!(schema.is_canonical());
    }

    #[test]
    fn fit_is_independent_of_row_order() {
        let mut maps = training_maps();
        let first = Vectorizer::new().fit(&maps).clone();
        maps.reverse();
        let second = Vectorizer::new().fit(&maps).clone();
        assert_eq!(first, second);
    }

    #[test]
    fn transform_encodes_numeric_and_one_hot() {
        let mut vectorizer = Vectorizer::new();
        vectorizer.fit(&training_maps());
        let v = vectorizer
            .transform(&map(&[("race", cat("asian")), ("age", FeatureValue::Numeric(30.0))]))
            .unwrap();
        assert_eq!(v, vec![30.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn absent_features_encode_as_zero() {
        let mut vectorizer = Vectorizer::new();
        vectorizer.fit(&training_maps());
        let v = vectorizer.transform(&FeatureMap::new()).unwrap();
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn unseen_category_is_ignored() {
        let mut vectorizer = Vectorizer::new();
        vectorizer.fit(&training_maps());
        let v = vectorizer
            .transform(&map(&[("race", cat("martian")), ("gender", cat("female"))]))
            .unwrap();
        assert_eq!(v, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn unseen_feature_name_is_ignored() {
        let mut vectorizer = Vectorizer::new();
        vectorizer.fit(&training_maps());
        let v = vectorizer
            .transform(&map(&[("weight", FeatureValue::Numeric(80.0))]))
            .unwrap();
        assert_eq!(v.len(), 4);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn refit_replaces_schema() {
        let mut vectorizer = Vectorizer::new();
        vectorizer.fit(&training_maps());
        let schema = vectorizer.fit(&[map(&[("x", FeatureValue::Numeric(1.0))])]);
        assert_eq!(schema.len(), 1);
        assert_eq!(vectorizer.transform(&FeatureMap::new()).unwrap().len(), 1);
    }

    #[test]
    fn from_schema_matches_fitted_encoding() {
        let mut fitted = Vectorizer::new();
        fitted.fit(&training_maps());
        let restored = Vectorizer::from_schema(fitted.schema().cloned().unwrap());
        for m in training_maps() {
            assert_eq!(fitted.transform(&m).unwrap(), restored.transform(&m).unwrap());
        }
    }

    #[test]
    fn same_name_numeric_and_categorical_keeps_both() {
        let maps = vec![
            map(&[("code", FeatureValue::Numeric(250.0))]),
            map(&[("code", cat("v57"))]),
        ];
        let mut vectorizer = Vectorizer::new();
        let schema = vectorizer.fit(&maps);
        assert_eq!(schema.len(), 2);
        assert!(!schema.dimensions()[0].is_indicator());
        assert!(schema.dimensions()[1].is_indicator());
    }
}
