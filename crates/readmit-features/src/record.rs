use std::collections::BTreeMap;
use std::collections::btree_map;

/// A raw attribute value as delivered by the cleaning or validation layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A numeric attribute.
    Number(f64),
    /// A categorical attribute.
    Text(String),
    /// An absent or null attribute.
    Missing,
}

/// A clinical record: attribute name to raw value.
///
/// Records are immutable once built. Construct one by collecting
/// `(name, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, RawValue>,
}

impl Record {
    /// Return the raw value for `name`, if the attribute is present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.get(name)
    }

    /// Return the numeric value for `name`, or `None` when it is absent or not a number.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(RawValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    /// Return the text value for `name`, or `None` when it is absent or not text.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(RawValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Iterate attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Return the number of attributes, including missing ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` if the record has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A feature value after derivation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FeatureValue {
    /// A numeric feature, copied into one vector dimension.
    Numeric(f64),
    /// A categorical feature, one-hot encoded.
    Categorical(String),
}

/// Ordered mapping of feature name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    entries: BTreeMap<String, FeatureValue>,
}

impl FeatureMap {
    /// Create an empty feature map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a numeric feature, replacing any previous value.
    pub fn insert_numeric(&mut self, name: impl Into<String>, value: f64) {
        self.entries.insert(name.into(), FeatureValue::Numeric(value));
    }

    /// Insert a categorical feature, replacing any previous value.
    pub fn insert_categorical(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(name.into(), FeatureValue::Categorical(value.into()));
    }

    /// Return the value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.entries.get(name)
    }

    /// Iterate features in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FeatureValue> {
        self.entries.iter()
    }

    /// Return the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if the map holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FeatureValue)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (K, FeatureValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FeatureMap {
    type Item = (&'a String, &'a FeatureValue);
    type IntoIter = btree_map::Iter<'a, String, FeatureValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
