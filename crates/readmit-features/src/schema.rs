use std::fmt;

/// One dimension of an encoded feature vector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Dimension {
    /// Copies the value of a numeric feature.
    Numeric {
        /// Feature name.
        name: String,
    },
    /// 1 when a categorical feature equals `category`, 0 otherwise.
    Indicator {
        /// Feature name.
        name: String,
        /// Category value this dimension flags.
        category: String,
    },
}

impl Dimension {
    /// Return the feature name this dimension encodes.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Dimension::Numeric { name } | Dimension::Indicator { name, .. } => name,
        }
    }

    /// Return `true` for one-hot categorical dimensions.
    #[must_use]
    pub fn is_indicator(&self) -> bool {
        matches!(self, Dimension::Indicator { .. })
    }

    /// Sort key: feature name, then category (numeric dimensions first).
    pub(crate) fn sort_key(&self) -> (&str, Option<&str>) {
        match self {
            Dimension::Numeric { name } => (name, None),
            Dimension::Indicator { name, category } => (name, Some(category)),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Numeric { name } => f.write_str(name),
            Dimension::Indicator { name, category } => write!(f, "{name}={category}"),
        }
    }
}

/// The ordered list of vector dimensions learned by a vectorizer fit.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    dimensions: Vec<Dimension>,
}

impl Schema {
    /// Build a schema from dimensions in their final order.
    ///
    /// Used when restoring a persisted schema; [`Vectorizer::fit`](crate::Vectorizer::fit)
    /// is the normal way to obtain one.
    #[must_use]
    pub fn from_dimensions(dimensions: Vec<Dimension>) -> Self {
        Self { dimensions }
    }

    /// Return the dimensions in vector order.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Return the dimension at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Dimension> {
        self.dimensions.get(index)
    }

    /// Return the number of dimensions (the encoded vector length).
    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Return `true` if the schema has no dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Return `true` if dimensions are strictly increasing by name, then category.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.dimensions
            .windows(2)
            .all(|w| w[0].sort_key() < w[1].sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(name: &str) -> Dimension {
        Dimension::Numeric { name: name.into() }
    }

    fn indicator(name: &str, category: &str) -> Dimension {
        Dimension::Indicator {
            name: name.into(),
            category: category.into(),
        }
    }

    #[test]
    fn display_formats() {
        assert_eq!(numeric("age").to_string(), "age");
        assert_eq!(indicator("race", "asian").to_string(), "race=asian");
    }

    #[test]
    fn canonical_order_check() {
        let ordered = Schema::from_dimensions(vec![
            numeric("age"),
            indicator("race", "asian"),
            indicator("race", "caucasian"),
        ]);
        assert!(ordered.is_canonical());

        let shuffled = Schema::from_dimensions(vec![
            indicator("race", "caucasian"),
            indicator("race", "asian"),
        ]);
        assert!(!shuffled.is_canonical());
    }

    #[test]
    fn accessors() {
        let schema = Schema::from_dimensions(vec![numeric("a"), indicator("b", "x")]);
        assert_eq!(schema.len(), 2);
        assert!(!schema.is_empty());
        assert_eq!(schema.get(1).map(Dimension::name), Some("b"));
        assert!(schema.get(1).is_some_and(Dimension::is_indicator));
        assert!(schema.get(2).is_none());
    }
}
