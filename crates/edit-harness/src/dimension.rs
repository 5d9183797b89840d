//! Named axes of variation.

use crate::value::Value;
use crate::{TestError, TestResult};

/// A named, ordered, non-empty set of candidate values.
///
/// Exactly one value of every dimension is selected for each combination
/// produced by [`CombinatorialEngine`](crate::CombinatorialEngine). A value
/// may carry a filter expression restricting which combinations it can
/// appear in (see [`filter`](crate::filter)).
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    name: String,
    values: Vec<Value>,
    filters: Option<Vec<Option<String>>>,
}

impl Dimension {
    /// Create a dimension with the given values.
    pub fn new<I, V>(name: impl Into<String>, values: I) -> TestResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let name = name.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();

        if name.is_empty() {
            return Err(TestError::InvalidArgument(
                "No name defined for the dimension".into(),
            ));
        }
        if values.is_empty() {
            return Err(TestError::InvalidArgument(format!(
                "No values have been defined for dimension {}",
                name
            )));
        }

        Ok(Self {
            name,
            values,
            filters: None,
        })
    }

    /// Create a dimension whose values carry filter expressions.
    ///
    /// `filters` must have one entry per value; `None` or an empty string
    /// means the value is unconditional.
    pub fn with_filters<I, V>(
        name: impl Into<String>,
        values: I,
        filters: Vec<Option<String>>,
    ) -> TestResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut dimension = Self::new(name, values)?;
        if filters.len() != dimension.values.len() {
            return Err(TestError::InvalidArgument(format!(
                "Count of filters ({}) different from values ({}) in dimension {}",
                filters.len(),
                dimension.values.len(),
                dimension.name
            )));
        }
        dimension.filters = Some(filters);
        Ok(dimension)
    }

    /// Dimension name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All candidate values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at the given index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of candidate values (never zero).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Filter expression for the value at `index`, if any.
    pub fn filter(&self, index: usize) -> Option<&str> {
        self.filters
            .as_ref()
            .and_then(|f| f.get(index))
            .and_then(|f| f.as_deref())
            .filter(|f| !f.trim().is_empty())
    }

    /// Whether any value carries a filter.
    pub fn has_filters(&self) -> bool {
        (0..self.values.len()).any(|i| self.filter(i).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dimension() {
        let d = Dimension::new("TestValue", [true, false]).unwrap();
        assert_eq!(d.name(), "TestValue");
        assert_eq!(d.len(), 2);
        assert_eq!(d.value(0), Some(&Value::Bool(true)));
        assert_eq!(d.value(2), None);
        assert!(!d.has_filters());
    }

    #[test]
    fn test_heterogeneous_values() {
        let d = Dimension::new(
            "Mixed",
            vec![Value::from(1), Value::from("one"), Value::ident("One")],
        )
        .unwrap();
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_empty_values_rejected() {
        let err = Dimension::new("Text", Vec::<Value>::new()).unwrap_err();
        assert!(matches!(err, TestError::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Dimension::new("", ["a"]).unwrap_err();
        assert!(matches!(err, TestError::InvalidArgument(_)));
    }

    #[test]
    fn test_filter_count_mismatch() {
        let err = Dimension::with_filters("Text", ["a", "b"], vec![None]).unwrap_err();
        assert!(matches!(err, TestError::InvalidArgument(_)));
    }

    #[test]
    fn test_filter_lookup() {
        let d = Dimension::with_filters(
            "Text",
            ["a", "b", "c"],
            vec![None, Some("Kind==0".into()), Some("  ".into())],
        )
        .unwrap();
        assert_eq!(d.filter(0), None);
        assert_eq!(d.filter(1), Some("Kind==0"));
        assert_eq!(d.filter(2), None);
        assert!(d.has_filters());
    }
}
