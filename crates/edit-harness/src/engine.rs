//! Cartesian product enumeration over dimensions.

use crate::dimension::Dimension;
use crate::filter::FilterExpr;
use crate::value::Value;
use crate::{TestError, TestResult};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// One selected value per dimension.
///
/// Entries keep the dimension order of the engine that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Combination {
    ordinal: usize,
    entries: Vec<(String, Value)>,
    indices: Vec<usize>,
}

impl Combination {
    /// Create an empty combination to be filled by the engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-based position of this combination in the enumeration.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Value indices, one per dimension.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the combination has not been populated yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(dimension name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Look up the value selected for a dimension.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Look up a value, failing when the dimension is missing.
    pub fn value(&self, name: &str) -> TestResult<&Value> {
        self.get(name).ok_or_else(|| {
            TestError::InvalidArgument(format!("Dimension {} not found in combination", name))
        })
    }

    /// Read a boolean dimension.
    pub fn get_bool(&self, name: &str) -> TestResult<bool> {
        let value = self.value(name)?;
        value.as_bool().ok_or_else(|| type_error(name, "bool", value))
    }

    /// Read an integer dimension.
    pub fn get_int(&self, name: &str) -> TestResult<i64> {
        let value = self.value(name)?;
        value.as_int().ok_or_else(|| type_error(name, "integer", value))
    }

    /// Read a string or identifier dimension.
    pub fn get_str(&self, name: &str) -> TestResult<&str> {
        let value = self.value(name)?;
        value.as_str().ok_or_else(|| type_error(name, "string", value))
    }

    /// Parse a string or identifier dimension into a typed option.
    pub fn parse<T: FromStr>(&self, name: &str) -> TestResult<T> {
        let value = self.value(name)?;
        value
            .parse()
            .ok_or_else(|| type_error(name, std::any::type_name::<T>(), value))
    }

    /// Short single-line description, e.g. `Kind=TextBox Text=EMPTY_STRING`.
    pub fn describe(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}={}", name, value.identifier()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn type_error(name: &str, expected: &str, value: &Value) -> TestError {
    TestError::InvalidArgument(format!(
        "Dimension {} holds [{}], expected {}",
        name, value, expected
    ))
}

/// Callback consulted for every candidate combination.
///
/// Receives the candidate and the verdict of the value filters; returns
/// whether the combination should be emitted.
pub type FilterCallback = Box<dyn FnMut(&Combination, bool) -> bool + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    BeforeStart,
    Active,
    Exhausted,
}

/// Enumerates every combination of values across a set of dimensions.
///
/// Enumeration is an odometer over value indices in which the **last**
/// dimension varies fastest, so the order is lexicographic in the
/// dimension order given at construction. Each combination is visited
/// exactly once; once exhausted the engine stays exhausted.
pub struct CombinatorialEngine {
    dimensions: Vec<Dimension>,
    filters: Vec<Vec<Option<FilterExpr>>>,
    indices: Vec<usize>,
    cursor: Cursor,
    emitted: usize,
    last_emitted: Option<Vec<usize>>,
    filtering: Option<FilterCallback>,
}

impl CombinatorialEngine {
    /// Create an engine over the given dimensions.
    pub fn from_dimensions(dimensions: Vec<Dimension>) -> TestResult<Self> {
        if dimensions.is_empty() {
            return Err(TestError::InvalidArgument("Dimensions cannot be empty".into()));
        }

        let mut seen = HashSet::new();
        for dimension in &dimensions {
            if !seen.insert(dimension.name()) {
                return Err(TestError::InvalidArgument(format!(
                    "Duplicate dimension name: {}",
                    dimension.name()
                )));
            }
        }

        let mut filters = Vec::with_capacity(dimensions.len());
        for dimension in &dimensions {
            let mut roots = Vec::with_capacity(dimension.len());
            for i in 0..dimension.len() {
                let root = match dimension.filter(i) {
                    Some(expr) => Some(FilterExpr::parse(expr, &dimensions)?),
                    None => None,
                };
                roots.push(root);
            }
            filters.push(roots);
        }

        let count = dimensions.len();
        Ok(Self {
            dimensions,
            filters,
            indices: vec![0; count],
            cursor: Cursor::BeforeStart,
            emitted: 0,
            last_emitted: None,
            filtering: None,
        })
    }

    /// Install a callback that can veto candidate combinations.
    pub fn set_filter<F>(&mut self, filter: F)
    where
        F: FnMut(&Combination, bool) -> bool + Send + 'static,
    {
        self.filtering = Some(Box::new(filter));
    }

    /// The dimensions being combined.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Product of all dimension cardinalities, ignoring filters.
    pub fn total_combinations(&self) -> usize {
        self.dimensions.iter().map(Dimension::len).product()
    }

    /// Number of combinations emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Whether every combination has been visited.
    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Fill `out` with the next accepted combination.
    ///
    /// Returns `false` once all combinations have been visited; `out` is
    /// left untouched in that case.
    pub fn next_into(&mut self, out: &mut Combination) -> bool {
        loop {
            match self.cursor {
                Cursor::Exhausted => return false,
                Cursor::BeforeStart => self.cursor = Cursor::Active,
                Cursor::Active => {
                    if !self.increment() {
                        self.cursor = Cursor::Exhausted;
                        tracing::debug!(emitted = self.emitted, "combinations exhausted");
                        return false;
                    }
                }
            }

            if self.is_acceptable() {
                self.populate(out);
                self.last_emitted = Some(self.indices.clone());
                self.emitted += 1;
                return true;
            }
        }
    }

    /// Describe the most recently emitted combination, one dimension per line.
    ///
    /// Returns `[none]` before the first combination has been produced.
    pub fn describe_state(&self) -> String {
        let Some(indices) = &self.last_emitted else {
            return "[none]".to_string();
        };

        let mut result = String::with_capacity(self.dimensions.len() * 32);
        for (dimension, &index) in self.dimensions.iter().zip(indices) {
            let value = &dimension.values()[index];
            result.push_str(&format!("{}: [{}]\n", dimension.name(), value));
        }
        result
    }

    /// Odometer step; returns false when it wraps past the last combination.
    fn increment(&mut self) -> bool {
        for i in (0..self.dimensions.len()).rev() {
            self.indices[i] += 1;
            if self.indices[i] < self.dimensions[i].len() {
                return true;
            }
            self.indices[i] = 0;
        }
        false
    }

    fn is_acceptable(&mut self) -> bool {
        let verdict = self
            .filters
            .iter()
            .zip(&self.indices)
            .all(|(roots, &index)| match &roots[index] {
                Some(expr) => expr.evaluate(&self.indices),
                None => true,
            });

        if self.filtering.is_none() {
            return verdict;
        }

        let mut candidate = Combination::new();
        self.populate(&mut candidate);
        match self.filtering.as_mut() {
            Some(callback) => callback(&candidate, verdict),
            None => verdict,
        }
    }

    fn populate(&self, out: &mut Combination) {
        out.ordinal = self.emitted;
        out.entries.clear();
        out.indices.clear();
        for (dimension, &index) in self.dimensions.iter().zip(&self.indices) {
            out.entries
                .push((dimension.name().to_string(), dimension.values()[index].clone()));
            out.indices.push(index);
        }
    }
}

impl Iterator for CombinatorialEngine {
    type Item = Combination;

    fn next(&mut self) -> Option<Combination> {
        let mut combination = Combination::new();
        self.next_into(&mut combination).then_some(combination)
    }
}

impl fmt::Debug for CombinatorialEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinatorialEngine")
            .field("dimensions", &self.dimensions)
            .field("indices", &self.indices)
            .field("cursor", &self.cursor)
            .field("emitted", &self.emitted)
            .field("filtering", &self.filtering.is_some())
            .finish()
    }
}
