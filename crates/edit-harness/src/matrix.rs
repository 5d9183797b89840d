//! Combination files and command-line dimension overrides.
//!
//! A combination file lists the dimensions of one or more test cases:
//!
//! ```toml
//! [[combinations]]
//! test = "accepts-tab"
//!
//! [[combinations.dimensions]]
//! name = "AcceptsTab"
//! values = [true, false]
//!
//! [[combinations.dimensions]]
//! name = "Text"
//! values = ["", "two\nlines"]
//! filters = ["", "TextEditableType==0"]
//! ```
//!
//! A block without `test` applies to any case that has no block of its own.

use crate::dimension::Dimension;
use crate::engine::CombinatorialEngine;
use crate::filter::remap_filter;
use crate::value::Value;
use crate::{TestError, TestResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Parsed combination file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinationFile {
    #[serde(default)]
    pub combinations: Vec<CombinationBlock>,
}

/// Dimensions for one test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinationBlock {
    /// Test case the block applies to; `None` for the shared block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<DimensionEntry>,
}

/// One dimension as written in a combination file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionEntry {
    pub name: String,
    pub values: Vec<Value>,
    /// One filter per value; empty strings mean "no filter".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
}

impl DimensionEntry {
    /// Build the runtime dimension.
    pub fn to_dimension(&self) -> TestResult<Dimension> {
        match &self.filters {
            Some(filters) => {
                let filters = filters
                    .iter()
                    .map(|f| (!f.trim().is_empty()).then(|| f.clone()))
                    .collect();
                Dimension::with_filters(self.name.clone(), self.values.clone(), filters)
            }
            None => Dimension::new(self.name.clone(), self.values.clone()),
        }
    }
}

impl CombinationFile {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> TestResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> TestResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from disk; `.json` files are read as JSON, everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> TestResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Find the block for a test, falling back to the shared block.
    pub fn block_for(&self, test: &str) -> Option<&CombinationBlock> {
        self.combinations
            .iter()
            .find(|b| b.test.as_deref() == Some(test))
            .or_else(|| self.combinations.iter().find(|b| b.test.is_none()))
    }

    /// Dimensions for a test.
    pub fn dimensions_for(&self, test: &str) -> TestResult<Vec<Dimension>> {
        let block = self.block_for(test).ok_or_else(|| {
            TestError::InvalidArgument(format!("No combinations defined for test {}", test))
        })?;
        block.dimensions.iter().map(DimensionEntry::to_dimension).collect()
    }
}

impl CombinatorialEngine {
    /// Build an engine from the block for `test` in a combination file.
    pub fn from_file(path: impl AsRef<Path>, test: &str) -> TestResult<Self> {
        let file = CombinationFile::load(path)?;
        Self::from_dimensions(file.dimensions_for(test)?)
    }

    /// Build an engine from TOML text.
    pub fn from_toml_str(content: &str, test: &str) -> TestResult<Self> {
        let file = CombinationFile::from_toml_str(content)?;
        Self::from_dimensions(file.dimensions_for(test)?)
    }
}

/// Replacement values for named dimensions, e.g. from `--dim Name=v1,v2`.
///
/// Overrides come in layers: a combination file first, the command line on
/// top. Each layer is applied to the result of the one below it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    layers: Vec<Vec<OverrideEntry>>,
}

#[derive(Debug, Clone, PartialEq)]
struct OverrideEntry {
    name: String,
    values: Vec<Value>,
    /// Filters written against this layer's values, if the source had any.
    filters: Option<Vec<Option<String>>>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single `Name=v1,v2` override.
    ///
    /// Tokens are typed with [`Value::parse_token`]; `EMPTY_STRING` stands
    /// for the empty string.
    pub fn parse(entry: &str) -> TestResult<Self> {
        let mut overrides = Self::new();
        overrides.push_entry(entry)?;
        Ok(overrides)
    }

    /// Parse many overrides; later entries for the same name win.
    pub fn parse_all<I, S>(entries: I) -> TestResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for entry in entries {
            overrides.push_entry(entry.as_ref())?;
        }
        Ok(overrides)
    }

    fn push_entry(&mut self, entry: &str) -> TestResult<()> {
        let (name, values) = entry.split_once('=').ok_or_else(|| {
            TestError::InvalidArgument(format!("Expected Name=v1,v2 but got '{}'", entry))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(TestError::InvalidArgument(format!(
                "Missing dimension name in '{}'",
                entry
            )));
        }
        let values: Vec<Value> = values
            .split(',')
            .map(|v| Value::parse_token(v.trim()))
            .collect();
        self.set(name, values);
        Ok(())
    }

    /// Set the values for a dimension in the top layer.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.insert(OverrideEntry {
            name: name.into(),
            values,
            filters: None,
        });
    }

    fn insert(&mut self, entry: OverrideEntry) {
        if self.layers.is_empty() {
            self.layers.push(Vec::new());
        }
        if let Some(layer) = self.layers.last_mut() {
            layer.retain(|e| e.name != entry.name);
            layer.push(entry);
        }
    }

    /// Overrides replacing each named dimension, filters included.
    pub fn from_dimensions(dimensions: &[Dimension]) -> Self {
        let mut overrides = Self::new();
        for d in dimensions {
            let filters = d
                .has_filters()
                .then(|| (0..d.len()).map(|i| d.filter(i).map(str::to_string)).collect());
            overrides.insert(OverrideEntry {
                name: d.name().to_string(),
                values: d.values().to_vec(),
                filters,
            });
        }
        overrides
    }

    /// Layer `other` on top; its entries win.
    pub fn merge(&mut self, other: &Overrides) {
        let layers = other.layers.iter().filter(|l| !l.is_empty()).cloned();
        self.layers.extend(layers);
    }

    /// Effective override values for a dimension, if any.
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.iter().find(|e| e.name == name))
            .map(|e| e.values.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(Vec::is_empty)
    }

    /// Replace the values of overridden dimensions.
    ///
    /// Value filters follow their values: indices are rewritten to the new
    /// positions, and comparisons against removed values become constants.
    /// Naming a dimension that does not exist is an error.
    pub fn apply(&self, dimensions: Vec<Dimension>) -> TestResult<Vec<Dimension>> {
        self.layers
            .iter()
            .try_fold(dimensions, |dims, layer| apply_layer(layer, dims))
    }
}

fn apply_layer(
    layer: &[OverrideEntry],
    dimensions: Vec<Dimension>,
) -> TestResult<Vec<Dimension>> {
    for entry in layer {
        if !dimensions.iter().any(|d| d.name() == entry.name) {
            return Err(TestError::InvalidArgument(format!(
                "Override names unknown dimension {}",
                entry.name
            )));
        }
    }

    // For each overridden dimension: old value index -> new indices.
    let moved: HashMap<&str, Vec<Vec<usize>>> = dimensions
        .iter()
        .filter_map(|d| {
            let entry = layer.iter().find(|e| e.name == d.name())?;
            let positions = d
                .values()
                .iter()
                .map(|old| {
                    entry
                        .values
                        .iter()
                        .enumerate()
                        .filter(|(_, new)| new.same_as(old))
                        .map(|(i, _)| i)
                        .collect()
                })
                .collect();
            Some((d.name(), positions))
        })
        .collect();
    let remap = |filter: &str| {
        remap_filter(filter, |name, index| {
            moved.get(name).and_then(|p| p.get(index)).cloned()
        })
    };

    dimensions
        .iter()
        .map(|d| {
            let Some(entry) = layer.iter().find(|e| e.name == d.name()) else {
                let filters = (0..d.len())
                    .map(|i| d.filter(i).map(remap).transpose())
                    .collect::<TestResult<Vec<_>>>()?;
                return build_dimension(d.name(), d.values().to_vec(), filters);
            };

            tracing::debug!(
                dimension = d.name(),
                count = entry.values.len(),
                "dimension overridden"
            );
            if let Some(filters) = &entry.filters {
                return build_dimension(&entry.name, entry.values.clone(), filters.clone());
            }
            let filters = entry
                .values
                .iter()
                .map(|new| {
                    d.values()
                        .iter()
                        .position(|old| old.same_as(new))
                        .and_then(|i| d.filter(i))
                        .map(remap)
                        .transpose()
                })
                .collect::<TestResult<Vec<_>>>()?;
            build_dimension(&entry.name, entry.values.clone(), filters)
        })
        .collect()
}

fn build_dimension(
    name: &str,
    values: Vec<Value>,
    filters: Vec<Option<String>>,
) -> TestResult<Dimension> {
    if filters.iter().any(Option::is_some) {
        Dimension::with_filters(name, values, filters)
    } else {
        Dimension::new(name, values)
    }
}
