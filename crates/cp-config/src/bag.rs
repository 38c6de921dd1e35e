//! The raw option bag handed over by the option-bag builder.

use std::collections::BTreeMap;
use std::path::Path;

use cp_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::value::OptionValue;

/// Mapping from option name to an untyped value.
///
/// Absent options are simply missing keys; there is no explicit null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawOptionBag {
    values: BTreeMap<String, OptionValue>,
}

impl RawOptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.values.insert(name.to_string(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Parse a JSON object of option values. `null` entries are treated as absent.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Option<OptionValue>> = serde_json::from_str(json)?;
        Ok(Self {
            values: raw
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v)))
                .collect(),
        })
    }

    /// Read a JSON option file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&content)
    }
}

impl IntoIterator for RawOptionBag {
    type Item = (String, OptionValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, OptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl FromIterator<(String, OptionValue)> for RawOptionBag {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
