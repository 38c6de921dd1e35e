//! Untyped option values and their declared kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of a registered option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionKind {
    /// Boolean switch, default `false` unless declared otherwise.
    Flag,
    /// Free-form string (usually a path).
    String,
    Int,
    Float,
    FloatList,
    IntList,
    /// List of strings, optionally constrained to an allowed set.
    StringList,
    /// Single string constrained to an allowed set.
    Enum,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionKind::Flag => "flag",
            OptionKind::String => "string",
            OptionKind::Int => "int",
            OptionKind::Float => "float",
            OptionKind::FloatList => "float-list",
            OptionKind::IntList => "int-list",
            OptionKind::StringList => "string-list",
            OptionKind::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// A value as supplied by the option-bag builder.
///
/// Deserializes from plain JSON scalars and arrays. Integer literals become
/// [`OptionValue::Int`] and are widened to floats by [`OptionValue::coerce`]
/// when the option is declared as a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Int(i64),
    Float(f64),
    Str(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    StrList(Vec<String>),
}

impl OptionValue {
    /// Short description of the value's shape, for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            OptionValue::Flag(_) => "a boolean",
            OptionValue::Int(_) => "an integer",
            OptionValue::Float(_) => "a float",
            OptionValue::Str(_) => "a string",
            OptionValue::IntList(_) => "an integer list",
            OptionValue::FloatList(_) => "a float list",
            OptionValue::StrList(_) => "a string list",
        }
    }

    fn is_empty_list(&self) -> bool {
        match self {
            OptionValue::IntList(v) => v.is_empty(),
            OptionValue::FloatList(v) => v.is_empty(),
            OptionValue::StrList(v) => v.is_empty(),
            _ => false,
        }
    }

    /// Convert to the representation declared by `kind`.
    ///
    /// Returns `None` when the value cannot represent that kind.
    pub fn coerce(self, kind: OptionKind) -> Option<OptionValue> {
        if self.is_empty_list() {
            return match kind {
                OptionKind::FloatList => Some(OptionValue::FloatList(Vec::new())),
                OptionKind::IntList => Some(OptionValue::IntList(Vec::new())),
                OptionKind::StringList => Some(OptionValue::StrList(Vec::new())),
                _ => None,
            };
        }

        match (kind, self) {
            (OptionKind::Flag, v @ OptionValue::Flag(_)) => Some(v),
            (OptionKind::String | OptionKind::Enum, v @ OptionValue::Str(_)) => Some(v),
            (OptionKind::Int, v @ OptionValue::Int(_)) => Some(v),
            (OptionKind::Float, v @ OptionValue::Float(_)) => Some(v),
            (OptionKind::Float, OptionValue::Int(i)) => Some(OptionValue::Float(i as f64)),
            (OptionKind::FloatList, v @ OptionValue::FloatList(_)) => Some(v),
            (OptionKind::FloatList, OptionValue::IntList(v)) => Some(OptionValue::FloatList(
                v.into_iter().map(|i| i as f64).collect(),
            )),
            (OptionKind::IntList, v @ OptionValue::IntList(_)) => Some(v),
            (OptionKind::StringList, v @ OptionValue::StrList(_)) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Flag(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

impl From<&std::path::Path> for OptionValue {
    fn from(v: &std::path::Path) -> Self {
        OptionValue::Str(v.display().to_string())
    }
}

impl From<Vec<f64>> for OptionValue {
    fn from(v: Vec<f64>) -> Self {
        OptionValue::FloatList(v)
    }
}

impl From<Vec<i64>> for OptionValue {
    fn from(v: Vec<i64>) -> Self {
        OptionValue::IntList(v)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(v: Vec<&str>) -> Self {
        OptionValue::StrList(v.into_iter().map(str::to_string).collect())
    }
}
