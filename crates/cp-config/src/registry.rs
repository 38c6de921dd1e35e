//! The option registry: every recognized option with its kind, default,
//! allowed values and required-ness.
//!
//! A registry is populated once at process start (see [`crate::catalog`]) and
//! is read-only afterwards. Its job at resolution time is to turn the
//! caller's raw bag into a bag that is complete (defaults merged, required
//! options present) and well-typed (every value coerced to its declared kind,
//! choices checked).

use std::collections::HashMap;

use cp_common::{Choice, Error, Result};
use serde::Serialize;

use crate::bag::RawOptionBag;
use crate::value::{OptionKind, OptionValue};

/// Declaration of a single option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<OptionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<&'static [&'static str]>,
    pub required: bool,
    pub help: &'static str,
}

impl OptionSpec {
    pub fn new(name: &'static str, kind: OptionKind, help: &'static str) -> Self {
        OptionSpec {
            name,
            kind,
            default: None,
            choices: None,
            required: false,
            help,
        }
    }

    /// Boolean switch defaulting to `false`.
    pub fn flag(name: &'static str, help: &'static str) -> Self {
        Self::new(name, OptionKind::Flag, help).with_default(false)
    }

    /// Optional string with no default.
    pub fn string(name: &'static str, help: &'static str) -> Self {
        Self::new(name, OptionKind::String, help)
    }

    pub fn int(name: &'static str, default: i64, help: &'static str) -> Self {
        Self::new(name, OptionKind::Int, help).with_default(default)
    }

    pub fn float(name: &'static str, default: f64, help: &'static str) -> Self {
        Self::new(name, OptionKind::Float, help).with_default(default)
    }

    pub fn float_list(name: &'static str, default: &[f64], help: &'static str) -> Self {
        Self::new(name, OptionKind::FloatList, help).with_default(default.to_vec())
    }

    pub fn int_list(name: &'static str, default: &[i64], help: &'static str) -> Self {
        Self::new(name, OptionKind::IntList, help).with_default(default.to_vec())
    }

    /// Single choice backed by the enum `T`.
    pub fn choice<T: Choice>(name: &'static str, help: &'static str) -> Self {
        Self::new(name, OptionKind::Enum, help).with_choices(T::NAMES)
    }

    /// List of choices backed by the enum `T`.
    pub fn choice_list<T: Choice>(name: &'static str, help: &'static str) -> Self {
        Self::new(name, OptionKind::StringList, help).with_choices(T::NAMES)
    }

    pub fn with_default(mut self, value: impl Into<OptionValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Coerce `value` to this option's kind and check it against the allowed set.
    pub fn check(&self, value: OptionValue) -> Result<OptionValue> {
        let described = value.describe();
        let value = value
            .coerce(self.kind)
            .ok_or_else(|| Error::InvalidOptionValue {
                name: self.name.to_string(),
                message: format!("expected {}, got {}", self.kind, described),
            })?;

        if let Some(choices) = self.choices {
            let offending = match &value {
                OptionValue::Str(s) => (!choices.contains(&s.as_str())).then(|| s.clone()),
                OptionValue::StrList(items) => items
                    .iter()
                    .find(|s| !choices.contains(&s.as_str()))
                    .cloned(),
                _ => None,
            };
            if let Some(bad) = offending {
                return Err(Error::InvalidOptionValue {
                    name: self.name.to_string(),
                    message: format!("\"{}\" is not one of: {}", bad, choices.join(", ")),
                });
            }
        }

        Ok(value)
    }
}

/// Catalog of recognized options, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    specs: Vec<OptionSpec>,
    index: HashMap<&'static str, usize>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. Names are unique within a registry.
    pub fn register(&mut self, spec: OptionSpec) -> Result<()> {
        if self.index.contains_key(spec.name) {
            return Err(Error::DuplicateOption {
                name: spec.name.to_string(),
            });
        }
        self.index.insert(spec.name, self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Register every spec, stopping at the first duplicate.
    pub fn extend(&mut self, specs: impl IntoIterator<Item = OptionSpec>) -> Result<()> {
        for spec in specs {
            self.register(spec)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declarations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &OptionSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// A bag holding every declared default. Options without a default are absent.
    pub fn defaults_bag(&self) -> RawOptionBag {
        self.specs
            .iter()
            .filter_map(|spec| {
                spec.default
                    .clone()
                    .map(|value| (spec.name.to_string(), value))
            })
            .collect()
    }

    /// Check a caller-supplied bag and merge it over the defaults.
    ///
    /// Caller values take precedence. Fails on the first unknown option,
    /// ill-typed value, or missing required option.
    pub fn prepare(&self, supplied: RawOptionBag) -> Result<RawOptionBag> {
        let mut merged = self.defaults_bag();

        for (name, value) in supplied {
            let spec = self
                .get(&name)
                .ok_or_else(|| Error::UnknownOption { name: name.clone() })?;
            let value = spec.check(value)?;
            merged.insert(&name, value);
        }

        if let Some(missing) = self
            .specs
            .iter()
            .find(|spec| spec.required && !merged.contains(spec.name))
        {
            return Err(Error::MissingRequiredOption {
                name: missing.name.to_string(),
            });
        }

        Ok(merged)
    }
}
