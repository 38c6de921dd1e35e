//! Typed access to a prepared option bag.
//!
//! [`OptionReader`] consumes values out of a bag that has already been merged
//! with registry defaults and kind-checked by
//! [`OptionRegistry::prepare`](crate::registry::OptionRegistry::prepare), so a
//! mismatch here means the catalog and the typed structs disagree.

use std::path::PathBuf;

use cp_common::{Choice, Error, Result};

use crate::bag::RawOptionBag;
use crate::value::OptionValue;

pub struct OptionReader {
    bag: RawOptionBag,
}

impl OptionReader {
    pub fn new(bag: RawOptionBag) -> Self {
        Self { bag }
    }

    /// Names not yet consumed.
    pub fn remaining(&self) -> impl Iterator<Item = &str> {
        self.bag.names()
    }

    fn take(&mut self, name: &str) -> Option<OptionValue> {
        self.bag.remove(name)
    }

    fn required(&mut self, name: &str) -> Result<OptionValue> {
        self.take(name).ok_or_else(|| Error::MissingRequiredOption {
            name: name.to_string(),
        })
    }

    fn mismatch(name: &str, expected: &str, got: &OptionValue) -> Error {
        Error::InvalidOptionValue {
            name: name.to_string(),
            message: format!("expected {}, got {}", expected, got.describe()),
        }
    }

    pub fn flag(&mut self, name: &str) -> Result<bool> {
        match self.take(name) {
            None => Ok(false),
            Some(OptionValue::Flag(b)) => Ok(b),
            Some(other) => Err(Self::mismatch(name, "flag", &other)),
        }
    }

    pub fn int(&mut self, name: &str) -> Result<i64> {
        match self.required(name)? {
            OptionValue::Int(i) => Ok(i),
            other => Err(Self::mismatch(name, "int", &other)),
        }
    }

    pub fn opt_int(&mut self, name: &str) -> Result<Option<i64>> {
        match self.take(name) {
            None => Ok(None),
            Some(OptionValue::Int(i)) => Ok(Some(i)),
            Some(other) => Err(Self::mismatch(name, "int", &other)),
        }
    }

    pub fn float(&mut self, name: &str) -> Result<f64> {
        let value = self.required(name)?;
        Self::as_float(name, value)
    }

    pub fn opt_float(&mut self, name: &str) -> Result<Option<f64>> {
        self.take(name)
            .map(|value| Self::as_float(name, value))
            .transpose()
    }

    fn as_float(name: &str, value: OptionValue) -> Result<f64> {
        match value {
            OptionValue::Float(f) => Ok(f),
            OptionValue::Int(i) => Ok(i as f64),
            other => Err(Self::mismatch(name, "float", &other)),
        }
    }

    pub fn string(&mut self, name: &str) -> Result<String> {
        match self.required(name)? {
            OptionValue::Str(s) => Ok(s),
            other => Err(Self::mismatch(name, "string", &other)),
        }
    }

    pub fn opt_string(&mut self, name: &str) -> Result<Option<String>> {
        match self.take(name) {
            None => Ok(None),
            Some(OptionValue::Str(s)) => Ok(Some(s)),
            Some(other) => Err(Self::mismatch(name, "string", &other)),
        }
    }

    pub fn path(&mut self, name: &str) -> Result<PathBuf> {
        self.string(name).map(PathBuf::from)
    }

    pub fn opt_path(&mut self, name: &str) -> Result<Option<PathBuf>> {
        Ok(self.opt_string(name)?.map(PathBuf::from))
    }

    pub fn float_list(&mut self, name: &str) -> Result<Vec<f64>> {
        match self.required(name)? {
            OptionValue::FloatList(v) => Ok(v),
            OptionValue::IntList(v) => Ok(v.into_iter().map(|i| i as f64).collect()),
            other => Err(Self::mismatch(name, "float-list", &other)),
        }
    }

    pub fn int_list(&mut self, name: &str) -> Result<Vec<i64>> {
        match self.required(name)? {
            OptionValue::IntList(v) => Ok(v),
            OptionValue::FloatList(v) if v.is_empty() => Ok(Vec::new()),
            other => Err(Self::mismatch(name, "int-list", &other)),
        }
    }

    pub fn opt_string_list(&mut self, name: &str) -> Result<Option<Vec<String>>> {
        match self.take(name) {
            None => Ok(None),
            Some(OptionValue::StrList(v)) => Ok(Some(v)),
            Some(other) => Err(Self::mismatch(name, "string-list", &other)),
        }
    }

    fn parse_choice<T: Choice>(name: &str, s: &str) -> Result<T> {
        T::parse(s).ok_or_else(|| Error::InvalidOptionValue {
            name: name.to_string(),
            message: format!(
                "unknown {} \"{}\"; expected one of: {}",
                T::KIND,
                s,
                T::NAMES.join(", ")
            ),
        })
    }

    pub fn choice<T: Choice>(&mut self, name: &str) -> Result<T> {
        let value = self.string(name)?;
        Self::parse_choice(name, &value)
    }

    pub fn opt_choice<T: Choice>(&mut self, name: &str) -> Result<Option<T>> {
        self.opt_string(name)?
            .map(|value| Self::parse_choice(name, &value))
            .transpose()
    }

    /// A list of choices. An absent option reads as the empty list.
    pub fn choice_list<T: Choice>(&mut self, name: &str) -> Result<Vec<T>> {
        self.opt_string_list(name)?
            .unwrap_or_default()
            .iter()
            .map(|value| Self::parse_choice(name, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_common::{FeaturesGenerator, Metric};

    #[test]
    fn test_reads_consume_values() {
        let bag = RawOptionBag::new()
            .with("epochs", 3i64)
            .with("dropout", 0.5)
            .with("quiet", true);
        let mut reader = OptionReader::new(bag);
        assert_eq!(reader.int("epochs").unwrap(), 3);
        assert_eq!(reader.float("dropout").unwrap(), 0.5);
        assert!(reader.flag("quiet").unwrap());
        assert_eq!(reader.remaining().count(), 0);
    }

    #[test]
    fn test_absent_optionals() {
        let mut reader = OptionReader::new(RawOptionBag::new());
        assert_eq!(reader.opt_int("max_data_size").unwrap(), None);
        assert_eq!(reader.opt_choice::<Metric>("metric").unwrap(), None);
        assert!(reader
            .choice_list::<FeaturesGenerator>("features_generator")
            .unwrap()
            .is_empty());
        assert!(!reader.flag("no_cuda").unwrap());
    }

    #[test]
    fn test_required_value_missing() {
        let mut reader = OptionReader::new(RawOptionBag::new());
        assert!(matches!(
            reader.int("epochs"),
            Err(Error::MissingRequiredOption { ref name }) if name == "epochs"
        ));
    }

    #[test]
    fn test_choice_parsing() {
        let bag = RawOptionBag::new()
            .with("metric", "prc-auc")
            .with("features_generator", vec!["morgan", "rdkit_2d"]);
        let mut reader = OptionReader::new(bag);
        assert_eq!(
            reader.opt_choice::<Metric>("metric").unwrap(),
            Some(Metric::PrcAuc)
        );
        assert_eq!(
            reader
                .choice_list::<FeaturesGenerator>("features_generator")
                .unwrap(),
            vec![FeaturesGenerator::Morgan, FeaturesGenerator::Rdkit2d]
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let bag = RawOptionBag::new().with("epochs", "ten");
        let err = OptionReader::new(bag).int("epochs").unwrap_err();
        assert_eq!(err.code(), 22);
    }
}
