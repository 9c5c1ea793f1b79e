//! Generator option configuration.
//!
//! Options are an insertion-ordered mapping from camelCase name to a scalar
//! value, built once per generator configuration and copied-and-extended for
//! per-invocation flags. Rendering to CLI tokens lives in [`render`].

mod render;

pub use render::{render, RequiredDefault};

use crate::harness::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Reserved option name that cannot be set directly.
pub const PROPERTIES_KEY: &str = "properties";

static OPTION_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z][a-zA-Z0-9]*$").expect("valid option key pattern"));

/// Insertion-ordered generator options.
///
/// Keys are camelCase identifiers; values are booleans or stringifiable
/// scalars. Once handed to a renderer the set is never mutated in place -
/// per-invocation additions go through [`GeneratorOptions::with`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorOptions {
    entries: Vec<(String, Value)>,
}

impl GeneratorOptions {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing any previous value at its original position.
    ///
    /// # Errors
    ///
    /// Rejects names that are not camelCase identifiers, the reserved
    /// `properties` name, and null values.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        if !OPTION_KEY.is_match(key) {
            return Err(Error::OptionValidation(format!(
                "option name `{key}` must be a camelCase identifier"
            )));
        }
        if key == PROPERTIES_KEY {
            return Err(Error::OptionValidation(format!(
                "option name `{PROPERTIES_KEY}` is reserved"
            )));
        }
        let value = value.into();
        if value.is_null() {
            return Err(Error::OptionValidation(format!(
                "option `{key}` must not be null"
            )));
        }

        match self.entries.iter_mut().find(|(k, _)| k.as_str() == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key.to_string(), value)),
        }
        Ok(())
    }

    /// Returns a copy of this set with one additional option.
    pub fn with(&self, key: &str, value: impl Into<Value>) -> Result<Self> {
        let mut copy = self.clone();
        copy.set(key, value)?;
        Ok(copy)
    }

    /// Looks up an option value by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Whether an option with this name is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of options present.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds an option set from a manifest TOML table, in table order.
    pub fn from_toml_table(table: &toml::Table) -> Result<Self> {
        let mut options = Self::new();
        for (key, value) in table {
            options.set(key, scalar_from_toml(key, value)?)?;
        }
        Ok(options)
    }

    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, key: &str, value: Value) {
        self.entries.push((key.to_string(), value));
    }
}

/// Converts a manifest scalar to an option value, rejecting structured TOML.
fn scalar_from_toml(key: &str, value: &toml::Value) -> Result<Value> {
    match value {
        toml::Value::String(s) => Ok(Value::String(s.clone())),
        toml::Value::Integer(i) => Ok(Value::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| {
                Error::OptionValidation(format!("option `{key}` is not a finite number"))
            }),
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        toml::Value::Datetime(d) => Ok(Value::String(d.to_string())),
        toml::Value::Array(_) | toml::Value::Table(_) => Err(Error::OptionValidation(format!(
            "option `{key}` must be a scalar"
        ))),
    }
}
