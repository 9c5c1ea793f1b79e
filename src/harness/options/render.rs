//! Rendering options into the generator CLI argument protocol.
//!
//! Generators consume `--flag` for boolean true, nothing for boolean false,
//! and `--key=value` for everything else. Token order is deterministic:
//! configured options in insertion order, then appended required defaults.

use super::GeneratorOptions;
use crate::harness::error::{Error, Result};
use serde_json::Value;

/// A required option with a lazily computed default value.
///
/// The closure runs only when rendering actually needs the value - some
/// defaults are expensive (e.g. derived from version-control state).
pub struct RequiredDefault {
    name: String,
    compute: Box<dyn Fn() -> String + Send + Sync>,
}

impl RequiredDefault {
    /// Creates a required default for `name`.
    pub fn new(name: impl Into<String>, compute: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            compute: Box::new(compute),
        }
    }

    /// Option name this default fills in.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for RequiredDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequiredDefault")
            .field("name", &self.name)
            .finish()
    }
}

/// Renders options plus required defaults into CLI tokens.
///
/// Options the caller set explicitly come first, in insertion order; required
/// defaults not already present are computed and appended. An option set to
/// exactly its computed default is redundant and logged as a warning, never
/// an error.
///
/// # Errors
///
/// [`Error::OptionValidation`] for a key containing `=` or a value with no
/// string form.
pub fn render(options: &GeneratorOptions, defaults: &[RequiredDefault]) -> Result<Vec<String>> {
    let mut tokens = Vec::with_capacity(options.len() + defaults.len());

    for (key, value) in options.iter() {
        emit(&mut tokens, key, value)?;
    }

    for default in defaults {
        match options.get(default.name()) {
            Some(existing) => {
                let computed = (default.compute)();
                if stringify(existing).as_deref() == Some(computed.as_str()) {
                    log::warn!(
                        "option {} is explicitly set to its default value `{}`; it can be removed",
                        default.name(),
                        computed
                    );
                }
            }
            None => {
                let computed = (default.compute)();
                emit(&mut tokens, default.name(), &Value::String(computed))?;
            }
        }
    }

    Ok(tokens)
}

fn emit(tokens: &mut Vec<String>, key: &str, value: &Value) -> Result<()> {
    if key.contains('=') {
        return Err(Error::OptionValidation(format!(
            "option name `{key}` must not contain '='"
        )));
    }
    match value {
        Value::Bool(true) => tokens.push(format!("--{key}")),
        Value::Bool(false) => {}
        other => {
            let text = stringify(other).ok_or_else(|| {
                Error::OptionValidation(format!("option `{key}` has no string form"))
            })?;
            tokens.push(format!("--{key}={text}"));
        }
    }
    Ok(())
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
