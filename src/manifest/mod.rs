//! Build manifest loading.
//!
//! The manifest (`idlgen.toml` by convention) declares the project, the
//! generators to run, their inputs, and their options:
//!
//! ```toml
//! [project]
//! name = "payments-api"
//! version = "1.4.0"
//!
//! [[generator]]
//! name = "typescript"
//! distribution = "generators/typescript-generator-2.3.1.tgz"
//! inputs = ["build/ir/payments.json"]
//! output = "generated/typescript"
//!
//! [generator.options]
//! packageName = "payments-api"
//! ```
//!
//! A generator names either a `distribution` archive or a PATH `command`,
//! never both. Relative paths are resolved against the manifest's directory.

use crate::error::{CliError, HarnessError, Result};
use crate::harness::GeneratorOptions;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn default_verb() -> String {
    "generate".to_string()
}

/// Parsed and path-resolved build manifest.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildManifest {
    /// Project metadata
    pub project: ProjectSection,

    /// Generators to run, in declaration order
    #[serde(default, rename = "generator")]
    pub generators: Vec<GeneratorSection>,
}

/// The `[project]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Project name
    pub name: String,

    /// Project version, used as the default `productVersion` option
    #[serde(default)]
    pub version: Option<String>,
}

/// One `[[generator]]` entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    /// Generator name, used in logs and failure reports
    pub name: String,

    /// Distribution archive to extract (mutually exclusive with `command`)
    #[serde(default)]
    pub distribution: Option<PathBuf>,

    /// Executable to resolve on PATH (mutually exclusive with `distribution`)
    #[serde(default)]
    pub command: Option<String>,

    /// Name of the `bin/` executable inside the distribution; defaults to
    /// the generator name
    #[serde(default)]
    pub executable: Option<String>,

    /// Action verb passed as the generator's first argument
    #[serde(default = "default_verb")]
    pub verb: String,

    /// Intermediate-representation files to generate from
    pub inputs: Vec<PathBuf>,

    /// Root directory for generated output; each input gets its own
    /// subdirectory named after the input's file stem
    pub output: PathBuf,

    /// Generator options, rendered to `--key=value` CLI tokens
    #[serde(default)]
    pub options: toml::Table,
}

impl BuildManifest {
    /// Loads and validates a manifest, resolving relative paths against the
    /// manifest's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut manifest: BuildManifest = toml::from_str(&text)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for generator in &mut manifest.generators {
            if let Some(distribution) = &mut generator.distribution {
                *distribution = resolve(base, distribution);
            }
            for input in &mut generator.inputs {
                *input = resolve(base, input);
            }
            generator.output = resolve(base, &generator.output);
        }

        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |reason: String| -> HarnessError {
            CliError::InvalidArguments {
                reason: format!("{}: {reason}", path.display()),
            }
            .into()
        };

        if self.generators.is_empty() {
            return Err(invalid("manifest declares no generators".to_string()));
        }

        let mut names = HashSet::new();
        for generator in &self.generators {
            if !names.insert(generator.name.as_str()) {
                return Err(invalid(format!(
                    "generator `{}` is declared more than once",
                    generator.name
                )));
            }
            match (&generator.distribution, &generator.command) {
                (Some(_), Some(_)) => {
                    return Err(invalid(format!(
                        "generator `{}` declares both a distribution and a command",
                        generator.name
                    )));
                }
                (None, None) => {
                    return Err(invalid(format!(
                        "generator `{}` declares neither a distribution nor a command",
                        generator.name
                    )));
                }
                _ => {}
            }
            if generator.inputs.is_empty() {
                return Err(invalid(format!(
                    "generator `{}` has no inputs",
                    generator.name
                )));
            }
        }
        Ok(())
    }
}

impl GeneratorSection {
    /// Name of the `bin/` executable inside the distribution.
    pub fn executable(&self) -> &str {
        self.executable.as_deref().unwrap_or(&self.name)
    }

    /// The generator's options as a validated, insertion-ordered set.
    pub fn options(&self) -> crate::harness::Result<GeneratorOptions> {
        GeneratorOptions::from_toml_table(&self.options)
    }

    /// Output directory exclusively owned by `input`'s unit of work.
    pub fn output_dir_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| input.as_os_str().to_os_string());
        self.output.join(stem)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
