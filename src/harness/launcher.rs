//! Launcher script analysis.
//!
//! Managed-runtime generators ship a thin shell launcher under `bin/` that
//! assembles a classpath and delegates to a JVM entry class. Recognizing the
//! launcher lets the harness load the generator in-process instead of paying
//! JVM startup for every invocation.
//!
//! Analysis is deliberately forgiving: anything that is not a well-formed
//! launcher (binary data, no shebang, unrecognized script shape) yields
//! `None` and the entry point is treated as an opaque native executable. The
//! one hard failure is a launcher that parsed cleanly but references
//! classpath files that do not exist - that is a broken distribution, not an
//! unsupported one.

use crate::harness::error::{Context, Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Placeholder launchers use for their installation root.
const APP_HOME: &str = "$APP_HOME";

static CLASSPATH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^CLASSPATH=(.+)$").expect("valid classpath pattern"));

static ENTRY_SYMBOL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"-classpath\s+"\$CLASSPATH"\s+([A-Za-z_][A-Za-z0-9_.$]*)"#)
        .expect("valid entry symbol pattern")
});

/// Classpath and entry symbol recovered from a recognized launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherInfo {
    /// Resolved absolute classpath entries, in launcher order
    pub classpath: Vec<PathBuf>,
    /// Fully qualified name of the class the launcher invokes
    pub entry_symbol: String,
}

/// Inspects an entry point and extracts launcher metadata if it is a
/// recognized managed-runtime launcher.
///
/// Returns `Ok(None)` for native executables and unrecognized scripts.
/// Returns [`Error::LauncherCorruption`] when a recognized launcher names
/// classpath files that are missing on disk.
pub fn analyze(entry_point: &Path) -> Result<Option<LauncherInfo>> {
    let bytes = std::fs::read(entry_point)?;
    let Ok(text) = String::from_utf8(bytes) else {
        log::debug!(
            "{} is not text, treating as native executable",
            entry_point.display()
        );
        return Ok(None);
    };

    if !text.starts_with("#!") {
        return Ok(None);
    }

    let Some(classpath_value) = CLASSPATH_LINE
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Ok(None);
    };
    let Some(entry_symbol) = ENTRY_SYMBOL_LINE
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return Ok(None);
    };

    // The launcher lives at <install root>/bin/<name>.
    let install_root = entry_point
        .parent()
        .and_then(Path::parent)
        .context("launcher entry point has no installation root")?;

    let classpath = resolve_classpath(classpath_value, install_root);

    let missing: Vec<PathBuf> = classpath.iter().filter(|p| !p.is_file()).cloned().collect();
    if !missing.is_empty() {
        return Err(Error::LauncherCorruption {
            path: entry_point.to_path_buf(),
            missing,
        });
    }

    log::debug!(
        "{} launches {} with {} classpath entries",
        entry_point.display(),
        entry_symbol,
        classpath.len()
    );

    Ok(Some(LauncherInfo {
        classpath,
        entry_symbol,
    }))
}

/// Substitutes the installation-root placeholder and resolves each
/// `:`-separated element to an absolute path.
fn resolve_classpath(value: &str, install_root: &Path) -> Vec<PathBuf> {
    let root = install_root.to_string_lossy();
    value
        .split(':')
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .map(|element| {
            let substituted = element.replace(APP_HOME, &root);
            let path = PathBuf::from(substituted);
            if path.is_absolute() {
                path
            } else {
                install_root.join(path)
            }
        })
        .collect()
}
