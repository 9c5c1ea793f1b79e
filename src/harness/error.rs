//! Error types for the generator invocation harness.
//!
//! The taxonomy separates setup failures (bad archive, corrupt launcher,
//! invalid options), which abort before any work is scheduled, from per-unit
//! invocation failures, which are collected and reported together once every
//! unit has finished.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the distribution, launcher, invocation, and
/// orchestration layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed archive, path-traversal attempt, missing root directory, or
    /// missing expected entry point after extraction. Fatal to the build step.
    #[error("archive extraction failed: {0}")]
    Extraction(String),

    /// A recognized launcher whose referenced classpath files do not exist.
    ///
    /// Distinct from an unrecognized launcher (which silently falls back to
    /// external-process execution): the launcher parsed cleanly, so missing
    /// files indicate a broken distribution.
    #[error("launcher {} references missing classpath entries: {missing:?}", path.display())]
    LauncherCorruption {
        /// The launcher script that was analyzed
        path: PathBuf,
        /// Classpath entries that do not exist on disk
        missing: Vec<PathBuf>,
    },

    /// A generator invocation exited nonzero, signaled a nonzero status, or
    /// faulted. Fatal to its unit of work; aggregated at the orchestrator.
    #[error("{0}")]
    Invocation(InvocationFailure),

    /// Malformed option key or value at render time. Fatal before any
    /// invocation is attempted.
    #[error("invalid generator option: {0}")]
    OptionValidation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with a formatted message
    #[error("{0}")]
    GenericError(String),
}

/// Diagnostics for a failed generator invocation.
///
/// Both execution modes build the same failure shape so callers cannot
/// observe which strategy was chosen: program, full argument list, the
/// caller-supplied context label, the exit/status code, and whatever output
/// was captured (empty for in-process runs).
#[derive(Debug)]
pub struct InvocationFailure {
    /// Program or entry-point name that was invoked
    pub program: String,
    /// Complete argument list passed to the generator
    pub args: Vec<String>,
    /// Caller-supplied context label (e.g. "generate typescript for service.json")
    pub context: String,
    /// Exit or status code, if one was produced
    pub status: Option<i32>,
    /// Captured stdout/stderr, empty when none was available
    pub output: String,
}

impl std::fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed: `{} {}` exited with {}",
            self.context,
            self.program,
            self.args.join(" "),
            match self.status {
                Some(code) => format!("status {code}"),
                None => "no status".to_string(),
            }
        )?;
        if !self.output.is_empty() {
            write!(f, "\n{}", self.output.trim_end())?;
        }
        Ok(())
    }
}

/// Extension trait attaching a static context message to foreign errors.
pub trait Context<T> {
    /// Wrap the error (or absence) with a descriptive message
    fn context(self, msg: &str) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(msg.to_string()))
    }
}

impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{msg}: {e}")))
    }
}

/// Extension trait for IO results, capturing the action and path.
pub trait ErrorExt<T> {
    /// Wrap an IO error with the action being performed and the path involved
    fn fs_context(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{action} ({}): {e}", path.display())))
    }
}

/// Returns early with a [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::harness::error::Error::GenericError(format!($($arg)*)).into())
    };
}
