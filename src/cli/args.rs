//! Command line argument parsing and validation.

use clap::Parser;
use std::path::PathBuf;

/// Generator invocation harness for portable interface definitions
#[derive(Parser, Debug)]
#[command(
    name = "idlgen_harness",
    version,
    about = "Generator invocation harness for portable interface definitions",
    long_about = "Runs packaged code generators over intermediate-representation files.

Reads a build manifest declaring generators (archive distributions or PATH
commands), their inputs, and their options; extracts distributions with
path-traversal protection; and fans one generator invocation per input file
out to a bounded worker pool.

Usage:
  idlgen_harness
  idlgen_harness --manifest build/idlgen.toml --only typescript
  idlgen_harness --jobs 4 --timeout-secs 300

Exit code 0 = every generation task succeeded."
)]
pub struct Args {
    /// Build manifest describing generators, inputs, and options
    #[arg(short, long, value_name = "PATH", default_value = "idlgen.toml")]
    pub manifest: PathBuf,

    /// Run only the named generator
    #[arg(long, value_name = "NAME")]
    pub only: Option<String>,

    /// Worker pool size
    ///
    /// Defaults to the number of CPUs.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Kill an external generator invocation after this many seconds
    ///
    /// By default invocations are never timed out. In-process invocations
    /// cannot be cancelled and are not subject to this limit.
    #[arg(long, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Directory distributions are extracted into
    ///
    /// Defaults to `.idlgen` next to the manifest. The harness owns this
    /// directory exclusively and recreates its contents on every run.
    #[arg(long, value_name = "PATH")]
    pub extract_root: Option<PathBuf>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.jobs == Some(0) {
            return Err("--jobs must be at least 1".to_string());
        }
        if self.timeout_secs == Some(0) {
            return Err("--timeout-secs must be at least 1".to_string());
        }
        if let Some(name) = &self.only {
            if name.is_empty() {
                return Err("--only requires a generator name".to_string());
            }
        }
        Ok(())
    }
}
