//! Generator distribution and invocation harness.
//!
//! This library runs packaged code generators over portable interface
//! definitions:
//!
//! - Unpacks generator distributions (gzip tar archives) with path-traversal
//!   protection and entry-point verification
//! - Recognizes managed-runtime launcher scripts and, when an in-process
//!   entry is registered, runs the generator inside the host runtime to skip
//!   per-invocation startup cost
//! - Renders structured generator options into the CLI argument protocol
//! - Fans one invocation per input definition file out to a bounded worker
//!   pool, with fail-at-end aggregation
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod error;
pub mod harness;
pub mod manifest;

// Re-export commonly used types
pub use error::{CliError, HarnessError, Result};
