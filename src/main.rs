//! idlgen_harness - generator invocation harness for portable interface
//! definitions.
//!
//! Extracts generator distributions, resolves their entry points, and runs
//! one generation task per input definition file with proper failure
//! aggregation.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match idlgen_harness::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
