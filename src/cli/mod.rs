//! Command line interface for the generator harness.
//!
//! `run()` loads the build manifest, resolves each generator's entry point
//! (extracting archive distributions or probing PATH commands), renders its
//! options, and fans one invocation per input file out to the worker pool.
//! Setup failures abort immediately; generation failures are collected per
//! generator and reported together at the end.

mod args;
mod defaults;

pub use args::Args;

use crate::error::{CliError, HarnessError, Result};
use crate::harness::{
    distribution, render, GeneratorRegistry, GenerationReport, Invoker, Orchestrator,
    RequiredDefault, WorkUnit,
};
use crate::manifest::{BuildManifest, GeneratorSection};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| HarnessError::Cli(CliError::InvalidArguments { reason }))?;

    // The default registry is empty: every generator runs as a subprocess.
    // Library consumers embed in-process generators through `run_with`.
    run_with(args, &GeneratorRegistry::new()).await
}

/// Runs the generation step with a caller-supplied in-process registry.
pub async fn run_with(args: Args, registry: &GeneratorRegistry) -> Result<i32> {
    let manifest = BuildManifest::load(&args.manifest)?;
    let manifest_dir = args
        .manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let extract_root = args
        .extract_root
        .clone()
        .unwrap_or_else(|| manifest_dir.join(".idlgen"));
    let timeout = args.timeout_secs.map(Duration::from_secs);

    let selected: Vec<&GeneratorSection> = match &args.only {
        Some(name) => {
            let found: Vec<_> = manifest
                .generators
                .iter()
                .filter(|g| g.name == *name)
                .collect();
            if found.is_empty() {
                return Err(CliError::InvalidArguments {
                    reason: format!(
                        "no generator named `{name}` in {}",
                        args.manifest.display()
                    ),
                }
                .into());
            }
            found
        }
        None => manifest.generators.iter().collect(),
    };

    let required = defaults::required_defaults(manifest.project.version.clone(), &manifest_dir);

    let mut failed_generators = Vec::new();
    for generator in selected {
        let report = run_generator(
            generator,
            registry,
            &extract_root,
            timeout,
            args.jobs,
            &required,
        )
        .await?;

        if report.is_success() {
            log::info!(
                "✓ {}: {} task(s) succeeded",
                generator.name,
                report.succeeded
            );
        } else {
            failed_generators.push(generator.name.clone());
            if let Err(e) = report.into_result() {
                log::error!("{e}");
            }
        }
    }

    if failed_generators.is_empty() {
        Ok(0)
    } else {
        log::error!("generation failed for: {}", failed_generators.join(", "));
        Ok(1)
    }
}

/// Resolves one generator's entry point and fans its inputs out.
///
/// Setup failures (extraction, launcher corruption, option validation) are
/// returned as errors before any unit is scheduled; per-unit failures land in
/// the report.
async fn run_generator(
    generator: &GeneratorSection,
    registry: &GeneratorRegistry,
    extract_root: &Path,
    timeout: Option<Duration>,
    jobs: Option<usize>,
    required: &[RequiredDefault],
) -> Result<GenerationReport> {
    let entry_point = resolve_entry_point(generator, extract_root).await?;

    let options = generator.options()?;
    let rendered = render(&options, required)?;
    let invoker = Invoker::resolve(&entry_point, registry, timeout)?;

    let mut orchestrator = Orchestrator::new(
        invoker,
        generator.name.as_str(),
        generator.verb.as_str(),
        rendered,
    );
    if let Some(jobs) = jobs {
        orchestrator = orchestrator.concurrency(jobs);
    }

    let units = generator
        .inputs
        .iter()
        .map(|input| WorkUnit {
            input: input.clone(),
            output_dir: generator.output_dir_for(input),
        })
        .collect();

    Ok(orchestrator.run(units).await?)
}

async fn resolve_entry_point(
    generator: &GeneratorSection,
    extract_root: &Path,
) -> Result<PathBuf> {
    match (&generator.distribution, &generator.command) {
        (Some(archive), None) => {
            let destination = extract_root.join(&generator.name);
            let extracted =
                distribution::extract(archive, &destination, generator.executable()).await?;
            Ok(extracted.entry_point().to_path_buf())
        }
        (None, Some(command)) => which::which(command).map_err(|e| {
            CliError::InvalidArguments {
                reason: format!("generator command `{command}` not found: {e}"),
            }
            .into()
        }),
        // The manifest loader rejects every other combination.
        _ => Err(CliError::InvalidArguments {
            reason: format!(
                "generator `{}` has no resolvable entry point",
                generator.name
            ),
        }
        .into()),
    }
}
