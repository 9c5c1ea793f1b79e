//! Per-file work distribution.
//!
//! Each input definition file becomes one independent unit of work: wipe the
//! unit's own output directory, then invoke the generator for that file.
//! Units run on a bounded worker pool; a failing unit never stops its
//! siblings, and the aggregate verdict is produced only after every unit has
//! reached a terminal state.

use crate::harness::error::{Error, Result};
use crate::harness::invoke::Invoker;
use crate::harness::utils::fs;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One generator invocation scoped to a single input definition file.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    /// Intermediate-representation file to generate from
    pub input: PathBuf,
    /// Directory this unit exclusively owns for its output
    pub output_dir: PathBuf,
}

/// A unit that reached the Failed state, with its diagnostics.
#[derive(Debug)]
pub struct UnitFailure {
    /// Input file of the failed unit
    pub input: PathBuf,
    /// What went wrong
    pub error: Error,
}

/// Terminal outcome of a fan-out.
#[derive(Debug)]
pub struct GenerationReport {
    /// Generator the units ran against
    pub generator: String,
    /// Action verb the units ran
    pub verb: String,
    /// Units that reached Succeeded
    pub succeeded: usize,
    /// Units that reached Failed, in completion order
    pub failures: Vec<UnitFailure>,
}

impl GenerationReport {
    /// Whether every unit succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts the report into a step verdict.
    ///
    /// Failure names every failed unit individually - generator, verb, input
    /// file, and diagnostics - so failures across many parallel files remain
    /// attributable.
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        let total = self.succeeded + self.failures.len();
        let mut message = format!(
            "{} of {total} {} {} tasks failed:",
            self.failures.len(),
            self.generator,
            self.verb,
        );
        for failure in &self.failures {
            message.push_str(&format!(
                "\n  {}: {}",
                failure.input.display(),
                failure.error
            ));
        }
        Err(Error::GenericError(message))
    }
}

/// Fans generator invocations out over independent input files.
pub struct Orchestrator {
    invoker: Arc<Invoker>,
    generator: String,
    verb: String,
    rendered_args: Vec<String>,
    concurrency: usize,
}

impl Orchestrator {
    /// Creates an orchestrator for one resolved generator.
    ///
    /// `rendered_args` are the option tokens appended to every unit's
    /// command line. Worker count defaults to the number of CPUs.
    pub fn new(
        invoker: Invoker,
        generator: impl Into<String>,
        verb: impl Into<String>,
        rendered_args: Vec<String>,
    ) -> Self {
        Self {
            invoker: Arc::new(invoker),
            generator: generator.into(),
            verb: verb.into(),
            rendered_args,
            concurrency: num_cpus::get(),
        }
    }

    /// Overrides the worker pool size.
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    /// Runs one unit per input file, fail-at-end.
    ///
    /// Two units must never share an output directory; that is validated
    /// before anything is scheduled. Within a unit the wipe of its output
    /// directory completes before the generator may write into it.
    pub async fn run(&self, units: Vec<WorkUnit>) -> Result<GenerationReport> {
        let mut owned_dirs = HashSet::new();
        for unit in &units {
            if !owned_dirs.insert(unit.output_dir.clone()) {
                crate::bail!(
                    "output directory {} is assigned to more than one input file",
                    unit.output_dir.display()
                );
            }
        }

        log::info!(
            "{}: dispatching {} {} task(s) across {} worker(s)",
            self.generator,
            units.len(),
            self.verb,
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(units.len());
        for unit in units {
            let semaphore = Arc::clone(&semaphore);
            let invoker = Arc::clone(&self.invoker);
            let generator = self.generator.clone();
            let verb = self.verb.clone();
            let rendered_args = self.rendered_args.clone();
            let input = unit.input.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                run_unit(&invoker, &generator, &verb, &rendered_args, &unit).await
            });
            handles.push((input, handle));
        }

        let mut succeeded = 0;
        let mut failures = Vec::new();
        for (input, handle) in handles {
            match handle.await {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(error)) => failures.push(UnitFailure { input, error }),
                Err(e) => failures.push(UnitFailure {
                    input,
                    error: Error::GenericError(format!("generation task died: {e}")),
                }),
            }
        }

        Ok(GenerationReport {
            generator: self.generator.clone(),
            verb: self.verb.clone(),
            succeeded,
            failures,
        })
    }
}

async fn run_unit(
    invoker: &Invoker,
    generator: &str,
    verb: &str,
    rendered_args: &[String],
    unit: &WorkUnit,
) -> Result<()> {
    // Stale output from a previous build must be gone before the generator
    // is allowed to write a single file.
    fs::create_dir_all(&unit.output_dir, true).await?;

    let unlogged_args = vec![
        verb.to_string(),
        unit.input.display().to_string(),
        unit.output_dir.display().to_string(),
    ];
    let input_name = unit
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| unit.input.display().to_string());
    let context = format!("{generator} {verb} {input_name}");

    invoker
        .invoke(&unlogged_args, rendered_args, &context)
        .await?;

    if log::log_enabled!(log::Level::Debug) {
        let generated = walkdir::WalkDir::new(&unit.output_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        log::debug!(
            "{generator}: {generated} file(s) generated into {}",
            unit.output_dir.display()
        );
    }

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::harness::invoke::GeneratorRegistry;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Generator stub: fails for inputs named `a.json`, otherwise writes one
    /// output file.
    const STUB_GENERATOR: &str = r#"#!/bin/sh
case "$2" in
  *a.json) exit 4 ;;
esac
echo generated > "$3/out.txt"
"#;

    fn write_stub(dir: &Path) -> PathBuf {
        let path = dir.join("stub-gen");
        std::fs::write(&path, STUB_GENERATOR).expect("write stub");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn orchestrator_for(script: &Path) -> Orchestrator {
        let invoker =
            Invoker::resolve(script, &GeneratorRegistry::new(), None).expect("resolve");
        Orchestrator::new(invoker, "stub", "generate", vec!["--flag".to_string()])
    }

    #[tokio::test]
    async fn failing_unit_does_not_affect_sibling_output() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let script = write_stub(tmp.path());

        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.json");
        std::fs::write(&a, b"{}").expect("write");
        std::fs::write(&b, b"{}").expect("write");

        let units = vec![
            WorkUnit {
                input: a.clone(),
                output_dir: tmp.path().join("out/a"),
            },
            WorkUnit {
                input: b,
                output_dir: tmp.path().join("out/b"),
            },
        ];

        let report = orchestrator_for(&script)
            .run(units)
            .await
            .expect("fan-out completes");

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].input, a);
        assert!(tmp.path().join("out/b/out.txt").is_file());

        let err = report.into_result().expect_err("step must fail");
        let message = err.to_string();
        assert!(message.contains("a.json"));
        assert!(message.contains("stub"));
    }

    #[tokio::test]
    async fn stale_output_is_wiped_before_generation() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let script = write_stub(tmp.path());

        let input = tmp.path().join("svc.json");
        std::fs::write(&input, b"{}").expect("write");
        let out_dir = tmp.path().join("out/svc");
        std::fs::create_dir_all(&out_dir).expect("mkdir");
        std::fs::write(out_dir.join("stale.txt"), b"old").expect("write stale");

        let report = orchestrator_for(&script)
            .run(vec![WorkUnit {
                input,
                output_dir: out_dir.clone(),
            }])
            .await
            .expect("fan-out completes");

        assert!(report.is_success());
        assert!(!out_dir.join("stale.txt").exists());
        assert!(out_dir.join("out.txt").is_file());
    }

    #[tokio::test]
    async fn shared_output_directory_is_rejected_before_scheduling() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let script = write_stub(tmp.path());
        let shared = tmp.path().join("out/shared");

        let units = vec![
            WorkUnit {
                input: tmp.path().join("x.json"),
                output_dir: shared.clone(),
            },
            WorkUnit {
                input: tmp.path().join("y.json"),
                output_dir: shared,
            },
        ];

        let err = orchestrator_for(&script)
            .run(units)
            .await
            .expect_err("must reject");
        assert!(err.to_string().contains("more than one input file"));
    }

    #[tokio::test]
    async fn bounded_pool_completes_all_units() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let script = write_stub(tmp.path());

        let mut units = Vec::new();
        for i in 0..8 {
            let input = tmp.path().join(format!("svc{i}.json"));
            std::fs::write(&input, b"{}").expect("write");
            units.push(WorkUnit {
                input,
                output_dir: tmp.path().join(format!("out/svc{i}")),
            });
        }

        let report = orchestrator_for(&script)
            .concurrency(2)
            .run(units)
            .await
            .expect("fan-out completes");

        assert_eq!(report.succeeded, 8);
        assert!(report.is_success());
    }
}
