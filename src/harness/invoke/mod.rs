//! Dual-mode generator invocation.
//!
//! An [`Invoker`] binds an entry point to an execution strategy, computed
//! once and reused across every invocation against that entry point within a
//! build. Managed-runtime generators with a registered in-process entry run
//! inside the host runtime, amortizing startup cost across the hundreds of
//! invocations a large build produces; everything else is spawned as a
//! subprocess.
//!
//! Callers must not be able to observe which strategy was chosen: both modes
//! report failures through the same [`InvocationFailure`] shape, carrying the
//! command line, context label, status, and whatever output was captured.

mod external;
mod registry;

pub use registry::{request_exit, ExitRequest, GeneratorEntry, GeneratorRegistry};

use crate::harness::error::{Error, InvocationFailure, Result};
use crate::harness::launcher;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Execution strategy for one entry point.
enum Strategy {
    /// Run the registered entry function inside the host runtime.
    InProcess { entry: GeneratorEntry },
    /// Spawn the entry point as a subprocess.
    External,
}

/// A resolved generator entry point, ready to invoke repeatedly.
pub struct Invoker {
    entry_point: PathBuf,
    display_name: String,
    strategy: Strategy,
    timeout: Option<Duration>,
}

impl Invoker {
    /// Resolves the execution strategy for `entry_point`.
    ///
    /// In-process mode is selected when the entry point is a recognized
    /// launcher and `registry` holds an entry function for its entry symbol.
    /// Anything else, including an unrecognized launcher, falls back to
    /// external-process execution.
    ///
    /// `timeout` bounds each external invocation; in-process calls cannot be
    /// cancelled and are not subject to it.
    pub fn resolve(
        entry_point: &Path,
        registry: &GeneratorRegistry,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let display_name = entry_point
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry_point.display().to_string());

        let strategy = match launcher::analyze(entry_point)? {
            Some(info) => match registry.lookup(&info.entry_symbol) {
                Some(entry) => {
                    log::debug!("{display_name}: running {} in-process", info.entry_symbol);
                    Strategy::InProcess { entry }
                }
                None => {
                    log::debug!(
                        "{display_name}: no in-process generator registered for {}, \
                         spawning subprocess",
                        info.entry_symbol
                    );
                    Strategy::External
                }
            },
            None => Strategy::External,
        };

        Ok(Self {
            entry_point: entry_point.to_path_buf(),
            display_name,
            strategy,
            timeout,
        })
    }

    /// Entry point this invoker executes.
    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    /// Whether invocations run inside the host runtime.
    pub fn is_in_process(&self) -> bool {
        matches!(self.strategy, Strategy::InProcess { .. })
    }

    /// Invokes the generator with `unlogged_args` followed by `logged_args`.
    ///
    /// `unlogged_args` carry high-cardinality input/output paths and appear
    /// only at debug level; `logged_args` carry user-visible flags and are
    /// logged per invocation. Both are passed to the generator in order.
    pub async fn invoke(
        &self,
        unlogged_args: &[String],
        logged_args: &[String],
        context: &str,
    ) -> Result<()> {
        let mut combined = Vec::with_capacity(unlogged_args.len() + logged_args.len());
        combined.extend_from_slice(unlogged_args);
        combined.extend_from_slice(logged_args);

        log::info!("{context}: {} {}", self.display_name, logged_args.join(" "));
        log::debug!(
            "full command: {} {}",
            self.entry_point.display(),
            combined.join(" ")
        );

        match &self.strategy {
            Strategy::InProcess { entry, .. } => {
                let entry = *entry;
                let args = combined.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || registry::run_entry(entry, &args))
                        .await
                        .map_err(|e| {
                            Error::GenericError(format!("in-process generator task died: {e}"))
                        })?;
                match outcome {
                    Ok(0) => Ok(()),
                    Ok(status) => Err(self.failure(combined, context, Some(status), String::new())),
                    Err(fault) => Err(self.failure(combined, context, None, fault)),
                }
            }
            Strategy::External => {
                let exit = external::run(&self.entry_point, &combined, self.timeout).await?;
                if exit.status.success() {
                    Ok(())
                } else {
                    Err(self.failure(combined, context, exit.status.code(), exit.output))
                }
            }
        }
    }

    fn failure(
        &self,
        args: Vec<String>,
        context: &str,
        status: Option<i32>,
        output: String,
    ) -> Error {
        Error::Invocation(InvocationFailure {
            program: self.display_name.clone(),
            args,
            context: context.to_string(),
            status,
            output,
        })
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("entry_point", &self.entry_point)
            .field("in_process", &self.is_in_process())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let bin = dir.join("bin");
        std::fs::create_dir_all(&bin).expect("mkdir bin");
        let path = bin.join(name);
        std::fs::write(&path, body).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn write_launcher(dir: &Path, name: &str, entry_symbol: &str) -> PathBuf {
        let lib = dir.join("lib");
        std::fs::create_dir_all(&lib).expect("mkdir lib");
        std::fs::write(lib.join("generator.jar"), b"jar").expect("write jar");
        write_script(
            dir,
            name,
            &format!(
                "#!/bin/sh\nCLASSPATH=$APP_HOME/lib/generator.jar\n\
                 exec \"$JAVACMD\" -classpath \"$CLASSPATH\" {entry_symbol} \"$@\"\n"
            ),
        )
    }

    fn exit_three_entry(_args: &[String]) -> i32 {
        3
    }

    fn succeed_entry(_args: &[String]) -> i32 {
        0
    }

    fn deep_exit_entry(_args: &[String]) -> i32 {
        request_exit(7)
    }

    fn into_invocation_failure(err: Error) -> InvocationFailure {
        match err {
            Error::Invocation(failure) => failure,
            other => panic!("expected invocation failure, got {other}"),
        }
    }

    #[tokio::test]
    async fn external_nonzero_exit_reports_status_and_output() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let script = write_script(
            tmp.path(),
            "gen",
            "#!/bin/sh\necho to stdout\necho to stderr >&2\nexit 2\n",
        );

        let invoker =
            Invoker::resolve(&script, &GeneratorRegistry::new(), None).expect("resolve");
        let err = invoker
            .invoke(
                &["generate".to_string(), "in.json".to_string()],
                &["--verbose".to_string()],
                "generate test",
            )
            .await
            .expect_err("must fail");

        let failure = into_invocation_failure(err);
        assert_eq!(failure.status, Some(2));
        assert!(failure.output.contains("to stdout"));
        assert!(failure.output.contains("to stderr"));
        assert_eq!(failure.args, vec!["generate", "in.json", "--verbose"]);
    }

    #[tokio::test]
    async fn external_success_is_silent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let script = write_script(tmp.path(), "gen", "#!/bin/sh\nexit 0\n");

        let invoker =
            Invoker::resolve(&script, &GeneratorRegistry::new(), None).expect("resolve");
        invoker.invoke(&[], &[], "generate test").await.expect("ok");
    }

    #[tokio::test]
    async fn both_modes_report_equivalent_failures() {
        let args_unlogged = vec!["generate".to_string(), "svc.json".to_string()];
        let args_logged = vec!["--packageName=com.example".to_string()];

        // External: a script that exits 3.
        let ext_tmp = tempfile::tempdir().expect("tempdir");
        let script = write_script(ext_tmp.path(), "mygen", "#!/bin/sh\nexit 3\n");
        let external =
            Invoker::resolve(&script, &GeneratorRegistry::new(), None).expect("resolve");
        assert!(!external.is_in_process());

        // In-process: a launcher whose entry symbol is registered to exit 3.
        let in_tmp = tempfile::tempdir().expect("tempdir");
        let launcher = write_launcher(in_tmp.path(), "mygen", "com.example.Exit3");
        let mut registry = GeneratorRegistry::new();
        registry.register("com.example.Exit3", exit_three_entry);
        let in_process = Invoker::resolve(&launcher, &registry, None).expect("resolve");
        assert!(in_process.is_in_process());

        let ext_failure = into_invocation_failure(
            external
                .invoke(&args_unlogged, &args_logged, "generate svc")
                .await
                .expect_err("external must fail"),
        );
        let in_failure = into_invocation_failure(
            in_process
                .invoke(&args_unlogged, &args_logged, "generate svc")
                .await
                .expect_err("in-process must fail"),
        );

        assert_eq!(ext_failure.status, Some(3));
        assert_eq!(in_failure.status, Some(3));
        assert_eq!(ext_failure.program, in_failure.program);
        assert_eq!(ext_failure.args, in_failure.args);
        assert_eq!(ext_failure.context, in_failure.context);
    }

    #[tokio::test]
    async fn in_process_success_and_deep_exit_signal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let launcher = write_launcher(tmp.path(), "gen", "com.example.Main");
        let mut registry = GeneratorRegistry::new();
        registry.register("com.example.Main", succeed_entry);

        let invoker = Invoker::resolve(&launcher, &registry, None).expect("resolve");
        invoker.invoke(&[], &[], "generate").await.expect("ok");

        let mut registry = GeneratorRegistry::new();
        registry.register("com.example.Main", deep_exit_entry);
        let invoker = Invoker::resolve(&launcher, &registry, None).expect("resolve");
        let failure = into_invocation_failure(
            invoker
                .invoke(&[], &[], "generate")
                .await
                .expect_err("must fail"),
        );
        assert_eq!(failure.status, Some(7));
    }

    #[tokio::test]
    async fn unregistered_launcher_falls_back_to_subprocess() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let launcher = write_launcher(tmp.path(), "gen", "com.example.Unregistered");

        let invoker =
            Invoker::resolve(&launcher, &GeneratorRegistry::new(), None).expect("resolve");

        assert!(!invoker.is_in_process());
    }

    #[tokio::test]
    async fn hung_subprocess_is_killed_after_timeout() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let script = write_script(tmp.path(), "gen", "#!/bin/sh\nsleep 30\n");

        let invoker = Invoker::resolve(
            &script,
            &GeneratorRegistry::new(),
            Some(Duration::from_millis(100)),
        )
        .expect("resolve");

        let err = invoker
            .invoke(&[], &[], "generate")
            .await
            .expect_err("must time out");
        assert!(err.to_string().contains("timed out"));
    }
}
