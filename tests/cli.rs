//! Binary-level tests driving the harness the way a build would.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_describes_the_harness() {
    Command::cargo_bin("idlgen_harness")
        .expect("binary built")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--manifest"))
        .stdout(predicate::str::contains("generator"));
}

#[test]
fn missing_manifest_is_an_error() {
    let tmp = tempfile::tempdir().expect("tempdir");

    Command::cargo_bin("idlgen_harness")
        .expect("binary built")
        .arg("--manifest")
        .arg(tmp.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn zero_jobs_is_rejected() {
    Command::cargo_bin("idlgen_harness")
        .expect("binary built")
        .args(["--jobs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--jobs"));
}

#[cfg(unix)]
mod generation {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Stub generator: writes one file per invocation, fails for inputs
    /// named `bad.json`.
    const STUB: &str = r#"#!/bin/sh
case "$2" in
  *bad.json) echo "cannot process $2" >&2; exit 9 ;;
esac
echo "generated from $2" > "$3/hello.txt"
"#;

    fn write_stub(dir: &Path) -> PathBuf {
        let tools = dir.join("tools");
        std::fs::create_dir_all(&tools).expect("mkdir tools");
        let stub = tools.join("mygen");
        std::fs::write(&stub, STUB).expect("write stub");
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        stub
    }

    fn write_inputs(dir: &Path, names: &[&str]) {
        let ir = dir.join("ir");
        std::fs::create_dir_all(&ir).expect("mkdir ir");
        for name in names {
            std::fs::write(ir.join(name), b"{}").expect("write input");
        }
    }

    fn write_manifest(dir: &Path, stub: &Path, inputs: &[&str]) -> PathBuf {
        let input_list = inputs
            .iter()
            .map(|name| format!("\"ir/{name}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let manifest = dir.join("idlgen.toml");
        std::fs::write(
            &manifest,
            format!(
                r#"
[project]
name = "payments-api"
version = "1.4.0"

[[generator]]
name = "mygen"
command = "{}"
inputs = [{input_list}]
output = "generated"

[generator.options]
packageName = "payments-api"
verbose = true
"#,
                stub.display()
            ),
        )
        .expect("write manifest");
        manifest
    }

    #[test]
    fn generates_one_output_directory_per_input() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let stub = write_stub(tmp.path());
        write_inputs(tmp.path(), &["payments.json", "accounts.json"]);
        let manifest = write_manifest(tmp.path(), &stub, &["payments.json", "accounts.json"]);

        Command::cargo_bin("idlgen_harness")
            .expect("binary built")
            .arg("--manifest")
            .arg(&manifest)
            .assert()
            .success();

        assert!(tmp.path().join("generated/payments/hello.txt").is_file());
        assert!(tmp.path().join("generated/accounts/hello.txt").is_file());
    }

    #[test]
    fn failing_input_fails_the_step_but_siblings_still_generate() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let stub = write_stub(tmp.path());
        write_inputs(tmp.path(), &["good.json", "bad.json"]);
        let manifest = write_manifest(tmp.path(), &stub, &["good.json", "bad.json"]);

        Command::cargo_bin("idlgen_harness")
            .expect("binary built")
            .arg("--manifest")
            .arg(&manifest)
            .assert()
            .failure();

        assert!(tmp.path().join("generated/good/hello.txt").is_file());
        assert!(!tmp.path().join("generated/bad/hello.txt").exists());
    }

    #[test]
    fn unknown_generator_name_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let stub = write_stub(tmp.path());
        write_inputs(tmp.path(), &["payments.json"]);
        let manifest = write_manifest(tmp.path(), &stub, &["payments.json"]);

        Command::cargo_bin("idlgen_harness")
            .expect("binary built")
            .arg("--manifest")
            .arg(&manifest)
            .args(["--only", "nonexistent"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nonexistent"));
    }
}
