//! Required-default option values.
//!
//! Every generator invocation is guaranteed a `productVersion` option.
//! Computing it can be expensive (it may shell out to version control), so
//! the value is produced lazily by the renderer only when the manifest does
//! not supply one.

use crate::harness::RequiredDefault;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Builds the required defaults shared by every generator in a build.
///
/// `productVersion` resolves, in order: the manifest's project version, the
/// version-control description of the project directory, `"0.0.0"`.
pub fn required_defaults(
    manifest_version: Option<String>,
    project_dir: &Path,
) -> Vec<RequiredDefault> {
    let project_dir: PathBuf = project_dir.to_path_buf();
    vec![RequiredDefault::new("productVersion", move || {
        if let Some(version) = &manifest_version {
            return version.clone();
        }
        match describe_working_tree(&project_dir) {
            Ok(version) => version,
            Err(e) => {
                log::debug!("falling back to default productVersion: {e:#}");
                "0.0.0".to_string()
            }
        }
    })]
}

/// Asks git to describe the working tree.
fn describe_working_tree(dir: &Path) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always"])
        .current_dir(dir)
        .output()
        .context("running git describe")?;

    if !output.status.success() {
        anyhow::bail!(
            "git describe exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let described = String::from_utf8(output.stdout).context("git describe output not UTF-8")?;
    let described = described.trim();
    if described.is_empty() {
        anyhow::bail!("git describe produced no output");
    }
    Ok(described.to_string())
}
