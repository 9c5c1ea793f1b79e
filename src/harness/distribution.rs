//! Generator distribution extraction.
//!
//! A distribution is a gzip-compressed tar archive containing exactly one
//! top-level directory, under which a `bin/<name>` entry point and supporting
//! files live. Extraction strips the top-level directory, refuses entries
//! that would land outside the destination, and verifies the entry point
//! exists before handing the distribution to the invocation layer.
//!
//! The destination directory is exclusively owned by the extraction: it is
//! wiped and recreated on every call, and is read-only for everyone else once
//! extraction returns.

use crate::harness::error::{Error, ErrorExt, Result};
use flate2::read::GzDecoder;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

/// A distribution unpacked onto disk, ready to invoke.
#[derive(Debug, Clone)]
pub struct ExtractedDistribution {
    root: PathBuf,
    entry_point: PathBuf,
}

impl ExtractedDistribution {
    /// Directory the distribution was extracted into (canonicalized).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the `bin/<name>` executable.
    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }
}

/// Extracts a distribution archive, offloading the blocking tar walk to the
/// blocking thread pool.
///
/// See [`extract_sync`] for the extraction contract.
pub async fn extract(
    archive: &Path,
    destination: &Path,
    executable: &str,
) -> Result<ExtractedDistribution> {
    let archive = archive.to_path_buf();
    let destination = destination.to_path_buf();
    let executable = executable.to_string();

    tokio::task::spawn_blocking(move || extract_sync(&archive, &destination, &executable))
        .await
        .map_err(|e| Error::GenericError(format!("extraction task panicked: {e}")))?
}

/// Extracts `archive` into `destination`, returning the location of the
/// `bin/<executable>` entry point.
///
/// The destination is recreated fresh. Each archive entry is validated before
/// any bytes are written:
///
/// - non-regular entries are skipped (directories are implied by file paths)
/// - absolute paths and paths with `..` components are rejected
/// - all entries must share a single top-level directory, which is stripped
/// - the resolved output path must stay under the canonicalized destination
///
/// Tar mode bits marking an entry executable are propagated on Unix. After
/// the walk, `bin/<executable>` must exist on disk; a cleanly parsed archive
/// with a different layout is still an error.
pub fn extract_sync(
    archive: &Path,
    destination: &Path,
    executable: &str,
) -> Result<ExtractedDistribution> {
    match std::fs::remove_dir_all(destination) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::fs::create_dir_all(destination).fs_context("creating extraction root", destination)?;
    let dest_root = destination
        .canonicalize()
        .fs_context("canonicalizing extraction root", destination)?;

    let file = File::open(archive).fs_context("opening distribution archive", archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));

    let mut top_level: Option<OsString> = None;
    let entries = tar
        .entries()
        .map_err(|e| Error::Extraction(format!("unreadable archive {}: {e}", archive.display())))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| Error::Extraction(format!("corrupt entry in {}: {e}", archive.display())))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let entry_path = entry
            .path()
            .map_err(|e| Error::Extraction(format!("undecodable entry path: {e}")))?
            .into_owned();
        let relative = strip_top_level(&entry_path, &mut top_level)?;
        let out_path = dest_root.join(&relative);

        // Traversal defense: `..` components were rejected above, so a
        // component-wise prefix check against the canonicalized root is exact
        // (`/out` can never match `/outside`).
        if !out_path.starts_with(&dest_root) {
            return Err(Error::Extraction(format!(
                "entry {} escapes the destination root",
                entry_path.display()
            )));
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).fs_context("creating entry parent", parent)?;
        }

        let mode = entry.header().mode().map_err(|e| {
            Error::Extraction(format!("bad mode bits for {}: {e}", entry_path.display()))
        })?;

        let mut out_file = File::create(&out_path).fs_context("creating entry file", &out_path)?;
        std::io::copy(&mut entry, &mut out_file).fs_context("writing entry bytes", &out_path)?;

        if mode & 0o111 != 0 {
            make_executable(&out_path)?;
        }
    }

    let entry_point = dest_root.join("bin").join(executable);
    if !entry_point.is_file() {
        return Err(Error::Extraction(format!(
            "expected executable bin/{executable} not found under {}",
            dest_root.display()
        )));
    }

    log::debug!(
        "extracted {} into {}",
        archive.display(),
        dest_root.display()
    );

    Ok(ExtractedDistribution {
        root: dest_root,
        entry_point,
    })
}

/// Validates an entry path and strips the distribution's single top-level
/// directory, recording it in `top_level` on first sight.
fn strip_top_level(entry_path: &Path, top_level: &mut Option<OsString>) -> Result<PathBuf> {
    let mut components = entry_path.components();

    let root = match components.next() {
        Some(Component::Normal(name)) => name.to_os_string(),
        Some(Component::RootDir) | Some(Component::Prefix(_)) => {
            return Err(Error::Extraction(format!(
                "absolute entry path {} not permitted",
                entry_path.display()
            )));
        }
        _ => {
            return Err(Error::Extraction(format!(
                "malformed entry path {}",
                entry_path.display()
            )));
        }
    };

    match top_level {
        Some(existing) if *existing != root => {
            return Err(Error::Extraction(format!(
                "archive has more than one top-level directory: {:?} and {:?}",
                existing, root
            )));
        }
        Some(_) => {}
        None => *top_level = Some(root),
    }

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(name) => relative.push(name),
            Component::CurDir => {}
            _ => {
                return Err(Error::Extraction(format!(
                    "entry {} escapes the destination root",
                    entry_path.display()
                )));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(Error::Extraction(format!(
            "entry {} has no path under the distribution root",
            entry_path.display()
        )));
    }

    Ok(relative)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .fs_context("marking entry executable", path)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
