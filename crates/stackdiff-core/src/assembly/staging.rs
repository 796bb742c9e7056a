//! Per-run staging directory.
//!
//! Holds the normalized manifest plus links to every real template, laid out
//! as `<stub>/<template>.json` and `<stub>/<nested-dir>/<template>.json`.
//! The directory is removed when the `StagingArea` is dropped.

use crate::assembly::manifest::{AssemblyManifest, MANIFEST_FILE};
use crate::errors::{staging_io, Result, StackDiffError};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

const STAGING_PREFIX: &str = "assembly-reader";

/// True when `relative` names a location below the directory it is joined to
///
/// Absolute paths, drive prefixes and `..` components are rejected.
pub fn is_contained(relative: &str) -> bool {
    !relative.is_empty()
        && Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Ephemeral directory exclusively owned by one reconciliation
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Create a fresh, empty staging directory under the system temp dir
    ///
    /// # Errors
    ///
    /// `StagingIo` when the directory cannot be created.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(|e| staging_io("create_staging_dir", e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location of the normalized manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.path().join(MANIFEST_FILE)
    }

    /// Resolve a manifest-relative template path inside the staging area
    ///
    /// # Errors
    ///
    /// `ManifestInvalid` when `template_file` would leave the staging area.
    pub fn resolve(&self, template_file: &str) -> Result<PathBuf> {
        if !is_contained(template_file) {
            return Err(StackDiffError::ManifestInvalid {
                path: self.manifest_path().display().to_string(),
                reason: format!("template path {template_file} leaves the assembly directory"),
            });
        }
        Ok(self.path().join(template_file))
    }

    /// Write the normalized manifest
    ///
    /// # Errors
    ///
    /// `Serialization` or `StagingIo`.
    pub fn write_manifest(&self, manifest: &AssemblyManifest) -> Result<PathBuf> {
        let path = self.manifest_path();
        fs::write(&path, manifest.to_json_pretty()?)
            .map_err(|e| staging_io("write_manifest", e))?;
        Ok(path)
    }

    /// Link `source` into the staging area at `relative_target`
    ///
    /// Parent directories are created as needed. An entry that is already
    /// staged is left in place.
    ///
    /// # Errors
    ///
    /// * `ManifestInvalid` - `relative_target` is absolute or climbs out
    /// * `TemplateMissing` - `source` does not exist
    /// * `StagingIo` - the link (and the copy fallback) could not be created
    pub fn link_template(
        &self,
        stack_id: &str,
        source: &Path,
        relative_target: &str,
    ) -> Result<PathBuf> {
        let target = self.resolve(relative_target)?;
        if !source.is_file() {
            return Err(StackDiffError::TemplateMissing {
                stack_id: stack_id.to_string(),
                path: source.display().to_string(),
            });
        }
        if target.exists() {
            return Ok(target);
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| staging_io("create_staging_subdir", e))?;
        }
        let source = source
            .canonicalize()
            .map_err(|e| staging_io("resolve_template", e))?;
        link_or_copy(&source, &target).map_err(|e| staging_io("link_template", e))?;
        Ok(target)
    }
}

#[cfg(unix)]
fn link_or_copy(source: &Path, target: &Path) -> std::io::Result<()> {
    match std::os::unix::fs::symlink(source, target) {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::debug!(
                target_path = %target.display(),
                error = %err,
                "symlink unavailable, copying template"
            );
            fs::copy(source, target).map(|_| ())
        }
    }
}

#[cfg(not(unix))]
fn link_or_copy(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::copy(source, target).map(|_| ())
}
