//! Assembly reader: reconciles one source assembly into a staging area.

use crate::assembly::discovery::{
    collect_stacks, nested_group_templates, nested_templates, read_source_manifest,
    relative_nested_path, stack_id_from_template, top_level_templates,
};
use crate::assembly::manifest::{ArtifactEntry, AssemblyManifest, MANIFEST_FILE};
use crate::assembly::staging::StagingArea;
use crate::errors::{Result, StackDiffError};
use crate::{log_op_end, log_op_error, log_op_start};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Reconcile the assembly at `assembly_path`.
///
/// Convenience for [`AssemblyReader::from_path`].
///
/// # Errors
///
/// Any reconciliation error; see [`AssemblyReader::load`].
pub fn reconcile(assembly_path: impl Into<PathBuf>) -> Result<AssemblyReader> {
    AssemblyReader::from_path(assembly_path)
}

#[derive(Debug)]
struct LoadedAssembly {
    staging: StagingArea,
    manifest: AssemblyManifest,
}

/// Handle on a reconciled assembly.
///
/// All lookups read through the staging copy, never the source directory.
#[derive(Debug)]
pub struct AssemblyReader {
    assembly_path: PathBuf,
    loaded: Option<LoadedAssembly>,
}

impl AssemblyReader {
    /// Create an unloaded reader for `assembly_path`
    pub fn new(assembly_path: impl Into<PathBuf>) -> Self {
        Self {
            assembly_path: assembly_path.into(),
            loaded: None,
        }
    }

    /// Create a reader and load it immediately
    ///
    /// # Errors
    ///
    /// See [`AssemblyReader::load`].
    pub fn from_path(assembly_path: impl Into<PathBuf>) -> Result<Self> {
        let mut reader = Self::new(assembly_path);
        reader.load()?;
        Ok(reader)
    }

    pub fn assembly_path(&self) -> &Path {
        &self.assembly_path
    }

    /// Reconcile the source assembly into a fresh staging area.
    ///
    /// Writes the normalized manifest, links every discovered template and
    /// then re-reads the manifest from the staging copy.
    ///
    /// # Errors
    ///
    /// * `AlreadyLoaded` - this reader already owns a staging area
    /// * `ManifestMissing` / `ManifestInvalid` - unusable source manifest
    /// * `TemplateMissing` - a referenced template is not on disk
    /// * `StagingIo` - the staging area could not be populated
    pub fn load(&mut self) -> Result<()> {
        if self.loaded.is_some() {
            return Err(StackDiffError::AlreadyLoaded {
                assembly: self.assembly_path.display().to_string(),
            });
        }

        let start = Instant::now();
        log_op_start!("reconcile", assembly = %self.assembly_path.display());

        match self.stage() {
            Ok(loaded) => {
                log_op_end!(
                    "reconcile",
                    duration_ms = start.elapsed().as_millis() as u64,
                    assembly = %self.assembly_path.display(),
                    stack_count = loaded.manifest.artifacts.len() as u64,
                    staging_dir = %loaded.staging.path().display()
                );
                self.loaded = Some(loaded);
                Ok(())
            }
            Err(err) => {
                log_op_error!(
                    "reconcile",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    assembly = %self.assembly_path.display()
                );
                Err(err)
            }
        }
    }

    fn stage(&self) -> Result<LoadedAssembly> {
        let manifest = self.generate_manifest()?;
        let staging = StagingArea::create()?;
        staging.write_manifest(&manifest)?;
        self.link_templates(&staging, &manifest)?;

        // Everything downstream reads the staged copy.
        let manifest = AssemblyManifest::read(&staging.manifest_path())?;
        Ok(LoadedAssembly { staging, manifest })
    }

    /// Build the normalized manifest from the source directory
    ///
    /// # Errors
    ///
    /// Reconciliation errors from manifest parsing or directory listing.
    pub fn generate_manifest(&self) -> Result<AssemblyManifest> {
        let root = &self.assembly_path;
        let source = read_source_manifest(root)?;
        let version = source
            .get("version")
            .cloned()
            .ok_or_else(|| StackDiffError::ManifestInvalid {
                path: root.join(MANIFEST_FILE).display().to_string(),
                reason: "missing `version`".to_string(),
            })?;

        let mut artifacts = BTreeMap::new();
        for stack in collect_stacks(root, &source)? {
            artifacts.insert(
                stack.id.clone(),
                ArtifactEntry::stack(&stack.id, &stack.environment, stack.template_file.clone()),
            );

            let group = nested_group_templates(root, &stack.id)?;
            if group.len() > 1 {
                for template in &group {
                    let (Some(nested_id), Some(rel)) =
                        (stack_id_from_template(template), relative_nested_path(template))
                    else {
                        continue;
                    };
                    tracing::debug!(
                        parent = %stack.id,
                        stack_id = %nested_id,
                        template = %rel,
                        "registering nested stack"
                    );
                    artifacts.insert(
                        nested_id.clone(),
                        ArtifactEntry::stack(&nested_id, &stack.environment, rel),
                    );
                }
            }
        }

        Ok(AssemblyManifest { version, artifacts })
    }

    fn link_templates(&self, staging: &StagingArea, manifest: &AssemblyManifest) -> Result<()> {
        let root = &self.assembly_path;

        for template in top_level_templates(root)? {
            if let Some(name) = template.file_name().and_then(|n| n.to_str()) {
                let id = stack_id_from_template(&template).unwrap_or_default();
                staging.link_template(&id, &template, name)?;
            }
        }

        for template in nested_templates(root)? {
            if let Some(rel) = relative_nested_path(&template) {
                let id = stack_id_from_template(&template).unwrap_or_default();
                staging.link_template(&id, &template, &rel)?;
            }
        }

        // Templates referenced deeper than the two-level layout, and
        // references to files that do not exist at all.
        for (id, entry) in &manifest.artifacts {
            staging.link_template(id, &root.join(entry.template_file()), entry.template_file())?;
        }
        Ok(())
    }

    fn loaded(&self) -> Result<&LoadedAssembly> {
        self.loaded.as_ref().ok_or_else(|| StackDiffError::NotLoaded {
            assembly: self.assembly_path.display().to_string(),
        })
    }

    /// Directory holding the staged manifest and templates
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`AssemblyReader::load`].
    pub fn staging_dir(&self) -> Result<&Path> {
        Ok(self.loaded()?.staging.path())
    }

    /// The normalized manifest as read back from staging
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`AssemblyReader::load`].
    pub fn manifest(&self) -> Result<&AssemblyManifest> {
        Ok(&self.loaded()?.manifest)
    }

    /// All stack ids, in manifest iteration order
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`AssemblyReader::load`].
    pub fn stack_ids(&self) -> Result<Vec<String>> {
        Ok(self.manifest()?.stack_ids())
    }

    /// Stack entry by id
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`AssemblyReader::load`].
    pub fn stack(&self, stack_id: &str) -> Result<Option<&ArtifactEntry>> {
        Ok(self.manifest()?.stack(stack_id))
    }

    /// Staged template path for a stack id
    ///
    /// # Errors
    ///
    /// * `NotLoaded` - before [`AssemblyReader::load`]
    /// * `ManifestInvalid` - the staged entry points outside the staging area
    pub fn template_path(&self, stack_id: &str) -> Result<Option<PathBuf>> {
        let loaded = self.loaded()?;
        loaded
            .manifest
            .stack(stack_id)
            .map(|entry| loaded.staging.resolve(entry.template_file()))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_fail_before_load() {
        let reader = AssemblyReader::new("/nonexistent/cdk.out");
        assert!(matches!(
            reader.manifest(),
            Err(StackDiffError::NotLoaded { .. })
        ));
        assert!(matches!(
            reader.template_path("Root"),
            Err(StackDiffError::NotLoaded { .. })
        ));
    }

    #[test]
    fn test_load_missing_directory_is_manifest_missing() {
        let mut reader = AssemblyReader::new("/nonexistent/cdk.out");
        let err = reader.load().unwrap_err();
        assert!(matches!(err, StackDiffError::ManifestMissing { .. }));
    }
}
