//! Template and stack discovery in a source assembly directory.
//!
//! Two sources are combined:
//! - the stack artifacts declared by `manifest.json`, followed recursively
//!   into nested (stage) assemblies
//! - template files found on disk, at the root (`*.template.json`) and one
//!   level down (`*/*.template.json`)

use crate::assembly::manifest::{
    Environment, MANIFEST_FILE, NESTED_ASSEMBLY_ARTIFACT_TYPE, STACK_ARTIFACT_TYPE,
    TEMPLATE_SUFFIX,
};
use crate::assembly::staging::is_contained;
use crate::errors::{staging_io, Result, StackDiffError};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A stack declared by a source manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredStack {
    pub id: String,
    pub environment: Environment,
    /// Template path relative to the assembly root
    pub template_file: String,
}

/// Read and parse `<dir>/manifest.json`
///
/// # Errors
///
/// * `ManifestMissing` - the file does not exist or cannot be read
/// * `ManifestInvalid` - the file is not a JSON object
pub fn read_source_manifest(dir: &Path) -> Result<Value> {
    let path = dir.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&path).map_err(|_| StackDiffError::ManifestMissing {
        path: path.display().to_string(),
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| StackDiffError::ManifestInvalid {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(StackDiffError::ManifestInvalid {
            path: path.display().to_string(),
            reason: "manifest root must be an object".to_string(),
        });
    }
    Ok(value)
}

/// Collect every stack declared by the manifest at `root`, including stacks
/// of nested assemblies.
///
/// Nested template paths are rewritten relative to `root`.
///
/// # Errors
///
/// Fails with a reconciliation error when any manifest on the way is
/// missing or malformed.
pub fn collect_stacks(root: &Path, manifest: &Value) -> Result<Vec<DiscoveredStack>> {
    let mut stacks = Vec::new();
    let mut visited = BTreeSet::new();
    visited.insert(String::new());
    collect_from(root, "", manifest, &mut stacks, &mut visited)?;
    Ok(stacks)
}

fn collect_from(
    root: &Path,
    rel_dir: &str,
    manifest: &Value,
    out: &mut Vec<DiscoveredStack>,
    visited: &mut BTreeSet<String>,
) -> Result<()> {
    let manifest_path = root.join(rel_dir).join(MANIFEST_FILE);
    let invalid = |reason: String| StackDiffError::ManifestInvalid {
        path: manifest_path.display().to_string(),
        reason,
    };

    let Some(artifacts) = manifest.get("artifacts") else {
        return Ok(());
    };
    let artifacts = artifacts
        .as_object()
        .ok_or_else(|| invalid("`artifacts` must be an object".to_string()))?;

    for (id, artifact) in artifacts {
        match artifact.get("type").and_then(Value::as_str) {
            Some(STACK_ARTIFACT_TYPE) => {
                let env_uri = artifact
                    .get("environment")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid(format!("stack {id} has no environment")))?;
                let environment = Environment::parse(env_uri)
                    .ok_or_else(|| invalid(format!("stack {id} has malformed environment {env_uri}")))?;
                let template = artifact
                    .pointer("/properties/templateFile")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid(format!("stack {id} has no templateFile")))?;
                if !is_contained(template) {
                    return Err(invalid(format!(
                        "stack {id} templateFile {template} leaves the assembly directory"
                    )));
                }
                out.push(DiscoveredStack {
                    id: id.clone(),
                    environment,
                    template_file: join_relative(rel_dir, template),
                });
            }
            Some(NESTED_ASSEMBLY_ARTIFACT_TYPE) => {
                let dir_name = artifact
                    .pointer("/properties/directoryName")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid(format!("assembly {id} has no directoryName")))?;
                if !is_contained(dir_name) {
                    return Err(invalid(format!(
                        "assembly {id} directoryName {dir_name} leaves the assembly directory"
                    )));
                }
                let nested_rel = join_relative(rel_dir, dir_name);
                if !visited.insert(nested_rel.clone()) {
                    continue;
                }
                let nested = read_source_manifest(&root.join(&nested_rel))?;
                collect_from(root, &nested_rel, &nested, out, visited)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn join_relative(rel_dir: &str, file: &str) -> String {
    if rel_dir.is_empty() {
        file.to_string()
    } else {
        format!("{rel_dir}/{file}")
    }
}

fn is_template(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(TEMPLATE_SUFFIX))
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| staging_io("read_assembly_dir", e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

fn templates_in(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && is_template(p))
        .collect())
}

/// Templates directly under the assembly root (`*.template.json`)
///
/// # Errors
///
/// `StagingIo` when the directory cannot be listed.
pub fn top_level_templates(root: &Path) -> Result<Vec<PathBuf>> {
    templates_in(root)
}

/// Templates one level down (`*/*.template.json`)
///
/// # Errors
///
/// `StagingIo` when a directory cannot be listed.
pub fn nested_templates(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for dir in sorted_entries(root)?.into_iter().filter(|p| p.is_dir()) {
        out.extend(templates_in(&dir)?);
    }
    Ok(out)
}

/// Templates of the nested-stack group belonging to `stack_id`
/// (`assembly-<stack_id>*/*.template.json`)
///
/// # Errors
///
/// `StagingIo` when a directory cannot be listed.
pub fn nested_group_templates(root: &Path, stack_id: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("assembly-{stack_id}");
    let mut out = Vec::new();
    for dir in sorted_entries(root)?.into_iter().filter(|p| p.is_dir()) {
        let matches = dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(&prefix))
            .unwrap_or(false);
        if matches {
            out.extend(templates_in(&dir)?);
        }
    }
    Ok(out)
}

/// Stack id derived from a template file name (`Foo.template.json` -> `Foo`)
pub fn stack_id_from_template(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(TEMPLATE_SUFFIX))
        .map(str::to_string)
}

/// Path of a one-level-down template relative to the root (`<dir>/<file>`)
pub fn relative_nested_path(path: &Path) -> Option<String> {
    let file = path.file_name()?.to_str()?;
    let dir = path.parent()?.file_name()?.to_str()?;
    Some(format!("{dir}/{file}"))
}
