//! Diff engine seam and the built-in local template differ.
//!
//! The engine is handed the head assembly and a request naming exactly one
//! stack plus the base template to compare against. It returns a map from
//! stack id to [`TemplateDiff`]; a missing entry means "no diff available".

use crate::assembly::AssemblyReader;
use crate::diff::model::{FlaggedChanges, PropertyDifference, ResourceDifference, ResourceImpact, TemplateDiff};
use crate::errors::{Result, StackDiffError};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Where the base side of a diff comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffMethod {
    /// Compare against a template file on disk
    LocalFile(PathBuf),
}

/// One diff request: a single stack, selected by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    pub method: DiffMethod,
    pub stack_selector: String,
}

/// Structural template diff provider
pub trait DiffEngine {
    /// Diff the selected head stack against the request's base source
    ///
    /// # Errors
    ///
    /// Engine specific; an absent stack is reported through an empty map,
    /// not an error.
    fn diff(
        &self,
        head: &AssemblyReader,
        request: &DiffRequest,
    ) -> Result<BTreeMap<String, TemplateDiff>>;
}

/// Diff engine comparing JSON templates from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTemplateDiffer;

impl LocalTemplateDiffer {
    pub fn new() -> Self {
        Self
    }
}

impl DiffEngine for LocalTemplateDiffer {
    fn diff(
        &self,
        head: &AssemblyReader,
        request: &DiffRequest,
    ) -> Result<BTreeMap<String, TemplateDiff>> {
        let mut out = BTreeMap::new();
        let Some(head_path) = head.template_path(&request.stack_selector)? else {
            return Ok(out);
        };
        let DiffMethod::LocalFile(base_path) = &request.method;

        let old = read_template(base_path)?;
        let new = read_template(&head_path)?;
        out.insert(request.stack_selector.clone(), diff_templates(&old, &new));
        Ok(out)
    }
}

/// Read and parse a JSON template
///
/// # Errors
///
/// `TemplateInvalid` when the file is unreadable or not JSON.
pub fn read_template(path: &Path) -> Result<Value> {
    let invalid = |reason: String| StackDiffError::TemplateInvalid {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))
}

const PROPERTIES: &str = "Properties";
const TYPE: &str = "Type";

fn section<'a>(template: &'a Value, name: &str) -> Option<&'a Map<String, Value>> {
    template.get(name).and_then(Value::as_object)
}

fn union_keys<'a>(
    old: Option<&'a Map<String, Value>>,
    new: Option<&'a Map<String, Value>>,
) -> BTreeSet<&'a str> {
    old.into_iter()
        .chain(new)
        .flat_map(|m| m.keys().map(String::as_str))
        .collect()
}

/// Differing entries of two JSON objects, optionally skipping some keys
fn diff_entries(
    old: Option<&Map<String, Value>>,
    new: Option<&Map<String, Value>>,
    skip: &[&str],
) -> BTreeMap<String, PropertyDifference> {
    union_keys(old, new)
        .into_iter()
        .filter(|key| !skip.contains(key))
        .filter_map(|key| {
            let diff = PropertyDifference::new(
                old.and_then(|m| m.get(key)).cloned(),
                new.and_then(|m| m.get(key)).cloned(),
            );
            diff.is_different().then(|| (key.to_string(), diff))
        })
        .collect()
}

fn removal_impact(resource: &Value) -> ResourceImpact {
    match resource.get("DeletionPolicy").and_then(Value::as_str) {
        Some("Retain") | Some("RetainExceptOnCreate") => ResourceImpact::WillOrphan,
        _ => ResourceImpact::WillDestroy,
    }
}

fn diff_resource(old: &Value, new: &Value) -> Option<ResourceDifference> {
    if old == new {
        return None;
    }
    let property_updates = diff_entries(
        old.get(PROPERTIES).and_then(Value::as_object),
        new.get(PROPERTIES).and_then(Value::as_object),
        &[],
    );
    let other_changes = diff_entries(old.as_object(), new.as_object(), &[PROPERTIES]);
    let impact = if other_changes.contains_key(TYPE) {
        ResourceImpact::WillReplace
    } else {
        ResourceImpact::WillUpdate
    };
    Some(ResourceDifference::update(
        old.clone(),
        new.clone(),
        property_updates,
        other_changes,
        Some(impact),
    ))
}

fn is_iam_type(resource_type: &str) -> bool {
    resource_type.starts_with("AWS::IAM::") || resource_type == "AWS::Lambda::Permission"
}

fn is_security_group_type(resource_type: &str) -> bool {
    resource_type.starts_with("AWS::EC2::SecurityGroup")
}

/// Structural diff of two parsed templates
pub fn diff_templates(old: &Value, new: &Value) -> TemplateDiff {
    let old_resources = section(old, "Resources");
    let new_resources = section(new, "Resources");

    let mut resources = BTreeMap::new();
    for logical_id in union_keys(old_resources, new_resources) {
        let before = old_resources.and_then(|m| m.get(logical_id));
        let after = new_resources.and_then(|m| m.get(logical_id));
        let diff = match (before, after) {
            (None, Some(after)) => Some(ResourceDifference::addition(after.clone())),
            (Some(before), None) => Some(ResourceDifference::removal(
                before.clone(),
                Some(removal_impact(before)),
            )),
            (Some(before), Some(after)) => diff_resource(before, after),
            (None, None) => None,
        };
        if let Some(diff) = diff {
            resources.insert(logical_id.to_string(), diff);
        }
    }

    let mut iam_changes = FlaggedChanges::default();
    let mut security_group_changes = FlaggedChanges::default();
    for (logical_id, diff) in &resources {
        let Some(resource_type) = diff.resource_type() else {
            continue;
        };
        if is_iam_type(resource_type) {
            iam_changes.record(logical_id);
        }
        if is_security_group_type(resource_type) {
            security_group_changes.record(logical_id);
        }
    }

    TemplateDiff {
        resources,
        parameters: diff_entries(section(old, "Parameters"), section(new, "Parameters"), &[]),
        outputs: diff_entries(section(old, "Outputs"), section(new, "Outputs"), &[]),
        iam_changes,
        security_group_changes,
    }
}
