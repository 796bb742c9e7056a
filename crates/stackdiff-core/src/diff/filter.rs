//! Suppression rules applied to raw resource differences.
//!
//! A suppressed resource is removed from the diff before classification, so
//! it counts toward none of the created/updated/removed totals.

use crate::diff::line_diff::only_asset_changes;
use crate::diff::model::ResourceDifference;
use crate::errors::{Result, StackDiffError};
use std::collections::{BTreeMap, BTreeSet};

/// Token present in every asset-bucket reference of the default bootstrap
pub const ASSET_BUCKET_MARKER: &str = "cdk-hnb659fds-assets";

pub const CDK_METADATA_TYPE: &str = "AWS::CDK::Metadata";
pub const LAMBDA_FUNCTION_TYPE: &str = "AWS::Lambda::Function";
pub const STATE_MACHINE_TYPE: &str = "AWS::StepFunctions::StateMachine";

const DEFINITION_STRING: &str = "DefinitionString";

/// Per resource type set of properties whose changes are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipProperties {
    by_type: BTreeMap<String, BTreeSet<String>>,
}

impl SkipProperties {
    /// Parse `ResourceType.PropertyName` entries.
    ///
    /// The split happens at the last `.`, since resource types contain `::`
    /// but never a dot.
    ///
    /// # Errors
    ///
    /// `InvalidSkipProperty` for an entry without a type or property part.
    pub fn parse<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut skip = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let (resource_type, property) =
                entry
                    .rsplit_once('.')
                    .ok_or_else(|| StackDiffError::InvalidSkipProperty {
                        entry: entry.to_string(),
                    })?;
            if resource_type.is_empty() || property.is_empty() {
                return Err(StackDiffError::InvalidSkipProperty {
                    entry: entry.to_string(),
                });
            }
            skip.insert(resource_type, property);
        }
        Ok(skip)
    }

    pub fn insert(&mut self, resource_type: &str, property: &str) {
        self.by_type
            .entry(resource_type.to_string())
            .or_default()
            .insert(property.to_string());
    }

    pub fn for_type(&self, resource_type: &str) -> Option<&BTreeSet<String>> {
        self.by_type.get(resource_type)
    }

    /// True when `changed` is nonempty and entirely inside the skip set
    pub fn skips(&self, resource_type: &str, changed: &BTreeSet<&str>) -> bool {
        match self.for_type(resource_type) {
            Some(skip) => !changed.is_empty() && changed.iter().all(|p| skip.contains(*p)),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Options controlling suppression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    pub skip_properties: SkipProperties,
    pub ignore_asset_only_changes: bool,
    pub asset_marker: String,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            skip_properties: SkipProperties::default(),
            ignore_asset_only_changes: false,
            asset_marker: ASSET_BUCKET_MARKER.to_string(),
        }
    }
}

/// Why a resource difference was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    CdkMetadata,
    PackagingOnlyLambda,
    AssetOnlyStateMachine,
    SkippedProperties,
}

impl Suppression {
    pub fn as_str(self) -> &'static str {
        match self {
            Suppression::CdkMetadata => "cdk_metadata",
            Suppression::PackagingOnlyLambda => "packaging_only_lambda",
            Suppression::AssetOnlyStateMachine => "asset_only_state_machine",
            Suppression::SkippedProperties => "skipped_properties",
        }
    }
}

fn is_packaging_only(changed: &BTreeSet<&str>) -> bool {
    let code_only: BTreeSet<&str> = ["Code"].into_iter().collect();
    let code_and_metadata: BTreeSet<&str> = ["Code", "Metadata"].into_iter().collect();
    *changed == code_only || *changed == code_and_metadata
}

fn is_asset_only_definition(diff: &ResourceDifference, changed: &BTreeSet<&str>, marker: &str) -> bool {
    if changed.len() != 1 || !changed.contains(DEFINITION_STRING) {
        return false;
    }
    diff.property_updates
        .get(DEFINITION_STRING)
        .map(|p| only_asset_changes(p.old_value.as_ref(), p.new_value.as_ref(), marker))
        .unwrap_or(false)
}

/// Decide whether one resource difference is suppressed, and why
pub fn suppression_reason(diff: &ResourceDifference, options: &DiffOptions) -> Option<Suppression> {
    let resource_type = diff.resource_type()?;
    if resource_type == CDK_METADATA_TYPE {
        return Some(Suppression::CdkMetadata);
    }

    // The remaining rules only look at in-place updates.
    if !diff.is_update() {
        return None;
    }
    let changed = diff.changed_properties();

    if resource_type == LAMBDA_FUNCTION_TYPE && is_packaging_only(&changed) {
        return Some(Suppression::PackagingOnlyLambda);
    }
    if resource_type == STATE_MACHINE_TYPE
        && options.ignore_asset_only_changes
        && is_asset_only_definition(diff, &changed, &options.asset_marker)
    {
        return Some(Suppression::AssetOnlyStateMachine);
    }
    if options.skip_properties.skips(resource_type, &changed) {
        return Some(Suppression::SkippedProperties);
    }
    None
}

/// Drop every suppressed resource difference
pub fn filter_resources(
    stack_id: &str,
    resources: BTreeMap<String, ResourceDifference>,
    options: &DiffOptions,
) -> BTreeMap<String, ResourceDifference> {
    resources
        .into_iter()
        .filter(|(logical_id, diff)| match suppression_reason(diff, options) {
            Some(reason) => {
                tracing::debug!(
                    stack_id = %stack_id,
                    logical_id = %logical_id,
                    resource_type = diff.resource_type().unwrap_or_default(),
                    reason = reason.as_str(),
                    "suppressed resource difference"
                );
                false
            }
            None => true,
        })
        .collect()
}
