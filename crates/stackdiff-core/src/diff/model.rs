//! Template diff and change summary types.
//!
//! Collections use `BTreeMap` so that iteration (and therefore
//! classification order and rendered reports) is deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Impact of a resource change on the deployed resource.
///
/// Variants are ordered by severity; the four destructive impacts come last
/// as `MayReplace < WillOrphan < WillDestroy < WillReplace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceImpact {
    NoChange,
    WillImport,
    WillCreate,
    WillUpdate,
    MayReplace,
    WillOrphan,
    WillDestroy,
    WillReplace,
}

impl ResourceImpact {
    /// True for impacts that can cause data loss or downtime
    pub fn is_destructive(self) -> bool {
        matches!(
            self,
            ResourceImpact::MayReplace
                | ResourceImpact::WillOrphan
                | ResourceImpact::WillDestroy
                | ResourceImpact::WillReplace
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceImpact::NoChange => "NO_CHANGE",
            ResourceImpact::WillImport => "WILL_IMPORT",
            ResourceImpact::WillCreate => "WILL_CREATE",
            ResourceImpact::WillUpdate => "WILL_UPDATE",
            ResourceImpact::MayReplace => "MAY_REPLACE",
            ResourceImpact::WillOrphan => "WILL_ORPHAN",
            ResourceImpact::WillDestroy => "WILL_DESTROY",
            ResourceImpact::WillReplace => "WILL_REPLACE",
        }
    }
}

impl std::fmt::Display for ResourceImpact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Old/new values of a single property, parameter or output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDifference {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_impact: Option<ResourceImpact>,
}

impl PropertyDifference {
    pub fn new(old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self {
            old_value,
            new_value,
            change_impact: None,
        }
    }

    pub fn is_different(&self) -> bool {
        self.old_value != self.new_value
    }
}

/// Difference of one resource between base and head
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDifference {
    /// Full resource definition in the base template
    pub old_value: Option<Value>,
    /// Full resource definition in the head template
    pub new_value: Option<Value>,
    /// Changes under `Properties`
    #[serde(default)]
    pub property_updates: BTreeMap<String, PropertyDifference>,
    /// Changes to resource attributes (`Metadata`, `DependsOn`, `Type`, ...)
    #[serde(default)]
    pub other_changes: BTreeMap<String, PropertyDifference>,
    /// Impact as reported by the diff engine, if any
    #[serde(default)]
    pub change_impact: Option<ResourceImpact>,
}

impl ResourceDifference {
    pub fn addition(resource: Value) -> Self {
        Self {
            old_value: None,
            new_value: Some(resource),
            property_updates: BTreeMap::new(),
            other_changes: BTreeMap::new(),
            change_impact: Some(ResourceImpact::WillCreate),
        }
    }

    /// A removal; engines that do not tag removals pass `None` as impact
    pub fn removal(resource: Value, change_impact: Option<ResourceImpact>) -> Self {
        Self {
            old_value: Some(resource),
            new_value: None,
            property_updates: BTreeMap::new(),
            other_changes: BTreeMap::new(),
            change_impact,
        }
    }

    pub fn update(
        old: Value,
        new: Value,
        property_updates: BTreeMap<String, PropertyDifference>,
        other_changes: BTreeMap<String, PropertyDifference>,
        change_impact: Option<ResourceImpact>,
    ) -> Self {
        Self {
            old_value: Some(old),
            new_value: Some(new),
            property_updates,
            other_changes,
            change_impact,
        }
    }

    pub fn is_addition(&self) -> bool {
        self.old_value.is_none() && self.new_value.is_some()
    }

    pub fn is_removal(&self) -> bool {
        self.old_value.is_some() && self.new_value.is_none()
    }

    pub fn is_update(&self) -> bool {
        self.old_value.is_some() && self.new_value.is_some()
    }

    /// Resource type, preferring the base side
    pub fn resource_type(&self) -> Option<&str> {
        self.old_value
            .as_ref()
            .and_then(|v| v.get("Type"))
            .or_else(|| self.new_value.as_ref().and_then(|v| v.get("Type")))
            .and_then(Value::as_str)
    }

    /// Names of every differing property and resource attribute
    pub fn changed_properties(&self) -> BTreeSet<&str> {
        self.property_updates
            .iter()
            .chain(self.other_changes.iter())
            .filter(|(_, diff)| diff.is_different())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Resources of a given category touched by the diff
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlaggedChanges {
    pub has_changes: bool,
    pub logical_ids: Vec<String>,
}

impl FlaggedChanges {
    pub fn record(&mut self, logical_id: &str) {
        self.has_changes = true;
        self.logical_ids.push(logical_id.to_string());
    }
}

/// Structural diff of one stack template, as returned by a diff engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TemplateDiff {
    pub resources: BTreeMap<String, ResourceDifference>,
    #[serde(default)]
    pub parameters: BTreeMap<String, PropertyDifference>,
    #[serde(default)]
    pub outputs: BTreeMap<String, PropertyDifference>,
    #[serde(default)]
    pub iam_changes: FlaggedChanges,
    #[serde(default)]
    pub security_group_changes: FlaggedChanges,
}

impl TemplateDiff {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.parameters.is_empty() && self.outputs.is_empty()
    }
}

/// A resource change that can cause data loss or downtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestructiveChange {
    pub stack_name: String,
    pub logical_id: String,
    pub impact: ResourceImpact,
}

/// Classified resource counts for one stack
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeSummary {
    pub created_resources: usize,
    pub updated_resources: usize,
    pub removed_resources: usize,
    pub destructive_changes: Vec<DestructiveChange>,
    /// True iff any of the three counters is nonzero
    pub has_changes: bool,
}

impl ChangeSummary {
    /// Fold several summaries into one
    pub fn combine<'a>(summaries: impl IntoIterator<Item = &'a ChangeSummary>) -> Self {
        let mut combined = ChangeSummary::default();
        for summary in summaries {
            combined.created_resources += summary.created_resources;
            combined.updated_resources += summary.updated_resources;
            combined.removed_resources += summary.removed_resources;
            combined
                .destructive_changes
                .extend(summary.destructive_changes.iter().cloned());
        }
        combined.refresh_has_changes();
        combined
    }

    pub fn refresh_has_changes(&mut self) {
        self.has_changes = self.created_resources > 0
            || self.updated_resources > 0
            || self.removed_resources > 0;
    }

    pub fn total(&self) -> usize {
        self.created_resources + self.updated_resources + self.removed_resources
    }
}

/// Result of diffing one stack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StackDiffInfo {
    pub stack_name: String,
    /// Diff after suppression rules were applied
    pub diff: TemplateDiff,
    pub changes: ChangeSummary,
}
