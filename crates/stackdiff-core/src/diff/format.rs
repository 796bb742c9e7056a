//! Plain-text rendering of a [`TemplateDiff`].

use crate::diff::model::{PropertyDifference, ResourceDifference, ResourceImpact, TemplateDiff};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const ADDED: &str = "[+]";
const REMOVED: &str = "[-]";
const UPDATED: &str = "[~]";

fn marker(diff: &PropertyDifference) -> &'static str {
    match (&diff.old_value, &diff.new_value) {
        (None, Some(_)) => ADDED,
        (Some(_), None) => REMOVED,
        _ => UPDATED,
    }
}

fn compact(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_default()
}

fn write_entries(out: &mut String, heading: &str, kind: &str, entries: &BTreeMap<String, PropertyDifference>) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "{heading}");
    for (name, diff) in entries {
        match marker(diff) {
            UPDATED => {
                let _ = writeln!(
                    out,
                    "{UPDATED} {kind} {name}: {} to {}",
                    compact(diff.old_value.as_ref()),
                    compact(diff.new_value.as_ref())
                );
            }
            m => {
                let _ = writeln!(out, "{m} {kind} {name}");
            }
        }
    }
    out.push('\n');
}

fn impact_suffix(diff: &ResourceDifference) -> &'static str {
    match diff.change_impact {
        Some(ResourceImpact::WillReplace) => " replace",
        Some(ResourceImpact::MayReplace) => " may be replaced",
        Some(ResourceImpact::WillOrphan) => " orphan",
        _ => "",
    }
}

fn write_resource(out: &mut String, logical_id: &str, diff: &ResourceDifference) {
    let resource_type = diff.resource_type().unwrap_or("Unknown");
    let head = if diff.is_addition() {
        ADDED
    } else if diff.is_removal() {
        REMOVED
    } else {
        UPDATED
    };
    let _ = writeln!(out, "{head} {resource_type} {logical_id}{}", impact_suffix(diff));
    if !diff.is_update() {
        return;
    }

    let changes: Vec<(&String, &PropertyDifference)> = diff
        .other_changes
        .iter()
        .chain(diff.property_updates.iter())
        .filter(|(_, p)| p.is_different())
        .collect();
    let last = changes.len().saturating_sub(1);
    for (i, (name, prop)) in changes.into_iter().enumerate() {
        let (branch, indent) = if i == last {
            (" └─", "    ")
        } else {
            (" ├─", " │  ")
        };
        let _ = writeln!(out, "{branch} {} {name}", marker(prop));
        if let Some(old) = &prop.old_value {
            let _ = writeln!(out, "{indent} ├─ {REMOVED} {old}");
        }
        if let Some(new) = &prop.new_value {
            let _ = writeln!(out, "{indent} └─ {ADDED} {new}");
        }
    }
}

/// Render every parameter, resource and output difference as text
pub fn format_differences(diff: &TemplateDiff) -> String {
    let mut out = String::new();
    if diff.iam_changes.has_changes {
        let _ = writeln!(
            out,
            "IAM Statement Changes: {}\n",
            diff.iam_changes.logical_ids.join(", ")
        );
    }
    if diff.security_group_changes.has_changes {
        let _ = writeln!(
            out,
            "Security Group Changes: {}\n",
            diff.security_group_changes.logical_ids.join(", ")
        );
    }

    write_entries(&mut out, "Parameters", "Parameter", &diff.parameters);

    if !diff.resources.is_empty() {
        out.push_str("Resources\n");
        for (logical_id, resource) in &diff.resources {
            write_resource(&mut out, logical_id, resource);
        }
        out.push('\n');
    }

    write_entries(&mut out, "Outputs", "Output", &diff.outputs);
    out.trim_end().to_string()
}
