//! Run-level aggregation of per-stack outcomes.

use crate::diff::{ChangeSummary, DestructiveChange};
use crate::report::render::Comment;
use crate::report::run::RunResult;
use serde::Serialize;

/// Overall flags, counts and report of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub has_changes: bool,
    pub has_destructive_changes: bool,
    pub has_iam_changes: bool,
    pub has_security_group_changes: bool,
    pub created_resources: usize,
    pub updated_resources: usize,
    pub removed_resources: usize,
    pub destructive_changes: Vec<DestructiveChange>,
    /// Ids of stacks whose diff failed
    pub failed_stacks: Vec<String>,
    /// Rendered summary comment body
    pub report: String,
}

impl RunSummary {
    /// `key=value` lines for a CI outputs file
    pub fn output_lines(&self) -> Vec<String> {
        vec![
            format!("has-changes={}", self.has_changes),
            format!("has-destructive-changes={}", self.has_destructive_changes),
            format!("has-iam-changes={}", self.has_iam_changes),
            format!(
                "has-security-group-changes={}",
                self.has_security_group_changes
            ),
        ]
    }
}

/// Fold a run result into overall flags and the summary report
pub fn aggregate(run: &RunResult) -> RunSummary {
    let combined = ChangeSummary::combine(run.diffed().map(|(_, info)| &info.changes));

    let mut summary = RunSummary {
        created_resources: combined.created_resources,
        updated_resources: combined.updated_resources,
        removed_resources: combined.removed_resources,
        failed_stacks: run.failed().map(|(id, _)| id.clone()).collect(),
        report: Comment::Summary { run }.render(),
        ..Default::default()
    };

    for (_, info) in run.diffed() {
        summary.has_changes |= info.changes.has_changes;
        summary.has_destructive_changes |=
            info.changes.removed_resources > 0 || !info.changes.destructive_changes.is_empty();
        summary.has_iam_changes |= info.diff.iam_changes.has_changes;
        summary.has_security_group_changes |= info.diff.security_group_changes.has_changes;
    }
    summary.destructive_changes = combined.destructive_changes;
    summary
}
