//! Comment rendering.
//!
//! A run produces one summary comment plus one comment per diffed stack.
//! Each comment has a stable identity so a reporting sink can update the
//! comment it posted on a previous run instead of adding a new one.

use crate::diff::{format_differences, ChangeSummary, StackDiffInfo};
use crate::report::run::{RunResult, StackOutcome};
use sha2::{Digest as _, Sha256};

/// Upper bound on a rendered comment body, in characters
pub const MAX_COMMENT_LENGTH: usize = 65_000;

/// Appended to a body that had to be cut
pub const TRUNCATION_MARKER: &str = "\n\n... *(truncated: comment exceeded the maximum length)*";

/// Identity of the summary comment
pub const SUMMARY_COMMENT_ID: &str = "summary-comment";

/// A renderable report
#[derive(Debug, Clone, Copy)]
pub enum Comment<'a> {
    Stack {
        stack_id: &'a str,
        info: &'a StackDiffInfo,
    },
    Summary {
        run: &'a RunResult,
    },
}

impl Comment<'_> {
    /// Stable identity: the stack id, or `summary-comment`
    pub fn id(&self) -> &str {
        match self {
            Comment::Stack { stack_id, .. } => stack_id,
            Comment::Summary { .. } => SUMMARY_COMMENT_ID,
        }
    }

    /// Hex SHA-256 of the identity
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.id().as_bytes()))
    }

    /// Render the body, bounded by [`MAX_COMMENT_LENGTH`]
    pub fn render(&self) -> String {
        let body = match self {
            Comment::Stack { stack_id, info } => render_stack(stack_id, info),
            Comment::Summary { run } => render_summary(run),
        };
        truncate(&body, MAX_COMMENT_LENGTH)
    }
}

/// Cut `body` to at most `max` characters, keeping the earliest content
/// and ending with [`TRUNCATION_MARKER`].
pub fn truncate(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        return body.to_string();
    }
    let keep = max.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut out: String = body.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Severity indicator of a stack comment
fn stack_emoji(changes: &ChangeSummary) -> &'static str {
    if !changes.destructive_changes.is_empty() || changes.removed_resources > 0 {
        ":x:"
    } else if changes.updated_resources > 0 {
        ":yellow_circle:"
    } else if changes.created_resources > 0 {
        ":sparkle:"
    } else {
        ":white_check_mark:"
    }
}

/// Severity indicator of a stack line in the summary comment
fn summary_emoji(changes: &ChangeSummary) -> &'static str {
    if !changes.destructive_changes.is_empty() || changes.removed_resources > 0 {
        ":boom:"
    } else if changes.updated_resources > 0 {
        ":yellow_circle:"
    } else if changes.created_resources > 0 {
        ":white_check_mark:"
    } else {
        ":green_apple:"
    }
}

/// Count and notice segments for a set of stack diffs
pub fn diff_summary_segments<'a>(infos: impl IntoIterator<Item = &'a StackDiffInfo>) -> Vec<String> {
    let (mut created, mut updated, mut removed) = (0, 0, 0);
    let (mut security_groups, mut iam) = (false, false);
    for info in infos {
        created += info.changes.created_resources;
        updated += info.changes.updated_resources;
        removed += info.changes.removed_resources;
        security_groups |= info.diff.security_group_changes.has_changes;
        iam |= info.diff.iam_changes.has_changes;
    }

    let mut segments = Vec::new();
    if created > 0 {
        segments.push(format!(":sparkle: {created} to add"));
    }
    if updated > 0 {
        segments.push(format!(":yellow_circle: {updated} to update"));
    }
    if removed > 0 {
        segments.push(format!(":x: {removed} to destroy"));
    }
    if security_groups {
        segments.push(":lock: Security group changes detected".to_string());
    }
    if iam {
        segments.push(":lock: IAM changes detected".to_string());
    }
    if created == 0 && updated == 0 && removed == 0 {
        segments.push(":white_check_mark: No changes".to_string());
    }
    segments
}

fn render_stack(stack_id: &str, info: &StackDiffInfo) -> String {
    let emoji = stack_emoji(&info.changes);
    if info.diff.is_empty() {
        return format!("No Changes for stack: {stack_id} {emoji}");
    }

    let mut out = vec![
        format!(
            "#### {emoji} Diff for stack ***{stack_id}***: {} ",
            diff_summary_segments([info]).join(", ")
        ),
        "<details><summary>Details</summary>".to_string(),
        String::new(),
    ];

    if !info.changes.destructive_changes.is_empty() {
        out.push(String::new());
        out.push("> [!WARNING]\n> ***Destructive Changes*** :bangbang:".to_string());
        for change in &info.changes.destructive_changes {
            out.push(format!(
                "> **Stack: {} - Resource: {} - Impact:** ***{}***",
                change.stack_name, change.logical_id, change.impact
            ));
        }
    }

    out.push(String::new());
    out.push("```shell".to_string());
    out.push(format_differences(&info.diff));
    out.push("```".to_string());
    out.push("</details>".to_string());
    out.push(String::new());
    out.join("\n")
}

fn render_summary(run: &RunResult) -> String {
    if run.is_empty() {
        return ":ghost: No Changes were generated for this pull request :ghost:".to_string();
    }

    let combined = ChangeSummary::combine(run.diffed().map(|(_, info)| &info.changes));
    let mut out = Vec::new();
    if combined.has_changes {
        out.push(
            ":ghost: This pull request introduces changes to CloudFormation templates :ghost:\n"
                .to_string(),
        );
    }

    out.push("***Summary of changes*** :ghost:".to_string());
    out.push(format!(
        "\n> {}\n",
        diff_summary_segments(run.diffed().map(|(_, info)| info)).join("\n> ")
    ));

    out.push("<details>".to_string());
    out.push("<summary>Summary of changes</summary>\n".to_string());
    for (stack_id, outcome) in &run.stacks {
        match outcome {
            StackOutcome::Diffed(info) => out.push(format!(
                "### {} ***Stack***: {}\n> {}\n",
                summary_emoji(&info.changes),
                info.stack_name,
                diff_summary_segments([info]).join(", ")
            )),
            StackOutcome::Failed(err) => out.push(format!(
                "### :fire: ***Stack***: {stack_id}\n> Error: {}\n",
                err.message()
            )),
        }
    }
    out.push("</details>".to_string());
    out.join("\n")
}
