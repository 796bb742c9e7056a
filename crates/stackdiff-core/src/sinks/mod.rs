//! Reporting and labeling sinks.
//!
//! Sinks are external collaborators. Their failures are logged and
//! returned to the caller, but never abort a run: a computed diff must not
//! be lost because a comment could not be posted.

pub mod console;
pub mod memory;

pub use console::ConsoleSink;
pub use memory::{MemorySink, PublishedComment};

use crate::errors::{ExError, Result, StackDiffError};
use crate::report::{Comment, RunResult, RunSummary};
use crate::{log_op_end, log_op_error, log_op_start};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

pub const LABEL_DESTRUCTIVE: &str = "destructive";
pub const LABEL_IAM: &str = "iam";
pub const LABEL_NETWORKING: &str = "networking";

/// Pull request the run reports on, passed explicitly to every sink call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestContext {
    /// `owner/repo`
    pub repository: Option<String>,
    pub issue_number: Option<u64>,
    pub commit_sha: Option<String>,
}

impl PullRequestContext {
    pub fn is_pull_request(&self) -> bool {
        self.repository.is_some() && self.issue_number.is_some()
    }
}

/// Create-or-update of one persistent comment per identity
pub trait ReportingSink {
    /// # Errors
    ///
    /// `Reporting` when the comment could not be written.
    fn publish(
        &mut self,
        ctx: &PullRequestContext,
        identity: &str,
        hash: &str,
        body: &str,
    ) -> Result<()>;
}

/// Label set reconciliation on the pull request
pub trait LabelingSink {
    /// # Errors
    ///
    /// `Labeling` when the current labels cannot be read.
    fn labels(&mut self, ctx: &PullRequestContext) -> Result<BTreeSet<String>>;

    /// # Errors
    ///
    /// `Labeling` when the labels cannot be added.
    fn add_labels(&mut self, ctx: &PullRequestContext, labels: &[String]) -> Result<()>;

    /// # Errors
    ///
    /// `LabelAbsent` when the label is not set; `Labeling` otherwise.
    fn remove_label(&mut self, ctx: &PullRequestContext, label: &str) -> Result<()>;
}

/// Which labels a run asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelFlags {
    pub destructive: bool,
    pub iam: bool,
    pub networking: bool,
}

impl LabelFlags {
    pub fn from_summary(summary: &RunSummary) -> Self {
        Self {
            destructive: summary.has_destructive_changes,
            iam: summary.has_iam_changes,
            networking: summary.has_security_group_changes,
        }
    }

    /// `(label, wanted)` pairs
    pub fn entries(&self) -> [(&'static str, bool); 3] {
        [
            (LABEL_DESTRUCTIVE, self.destructive),
            (LABEL_IAM, self.iam),
            (LABEL_NETWORKING, self.networking),
        ]
    }
}

/// Build the comments of a run: summary first (when enabled), then one per
/// diffed stack.
pub fn comments_for(run: &RunResult, enable_summary: bool) -> Vec<Comment<'_>> {
    let mut comments = Vec::new();
    if enable_summary {
        comments.push(Comment::Summary { run });
    }
    comments.extend(
        run.diffed()
            .map(|(stack_id, info)| Comment::Stack {
                stack_id: stack_id.as_str(),
                info,
            }),
    );
    comments
}

/// Publish every comment of a run.
///
/// Returns the errors of the comments that failed; the remaining comments
/// are still published.
pub fn publish_comments(
    sink: &mut dyn ReportingSink,
    ctx: &PullRequestContext,
    run: &RunResult,
    enable_summary: bool,
) -> Vec<ExError> {
    let start = Instant::now();
    let comments = comments_for(run, enable_summary);
    log_op_start!("publish_comments", comment_count = comments.len() as u64);

    let mut errors = Vec::new();
    for comment in &comments {
        if let Err(err) = sink.publish(ctx, comment.id(), &comment.hash(), &comment.render()) {
            log_op_error!(
                "publish_comments",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                comment_id = comment.id()
            );
            errors.push(ExError::from(err).with_stack_id(comment.id()));
        }
    }

    log_op_end!(
        "publish_comments",
        duration_ms = start.elapsed().as_millis() as u64,
        published = (comments.len() - errors.len()) as u64,
        failed = errors.len() as u64
    );
    errors
}

/// Reconcile the label set: add wanted labels, remove unwanted ones.
///
/// A label that is already absent is not an error.
///
/// # Errors
///
/// The first labeling failure, after it has been logged.
pub fn apply_labels(
    sink: &mut dyn LabelingSink,
    ctx: &PullRequestContext,
    flags: LabelFlags,
) -> std::result::Result<(), ExError> {
    let start = Instant::now();
    log_op_start!(
        "apply_labels",
        destructive = flags.destructive,
        iam = flags.iam,
        networking = flags.networking
    );

    match reconcile_labels(sink, ctx, flags) {
        Ok(()) => {
            log_op_end!(
                "apply_labels",
                duration_ms = start.elapsed().as_millis() as u64
            );
            Ok(())
        }
        Err(err) => {
            log_op_error!(
                "apply_labels",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err.into())
        }
    }
}

fn reconcile_labels(
    sink: &mut dyn LabelingSink,
    ctx: &PullRequestContext,
    flags: LabelFlags,
) -> Result<()> {
    let mut labels = sink.labels(ctx)?;
    let mut to_remove = Vec::new();
    for (label, wanted) in flags.entries() {
        if wanted {
            labels.insert(label.to_string());
        } else {
            labels.remove(label);
            to_remove.push(label);
        }
    }

    if !labels.is_empty() {
        let labels: Vec<String> = labels.into_iter().collect();
        sink.add_labels(ctx, &labels)?;
    }
    for label in to_remove {
        match sink.remove_label(ctx, label) {
            Ok(()) | Err(StackDiffError::LabelAbsent { .. }) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
