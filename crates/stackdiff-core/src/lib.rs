//! stackdiff core - assembly reconciliation and change classification
//!
//! This crate compares a "base" and a "head" synthesized infrastructure
//! assembly and turns the raw structural differences into a classified,
//! reportable change set:
//! - Manifest reconciliation into an isolated staging area (top-level,
//!   stage and nested stacks all addressable by id)
//! - Per-stack diffing with suppression rules for packaging-only noise
//! - Destructive change detection (replace, orphan, destroy)
//! - Run aggregation and comment rendering
//! - Reporting and labeling sink abstractions

pub mod assembly;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod report;
pub mod sinks;

// Re-export commonly used types
pub use assembly::{reconcile, AssemblyReader, AssemblySide};
pub use diff::{
    diff_stack, ChangeSummary, DestructiveChange, DiffEngine, DiffOptions, LocalTemplateDiffer,
    ResourceImpact, StackDiffInfo,
};
pub use errors::{ExError, ExErrorKind, Result, StackDiffError};
pub use report::{aggregate, run_diffs, Comment, RunResult, RunSummary, StackOutcome};
pub use sinks::{
    apply_labels, publish_comments, LabelFlags, LabelingSink, PullRequestContext, ReportingSink,
};
