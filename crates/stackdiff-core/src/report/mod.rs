//! Change aggregator and reporter.
//!
//! [`run_diffs`] walks the head assembly and captures one outcome per stack;
//! [`aggregate`] folds the outcomes into run-level flags and the summary
//! report; [`Comment`] renders individual comment bodies.

pub mod aggregate;
pub mod render;
pub mod run;

pub use aggregate::{aggregate, RunSummary};
pub use render::{truncate, Comment, MAX_COMMENT_LENGTH, SUMMARY_COMMENT_ID, TRUNCATION_MARKER};
pub use run::{run_diffs, RunResult, StackOutcome};
