//! Stack diff engine.
//!
//! Turns a raw structural template diff into a classified change set.
//!
//! ## Entry point
//!
//! ```ignore
//! use stackdiff_core::diff::{diff_stack, DiffOptions, LocalTemplateDiffer};
//!
//! let info = diff_stack("Api", &head, &base, &LocalTemplateDiffer, &DiffOptions::default())?;
//! println!("{} to add", info.changes.created_resources);
//! ```
//!
//! ## Guarantees
//!
//! - **Suppression before counting**: `AWS::CDK::Metadata`, packaging-only
//!   Lambda redeploys, asset-only state machine definitions (opt-in) and
//!   skipped properties never reach the counters.
//! - **Removals are destructive**: every removal yields a `WILL_DESTROY`
//!   destructive change even without an engine-reported impact.
//! - **Determinism**: resources are classified in logical id order.

pub mod classify;
pub mod engine;
pub mod filter;
pub mod format;
pub mod line_diff;
pub mod model;
pub mod stack_diff;

pub use classify::classify;
pub use engine::{diff_templates, DiffEngine, DiffMethod, DiffRequest, LocalTemplateDiffer};
pub use filter::{filter_resources, suppression_reason, DiffOptions, SkipProperties, Suppression};
pub use format::format_differences;
pub use model::{
    ChangeSummary, DestructiveChange, FlaggedChanges, PropertyDifference, ResourceDifference,
    ResourceImpact, StackDiffInfo, TemplateDiff,
};
pub use stack_diff::diff_stack;
