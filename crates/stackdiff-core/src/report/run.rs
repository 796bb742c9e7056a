//! Sequential per-stack run over the head assembly.

use crate::assembly::AssemblyReader;
use crate::diff::{diff_stack, DiffEngine, DiffOptions, StackDiffInfo};
use crate::errors::{ExError, Result};
use crate::{log_op_end, log_op_start};
use serde::Serialize;
use stackdiff_core_types::RunId;
use std::collections::BTreeMap;
use std::time::Instant;

/// Outcome of diffing one stack
#[derive(Debug, Clone, PartialEq)]
pub enum StackOutcome {
    Diffed(StackDiffInfo),
    Failed(ExError),
}

impl StackOutcome {
    pub fn info(&self) -> Option<&StackDiffInfo> {
        match self {
            StackOutcome::Diffed(info) => Some(info),
            StackOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ExError> {
        match self {
            StackOutcome::Diffed(_) => None,
            StackOutcome::Failed(err) => Some(err),
        }
    }
}

impl Serialize for StackOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            StackOutcome::Diffed(info) => map.serialize_entry("diffed", info)?,
            StackOutcome::Failed(err) => map.serialize_entry(
                "failed",
                &serde_json::json!({
                    "code": err.code(),
                    "op": err.op(),
                    "message": err.message(),
                }),
            )?,
        }
        map.end()
    }
}

/// One entry per head stack, in manifest iteration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    /// Correlates this result with the `run` span and its log events
    pub run_id: RunId,
    pub stacks: BTreeMap<String, StackOutcome>,
}

impl RunResult {
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn diffed(&self) -> impl Iterator<Item = (&String, &StackDiffInfo)> {
        self.stacks
            .iter()
            .filter_map(|(id, outcome)| outcome.info().map(|info| (id, info)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&String, &ExError)> {
        self.stacks
            .iter()
            .filter_map(|(id, outcome)| outcome.error().map(|err| (id, err)))
    }
}

/// Diff every stack of `head` against `base`.
///
/// Per-stack failures are captured in the result and never propagate.
///
/// # Errors
///
/// `NotLoaded` when `head` has not been reconciled.
pub fn run_diffs(
    head: &AssemblyReader,
    base: &AssemblyReader,
    engine: &dyn DiffEngine,
    options: &DiffOptions,
) -> Result<RunResult> {
    let run_id = RunId::new();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _entered = span.enter();
    let start = Instant::now();
    let stack_ids = head.stack_ids()?;
    log_op_start!("run_diffs", run_id = %run_id, stack_count = stack_ids.len() as u64);

    let mut result = RunResult {
        run_id: run_id.clone(),
        stacks: BTreeMap::new(),
    };
    for stack_id in stack_ids {
        let outcome = match diff_stack(&stack_id, head, base, engine, options) {
            Ok(info) => StackOutcome::Diffed(info),
            Err(err) => {
                let ex: ExError = err.into();
                tracing::warn!(
                    stack_id = %stack_id,
                    err_code = ex.code(),
                    "stack skipped"
                );
                StackOutcome::Failed(ex.with_stack_id(stack_id.clone()))
            }
        };
        result.stacks.insert(stack_id, outcome);
    }

    log_op_end!(
        "run_diffs",
        duration_ms = start.elapsed().as_millis() as u64,
        run_id = %run_id,
        stack_count = result.stacks.len() as u64,
        failed = result.failed().count() as u64
    );
    Ok(result)
}
