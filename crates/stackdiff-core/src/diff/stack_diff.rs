//! Per-stack diff: lookup, engine call, suppression, classification.

use crate::assembly::{AssemblyReader, AssemblySide};
use crate::diff::classify::classify;
use crate::diff::engine::{DiffEngine, DiffMethod, DiffRequest};
use crate::diff::filter::{filter_resources, DiffOptions};
use crate::diff::model::StackDiffInfo;
use crate::errors::{Result, StackDiffError};
use crate::{log_op_end, log_op_error, log_op_start};
use std::time::Instant;

/// Diff one stack of the head assembly against the same stack in base.
///
/// # Errors
///
/// * `StackNotFound` - the id is absent from the head or the base manifest
/// * `DiffUnavailable` - the engine returned nothing for the stack
/// - any error raised by the engine itself
pub fn diff_stack(
    stack_id: &str,
    head: &AssemblyReader,
    base: &AssemblyReader,
    engine: &dyn DiffEngine,
    options: &DiffOptions,
) -> Result<StackDiffInfo> {
    let start = Instant::now();
    log_op_start!("diff_stack", stack_id = %stack_id);

    match diff_stack_inner(stack_id, head, base, engine, options) {
        Ok(info) => {
            log_op_end!(
                "diff_stack",
                duration_ms = start.elapsed().as_millis() as u64,
                stack_id = %stack_id,
                created = info.changes.created_resources as u64,
                updated = info.changes.updated_resources as u64,
                removed = info.changes.removed_resources as u64,
                destructive = info.changes.destructive_changes.len() as u64
            );
            Ok(info)
        }
        Err(err) => {
            log_op_error!(
                "diff_stack",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                stack_id = %stack_id
            );
            Err(err)
        }
    }
}

fn diff_stack_inner(
    stack_id: &str,
    head: &AssemblyReader,
    base: &AssemblyReader,
    engine: &dyn DiffEngine,
    options: &DiffOptions,
) -> Result<StackDiffInfo> {
    if head.stack(stack_id)?.is_none() {
        return Err(StackDiffError::StackNotFound {
            stack_id: stack_id.to_string(),
            side: AssemblySide::Head,
        });
    }
    let base_template = base
        .template_path(stack_id)?
        .ok_or_else(|| StackDiffError::StackNotFound {
            stack_id: stack_id.to_string(),
            side: AssemblySide::Base,
        })?;

    let request = DiffRequest {
        method: DiffMethod::LocalFile(base_template),
        stack_selector: stack_id.to_string(),
    };
    let mut diff = engine
        .diff(head, &request)?
        .remove(stack_id)
        .ok_or_else(|| StackDiffError::DiffUnavailable {
            stack_id: stack_id.to_string(),
        })?;

    diff.resources = filter_resources(stack_id, std::mem::take(&mut diff.resources), options);
    let changes = classify(stack_id, &diff.resources);

    Ok(StackDiffInfo {
        stack_name: stack_id.to_string(),
        diff,
        changes,
    })
}
