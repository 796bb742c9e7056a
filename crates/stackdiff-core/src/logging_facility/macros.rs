//! Operation boundary macros
//!
//! Each reconciliation, stack diff and publishing step logs one `start`
//! event and exactly one of `end` / `end_error`. Extra fields (`stack_id`,
//! `assembly`, counters) are passed through to `tracing` unchanged.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use stackdiff_core::log_op_start;
/// log_op_start!("run_diffs");
/// log_op_start!("diff_stack", stack_id = "Api");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = stackdiff_core_types::schema::EVENT_START,
            $($($field)*)?
        )
    };
}

/// Log the successful end of an operation
///
/// `duration_ms` is mandatory so every `end` event can be timed.
///
/// ```
/// # use stackdiff_core::log_op_end;
/// log_op_end!("diff_stack", duration_ms = 3, stack_id = "Api", created = 1u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = stackdiff_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($($field)*)?
        )
    };
}

/// Log a failed operation
///
/// The error is converted into [`crate::errors::ExError`] so the event always
/// carries `err_kind`, `err_code` and `err_message`.
///
/// ```
/// # use stackdiff_core::{log_op_error, errors::StackDiffError};
/// let err = StackDiffError::StackNotFound {
///     stack_id: "Api".to_string(),
///     side: stackdiff_core::AssemblySide::Base,
/// };
/// log_op_error!("diff_stack", err, duration_ms = 10, stack_id = "Api");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = stackdiff_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err_message = ex_err.message(),
            $($($field)*)?
        );
    }};
}
