#![allow(clippy::unwrap_used, clippy::expect_used)]

use stackdiff_core::errors::StackDiffError;
use stackdiff_core::logging_facility::test_capture::init_test_capture;
use stackdiff_core::{log_op_end, log_op_error, log_op_start};
use stackdiff_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_ASSEMBLY, FIELD_DURATION_MS, FIELD_ERR_CODE,
    FIELD_ERR_KIND,
};

#[test]
fn test_start_and_end_pair() {
    let capture = init_test_capture();
    let op_name = "test_start_end_pair_unique_1";

    log_op_start!(op_name, stack_id = "Api");
    log_op_end!(op_name, duration_ms = 42);

    let starts = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    assert_eq!(starts, 1);

    let end = capture
        .events()
        .into_iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .expect("Should have end event");
    assert_eq!(end.fields.get(FIELD_DURATION_MS), Some(&"42".to_string()));
}

#[test]
fn test_error_event_carries_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_error_event_unique_2";

    let err = StackDiffError::ManifestMissing {
        path: "cdk.out/manifest.json".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 5, assembly = "cdk.out");

    capture.assert_event_exists(op_name, EVENT_END_ERROR);
    let event = capture
        .events()
        .into_iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");

    assert_eq!(
        event.fields.get(FIELD_ERR_CODE),
        Some(&"ERR_RECONCILIATION".to_string())
    );
    assert_eq!(
        event.fields.get(FIELD_ERR_KIND),
        Some(&"Reconciliation".to_string())
    );
    assert_eq!(event.fields.get(FIELD_ASSEMBLY), Some(&"cdk.out".to_string()));
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_assert_event_exists_fails_for_unknown_op() {
    let capture = init_test_capture();
    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}

#[test]
fn test_events_are_indexed_by_stack() {
    let capture = init_test_capture();
    let op_name = "test_stack_index_unique_3";

    log_op_start!(op_name, stack_id = "IndexedStack");
    let err = StackDiffError::DiffUnavailable {
        stack_id: "IndexedStack".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 1, stack_id = "IndexedStack");

    let events = capture.for_stack("IndexedStack");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].stack_id.as_deref(), Some("IndexedStack"));

    let errors = capture.stack_errors(op_name, "IndexedStack");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].err_code(), Some("ERR_DIFF_UNAVAILABLE"));
    assert!(errors[0].fields.contains_key("err_message"));
}
