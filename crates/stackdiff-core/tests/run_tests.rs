#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{bucket, queue, template, AssemblyFixture};
use serde_json::json;
use stackdiff_core::assembly::reconcile;
use stackdiff_core::diff::{DiffOptions, LocalTemplateDiffer};
use stackdiff_core::logging_facility::init_test_capture;
use stackdiff_core::report::{aggregate, run_diffs, StackOutcome, SUMMARY_COMMENT_ID};
use stackdiff_core::sinks::{
    apply_labels, publish_comments, LabelFlags, MemorySink, PullRequestContext,
};
use stackdiff_core::ExErrorKind;
use stackdiff_core_types::schema::{EVENT_START, FIELD_RUN_ID};
use tempfile::TempDir;

struct Fixture {
    _base: TempDir,
    _head: TempDir,
    run: stackdiff_core::RunResult,
}

/// Three head stacks; the middle one is absent from base
fn three_stacks(middle: &str) -> Fixture {
    let base = AssemblyFixture::new()
        .stack("Alpha", template(json!({})))
        .stack("Gamma", template(json!({"Queue": queue()})))
        .build();
    let head = AssemblyFixture::new()
        .stack("Alpha", template(json!({"Bucket": bucket()})))
        .stack(middle, template(json!({})))
        .stack("Gamma", template(json!({})))
        .build();

    let base_reader = reconcile(base.path()).unwrap();
    let head_reader = reconcile(head.path()).unwrap();
    let run = run_diffs(
        &head_reader,
        &base_reader,
        &LocalTemplateDiffer,
        &DiffOptions::default(),
    )
    .unwrap();
    Fixture {
        _base: base,
        _head: head,
        run,
    }
}

#[test]
fn test_failed_stack_does_not_abort_run() {
    let f = three_stacks("Beta");
    assert_eq!(f.run.stacks.len(), 3);

    let alpha = f.run.stacks["Alpha"].info().unwrap();
    assert_eq!(alpha.changes.created_resources, 1);

    let beta = f.run.stacks["Beta"].error().unwrap();
    assert_eq!(beta.kind(), ExErrorKind::StackNotFound);
    assert_eq!(beta.stack_id(), Some("Beta"));
    assert!(!beta.is_run_fatal());

    let gamma = f.run.stacks["Gamma"].info().unwrap();
    assert_eq!(gamma.changes.removed_resources, 1);
}

#[test]
fn test_aggregate_renders_partial_results() {
    let f = three_stacks("Beta");
    let summary = aggregate(&f.run);

    assert!(summary.has_changes);
    assert!(summary.has_destructive_changes);
    assert_eq!(summary.created_resources, 1);
    assert_eq!(summary.removed_resources, 1);
    assert_eq!(summary.failed_stacks, vec!["Beta"]);

    assert!(summary
        .report
        .contains(":ghost: This pull request introduces changes to CloudFormation templates :ghost:"));
    assert!(summary.report.contains("### :white_check_mark: ***Stack***: Alpha"));
    assert!(summary
        .report
        .contains("### :fire: ***Stack***: Beta\n> Error: Stack Beta not found in base assembly"));
    assert!(summary.report.contains("### :boom: ***Stack***: Gamma"));
}

#[test]
fn test_stack_failure_is_logged() {
    let capture = init_test_capture();
    let _f = three_stacks("BetaLogged");

    let errors = capture.stack_errors("diff_stack", "BetaLogged");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].err_code(), Some("ERR_STACK_NOT_FOUND"));

    let events = capture.for_stack("BetaLogged");
    assert_eq!(events.first().and_then(|e| e.event.as_deref()), Some(EVENT_START));
}

#[test]
fn test_summary_published_first() {
    let f = three_stacks("Beta");
    let mut sink = MemorySink::new();
    let errors = publish_comments(&mut sink, &PullRequestContext::default(), &f.run, true);

    assert!(errors.is_empty());
    assert_eq!(
        sink.publish_order,
        vec![SUMMARY_COMMENT_ID, "Alpha", "Gamma"]
    );
    assert!(sink
        .body("Alpha")
        .unwrap()
        .contains("Diff for stack ***Alpha***"));
}

#[test]
fn test_summary_can_be_disabled() {
    let f = three_stacks("Beta");
    let mut sink = MemorySink::new();
    publish_comments(&mut sink, &PullRequestContext::default(), &f.run, false);
    assert_eq!(sink.publish_order, vec!["Alpha", "Gamma"]);
}

#[test]
fn test_reporting_failure_is_not_fatal() {
    let f = three_stacks("Beta");
    let mut sink = MemorySink::new();
    sink.fail_identities.insert("Alpha".to_string());

    let errors = publish_comments(&mut sink, &PullRequestContext::default(), &f.run, true);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ExErrorKind::Reporting);
    assert_eq!(errors[0].stack_id(), Some("Alpha"));
    assert_eq!(sink.publish_order, vec![SUMMARY_COMMENT_ID, "Gamma"]);
}

#[test]
fn test_republishing_updates_existing_comments() {
    let f = three_stacks("Beta");
    let mut sink = MemorySink::new();
    let ctx = PullRequestContext::default();
    publish_comments(&mut sink, &ctx, &f.run, true);
    publish_comments(&mut sink, &ctx, &f.run, true);

    assert_eq!(sink.comments.len(), 3);
    assert!(sink.comments.values().all(|c| c.revisions == 2));
}

#[test]
fn test_labels_reconciled_from_flags() {
    let f = three_stacks("Beta");
    let summary = aggregate(&f.run);
    let flags = LabelFlags::from_summary(&summary);
    assert!(flags.destructive);
    assert!(!flags.iam);

    let mut sink = MemorySink::with_labels(["iam", "enhancement"]);
    apply_labels(&mut sink, &PullRequestContext::default(), flags).unwrap();

    assert!(sink.labels.contains("destructive"));
    assert!(sink.labels.contains("enhancement"));
    assert!(!sink.labels.contains("iam"));
    // "networking" was never set; its removal is tolerated.
    assert_eq!(sink.removed_labels, vec!["iam"]);
}

#[test]
fn test_labeling_failure_is_reported() {
    let mut sink = MemorySink::new();
    sink.fail_labeling = true;
    let err = apply_labels(
        &mut sink,
        &PullRequestContext::default(),
        LabelFlags::default(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "ERR_LABELING");
}

#[test]
fn test_each_run_carries_its_own_id() {
    let first = three_stacks("Beta");
    let second = three_stacks("Beta");
    assert_ne!(first.run.run_id, second.run.run_id);

    let value = serde_json::to_value(&first.run).unwrap();
    assert_eq!(value["run_id"], first.run.run_id.as_str());
}

#[test]
fn test_run_events_are_tagged_with_run_id() {
    let capture = init_test_capture();
    let f = three_stacks("BetaRunTagged");

    let tagged = capture.count_events(|e| {
        e.op.as_deref() == Some("run_diffs")
            && e.fields.get(FIELD_RUN_ID).map(String::as_str) == Some(f.run.run_id.as_str())
    });
    assert_eq!(tagged, 2);
}

#[test]
fn test_outcome_serializes_failures_by_code() {
    let f = three_stacks("Beta");
    let value = serde_json::to_value(&f.run).unwrap();
    assert_eq!(
        value["stacks"]["Beta"]["failed"]["code"],
        "ERR_STACK_NOT_FOUND"
    );
    assert!(matches!(f.run.stacks["Alpha"], StackOutcome::Diffed(_)));
}
