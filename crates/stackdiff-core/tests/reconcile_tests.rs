#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{bucket, queue, read_json, template, AssemblyFixture};
use stackdiff_core::assembly::{reconcile, AssemblyReader};
use stackdiff_core::errors::{ExError, ExErrorKind, StackDiffError};

#[test]
fn test_top_level_stacks_are_addressable() {
    let src = AssemblyFixture::new()
        .stack("Api", template(serde_json::json!({"Queue": queue()})))
        .stack("Web", template(serde_json::json!({"Bucket": bucket()})))
        .build();

    let reader = reconcile(src.path()).unwrap();
    assert_eq!(reader.stack_ids().unwrap(), vec!["Api", "Web"]);

    let entry = reader.stack("Api").unwrap().unwrap();
    assert_eq!(entry.properties.stack_name, "Api");
    assert_eq!(entry.environment, "aws://123456789012/us-east-1");
    assert_eq!(entry.properties.environment.region, "us-east-1");

    let staged = reader.template_path("Api").unwrap().unwrap();
    assert!(staged.starts_with(reader.staging_dir().unwrap()));
    assert!(read_json(&staged)["Resources"]["Queue"].is_object());
}

#[test]
fn test_nested_stack_registered_under_its_own_id() {
    let src = AssemblyFixture::new()
        .stack("Root", template(serde_json::json!({"Bucket": bucket()})))
        .nested(
            "assembly-Root-Nested",
            "NestedStack123",
            template(serde_json::json!({"Queue": queue()})),
        )
        .nested(
            "assembly-Root-Nested",
            "NestedStack456",
            template(serde_json::json!({})),
        )
        .build();

    let reader = reconcile(src.path()).unwrap();
    let ids = reader.stack_ids().unwrap();
    assert!(ids.contains(&"Root".to_string()));
    assert!(ids.contains(&"NestedStack123".to_string()));
    assert!(ids.contains(&"NestedStack456".to_string()));

    let nested = reader.stack("NestedStack123").unwrap().unwrap();
    assert_eq!(
        nested.template_file(),
        "assembly-Root-Nested/NestedStack123.template.json"
    );
    let staged = reader.template_path("NestedStack123").unwrap().unwrap();
    assert!(read_json(&staged)["Resources"]["Queue"].is_object());

    // The parent keeps its own template.
    let root = reader.template_path("Root").unwrap().unwrap();
    assert!(read_json(&root)["Resources"]["Bucket"].is_object());
}

#[test]
fn test_single_nested_template_is_not_registered() {
    let src = AssemblyFixture::new()
        .stack("Root", template(serde_json::json!({})))
        .nested("assembly-Root-Nested", "Lonely", template(serde_json::json!({})))
        .build();

    let reader = reconcile(src.path()).unwrap();
    assert_eq!(reader.stack_ids().unwrap(), vec!["Root"]);
}

#[test]
fn test_stage_assembly_stacks_are_discovered() {
    let src = AssemblyFixture::new()
        .stack("Root", template(serde_json::json!({})))
        .stage(
            "assembly-Prod",
            "ProdApi",
            template(serde_json::json!({"Queue": queue()})),
        )
        .build();

    let reader = reconcile(src.path()).unwrap();
    let staged = reader.template_path("ProdApi").unwrap().unwrap();
    assert!(staged.ends_with("assembly-Prod/ProdApi.template.json"));
    assert!(read_json(&staged)["Resources"]["Queue"].is_object());
}

#[test]
fn test_reconcile_twice_yields_equivalent_manifests() {
    let src = AssemblyFixture::new()
        .stack("Root", template(serde_json::json!({"Bucket": bucket()})))
        .nested("assembly-Root-A", "ChildA", template(serde_json::json!({})))
        .nested("assembly-Root-A", "ChildB", template(serde_json::json!({})))
        .build();

    let first = reconcile(src.path()).unwrap();
    let second = reconcile(src.path()).unwrap();

    assert_ne!(first.staging_dir().unwrap(), second.staging_dir().unwrap());
    assert_eq!(
        first.manifest().unwrap().artifacts,
        second.manifest().unwrap().artifacts
    );
    assert_eq!(first.manifest().unwrap().version, "36.0.0");
}

#[test]
fn test_staged_manifest_is_written_to_disk() {
    let src = AssemblyFixture::new()
        .stack("Root", template(serde_json::json!({})))
        .build();
    let reader = reconcile(src.path()).unwrap();

    let on_disk = read_json(&reader.staging_dir().unwrap().join("manifest.json"));
    assert_eq!(on_disk["version"], "36.0.0");
    assert_eq!(
        on_disk["artifacts"]["Root"]["properties"]["templateFile"],
        "Root.template.json"
    );
    assert_eq!(on_disk["artifacts"]["Root"]["type"], "aws:cloudformation:stack");
}

#[test]
fn test_missing_template_fails_reconciliation() {
    let src = AssemblyFixture::new()
        .stack("Root", template(serde_json::json!({})))
        .declared_only("Gone")
        .build();

    let err = reconcile(src.path()).unwrap_err();
    assert!(matches!(err, StackDiffError::TemplateMissing { ref stack_id, .. } if stack_id == "Gone"));

    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::Reconciliation);
    assert!(ex.is_run_fatal());
}

#[test]
fn test_malformed_manifest_fails_reconciliation() {
    let src = tempfile::TempDir::new().unwrap();
    std::fs::write(src.path().join("manifest.json"), "[1, 2").unwrap();
    let err = reconcile(src.path()).unwrap_err();
    assert!(matches!(err, StackDiffError::ManifestInvalid { .. }));
}

#[test]
fn test_second_load_is_rejected() {
    let src = AssemblyFixture::new()
        .stack("Root", template(serde_json::json!({})))
        .build();
    let mut reader = AssemblyReader::new(src.path());
    reader.load().unwrap();
    let err = reader.load().unwrap_err();
    assert!(matches!(err, StackDiffError::AlreadyLoaded { .. }));
}

fn assembly_with_template_file(dir: &std::path::Path, template_file: &str) {
    std::fs::create_dir_all(dir).unwrap();
    let manifest = serde_json::json!({
        "version": "36.0.0",
        "artifacts": {
            "Escaped": {
                "type": "aws:cloudformation:stack",
                "environment": "aws://123456789012/us-east-1",
                "properties": {"templateFile": template_file}
            }
        }
    });
    std::fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
}

#[test]
fn test_parent_relative_template_file_is_rejected() {
    let outer = tempfile::TempDir::new().unwrap();
    let assembly = outer.path().join("cdk.out");
    std::fs::write(
        outer.path().join("EscapedRelative.template.json"),
        r#"{"Resources":{}}"#,
    )
    .unwrap();
    assembly_with_template_file(&assembly, "../EscapedRelative.template.json");

    let err = reconcile(&assembly).unwrap_err();
    assert!(matches!(err, StackDiffError::ManifestInvalid { .. }));
    assert!(ExError::from(err).is_run_fatal());

    // Staging areas live in the system temp dir; nothing may be linked beside them.
    let stray = std::env::temp_dir().join("EscapedRelative.template.json");
    assert!(std::fs::symlink_metadata(stray).is_err());
}

#[test]
fn test_absolute_template_file_is_rejected() {
    let outer = tempfile::TempDir::new().unwrap();
    let elsewhere = outer.path().join("EscapedAbsolute.template.json");
    std::fs::write(&elsewhere, r#"{"Resources":{}}"#).unwrap();
    let assembly = outer.path().join("cdk.out");
    assembly_with_template_file(&assembly, elsewhere.to_str().unwrap());

    let err = reconcile(&assembly).unwrap_err();
    assert!(matches!(err, StackDiffError::ManifestInvalid { .. }));
}

#[test]
fn test_staged_template_paths_stay_inside_staging() {
    let src = AssemblyFixture::new()
        .stack("Api", template(serde_json::json!({"Queue": queue()})))
        .build();
    let reader = reconcile(src.path()).unwrap();
    let staging = reader.staging_dir().unwrap().canonicalize().unwrap();
    let staged = reader.template_path("Api").unwrap().unwrap();
    assert!(staged.parent().unwrap().canonicalize().unwrap().starts_with(&staging));
}
