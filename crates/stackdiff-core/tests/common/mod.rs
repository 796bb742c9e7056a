use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const ENV: &str = "aws://123456789012/us-east-1";

/// Builder for synthesized assembly directories on disk
#[allow(dead_code)]
pub struct AssemblyFixture {
    dir: TempDir,
    artifacts: Map<String, Value>,
}

#[allow(dead_code)]
impl AssemblyFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            artifacts: Map::new(),
        }
    }

    /// Top-level stack declared in the manifest, with its template on disk
    pub fn stack(mut self, id: &str, template: Value) -> Self {
        let file = format!("{id}.template.json");
        self.write(&file, &template);
        self.artifacts.insert(id.to_string(), stack_artifact(&file));
        self
    }

    /// Stack declared in the manifest whose template is never written
    pub fn declared_only(mut self, id: &str) -> Self {
        self.artifacts
            .insert(id.to_string(), stack_artifact(&format!("{id}.template.json")));
        self
    }

    /// Template in a subdirectory that the manifest does not mention
    pub fn nested(self, dir: &str, id: &str, template: Value) -> Self {
        self.write(&format!("{dir}/{id}.template.json"), &template);
        self
    }

    /// Stage sub-assembly with its own manifest
    pub fn stage(mut self, dir: &str, stack_id: &str, template: Value) -> Self {
        self.write(&format!("{dir}/{stack_id}.template.json"), &template);
        let mut artifacts = Map::new();
        artifacts.insert(
            stack_id.to_string(),
            stack_artifact(&format!("{stack_id}.template.json")),
        );
        self.write(
            &format!("{dir}/manifest.json"),
            &json!({"version": "36.0.0", "artifacts": artifacts}),
        );
        self.artifacts.insert(
            format!("{dir}-stage"),
            json!({"type": "cdk:cloud-assembly", "properties": {"directoryName": dir}}),
        );
        self
    }

    /// Write the manifest and hand over the directory
    pub fn build(self) -> TempDir {
        self.write(
            "manifest.json",
            &json!({"version": "36.0.0", "artifacts": self.artifacts}),
        );
        self.dir
    }

    fn write(&self, rel: &str, value: &Value) {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }
}

fn stack_artifact(template_file: &str) -> Value {
    json!({
        "type": "aws:cloudformation:stack",
        "environment": ENV,
        "properties": {"templateFile": template_file}
    })
}

/// Template with the given `Resources` section
#[allow(dead_code)]
pub fn template(resources: Value) -> Value {
    json!({ "Resources": resources })
}

#[allow(dead_code)]
pub fn bucket() -> Value {
    json!({"Type": "AWS::S3::Bucket"})
}

#[allow(dead_code)]
pub fn queue() -> Value {
    json!({"Type": "AWS::SQS::Queue"})
}

#[allow(dead_code)]
pub fn lambda(code_key: &str, timeout: u64) -> Value {
    json!({
        "Type": "AWS::Lambda::Function",
        "Properties": {
            "Code": {"S3Bucket": "cdk-hnb659fds-assets-123456789012-us-east-1", "S3Key": code_key},
            "Handler": "index.handler",
            "Timeout": timeout
        },
        "Metadata": {"aws:asset:path": format!("asset.{code_key}")}
    })
}

#[allow(dead_code)]
pub fn state_machine(prefix: &str, asset_key: &str) -> Value {
    json!({
        "Type": "AWS::StepFunctions::StateMachine",
        "Properties": {
            "DefinitionString": {"Fn::Join": ["", [
                prefix,
                format!("s3://cdk-hnb659fds-assets-123456789012-us-east-1/{asset_key}.json")
            ]]}
        }
    })
}

#[allow(dead_code)]
pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
