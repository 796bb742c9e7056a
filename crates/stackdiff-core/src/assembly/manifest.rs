//! Normalized assembly manifest schema.
//!
//! This is the document written into the staging area:
//!
//! ```json
//! {
//!   "version": "36.0.0",
//!   "artifacts": {
//!     "Root": {
//!       "type": "aws:cloudformation:stack",
//!       "environment": "aws://123456789012/us-east-1",
//!       "properties": {
//!         "id": "Root",
//!         "stackName": "Root",
//!         "environment": { "account": "123456789012", "region": "us-east-1" },
//!         "templateFile": "Root.template.json"
//!       }
//!     }
//!   }
//! }
//! ```

use crate::errors::{Result, StackDiffError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the manifest inside an assembly directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifact type of a deployable stack
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Artifact type of a nested (stage) assembly
pub const NESTED_ASSEMBLY_ARTIFACT_TYPE: &str = "cdk:cloud-assembly";

/// File name suffix of every stack template
pub const TEMPLATE_SUFFIX: &str = ".template.json";

const ENV_URI_PREFIX: &str = "aws://";

/// Target account and region of a stack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

impl Environment {
    /// Parse an `aws://<account>/<region>` environment string
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(ENV_URI_PREFIX)?;
        let (account, region) = rest.split_once('/')?;
        if account.is_empty() || region.is_empty() || region.contains('/') {
            return None;
        }
        Some(Self {
            account: account.to_string(),
            region: region.to_string(),
        })
    }

    /// Render as an `aws://<account>/<region>` string
    pub fn to_uri(&self) -> String {
        format!("{}{}/{}", ENV_URI_PREFIX, self.account, self.region)
    }
}

/// Properties block of a stack artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    pub id: String,
    pub stack_name: String,
    pub environment: Environment,
    /// Template path relative to the manifest's directory
    pub template_file: String,
}

/// One stack entry of the normalized manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactEntry {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
}

impl ArtifactEntry {
    /// Build a stack artifact; the stack name always equals its id
    pub fn stack(id: &str, environment: &Environment, template_file: impl Into<String>) -> Self {
        Self {
            artifact_type: STACK_ARTIFACT_TYPE.to_string(),
            environment: environment.to_uri(),
            properties: ArtifactProperties {
                id: id.to_string(),
                stack_name: id.to_string(),
                environment: environment.clone(),
                template_file: template_file.into(),
            },
        }
    }

    pub fn template_file(&self) -> &str {
        &self.properties.template_file
    }
}

/// Normalized manifest: every stack id maps to exactly one entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssemblyManifest {
    /// Copied verbatim from the source manifest
    pub version: serde_json::Value,
    pub artifacts: BTreeMap<String, ArtifactEntry>,
}

impl AssemblyManifest {
    /// Look up a stack entry by id
    pub fn stack(&self, id: &str) -> Option<&ArtifactEntry> {
        self.artifacts.get(id)
    }

    /// Stack ids in iteration order
    pub fn stack_ids(&self) -> Vec<String> {
        self.artifacts.keys().cloned().collect()
    }

    /// Serialize to the pretty-printed on-disk form
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| StackDiffError::Serialization {
            message: e.to_string(),
        })
    }

    /// Read a normalized manifest back from disk
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|_| StackDiffError::ManifestMissing {
            path: path.display().to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| StackDiffError::ManifestInvalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
