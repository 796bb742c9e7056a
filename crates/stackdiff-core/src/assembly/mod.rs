//! Assembly reconciliation.
//!
//! A synthesized assembly directory may spread its stacks over the root,
//! stage sub-assemblies and nested-stack output folders, with a manifest that
//! only describes part of that layout. Reconciliation rebuilds one flat
//! manifest in which every stack (top-level or nested) is addressable by id,
//! and materializes it with the templates in a private staging directory.
//!
//! ## Entry point
//!
//! ```ignore
//! use stackdiff_core::assembly::reconcile;
//!
//! let head = reconcile("cdk.out")?;
//! for id in head.stack_ids()? {
//!     println!("{id} -> {:?}", head.template_path(&id)?);
//! }
//! ```

pub mod discovery;
pub mod manifest;
pub mod reader;
pub mod staging;

pub use manifest::{ArtifactEntry, ArtifactProperties, AssemblyManifest, Environment};
pub use reader::{reconcile, AssemblyReader};
pub use staging::StagingArea;

use serde::{Deserialize, Serialize};

/// Which side of the comparison an assembly belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblySide {
    Base,
    Head,
}

impl std::fmt::Display for AssemblySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssemblySide::Base => write!(f, "base"),
            AssemblySide::Head => write!(f, "head"),
        }
    }
}
