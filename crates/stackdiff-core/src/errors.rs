use crate::assembly::AssemblySide;
use thiserror::Error;

/// Result type alias using StackDiffError
pub type Result<T> = std::result::Result<T, StackDiffError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// handling, log assertions and the failure segments of the summary comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Assembly loading
    /// The base or head assembly could not be reconciled; aborts the run
    Reconciliation,

    // Per-stack
    /// The stack id is absent from the head or base manifest
    StackNotFound,
    /// The diff engine returned no result for the requested stack
    DiffUnavailable,

    // Sinks (logged, never fatal)
    Reporting,
    Labeling,

    // Generic
    InvalidInput,
    Io,
    Serialization,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Reconciliation => "ERR_RECONCILIATION",
            ExErrorKind::StackNotFound => "ERR_STACK_NOT_FOUND",
            ExErrorKind::DiffUnavailable => "ERR_DIFF_UNAVAILABLE",
            ExErrorKind::Reporting => "ERR_REPORTING",
            ExErrorKind::Labeling => "ERR_LABELING",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Per-stack failures are stored as `ExError` values in the run result so the
/// summary can render them next to successful stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    stack_id: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            stack_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add stack context
    pub fn with_stack_id(mut self, id: impl Into<String>) -> Self {
        self.stack_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the stack context, if any
    pub fn stack_id(&self) -> Option<&str> {
        self.stack_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the error must terminate the whole run
    pub fn is_run_fatal(&self) -> bool {
        self.kind == ExErrorKind::Reconciliation
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(stack_id) = &self.stack_id {
            write!(f, " (stack_id: {})", stack_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for stackdiff operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StackDiffError {
    // ===== Reconciliation Errors =====
    /// Source manifest file does not exist or cannot be read
    #[error("Manifest not found: {path}")]
    ManifestMissing { path: String },

    /// Source manifest exists but is not a usable manifest document
    #[error("Invalid manifest {path}: {reason}")]
    ManifestInvalid { path: String, reason: String },

    /// A template referenced by the manifest is not on disk
    #[error("Template for stack {stack_id} does not exist: {path}")]
    TemplateMissing { stack_id: String, path: String },

    /// Staging directory or link creation failed
    #[error("Staging failed during {op}: {reason}")]
    StagingIo { op: String, reason: String },

    /// `load` was called on a reader that already owns a staging area
    #[error("Assembly already loaded: {assembly}")]
    AlreadyLoaded { assembly: String },

    /// Accessor used before `load`
    #[error("Assembly not loaded: {assembly}")]
    NotLoaded { assembly: String },

    // ===== Per-stack Errors =====
    #[error("Stack {stack_id} not found in {side} assembly")]
    StackNotFound { stack_id: String, side: AssemblySide },

    #[error("No diff found for stack: {stack_id}")]
    DiffUnavailable { stack_id: String },

    #[error("Template {path} could not be parsed: {reason}")]
    TemplateInvalid { path: String, reason: String },

    // ===== Sink Errors =====
    #[error("Reporting failed: {reason}")]
    Reporting { reason: String },

    #[error("Labeling failed: {reason}")]
    Labeling { reason: String },

    /// Removing a label that is not present on the pull request
    #[error("Label not present: {label}")]
    LabelAbsent { label: String },

    // ===== Generic Errors =====
    #[error("Invalid skip property '{entry}': expected Type.Property")]
    InvalidSkipProperty { entry: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl StackDiffError {
    /// Classification of this error in the canonical taxonomy
    pub fn kind(&self) -> ExErrorKind {
        match self {
            StackDiffError::ManifestMissing { .. }
            | StackDiffError::ManifestInvalid { .. }
            | StackDiffError::TemplateMissing { .. }
            | StackDiffError::StagingIo { .. }
            | StackDiffError::AlreadyLoaded { .. }
            | StackDiffError::NotLoaded { .. } => ExErrorKind::Reconciliation,
            StackDiffError::StackNotFound { .. } => ExErrorKind::StackNotFound,
            StackDiffError::DiffUnavailable { .. } | StackDiffError::TemplateInvalid { .. } => {
                ExErrorKind::DiffUnavailable
            }
            StackDiffError::Reporting { .. } => ExErrorKind::Reporting,
            StackDiffError::Labeling { .. } | StackDiffError::LabelAbsent { .. } => {
                ExErrorKind::Labeling
            }
            StackDiffError::InvalidSkipProperty { .. } => ExErrorKind::InvalidInput,
            StackDiffError::Serialization { .. } => ExErrorKind::Serialization,
        }
    }
}

impl From<StackDiffError> for ExError {
    fn from(err: StackDiffError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            StackDiffError::ManifestMissing { .. } | StackDiffError::ManifestInvalid { .. } => {
                ExError::new(kind)
                    .with_op("read_manifest")
                    .with_message(message)
            }
            StackDiffError::TemplateMissing { stack_id, .. } => ExError::new(kind)
                .with_op("link_templates")
                .with_stack_id(stack_id)
                .with_message(message),
            StackDiffError::StagingIo { op, .. } => {
                ExError::new(kind).with_op(op).with_message(message)
            }
            StackDiffError::AlreadyLoaded { .. } | StackDiffError::NotLoaded { .. } => {
                ExError::new(kind).with_op("load").with_message(message)
            }
            StackDiffError::StackNotFound { stack_id, .. } => ExError::new(kind)
                .with_op("diff_stack")
                .with_stack_id(stack_id)
                .with_message(message),
            StackDiffError::DiffUnavailable { stack_id } => ExError::new(kind)
                .with_op("diff_stack")
                .with_stack_id(stack_id)
                .with_message(message),
            StackDiffError::TemplateInvalid { .. } => ExError::new(kind)
                .with_op("diff_templates")
                .with_message(message),
            StackDiffError::Reporting { .. } => ExError::new(kind)
                .with_op("publish_comments")
                .with_message(message),
            StackDiffError::Labeling { .. } | StackDiffError::LabelAbsent { .. } => {
                ExError::new(kind)
                    .with_op("apply_labels")
                    .with_message(message)
            }
            StackDiffError::InvalidSkipProperty { .. } => ExError::new(kind)
                .with_op("parse_skip_properties")
                .with_message(message),
            StackDiffError::Serialization { .. } => ExError::new(kind).with_message(message),
        }
    }
}

/// Create a staging I/O error
pub fn staging_io(op: &str, err: std::io::Error) -> StackDiffError {
    StackDiffError::StagingIo {
        op: op.to_string(),
        reason: err.to_string(),
    }
}
