//! Error types for elaboration

use thiserror::Error;

/// Result type for elaboration
pub type Result<T> = std::result::Result<T, ElaborationError>;

/// Errors that abort an elaboration pass
///
/// Every error is fatal; no partial tree is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElaborationError {
    /// A reactor definition instantiates itself, directly or transitively
    #[error("Cyclic instantiation: {}", .cycle.join(" -> "))]
    CyclicInstantiation { cycle: Vec<String> },

    /// An instantiation names a reactor that has no definition
    #[error("Unresolved reactor '{reactor}' instantiated at {instance}")]
    UnresolvedReactor { instance: String, reactor: String },

    /// An expression references a parameter that does not exist or has no value
    #[error("Unresolved parameter '{parameter}' in {instance}{}", render_expr(.expr))]
    UnresolvedParameter {
        instance: String,
        parameter: String,
        expr: Option<String>,
    },

    /// A trigger was constructed without an owning reactor instance
    #[error("Cannot create trigger '{trigger}' with no parent reactor instance")]
    MissingParent { trigger: String },

    /// A resolved value cannot serve the role it is used in
    #[error("Type mismatch for {field} in {instance}: expected {expected}, found {found}")]
    TypeMismatch {
        instance: String,
        field: String,
        expected: &'static str,
        found: String,
    },

    /// The containment hierarchy is deeper than the configured limit
    #[error("Instance {instance} exceeds the maximum hierarchy depth of {limit}")]
    DepthLimitExceeded { instance: String, limit: usize },

    /// Two instances or triggers in one scope share a name
    #[error("Duplicate name '{name}' in {instance}")]
    DuplicateName { instance: String, name: String },

    /// The definitions handed to elaboration are not a usable program
    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    /// A loaded instance tree violates the arena layout
    #[error("Malformed instance tree: {0}")]
    MalformedTree(String),
}

impl From<relab_ast::AstError> for ElaborationError {
    fn from(err: relab_ast::AstError) -> Self {
        ElaborationError::InvalidProgram(err.to_string())
    }
}

fn render_expr(expr: &Option<String>) -> String {
    match expr {
        Some(e) => format!(" (in expression `{}`)", e),
        None => String::new(),
    }
}

/// Discriminant of an [`ElaborationError`], stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CyclicInstantiation,
    UnresolvedReactor,
    UnresolvedParameter,
    MissingParent,
    TypeMismatch,
    DepthLimitExceeded,
    DuplicateName,
    InvalidProgram,
    MalformedTree,
}

impl ElaborationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ElaborationError::CyclicInstantiation { .. } => ErrorKind::CyclicInstantiation,
            ElaborationError::UnresolvedReactor { .. } => ErrorKind::UnresolvedReactor,
            ElaborationError::UnresolvedParameter { .. } => ErrorKind::UnresolvedParameter,
            ElaborationError::MissingParent { .. } => ErrorKind::MissingParent,
            ElaborationError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ElaborationError::DepthLimitExceeded { .. } => ErrorKind::DepthLimitExceeded,
            ElaborationError::DuplicateName { .. } => ErrorKind::DuplicateName,
            ElaborationError::InvalidProgram(_) => ErrorKind::InvalidProgram,
            ElaborationError::MalformedTree(_) => ErrorKind::MalformedTree,
        }
    }

    /// Whether the error points at a defect in the elaborator rather than the program
    pub fn is_internal(&self) -> bool {
        matches!(self, ElaborationError::MissingParent { .. })
    }
}
