//! Error types for loading syntax trees

use thiserror::Error;

/// Result type for syntax tree operations
pub type Result<T> = std::result::Result<T, AstError>;

/// Errors that can occur while loading or indexing a program
#[derive(Debug, Error)]
pub enum AstError {
    /// I/O error reading a design file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML decoding error
    #[error("Failed to parse TOML design: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON decoding error
    #[error("Failed to parse JSON design: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension does not name a supported format
    #[error("Unsupported design format: {0}")]
    UnsupportedFormat(String),

    /// Two reactor definitions share a name
    #[error("Duplicate reactor definition: {0}")]
    DuplicateReactor(String),
}
