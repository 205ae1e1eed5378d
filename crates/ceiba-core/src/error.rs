use thiserror::Error;

/// Canonical result for the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Number of columns doesn't match: {source_count} in source, {result} in result")]
    ColumnCountMismatch { source_count: usize, result: usize },

    #[error("Cannot find column '{0}' in source stream")]
    NoSuchColumn(String),

    #[error("Illegal column: {0}")]
    IllegalColumn(String),

    // Raised by the function runtime (overload resolution, execution).
    #[error("Function error: {0}")]
    Execution(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}
