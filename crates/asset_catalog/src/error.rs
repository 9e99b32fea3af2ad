//! Error type shared by every catalog operation.
//!
//! The `Display` text of each variant is user-facing: it is what a browser
//! shows as the tooltip when an operation is refused. Empty query results are
//! never errors; they are reported through the compiled filter instead.

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Target path is outside the mounted roots or the permission lists.
    #[error("{0}")]
    ScopeViolation(String),

    /// An item was handed to a data source that does not own it, or carries the
    /// wrong type for the requested operation.
    #[error("Inconsistent payload: {0}")]
    InconsistentPayload(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The asset operations collaborator refused the request.
    #[error("{0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<serde_json::Error> for CatalogError {
    fn from(error: serde_json::Error) -> Self {
        Self::Config(error.to_string())
    }
}
