//! Error types for the `try_*` operations

use rk_core::{DesignError, DesignId};

/// Result type for identity-layer operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Why an operation produced no result
///
/// Every variant is recoverable. Operations that treat misuse as fatal
/// document it under `# Panics` instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Handle is stale or its document is closed")]
    Stale,
    #[error("Document is busy with another operation")]
    Busy,
    #[error("Capability not available: {0}")]
    Unsupported(String),
    #[error("No item matches: {0}")]
    NotFound(String),
    #[error("Occurrence path is not a valid context for this entity")]
    Ineligible,
    #[error("Re-contexting proxies is disabled")]
    RecontextDisabled,
    #[error("Malformed entity token")]
    MalformedToken,
    #[error("Token belongs to design {0}")]
    ForeignDesign(DesignId),
    #[error("Host rejected the edit: {0}")]
    Host(#[from] DesignError),
    #[error("Invalid configuration: {0}")]
    Config(String),
}
