use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors loading or validating [`Settings`](crate::config::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Errors surfaced by session edits and export. The grouping engine itself
/// has no failure paths.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Invalid index: {0}")]
    InvalidIndex(usize),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Export failed: {0}")]
    Export(String),
}
