//! Error type for asset storage operations

use thiserror::Error;

/// Errors raised by the sandbox and the staging store.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Upload rejected before any I/O: empty body or unsupported content type.
    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    /// A path escaped the configured root, or an input contained traversal
    /// segments. Always fatal for the operation.
    #[error("path violation: {0}")]
    PathViolation(String),

    /// Unrecoverable filesystem error.
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssetError>;
