//! Error type for catalog write operations

use thiserror::Error;

use crate::repository::StorageError;
use vitrine_assets::AssetError;

/// Errors surfaced to the caller of a catalog write operation.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Rejected input (negative price or stock). No I/O was performed.
    #[error("validation: {0}")]
    Validation(String),

    /// Staging or sandbox failure; any in-flight transaction must roll back.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Repository failure inside the transaction.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
