use thiserror::Error;

/// Failures raised by a [`crate::store::DocumentStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store backend error: {0}")]
    Backend(String),

    #[error("failed to (de)serialize stored document {id}: {details}")]
    Serialization { id: String, details: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Errors surfaced by the synchronization service.
///
/// Provider failures never show up here: they are contained per
/// (field, language) pair inside the orchestrator.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown document: {0}")]
    UnknownDocument(String),

    #[error("invalid change notification: {0}")]
    InvalidNotification(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
