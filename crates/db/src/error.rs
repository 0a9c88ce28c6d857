use jigprint_core::error::CoreError;

/// Error from a multi-step repository operation.
///
/// Domain rejections (invalid transition, not editable, not found) come
/// back as [`RepoError::Core`]; the transaction is rolled back on drop.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
