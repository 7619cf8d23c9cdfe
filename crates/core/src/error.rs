/// Domain error taxonomy surfaced to callers of the write path.
///
/// Optimistic-concurrency conflicts are not errors: a version
/// mismatch is a normal outcome of a document write, not a failure.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The retry budget for a contended resource was exhausted. Transient;
    /// the caller may retry the whole operation.
    #[error("Lock timeout: could not acquire '{resource_id}' after {attempts} attempts")]
    LockTimeout { resource_id: String, attempts: u32 },

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::LockTimeout { .. })
    }
}
