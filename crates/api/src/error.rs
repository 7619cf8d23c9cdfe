use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tutorlog_core::error::CoreError;

/// Application-level error type for HTTP handlers and socket replies.
///
/// Wraps [`CoreError`] for domain errors and adds transport-specific variants.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `tutorlog_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A malformed request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Status, machine-readable code and client-facing message.
    ///
    /// Internal details are logged here and replaced by a generic message.
    pub fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::LockTimeout { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "LOCK_TIMEOUT",
                    "The resource is busy, please retry".to_string(),
                ),
                CoreError::Store(msg) => {
                    tracing::error!(error = %msg, "Storage error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Transport errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.classify();

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeout_is_service_unavailable() {
        let err = AppError::from(CoreError::LockTimeout {
            resource_id: "record:update:r1".into(),
            attempts: 10,
        });
        let (status, code, _) = err.classify();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "LOCK_TIMEOUT");
    }

    #[test]
    fn store_errors_are_not_leaked() {
        let err = AppError::from(CoreError::Store("/var/data/records.json: disk full".into()));
        let (status, code, message) = err.classify();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
        assert!(!message.contains("disk"));
    }

    #[test]
    fn domain_errors_map_to_codes() {
        let cases = [
            (CoreError::Validation("x".into()), "VALIDATION_ERROR"),
            (CoreError::Forbidden("x".into()), "FORBIDDEN"),
            (CoreError::Unauthorized("x".into()), "UNAUTHORIZED"),
            (
                CoreError::NotFound {
                    entity: "record",
                    id: "r1".into(),
                },
                "NOT_FOUND",
            ),
        ];
        for (core, expected) in cases {
            assert_eq!(AppError::from(core).classify().1, expected);
        }
    }
}
