use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chaincast_core::dispatch::DispatchError;
use chaincast_core::error::CoreError;
use chaincast_core::ports::PersistenceError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent `{"error", "code"}`
/// JSON bodies. Dispatch failures additionally carry `"success": false` and
/// the failure `"kind"` so trigger callers can branch on it.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `chaincast_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The state store could not serve a read.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// A dispatch attempt failed after acquiring its lease.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Missing or wrong cron bearer token.
    #[error("Unauthorized")]
    Unauthorized,
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", core.to_string())
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            AppError::Persistence(err) => {
                tracing::error!(error = %err, "State store error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "State store unavailable".to_string(),
                )
            }

            AppError::Dispatch(err) => {
                let (status, code) = match err {
                    DispatchError::Generation { .. } => {
                        (StatusCode::BAD_GATEWAY, "GENERATION_FAILED")
                    }
                    DispatchError::Publish { .. } => (StatusCode::BAD_GATEWAY, "PUBLISH_FAILED"),
                    DispatchError::Persistence(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_FAILED")
                    }
                };
                let body = json!({
                    "success": false,
                    "kind": err.kind(),
                    "error": err.to_string(),
                    "code": code,
                });
                return (status, axum::Json(body)).into_response();
            }

            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing or invalid cron secret".to_string(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
