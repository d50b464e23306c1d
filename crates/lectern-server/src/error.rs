use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use lectern_core::{CoreError, ErrorKind};

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    /// The blocking worker running the operation panicked or was cancelled.
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError::Core(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Store => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ConsistencyGap => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Core(e) => {
                let kind = e.kind();
                let status = status_for(kind);
                if status.is_server_error() {
                    tracing::warn!("Request failed: {}", e);
                }
                (
                    status,
                    ErrorBody {
                        error: e.to_string(),
                        kind: kind.as_str(),
                    },
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Worker failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: msg,
                        kind: "internal",
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Run a synchronous engine call on the blocking pool.
pub async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}
