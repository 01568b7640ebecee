use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Request-fatal failures. Asset faults never reach this type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Persistence(std::io::Error),
    Render(String),
    Delivery(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Persistence(err) => write!(f, "Failed to persist document: {err}"),
            AppError::Render(msg) => write!(f, "Failed to render document: {msg}"),
            AppError::Delivery(msg) => write!(f, "Failed to deliver email: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Persistence(err) => {
                tracing::error!("Persistence error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Render(msg) => {
                tracing::error!("Render error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Delivery(msg) => {
                tracing::error!("Delivery error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Persistence(err)
    }
}
