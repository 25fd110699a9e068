use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coupon_sdk::SdkError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IssuerError>;

#[derive(Error, Debug)]
pub enum IssuerError {
    #[error("Key load failure: {0}")]
    KeyLoadFailure(String),

    #[error("Failed to load allowlist {path}: {reason}")]
    AllowlistLoad { path: String, reason: String },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SdkError> for IssuerError {
    fn from(e: SdkError) -> Self {
        match e {
            SdkError::KeyLoadFailure(msg) => IssuerError::KeyLoadFailure(msg),
            SdkError::MalformedInput(msg) => IssuerError::MalformedInput(msg),
            SdkError::IntegrityMismatch { .. } => IssuerError::Integrity(e.to_string()),
            other => IssuerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        let status = match &self {
            IssuerError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            IssuerError::NotFound(_) => StatusCode::NOT_FOUND,
            IssuerError::KeyLoadFailure(_)
            | IssuerError::AllowlistLoad { .. }
            | IssuerError::Integrity(_)
            | IssuerError::Io(_)
            | IssuerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
