use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure kinds surfaced by the ingestion pipeline
#[derive(Debug, Error)]
pub enum WardrobeError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Ownership mismatch. Carries no detail about the record itself.
    #[error("Not authorized to access this item")]
    NotAuthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Segmentation service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid segmentation response: {0}")]
    UpstreamInvalidResponse(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Item not found: {0}")]
    NotFound(String),
}

impl WardrobeError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            WardrobeError::Unauthenticated(_) => "unauthenticated",
            WardrobeError::NotAuthorized => "not_authorized",
            WardrobeError::InvalidInput(_) => "invalid_input",
            WardrobeError::UpstreamUnavailable(_) => "upstream_unavailable",
            WardrobeError::UpstreamInvalidResponse(_) => "upstream_invalid_response",
            WardrobeError::StorageFailure(_) => "storage_failure",
            WardrobeError::NotFound(_) => "not_found",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WardrobeError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            WardrobeError::NotAuthorized => StatusCode::FORBIDDEN,
            WardrobeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WardrobeError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            WardrobeError::UpstreamInvalidResponse(_) => StatusCode::BAD_GATEWAY,
            WardrobeError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WardrobeError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Wrap an adapter error, keeping its context chain in the message
    pub fn storage(err: anyhow::Error) -> Self {
        WardrobeError::StorageFailure(format!("{:#}", err))
    }
}

pub type WardrobeResult<T> = Result<T, WardrobeError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(kind: &'static str, message: &str) -> Self {
        Self {
            ok: false,
            error: ErrorBody {
                kind,
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for WardrobeError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.kind(), &self.to_string());
        (self.status_code(), Json(body)).into_response()
    }
}
