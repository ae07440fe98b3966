use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ingest::DecodeError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("File size exceeds maximum limit ({limit_mb} MB)")]
    UploadTooLarge { limit_mb: u64 },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Error processing document: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(DecodeError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
            Self::Decode(DecodeError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Decode(DecodeError::CorruptDocument(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn session_not_found() -> Self {
        Self::NotFound("Session not found. Please create a session first.".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(DecodeError::UnsupportedFormat("xlsx".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DecodeError::PayloadTooLarge { size_mb: 60.0, limit_mb: 50 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(DecodeError::CorruptDocument("bad zip".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::UploadTooLarge { limit_mb: 50 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(ApiError::session_not_found().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_message_carries_cause() {
        let err = ApiError::from(anyhow::anyhow!("disk full").context("writing report"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Error processing document: writing report: disk full");
    }
}
