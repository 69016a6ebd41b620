use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::{client::GenerationError, extract::ExtractError};
use crate::utils::retry::RetryError;

/// Suggested client wait before retrying a generation that exhausted retries
pub const GENERATION_RETRY_AFTER_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    /// Missing and foreign-owned resources are reported identically
    #[error("{0} not found")]
    NotFoundOrNotOwned(&'static str),

    #[error("Expected {expected} answers but received {received}")]
    AnswerCountMismatch { expected: usize, received: usize },

    #[error("AI service is temporarily unavailable, retried {attempts} times")]
    UpstreamUnavailable { attempts: u32, last_error: String },

    #[error("AI service request failed: {0}")]
    UpstreamFailure(String),

    #[error("Failed to parse generated course content")]
    GeneratedContent(#[from] ExtractError),

    #[error("Generated course content is missing required keys: {}", .missing.join(", "))]
    InvalidGeneratedStructure { missing: Vec<String>, details: String },

    #[error("Failed to send email: {0}")]
    MailDelivery(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::AnswerCountMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFoundOrNotOwned(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UpstreamFailure(_)
            | AppError::GeneratedContent(_)
            | AppError::InvalidGeneratedStructure { .. }
            | AppError::MailDelivery(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::AnswerCountMismatch { expected, received } => {
                Some(json!({ "expected": expected, "received": received }))
            }
            AppError::UpstreamUnavailable { last_error, .. } => Some(json!(last_error)),
            AppError::UpstreamFailure(message) => Some(json!(message)),
            AppError::GeneratedContent(err) => Some(json!({
                "error": err.to_string(),
                "preview": err.preview(),
            })),
            AppError::InvalidGeneratedStructure { missing, details } => Some(json!({
                "missing": missing,
                "error": details,
            })),
            _ => None,
        }
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AppError::UpstreamUnavailable { .. } => Some(GENERATION_RETRY_AFTER_SECS),
            _ => None,
        }
    }
}

impl From<RetryError<GenerationError>> for AppError {
    fn from(err: RetryError<GenerationError>) -> Self {
        match err {
            RetryError::Exhausted {
                attempts,
                last_error,
            } => AppError::UpstreamUnavailable {
                attempts,
                last_error: last_error.to_string(),
            },
            RetryError::Aborted(err) => AppError::UpstreamFailure(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", errors))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let AppError::Internal(ref err) = self {
            tracing::error!("Internal error: {:#}", err);
        } else if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let mut body = json!({
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }
        let retry_after = self.retry_after_secs();
        if let Some(secs) = retry_after {
            body["retryAfterSeconds"] = json!(secs);
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
