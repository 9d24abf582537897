use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error bodies the backend sends. Our own views use `message`,
/// Django REST framework uses `detail` or `non_field_errors`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
    non_field_errors: Option<Vec<String>>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the human readable message out of an error body, falling back
    /// to the (truncated) raw body.
    fn extract_message(body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
            let message = parsed
                .message
                .or(parsed.detail)
                .or_else(|| parsed.non_field_errors.map(|errors| errors.join("; ")));
            if let Some(message) = message {
                return Self::truncate_body(&message);
            }
        }
        Self::truncate_body(body)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// The server supplied message, when the error carries one
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(m)
            | ApiError::AccessDenied(m)
            | ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::ServerError(m)
            | ApiError::InvalidResponse(m) => Some(m),
            ApiError::RateLimited | ApiError::NetworkError(_) => None,
        }
    }
}
