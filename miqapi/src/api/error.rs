use thiserror::Error;

use super::common::ApiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Action `{action}` rejected entry {index}: {message}")]
    ActionFailed {
        action: String,
        index: usize,
        message: String,
    },

    #[error("No {collection} record named `{name}`")]
    NoSuchRecord { collection: String, name: String },
}

impl ApiError {
    /// HTTP status carried by an API error response, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::AuthError => Some(401),
            ApiError::RateLimited => Some(429),
            _ => None,
        }
    }

    /// Server-side error class (`klass`) reported in the error body.
    pub fn klass(&self) -> Option<&str> {
        match self {
            ApiError::ApiError {
                details: Some(details),
                ..
            } => details.klass.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
