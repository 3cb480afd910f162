//! Error types for backend adapters

use crate::util::serialization::{HttpErrorResponse, RequestFailure};
use serde_json::Value;
use thiserror::Error;

/// Errors returned by backend adapters
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OccError {
    /// The backend answered with a non-success status
    #[error("HTTP {status} {status_text} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Reason phrase
        status_text: String,
        /// Requested URL
        url: String,
        /// Response body (JSON if it parsed, text otherwise)
        body: Value,
    },

    /// No response was received
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("Failed to decode response from {url}: {message}")]
    Decode {
        /// Requested URL
        url: String,
        /// Decoder message
        message: String,
    },

    /// An endpoint URL could not be built
    #[error("Invalid endpoint URL {url}: {message}")]
    InvalidUrl {
        /// The URL that failed to parse
        url: String,
        /// Parser message
        message: String,
    },
}

impl OccError {
    /// HTTP status of the failure, if the backend answered
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } | Self::InvalidUrl { .. } => None,
        }
    }
}

impl From<OccError> for RequestFailure {
    fn from(error: OccError) -> Self {
        match error {
            OccError::Status {
                status,
                status_text,
                url,
                body,
            } => Self::Http(HttpErrorResponse {
                message: format!("Http failure response for {url}: {status} {status_text}"),
                error: body,
                status,
                status_text,
                url: Some(url),
            }),
            // A request that never got an answer is reported like a browser
            // reports it: status 0, "Unknown Error".
            OccError::Transport { url, message } => Self::Http(HttpErrorResponse {
                message: format!("Http failure response for {url}: 0 Unknown Error"),
                error: Value::String(message),
                status: 0,
                status_text: "Unknown Error".to_string(),
                url: Some(url),
            }),
            OccError::Decode { url, message } => Self::Native {
                name: "DecodeError".to_string(),
                message,
                stack: Some(url),
            },
            OccError::InvalidUrl { url, message } => Self::Native {
                name: "InvalidUrlError".to_string(),
                message,
                stack: Some(url),
            },
        }
    }
}
