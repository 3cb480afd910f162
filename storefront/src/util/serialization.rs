//! Turning request failures into plain data that can live in state.
//!
//! Failures are stored on feature state and broadcast with actions, so they
//! must be cloneable, comparable and serializable. [`make_error_serializable`]
//! is the single place where a raw failure becomes such a value.

use serde::Serialize;
use serde_json::Value;

/// Value of the `error` field for failures that carry no usable information
pub const UNKNOWN_ERROR: &str = "unknown error";

/// A failed HTTP exchange
#[derive(Clone, Debug, PartialEq)]
pub struct HttpErrorResponse {
    /// Human-readable summary of the failure
    pub message: String,
    /// Response body: JSON when the backend sent JSON, text otherwise
    pub error: Value,
    /// HTTP status, 0 when no response was received
    pub status: u16,
    /// Reason phrase of the status
    pub status_text: String,
    /// Requested URL
    pub url: Option<String>,
}

/// Anything a backend call can fail with
#[derive(Clone, Debug, PartialEq)]
pub enum RequestFailure {
    /// A program error (decoding, invalid input, ...)
    Native {
        /// Error kind name
        name: String,
        /// Error message
        message: String,
        /// Diagnostic detail, if any
        stack: Option<String>,
    },
    /// An HTTP error response
    Http(HttpErrorResponse),
    /// Some other value reported as a failure
    Value(Value),
}

/// Serializable form of a native error
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorModel {
    /// Error message
    pub message: String,
    /// Error kind name
    #[serde(rename = "type")]
    pub kind: String,
    /// Diagnostic detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Serializable form of an HTTP error
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpErrorModel {
    /// Human-readable summary
    pub message: String,
    /// Response body; object bodies are JSON-encoded into a string
    pub error: Value,
    /// HTTP status
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Requested URL
    pub url: Option<String>,
}

/// The sentinel stored for failures that are opaque objects
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnknownError {
    /// Always [`UNKNOWN_ERROR`]
    pub error: String,
}

impl Default for UnknownError {
    fn default() -> Self {
        Self {
            error: UNKNOWN_ERROR.to_string(),
        }
    }
}

/// A failure in a form fit for state, actions and logs
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SerializableError {
    /// `{message, error, status, statusText, url}`
    Http(HttpErrorModel),
    /// `{message, type, reason}`
    Native(ErrorModel),
    /// `{error: "unknown error"}`
    Unknown(UnknownError),
    /// A non-object value, passed through unchanged
    Raw(Value),
}

impl SerializableError {
    /// HTTP status of the failure, if it was an HTTP error
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http(http) => Some(http.status),
            Self::Native(_) | Self::Unknown(_) | Self::Raw(_) => None,
        }
    }

    /// The JSON document of this error
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl std::fmt::Display for SerializableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Convert a request failure into its serializable form
///
/// - native errors keep their message, kind and diagnostic detail
/// - HTTP errors keep message, status and url; an object body is JSON-encoded
///   into a string, any other body is kept as is
/// - any other JSON object becomes the `{error: "unknown error"}` sentinel
/// - everything else (strings, numbers, arrays, null) passes through
#[must_use]
pub fn make_error_serializable(failure: &RequestFailure) -> SerializableError {
    match failure {
        RequestFailure::Native {
            name,
            message,
            stack,
        } => SerializableError::Native(ErrorModel {
            message: message.clone(),
            kind: name.clone(),
            reason: stack.clone(),
        }),
        RequestFailure::Http(response) => {
            let error = match &response.error {
                body @ Value::Object(_) => Value::String(body.to_string()),
                body => body.clone(),
            };

            SerializableError::Http(HttpErrorModel {
                message: response.message.clone(),
                error,
                status: response.status,
                status_text: response.status_text.clone(),
                url: response.url.clone(),
            })
        },
        RequestFailure::Value(Value::Object(_)) => SerializableError::Unknown(UnknownError::default()),
        RequestFailure::Value(value) => SerializableError::Raw(value.clone()),
    }
}
