//! Global messages: confirmations, errors and infos shown to the shopper.
//!
//! Messages are kept per kind in the order they were added. Adding a text
//! that is already shown for the same kind is a no-op. Confirmation and info
//! messages expire after the configured timeout.

use crate::util::serialization::SerializableError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub mod reducer;
pub mod service;

pub use reducer::{GlobalMessageAction, GlobalMessageEnvironment, GlobalMessageReducer};
pub use service::GlobalMessageService;

/// Message text: a translation key or raw text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Translatable {
    /// Translation key, e.g. `forgottenPassword.passwordResetEmailSent`
    Key(String),
    /// Text shown as is
    Raw(String),
}

impl Translatable {
    /// A translation key
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Raw text
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }
}

/// Kind of message
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GlobalMessageType {
    /// Operation succeeded
    #[serde(rename = "MSG_TYPE_CONFIRMATION")]
    Confirmation,
    /// Operation failed
    #[serde(rename = "MSG_TYPE_ERROR")]
    Error,
    /// Informational
    #[serde(rename = "MSG_TYPE_INFO")]
    Info,
}

impl GlobalMessageType {
    /// Short name for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A message to show
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMessage {
    /// What to show
    pub text: Translatable,
    /// How to show it
    #[serde(rename = "type")]
    pub kind: GlobalMessageType,
}

impl GlobalMessage {
    /// Confirmation message with a translation key
    #[must_use]
    pub fn confirmation(key: impl Into<String>) -> Self {
        Self {
            text: Translatable::key(key),
            kind: GlobalMessageType::Confirmation,
        }
    }

    /// Error message with raw text
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: Translatable::raw(text),
            kind: GlobalMessageType::Error,
        }
    }

    /// Error message for a failed backend call
    ///
    /// The first message of an OCC `errors` body is shown as is; without one
    /// the text is the `httpHandlers.*` key for the status.
    #[must_use]
    pub fn from_failure(failure: &SerializableError) -> Self {
        let text = match failure {
            SerializableError::Http(http) => backend_message(&http.error).map_or_else(
                || Translatable::key(http_handler_key(http.status)),
                Translatable::raw,
            ),
            SerializableError::Native(_)
            | SerializableError::Unknown(_)
            | SerializableError::Raw(_) => Translatable::key(http_handler_key(0)),
        };

        Self {
            text,
            kind: GlobalMessageType::Error,
        }
    }
}

/// First `errors[].message` of an OCC error body, which may arrive JSON-encoded
fn backend_message(body: &Value) -> Option<String> {
    let decoded;
    let body = match body {
        Value::String(text) => {
            decoded = serde_json::from_str::<Value>(text).ok()?;
            &decoded
        },
        other => other,
    };

    body.get("errors")?
        .get(0)?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

const fn http_handler_key(status: u16) -> &'static str {
    match status {
        400 => "httpHandlers.badRequest",
        403 => "httpHandlers.forbidden",
        404 => "httpHandlers.notFound",
        409 => "httpHandlers.conflict",
        502 => "httpHandlers.badGateway",
        504 => "httpHandlers.gatewayTimeout",
        500..=599 => "httpHandlers.internalServerError",
        _ => "httpHandlers.unknownError",
    }
}

/// A message that is being shown
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Id used to expire the message
    pub id: u64,
    /// What is shown
    pub text: Translatable,
    /// When the message was added
    pub added_at: DateTime<Utc>,
}

/// Messages currently shown, per kind
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalMessageState {
    entities: BTreeMap<GlobalMessageType, Vec<StoredMessage>>,
    next_id: u64,
}

impl GlobalMessageState {
    /// No messages
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a message, returning its id
    ///
    /// Returns `None` when the same text is already shown for that kind.
    pub fn add(&mut self, message: GlobalMessage, now: DateTime<Utc>) -> Option<u64> {
        let shown = self.entities.entry(message.kind).or_default();
        if shown.iter().any(|stored| stored.text == message.text) {
            return None;
        }

        self.next_id += 1;
        shown.push(StoredMessage {
            id: self.next_id,
            text: message.text,
            added_at: now,
        });
        Some(self.next_id)
    }

    /// Remove the message at `index` of a kind
    pub fn remove(&mut self, kind: GlobalMessageType, index: usize) -> Option<StoredMessage> {
        let shown = self.entities.get_mut(&kind)?;
        (index < shown.len()).then(|| shown.remove(index))
    }

    /// Remove a message by id; a no-op when it is already gone
    pub fn remove_by_id(&mut self, kind: GlobalMessageType, id: u64) -> bool {
        let Some(shown) = self.entities.get_mut(&kind) else {
            return false;
        };
        let before = shown.len();
        shown.retain(|stored| stored.id != id);
        shown.len() != before
    }

    /// Remove every message of a kind
    pub fn clear(&mut self, kind: GlobalMessageType) {
        self.entities.remove(&kind);
    }

    /// Messages of a kind, oldest first
    #[must_use]
    pub fn messages(&self, kind: GlobalMessageType) -> &[StoredMessage] {
        self.entities.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Number of messages over all kinds
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }

    /// Whether nothing is shown
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
