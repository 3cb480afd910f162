//! Global message facade

use super::reducer::{GlobalMessageAction, GlobalMessageEnvironment, GlobalMessageReducer};
use super::{GlobalMessage, GlobalMessageState, GlobalMessageType, StoredMessage};
use std::time::Duration;
use storefront_runtime::{Store, StoreError};

type MessageStore =
    Store<GlobalMessageState, GlobalMessageAction, GlobalMessageEnvironment, GlobalMessageReducer>;

/// Shows and removes global messages
///
/// Cloning is cheap; clones share the same messages.
#[derive(Clone)]
pub struct GlobalMessageService {
    store: MessageStore,
}

impl GlobalMessageService {
    /// Create a service with no messages
    #[must_use]
    pub fn new(environment: GlobalMessageEnvironment) -> Self {
        Self {
            store: Store::new(GlobalMessageState::new(), GlobalMessageReducer, environment),
        }
    }

    /// Show a message
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn add(&self, message: GlobalMessage) -> Result<(), StoreError> {
        self.store
            .send(GlobalMessageAction::Add(message))
            .await
            .map(|_| ())
    }

    /// Remove the message at `index` of a kind
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn remove(&self, kind: GlobalMessageType, index: usize) -> Result<(), StoreError> {
        self.store
            .send(GlobalMessageAction::Remove { kind, index })
            .await
            .map(|_| ())
    }

    /// Remove every message of a kind
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn clear(&self, kind: GlobalMessageType) -> Result<(), StoreError> {
        self.store
            .send(GlobalMessageAction::Clear { kind })
            .await
            .map(|_| ())
    }

    /// Messages of a kind, oldest first
    pub async fn get(&self, kind: GlobalMessageType) -> Vec<StoredMessage> {
        self.store
            .state(|state| state.messages(kind).to_vec())
            .await
    }

    /// Wait until every scheduled expiry has run
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if expiries are still pending after `timeout`.
    pub async fn wait_until_settled(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.wait_for_idle(timeout).await
    }

    /// Stop accepting messages and wait for pending expiries
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if expiries are still pending after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
