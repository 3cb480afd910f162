//! Cart facade over the cart store.

use super::reducer::{CartAction, CartEnvironment, CartReducer};
use super::session::{CartIdentity, CartSession};
use crate::model::{Address, BaseSite, Cart, DeliveryMode, OrderEntry, UserToken, Voucher};
use crate::util::serialization::SerializableError;
use std::time::Duration;
use storefront_runtime::store::DEFAULT_BROADCAST_CAPACITY;
use storefront_runtime::{Store, StoreError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Store running the cart reducer
pub type CartStore = Store<CartSession, CartAction, CartEnvironment, CartReducer>;

/// Cart operations for one shopper session
///
/// Mutations return once the action is reduced; backend calls complete in the
/// background and their results land in the session. Cloning is cheap and
/// shares the session.
///
/// # Example
///
/// ```ignore
/// let cart = CartService::new(environment);
/// let _watcher = cart.attach(site_rx, token_rx);
///
/// cart.add_entry("1934793", 2).await?;
/// cart.wait_until_settled(Duration::from_secs(5)).await?;
/// assert_eq!(cart.entries().await.len(), 1);
/// ```
#[derive(Clone)]
pub struct CartService {
    store: CartStore,
}

impl CartService {
    /// Create a service with an anonymous session
    #[must_use]
    pub fn new(environment: CartEnvironment) -> Self {
        Self::with_capacity(environment, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a service with a custom action broadcast capacity
    #[must_use]
    pub fn with_capacity(environment: CartEnvironment, capacity: usize) -> Self {
        Self {
            store: Store::with_broadcast_capacity(
                CartSession::new(),
                CartReducer::new(),
                environment,
                capacity,
            ),
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &CartStore {
        &self.store
    }

    /// Follow the site and user token providers
    ///
    /// The current values are sent right away, then every change of either
    /// one. The task ends when a provider goes away or the store shuts down.
    pub fn attach(
        &self,
        mut site: watch::Receiver<BaseSite>,
        mut token: watch::Receiver<UserToken>,
    ) -> JoinHandle<()> {
        let store = self.store.clone();

        tokio::spawn(async move {
            loop {
                let action = CartAction::ContextChanged {
                    site: site.borrow_and_update().clone(),
                    token: token.borrow_and_update().clone(),
                };
                if let Err(error) = store.send(action).await {
                    tracing::debug!(%error, "Cart context watcher stopped");
                    break;
                }

                tokio::select! {
                    changed = site.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    },
                    changed = token.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    },
                }
            }
            tracing::debug!("Cart context providers closed");
        })
    }

    async fn dispatch(&self, action: CartAction) -> Result<(), StoreError> {
        self.store.send(action).await.map(|_| ())
    }

    /// Add a product to the cart, creating the cart first when needed
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn add_entry(
        &self,
        product_code: impl Into<String>,
        quantity: u32,
    ) -> Result<(), StoreError> {
        self.dispatch(CartAction::AddEntry {
            product_code: product_code.into(),
            quantity,
        })
        .await
    }

    /// Remove an entry
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn remove_entry(&self, entry: &OrderEntry) -> Result<(), StoreError> {
        self.dispatch(CartAction::RemoveEntry {
            entry_number: entry.entry_number,
        })
        .await
    }

    /// Change an entry's quantity; zero or less removes it
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn update_entry(&self, entry_number: u32, quantity: i64) -> Result<(), StoreError> {
        self.dispatch(CartAction::UpdateEntry {
            entry_number,
            quantity,
        })
        .await
    }

    /// Apply a voucher
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn add_voucher(&self, voucher_id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(CartAction::AddVoucher {
            voucher_id: voucher_id.into(),
        })
        .await
    }

    /// Remove an applied voucher
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn remove_voucher(&self, voucher_id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(CartAction::RemoveVoucher {
            voucher_id: voucher_id.into(),
        })
        .await
    }

    /// Load the cart with full details
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn load_details(&self) -> Result<(), StoreError> {
        self.dispatch(CartAction::LoadDetails).await
    }

    /// Mark the cart as stale so it is reloaded
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn request_refresh(&self) -> Result<(), StoreError> {
        self.dispatch(CartAction::RefreshRequested).await
    }

    /// Forget the cart
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.dispatch(CartAction::Clear).await
    }

    /// Save an address and use it for delivery
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn create_delivery_address(&self, address: Address) -> Result<(), StoreError> {
        self.dispatch(CartAction::CreateDeliveryAddress { address })
            .await
    }

    /// Use a saved address for delivery
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn set_delivery_address(
        &self,
        address_id: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.dispatch(CartAction::SetDeliveryAddress {
            address_id: address_id.into(),
        })
        .await
    }

    /// Choose a delivery mode
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn set_delivery_mode(&self, mode_id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(CartAction::SetDeliveryMode {
            mode_id: mode_id.into(),
        })
        .await
    }

    /// Fetch the delivery mode set on the cart
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn load_delivery_mode(&self) -> Result<(), StoreError> {
        self.dispatch(CartAction::LoadDeliveryMode).await
    }

    /// Fetch the delivery modes the cart supports
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn load_supported_delivery_modes(&self) -> Result<(), StoreError> {
        self.dispatch(CartAction::LoadSupportedDeliveryModes).await
    }

    /// Current cart content
    pub async fn active(&self) -> Cart {
        self.store.state(|session| session.cart.clone()).await
    }

    /// Entries of the current cart
    pub async fn entries(&self) -> Vec<OrderEntry> {
        self.store.state(|session| session.entries().to_vec()).await
    }

    /// Entry for a product
    pub async fn entry(&self, product_code: &str) -> Option<OrderEntry> {
        self.store
            .state(|session| session.entry(product_code).cloned())
            .await
    }

    /// Vouchers applied to the current cart
    pub async fn applied_vouchers(&self) -> Vec<Voucher> {
        self.store
            .state(|session| session.applied_vouchers().to_vec())
            .await
    }

    /// Delivery modes the cart supports, once loaded
    pub async fn supported_delivery_modes(&self) -> Vec<DeliveryMode> {
        self.store
            .state(|session| session.supported_delivery_modes.clone())
            .await
    }

    /// Whether a cart has been loaded, created or merged
    pub async fn loaded(&self) -> bool {
        self.store.state(|session| session.loaded).await
    }

    /// Whether the last anonymous cart merge completed
    pub async fn merge_complete(&self) -> bool {
        self.store.state(|session| session.merge_complete).await
    }

    /// The pair the next command would be addressed with
    pub async fn identity(&self) -> CartIdentity {
        self.store.state(CartSession::identity).await
    }

    /// Last command failure
    pub async fn last_error(&self) -> Option<SerializableError> {
        self.store.state(|session| session.last_error.clone()).await
    }

    /// Whether the backend created `cart`
    #[must_use]
    pub const fn is_created(cart: &Cart) -> bool {
        cart.is_created()
    }

    /// Whether `cart` holds no items, created or not
    #[must_use]
    pub fn is_empty(cart: &Cart) -> bool {
        cart.is_empty()
    }

    /// Observe every action fed back by backend calls
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartAction> {
        self.store.subscribe_actions()
    }

    /// Wait until no backend call or follow-up is in flight
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if work is still running after `timeout`.
    pub async fn wait_until_settled(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.wait_for_idle(timeout).await
    }

    /// Stop accepting actions and wait for in-flight calls
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if calls are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
