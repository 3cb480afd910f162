//! # Storefront
//!
//! Cart session, user account flows and global messages for a commerce
//! storefront, built on the storefront store runtime.
//!
//! ## Cart session
//!
//! [`CartService`] keeps the shopper's cart in step with the active site and
//! the authenticated user:
//!
//! - the identity pair `(user_id, cart_id)` is captured when a command is
//!   dispatched, never when it completes
//! - adding a product before any cart exists creates the cart first and parks
//!   the entry in a single deferred slot, drained once the cart arrives
//! - logging in with an anonymous cart merges it into the account's cart
//! - every entry or voucher mutation reloads the cart with full details
//!
//! Backend calls go through the adapter traits in [`connectors`]: either the
//! OCC REST API ([`occ::OccBackend`]) or the in-process
//! [`InMemoryCartBackend`].
//!
//! ## Example
//!
//! ```ignore
//! let backend = Arc::new(InMemoryCartBackend::new());
//! let messages = GlobalMessageService::new(GlobalMessageEnvironment {
//!     clock: Arc::new(SystemClock),
//!     config: GlobalMessageConfig::default(),
//! });
//! let cart = CartService::new(CartEnvironment::from_backend(
//!     backend,
//!     messages.clone(),
//!     Arc::new(SystemClock),
//! ));
//!
//! let (_site_tx, site_rx) = watch::channel(BaseSite::new("electronics"));
//! let (token_tx, token_rx) = watch::channel(UserToken::anonymous());
//! let _watcher = cart.attach(site_rx, token_rx);
//!
//! cart.add_entry("1934793", 2).await?;
//! token_tx.send(UserToken::for_user("jane@example.com", "token"))?;
//! ```

pub mod cart;
pub mod config;
pub mod connectors;
pub mod error;
pub mod global_message;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod occ;
pub mod user;
pub mod util;

pub use cart::{CartAction, CartEnvironment, CartService};
pub use config::{BackendKind, ConfigError, StorefrontConfig};
pub use connectors::InMemoryCartBackend;
pub use error::OccError;
pub use global_message::{GlobalMessage, GlobalMessageService, GlobalMessageType};
pub use model::{ANONYMOUS_USER_ID, BaseSite, CURRENT_CART_ID, Cart, UserToken};
pub use user::{UserEnvironment, UserService};
