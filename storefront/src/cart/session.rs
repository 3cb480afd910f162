//! The cart session: identity store and everything the cart feature knows.
//!
//! One session exists per shopper session. It is owned by the cart store and
//! only changed by the cart reducer, so every write happens on the store's
//! serialized reduce path.

use super::command::DeferredCommand;
use super::deferred::DeferredSlot;
use crate::model::{ANONYMOUS_USER_ID, BaseSite, Cart, DeliveryMode, OrderEntry, UserToken, Voucher};
use crate::util::serialization::SerializableError;
use chrono::{DateTime, Utc};

/// The `(user_id, cart_id)` pair commands are addressed with
///
/// `cart_id` is empty until a cart exists on the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CartIdentity {
    /// Authenticated user id or `"anonymous"`
    pub user_id: String,
    /// Cart guid (anonymous) or code (authenticated); empty without a cart
    pub cart_id: String,
}

impl CartIdentity {
    /// Whether a cart id is known
    #[must_use]
    pub fn has_cart(&self) -> bool {
        !self.cart_id.is_empty()
    }

    /// Whether the identity is the anonymous sentinel
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }
}

/// State of the cart feature
#[derive(Clone, Debug, PartialEq)]
pub struct CartSession {
    /// Current user id, `"anonymous"` until someone logs in
    pub user_id: String,
    /// Active site context
    pub site: Option<BaseSite>,
    /// Cart content as last returned by the backend
    pub cart: Cart,
    /// Mutation waiting for cart creation
    pub pending: DeferredSlot,
    /// A `CreateCart` for the current user is in flight
    pub creating: bool,
    /// Whether loads should request full details
    pub get_details: bool,
    /// A cart has been loaded, created or merged
    pub loaded: bool,
    /// The last merge of an anonymous cart completed
    pub merge_complete: bool,
    /// The loaded cart is stale and must be reloaded
    pub refresh: bool,
    /// When cart content was last replaced
    pub loaded_at: Option<DateTime<Utc>>,
    /// Last command failure
    pub last_error: Option<SerializableError>,
    /// Delivery modes the cart supports
    pub supported_delivery_modes: Vec<DeliveryMode>,
}

impl Default for CartSession {
    fn default() -> Self {
        Self {
            user_id: ANONYMOUS_USER_ID.to_string(),
            site: None,
            cart: Cart::default(),
            pending: DeferredSlot::new(),
            creating: false,
            get_details: false,
            loaded: false,
            merge_complete: false,
            refresh: false,
            loaded_at: None,
            last_error: None,
            supported_delivery_modes: Vec::new(),
        }
    }
}

impl CartSession {
    /// An anonymous session without a cart
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the current user is the anonymous sentinel
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }

    /// Store the identity carried by `token`, returning the previous user id
    ///
    /// Tokens without a usable user id store the anonymous sentinel.
    pub fn set_identity(&mut self, token: &UserToken) -> String {
        std::mem::replace(&mut self.user_id, token.resolved_user_id())
    }

    /// Id used to address the current cart
    ///
    /// Anonymous carts are addressed by guid, account carts by code.
    #[must_use]
    pub fn cart_id(&self) -> String {
        let id = if self.is_anonymous() {
            self.cart.guid.as_ref()
        } else {
            self.cart.code.as_ref()
        };
        id.cloned().unwrap_or_default()
    }

    /// The pair commands issued now are addressed with
    #[must_use]
    pub fn identity(&self) -> CartIdentity {
        CartIdentity {
            user_id: self.user_id.clone(),
            cart_id: self.cart_id(),
        }
    }

    /// Replace the cart content
    ///
    /// When the new content is a created cart, the deferred slot is drained
    /// and its command returned for dispatch.
    pub fn replace_cart(&mut self, cart: Cart) -> Option<DeferredCommand> {
        self.cart = cart;
        if self.cart.is_created() {
            self.pending.drain_once()
        } else {
            None
        }
    }

    /// Entries of the current cart
    #[must_use]
    pub fn entries(&self) -> &[OrderEntry] {
        &self.cart.entries
    }

    /// Entry for a product
    #[must_use]
    pub fn entry(&self, product_code: &str) -> Option<&OrderEntry> {
        self.cart.entry(product_code)
    }

    /// Vouchers applied to the current cart
    #[must_use]
    pub fn applied_vouchers(&self) -> &[Voucher] {
        &self.cart.applied_vouchers
    }

    /// Forget the cart; the user identity and site are kept
    pub fn clear(&mut self) {
        self.cart = Cart::default();
        self.pending.clear();
        self.creating = false;
        self.loaded = false;
        self.merge_complete = false;
        self.refresh = false;
        self.loaded_at = None;
        self.last_error = None;
        self.supported_delivery_modes.clear();
    }
}
