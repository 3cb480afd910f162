//! Backend adapter traits.
//!
//! Reducers never talk to the backend directly: the effects they return call
//! these traits through the feature environment. Two implementations exist:
//!
//! - `OccBackend` (in [`crate::occ`]): the OCC REST API over HTTP
//! - [`InMemoryCartBackend`]: in-process backend that records every call
//!
//! # Dyn Compatibility
//!
//! The traits return boxed futures so they can be held as `Arc<dyn Trait>`
//! in environments.

use crate::error::OccError;
use crate::model::{
    Address, BaseSite, Cart, CartModification, Country, CustomerCouponSearchResult, DeliveryMode,
    Title, UserToken,
};
use futures::future::BoxFuture;

pub mod in_memory;

pub use in_memory::{BackendCall, CallKind, InMemoryCartBackend};

/// Future returned by every adapter method
pub type AdapterFuture<'a, T> = BoxFuture<'a, Result<T, OccError>>;

/// Site and user every following request is made for
pub trait ContextAdapter: Send + Sync {
    /// Address requests to `site` and authenticate them with `token`
    ///
    /// An anonymous token drops the authentication.
    fn apply_context(&self, site: BaseSite, token: UserToken) -> AdapterFuture<'_, ()>;
}

/// Cart lifecycle: creation, loading and merging
pub trait CartAdapter: Send + Sync {
    /// Create a cart for `user_id`
    ///
    /// With `old_cart_id` set, the entries of that (anonymous) cart are taken
    /// over; with `to_merge_cart_guid` set as well, they are merged into that
    /// existing cart instead of a fresh one.
    fn create(
        &self,
        user_id: String,
        old_cart_id: Option<String>,
        to_merge_cart_guid: Option<String>,
    ) -> AdapterFuture<'_, Cart>;

    /// Load a cart; `cart_id` may be `"current"` for authenticated users
    fn load(&self, user_id: String, cart_id: String, details: bool) -> AdapterFuture<'_, Cart>;
}

/// Cart entry mutations
pub trait CartEntryAdapter: Send + Sync {
    /// Add `quantity` of a product
    fn add(
        &self,
        user_id: String,
        cart_id: String,
        product_code: String,
        quantity: u32,
    ) -> AdapterFuture<'_, CartModification>;

    /// Change the quantity of an entry
    fn update(
        &self,
        user_id: String,
        cart_id: String,
        entry_number: u32,
        quantity: u32,
    ) -> AdapterFuture<'_, CartModification>;

    /// Remove an entry
    fn remove(&self, user_id: String, cart_id: String, entry_number: u32)
    -> AdapterFuture<'_, ()>;
}

/// Cart voucher mutations
pub trait CartVoucherAdapter: Send + Sync {
    /// Apply a voucher
    fn add(&self, user_id: String, cart_id: String, voucher_id: String) -> AdapterFuture<'_, ()>;

    /// Remove an applied voucher
    fn remove(&self, user_id: String, cart_id: String, voucher_id: String)
    -> AdapterFuture<'_, ()>;
}

/// Cart delivery settings
pub trait CartDeliveryAdapter: Send + Sync {
    /// Create an address and set it as the cart's delivery address
    fn create_address(
        &self,
        user_id: String,
        cart_id: String,
        address: Address,
    ) -> AdapterFuture<'_, Address>;

    /// Set an existing address as delivery address
    fn set_address(
        &self,
        user_id: String,
        cart_id: String,
        address_id: String,
    ) -> AdapterFuture<'_, ()>;

    /// Set the delivery mode
    fn set_mode(&self, user_id: String, cart_id: String, mode_id: String)
    -> AdapterFuture<'_, ()>;

    /// Delivery mode currently set on the cart
    fn get_mode(&self, user_id: String, cart_id: String) -> AdapterFuture<'_, DeliveryMode>;

    /// Delivery modes the cart can use
    fn get_supported_modes(
        &self,
        user_id: String,
        cart_id: String,
    ) -> AdapterFuture<'_, Vec<DeliveryMode>>;
}

/// User account calls
pub trait UserAdapter: Send + Sync {
    /// Ask the backend to send a password reset email
    fn request_forgot_password_email(&self, email: String) -> AdapterFuture<'_, ()>;

    /// One page of the user's customer coupons
    ///
    /// `sort` is the backend sort expression, e.g. `startDate:asc`.
    fn load_customer_coupons(
        &self,
        user_id: String,
        page_size: u32,
        current_page: u32,
        sort: String,
    ) -> AdapterFuture<'_, CustomerCouponSearchResult>;

    /// Personal titles
    fn load_titles(&self) -> AdapterFuture<'_, Vec<Title>>;

    /// Countries that can be shipped to
    fn load_delivery_countries(&self) -> AdapterFuture<'_, Vec<Country>>;
}
