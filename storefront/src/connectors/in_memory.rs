//! In-process backend for tests and offline demos.
//!
//! [`InMemoryCartBackend`] implements every adapter trait against carts held
//! in memory, records every call in the order it was made, and can be told to
//! fail the next call of a given kind or to answer slowly.

use super::{
    AdapterFuture, CartAdapter, CartDeliveryAdapter, CartEntryAdapter, CartVoucherAdapter,
    ContextAdapter, UserAdapter,
};
use crate::error::OccError;
use crate::model::{
    ANONYMOUS_USER_ID, Address, BaseSite, CURRENT_CART_ID, Cart, CartModification, Country,
    CustomerCoupon, CustomerCouponSearchResult, DeliveryMode, OrderEntry, Pagination, Price,
    ProductRef, Title, UserToken, Voucher,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Kinds of backend calls, one per adapter method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `CartAdapter::create`
    CreateCart,
    /// `CartAdapter::load`
    LoadCart,
    /// `CartEntryAdapter::add`
    AddEntry,
    /// `CartEntryAdapter::update`
    UpdateEntry,
    /// `CartEntryAdapter::remove`
    RemoveEntry,
    /// `CartVoucherAdapter::add`
    AddVoucher,
    /// `CartVoucherAdapter::remove`
    RemoveVoucher,
    /// `CartDeliveryAdapter::create_address`
    CreateAddress,
    /// `CartDeliveryAdapter::set_address`
    SetAddress,
    /// `CartDeliveryAdapter::set_mode`
    SetMode,
    /// `CartDeliveryAdapter::get_mode`
    GetMode,
    /// `CartDeliveryAdapter::get_supported_modes`
    GetSupportedModes,
    /// `UserAdapter::request_forgot_password_email`
    ForgotPassword,
    /// `UserAdapter::load_customer_coupons`
    LoadCoupons,
    /// `UserAdapter::load_titles`
    LoadTitles,
    /// `UserAdapter::load_delivery_countries`
    LoadCountries,
}

/// A recorded backend call with its arguments
///
/// Fields mirror the arguments of the adapter method named by the
/// matching [`CallKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// A cart was created, possibly merging an old one
    CreateCart {
        /// Cart owner
        user_id: String,
        /// Anonymous cart to take over
        old_cart_id: Option<String>,
        /// Account cart receiving the entries
        to_merge_cart_guid: Option<String>,
    },
    /// A cart was loaded
    LoadCart {
        /// Cart owner
        user_id: String,
        /// Requested cart id
        cart_id: String,
        /// Full field set requested
        details: bool,
    },
    /// A product was added
    AddEntry {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Added product
        product_code: String,
        /// Added quantity
        quantity: u32,
    },
    /// An entry quantity was changed
    UpdateEntry {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Changed entry
        entry_number: u32,
        /// New quantity
        quantity: u32,
    },
    /// An entry was removed
    RemoveEntry {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Removed entry
        entry_number: u32,
    },
    /// A voucher was applied
    AddVoucher {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Voucher code
        voucher_id: String,
    },
    /// A voucher was removed
    RemoveVoucher {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Voucher code
        voucher_id: String,
    },
    /// A delivery address was saved
    CreateAddress {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
    },
    /// A saved address was chosen for delivery
    SetAddress {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Chosen address
        address_id: String,
    },
    /// A delivery mode was chosen
    SetMode {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Chosen mode
        mode_id: String,
    },
    /// The delivery mode was fetched
    GetMode {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
    },
    /// The supported delivery modes were fetched
    GetSupportedModes {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
    },
    /// A password reset email was requested
    ForgotPassword {
        /// Account email
        email: String,
    },
    /// A coupon page was loaded
    LoadCoupons {
        /// Coupon owner
        user_id: String,
        /// Coupons per page
        page_size: u32,
        /// Zero-based page index
        current_page: u32,
        /// Sort expression
        sort: String,
    },
    /// Titles were loaded
    LoadTitles,
    /// Delivery countries were loaded
    LoadCountries,
}

impl BackendCall {
    /// The kind of this call
    #[must_use]
    pub const fn kind(&self) -> CallKind {
        match self {
            Self::CreateCart { .. } => CallKind::CreateCart,
            Self::LoadCart { .. } => CallKind::LoadCart,
            Self::AddEntry { .. } => CallKind::AddEntry,
            Self::UpdateEntry { .. } => CallKind::UpdateEntry,
            Self::RemoveEntry { .. } => CallKind::RemoveEntry,
            Self::AddVoucher { .. } => CallKind::AddVoucher,
            Self::RemoveVoucher { .. } => CallKind::RemoveVoucher,
            Self::CreateAddress { .. } => CallKind::CreateAddress,
            Self::SetAddress { .. } => CallKind::SetAddress,
            Self::SetMode { .. } => CallKind::SetMode,
            Self::GetMode { .. } => CallKind::GetMode,
            Self::GetSupportedModes { .. } => CallKind::GetSupportedModes,
            Self::ForgotPassword { .. } => CallKind::ForgotPassword,
            Self::LoadCoupons { .. } => CallKind::LoadCoupons,
            Self::LoadTitles => CallKind::LoadTitles,
            Self::LoadCountries => CallKind::LoadCountries,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredCart {
    owner: String,
    cart: Cart,
}

#[derive(Debug)]
struct BackendState {
    calls: Vec<BackendCall>,
    context: Option<(BaseSite, UserToken)>,
    carts: Vec<StoredCart>,
    next_cart: u32,
    addresses: Vec<Address>,
    failures: HashMap<CallKind, u16>,
    latency: Duration,
    delivery_modes: Vec<DeliveryMode>,
    coupons: Vec<CustomerCoupon>,
    titles: Vec<Title>,
    countries: Vec<Country>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            context: None,
            carts: Vec::new(),
            next_cart: 1,
            addresses: Vec::new(),
            failures: HashMap::new(),
            latency: Duration::ZERO,
            delivery_modes: vec![
                delivery_mode("standard-gross", "Standard Delivery", "$9.99"),
                delivery_mode("premium-gross", "Premium Delivery", "$16.99"),
            ],
            coupons: Vec::new(),
            titles: vec![
                Title {
                    code: "mr".to_string(),
                    name: Some("Mr.".to_string()),
                },
                Title {
                    code: "ms".to_string(),
                    name: Some("Ms.".to_string()),
                },
            ],
            countries: vec![
                country("US", "United States"),
                country("DE", "Germany"),
                country("GB", "United Kingdom"),
            ],
        }
    }
}

fn delivery_mode(code: &str, name: &str, cost: &str) -> DeliveryMode {
    DeliveryMode {
        code: Some(code.to_string()),
        name: Some(name.to_string()),
        description: None,
        delivery_cost: Some(Price {
            currency_iso: Some("USD".to_string()),
            value: None,
            formatted_value: Some(cost.to_string()),
        }),
    }
}

fn country(isocode: &str, name: &str) -> Country {
    Country {
        isocode: isocode.to_string(),
        name: Some(name.to_string()),
    }
}

fn bad_request(kind: &str, message: &str) -> OccError {
    OccError::Status {
        status: 400,
        status_text: "Bad Request".to_string(),
        url: "memory://backend".to_string(),
        body: json!({"errors": [{"type": kind, "message": message}]}),
    }
}

fn not_found(message: &str) -> OccError {
    OccError::Status {
        status: 404,
        status_text: "Not Found".to_string(),
        url: "memory://backend".to_string(),
        body: json!({"errors": [{"type": "CartError", "message": message}]}),
    }
}

fn injected_failure(kind: CallKind, status: u16) -> OccError {
    let status_text = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
        .to_string();

    OccError::Status {
        status,
        status_text,
        url: format!("memory://{kind:?}"),
        body: json!({"errors": [{"type": "InjectedFailure", "message": format!("{kind:?} failed")}]}),
    }
}

fn recount(cart: &mut Cart) {
    for (number, entry) in cart.entries.iter_mut().enumerate() {
        entry.entry_number = u32::try_from(number).unwrap_or(u32::MAX);
    }
    cart.total_items = Some(u32::try_from(cart.entries.len()).unwrap_or(u32::MAX));
}

fn add_quantity(cart: &mut Cart, product_code: &str, quantity: u32) -> OrderEntry {
    if let Some(entry) = cart
        .entries
        .iter_mut()
        .find(|entry| entry.product.code == product_code)
    {
        entry.quantity = entry.quantity.saturating_add(quantity);
        return entry.clone();
    }

    cart.entries.push(OrderEntry {
        entry_number: 0,
        product: ProductRef {
            code: product_code.to_string(),
            name: None,
        },
        quantity,
        base_price: None,
        total_price: None,
    });
    recount(cart);
    cart.entries.last().cloned().unwrap_or_default()
}

impl BackendState {
    fn find_index(&self, user_id: &str, cart_id: &str) -> Result<usize, OccError> {
        let found = if user_id == ANONYMOUS_USER_ID {
            self.carts.iter().position(|stored| {
                stored.owner == ANONYMOUS_USER_ID && stored.cart.guid.as_deref() == Some(cart_id)
            })
        } else if cart_id == CURRENT_CART_ID {
            self.carts.iter().rposition(|stored| stored.owner == user_id)
        } else {
            self.carts.iter().position(|stored| {
                stored.owner == user_id
                    && (stored.cart.code.as_deref() == Some(cart_id)
                        || stored.cart.guid.as_deref() == Some(cart_id))
            })
        };

        found.ok_or_else(|| not_found("Cart not found."))
    }

    fn cart_mut(&mut self, user_id: &str, cart_id: &str) -> Result<&mut Cart, OccError> {
        let index = self.find_index(user_id, cart_id)?;
        Ok(&mut self.carts[index].cart)
    }

    fn new_cart(&mut self, owner: &str) -> usize {
        let number = self.next_cart;
        self.next_cart += 1;

        self.carts.push(StoredCart {
            owner: owner.to_string(),
            cart: Cart {
                code: Some(format!("{number:08}")),
                guid: Some(format!("g{number}")),
                total_items: Some(0),
                ..Cart::default()
            },
        });
        self.carts.len() - 1
    }

    fn create(
        &mut self,
        user_id: &str,
        old_cart_id: Option<&str>,
        to_merge_cart_guid: Option<&str>,
    ) -> Result<Cart, OccError> {
        let old_index = old_cart_id
            .map(|guid| self.find_index(ANONYMOUS_USER_ID, guid))
            .transpose()?;
        if let Some(guid) = to_merge_cart_guid {
            self.find_index(user_id, guid)?;
        }

        // Both carts exist; removing shifts indexes, so the target is looked up again
        let taken = old_index.map(|index| self.carts.remove(index).cart);
        let target = match to_merge_cart_guid {
            Some(guid) => self.find_index(user_id, guid)?,
            None => self.new_cart(user_id),
        };

        let cart = &mut self.carts[target].cart;
        if let Some(taken) = taken {
            for entry in taken.entries {
                add_quantity(cart, &entry.product.code, entry.quantity);
            }
            for voucher in taken.applied_vouchers {
                if !cart.applied_vouchers.contains(&voucher) {
                    cart.applied_vouchers.push(voucher);
                }
            }
        }
        recount(cart);
        Ok(cart.clone())
    }
}

/// In-memory implementation of every backend adapter
///
/// Clones share the same carts and call log.
///
/// # Example
///
/// ```ignore
/// let backend = Arc::new(InMemoryCartBackend::new());
/// backend.fail_next(CallKind::AddEntry, 400);
/// let environment =
///     CartEnvironment::from_backend(backend.clone(), messages.clone(), Arc::new(SystemClock));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartBackend {
    state: Arc<Mutex<BackendState>>,
}

impl InMemoryCartBackend {
    /// Create a backend with no carts, two delivery modes and a few countries
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut BackendState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Record a call and answer it, after the configured latency
    fn respond<T, F>(&self, call: BackendCall, op: F) -> AdapterFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut BackendState) -> Result<T, OccError> + Send + 'static,
    {
        let kind = call.kind();
        let (latency, failure) = self.with_state(|state| {
            state.calls.push(call);
            (state.latency, state.failures.remove(&kind))
        });

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if let Some(status) = failure {
                tracing::debug!(?kind, status, "Injected backend failure");
                return Err(injected_failure(kind, status));
            }
            self.with_state(op)
        })
    }

    /// Make the next call of `kind` fail with the given HTTP status
    pub fn fail_next(&self, kind: CallKind, status: u16) {
        self.with_state(|state| {
            state.failures.insert(kind, status);
        });
    }

    /// Delay every answer by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.with_state(|state| state.latency = latency);
    }

    /// Replace the customer coupons returned by coupon searches
    pub fn set_coupons(&self, coupons: Vec<CustomerCoupon>) {
        self.with_state(|state| state.coupons = coupons);
    }

    /// Store a cart for `owner` as if it had been created earlier
    ///
    /// Returns the stored cart with its code and guid.
    pub fn seed_cart(&self, owner: &str, entries: &[(&str, u32)]) -> Cart {
        self.with_state(|state| {
            let index = state.new_cart(owner);
            let cart = &mut state.carts[index].cart;
            for (product_code, quantity) in entries {
                add_quantity(cart, product_code, *quantity);
            }
            recount(cart);
            cart.clone()
        })
    }

    /// Every call made so far, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.with_state(|state| state.calls.clone())
    }

    /// Calls of one kind, oldest first
    #[must_use]
    pub fn calls_of(&self, kind: CallKind) -> Vec<BackendCall> {
        self.with_state(|state| {
            state
                .calls
                .iter()
                .filter(|call| call.kind() == kind)
                .cloned()
                .collect()
        })
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.with_state(|state| state.calls.clear());
    }

    /// Number of carts held
    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.with_state(|state| state.carts.len())
    }

    /// Site and token last applied; context changes are not recorded as calls
    #[must_use]
    pub fn context(&self) -> Option<(BaseSite, UserToken)> {
        self.with_state(|state| state.context.clone())
    }
}

impl ContextAdapter for InMemoryCartBackend {
    fn apply_context(&self, site: BaseSite, token: UserToken) -> AdapterFuture<'_, ()> {
        self.with_state(|state| state.context = Some((site, token)));
        Box::pin(async { Ok(()) })
    }
}

impl CartAdapter for InMemoryCartBackend {
    fn create(
        &self,
        user_id: String,
        old_cart_id: Option<String>,
        to_merge_cart_guid: Option<String>,
    ) -> AdapterFuture<'_, Cart> {
        let call = BackendCall::CreateCart {
            user_id: user_id.clone(),
            old_cart_id: old_cart_id.clone(),
            to_merge_cart_guid: to_merge_cart_guid.clone(),
        };
        self.respond(call, move |state| {
            state.create(
                &user_id,
                old_cart_id.as_deref(),
                to_merge_cart_guid.as_deref(),
            )
        })
    }

    fn load(&self, user_id: String, cart_id: String, details: bool) -> AdapterFuture<'_, Cart> {
        let call = BackendCall::LoadCart {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            details,
        };
        self.respond(call, move |state| {
            state.cart_mut(&user_id, &cart_id).map(|cart| cart.clone())
        })
    }
}

impl CartEntryAdapter for InMemoryCartBackend {
    fn add(
        &self,
        user_id: String,
        cart_id: String,
        product_code: String,
        quantity: u32,
    ) -> AdapterFuture<'_, CartModification> {
        let call = BackendCall::AddEntry {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            product_code: product_code.clone(),
            quantity,
        };
        self.respond(call, move |state| {
            let cart = state.cart_mut(&user_id, &cart_id)?;
            let entry = add_quantity(cart, &product_code, quantity);
            Ok(CartModification {
                status_code: Some("success".to_string()),
                quantity_added: Some(quantity),
                quantity: Some(entry.quantity),
                entry: Some(entry),
            })
        })
    }

    fn update(
        &self,
        user_id: String,
        cart_id: String,
        entry_number: u32,
        quantity: u32,
    ) -> AdapterFuture<'_, CartModification> {
        let call = BackendCall::UpdateEntry {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            entry_number,
            quantity,
        };
        self.respond(call, move |state| {
            let cart = state.cart_mut(&user_id, &cart_id)?;
            let entry = cart
                .entries
                .iter_mut()
                .find(|entry| entry.entry_number == entry_number)
                .ok_or_else(|| bad_request("CartEntryError", "Entry not found."))?;
            entry.quantity = quantity;
            Ok(CartModification {
                status_code: Some("success".to_string()),
                quantity_added: None,
                quantity: Some(quantity),
                entry: Some(entry.clone()),
            })
        })
    }

    fn remove(
        &self,
        user_id: String,
        cart_id: String,
        entry_number: u32,
    ) -> AdapterFuture<'_, ()> {
        let call = BackendCall::RemoveEntry {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            entry_number,
        };
        self.respond(call, move |state| {
            let cart = state.cart_mut(&user_id, &cart_id)?;
            let before = cart.entries.len();
            cart.entries.retain(|entry| entry.entry_number != entry_number);
            if cart.entries.len() == before {
                return Err(bad_request("CartEntryError", "Entry not found."));
            }
            recount(cart);
            Ok(())
        })
    }
}

impl CartVoucherAdapter for InMemoryCartBackend {
    fn add(&self, user_id: String, cart_id: String, voucher_id: String) -> AdapterFuture<'_, ()> {
        let call = BackendCall::AddVoucher {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            voucher_id: voucher_id.clone(),
        };
        self.respond(call, move |state| {
            let cart = state.cart_mut(&user_id, &cart_id)?;
            if cart
                .applied_vouchers
                .iter()
                .any(|voucher| voucher.code.as_deref() == Some(voucher_id.as_str()))
            {
                return Err(bad_request(
                    "VoucherOperationError",
                    "Voucher is already applied.",
                ));
            }
            cart.applied_vouchers.push(Voucher {
                code: Some(voucher_id.clone()),
                voucher_code: Some(voucher_id),
                ..Voucher::default()
            });
            Ok(())
        })
    }

    fn remove(
        &self,
        user_id: String,
        cart_id: String,
        voucher_id: String,
    ) -> AdapterFuture<'_, ()> {
        let call = BackendCall::RemoveVoucher {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            voucher_id: voucher_id.clone(),
        };
        self.respond(call, move |state| {
            let cart = state.cart_mut(&user_id, &cart_id)?;
            let before = cart.applied_vouchers.len();
            cart.applied_vouchers
                .retain(|voucher| voucher.code.as_deref() != Some(voucher_id.as_str()));
            if cart.applied_vouchers.len() == before {
                return Err(bad_request(
                    "VoucherOperationError",
                    "Voucher is not applied.",
                ));
            }
            Ok(())
        })
    }
}

impl CartDeliveryAdapter for InMemoryCartBackend {
    fn create_address(
        &self,
        user_id: String,
        cart_id: String,
        address: Address,
    ) -> AdapterFuture<'_, Address> {
        let call = BackendCall::CreateAddress {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
        };
        self.respond(call, move |state| {
            let id = format!("addr-{}", state.addresses.len() + 1);
            let saved = Address {
                id: Some(id),
                ..address
            };
            state.cart_mut(&user_id, &cart_id)?.delivery_address = Some(saved.clone());
            state.addresses.push(saved.clone());
            Ok(saved)
        })
    }

    fn set_address(
        &self,
        user_id: String,
        cart_id: String,
        address_id: String,
    ) -> AdapterFuture<'_, ()> {
        let call = BackendCall::SetAddress {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            address_id: address_id.clone(),
        };
        self.respond(call, move |state| {
            let address = state
                .addresses
                .iter()
                .find(|address| address.id.as_deref() == Some(address_id.as_str()))
                .cloned()
                .ok_or_else(|| bad_request("UnknownIdentifierError", "Address not found."))?;
            state.cart_mut(&user_id, &cart_id)?.delivery_address = Some(address);
            Ok(())
        })
    }

    fn set_mode(
        &self,
        user_id: String,
        cart_id: String,
        mode_id: String,
    ) -> AdapterFuture<'_, ()> {
        let call = BackendCall::SetMode {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            mode_id: mode_id.clone(),
        };
        self.respond(call, move |state| {
            let mode = state
                .delivery_modes
                .iter()
                .find(|mode| mode.code.as_deref() == Some(mode_id.as_str()))
                .cloned()
                .ok_or_else(|| {
                    bad_request("UnsupportedDeliveryModeError", "Delivery mode not supported.")
                })?;
            state.cart_mut(&user_id, &cart_id)?.delivery_mode = Some(mode);
            Ok(())
        })
    }

    fn get_mode(&self, user_id: String, cart_id: String) -> AdapterFuture<'_, DeliveryMode> {
        let call = BackendCall::GetMode {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
        };
        self.respond(call, move |state| {
            Ok(state
                .cart_mut(&user_id, &cart_id)?
                .delivery_mode
                .clone()
                .unwrap_or_default())
        })
    }

    fn get_supported_modes(
        &self,
        user_id: String,
        cart_id: String,
    ) -> AdapterFuture<'_, Vec<DeliveryMode>> {
        let call = BackendCall::GetSupportedModes {
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
        };
        self.respond(call, move |state| {
            state.find_index(&user_id, &cart_id)?;
            Ok(state.delivery_modes.clone())
        })
    }
}

impl UserAdapter for InMemoryCartBackend {
    fn request_forgot_password_email(&self, email: String) -> AdapterFuture<'_, ()> {
        self.respond(BackendCall::ForgotPassword { email }, |_| Ok(()))
    }

    fn load_customer_coupons(
        &self,
        user_id: String,
        page_size: u32,
        current_page: u32,
        sort: String,
    ) -> AdapterFuture<'_, CustomerCouponSearchResult> {
        let call = BackendCall::LoadCoupons {
            user_id,
            page_size,
            current_page,
            sort: sort.clone(),
        };
        self.respond(call, move |state| {
            let total = u32::try_from(state.coupons.len()).unwrap_or(u32::MAX);
            let size = page_size.max(1);
            let start = usize::try_from(current_page.saturating_mul(size)).unwrap_or(usize::MAX);
            let coupons = state
                .coupons
                .iter()
                .skip(start)
                .take(usize::try_from(size).unwrap_or(usize::MAX))
                .cloned()
                .collect();

            Ok(CustomerCouponSearchResult {
                coupons,
                pagination: Some(Pagination {
                    current_page,
                    page_size: size,
                    sort: Some(sort),
                    total_pages: total.div_ceil(size),
                    total_results: total,
                }),
            })
        })
    }

    fn load_titles(&self) -> AdapterFuture<'_, Vec<Title>> {
        self.respond(BackendCall::LoadTitles, |state| Ok(state.titles.clone()))
    }

    fn load_delivery_countries(&self) -> AdapterFuture<'_, Vec<Country>> {
        self.respond(BackendCall::LoadCountries, |state| {
            Ok(state.countries.clone())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn anonymous_cart_is_addressed_by_guid() {
        let backend = InMemoryCartBackend::new();

        let cart = tokio_test::block_on(CartAdapter::create(
            &backend,
            ANONYMOUS_USER_ID.to_string(),
            None,
            None,
        ))
        .unwrap();
        assert_eq!(cart.guid.as_deref(), Some("g1"));

        let loaded = tokio_test::block_on(backend.load(
            ANONYMOUS_USER_ID.to_string(),
            "g1".to_string(),
            true,
        ))
        .unwrap();
        assert_eq!(loaded, cart);
    }

    #[test]
    fn entries_accumulate_per_product() {
        let backend = InMemoryCartBackend::new();
        let cart = backend.seed_cart("u1", &[("P1", 1)]);
        let code = cart.code.unwrap();

        let modification = tokio_test::block_on(CartEntryAdapter::add(
            &backend,
            "u1".to_string(),
            code.clone(),
            "P1".to_string(),
            2,
        ))
        .unwrap();
        assert_eq!(modification.quantity, Some(3));

        tokio_test::block_on(CartEntryAdapter::add(
            &backend,
            "u1".to_string(),
            code,
            "P2".to_string(),
            1,
        ))
        .unwrap();

        let current = tokio_test::block_on(backend.load(
            "u1".to_string(),
            CURRENT_CART_ID.to_string(),
            false,
        ))
        .unwrap();
        assert_eq!(current.total_items, Some(2));
        assert_eq!(current.entries[1].entry_number, 1);
    }

    #[test]
    fn merge_moves_anonymous_entries_into_user_cart() {
        let backend = InMemoryCartBackend::new();
        let user_cart = backend.seed_cart("u1", &[("P1", 1)]);
        let anonymous = backend.seed_cart(ANONYMOUS_USER_ID, &[("P1", 2), ("P2", 1)]);

        let merged = tokio_test::block_on(CartAdapter::create(
            &backend,
            "u1".to_string(),
            anonymous.guid.clone(),
            user_cart.guid.clone(),
        ))
        .unwrap();

        assert_eq!(merged.code, user_cart.code);
        assert_eq!(merged.entry("P1").unwrap().quantity, 3);
        assert_eq!(merged.entry("P2").unwrap().quantity, 1);
        assert_eq!(backend.cart_count(), 1);
    }

    #[test]
    fn failed_merge_keeps_the_anonymous_cart() {
        let backend = InMemoryCartBackend::new();
        let anonymous = backend.seed_cart(ANONYMOUS_USER_ID, &[("P1", 2)]);
        let guid = anonymous.guid.clone().unwrap();

        let result = tokio_test::block_on(CartAdapter::create(
            &backend,
            "u1".to_string(),
            Some(guid.clone()),
            Some("missing".to_string()),
        ));
        assert_eq!(result.unwrap_err().status(), Some(404));

        let kept = tokio_test::block_on(backend.load(ANONYMOUS_USER_ID.to_string(), guid, true))
            .unwrap();
        assert_eq!(kept.entry("P1").unwrap().quantity, 2);
        assert_eq!(backend.cart_count(), 1);
    }

    #[test]
    fn injected_failure_applies_once() {
        let backend = InMemoryCartBackend::new();
        backend.fail_next(CallKind::LoadTitles, 503);

        let first = tokio_test::block_on(backend.load_titles());
        assert_eq!(first.unwrap_err().status(), Some(503));

        let second = tokio_test::block_on(backend.load_titles());
        assert_eq!(second.unwrap().len(), 2);

        assert_eq!(backend.calls_of(CallKind::LoadTitles).len(), 2);
    }

    #[test]
    fn missing_cart_is_not_found() {
        let backend = InMemoryCartBackend::new();
        let result = tokio_test::block_on(backend.load(
            "u1".to_string(),
            CURRENT_CART_ID.to_string(),
            false,
        ));
        assert_eq!(result.unwrap_err().status(), Some(404));
    }

    #[test]
    fn coupons_are_paged() {
        let backend = InMemoryCartBackend::new();
        backend.set_coupons(
            (0..5)
                .map(|n| CustomerCoupon {
                    coupon_id: Some(format!("C{n}")),
                    ..CustomerCoupon::default()
                })
                .collect(),
        );

        let page = tokio_test::block_on(backend.load_customer_coupons(
            "u1".to_string(),
            2,
            2,
            "startDate:asc".to_string(),
        ))
        .unwrap();

        assert_eq!(page.coupons.len(), 1);
        let pagination = page.pagination.unwrap();
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.total_results, 5);
    }
}
