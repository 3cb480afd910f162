//! Commerce data model shared by the cart session, the user flows and the
//! backend adapters.
//!
//! Field names follow the OCC REST API (camelCase JSON); every attribute the
//! backend may omit is optional.

use serde::{Deserialize, Serialize};

/// User id used for carts of a shopper who is not logged in
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// Cart id alias for "the authenticated user's current cart"
pub const CURRENT_CART_ID: &str = "current";

/// Token emitted by the authentication provider
///
/// A token with every field absent (the default) means nobody is logged in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserToken {
    /// Authenticated user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// OAuth access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// OAuth refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token type, usually `bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl UserToken {
    /// The empty token of an anonymous session
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Token for an authenticated user
    #[must_use]
    pub fn for_user(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            access_token: Some(access_token.into()),
            token_type: Some("bearer".to_string()),
            ..Self::default()
        }
    }

    /// Whether every field is absent
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.token_type.is_none()
            && self.expires_in.is_none()
    }

    /// The user id a cart session should run under for this token
    ///
    /// Empty tokens and tokens without a usable user id resolve to
    /// [`ANONYMOUS_USER_ID`].
    #[must_use]
    pub fn resolved_user_id(&self) -> String {
        match self.user_id.as_deref() {
            Some(user_id) if !self.is_empty() && !user_id.is_empty() => user_id.to_string(),
            _ => ANONYMOUS_USER_ID.to_string(),
        }
    }
}

/// Active site context
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseSite {
    /// Site uid, e.g. `electronics`
    pub uid: String,
    /// Active language iso code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Active currency iso code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl BaseSite {
    /// Site context with only the uid set
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }
}

/// A price as returned by the backend
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Currency iso code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_iso: Option<String>,
    /// Numeric value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Value formatted for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
}

/// Minimal product reference carried by cart entries
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    /// Product code
    pub code: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One line of a cart
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry {
    /// Position of the entry, unique within its cart
    pub entry_number: u32,
    /// The product on this line
    pub product: ProductRef,
    /// Ordered quantity
    pub quantity: u32,
    /// Unit price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<Price>,
    /// Line total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Price>,
}

/// A voucher applied to a cart
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    /// Voucher code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Code the shopper typed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Discount formatted for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_formatted: Option<String>,
}

/// A country
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    /// ISO code
    pub isocode: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A personal title (Mr, Ms, ...)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    /// Title code
    pub code: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A postal address
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Backend id, absent until the address is saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Title code, e.g. `mr`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_code: Option<String>,
    /// Given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// First address line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    /// Second address line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// Town or city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    /// Postal code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Contact phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Country of the address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
}

/// A way of delivering an order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryMode {
    /// Mode code, e.g. `standard-gross`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cost of this mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_cost: Option<Price>,
}

/// A shopping cart
///
/// The default value is the "no cart" state: nothing has been created on the
/// backend yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart code, used to address carts of authenticated users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Cart guid, used to address anonymous carts and to merge them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    /// Number of entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u32>,
    /// Cart total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Price>,
    /// Cart lines in entry-number order
    #[serde(default)]
    pub entries: Vec<OrderEntry>,
    /// Applied vouchers
    #[serde(default)]
    pub applied_vouchers: Vec<Voucher>,
    /// Delivery address set on the cart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<Address>,
    /// Delivery mode set on the cart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<DeliveryMode>,
}

impl Cart {
    /// Whether the backend has created this cart
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.guid.is_some() || self.code.is_some()
    }

    /// Whether the cart holds no item
    ///
    /// A cart the backend has not created yet counts as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_items.unwrap_or(0) == 0
    }

    /// Entry for the given product, if any
    #[must_use]
    pub fn entry(&self, product_code: &str) -> Option<&OrderEntry> {
        self.entries
            .iter()
            .find(|entry| entry.product.code == product_code)
    }
}

/// Result of an entry mutation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartModification {
    /// `success`, `lowStock`, `noStock`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    /// Quantity actually added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_added: Option<u32>,
    /// Resulting quantity of the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// The modified entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<OrderEntry>,
}

/// A coupon assigned to a customer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCoupon {
    /// Coupon id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `Effective`, `PreEffective`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Start of validity, ISO 8601
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// End of validity, ISO 8601
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Whether the customer gets notified about this coupon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_on: Option<bool>,
}

/// Pagination block of OCC search results
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Zero-based page index
    pub current_page: u32,
    /// Results per page
    pub page_size: u32,
    /// Sort expression applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Number of pages
    pub total_pages: u32,
    /// Number of results
    pub total_results: u32,
}

/// One page of customer coupons
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCouponSearchResult {
    /// Coupons on this page
    #[serde(default)]
    pub coupons: Vec<CustomerCoupon>,
    /// Paging information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_anonymous() {
        assert!(UserToken::anonymous().is_empty());
        assert_eq!(UserToken::anonymous().resolved_user_id(), ANONYMOUS_USER_ID);
    }

    #[test]
    fn token_without_user_id_is_anonymous() {
        let token = UserToken {
            access_token: Some("abc".to_string()),
            ..UserToken::default()
        };
        assert_eq!(token.resolved_user_id(), ANONYMOUS_USER_ID);

        let token = UserToken::for_user("", "abc");
        assert_eq!(token.resolved_user_id(), ANONYMOUS_USER_ID);
    }

    #[test]
    fn token_with_user_id_resolves_to_it() {
        assert_eq!(UserToken::for_user("u1", "abc").resolved_user_id(), "u1");
    }

    #[test]
    fn default_cart_is_not_created_and_empty() {
        let cart = Cart::default();
        assert!(!cart.is_created());
        assert!(cart.is_empty());
    }

    #[test]
    fn uncreated_cart_with_items_is_not_empty() {
        let cart = Cart {
            total_items: Some(2),
            ..Cart::default()
        };
        assert!(!cart.is_created());
        assert!(!cart.is_empty());
    }

    #[test]
    fn cart_with_guid_and_no_items_is_created_and_empty() {
        let cart = Cart {
            guid: Some("g1".to_string()),
            total_items: Some(0),
            ..Cart::default()
        };
        assert!(cart.is_created());
        assert!(cart.is_empty());

        let cart = Cart {
            code: Some("00000001".to_string()),
            total_items: Some(3),
            ..Cart::default()
        };
        assert!(cart.is_created());
        assert!(!cart.is_empty());
    }

    #[test]
    fn cart_decodes_occ_json() {
        let json = r#"{
            "code": "00001000",
            "guid": "a1b2",
            "totalItems": 1,
            "entries": [
                {"entryNumber": 0, "product": {"code": "1934793", "name": "PowerShot"}, "quantity": 2}
            ],
            "appliedVouchers": [{"code": "SUMMER", "voucherCode": "SUMMER"}],
            "unknownField": true
        }"#;

        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.code.as_deref(), Some("00001000"));
        assert_eq!(cart.entry("1934793").map(|e| e.quantity), Some(2));
        assert_eq!(cart.applied_vouchers.len(), 1);
        assert!(cart.entry("missing").is_none());
    }
}
