//! OCC REST backend.
//!
//! [`OccBackend`] implements every adapter trait against the commerce
//! backend's OCC v2 API. Endpoints are relative to
//! `{base_url}{prefix}{site}/`, with each id percent-encoded as one path
//! segment:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | create cart | `POST users/{user}/carts?oldCartId&toMergeCartGuid` |
//! | load cart | `GET users/{user}/carts/{cart}?fields=FULL\|DEFAULT` |
//! | add entry | `POST users/{user}/carts/{cart}/entries` (form `code`, `qty`) |
//! | update entry | `PATCH users/{user}/carts/{cart}/entries/{n}` (form `qty`) |
//! | remove entry | `DELETE users/{user}/carts/{cart}/entries/{n}` |
//! | add voucher | `POST users/{user}/carts/{cart}/vouchers?voucherId` |
//! | remove voucher | `DELETE users/{user}/carts/{cart}/vouchers/{id}` |
//! | create address | `POST users/{user}/carts/{cart}/addresses/delivery` (JSON) |
//! | set address | `PUT users/{user}/carts/{cart}/addresses/delivery?addressId` |
//! | set mode | `PUT users/{user}/carts/{cart}/deliverymode?deliveryModeId` |
//! | get mode | `GET users/{user}/carts/{cart}/deliverymode` |
//! | supported modes | `GET users/{user}/carts/{cart}/deliverymodes` |
//! | reset email | `POST forgottenpasswordtokens` (form `userId`) |
//! | coupons | `GET users/{user}/customercoupons?pageSize&currentPage&sort` |
//! | titles | `GET titles` |
//! | countries | `GET countries?type=SHIPPING` |

use crate::config::OccConfig;
use crate::connectors::{
    AdapterFuture, CartAdapter, CartDeliveryAdapter, CartEntryAdapter, CartVoucherAdapter,
    ContextAdapter, UserAdapter,
};
use crate::error::OccError;
use crate::model::{
    Address, BaseSite, Cart, CartModification, Country, CustomerCouponSearchResult, DeliveryMode,
    Title, UserToken,
};
use reqwest::Method;
use serde::Deserialize;

pub mod client;
pub mod endpoints;

pub use client::OccClient;
pub use endpoints::OccEndpoints;

use client::Body;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryModeList {
    #[serde(default)]
    delivery_modes: Vec<DeliveryMode>,
}

#[derive(Debug, Default, Deserialize)]
struct TitleList {
    #[serde(default)]
    titles: Vec<Title>,
}

#[derive(Debug, Default, Deserialize)]
struct CountryList {
    #[serde(default)]
    countries: Vec<Country>,
}

/// Adapters backed by the OCC REST API
pub struct OccBackend {
    client: OccClient,
}

impl OccBackend {
    /// Create a backend for the configured base URL and site
    ///
    /// # Errors
    ///
    /// Returns [`OccError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &OccConfig) -> Result<Self, OccError> {
        Ok(Self {
            client: OccClient::new(config)?,
        })
    }

    /// The underlying HTTP client
    #[must_use]
    pub const fn client(&self) -> &OccClient {
        &self.client
    }
}

impl ContextAdapter for OccBackend {
    fn apply_context(&self, site: BaseSite, token: UserToken) -> AdapterFuture<'_, ()> {
        Box::pin(async move {
            self.client.set_site(&site.uid).await;
            self.client.set_token(token.access_token).await;
            Ok(())
        })
    }
}

impl CartAdapter for OccBackend {
    fn create(
        &self,
        user_id: String,
        old_cart_id: Option<String>,
        to_merge_cart_guid: Option<String>,
    ) -> AdapterFuture<'_, Cart> {
        Box::pin(async move {
            let mut query = vec![("fields", "FULL")];
            if let Some(old_cart_id) = old_cart_id.as_deref() {
                query.push(("oldCartId", old_cart_id));
            }
            if let Some(guid) = to_merge_cart_guid.as_deref() {
                query.push(("toMergeCartGuid", guid));
            }

            let url = self.client.url(&OccEndpoints::carts(&user_id), &query).await?;
            self.client.fetch(Method::POST, url, Body::None).await
        })
    }

    fn load(&self, user_id: String, cart_id: String, details: bool) -> AdapterFuture<'_, Cart> {
        Box::pin(async move {
            let fields = if details { "FULL" } else { "DEFAULT" };
            let url = self
                .client
                .url(&OccEndpoints::cart(&user_id, &cart_id, &[]), &[("fields", fields)])
                .await?;
            self.client.fetch(Method::GET, url, Body::None).await
        })
    }
}

impl CartEntryAdapter for OccBackend {
    fn add(
        &self,
        user_id: String,
        cart_id: String,
        product_code: String,
        quantity: u32,
    ) -> AdapterFuture<'_, CartModification> {
        Box::pin(async move {
            let url = self
                .client
                .url(&OccEndpoints::cart(&user_id, &cart_id, &["entries"]), &[])
                .await?;
            let form = [("code", product_code), ("qty", quantity.to_string())];
            self.client.fetch(Method::POST, url, Body::Form(&form)).await
        })
    }

    fn update(
        &self,
        user_id: String,
        cart_id: String,
        entry_number: u32,
        quantity: u32,
    ) -> AdapterFuture<'_, CartModification> {
        Box::pin(async move {
            let entry = entry_number.to_string();
            let segments = OccEndpoints::cart(&user_id, &cart_id, &["entries", entry.as_str()]);
            let url = self.client.url(&segments, &[]).await?;
            let form = [("qty", quantity.to_string())];
            self.client.fetch(Method::PATCH, url, Body::Form(&form)).await
        })
    }

    fn remove(
        &self,
        user_id: String,
        cart_id: String,
        entry_number: u32,
    ) -> AdapterFuture<'_, ()> {
        Box::pin(async move {
            let entry = entry_number.to_string();
            let segments = OccEndpoints::cart(&user_id, &cart_id, &["entries", entry.as_str()]);
            let url = self.client.url(&segments, &[]).await?;
            self.client.execute(Method::DELETE, url, Body::None).await
        })
    }
}

impl CartVoucherAdapter for OccBackend {
    fn add(&self, user_id: String, cart_id: String, voucher_id: String) -> AdapterFuture<'_, ()> {
        Box::pin(async move {
            let url = self
                .client
                .url(
                    &OccEndpoints::cart(&user_id, &cart_id, &["vouchers"]),
                    &[("voucherId", voucher_id.as_str())],
                )
                .await?;
            self.client.execute(Method::POST, url, Body::None).await
        })
    }

    fn remove(
        &self,
        user_id: String,
        cart_id: String,
        voucher_id: String,
    ) -> AdapterFuture<'_, ()> {
        Box::pin(async move {
            let segments = OccEndpoints::cart(&user_id, &cart_id, &["vouchers", voucher_id.as_str()]);
            let url = self.client.url(&segments, &[]).await?;
            self.client.execute(Method::DELETE, url, Body::None).await
        })
    }
}

impl CartDeliveryAdapter for OccBackend {
    fn create_address(
        &self,
        user_id: String,
        cart_id: String,
        address: Address,
    ) -> AdapterFuture<'_, Address> {
        Box::pin(async move {
            let url = self
                .client
                .url(
                    &OccEndpoints::cart(&user_id, &cart_id, &["addresses", "delivery"]),
                    &[],
                )
                .await?;
            let body = serde_json::to_value(&address).map_err(|e| OccError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            self.client.fetch(Method::POST, url, Body::Json(&body)).await
        })
    }

    fn set_address(
        &self,
        user_id: String,
        cart_id: String,
        address_id: String,
    ) -> AdapterFuture<'_, ()> {
        Box::pin(async move {
            let url = self
                .client
                .url(
                    &OccEndpoints::cart(&user_id, &cart_id, &["addresses", "delivery"]),
                    &[("addressId", address_id.as_str())],
                )
                .await?;
            self.client.execute(Method::PUT, url, Body::None).await
        })
    }

    fn set_mode(
        &self,
        user_id: String,
        cart_id: String,
        mode_id: String,
    ) -> AdapterFuture<'_, ()> {
        Box::pin(async move {
            let url = self
                .client
                .url(
                    &OccEndpoints::cart(&user_id, &cart_id, &["deliverymode"]),
                    &[("deliveryModeId", mode_id.as_str())],
                )
                .await?;
            self.client.execute(Method::PUT, url, Body::None).await
        })
    }

    fn get_mode(&self, user_id: String, cart_id: String) -> AdapterFuture<'_, DeliveryMode> {
        Box::pin(async move {
            let url = self
                .client
                .url(&OccEndpoints::cart(&user_id, &cart_id, &["deliverymode"]), &[])
                .await?;
            self.client.fetch(Method::GET, url, Body::None).await
        })
    }

    fn get_supported_modes(
        &self,
        user_id: String,
        cart_id: String,
    ) -> AdapterFuture<'_, Vec<DeliveryMode>> {
        Box::pin(async move {
            let url = self
                .client
                .url(&OccEndpoints::cart(&user_id, &cart_id, &["deliverymodes"]), &[])
                .await?;
            let list: DeliveryModeList = self.client.fetch(Method::GET, url, Body::None).await?;
            Ok(list.delivery_modes)
        })
    }
}

impl UserAdapter for OccBackend {
    fn request_forgot_password_email(&self, email: String) -> AdapterFuture<'_, ()> {
        Box::pin(async move {
            let url = self.client.url(&["forgottenpasswordtokens"], &[]).await?;
            let form = [("userId", email)];
            self.client.execute(Method::POST, url, Body::Form(&form)).await
        })
    }

    fn load_customer_coupons(
        &self,
        user_id: String,
        page_size: u32,
        current_page: u32,
        sort: String,
    ) -> AdapterFuture<'_, CustomerCouponSearchResult> {
        Box::pin(async move {
            let page_size = page_size.to_string();
            let current_page = current_page.to_string();
            let url = self
                .client
                .url(
                    &["users", user_id.as_str(), "customercoupons"],
                    &[
                        ("pageSize", page_size.as_str()),
                        ("currentPage", current_page.as_str()),
                        ("sort", sort.as_str()),
                    ],
                )
                .await?;
            self.client.fetch(Method::GET, url, Body::None).await
        })
    }

    fn load_titles(&self) -> AdapterFuture<'_, Vec<Title>> {
        Box::pin(async move {
            let url = self.client.url(&["titles"], &[]).await?;
            let list: TitleList = self.client.fetch(Method::GET, url, Body::None).await?;
            Ok(list.titles)
        })
    }

    fn load_delivery_countries(&self) -> AdapterFuture<'_, Vec<Country>> {
        Box::pin(async move {
            let url = self.client.url(&["countries"], &[("type", "SHIPPING")]).await?;
            let list: CountryList = self.client.fetch(Method::GET, url, Body::None).await?;
            Ok(list.countries)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn decodes_list_envelopes() {
        let modes: DeliveryModeList = serde_json::from_value(serde_json::json!({
            "deliveryModes": [{"code": "standard-gross", "name": "Standard Delivery"}]
        }))
        .unwrap();
        assert_eq!(modes.delivery_modes.len(), 1);
        assert_eq!(modes.delivery_modes[0].code.as_deref(), Some("standard-gross"));

        let titles: TitleList = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(titles.titles.is_empty());

        let countries: CountryList = serde_json::from_value(serde_json::json!({
            "countries": [{"isocode": "DE", "name": "Germany"}]
        }))
        .unwrap();
        assert_eq!(countries.countries[0].isocode, "DE");
    }

    #[test]
    fn decodes_cart_payload() {
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "code": "00000001",
            "guid": "7a1b-guid",
            "totalItems": 1,
            "entries": [{
                "entryNumber": 0,
                "quantity": 2,
                "product": {"code": "1934793"}
            }]
        }))
        .unwrap();

        assert!(cart.is_created());
        assert_eq!(cart.entry("1934793").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let backend = OccBackend::new(&OccConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            prefix: "/occ/v2/".to_string(),
            base_site: "electronics".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let error = backend.load_titles().await.unwrap_err();

        assert!(matches!(error, OccError::Transport { .. }));
        assert_eq!(error.status(), None);
    }
}
