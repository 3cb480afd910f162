//! Integration tests for the OCC backend against a mock HTTP server
//!
//! Each test mounts the exact request the adapter is expected to send
//! (method, path, query, headers and body) and checks how the answer is
//! decoded or mapped to an error.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use storefront::cart::{CartAction, CartCommand, CartEnvironment, CartService, CommandOutcome};
use storefront::config::{GlobalMessageConfig, OccConfig};
use storefront::connectors::{
    CartAdapter, CartDeliveryAdapter, CartEntryAdapter, CartVoucherAdapter, ContextAdapter,
    UserAdapter,
};
use storefront::global_message::{GlobalMessageEnvironment, GlobalMessageService};
use storefront::model::{Address, BaseSite, Cart, UserToken};
use storefront::occ::OccBackend;
use storefront::{ANONYMOUS_USER_ID, OccError};
use storefront_testing::test_clock;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SETTLE: Duration = Duration::from_secs(5);
const USER: &str = "jane@example.com";
const SITE: &str = "/occ/v2/electronics";

// ============================================================================
// Fixtures
// ============================================================================

fn backend(server: &MockServer) -> OccBackend {
    OccBackend::new(&OccConfig {
        base_url: server.uri(),
        prefix: "/occ/v2/".to_string(),
        base_site: "electronics".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn cart_json(guid: &str, code: &str) -> Value {
    json!({
        "code": code,
        "guid": guid,
        "totalItems": 1,
        "entries": [{"entryNumber": 0, "quantity": 2, "product": {"code": "1934793"}}]
    })
}

// ============================================================================
// Carts
// ============================================================================

#[tokio::test]
async fn create_posts_merge_parameters_with_full_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/users/{USER}/carts")))
        .and(query_param("fields", "FULL"))
        .and(query_param("oldCartId", "anon-guid"))
        .and(query_param("toMergeCartGuid", "user-guid"))
        .respond_with(ResponseTemplate::new(201).set_body_json(cart_json("user-guid", "00000002")))
        .expect(1)
        .mount(&server)
        .await;

    let cart = backend(&server)
        .create(
            USER.to_string(),
            Some("anon-guid".to_string()),
            Some("user-guid".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(cart.guid.as_deref(), Some("user-guid"));
    assert_eq!(cart.entry("1934793").unwrap().quantity, 2);
}

#[tokio::test]
async fn load_asks_for_full_or_default_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/users/{ANONYMOUS_USER_ID}/carts/g1")))
        .and(query_param("fields", "FULL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json("g1", "00000001")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/users/{ANONYMOUS_USER_ID}/carts/g1")))
        .and(query_param("fields", "DEFAULT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"guid": "g1"})))
        .expect(1)
        .mount(&server)
        .await;
    let backend = backend(&server);

    let full = backend
        .load(ANONYMOUS_USER_ID.to_string(), "g1".to_string(), true)
        .await
        .unwrap();
    let short = backend
        .load(ANONYMOUS_USER_ID.to_string(), "g1".to_string(), false)
        .await
        .unwrap();

    assert_eq!(full.entries.len(), 1);
    assert!(short.entries.is_empty());
}

// ============================================================================
// Entries and vouchers
// ============================================================================

#[tokio::test]
async fn entry_mutations_send_forms() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/users/{ANONYMOUS_USER_ID}/carts/g1/entries")))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("code=1934793&qty=2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"statusCode": "success", "quantityAdded": 2})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{SITE}/users/{ANONYMOUS_USER_ID}/carts/g1/entries/0")))
        .and(body_string("qty=5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quantity": 5})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{SITE}/users/{ANONYMOUS_USER_ID}/carts/g1/entries/0")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let backend = backend(&server);

    let added = CartEntryAdapter::add(
        &backend,
        ANONYMOUS_USER_ID.to_string(),
        "g1".to_string(),
        "1934793".to_string(),
        2,
    )
    .await
    .unwrap();
    let updated = backend
        .update(ANONYMOUS_USER_ID.to_string(), "g1".to_string(), 0, 5)
        .await
        .unwrap();
    CartEntryAdapter::remove(&backend, ANONYMOUS_USER_ID.to_string(), "g1".to_string(), 0)
        .await
        .unwrap();

    assert_eq!(added.quantity_added, Some(2));
    assert_eq!(updated.quantity, Some(5));
}

#[tokio::test]
async fn vouchers_use_query_and_encoded_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/users/{USER}/carts/00000002/vouchers")))
        .and(query_param("voucherId", "50% OFF"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{SITE}/users/{USER}/carts/00000002/vouchers/50%25%20OFF")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let backend = backend(&server);

    CartVoucherAdapter::add(
        &backend,
        USER.to_string(),
        "00000002".to_string(),
        "50% OFF".to_string(),
    )
    .await
    .unwrap();
    CartVoucherAdapter::remove(
        &backend,
        USER.to_string(),
        "00000002".to_string(),
        "50% OFF".to_string(),
    )
    .await
    .unwrap();
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test]
async fn delivery_address_is_sent_as_json() {
    let server = MockServer::start().await;
    let address = Address {
        first_name: Some("Jane".to_string()),
        line1: Some("Main Street 1".to_string()),
        town: Some("Berlin".to_string()),
        ..Address::default()
    };
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/users/{USER}/carts/00000002/addresses/delivery")))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "firstName": "Jane",
            "line1": "Main Street 1",
            "town": "Berlin"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "addr-9",
            "firstName": "Jane"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{SITE}/users/{USER}/carts/00000002/deliverymode")))
        .and(query_param("deliveryModeId", "standard-gross"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/users/{USER}/carts/00000002/deliverymodes")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deliveryModes": [{"code": "standard-gross"}, {"code": "premium-gross"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let backend = backend(&server);

    let saved = backend
        .create_address(USER.to_string(), "00000002".to_string(), address)
        .await
        .unwrap();
    backend
        .set_mode(
            USER.to_string(),
            "00000002".to_string(),
            "standard-gross".to_string(),
        )
        .await
        .unwrap();
    let modes = backend
        .get_supported_modes(USER.to_string(), "00000002".to_string())
        .await
        .unwrap();

    assert_eq!(saved.id.as_deref(), Some("addr-9"));
    assert_eq!(modes.len(), 2);
}

// ============================================================================
// User endpoints
// ============================================================================

#[tokio::test]
async fn user_endpoints_send_forms_and_paging() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/forgottenpasswordtokens")))
        .and(body_string("userId=jane%40example.com"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/users/{USER}/customercoupons")))
        .and(query_param("pageSize", "10"))
        .and(query_param("currentPage", "0"))
        .and(query_param("sort", "startDate:asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "coupons": [{"couponId": "C1"}],
            "pagination": {"currentPage": 0, "pageSize": 10, "totalPages": 1, "totalResults": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/countries")))
        .and(query_param("type", "SHIPPING"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "countries": [{"isocode": "DE"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let backend = backend(&server);

    backend
        .request_forgot_password_email(USER.to_string())
        .await
        .unwrap();
    let coupons = backend
        .load_customer_coupons(USER.to_string(), 10, 0, "startDate:asc".to_string())
        .await
        .unwrap();
    let countries = backend.load_delivery_countries().await.unwrap();

    assert_eq!(coupons.coupons[0].coupon_id.as_deref(), Some("C1"));
    assert_eq!(countries[0].isocode, "DE");
}

// ============================================================================
// Context
// ============================================================================

#[tokio::test]
async fn context_sets_site_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/occ/v2/apparel-uk/titles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "titles": [{"code": "mr"}]
        })))
        .expect(2)
        .mount(&server)
        .await;
    let backend = backend(&server);

    backend
        .apply_context(BaseSite::new("apparel-uk"), UserToken::for_user(USER, "t-1"))
        .await
        .unwrap();
    let titles = backend.load_titles().await.unwrap();
    backend
        .apply_context(BaseSite::new("apparel-uk"), UserToken::anonymous())
        .await
        .unwrap();
    backend.load_titles().await.unwrap();

    assert_eq!(titles[0].code, "mr");
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("authorization").unwrap().to_str().unwrap(),
        "Bearer t-1"
    );
    assert!(requests[1].headers.get("authorization").is_none());
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn error_status_keeps_json_body() {
    let server = MockServer::start().await;
    let body = json!({"errors": [{"type": "VoucherOperationError", "message": "Voucher is not applied."}]});
    Mock::given(method("DELETE"))
        .and(path(format!("{SITE}/users/{USER}/carts/00000002/vouchers/NOPE")))
        .respond_with(ResponseTemplate::new(400).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let error = CartVoucherAdapter::remove(
        &backend(&server),
        USER.to_string(),
        "00000002".to_string(),
        "NOPE".to_string(),
    )
    .await
    .unwrap_err();

    match error {
        OccError::Status {
            status,
            status_text,
            body: received,
            ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(status_text, "Bad Request");
            assert_eq!(received, body);
        },
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_keeps_text_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/titles")))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let error = backend(&server).load_titles().await.unwrap_err();

    assert_eq!(error.status(), Some(503));
    match error {
        OccError::Status { body, .. } => assert_eq!(body, Value::String("maintenance".to_string())),
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_answer_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/users/{USER}/carts/current")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let error = backend(&server)
        .load(USER.to_string(), "current".to_string(), false)
        .await
        .unwrap_err();

    assert!(matches!(error, OccError::Decode { .. }));
}

// ============================================================================
// Login merge over HTTP
// ============================================================================

#[tokio::test]
async fn login_without_account_cart_turns_anonymous_cart_into_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/users/{USER}/carts/current")))
        .and(query_param("fields", "DEFAULT"))
        .and(header("authorization", "Bearer t-jane"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"type": "CartError", "message": "Cart not found."}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/users/{USER}/carts")))
        .and(query_param("oldCartId", "anon-guid"))
        .and(header("authorization", "Bearer t-jane"))
        .respond_with(ResponseTemplate::new(201).set_body_json(cart_json("anon-guid", "00000001")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/users/{USER}/carts/00000001")))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json("anon-guid", "00000001")))
        .mount(&server)
        .await;

    let messages = GlobalMessageService::new(GlobalMessageEnvironment {
        clock: Arc::new(test_clock()),
        config: GlobalMessageConfig::default(),
    });
    let cart = CartService::new(CartEnvironment::from_backend(
        Arc::new(backend(&server)),
        messages,
        Arc::new(test_clock()),
    ));
    cart.store()
        .send(CartAction::CommandSucceeded {
            command: CartCommand::CreateCart {
                user_id: ANONYMOUS_USER_ID.to_string(),
            },
            outcome: CommandOutcome::Cart(Cart {
                guid: Some("anon-guid".to_string()),
                code: Some("00000001".to_string()),
                total_items: Some(1),
                ..Cart::default()
            }),
        })
        .await
        .unwrap();

    cart.store()
        .send(CartAction::ContextChanged {
            site: BaseSite::new("electronics"),
            token: UserToken::for_user(USER, "t-jane"),
        })
        .await
        .unwrap();
    cart.wait_until_settled(SETTLE).await.unwrap();

    assert_eq!(cart.last_error().await, None);
    assert!(cart.merge_complete().await);
    let identity = cart.identity().await;
    assert_eq!(identity.user_id, USER);
    assert_eq!(identity.cart_id, "00000001");

    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|request| request.method.as_str() == "POST")
        .unwrap();
    assert!(
        !create
            .url
            .query_pairs()
            .any(|(key, _)| key == "toMergeCartGuid")
    );
}
