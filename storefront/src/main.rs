//! Storefront session demo.
//!
//! Walks one shopper session through the cart flows: an anonymous add that
//! creates the cart, a login that merges it into the account cart, and a
//! password reset request with its confirmation message.
//!
//! # Usage
//!
//! In-process backend:
//! ```bash
//! cargo run --bin storefront
//! ```
//!
//! Against an OCC backend:
//! ```bash
//! STOREFRONT_BACKEND=occ OCC_BASE_URL=https://localhost:9002 \
//!   DEMO_USER_ID=jane@example.com DEMO_ACCESS_TOKEN=... \
//!   cargo run --bin storefront
//! ```

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use storefront::connectors::UserAdapter;
use storefront::global_message::GlobalMessageEnvironment;
use storefront::occ::OccBackend;
use storefront::{
    BackendKind, BaseSite, CartEnvironment, CartService, GlobalMessageService, GlobalMessageType,
    InMemoryCartBackend, StorefrontConfig, UserEnvironment, UserService, UserToken,
};
use storefront_core::environment::{Clock, SystemClock};
use tokio::sync::watch;
use tracing::info;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = StorefrontConfig::from_env().context("loading configuration")?;
    storefront::logging::init(&config.log_level).context("installing log subscriber")?;
    storefront_runtime::metrics::describe();
    storefront::metrics::describe();

    info!(backend = ?config.backend, site = %config.occ.base_site, "Starting storefront session");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let messages = GlobalMessageService::new(GlobalMessageEnvironment {
        clock: Arc::clone(&clock),
        config: config.messages.clone(),
    });
    let (cart_env, users): (CartEnvironment, Arc<dyn UserAdapter>) = match config.backend {
        BackendKind::Memory => {
            let backend = Arc::new(InMemoryCartBackend::new());
            (
                CartEnvironment::from_backend(
                    Arc::clone(&backend),
                    messages.clone(),
                    Arc::clone(&clock),
                ),
                backend as Arc<dyn UserAdapter>,
            )
        },
        BackendKind::Occ => {
            let backend = Arc::new(OccBackend::new(&config.occ).context("building OCC client")?);
            (
                CartEnvironment::from_backend(
                    Arc::clone(&backend),
                    messages.clone(),
                    Arc::clone(&clock),
                ),
                backend as Arc<dyn UserAdapter>,
            )
        },
    };

    let cart = CartService::with_capacity(cart_env, config.store.broadcast_capacity);
    let user = UserService::new(UserEnvironment {
        users,
        messages: messages.clone(),
    });

    let (_site_tx, site_rx) = watch::channel(BaseSite::new(config.occ.base_site.clone()));
    let (token_tx, token_rx) = watch::channel(UserToken::anonymous());
    let watcher = cart.attach(site_rx, token_rx);

    // Anonymous shopper adds a product before any cart exists
    cart.add_entry("1934793", 2).await?;
    cart.wait_until_settled(SETTLE_TIMEOUT).await?;
    let active = cart.active().await;
    info!(
        guid = ?active.guid,
        entries = active.entries.len(),
        "Anonymous cart ready"
    );

    // Login merges the anonymous cart into the account cart
    let user_id =
        std::env::var("DEMO_USER_ID").unwrap_or_else(|_| "jane@example.com".to_string());
    let access_token =
        std::env::var("DEMO_ACCESS_TOKEN").unwrap_or_else(|_| "demo-token".to_string());
    token_tx
        .send(UserToken::for_user(user_id.clone(), access_token))
        .context("publishing user token")?;
    tokio::time::timeout(SETTLE_TIMEOUT, async {
        while cart.identity().await.user_id != user_id {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("waiting for the login to reach the cart")?;
    cart.wait_until_settled(SETTLE_TIMEOUT).await?;

    let active = cart.active().await;
    info!(
        code = ?active.code,
        entries = active.entries.len(),
        merged = cart.merge_complete().await,
        "Account cart ready"
    );
    if let Some(error) = cart.last_error().await {
        info!(%error, "Last cart failure");
    }

    // Password reset with confirmation message
    user.request_forgot_password_email(user_id).await?;
    user.wait_until_settled(SETTLE_TIMEOUT).await?;
    for message in messages.get(GlobalMessageType::Confirmation).await {
        info!(text = ?message.text, "Confirmation shown");
    }

    drop(token_tx);
    tokio::try_join!(
        cart.shutdown(SETTLE_TIMEOUT),
        user.shutdown(SETTLE_TIMEOUT),
        messages.shutdown(SETTLE_TIMEOUT),
    )?;
    watcher.await.context("joining context watcher")?;

    info!("Storefront session finished");
    Ok(())
}
