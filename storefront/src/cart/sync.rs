//! Cart synchronization: reacting to identity changes and refresh requests.
//!
//! All functions here are decisions. They update the session and return the
//! command to issue; they never call the backend.

use super::command::CartCommand;
use super::session::CartSession;
use crate::model::{BaseSite, CURRENT_CART_ID, UserToken};

/// Handle a `(site, token)` emission from the context providers
///
/// Nothing happens unless the token resolves to a user other than the stored
/// one. Otherwise the identity is stored first, then:
///
/// - authenticated user without a cart: load the user's current cart
/// - authenticated user with a cart: merge that cart into the account
/// - anonymous user: no command (a logout resets the cart)
pub fn on_context_changed(
    session: &mut CartSession,
    site: BaseSite,
    token: &UserToken,
) -> Option<CartCommand> {
    session.site = Some(site);

    let incoming = token.resolved_user_id();
    if incoming == session.user_id {
        tracing::debug!(user_id = %incoming, "Cart identity unchanged");
        return None;
    }

    let previous = session.set_identity(token);
    // A creation still in flight belongs to the previous user
    session.creating = false;
    tracing::info!(from = %previous, to = %session.user_id, "Cart identity changed");

    if session.is_anonymous() {
        session.clear();
    }

    load_or_merge(session)
}

fn load_or_merge(session: &mut CartSession) -> Option<CartCommand> {
    session.get_details = true;

    if session.is_anonymous() {
        return None;
    }

    if session.cart.is_created() {
        session.merge_complete = false;
        Some(CartCommand::MergeCart {
            user_id: session.user_id.clone(),
            cart_id: session.cart.guid.clone().unwrap_or_default(),
        })
    } else {
        Some(CartCommand::LoadCart {
            user_id: session.user_id.clone(),
            cart_id: CURRENT_CART_ID.to_string(),
            details: session.get_details,
        })
    }
}

/// Reload with full details while the refresh signal is set
///
/// Level-triggered: every call with the signal set issues a load, and only a
/// completed load clears the signal. Without a cart there is nothing to load.
#[must_use]
pub fn watch_refresh(session: &CartSession) -> Option<CartCommand> {
    let identity = session.identity();
    if !session.refresh || !identity.has_cart() {
        return None;
    }

    Some(CartCommand::LoadCart {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        details: true,
    })
}

/// Load the cart with full details
///
/// Authenticated users load their known cart or `"current"`; anonymous
/// users only load when they already have a cart.
pub fn load_details(session: &mut CartSession) -> Option<CartCommand> {
    session.get_details = true;
    let identity = session.identity();

    if !identity.is_anonymous() {
        let cart_id = if identity.has_cart() {
            identity.cart_id
        } else {
            CURRENT_CART_ID.to_string()
        };
        return Some(CartCommand::LoadCart {
            user_id: identity.user_id,
            cart_id,
            details: true,
        });
    }

    identity.has_cart().then(|| CartCommand::LoadCart {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        details: true,
    })
}
