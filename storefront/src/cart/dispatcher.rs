//! Mutation dispatcher: turns facade calls into cart commands.
//!
//! Every command is addressed with the identity captured here, at dispatch.

use super::command::{CartCommand, DeferredCommand};
use super::session::CartSession;
use crate::model::Address;

/// Add an entry, creating the cart first when there is none
///
/// Without a cart the entry is parked in the deferred slot, overwriting
/// whatever was parked there, and `CreateCart` is returned unless a creation
/// is already in flight. The parked entry is dispatched when the created cart
/// arrives.
pub fn add_entry(
    session: &mut CartSession,
    product_code: String,
    quantity: u32,
) -> Option<CartCommand> {
    if session.cart.is_created() {
        return Some(resolve_deferred(
            session,
            DeferredCommand::AddEntry {
                product_code,
                quantity,
            },
        ));
    }

    let replaced = session.pending.defer(DeferredCommand::AddEntry {
        product_code,
        quantity,
    });
    if let Some(replaced) = replaced {
        tracing::debug!(?replaced, "Deferred cart command overwritten");
        metrics::counter!(crate::metrics::CART_DEFERRED_OVERWRITTEN).increment(1);
    }

    if session.creating {
        tracing::debug!("Cart creation in flight, entry parked");
        return None;
    }

    session.creating = true;
    Some(CartCommand::CreateCart {
        user_id: session.user_id.clone(),
    })
}

/// Address a drained deferred command with the current identity
#[must_use]
pub fn resolve_deferred(session: &CartSession, command: DeferredCommand) -> CartCommand {
    let identity = session.identity();
    match command {
        DeferredCommand::AddEntry {
            product_code,
            quantity,
        } => CartCommand::AddEntry {
            user_id: identity.user_id,
            cart_id: identity.cart_id,
            product_code,
            quantity,
        },
    }
}

/// Remove an entry by number
#[must_use]
pub fn remove_entry(session: &CartSession, entry_number: u32) -> CartCommand {
    let identity = session.identity();
    CartCommand::RemoveEntry {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        entry_number,
    }
}

/// Change an entry's quantity; a quantity of zero or less removes it
#[must_use]
pub fn update_entry(session: &CartSession, entry_number: u32, quantity: i64) -> CartCommand {
    if quantity <= 0 {
        return remove_entry(session, entry_number);
    }

    let identity = session.identity();
    CartCommand::UpdateEntry {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        entry_number,
        quantity: u32::try_from(quantity).unwrap_or(u32::MAX),
    }
}

/// Apply a voucher
#[must_use]
pub fn add_voucher(session: &CartSession, voucher_id: String) -> CartCommand {
    let identity = session.identity();
    CartCommand::AddVoucher {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        voucher_id,
    }
}

/// Remove an applied voucher
#[must_use]
pub fn remove_voucher(session: &CartSession, voucher_id: String) -> CartCommand {
    let identity = session.identity();
    CartCommand::RemoveVoucher {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        voucher_id,
    }
}

/// Save an address and use it for delivery
#[must_use]
pub fn create_delivery_address(session: &CartSession, address: Address) -> CartCommand {
    let identity = session.identity();
    CartCommand::CreateDeliveryAddress {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        address,
    }
}

/// Use an existing address for delivery
#[must_use]
pub fn set_delivery_address(session: &CartSession, address_id: String) -> CartCommand {
    let identity = session.identity();
    CartCommand::SetDeliveryAddress {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        address_id,
    }
}

/// Choose a delivery mode
#[must_use]
pub fn set_delivery_mode(session: &CartSession, mode_id: String) -> CartCommand {
    let identity = session.identity();
    CartCommand::SetDeliveryMode {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
        mode_id,
    }
}

/// Fetch the delivery mode set on the cart
#[must_use]
pub fn load_delivery_mode(session: &CartSession) -> CartCommand {
    let identity = session.identity();
    CartCommand::LoadDeliveryMode {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
    }
}

/// Fetch the delivery modes the cart supports
#[must_use]
pub fn load_supported_delivery_modes(session: &CartSession) -> CartCommand {
    let identity = session.identity();
    CartCommand::LoadSupportedDeliveryModes {
        user_id: identity.user_id,
        cart_id: identity.cart_id,
    }
}
