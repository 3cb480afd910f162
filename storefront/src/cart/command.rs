//! Backend-addressed cart commands and their results

use crate::model::{Address, Cart, CartModification, DeliveryMode};
use std::fmt;

/// A cart command, addressed with the `(user_id, cart_id)` pair captured
/// when it was issued
#[derive(Clone, Debug, PartialEq)]
pub enum CartCommand {
    /// Create a new cart for the user
    CreateCart {
        /// Cart owner
        user_id: String,
    },
    /// Load a cart
    LoadCart {
        /// Cart owner
        user_id: String,
        /// Cart to load; `"current"` for the user's active cart
        cart_id: String,
        /// Load with every field instead of the default set
        details: bool,
    },
    /// Merge the anonymous cart into the user's account cart
    MergeCart {
        /// Account the cart is merged into
        user_id: String,
        /// Guid of the anonymous cart
        cart_id: String,
    },
    /// Add a product
    AddEntry {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Product to add
        product_code: String,
        /// Quantity to add
        quantity: u32,
    },
    /// Change the quantity of an entry
    UpdateEntry {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Entry to change
        entry_number: u32,
        /// New quantity, always positive
        quantity: u32,
    },
    /// Remove an entry
    RemoveEntry {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Entry to remove
        entry_number: u32,
    },
    /// Apply a voucher
    AddVoucher {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Voucher code
        voucher_id: String,
    },
    /// Remove an applied voucher
    RemoveVoucher {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Voucher code
        voucher_id: String,
    },
    /// Save a new delivery address on the cart
    CreateDeliveryAddress {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Address to save
        address: Address,
    },
    /// Use a saved address for delivery
    SetDeliveryAddress {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Id of the saved address
        address_id: String,
    },
    /// Choose how the cart is delivered
    SetDeliveryMode {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
        /// Delivery mode code
        mode_id: String,
    },
    /// Fetch the delivery mode set on the cart
    LoadDeliveryMode {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
    },
    /// Fetch the delivery modes the cart supports
    LoadSupportedDeliveryModes {
        /// Cart owner
        user_id: String,
        /// Target cart
        cart_id: String,
    },
}

impl CartCommand {
    /// Short name for logs and metrics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateCart { .. } => "create_cart",
            Self::LoadCart { .. } => "load_cart",
            Self::MergeCart { .. } => "merge_cart",
            Self::AddEntry { .. } => "add_entry",
            Self::UpdateEntry { .. } => "update_entry",
            Self::RemoveEntry { .. } => "remove_entry",
            Self::AddVoucher { .. } => "add_voucher",
            Self::RemoveVoucher { .. } => "remove_voucher",
            Self::CreateDeliveryAddress { .. } => "create_delivery_address",
            Self::SetDeliveryAddress { .. } => "set_delivery_address",
            Self::SetDeliveryMode { .. } => "set_delivery_mode",
            Self::LoadDeliveryMode { .. } => "load_delivery_mode",
            Self::LoadSupportedDeliveryModes { .. } => "load_supported_delivery_modes",
        }
    }

    /// The user the command is addressed to
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::CreateCart { user_id }
            | Self::LoadCart { user_id, .. }
            | Self::MergeCart { user_id, .. }
            | Self::AddEntry { user_id, .. }
            | Self::UpdateEntry { user_id, .. }
            | Self::RemoveEntry { user_id, .. }
            | Self::AddVoucher { user_id, .. }
            | Self::RemoveVoucher { user_id, .. }
            | Self::CreateDeliveryAddress { user_id, .. }
            | Self::SetDeliveryAddress { user_id, .. }
            | Self::SetDeliveryMode { user_id, .. }
            | Self::LoadDeliveryMode { user_id, .. }
            | Self::LoadSupportedDeliveryModes { user_id, .. } => user_id,
        }
    }

    /// The cart the command is addressed to; empty for cart creation
    #[must_use]
    pub fn cart_id(&self) -> &str {
        match self {
            Self::CreateCart { .. } => "",
            Self::LoadCart { cart_id, .. }
            | Self::MergeCart { cart_id, .. }
            | Self::AddEntry { cart_id, .. }
            | Self::UpdateEntry { cart_id, .. }
            | Self::RemoveEntry { cart_id, .. }
            | Self::AddVoucher { cart_id, .. }
            | Self::RemoveVoucher { cart_id, .. }
            | Self::CreateDeliveryAddress { cart_id, .. }
            | Self::SetDeliveryAddress { cart_id, .. }
            | Self::SetDeliveryMode { cart_id, .. }
            | Self::LoadDeliveryMode { cart_id, .. }
            | Self::LoadSupportedDeliveryModes { cart_id, .. } => cart_id,
        }
    }

    /// Whether a successful result replaces the cart content
    #[must_use]
    pub const fn replaces_cart(&self) -> bool {
        matches!(
            self,
            Self::CreateCart { .. } | Self::LoadCart { .. } | Self::MergeCart { .. }
        )
    }

    /// Whether a successful result makes the loaded cart stale
    #[must_use]
    pub const fn requires_refresh(&self) -> bool {
        matches!(
            self,
            Self::AddEntry { .. }
                | Self::UpdateEntry { .. }
                | Self::RemoveEntry { .. }
                | Self::AddVoucher { .. }
                | Self::RemoveVoucher { .. }
                | Self::SetDeliveryAddress { .. }
                | Self::SetDeliveryMode { .. }
        )
    }
}

impl fmt::Display for CartCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.name(), self.user_id(), self.cart_id())
    }
}

/// The single mutation that may wait for cart creation
///
/// It carries no identity: the pair is resolved when the command drains,
/// which is after the cart exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeferredCommand {
    /// Add an entry once the cart exists
    AddEntry {
        /// Product to add
        product_code: String,
        /// Quantity to add
        quantity: u32,
    },
}

/// What a successful command returned
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    /// Full cart content (create, load, merge)
    Cart(Cart),
    /// Entry modification result
    Modification(CartModification),
    /// The saved delivery address
    Address(Address),
    /// The delivery mode set on the cart
    DeliveryMode(DeliveryMode),
    /// Delivery modes supported by the cart
    DeliveryModes(Vec<DeliveryMode>),
    /// Completed without a body
    Acknowledged,
}
