//! Metric names recorded by the storefront features.
//!
//! Like the runtime, features only record through the `metrics` facade.

use metrics::describe_counter;

/// Cart commands issued, labelled by `command`
pub const CART_COMMANDS_ISSUED: &str = "storefront.cart.commands.issued";

/// Cart commands that failed, labelled by `command`
pub const CART_COMMANDS_FAILED: &str = "storefront.cart.commands.failed";

/// Deferred cart commands overwritten before they could run
pub const CART_DEFERRED_OVERWRITTEN: &str = "storefront.cart.deferred.overwritten";

/// User account requests issued, labelled by `request`
pub const USER_REQUESTS: &str = "storefront.user.requests";

/// User account requests that failed, labelled by `request`
pub const USER_REQUESTS_FAILED: &str = "storefront.user.requests.failed";

/// Global messages added, labelled by `kind`
pub const GLOBAL_MESSAGES_ADDED: &str = "storefront.messages.added";

/// Register descriptions for every storefront metric.
pub fn describe() {
    describe_counter!(CART_COMMANDS_ISSUED, "Cart commands sent to the backend");
    describe_counter!(CART_COMMANDS_FAILED, "Cart commands the backend rejected");
    describe_counter!(
        CART_DEFERRED_OVERWRITTEN,
        "Deferred cart commands replaced before the cart existed"
    );
    describe_counter!(USER_REQUESTS, "User account requests sent to the backend");
    describe_counter!(USER_REQUESTS_FAILED, "User account requests that failed");
    describe_counter!(GLOBAL_MESSAGES_ADDED, "Global messages shown to the shopper");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_the_storefront_prefix() {
        describe();
        for name in [
            CART_COMMANDS_ISSUED,
            CART_COMMANDS_FAILED,
            CART_DEFERRED_OVERWRITTEN,
            USER_REQUESTS,
            USER_REQUESTS_FAILED,
            GLOBAL_MESSAGES_ADDED,
        ] {
            assert!(name.starts_with("storefront."), "{name}");
        }
    }
}
