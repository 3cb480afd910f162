//! Cart session: identity, deferred commands, synchronization and mutations.
//!
//! - [`session`]: the identity store and cart content
//! - [`deferred`]: the one-slot holder for a mutation waiting for cart creation
//! - [`sync`]: load-or-merge on identity change, refresh watcher
//! - [`dispatcher`]: entry, voucher and delivery mutations
//! - [`reducer`]: wires the above into the store and runs commands
//! - [`service`]: async facade

pub mod command;
pub mod deferred;
pub mod dispatcher;
pub mod reducer;
pub mod service;
pub mod session;
pub mod sync;

pub use command::{CartCommand, CommandOutcome, DeferredCommand};
pub use deferred::DeferredSlot;
pub use reducer::{CartAction, CartEnvironment, CartReducer};
pub use service::{CartService, CartStore};
pub use session::{CartIdentity, CartSession};
