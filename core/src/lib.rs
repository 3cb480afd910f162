//! # Storefront Core
//!
//! Core traits and types for the storefront state architecture.
//!
//! Storefront features (cart session, user account flows, global messages) are
//! written as reducers: pure functions that update feature state and describe
//! the backend calls to make, without making them.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature (e.g. the cart session)
//! - **Action**: All possible inputs to a reducer (facade calls, provider
//!   notifications, backend results)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits (backend adapters, clock)
//!
//! ## Example
//!
//! ```ignore
//! use storefront_core::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct MiniCartState {
//!     total_items: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum MiniCartAction {
//!     ItemAdded,
//! }
//!
//! impl Reducer for MiniCartReducer {
//!     type State = MiniCartState;
//!     type Action = MiniCartAction;
//!     type Environment = MiniCartEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut MiniCartState,
//!         action: MiniCartAction,
//!         env: &MiniCartEnvironment,
//!     ) -> SmallVec<[Effect<MiniCartAction>; 4]> {
//!         state.total_items += 1;
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer composition utilities
pub mod composition;

/// Declarative macros for effect construction
pub mod effect_macros;

pub use effect::Effect;
pub use reducer::Reducer;

/// The [`Reducer`](reducer::Reducer) trait
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Decision logic of one storefront feature
    ///
    /// A reducer owns no I/O. Everything it needs from outside (adapters,
    /// clock, other feature services) comes through `Environment`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CartReducer {
    ///     type State = CartSession;
    ///     type Action = CartAction;
    ///     type Environment = CartEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut CartSession,
    ///         action: CartAction,
    ///         env: &CartEnvironment,
    ///     ) -> SmallVec<[Effect<CartAction>; 4]> {
    ///         match action {
    ///             CartAction::AddEntry { product_code, quantity } => {
    ///                 // Decision logic here
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Apply `action` to `state` and describe the follow-up work
        ///
        /// Backend calls belong in the returned effects; the store runs them
        /// after the state write lock is released.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Work returned by reducers for the store to run
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// A backend call, timer or group of them
    ///
    /// Any action an effect yields is sent back through the same reducer.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (message timeouts)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Async work, usually a backend call, yielding at most one action
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().all(Effect::is_none)
                },
                Effect::Delay { .. } | Effect::Future(_) => false,
            }
        }
    }
}

/// Dependencies shared by every feature environment
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of timestamps for loaded carts and shown messages
    ///
    /// Tests use `storefront_testing::FixedClock`.
    pub trait Clock: Send + Sync {
        /// Current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
