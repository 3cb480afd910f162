//! # Storefront Testing
//!
//! Testing utilities and helpers for the storefront state architecture.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A Given-When-Then harness for reducers
//! - Effect helpers that run effect descriptions to the actions they produce
//!
//! ## Example
//!
//! ```ignore
//! use storefront_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(CartReducer::new())
//!     .with_env(environment)
//!     .given_state(CartSession::default())
//!     .when_action(CartAction::UpdateEntry { entry_number: 0, quantity: 0 })
//!     .then_effects(|effects| assertions::assert_effects_count(effects, 1))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use storefront_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_testing::mocks::FixedClock;
    /// use storefront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

/// Effect helpers
pub mod helpers {
    use std::future::Future;
    use std::pin::Pin;
    use storefront_core::effect::Effect;

    /// Run effect descriptions to the actions they would feed back
    ///
    /// Futures are awaited in order, nested `Parallel`/`Sequential` effects are
    /// flattened, and `Delay` actions are returned without waiting. Follow-up
    /// effects of the returned actions are not run; feed them to the reducer
    /// to continue.
    pub fn collect_actions<A>(effects: Vec<Effect<A>>) -> Pin<Box<dyn Future<Output = Vec<A>> + Send>>
    where
        A: Send + 'static,
    {
        Box::pin(async move {
            let mut actions = Vec::new();
            for effect in effects {
                match effect {
                    Effect::None => {},
                    Effect::Future(fut) => actions.extend(fut.await),
                    Effect::Delay { action, .. } => actions.push(*action),
                    Effect::Parallel(inner) | Effect::Sequential(inner) => {
                        actions.extend(collect_actions(inner).await);
                    },
                }
            }
            actions
        })
    }
}

// Re-export commonly used items
pub use helpers::collect_actions;
pub use mocks::{FixedClock, test_clock};
