//! Global message reducer

use super::{GlobalMessage, GlobalMessageState, GlobalMessageType};
use crate::config::GlobalMessageConfig;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::delay;
use storefront_core::effect::Effect;
use storefront_core::environment::Clock;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// Global message actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalMessageAction {
    /// Show a message
    Add(GlobalMessage),
    /// Remove the message at `index` of a kind
    Remove {
        /// Kind of the message
        kind: GlobalMessageType,
        /// Position among the messages of that kind
        index: usize,
    },
    /// A message's timeout elapsed
    Expire {
        /// Kind of the message
        kind: GlobalMessageType,
        /// Id returned when the message was added
        id: u64,
    },
    /// Remove every message of a kind
    Clear {
        /// Kind to clear
        kind: GlobalMessageType,
    },
}

/// Dependencies of the global message reducer
#[derive(Clone)]
pub struct GlobalMessageEnvironment {
    /// Timestamps for added messages
    pub clock: Arc<dyn Clock>,
    /// Per-kind timeouts
    pub config: GlobalMessageConfig,
}

impl GlobalMessageEnvironment {
    const fn timeout(&self, kind: GlobalMessageType) -> Option<Duration> {
        match kind {
            GlobalMessageType::Confirmation => self.config.confirmation_timeout,
            GlobalMessageType::Info => self.config.info_timeout,
            GlobalMessageType::Error => None,
        }
    }
}

/// Reducer for [`GlobalMessageState`]
#[derive(Clone, Debug, Default)]
pub struct GlobalMessageReducer;

impl Reducer for GlobalMessageReducer {
    type State = GlobalMessageState;
    type Action = GlobalMessageAction;
    type Environment = GlobalMessageEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            GlobalMessageAction::Add(message) => {
                let kind = message.kind;
                let Some(id) = state.add(message, env.clock.now()) else {
                    tracing::debug!(kind = kind.as_str(), "Message already shown");
                    return smallvec![Effect::None];
                };

                tracing::debug!(kind = kind.as_str(), id, "Message added");
                metrics::counter!(crate::metrics::GLOBAL_MESSAGES_ADDED, "kind" => kind.as_str())
                    .increment(1);

                match env.timeout(kind) {
                    Some(timeout) => smallvec![delay! {
                        duration: timeout,
                        action: GlobalMessageAction::Expire { kind, id }
                    }],
                    None => smallvec![Effect::None],
                }
            },
            GlobalMessageAction::Remove { kind, index } => {
                if state.remove(kind, index).is_none() {
                    tracing::debug!(kind = kind.as_str(), index, "No message to remove");
                }
                smallvec![Effect::None]
            },
            GlobalMessageAction::Expire { kind, id } => {
                state.remove_by_id(kind, id);
                smallvec![Effect::None]
            },
            GlobalMessageAction::Clear { kind } => {
                state.clear(kind);
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)] // Test code can panic
mod tests {
    use super::*;
    use crate::global_message::Translatable;
    use storefront_testing::{ReducerTest, assertions, test_clock};

    fn environment(confirmation_timeout: Option<Duration>) -> GlobalMessageEnvironment {
        GlobalMessageEnvironment {
            clock: Arc::new(test_clock()),
            config: GlobalMessageConfig {
                confirmation_timeout,
                info_timeout: None,
            },
        }
    }

    #[test]
    fn confirmation_is_scheduled_to_expire() {
        ReducerTest::new(GlobalMessageReducer)
            .with_env(environment(Some(Duration::from_secs(3))))
            .given_state(GlobalMessageState::new())
            .when_action(GlobalMessageAction::Add(GlobalMessage::confirmation(
                "forgottenPassword.passwordResetEmailSent",
            )))
            .then_state(|state| {
                let shown = state.messages(GlobalMessageType::Confirmation);
                assert_eq!(shown.len(), 1);
                assert_eq!(shown[0].added_at, test_clock().now());
            })
            .then_effects(|effects| {
                assertions::assert_has_delay_effect(effects);
                match &effects[0] {
                    Effect::Delay { duration, action } => {
                        assert_eq!(*duration, Duration::from_secs(3));
                        assert_eq!(
                            **action,
                            GlobalMessageAction::Expire {
                                kind: GlobalMessageType::Confirmation,
                                id: 1,
                            }
                        );
                    },
                    other => panic!("expected a delay, got {other:?}"),
                }
            })
            .run();
    }

    #[test]
    fn errors_stay_until_removed() {
        ReducerTest::new(GlobalMessageReducer)
            .with_env(environment(Some(Duration::from_secs(3))))
            .given_state(GlobalMessageState::new())
            .when_action(GlobalMessageAction::Add(GlobalMessage::error("Cart not found.")))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn duplicate_add_schedules_nothing() {
        let message = GlobalMessage::confirmation("done");

        ReducerTest::new(GlobalMessageReducer)
            .with_env(environment(Some(Duration::from_secs(3))))
            .given_state(GlobalMessageState::new())
            .when_action(GlobalMessageAction::Add(message.clone()))
            .when_action(GlobalMessageAction::Add(message))
            .then_state(|state| assert_eq!(state.len(), 1))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn expire_removes_only_that_message() {
        ReducerTest::new(GlobalMessageReducer)
            .with_env(environment(None))
            .given_state(GlobalMessageState::new())
            .when_action(GlobalMessageAction::Add(GlobalMessage::confirmation("a")))
            .when_action(GlobalMessageAction::Add(GlobalMessage::confirmation("b")))
            .when_action(GlobalMessageAction::Expire {
                kind: GlobalMessageType::Confirmation,
                id: 1,
            })
            .then_state(|state| {
                let shown = state.messages(GlobalMessageType::Confirmation);
                assert_eq!(shown.len(), 1);
                assert_eq!(shown[0].text, Translatable::key("b"));
            })
            .run();
    }
}
