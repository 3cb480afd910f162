//! Cart reducer: the single place where the cart session changes.
//!
//! Facade calls, context notifications and backend results all arrive as
//! [`CartAction`]s. The reducer asks [`sync`](super::sync) and
//! [`dispatcher`](super::dispatcher) what to issue, and turns every issued
//! [`CartCommand`] into an effect that calls the backend and feeds back
//! [`CartAction::CommandSucceeded`] or [`CartAction::CommandFailed`].
//! Failures are also shown to the shopper as global error messages.

use super::command::{CartCommand, CommandOutcome};
use super::dispatcher;
use super::session::CartSession;
use super::sync;
use crate::connectors::{
    CartAdapter, CartDeliveryAdapter, CartEntryAdapter, CartVoucherAdapter, ContextAdapter,
};
use crate::error::OccError;
use crate::global_message::{GlobalMessage, GlobalMessageService};
use crate::model::{Address, BaseSite, CURRENT_CART_ID, Cart, UserToken};
use crate::util::serialization::{RequestFailure, SerializableError, make_error_serializable};
use std::sync::Arc;
use storefront_core::async_effect;
use storefront_core::effect::Effect;
use storefront_core::environment::Clock;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// Everything that can happen to the cart session
#[derive(Clone, Debug, PartialEq)]
pub enum CartAction {
    /// The site or the user token changed
    ContextChanged {
        /// Active site
        site: BaseSite,
        /// Current user token; an empty token is anonymous
        token: UserToken,
    },
    /// Mark the loaded cart as stale
    RefreshRequested,
    /// Load the cart with full details
    LoadDetails,
    /// Add a product, creating the cart first if needed
    AddEntry {
        /// Product to add
        product_code: String,
        /// Quantity to add
        quantity: u32,
    },
    /// Remove an entry
    RemoveEntry {
        /// Entry to remove
        entry_number: u32,
    },
    /// Change an entry's quantity; zero or less removes the entry
    UpdateEntry {
        /// Entry to change
        entry_number: u32,
        /// New quantity
        quantity: i64,
    },
    /// Apply a voucher
    AddVoucher {
        /// Voucher code
        voucher_id: String,
    },
    /// Remove an applied voucher
    RemoveVoucher {
        /// Voucher code
        voucher_id: String,
    },
    /// Save an address and use it for delivery
    CreateDeliveryAddress {
        /// Address to save
        address: Address,
    },
    /// Use a saved address for delivery
    SetDeliveryAddress {
        /// Id of the saved address
        address_id: String,
    },
    /// Choose a delivery mode
    SetDeliveryMode {
        /// Delivery mode code
        mode_id: String,
    },
    /// Fetch the delivery mode set on the cart
    LoadDeliveryMode,
    /// Fetch the delivery modes the cart supports
    LoadSupportedDeliveryModes,
    /// Forget the cart
    Clear,

    // Feedback from backend calls
    /// A command completed
    CommandSucceeded {
        /// The command as it was issued
        command: CartCommand,
        /// What the backend returned
        outcome: CommandOutcome,
    },
    /// A command failed
    CommandFailed {
        /// The command as it was issued
        command: CartCommand,
        /// Serialized failure
        error: SerializableError,
    },
}

/// Dependencies of the cart reducer
#[derive(Clone)]
pub struct CartEnvironment {
    /// Cart creation, loading and merging
    pub carts: Arc<dyn CartAdapter>,
    /// Entry mutations
    pub entries: Arc<dyn CartEntryAdapter>,
    /// Voucher mutations
    pub vouchers: Arc<dyn CartVoucherAdapter>,
    /// Delivery settings
    pub delivery: Arc<dyn CartDeliveryAdapter>,
    /// Site and token of backend requests
    pub context: Arc<dyn ContextAdapter>,
    /// Where command failures are shown
    pub messages: GlobalMessageService,
    /// Timestamps for loaded carts
    pub clock: Arc<dyn Clock>,
}

impl CartEnvironment {
    /// Use one backend for every cart adapter
    #[must_use]
    pub fn from_backend<B>(
        backend: Arc<B>,
        messages: GlobalMessageService,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        B: CartAdapter
            + CartEntryAdapter
            + CartVoucherAdapter
            + CartDeliveryAdapter
            + ContextAdapter
            + 'static,
    {
        Self {
            carts: backend.clone(),
            entries: backend.clone(),
            vouchers: backend.clone(),
            delivery: backend.clone(),
            context: backend,
            messages,
            clock,
        }
    }
}

/// Reducer for [`CartSession`]
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Creates a new cart reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Turn a command into the effect that runs it
    fn issue(command: CartCommand, env: &CartEnvironment) -> Effect<CartAction> {
        tracing::info!(%command, "Issuing cart command");
        metrics::counter!(crate::metrics::CART_COMMANDS_ISSUED, "command" => command.name())
            .increment(1);

        let env = env.clone();
        async_effect! {
            match execute(&env, command.clone()).await {
                Ok(outcome) => Some(CartAction::CommandSucceeded { command, outcome }),
                Err(error) => Some(CartAction::CommandFailed {
                    command,
                    error: make_error_serializable(&RequestFailure::from(error)),
                }),
            }
        }
    }

    /// Point backend requests at the new site and user
    fn apply_context(site: BaseSite, token: UserToken, env: &CartEnvironment) -> Effect<CartAction> {
        let context = Arc::clone(&env.context);
        async_effect! {
            if let Err(error) = context.apply_context(site, token).await {
                tracing::warn!(%error, "Backend context not applied");
            }
            None
        }
    }

    /// Show a command failure as a global error message
    fn show_failure(error: &SerializableError, env: &CartEnvironment) -> Effect<CartAction> {
        let message = GlobalMessage::from_failure(error);
        let messages = env.messages.clone();
        async_effect! {
            if let Err(error) = messages.add(message).await {
                tracing::debug!(%error, "Cart failure message dropped");
            }
            None
        }
    }

    fn issue_all(
        commands: impl IntoIterator<Item = CartCommand>,
        env: &CartEnvironment,
    ) -> SmallVec<[Effect<CartAction>; 4]> {
        let effects: SmallVec<[Effect<CartAction>; 4]> = commands
            .into_iter()
            .map(|command| Self::issue(command, env))
            .collect();

        if effects.is_empty() {
            smallvec![Effect::None]
        } else {
            effects
        }
    }

    /// A cart creation for the current user completed either way
    fn finish_creation(state: &mut CartSession, command: &CartCommand) {
        if matches!(command, CartCommand::CreateCart { .. }) && command.user_id() == state.user_id {
            state.creating = false;
        }
    }

    /// Apply a successful result, returning the commands it triggers
    fn on_success(
        state: &mut CartSession,
        command: &CartCommand,
        outcome: CommandOutcome,
        env: &CartEnvironment,
    ) -> Option<CartCommand> {
        if command.user_id() != state.user_id {
            tracing::debug!(
                %command,
                current_user = %state.user_id,
                "Dropping result issued for another user"
            );
            return None;
        }

        match outcome {
            CommandOutcome::Cart(cart) if command.replaces_cart() => {
                Self::on_cart_replaced(state, command, cart, env)
            },
            CommandOutcome::Modification(_) | CommandOutcome::Acknowledged
                if command.requires_refresh() =>
            {
                state.refresh = true;
                sync::watch_refresh(state)
            },
            CommandOutcome::Address(address) => {
                state.cart.delivery_address = Some(address);
                None
            },
            CommandOutcome::DeliveryMode(mode) => {
                state.cart.delivery_mode = Some(mode);
                None
            },
            CommandOutcome::DeliveryModes(modes) => {
                state.supported_delivery_modes = modes;
                None
            },
            other => {
                tracing::warn!(%command, ?other, "Unexpected outcome for cart command");
                None
            },
        }
    }

    fn on_cart_replaced(
        state: &mut CartSession,
        command: &CartCommand,
        cart: Cart,
        env: &CartEnvironment,
    ) -> Option<CartCommand> {
        state.loaded = true;
        state.refresh = false;
        state.loaded_at = Some(env.clock.now());
        state.last_error = None;
        if matches!(command, CartCommand::MergeCart { .. }) {
            state.merge_complete = true;
        }

        tracing::debug!(
            %command,
            code = ?cart.code,
            total_items = ?cart.total_items,
            "Cart content replaced"
        );

        let drained = state.replace_cart(cart)?;
        tracing::debug!(?drained, "Dispatching deferred cart command");
        Some(dispatcher::resolve_deferred(state, drained))
    }
}

impl Reducer for CartReducer {
    type State = CartSession;
    type Action = CartAction;
    type Environment = CartEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CartAction::ContextChanged { site, token } => {
                // Requests issued for the new identity go out once the context is applied
                let context = Self::apply_context(site.clone(), token.clone(), env);
                let commands = Self::issue_all(sync::on_context_changed(state, site, &token), env);
                smallvec![Effect::chain(vec![
                    context,
                    Effect::merge(commands.into_vec()),
                ])]
            },
            CartAction::RefreshRequested => {
                state.refresh = state.cart.is_created();
                Self::issue_all(sync::watch_refresh(state), env)
            },
            CartAction::LoadDetails => Self::issue_all(sync::load_details(state), env),
            CartAction::AddEntry {
                product_code,
                quantity,
            } => Self::issue_all(dispatcher::add_entry(state, product_code, quantity), env),
            CartAction::RemoveEntry { entry_number } => {
                Self::issue_all(Some(dispatcher::remove_entry(state, entry_number)), env)
            },
            CartAction::UpdateEntry {
                entry_number,
                quantity,
            } => Self::issue_all(
                Some(dispatcher::update_entry(state, entry_number, quantity)),
                env,
            ),
            CartAction::AddVoucher { voucher_id } => {
                Self::issue_all(Some(dispatcher::add_voucher(state, voucher_id)), env)
            },
            CartAction::RemoveVoucher { voucher_id } => {
                Self::issue_all(Some(dispatcher::remove_voucher(state, voucher_id)), env)
            },
            CartAction::CreateDeliveryAddress { address } => Self::issue_all(
                Some(dispatcher::create_delivery_address(state, address)),
                env,
            ),
            CartAction::SetDeliveryAddress { address_id } => Self::issue_all(
                Some(dispatcher::set_delivery_address(state, address_id)),
                env,
            ),
            CartAction::SetDeliveryMode { mode_id } => {
                Self::issue_all(Some(dispatcher::set_delivery_mode(state, mode_id)), env)
            },
            CartAction::LoadDeliveryMode => {
                Self::issue_all(Some(dispatcher::load_delivery_mode(state)), env)
            },
            CartAction::LoadSupportedDeliveryModes => Self::issue_all(
                Some(dispatcher::load_supported_delivery_modes(state)),
                env,
            ),
            CartAction::Clear => {
                tracing::info!(user_id = %state.user_id, "Clearing cart");
                state.clear();
                smallvec![Effect::None]
            },
            CartAction::CommandSucceeded { command, outcome } => {
                tracing::debug!(%command, "Cart command succeeded");
                Self::finish_creation(state, &command);
                Self::issue_all(Self::on_success(state, &command, outcome, env), env)
            },
            CartAction::CommandFailed { command, error } => {
                tracing::warn!(%command, %error, "Cart command failed");
                metrics::counter!(crate::metrics::CART_COMMANDS_FAILED, "command" => command.name())
                    .increment(1);

                Self::finish_creation(state, &command);
                if matches!(command, CartCommand::LoadCart { .. }) {
                    state.refresh = false;
                }
                let shown = Self::show_failure(&error, env);
                state.last_error = Some(error);
                smallvec![shown]
            },
        }
    }
}

/// Run a command against the backend
async fn execute(env: &CartEnvironment, command: CartCommand) -> Result<CommandOutcome, OccError> {
    match command {
        CartCommand::CreateCart { user_id } => env
            .carts
            .create(user_id, None, None)
            .await
            .map(CommandOutcome::Cart),
        CartCommand::LoadCart {
            user_id,
            cart_id,
            details,
        } => env
            .carts
            .load(user_id, cart_id, details)
            .await
            .map(CommandOutcome::Cart),
        CartCommand::MergeCart { user_id, cart_id } => merge(env, user_id, cart_id)
            .await
            .map(CommandOutcome::Cart),
        CartCommand::AddEntry {
            user_id,
            cart_id,
            product_code,
            quantity,
        } => env
            .entries
            .add(user_id, cart_id, product_code, quantity)
            .await
            .map(CommandOutcome::Modification),
        CartCommand::UpdateEntry {
            user_id,
            cart_id,
            entry_number,
            quantity,
        } => env
            .entries
            .update(user_id, cart_id, entry_number, quantity)
            .await
            .map(CommandOutcome::Modification),
        CartCommand::RemoveEntry {
            user_id,
            cart_id,
            entry_number,
        } => env
            .entries
            .remove(user_id, cart_id, entry_number)
            .await
            .map(|()| CommandOutcome::Acknowledged),
        CartCommand::AddVoucher {
            user_id,
            cart_id,
            voucher_id,
        } => env
            .vouchers
            .add(user_id, cart_id, voucher_id)
            .await
            .map(|()| CommandOutcome::Acknowledged),
        CartCommand::RemoveVoucher {
            user_id,
            cart_id,
            voucher_id,
        } => env
            .vouchers
            .remove(user_id, cart_id, voucher_id)
            .await
            .map(|()| CommandOutcome::Acknowledged),
        CartCommand::CreateDeliveryAddress {
            user_id,
            cart_id,
            address,
        } => env
            .delivery
            .create_address(user_id, cart_id, address)
            .await
            .map(CommandOutcome::Address),
        CartCommand::SetDeliveryAddress {
            user_id,
            cart_id,
            address_id,
        } => env
            .delivery
            .set_address(user_id, cart_id, address_id)
            .await
            .map(|()| CommandOutcome::Acknowledged),
        CartCommand::SetDeliveryMode {
            user_id,
            cart_id,
            mode_id,
        } => env
            .delivery
            .set_mode(user_id, cart_id, mode_id)
            .await
            .map(|()| CommandOutcome::Acknowledged),
        CartCommand::LoadDeliveryMode { user_id, cart_id } => env
            .delivery
            .get_mode(user_id, cart_id)
            .await
            .map(CommandOutcome::DeliveryMode),
        CartCommand::LoadSupportedDeliveryModes { user_id, cart_id } => env
            .delivery
            .get_supported_modes(user_id, cart_id)
            .await
            .map(CommandOutcome::DeliveryModes),
    }
}

/// Merge the anonymous cart `cart_guid` into the user's account cart
///
/// The user's current cart is loaded first; without one (404) the anonymous
/// cart becomes the user's new cart.
async fn merge(env: &CartEnvironment, user_id: String, cart_guid: String) -> Result<Cart, OccError> {
    let target = match env
        .carts
        .load(user_id.clone(), CURRENT_CART_ID.to_string(), false)
        .await
    {
        Ok(current) => current.guid,
        Err(error) if error.status() == Some(404) => None,
        Err(error) => return Err(error),
    };

    tracing::debug!(%user_id, %cart_guid, target = ?target, "Merging cart");
    env.carts.create(user_id, Some(cart_guid), target).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
#[allow(clippy::panic)] // Test code can panic
mod tests {
    use super::*;
    use crate::cart::command::DeferredCommand;
    use crate::config::GlobalMessageConfig;
    use crate::connectors::{BackendCall, CallKind, InMemoryCartBackend};
    use crate::global_message::{GlobalMessageEnvironment, GlobalMessageType, Translatable};
    use crate::model::ANONYMOUS_USER_ID;
    use storefront_testing::{ReducerTest, assertions, collect_actions, test_clock};

    fn messages() -> GlobalMessageService {
        GlobalMessageService::new(GlobalMessageEnvironment {
            clock: Arc::new(test_clock()),
            config: GlobalMessageConfig::default(),
        })
    }

    fn environment(backend: &Arc<InMemoryCartBackend>) -> CartEnvironment {
        CartEnvironment::from_backend(Arc::clone(backend), messages(), Arc::new(test_clock()))
    }

    fn created_cart(guid: &str) -> Cart {
        Cart {
            code: Some("00000001".to_string()),
            guid: Some(guid.to_string()),
            total_items: Some(0),
            ..Cart::default()
        }
    }

    fn create_command() -> CartCommand {
        CartCommand::CreateCart {
            user_id: ANONYMOUS_USER_ID.to_string(),
        }
    }

    #[test]
    fn add_entry_without_cart_issues_create() {
        let backend = Arc::new(InMemoryCartBackend::new());

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(CartSession::new())
            .when_action(CartAction::AddEntry {
                product_code: "P1".to_string(),
                quantity: 2,
            })
            .then_state(|session| {
                assert!(session.pending.is_pending());
                assert!(session.creating);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn add_entry_while_creating_issues_nothing() {
        let backend = Arc::new(InMemoryCartBackend::new());

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(CartSession::new())
            .when_action(CartAction::AddEntry {
                product_code: "P1".to_string(),
                quantity: 1,
            })
            .when_action(CartAction::AddEntry {
                product_code: "P2".to_string(),
                quantity: 4,
            })
            .then_state(|session| {
                assert_eq!(
                    session.pending.peek(),
                    Some(&DeferredCommand::AddEntry {
                        product_code: "P2".to_string(),
                        quantity: 4,
                    })
                );
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn create_result_ends_the_creation() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let mut session = CartSession::new();
        session.creating = true;

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(session)
            .when_action(CartAction::CommandSucceeded {
                command: create_command(),
                outcome: CommandOutcome::Cart(created_cart("g1")),
            })
            .then_state(|session| assert!(!session.creating))
            .run();
    }

    #[test]
    fn created_cart_drains_the_deferred_add_once() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let env = environment(&backend);
        let reducer = CartReducer::new();
        let mut session = CartSession::new();
        session.pending.defer(DeferredCommand::AddEntry {
            product_code: "P1".to_string(),
            quantity: 2,
        });

        let effects = reducer.reduce(
            &mut session,
            CartAction::CommandSucceeded {
                command: create_command(),
                outcome: CommandOutcome::Cart(created_cart("g1")),
            },
            &env,
        );
        assertions::assert_effects_count(&effects, 1);
        assert!(!session.pending.is_pending());
        assert!(session.loaded);
        assert_eq!(session.loaded_at, Some(test_clock().now()));

        let again = reducer.reduce(
            &mut session,
            CartAction::CommandSucceeded {
                command: create_command(),
                outcome: CommandOutcome::Cart(created_cart("g1")),
            },
            &env,
        );
        assertions::assert_no_effects(&again);
    }

    #[test]
    fn drained_add_is_addressed_with_the_new_cart() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let cart = backend.seed_cart(ANONYMOUS_USER_ID, &[]);
        let env = environment(&backend);
        let mut session = CartSession::new();
        session.pending.defer(DeferredCommand::AddEntry {
            product_code: "P1".to_string(),
            quantity: 2,
        });

        let effects = CartReducer::new().reduce(
            &mut session,
            CartAction::CommandSucceeded {
                command: create_command(),
                outcome: CommandOutcome::Cart(cart),
            },
            &env,
        );
        let actions = tokio_test::block_on(collect_actions(effects.into_vec()));

        assert_eq!(
            backend.calls_of(CallKind::AddEntry),
            vec![BackendCall::AddEntry {
                user_id: ANONYMOUS_USER_ID.to_string(),
                cart_id: "g1".to_string(),
                product_code: "P1".to_string(),
                quantity: 2,
            }]
        );
        assert!(matches!(
            actions.as_slice(),
            [CartAction::CommandSucceeded {
                outcome: CommandOutcome::Modification(_),
                ..
            }]
        ));
    }

    #[test]
    fn empty_cart_content_does_not_drain() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let mut session = CartSession::new();
        session.pending.defer(DeferredCommand::AddEntry {
            product_code: "P1".to_string(),
            quantity: 2,
        });

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(session)
            .when_action(CartAction::CommandSucceeded {
                command: CartCommand::LoadCart {
                    user_id: ANONYMOUS_USER_ID.to_string(),
                    cart_id: "g1".to_string(),
                    details: true,
                },
                outcome: CommandOutcome::Cart(Cart::default()),
            })
            .then_state(|session| assert!(session.pending.is_pending()))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn mutation_success_sets_refresh_and_reloads() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let mut session = CartSession::new();
        session.cart = created_cart("g1");

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(session)
            .when_action(CartAction::CommandSucceeded {
                command: CartCommand::AddVoucher {
                    user_id: ANONYMOUS_USER_ID.to_string(),
                    cart_id: "g1".to_string(),
                    voucher_id: "SUMMER".to_string(),
                },
                outcome: CommandOutcome::Acknowledged,
            })
            .then_state(|session| assert!(session.refresh))
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn load_success_clears_refresh() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let mut session = CartSession::new();
        session.cart = created_cart("g1");
        session.refresh = true;

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(session)
            .when_action(CartAction::CommandSucceeded {
                command: CartCommand::LoadCart {
                    user_id: ANONYMOUS_USER_ID.to_string(),
                    cart_id: "g1".to_string(),
                    details: true,
                },
                outcome: CommandOutcome::Cart(created_cart("g1")),
            })
            .then_state(|session| {
                assert!(!session.refresh);
                assert!(session.loaded);
            })
            .run();
    }

    #[test]
    fn failure_keeps_identity_and_deferred_slot() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let mut session = CartSession::new();
        session.pending.defer(DeferredCommand::AddEntry {
            product_code: "P1".to_string(),
            quantity: 2,
        });
        session.creating = true;
        let error = make_error_serializable(&RequestFailure::from(OccError::Transport {
            url: "memory://backend".to_string(),
            message: "connection refused".to_string(),
        }));

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(session)
            .when_action(CartAction::CommandFailed {
                command: create_command(),
                error: error.clone(),
            })
            .then_state(move |session| {
                assert_eq!(session.user_id, ANONYMOUS_USER_ID);
                assert!(session.pending.is_pending());
                assert!(!session.creating);
                assert_eq!(session.last_error, Some(error));
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[tokio::test]
    async fn failure_is_shown_as_an_error_message() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let env = environment(&backend);
        let mut session = CartSession::new();
        session.cart = created_cart("g1");
        let error = make_error_serializable(&RequestFailure::from(OccError::Status {
            status: 400,
            status_text: "Bad Request".to_string(),
            url: "memory://backend".to_string(),
            body: serde_json::json!({"errors": [{"message": "Voucher is not applied."}]}),
        }));

        let effects = CartReducer::new().reduce(
            &mut session,
            CartAction::CommandFailed {
                command: CartCommand::RemoveVoucher {
                    user_id: ANONYMOUS_USER_ID.to_string(),
                    cart_id: "g1".to_string(),
                    voucher_id: "NOPE".to_string(),
                },
                error,
            },
            &env,
        );
        let actions = collect_actions(effects.into_vec()).await;

        assert!(actions.is_empty());
        let shown = env.messages.get(GlobalMessageType::Error).await;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].text, Translatable::raw("Voucher is not applied."));
    }

    #[tokio::test]
    async fn context_is_applied_before_the_load() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let env = environment(&backend);
        let mut session = CartSession::new();
        let token = UserToken::for_user("u1", "token-u1");

        let effects = CartReducer::new().reduce(
            &mut session,
            CartAction::ContextChanged {
                site: BaseSite::new("apparel-uk"),
                token: token.clone(),
            },
            &env,
        );
        assert!(matches!(effects.as_slice(), [Effect::Sequential(_)]));

        collect_actions(effects.into_vec()).await;

        assert_eq!(backend.context(), Some((BaseSite::new("apparel-uk"), token)));
        assert_eq!(
            backend.calls(),
            vec![BackendCall::LoadCart {
                user_id: "u1".to_string(),
                cart_id: CURRENT_CART_ID.to_string(),
                details: true,
            }]
        );
    }

    #[test]
    fn results_for_another_user_are_dropped() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let mut session = CartSession::new();
        session.set_identity(&UserToken::for_user("u1", "token"));

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(session)
            .when_action(CartAction::CommandSucceeded {
                command: create_command(),
                outcome: CommandOutcome::Cart(created_cart("g1")),
            })
            .then_state(|session| {
                assert!(!session.cart.is_created());
                assert!(!session.loaded);
            })
            .run();
    }

    #[test]
    fn merge_success_marks_merge_complete() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let mut session = CartSession::new();
        session.set_identity(&UserToken::for_user("u1", "token"));

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(session)
            .when_action(CartAction::CommandSucceeded {
                command: CartCommand::MergeCart {
                    user_id: "u1".to_string(),
                    cart_id: "g1".to_string(),
                },
                outcome: CommandOutcome::Cart(created_cart("g2")),
            })
            .then_state(|session| {
                assert!(session.merge_complete);
                assert_eq!(session.identity().cart_id, "00000001");
            })
            .run();
    }

    #[test]
    fn merge_without_account_cart_moves_the_anonymous_cart() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let anonymous = backend.seed_cart(ANONYMOUS_USER_ID, &[("P1", 2)]);
        let env = environment(&backend);

        let merged = tokio_test::block_on(merge(
            &env,
            "u1".to_string(),
            anonymous.guid.unwrap(),
        ))
        .unwrap();

        assert_eq!(merged.entries.len(), 1);
        assert_eq!(
            backend.calls_of(CallKind::CreateCart),
            vec![BackendCall::CreateCart {
                user_id: "u1".to_string(),
                old_cart_id: Some("g1".to_string()),
                to_merge_cart_guid: None,
            }]
        );
    }

    #[test]
    fn merge_into_existing_account_cart() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let anonymous = backend.seed_cart(ANONYMOUS_USER_ID, &[("P1", 2)]);
        let account = backend.seed_cart("u1", &[("P2", 1)]);
        let env = environment(&backend);

        let merged = tokio_test::block_on(merge(
            &env,
            "u1".to_string(),
            anonymous.guid.unwrap(),
        ))
        .unwrap();

        assert_eq!(merged.guid, account.guid);
        assert_eq!(merged.entries.len(), 2);
        assert_eq!(backend.cart_count(), 1);
    }

    #[test]
    fn merge_fails_when_loading_current_cart_fails() {
        let backend = Arc::new(InMemoryCartBackend::new());
        backend.fail_next(CallKind::LoadCart, 500);
        let env = environment(&backend);

        let result = tokio_test::block_on(merge(&env, "u1".to_string(), "g1".to_string()));

        assert_eq!(result.unwrap_err().status(), Some(500));
        assert!(backend.calls_of(CallKind::CreateCart).is_empty());
    }

    #[test]
    fn clear_resets_cart_but_keeps_user() {
        let backend = Arc::new(InMemoryCartBackend::new());
        let mut session = CartSession::new();
        session.set_identity(&UserToken::for_user("u1", "token"));
        session.cart = created_cart("g1");

        ReducerTest::new(CartReducer::new())
            .with_env(environment(&backend))
            .given_state(session)
            .when_action(CartAction::Clear)
            .then_state(|session| {
                assert_eq!(session.user_id, "u1");
                assert!(!session.cart.is_created());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }
}
