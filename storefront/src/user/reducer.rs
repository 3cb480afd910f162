//! User account reducers
//!
//! One small reducer per flow, each scoped to its slice of [`UserState`] and
//! combined by [`user_reducer`].

use super::{CouponSort, Loadable, UserState};
use crate::connectors::UserAdapter;
use crate::error::OccError;
use crate::global_message::{GlobalMessage, GlobalMessageService};
use crate::model::{Country, CustomerCouponSearchResult, Title};
use crate::util::serialization::{RequestFailure, SerializableError, make_error_serializable};
use std::sync::Arc;
use storefront_core::async_effect;
use storefront_core::composition::{CombinedReducer, combine_reducers, scope_reducer};
use storefront_core::effect::Effect;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// Translation key of the message shown once a reset email is sent
pub const PASSWORD_RESET_EMAIL_SENT: &str = "forgottenPassword.passwordResetEmailSent";

/// User account actions
#[derive(Clone, Debug, PartialEq)]
pub enum UserAction {
    /// Ask for a password reset email
    ForgotPasswordEmailRequest {
        /// Account email
        email: String,
    },
    /// The reset email was sent
    ForgotPasswordEmailRequestSuccess,
    /// The reset email request failed
    ForgotPasswordEmailRequestFail {
        /// Serialized failure
        error: SerializableError,
    },
    /// Load one page of customer coupons
    LoadCustomerCoupons {
        /// Coupon owner
        user_id: String,
        /// Coupons per page
        page_size: u32,
        /// Zero-based page index
        current_page: u32,
        /// List order
        sort: CouponSort,
    },
    /// A coupon page arrived
    LoadCustomerCouponsSuccess {
        /// The loaded page
        result: CustomerCouponSearchResult,
    },
    /// The coupon page could not be loaded
    LoadCustomerCouponsFail {
        /// Serialized failure
        error: SerializableError,
    },
    /// Load personal titles
    LoadTitles,
    /// Titles arrived
    LoadTitlesSuccess {
        /// Loaded titles
        titles: Vec<Title>,
    },
    /// Titles could not be loaded
    LoadTitlesFail {
        /// Serialized failure
        error: SerializableError,
    },
    /// Load delivery countries
    LoadDeliveryCountries,
    /// Countries arrived
    LoadDeliveryCountriesSuccess {
        /// Loaded countries
        countries: Vec<Country>,
    },
    /// Countries could not be loaded
    LoadDeliveryCountriesFail {
        /// Serialized failure
        error: SerializableError,
    },
    /// Forget titles and countries
    ClearMiscsData,
}

/// Dependencies of the user reducers
#[derive(Clone)]
pub struct UserEnvironment {
    /// Backend calls
    pub users: Arc<dyn UserAdapter>,
    /// Where confirmations are shown
    pub messages: GlobalMessageService,
}

/// The combined user reducer
pub type UserReducer = CombinedReducer<UserState, UserAction, UserEnvironment>;

/// Build the user reducer from its per-flow parts
#[must_use]
pub fn user_reducer() -> UserReducer {
    combine_reducers(vec![
        Box::new(scope_reducer(
            ForgotPasswordReducer,
            |state: &UserState| &state.forgot_password,
            |state: &mut UserState, forgot_password: Loadable<()>| {
                state.forgot_password = forgot_password;
            },
        )),
        Box::new(scope_reducer(
            CouponReducer,
            |state: &UserState| &state.coupons,
            |state: &mut UserState, coupons: Loadable<Option<CustomerCouponSearchResult>>| {
                state.coupons = coupons;
            },
        )),
        Box::new(scope_reducer(
            TitlesReducer,
            |state: &UserState| &state.titles,
            |state: &mut UserState, titles: Loadable<Vec<Title>>| {
                state.titles = titles;
            },
        )),
        Box::new(scope_reducer(
            CountriesReducer,
            |state: &UserState| &state.countries,
            |state: &mut UserState, countries: Loadable<Vec<Country>>| {
                state.countries = countries;
            },
        )),
    ])
}

fn serialize(request: &'static str, error: OccError) -> SerializableError {
    tracing::warn!(request, %error, "User request failed");
    metrics::counter!(crate::metrics::USER_REQUESTS_FAILED, "request" => request).increment(1);
    make_error_serializable(&RequestFailure::from(error))
}

fn requested(request: &'static str) {
    tracing::debug!(request, "Issuing user request");
    metrics::counter!(crate::metrics::USER_REQUESTS, "request" => request).increment(1);
}

/// Password reset email flow
#[derive(Clone, Debug, Default)]
pub struct ForgotPasswordReducer;

impl Reducer for ForgotPasswordReducer {
    type State = Loadable<()>;
    type Action = UserAction;
    type Environment = UserEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            UserAction::ForgotPasswordEmailRequest { email } => {
                state.start();
                requested("forgot_password");

                let users = Arc::clone(&env.users);
                let messages = env.messages.clone();
                smallvec![async_effect! {
                    match users.request_forgot_password_email(email).await {
                        Ok(()) => {
                            if let Err(error) = messages
                                .add(GlobalMessage::confirmation(PASSWORD_RESET_EMAIL_SENT))
                                .await
                            {
                                tracing::debug!(%error, "Reset confirmation not shown");
                            }
                            Some(UserAction::ForgotPasswordEmailRequestSuccess)
                        },
                        Err(error) => Some(UserAction::ForgotPasswordEmailRequestFail {
                            error: serialize("forgot_password", error),
                        }),
                    }
                }]
            },
            UserAction::ForgotPasswordEmailRequestSuccess => {
                state.succeed(());
                smallvec![Effect::None]
            },
            UserAction::ForgotPasswordEmailRequestFail { error } => {
                state.fail(error);
                smallvec![Effect::None]
            },
            _ => smallvec![Effect::None],
        }
    }
}

/// Customer coupon page loading
#[derive(Clone, Debug, Default)]
pub struct CouponReducer;

impl Reducer for CouponReducer {
    type State = Loadable<Option<CustomerCouponSearchResult>>;
    type Action = UserAction;
    type Environment = UserEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            UserAction::LoadCustomerCoupons {
                user_id,
                page_size,
                current_page,
                sort,
            } => {
                state.start();
                requested("customer_coupons");

                let users = Arc::clone(&env.users);
                smallvec![async_effect! {
                    match users
                        .load_customer_coupons(
                            user_id,
                            page_size,
                            current_page,
                            sort.as_query().to_string(),
                        )
                        .await
                    {
                        Ok(result) => Some(UserAction::LoadCustomerCouponsSuccess { result }),
                        Err(error) => Some(UserAction::LoadCustomerCouponsFail {
                            error: serialize("customer_coupons", error),
                        }),
                    }
                }]
            },
            UserAction::LoadCustomerCouponsSuccess { result } => {
                state.succeed(Some(result));
                smallvec![Effect::None]
            },
            UserAction::LoadCustomerCouponsFail { error } => {
                state.fail(error);
                smallvec![Effect::None]
            },
            _ => smallvec![Effect::None],
        }
    }
}

/// Personal titles
#[derive(Clone, Debug, Default)]
pub struct TitlesReducer;

impl Reducer for TitlesReducer {
    type State = Loadable<Vec<Title>>;
    type Action = UserAction;
    type Environment = UserEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            UserAction::LoadTitles => {
                state.start();
                requested("titles");

                let users = Arc::clone(&env.users);
                smallvec![async_effect! {
                    match users.load_titles().await {
                        Ok(titles) => Some(UserAction::LoadTitlesSuccess { titles }),
                        Err(error) => Some(UserAction::LoadTitlesFail {
                            error: serialize("titles", error),
                        }),
                    }
                }]
            },
            UserAction::LoadTitlesSuccess { titles } => {
                state.succeed(titles);
                smallvec![Effect::None]
            },
            UserAction::LoadTitlesFail { error } => {
                state.fail(error);
                smallvec![Effect::None]
            },
            UserAction::ClearMiscsData => {
                *state = Loadable::default();
                smallvec![Effect::None]
            },
            _ => smallvec![Effect::None],
        }
    }
}

/// Delivery countries
#[derive(Clone, Debug, Default)]
pub struct CountriesReducer;

impl Reducer for CountriesReducer {
    type State = Loadable<Vec<Country>>;
    type Action = UserAction;
    type Environment = UserEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            UserAction::LoadDeliveryCountries => {
                state.start();
                requested("delivery_countries");

                let users = Arc::clone(&env.users);
                smallvec![async_effect! {
                    match users.load_delivery_countries().await {
                        Ok(countries) => Some(UserAction::LoadDeliveryCountriesSuccess { countries }),
                        Err(error) => Some(UserAction::LoadDeliveryCountriesFail {
                            error: serialize("delivery_countries", error),
                        }),
                    }
                }]
            },
            UserAction::LoadDeliveryCountriesSuccess { countries } => {
                state.succeed(countries);
                smallvec![Effect::None]
            },
            UserAction::LoadDeliveryCountriesFail { error } => {
                state.fail(error);
                smallvec![Effect::None]
            },
            UserAction::ClearMiscsData => {
                *state = Loadable::default();
                smallvec![Effect::None]
            },
            _ => smallvec![Effect::None],
        }
    }
}
