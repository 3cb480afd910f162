//! User account facade

use super::reducer::{UserAction, UserEnvironment, UserReducer, user_reducer};
use super::{CouponSort, Loadable, UserState};
use crate::model::{Country, CustomerCouponSearchResult, Title};
use std::time::Duration;
use storefront_runtime::{Store, StoreError};

type UserStore = Store<UserState, UserAction, UserEnvironment, UserReducer>;

/// User account operations
#[derive(Clone)]
pub struct UserService {
    store: UserStore,
}

impl UserService {
    /// Create a service with nothing loaded
    #[must_use]
    pub fn new(environment: UserEnvironment) -> Self {
        Self {
            store: Store::new(UserState::default(), user_reducer(), environment),
        }
    }

    async fn dispatch(&self, action: UserAction) -> Result<(), StoreError> {
        self.store.send(action).await.map(|_| ())
    }

    /// Ask the backend to email a password reset link
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn request_forgot_password_email(
        &self,
        email: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.dispatch(UserAction::ForgotPasswordEmailRequest {
            email: email.into(),
        })
        .await
    }

    /// Load a page of the user's customer coupons
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn load_customer_coupons(
        &self,
        user_id: impl Into<String>,
        page_size: u32,
        current_page: u32,
        sort: CouponSort,
    ) -> Result<(), StoreError> {
        self.dispatch(UserAction::LoadCustomerCoupons {
            user_id: user_id.into(),
            page_size,
            current_page,
            sort,
        })
        .await
    }

    /// Load personal titles
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn load_titles(&self) -> Result<(), StoreError> {
        self.dispatch(UserAction::LoadTitles).await
    }

    /// Load delivery countries
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn load_delivery_countries(&self) -> Result<(), StoreError> {
        self.dispatch(UserAction::LoadDeliveryCountries).await
    }

    /// Forget titles and countries
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the service shuts down.
    pub async fn clear_miscs_data(&self) -> Result<(), StoreError> {
        self.dispatch(UserAction::ClearMiscsData).await
    }

    /// Status of the password reset request
    pub async fn forgot_password_status(&self) -> Loadable<()> {
        self.store.state(|state| state.forgot_password.clone()).await
    }

    /// Last loaded coupon page
    pub async fn customer_coupons(&self) -> Loadable<Option<CustomerCouponSearchResult>> {
        self.store.state(|state| state.coupons.clone()).await
    }

    /// Loaded titles
    pub async fn titles(&self) -> Vec<Title> {
        self.store.state(|state| state.titles.value.clone()).await
    }

    /// Loaded delivery countries
    pub async fn delivery_countries(&self) -> Vec<Country> {
        self.store.state(|state| state.countries.value.clone()).await
    }

    /// Wait until no request is in flight
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if requests are still running after `timeout`.
    pub async fn wait_until_settled(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.wait_for_idle(timeout).await
    }

    /// Stop accepting requests and wait for in-flight ones
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if requests are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
