//! User account flows: password reset, customer coupons and reference data.

use crate::model::{Country, CustomerCouponSearchResult, Title};
use crate::util::serialization::SerializableError;
use std::fmt;
use std::str::FromStr;

pub mod reducer;
pub mod service;

pub use reducer::{UserAction, UserEnvironment, UserReducer, user_reducer};
pub use service::UserService;

/// A value fetched from the backend, with its request status
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Loadable<T> {
    /// Last loaded value
    pub value: T,
    /// A request is in flight
    pub loading: bool,
    /// The last request succeeded
    pub success: bool,
    /// Why the last request failed
    pub error: Option<SerializableError>,
}

impl<T> Loadable<T> {
    /// A request was sent; the previous value is kept
    pub fn start(&mut self) {
        self.loading = true;
        self.success = false;
        self.error = None;
    }

    /// The request returned `value`
    pub fn succeed(&mut self, value: T) {
        self.value = value;
        self.loading = false;
        self.success = true;
        self.error = None;
    }

    /// The request failed
    pub fn fail(&mut self, error: SerializableError) {
        self.loading = false;
        self.success = false;
        self.error = Some(error);
    }
}

/// State of the user account flows
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserState {
    /// Password reset email request
    pub forgot_password: Loadable<()>,
    /// Last loaded coupon page
    pub coupons: Loadable<Option<CustomerCouponSearchResult>>,
    /// Personal titles
    pub titles: Loadable<Vec<Title>>,
    /// Delivery countries
    pub countries: Loadable<Vec<Country>>,
}

/// Order of the customer coupon list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CouponSort {
    /// Earliest start date first
    #[default]
    ByStartDateAsc,
    /// Latest start date first
    ByStartDateDesc,
    /// Earliest end date first
    ByEndDateAsc,
    /// Latest end date first
    ByEndDateDesc,
}

impl CouponSort {
    /// Sort expression sent to the backend
    #[must_use]
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::ByStartDateAsc => "startDate:asc",
            Self::ByStartDateDesc => "startDate:desc",
            Self::ByEndDateAsc => "endDate:asc",
            Self::ByEndDateDesc => "endDate:desc",
        }
    }
}

impl fmt::Display for CouponSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ByStartDateAsc => "byStartDateAsc",
            Self::ByStartDateDesc => "byStartDateDesc",
            Self::ByEndDateAsc => "byEndDateAsc",
            Self::ByEndDateDesc => "byEndDateDesc",
        })
    }
}

/// Unknown coupon sort option
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown coupon sort: {0}")]
pub struct UnknownCouponSort(pub String);

impl FromStr for CouponSort {
    type Err = UnknownCouponSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "byStartDateAsc" => Ok(Self::ByStartDateAsc),
            "byStartDateDesc" => Ok(Self::ByStartDateDesc),
            "byEndDateAsc" => Ok(Self::ByEndDateAsc),
            "byEndDateDesc" => Ok(Self::ByEndDateDesc),
            other => Err(UnknownCouponSort(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::util::serialization::{RequestFailure, make_error_serializable};

    #[test]
    fn coupon_sort_maps_to_backend_expression() {
        let cases = [
            ("byStartDateAsc", "startDate:asc"),
            ("byStartDateDesc", "startDate:desc"),
            ("byEndDateAsc", "endDate:asc"),
            ("byEndDateDesc", "endDate:desc"),
        ];

        for (option, query) in cases {
            let sort: CouponSort = option.parse().unwrap();
            assert_eq!(sort.as_query(), query);
            assert_eq!(sort.to_string(), option);
        }
        assert!("byName".parse::<CouponSort>().is_err());
    }

    #[test]
    fn loadable_keeps_value_while_loading() {
        let mut titles: Loadable<Vec<Title>> = Loadable::default();
        titles.succeed(vec![Title {
            code: "mr".to_string(),
            name: None,
        }]);

        titles.start();
        assert!(titles.loading);
        assert_eq!(titles.value.len(), 1);

        let error =
            make_error_serializable(&RequestFailure::Value(serde_json::json!("backend down")));
        titles.fail(error.clone());
        assert!(!titles.loading);
        assert_eq!(titles.error, Some(error));
    }
}
