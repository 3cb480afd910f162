//! Configuration management for the storefront.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unparseable numeric values are reported instead of silently replaced.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used
    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Which backend the adapters talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process backend, no network
    Memory,
    /// OCC REST API
    Occ,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// OCC backend configuration
    pub occ: OccConfig,
    /// Store runtime configuration
    pub store: StoreConfig,
    /// Global message configuration
    pub messages: GlobalMessageConfig,
    /// Backend selection
    pub backend: BackendKind,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// OCC backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccConfig {
    /// Server root, e.g. `https://localhost:9002`
    pub base_url: String,
    /// API prefix, e.g. `/occ/v2/`
    pub prefix: String,
    /// Base site uid
    pub base_site: String,
    /// Request timeout
    pub timeout: Duration,
}

/// Store runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Capacity of the action broadcast channel
    pub broadcast_capacity: usize,
}

/// Global message configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMessageConfig {
    /// How long confirmation messages stay; `None` keeps them until removed
    pub confirmation_timeout: Option<Duration>,
    /// How long info messages stay; `None` keeps them until removed
    pub info_timeout: Option<Duration>,
}

impl Default for GlobalMessageConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Some(Duration::from_millis(3000)),
            info_timeout: Some(Duration::from_millis(10_000)),
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            occ: OccConfig {
                base_url: "https://localhost:9002".to_string(),
                prefix: "/occ/v2/".to_string(),
                base_site: "electronics".to_string(),
                timeout: Duration::from_secs(30),
            },
            store: StoreConfig {
                broadcast_capacity: 64,
            },
            messages: GlobalMessageConfig::default(),
            backend: BackendKind::Memory,
            log_level: "info".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric variable does not
    /// parse or `STOREFRONT_BACKEND` names an unknown backend.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let default_messages = GlobalMessageConfig::default();

        Ok(Self {
            occ: OccConfig {
                base_url: lookup("OCC_BASE_URL").unwrap_or(defaults.occ.base_url),
                prefix: lookup("OCC_PREFIX").unwrap_or(defaults.occ.prefix),
                base_site: lookup("OCC_BASE_SITE").unwrap_or(defaults.occ.base_site),
                timeout: Duration::from_secs(parse_or(&lookup, "OCC_TIMEOUT_SECS", 30)?),
            },
            store: StoreConfig {
                broadcast_capacity: parse_or(
                    &lookup,
                    "STORE_BROADCAST_CAPACITY",
                    defaults.store.broadcast_capacity,
                )?,
            },
            messages: GlobalMessageConfig {
                confirmation_timeout: timeout_or(
                    &lookup,
                    "GLOBAL_MESSAGE_CONFIRMATION_TIMEOUT_MS",
                    default_messages.confirmation_timeout,
                )?,
                info_timeout: timeout_or(
                    &lookup,
                    "GLOBAL_MESSAGE_INFO_TIMEOUT_MS",
                    default_messages.info_timeout,
                )?,
            },
            backend: match lookup("STOREFRONT_BACKEND").as_deref() {
                None | Some("memory") => BackendKind::Memory,
                Some("occ") => BackendKind::Occ,
                Some(other) => {
                    return Err(ConfigError::InvalidValue {
                        name: "STOREFRONT_BACKEND".to_string(),
                        value: other.to_string(),
                        reason: "expected `memory` or `occ`".to_string(),
                    });
                },
            },
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name: name.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            }),
    }
}

/// Milliseconds, where 0 disables the timeout
fn timeout_or<F>(
    lookup: &F,
    name: &str,
    default: Option<Duration>,
) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if lookup(name).is_none() {
        return Ok(default);
    }
    let millis: u64 = parse_or(lookup, name, 0)?;
    Ok((millis > 0).then(|| Duration::from_millis(millis)))
}
