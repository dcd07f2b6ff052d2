//! Typed settings for the ledger client and the tip plugin.
//!
//! Values arrive from the command line (see `interfaces::cli`), which in turn
//! falls back to environment variables for credentials and endpoint.

use crate::domain::account::{AccountNaming, DEFAULT_ACCOUNT_PREFIX};
use crate::domain::denomination::DenominationTable;
use crate::domain::money::{Currency, Money};
use crate::error::{Result, TipError};
use rust_decimal_macros::dec;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.coinbase.com/v2/";
/// Pinned API version, see the Coinbase v2 versioning docs.
pub const DEFAULT_API_VERSION: &str = "2017-05-17";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEBUG_ENV: &str = "COINTIP_DEBUG";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    /// Both values are required; an empty string counts as missing.
    pub fn new(api_key: Option<String>, api_secret: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TipError::Config("missing required argument 'api-key'".to_string()))?;
        let api_secret = api_secret.filter(|s| !s.is_empty()).ok_or_else(|| {
            TipError::Config("missing required argument 'api-secret'".to_string())
        })?;
        Ok(Self {
            api_key,
            api_secret,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub credentials: Credentials,
    /// Base URL; must end with `/` since request paths are appended to it.
    pub endpoint: String,
    pub api_version: String,
    pub timeout: Duration,
    /// Log every request and response.
    pub debug: bool,
}

impl LedgerConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            debug: std::env::var(DEBUG_ENV).is_ok_and(|v| v == "1"),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let mut endpoint = endpoint.into();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        self.endpoint = endpoint;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = self.debug || debug;
        self
    }
}

/// The account that seeds newly created tip jars.
#[derive(Debug, Clone)]
pub struct FundingConfig {
    /// User key of the funding account; resolved like any other user.
    pub user_key: String,
    /// Seed transferred into every newly created account.
    pub prime_amount: Money,
}

impl FundingConfig {
    pub fn new(user_key: impl Into<String>, prime_amount: Money) -> Self {
        Self {
            user_key: user_key.into(),
            prime_amount,
        }
    }

    /// Three dollars, the historical seed amount.
    pub fn default_prime_amount() -> Money {
        Money::from_positive(dec!(3.00), Currency::Usd)
    }
}

#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// `None` disables the funding bootstrap and priming entirely.
    pub funding: Option<FundingConfig>,
    pub denominations: DenominationTable,
    pub naming: AccountNaming,
    /// Refresh the account before creating a deposit address.
    pub refresh_before_deposit: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            funding: None,
            denominations: DenominationTable::default(),
            naming: AccountNaming::new(DEFAULT_ACCOUNT_PREFIX),
            refresh_before_deposit: false,
        }
    }
}

impl PluginConfig {
    pub fn with_funding(mut self, funding: FundingConfig) -> Self {
        self.funding = Some(funding);
        self
    }

    pub fn funding_enabled(&self) -> bool {
        self.funding.is_some()
    }
}
