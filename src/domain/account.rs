use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Prefix prepended to a user key to form its ledger account name.
pub const DEFAULT_ACCOUNT_PREFIX: &str = "cointip_";

/// An amount as reported by the ledger, with its currency code.
///
/// Unlike [`Money`](super::money::Money) this is a read model: the ledger may
/// report codes the bot cannot transfer, and zero balances are normal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Balance {
    pub amount: Decimal,
    pub currency: String,
}

impl Balance {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// `CUR:amount` with two decimal places.
    pub fn fiat(&self) -> String {
        format!("{}:{:.2}", self.currency, self.amount)
    }

    /// `CUR:amount` with eight decimal places.
    pub fn crypto(&self) -> String {
        format!("{}:{:.8}", self.currency, self.amount)
    }
}

/// A ledger-held balance owned by one chat user or by the funding entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque identifier assigned by the ledger.
    pub id: String,
    /// Derived from the owning user key, see [`AccountNaming`].
    pub name: String,
    /// Amount in the account's cryptocurrency.
    #[serde(default)]
    pub balance: Balance,
    /// Amount in the native fiat currency.
    #[serde(default)]
    pub native_balance: Balance,
}

impl Account {
    /// Native and crypto balances, e.g. `USD:3.00 BTC:0.00012345`.
    pub fn balance_summary(&self) -> String {
        format!("{} {}", self.native_balance.fiat(), self.balance.crypto())
    }
}

/// Deterministic mapping from a chat user key to a ledger account name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNaming {
    prefix: String,
}

impl AccountNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn account_name(&self, user_key: &str) -> String {
        format!("{}{}", self.prefix, user_key)
    }
}

impl Default for AccountNaming {
    fn default() -> Self {
        Self::new(DEFAULT_ACCOUNT_PREFIX)
    }
}
