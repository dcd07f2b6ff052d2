use super::account::Balance;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub status: String,
    /// Amount in the cryptocurrency.
    #[serde(default)]
    pub amount: Balance,
    /// Amount in the native fiat currency.
    #[serde(default)]
    pub native_amount: Balance,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A receive address created for an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Spot price of one unit of a base currency.
pub type Price = Balance;
