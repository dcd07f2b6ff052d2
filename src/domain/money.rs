use crate::error::TipError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currencies the bot knows how to talk about.
///
/// Only [`Currency::Usd`] and [`Currency::Btc`] can move between accounts;
/// `ETH` exists for spot price lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Btc,
    Eth,
}

impl Currency {
    pub const TRANSFERABLE: [Currency; 2] = [Currency::Usd, Currency::Btc];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
        }
    }

    pub fn is_transferable(&self) -> bool {
        Self::TRANSFERABLE.contains(self)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = TipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "BTC" => Ok(Currency::Btc),
            "ETH" => Ok(Currency::Eth),
            other => Err(TipError::validation(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

/// A positive amount tagged with its currency, used for outgoing transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, TipError> {
        if amount > Decimal::ZERO {
            Ok(Self { amount, currency })
        } else {
            Err(TipError::validation("amount must be positive"))
        }
    }

    /// For constants that are positive by construction.
    pub(crate) const fn from_positive(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Wire representation of the amount: always eight decimal places.
    pub fn wire_amount(&self) -> String {
        format!("{:.8}", self.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.currency {
            Currency::Usd => write!(f, "{}:{:.2}", self.currency, self.amount),
            _ => write!(f, "{}:{:.8}", self.currency, self.amount),
        }
    }
}
