use super::money::{Currency, Money};
use crate::error::TipError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Closed mapping from reaction symbol to a fixed tip amount.
#[derive(Debug, Clone, PartialEq)]
pub struct DenominationTable {
    currency: Currency,
    tiers: BTreeMap<String, Money>,
}

impl DenominationTable {
    pub fn new<I, S>(currency: Currency, tiers: I) -> Result<Self, TipError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let tiers = tiers
            .into_iter()
            .map(|(symbol, amount)| Ok((symbol.into(), Money::new(amount, currency)?)))
            .collect::<Result<BTreeMap<_, _>, TipError>>()?;
        if tiers.is_empty() {
            return Err(TipError::Config(
                "denomination table must have at least one tier".to_string(),
            ));
        }
        Ok(Self { currency, tiers })
    }

    pub fn lookup(&self, symbol: &str) -> Option<Money> {
        self.tiers.get(symbol).copied()
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tiers.keys().map(String::as_str)
    }
}

impl Default for DenominationTable {
    /// Five USD tiers, `cointip_1` (one cent) through `cointip_25`.
    fn default() -> Self {
        let tiers = [
            ("cointip_1", dec!(0.01)),
            ("cointip_2", dec!(0.02)),
            ("cointip_5", dec!(0.05)),
            ("cointip_10", dec!(0.10)),
            ("cointip_25", dec!(0.25)),
        ]
        .into_iter()
        .map(|(symbol, amount)| {
            (
                symbol.to_string(),
                Money::from_positive(amount, Currency::Usd),
            )
        })
        .collect();
        Self {
            currency: Currency::Usd,
            tiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = DenominationTable::default();
        assert_eq!(table.symbols().count(), 5);
        assert_eq!(table.currency(), Currency::Usd);
        assert_eq!(table.lookup("cointip_5").unwrap().amount(), dec!(0.05));
        assert_eq!(table.lookup("cointip_25").unwrap().currency(), Currency::Usd);
        assert!(table.lookup("thumbsup").is_none());
    }

    #[test]
    fn test_custom_table_rejects_bad_tiers() {
        assert!(DenominationTable::new(Currency::Usd, [("small", dec!(0))]).is_err());
        assert!(DenominationTable::new(Currency::Usd, Vec::<(String, Decimal)>::new()).is_err());

        let table =
            DenominationTable::new(Currency::Btc, [("sat", dec!(0.00000001))]).unwrap();
        assert_eq!(table.currency(), Currency::Btc);
        assert_eq!(table.lookup("sat").unwrap().currency(), Currency::Btc);
    }
}
