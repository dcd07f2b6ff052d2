use crate::domain::account::Account;
use crate::domain::money::Money;
use crate::domain::ports::Ledger;
use crate::error::{Result, TipError};
use tracing::{error, info};

/// Result of a priming attempt that did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimingOutcome {
    /// Seeded and re-fetched; the record reflects the post-priming balance.
    Primed(Account),
    /// The seed transfer failed; the record is the account as created.
    Unprimed(Account),
}

impl PrimingOutcome {
    pub fn is_primed(&self) -> bool {
        matches!(self, PrimingOutcome::Primed(_))
    }

    pub fn into_account(self) -> Account {
        match self {
            PrimingOutcome::Primed(account) | PrimingOutcome::Unprimed(account) => account,
        }
    }
}

/// Seeds a newly created account from the funding account.
///
/// Priming is best effort: a failed seed transfer is logged and the unprimed
/// account is returned as a success.
#[derive(Debug, Clone)]
pub struct PrimingPolicy {
    funding: Account,
    seed: Money,
}

impl PrimingPolicy {
    pub fn new(funding: Account, seed: Money) -> Self {
        Self { funding, seed }
    }

    pub fn funding(&self) -> &Account {
        &self.funding
    }

    pub fn seed(&self) -> Money {
        self.seed
    }

    /// Transfers the seed into `account` and re-fetches it.
    ///
    /// # Errors
    ///
    /// Returns [`TipError::StaleAfterPriming`] when the seed landed but the
    /// re-fetch failed; it carries `account` as it was before priming.
    pub async fn prime(&self, ledger: &dyn Ledger, account: Account) -> Result<PrimingOutcome> {
        let tx = match ledger
            .transfer(&self.funding.id, &account.id, self.seed)
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                error!(
                    error = %e,
                    funding = %self.funding.name,
                    funding_id = %self.funding.id,
                    account_id = %account.id,
                    "failed to prime new account from funding account"
                );
                return Ok(PrimingOutcome::Unprimed(account));
            }
        };

        info!(
            account = %account.name,
            account_id = %account.id,
            tx_id = %tx.id,
            seed = %self.seed,
            "primed new account, refreshing"
        );
        match ledger.get_account(&account.id).await {
            Ok(refreshed) => Ok(PrimingOutcome::Primed(refreshed)),
            Err(e) => {
                error!(error = %e, account_id = %account.id, "failed refreshing account after priming");
                Err(TipError::StaleAfterPriming {
                    account: Box::new(account),
                    source: Box::new(e),
                })
            }
        }
    }
}
