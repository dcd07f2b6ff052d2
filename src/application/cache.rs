use super::priming::PrimingPolicy;
use crate::domain::account::{Account, AccountNaming};
use crate::domain::ports::LedgerBox;
use crate::error::Result;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Default)]
struct CacheState {
    /// Most recently observed account, keyed by derived account name.
    entries: HashMap<String, Account>,
    /// Set once the full account list has been loaded.
    warmed: bool,
}

/// In-process map from chat user key to ledger account.
///
/// A single mutex covers lookup, warming, creation and store-back, so two
/// concurrent resolutions of the same key never create two accounts. Accounts
/// created by another process between warming and creation are not seen; that
/// exclusivity is only per process.
pub struct AccountCache {
    ledger: LedgerBox,
    naming: AccountNaming,
    priming: Option<PrimingPolicy>,
    state: Mutex<CacheState>,
}

impl AccountCache {
    pub fn new(ledger: LedgerBox, naming: AccountNaming) -> Self {
        Self {
            ledger,
            naming,
            priming: None,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Attaches the policy run after each account creation. Cached entries are kept.
    pub fn with_priming(mut self, priming: PrimingPolicy) -> Self {
        self.priming = Some(priming);
        self
    }

    /// Returns the account of `user_key`, creating it on first use.
    ///
    /// With `refresh` the returned record has been fetched from the ledger
    /// during this call. A failed refresh leaves the previous entry cached.
    pub async fn resolve(&self, user_key: &str, refresh: bool) -> Result<Account> {
        let name = self.naming.account_name(user_key);
        let mut state = self.state.lock().await;

        if !state.entries.contains_key(&name) && !state.warmed {
            self.warm(&mut state).await?;
        }

        let cached = state.entries.get(&name).cloned();
        let (account, fetched) = match cached {
            Some(cached) => (cached, false),
            None => self.create(&mut state, &name).await?,
        };

        if !refresh || fetched {
            return Ok(account);
        }

        info!(account = %account.name, account_id = %account.id, "refreshing account");
        let fresh = self.ledger.get_account(&account.id).await?;
        state.entries.insert(name, fresh.clone());
        Ok(fresh)
    }

    /// Number of accounts currently cached.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn warm(&self, state: &mut CacheState) -> Result<()> {
        info!("listing ledger accounts");
        let accounts = self.ledger.list_accounts().await?;
        let listed = accounts.len();
        for account in accounts {
            if let Some(existing) = state.entries.get(&account.name) {
                warn!(
                    account = %account.name,
                    kept = %existing.id,
                    ignored = %account.id,
                    "duplicate ledger accounts share a name"
                );
                continue;
            }
            state.entries.insert(account.name.clone(), account);
        }
        state.warmed = true;
        info!(listed, cached = state.entries.len(), "account cache warmed");
        Ok(())
    }

    /// Creates, caches and primes a new account. The flag tells whether the
    /// returned record was re-fetched from the ledger after priming.
    async fn create(&self, state: &mut CacheState, name: &str) -> Result<(Account, bool)> {
        info!(account = %name, "creating new account");
        let account = self.ledger.create_account(name).await?;
        state.entries.insert(name.to_string(), account.clone());
        info!(account = %account.name, account_id = %account.id, "created new account");

        let Some(priming) = &self.priming else {
            info!("skipping account priming, no funding account configured");
            return Ok((account, false));
        };

        let outcome = priming.prime(self.ledger.as_ref(), account).await?;
        let fetched = outcome.is_primed();
        let account = outcome.into_account();
        state.entries.insert(name.to_string(), account.clone());
        Ok((account, fetched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Currency, Money};
    use crate::domain::ports::Ledger;
    use crate::error::TipError;
    use crate::infrastructure::in_memory::{FaultPoint, InMemoryLedger};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn cache(ledger: &InMemoryLedger) -> AccountCache {
        AccountCache::new(Arc::new(ledger.clone()), AccountNaming::default())
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_calls() {
        let ledger = InMemoryLedger::new();
        let cache = cache(&ledger);

        let first = cache.resolve("U1", false).await.unwrap();
        let before = ledger.calls();
        let second = cache.resolve("U1", false).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(ledger.calls(), before);
    }

    #[tokio::test]
    async fn test_warm_finds_existing_account() {
        let ledger = InMemoryLedger::new();
        let id = ledger.seed_account("cointip_U1", dec!(2)).await;
        let cache = cache(&ledger);

        let account = cache.resolve("U1", false).await.unwrap();
        assert_eq!(account.id, id);
        assert_eq!(ledger.calls().create_account, 0);
        assert_eq!(ledger.calls().list_accounts, 1);
    }

    #[tokio::test]
    async fn test_warms_only_once() {
        let ledger = InMemoryLedger::new();
        let cache = cache(&ledger);

        cache.resolve("U1", false).await.unwrap();
        cache.resolve("U2", false).await.unwrap();
        cache.resolve("U3", true).await.unwrap();
        assert_eq!(ledger.calls().list_accounts, 1);
        assert_eq!(ledger.calls().create_account, 3);
    }

    #[tokio::test]
    async fn test_failed_warm_is_retried() {
        let ledger = InMemoryLedger::new();
        let cache = cache(&ledger);

        ledger.fail(FaultPoint::ListAccounts, true);
        assert!(cache.resolve("U1", false).await.is_err());
        assert_eq!(ledger.calls().create_account, 0);

        ledger.fail(FaultPoint::ListAccounts, false);
        assert!(cache.resolve("U1", false).await.is_ok());
        assert_eq!(ledger.calls().list_accounts, 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_entry() {
        let ledger = InMemoryLedger::new();
        let cache = cache(&ledger);

        let account = cache.resolve("U1", false).await.unwrap();
        ledger.set_balance(&account.id, dec!(7.50)).await;

        let stale = cache.resolve("U1", false).await.unwrap();
        assert_eq!(stale.native_balance.amount, dec!(0));

        let fresh = cache.resolve("U1", true).await.unwrap();
        assert_eq!(fresh.native_balance.amount, dec!(7.50));
        let cached = cache.resolve("U1", false).await.unwrap();
        assert_eq!(cached.native_balance.amount, dec!(7.50));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_entry() {
        let ledger = InMemoryLedger::new();
        let cache = cache(&ledger);
        let account = cache.resolve("U1", false).await.unwrap();

        ledger.fail(FaultPoint::GetAccount, true);
        assert!(cache.resolve("U1", true).await.is_err());

        let cached = cache.resolve("U1", false).await.unwrap();
        assert_eq!(cached, account);
    }

    #[tokio::test]
    async fn test_refresh_on_new_account_fetches_once() {
        let ledger = InMemoryLedger::new();
        let cache = cache(&ledger);

        cache.resolve("U1", true).await.unwrap();
        assert_eq!(ledger.calls().get_account, 1);
    }

    #[tokio::test]
    async fn test_priming_after_creation_only() {
        let ledger = InMemoryLedger::new();
        let bank_id = ledger.seed_account("cointip_bank", dec!(100)).await;
        let bank = ledger.get_account(&bank_id).await.unwrap();
        let seed = Money::new(dec!(3), Currency::Usd).unwrap();
        let cache = cache(&ledger).with_priming(PrimingPolicy::new(bank, seed));

        let account = cache.resolve("U1", false).await.unwrap();
        assert_eq!(account.native_balance.amount, dec!(3));

        cache.resolve("U1", false).await.unwrap();
        cache.resolve("U1", true).await.unwrap();
        cache.resolve("bank", false).await.unwrap();
        assert_eq!(ledger.calls().transfer, 1);
    }

    #[tokio::test]
    async fn test_stale_after_priming_keeps_created_account() {
        let ledger = InMemoryLedger::new();
        let bank_id = ledger.seed_account("cointip_bank", dec!(100)).await;
        let bank = ledger.get_account(&bank_id).await.unwrap();
        let seed = Money::new(dec!(3), Currency::Usd).unwrap();
        let cache = cache(&ledger).with_priming(PrimingPolicy::new(bank, seed));

        ledger.fail(FaultPoint::GetAccount, true);
        let created = match cache.resolve("U1", false).await {
            Err(TipError::StaleAfterPriming { account, .. }) => *account,
            other => panic!("expected StaleAfterPriming, got {other:?}"),
        };

        ledger.fail(FaultPoint::GetAccount, false);
        let again = cache.resolve("U1", false).await.unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(ledger.calls().create_account, 1);
        assert_eq!(ledger.accounts_named("cointip_U1").await.len(), 1);
    }
}
