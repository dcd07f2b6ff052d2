use crate::domain::account::{Account, Balance};
use crate::domain::money::{Currency, Money};
use crate::domain::ports::Ledger;
use crate::domain::transaction::{Address, Price, Transaction};
use crate::error::{Result, TipError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Fixed BTC/USD rate the sandbox uses to keep both balances in step.
const SANDBOX_BTC_USD: Decimal = dec!(25000);
const SANDBOX_ETH_USD: Decimal = dec!(1500);

/// Number of calls made to each ledger operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCalls {
    pub list_accounts: usize,
    pub get_account: usize,
    pub create_account: usize,
    pub delete_account: usize,
    pub create_address: usize,
    pub transfer: usize,
    pub withdraw: usize,
    pub get_transaction: usize,
    pub spot_price: usize,
}

impl LedgerCalls {
    pub fn total(&self) -> usize {
        self.list_accounts
            + self.get_account
            + self.create_account
            + self.delete_account
            + self.create_address
            + self.transfer
            + self.withdraw
            + self.get_transaction
            + self.spot_price
    }
}

#[derive(Default)]
struct Counters {
    list_accounts: AtomicUsize,
    get_account: AtomicUsize,
    create_account: AtomicUsize,
    delete_account: AtomicUsize,
    create_address: AtomicUsize,
    transfer: AtomicUsize,
    withdraw: AtomicUsize,
    get_transaction: AtomicUsize,
    spot_price: AtomicUsize,
}

#[derive(Default)]
struct Faults {
    list_accounts: AtomicBool,
    get_account: AtomicBool,
    create_account: AtomicBool,
    create_address: AtomicBool,
    transfer: AtomicBool,
    spot_price: AtomicBool,
}

/// Operations whose failure can be injected with [`InMemoryLedger::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    ListAccounts,
    GetAccount,
    CreateAccount,
    CreateAddress,
    Transfer,
    SpotPrice,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    /// Transactions keyed by `(account_id, tx_id)`.
    transactions: HashMap<(String, String), Transaction>,
}

/// A thread-safe ledger held entirely in memory.
///
/// Backs the `--sandbox` mode of the bot and doubles as the test ledger:
/// every operation is counted and selected operations can be made to fail.
/// `Clone` shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<State>>,
    counters: Arc<Counters>,
    faults: Arc<Faults>,
    next_id: Arc<AtomicU64>,
    latency: Option<Duration>,
}

impl InMemoryLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every operation, widening race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Inserts an account directly, bypassing counters. Returns its id.
    pub async fn seed_account(&self, name: &str, usd: Decimal) -> String {
        let mut account = self.new_account(name);
        set_usd(&mut account, usd);
        let id = account.id.clone();
        self.state.write().await.accounts.insert(id.clone(), account);
        id
    }

    /// Overwrites the USD balance of an existing account, bypassing counters.
    pub async fn set_balance(&self, id: &str, usd: Decimal) {
        if let Some(account) = self.state.write().await.accounts.get_mut(id) {
            set_usd(account, usd);
        }
    }

    pub async fn accounts_named(&self, name: &str) -> Vec<Account> {
        self.state
            .read()
            .await
            .accounts
            .values()
            .filter(|a| a.name == name)
            .cloned()
            .collect()
    }

    pub fn fail(&self, point: FaultPoint, enabled: bool) {
        let flag = match point {
            FaultPoint::ListAccounts => &self.faults.list_accounts,
            FaultPoint::GetAccount => &self.faults.get_account,
            FaultPoint::CreateAccount => &self.faults.create_account,
            FaultPoint::CreateAddress => &self.faults.create_address,
            FaultPoint::Transfer => &self.faults.transfer,
            FaultPoint::SpotPrice => &self.faults.spot_price,
        };
        flag.store(enabled, Ordering::SeqCst);
    }

    pub fn calls(&self) -> LedgerCalls {
        let c = &self.counters;
        LedgerCalls {
            list_accounts: c.list_accounts.load(Ordering::SeqCst),
            get_account: c.get_account.load(Ordering::SeqCst),
            create_account: c.create_account.load(Ordering::SeqCst),
            delete_account: c.delete_account.load(Ordering::SeqCst),
            create_address: c.create_address.load(Ordering::SeqCst),
            transfer: c.transfer.load(Ordering::SeqCst),
            withdraw: c.withdraw.load(Ordering::SeqCst),
            get_transaction: c.get_transaction.load(Ordering::SeqCst),
            spot_price: c.spot_price.load(Ordering::SeqCst),
        }
    }

    fn new_account(&self, name: &str) -> Account {
        Account {
            id: self.next_id("acct"),
            name: name.to_string(),
            balance: Balance::new(Decimal::ZERO, Currency::Btc.code()),
            native_balance: Balance::new(Decimal::ZERO, Currency::Usd.code()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n:04}")
    }

    async fn enter(
        &self,
        counter: &AtomicUsize,
        fault: Option<&AtomicBool>,
        operation: &'static str,
    ) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if fault.is_some_and(|f| f.load(Ordering::SeqCst)) {
            return Err(TipError::LedgerUnavailable {
                operation,
                source: Box::new(std::io::Error::other("injected failure")),
            });
        }
        Ok(())
    }

    async fn move_funds(
        &self,
        operation: &'static str,
        from: &str,
        to: Option<&str>,
        amount: Money,
    ) -> Result<Transaction> {
        let usd = to_usd(amount);

        let mut state = self.state.write().await;
        if let Some(to) = to
            && !state.accounts.contains_key(to)
        {
            return Err(not_found(operation));
        }
        let source = state
            .accounts
            .get_mut(from)
            .ok_or_else(|| not_found(operation))?;
        if source.native_balance.amount < usd {
            return Err(TipError::LedgerRejected {
                operation,
                status: 422,
            });
        }
        let remaining = source.native_balance.amount - usd;
        set_usd(source, remaining);

        if let Some(to) = to
            && let Some(target) = state.accounts.get_mut(to)
        {
            let credited = target.native_balance.amount + usd;
            set_usd(target, credited);
        }

        let tx = Transaction {
            id: self.next_id("tx"),
            r#type: if to.is_some() { "transfer" } else { "send" }.to_string(),
            status: "completed".to_string(),
            amount: Balance::new(-(usd / SANDBOX_BTC_USD).round_dp(8), Currency::Btc.code()),
            native_amount: Balance::new(-usd, Currency::Usd.code()),
            description: Some(format!("cointip {operation}")),
            created_at: None,
            updated_at: None,
        };
        state
            .transactions
            .insert((from.to_string(), tx.id.clone()), tx.clone());
        Ok(tx)
    }
}

/// Rejects currencies the ledger cannot move, before the call is counted.
fn ensure_transferable(amount: Money) -> Result<()> {
    if amount.currency().is_transferable() {
        return Ok(());
    }
    Err(TipError::validation(format!(
        "invalid currency type: {}",
        amount.currency()
    )))
}

fn to_usd(amount: Money) -> Decimal {
    match amount.currency() {
        Currency::Usd => amount.amount(),
        Currency::Btc => (amount.amount() * SANDBOX_BTC_USD).round_dp(2),
        Currency::Eth => (amount.amount() * SANDBOX_ETH_USD).round_dp(2),
    }
}

fn set_usd(account: &mut Account, usd: Decimal) {
    account.native_balance = Balance::new(usd, Currency::Usd.code());
    account.balance = Balance::new((usd / SANDBOX_BTC_USD).round_dp(8), Currency::Btc.code());
}

fn not_found(operation: &'static str) -> TipError {
    TipError::LedgerRejected {
        operation,
        status: 404,
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.enter(&self.counters.list_accounts, Some(&self.faults.list_accounts), "list_accounts")
            .await?;
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    async fn get_account(&self, id: &str) -> Result<Account> {
        self.enter(&self.counters.get_account, Some(&self.faults.get_account), "get_account")
            .await?;
        let state = self.state.read().await;
        state
            .accounts
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("get_account"))
    }

    async fn create_account(&self, name: &str) -> Result<Account> {
        self.enter(
            &self.counters.create_account,
            Some(&self.faults.create_account),
            "create_account",
        )
        .await?;
        let account = self.new_account(name);
        let mut state = self.state.write().await;
        state.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        self.enter(&self.counters.delete_account, None, "delete_account")
            .await?;
        let mut state = self.state.write().await;
        state
            .accounts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("delete_account"))
    }

    async fn create_address(&self, account_id: &str) -> Result<Address> {
        self.enter(
            &self.counters.create_address,
            Some(&self.faults.create_address),
            "create_address",
        )
        .await?;
        if !self.state.read().await.accounts.contains_key(account_id) {
            return Err(not_found("create_address"));
        }
        let id = self.next_id("addr");
        Ok(Address {
            address: format!("sandbox1{}", id.replace('-', "")),
            id,
            name: None,
            network: Some("bitcoin".to_string()),
            created_at: None,
            updated_at: None,
        })
    }

    async fn transfer(&self, from: &str, to: &str, amount: Money) -> Result<Transaction> {
        ensure_transferable(amount)?;
        self.enter(&self.counters.transfer, Some(&self.faults.transfer), "transfer")
            .await?;
        self.move_funds("transfer", from, Some(to), amount).await
    }

    async fn withdraw(&self, from: &str, _to_address: &str, amount: Money) -> Result<Transaction> {
        ensure_transferable(amount)?;
        self.enter(&self.counters.withdraw, None, "withdraw").await?;
        self.move_funds("withdraw", from, None, amount).await
    }

    async fn get_transaction(&self, account_id: &str, tx_id: &str) -> Result<Transaction> {
        self.enter(&self.counters.get_transaction, None, "get_transaction")
            .await?;
        let state = self.state.read().await;
        state
            .transactions
            .get(&(account_id.to_string(), tx_id.to_string()))
            .cloned()
            .ok_or_else(|| not_found("get_transaction"))
    }

    async fn spot_price(&self, base: Currency, quote: Currency) -> Result<Price> {
        self.enter(&self.counters.spot_price, Some(&self.faults.spot_price), "spot_price")
            .await?;
        let amount = match (base, quote) {
            (Currency::Btc, Currency::Usd) => SANDBOX_BTC_USD,
            (Currency::Eth, Currency::Usd) => SANDBOX_ETH_USD,
            (a, b) if a == b => Decimal::ONE,
            _ => return Err(not_found("spot_price")),
        };
        Ok(Balance::new(amount, quote.code()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::Usd).unwrap()
    }

    #[tokio::test]
    async fn test_transfer_moves_native_balance() {
        let ledger = InMemoryLedger::new();
        let alice = ledger.seed_account("cointip_alice", dec!(1.00)).await;
        let bob = ledger.seed_account("cointip_bob", dec!(0)).await;

        let tx = ledger.transfer(&alice, &bob, usd(dec!(0.25))).await.unwrap();
        assert_eq!(tx.native_amount.amount, dec!(-0.25));

        let alice = ledger.get_account(&alice).await.unwrap();
        let bob = ledger.get_account(&bob).await.unwrap();
        assert_eq!(alice.native_balance.amount, dec!(0.75));
        assert_eq!(bob.native_balance.amount, dec!(0.25));
        assert_eq!(ledger.calls().transfer, 1);
    }

    #[tokio::test]
    async fn test_transfer_without_funds_changes_nothing() {
        let ledger = InMemoryLedger::new();
        let alice = ledger.seed_account("cointip_alice", dec!(0.01)).await;
        let bob = ledger.seed_account("cointip_bob", dec!(0)).await;

        let result = ledger.transfer(&alice, &bob, usd(dec!(0.25))).await;
        assert!(matches!(
            result,
            Err(TipError::LedgerRejected { status: 422, .. })
        ));
        let bob = ledger.get_account(&bob).await.unwrap();
        assert_eq!(bob.native_balance.amount, dec!(0));
    }

    #[tokio::test]
    async fn test_eth_transfer_rejected() {
        let ledger = InMemoryLedger::new();
        let alice = ledger.seed_account("cointip_alice", dec!(10)).await;
        let bob = ledger.seed_account("cointip_bob", dec!(0)).await;

        let eth = Money::new(dec!(1), Currency::Eth).unwrap();
        let result = ledger.transfer(&alice, &bob, eth).await;
        assert!(matches!(result, Err(TipError::Validation(_))));
        let result = ledger.withdraw(&alice, "sandbox1addr", eth).await;
        assert!(matches!(result, Err(TipError::Validation(_))));

        // Refused before reaching the ledger, like the HTTP client.
        assert_eq!(ledger.calls().total(), 0);
        let alice = ledger.get_account(&alice).await.unwrap();
        assert_eq!(alice.native_balance.amount, dec!(10));
    }

    #[tokio::test]
    async fn test_fault_injection_and_counters() {
        let ledger = InMemoryLedger::new();
        ledger.fail(FaultPoint::ListAccounts, true);
        assert!(matches!(
            ledger.list_accounts().await,
            Err(TipError::LedgerUnavailable { operation: "list_accounts", .. })
        ));
        ledger.fail(FaultPoint::ListAccounts, false);
        assert!(ledger.list_accounts().await.unwrap().is_empty());
        assert_eq!(ledger.calls().list_accounts, 2);
        assert_eq!(ledger.calls().total(), 2);
    }

    #[tokio::test]
    async fn test_transactions_are_retrievable() {
        let ledger = InMemoryLedger::new();
        let alice = ledger.seed_account("cointip_alice", dec!(5)).await;
        let tx = ledger
            .withdraw(&alice, "bc1qexample", usd(dec!(1)))
            .await
            .unwrap();
        assert_eq!(tx.r#type, "send");

        let fetched = ledger.get_transaction(&alice, &tx.id).await.unwrap();
        assert_eq!(fetched, tx);
        assert!(ledger.get_transaction("other", &tx.id).await.is_err());
    }
}
