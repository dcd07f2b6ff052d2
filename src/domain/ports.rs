use super::account::Account;
use super::money::{Currency, Money};
use super::transaction::{Address, Price, Transaction};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The external account-holding ledger service.
///
/// Implementations must reject non-transferable currencies in
/// [`Ledger::transfer`] and [`Ledger::withdraw`] before any network call.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<Account>>;
    async fn get_account(&self, id: &str) -> Result<Account>;
    async fn create_account(&self, name: &str) -> Result<Account>;
    async fn delete_account(&self, id: &str) -> Result<()>;
    async fn create_address(&self, account_id: &str) -> Result<Address>;
    /// Moves funds between two ledger accounts.
    async fn transfer(&self, from: &str, to: &str, amount: Money) -> Result<Transaction>;
    /// Sends funds from an account to an external address.
    async fn withdraw(&self, from: &str, to_address: &str, amount: Money) -> Result<Transaction>;
    async fn get_transaction(&self, account_id: &str, tx_id: &str) -> Result<Transaction>;
    async fn spot_price(&self, base: Currency, quote: Currency) -> Result<Price>;
}

pub type LedgerBox = Arc<dyn Ledger>;
