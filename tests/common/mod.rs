#![allow(dead_code)]

use async_trait::async_trait;
use cointip::application::cache::AccountCache;
use cointip::domain::account::{Account, AccountNaming};
use cointip::domain::money::{Currency, Money};
use cointip::domain::ports::{Ledger, LedgerBox};
use cointip::domain::transaction::{Address, Price, Transaction};
use cointip::error::Result;
use cointip::infrastructure::in_memory::InMemoryLedger;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

/// In-memory ledger that also records the arguments of every transfer.
#[derive(Clone, Default)]
pub struct RecordingLedger {
    pub inner: InMemoryLedger,
    transfers: Arc<Mutex<Vec<(String, String, Money)>>>,
}

impl RecordingLedger {
    pub fn new(inner: InMemoryLedger) -> Self {
        Self {
            inner,
            transfers: Arc::default(),
        }
    }

    pub fn transfers(&self) -> Vec<(String, String, Money)> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for RecordingLedger {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.inner.list_accounts().await
    }

    async fn get_account(&self, id: &str) -> Result<Account> {
        self.inner.get_account(id).await
    }

    async fn create_account(&self, name: &str) -> Result<Account> {
        self.inner.create_account(name).await
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        self.inner.delete_account(id).await
    }

    async fn create_address(&self, account_id: &str) -> Result<Address> {
        self.inner.create_address(account_id).await
    }

    async fn transfer(&self, from: &str, to: &str, amount: Money) -> Result<Transaction> {
        self.transfers
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string(), amount));
        self.inner.transfer(from, to, amount).await
    }

    async fn withdraw(&self, from: &str, to_address: &str, amount: Money) -> Result<Transaction> {
        self.inner.withdraw(from, to_address, amount).await
    }

    async fn get_transaction(&self, account_id: &str, tx_id: &str) -> Result<Transaction> {
        self.inner.get_transaction(account_id, tx_id).await
    }

    async fn spot_price(&self, base: Currency, quote: Currency) -> Result<Price> {
        self.inner.spot_price(base, quote).await
    }
}

pub fn shared(ledger: &InMemoryLedger) -> LedgerBox {
    Arc::new(ledger.clone())
}

pub fn cache_for(ledger: LedgerBox) -> Arc<AccountCache> {
    Arc::new(AccountCache::new(ledger, AccountNaming::default()))
}

pub fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::Usd).unwrap()
}
