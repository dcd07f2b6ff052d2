use super::cache::AccountCache;
use crate::domain::denomination::DenominationTable;
use crate::domain::event::TipEvent;
use crate::domain::ports::LedgerBox;
use crate::domain::transaction::Transaction;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Turns reaction events into transfers between the two parties' accounts.
pub struct TipOrchestrator {
    cache: Arc<AccountCache>,
    ledger: LedgerBox,
    denominations: DenominationTable,
}

impl TipOrchestrator {
    pub fn new(cache: Arc<AccountCache>, ledger: LedgerBox, denominations: DenominationTable) -> Self {
        Self {
            cache,
            ledger,
            denominations,
        }
    }

    /// Executes one tip.
    ///
    /// Returns `Ok(None)` without touching the ledger when the symbol is not a
    /// tip denomination or the actor is tipping themselves.
    pub async fn handle_tip(&self, event: &TipEvent) -> Result<Option<Transaction>> {
        let Some(amount) = self.denominations.lookup(&event.symbol) else {
            return Ok(None);
        };

        info!(
            symbol = %event.symbol,
            from = %event.actor_key,
            to = %event.target_key,
            "got tip reaction"
        );
        if event.is_self_tip() {
            info!(user = %event.actor_key, "skipping tip, user is tipping themselves");
            return Ok(None);
        }

        let from = self.cache.resolve(&event.actor_key, false).await?;
        let to = self.cache.resolve(&event.target_key, false).await?;

        let tx = self.ledger.transfer(&from.id, &to.id, amount).await?;
        info!(
            from = %from.name,
            from_id = %from.id,
            to = %to.name,
            to_id = %to.id,
            amount = %tx.native_amount.fiat(),
            tx_id = %tx.id,
            "tip sent"
        );
        Ok(Some(tx))
    }
}
