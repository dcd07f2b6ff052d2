use super::cache::AccountCache;
use crate::domain::event::Reply;
use crate::domain::money::Currency;
use crate::domain::ports::LedgerBox;
use crate::error::TipError;
use std::sync::Arc;
use tracing::{error, info};

pub const HELP_TEXT: &str =
    "cointip: Tip your friends!\nAvailable commands: help, balance, deposit, withdraw";
pub const WITHDRAW_TEXT: &str = "withdraw is not implemented yet, sorry!";

fn error_reply(err: &TipError) -> Reply {
    Reply::private(format!("Uh Oh. Something broke: {err}"))
}

/// Answers `/cointip <subcommand>` and the spot price commands.
pub struct CommandOrchestrator {
    cache: Arc<AccountCache>,
    ledger: LedgerBox,
    refresh_before_deposit: bool,
}

impl CommandOrchestrator {
    pub fn new(cache: Arc<AccountCache>, ledger: LedgerBox, refresh_before_deposit: bool) -> Self {
        Self {
            cache,
            ledger,
            refresh_before_deposit,
        }
    }

    /// Produces exactly one reply for a `/cointip` command line.
    pub async fn handle_command(&self, user_key: &str, line: &str) -> Reply {
        let command = line.split_whitespace().next().unwrap_or_default();
        info!(command, user = %user_key, "got command");

        match command {
            "balance" => match self.cache.resolve(user_key, true).await {
                Ok(account) => {
                    Reply::private(format!("tipjar balance: {}", account.balance_summary()))
                }
                Err(e) => {
                    error!(error = %e, user = %user_key, "failed fetching account");
                    error_reply(&e)
                }
            },
            "deposit" => self.deposit(user_key).await,
            "withdraw" => Reply::private(WITHDRAW_TEXT),
            _ => Reply::private(HELP_TEXT),
        }
    }

    async fn deposit(&self, user_key: &str) -> Reply {
        let account = match self.cache.resolve(user_key, self.refresh_before_deposit).await {
            Ok(account) => account,
            Err(e) => {
                error!(error = %e, user = %user_key, "failed fetching account");
                return error_reply(&e);
            }
        };
        match self.ledger.create_address(&account.id).await {
            Ok(address) => Reply::private(format!("deposit address: {}", address.address)),
            Err(e) => {
                error!(error = %e, account_id = %account.id, "failed creating deposit address");
                error_reply(&e)
            }
        }
    }

    /// Spot price of `base` in USD, posted to the channel.
    pub async fn handle_price(&self, base: Currency) -> Reply {
        match self.ledger.spot_price(base, Currency::Usd).await {
            Ok(price) => Reply::in_channel(format!("{:.2} {}", price.amount, price.currency)),
            Err(e) => {
                error!(error = %e, %base, "failed getting spot price");
                error_reply(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountNaming;
    use crate::infrastructure::in_memory::{FaultPoint, InMemoryLedger};
    use rust_decimal_macros::dec;

    fn commands(ledger: &InMemoryLedger, refresh_before_deposit: bool) -> CommandOrchestrator {
        let ledger_box: LedgerBox = Arc::new(ledger.clone());
        let cache = Arc::new(AccountCache::new(ledger_box.clone(), AccountNaming::default()));
        CommandOrchestrator::new(cache, ledger_box, refresh_before_deposit)
    }

    #[tokio::test]
    async fn test_balance_reply_format() {
        let ledger = InMemoryLedger::new();
        ledger.seed_account("cointip_U1", dec!(2.5)).await;
        let commands = commands(&ledger, false);

        let reply = commands.handle_command("U1", "balance").await;
        assert_eq!(reply.text, "tipjar balance: USD:2.50 BTC:0.00010000");
        assert!(!reply.in_channel);
    }

    #[tokio::test]
    async fn test_deposit_does_not_refresh_by_default() {
        let ledger = InMemoryLedger::new();
        let commands = commands(&ledger, false);

        let reply = commands.handle_command("U1", "deposit").await;
        assert!(reply.text.starts_with("deposit address: sandbox1"));
        assert_eq!(ledger.calls().get_account, 0);
        assert_eq!(ledger.calls().create_address, 1);
    }

    #[tokio::test]
    async fn test_deposit_refresh_policy() {
        let ledger = InMemoryLedger::new();
        ledger.seed_account("cointip_U1", dec!(0)).await;
        let commands = commands(&ledger, true);

        commands.handle_command("U1", "deposit").await;
        assert_eq!(ledger.calls().get_account, 1);
    }

    #[tokio::test]
    async fn test_address_failure_replies_with_error() {
        let ledger = InMemoryLedger::new();
        ledger.fail(FaultPoint::CreateAddress, true);
        let commands = commands(&ledger, false);

        let reply = commands.handle_command("U1", "deposit extra args").await;
        assert!(reply.text.starts_with("Uh Oh. Something broke: "));
        assert!(!reply.in_channel);
    }

    #[tokio::test]
    async fn test_withdraw_and_help() {
        let ledger = InMemoryLedger::new();
        let commands = commands(&ledger, false);

        assert_eq!(commands.handle_command("U1", "withdraw 5").await.text, WITHDRAW_TEXT);
        assert_eq!(commands.handle_command("U1", "help").await.text, HELP_TEXT);
        assert_eq!(commands.handle_command("U1", "   ").await.text, HELP_TEXT);
        assert_eq!(ledger.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_price_reply() {
        let ledger = InMemoryLedger::new();
        let commands = commands(&ledger, false);

        let reply = commands.handle_price(Currency::Btc).await;
        assert_eq!(reply, Reply::in_channel("25000.00 USD"));

        ledger.fail(FaultPoint::SpotPrice, true);
        let reply = commands.handle_price(Currency::Eth).await;
        assert!(!reply.in_channel);
        assert!(reply.text.contains("Something broke"));
    }
}
