use crate::application::plugin::CointipPlugin;
use crate::config::{Credentials, FundingConfig, LedgerConfig, PluginConfig};
use crate::domain::account::{Account, AccountNaming, DEFAULT_ACCOUNT_PREFIX};
use crate::domain::money::{Currency, Money};
use crate::domain::ports::{Ledger, LedgerBox};
use crate::domain::transaction::Transaction;
use crate::error::Result;
use crate::infrastructure::coinbase::CoinbaseClient;
use crate::infrastructure::in_memory::InMemoryLedger;
use crate::interfaces::console;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "cointip",
    author,
    version,
    about = "Create accounts and move currency around via the Coinbase API.",
    long_about = None
)]
pub struct Cli {
    /// Coinbase API key.
    #[arg(long, env = "COINBASE_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Coinbase API secret.
    #[arg(long, env = "COINBASE_SECRET", global = true, hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Ledger API base URL.
    #[arg(long, env = "COINTIP_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Log every ledger request and response (also enabled by COINTIP_DEBUG=1).
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List accounts
    ListAccounts,
    /// Get account
    GetAccount { account_id: String },
    /// Create account
    CreateAccount { name: String },
    /// Delete account
    DeleteAccount { account_id: String },
    /// Create an address for receiving funds
    CreateAddress { account_id: String },
    /// Transfer funds between accounts
    Transfer(MoveArgs),
    /// Withdraw funds to a BTC address
    Withdraw(MoveArgs),
    /// Show a transaction
    GetTransaction { account_id: String, tx_id: String },
    /// Show the spot price of a currency
    Price {
        base: String,
        #[arg(long, default_value = "USD")]
        quote: String,
    },
    /// Run the tip bot, reading chat events from stdin
    Bot(BotArgs),
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Account ID to transfer FROM
    #[arg(long)]
    pub from: String,
    /// Account ID (or address, for withdrawals) to transfer TO
    #[arg(long)]
    pub to: String,
    /// Currency type to transfer
    #[arg(long)]
    pub currency: String,
    /// Amount to transfer
    #[arg(long)]
    pub amount: Decimal,
}

impl MoveArgs {
    fn money(&self) -> Result<Money> {
        let currency: Currency = self.currency.parse()?;
        Money::new(self.amount, currency)
    }
}

#[derive(Args, Debug)]
pub struct BotArgs {
    /// Use an in-memory ledger instead of Coinbase.
    #[arg(long)]
    pub sandbox: bool,

    /// User key of the account that primes new tip jars. Priming is off without it.
    #[arg(long, env = "COINTIP_FUNDING_KEY")]
    pub funding_key: Option<String>,

    /// Seed transferred into every new account.
    #[arg(long, default_value = "3.00")]
    pub prime_amount: Decimal,

    #[arg(long, default_value = "USD")]
    pub prime_currency: String,

    /// Refresh the account before creating a deposit address.
    #[arg(long)]
    pub refresh_before_deposit: bool,

    #[arg(long, default_value = DEFAULT_ACCOUNT_PREFIX)]
    pub account_prefix: String,

    /// Starting USD balance of the funding account in sandbox mode.
    #[arg(long, default_value = "100")]
    pub sandbox_funds: Decimal,
}

impl BotArgs {
    fn plugin_config(&self) -> Result<PluginConfig> {
        let mut config = PluginConfig {
            naming: AccountNaming::new(self.account_prefix.clone()),
            refresh_before_deposit: self.refresh_before_deposit,
            ..PluginConfig::default()
        };
        if let Some(key) = &self.funding_key {
            let seed = Money::new(self.prime_amount, self.prime_currency.parse()?)?;
            config = config.with_funding(FundingConfig::new(key.clone(), seed));
        }
        Ok(config)
    }
}

/// `<id> <name> <CUR>:<8dp> <CUR>:<2dp>`
pub fn account_line(account: &Account) -> String {
    format!(
        "{} {} {} {}",
        account.id,
        account.name,
        account.balance.crypto(),
        account.native_balance.fiat()
    )
}

/// `<id> <status> <CUR>:<8dp> <CUR>:<2dp>`
pub fn transaction_line(tx: &Transaction) -> String {
    format!(
        "{} {} {} {}",
        tx.id,
        tx.status,
        tx.amount.crypto(),
        tx.native_amount.fiat()
    )
}

fn coinbase(cli: &Cli) -> Result<CoinbaseClient> {
    let credentials = Credentials::new(cli.api_key.clone(), cli.api_secret.clone())?;
    let mut config = LedgerConfig::new(credentials).with_debug(cli.debug);
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    CoinbaseClient::new(config)
}

/// Executes one subcommand, printing its result to stdout.
pub async fn run(cli: Cli) -> Result<()> {
    if let Command::Bot(args) = &cli.command {
        return run_bot(&cli, args).await;
    }

    let ledger = coinbase(&cli)?;
    match &cli.command {
        Command::ListAccounts => {
            for account in ledger.list_accounts().await? {
                println!("{}", account_line(&account));
            }
        }
        Command::GetAccount { account_id } => {
            println!("{}", account_line(&ledger.get_account(account_id).await?));
        }
        Command::CreateAccount { name } => {
            println!("{}", account_line(&ledger.create_account(name).await?));
        }
        Command::DeleteAccount { account_id } => {
            ledger.delete_account(account_id).await?;
            println!("deleted account {account_id}");
        }
        Command::CreateAddress { account_id } => {
            println!("{}", ledger.create_address(account_id).await?.address);
        }
        Command::Transfer(args) => {
            let tx = ledger.transfer(&args.from, &args.to, args.money()?).await?;
            println!("{}", transaction_line(&tx));
        }
        Command::Withdraw(args) => {
            let tx = ledger.withdraw(&args.from, &args.to, args.money()?).await?;
            println!("{}", transaction_line(&tx));
        }
        Command::GetTransaction { account_id, tx_id } => {
            let tx = ledger.get_transaction(account_id, tx_id).await?;
            println!("{}", transaction_line(&tx));
        }
        Command::Price { base, quote } => {
            let price = ledger.spot_price(base.parse()?, quote.parse()?).await?;
            println!("{:.2} {}", price.amount, price.currency);
        }
        Command::Bot(_) => {}
    }
    Ok(())
}

async fn run_bot(cli: &Cli, args: &BotArgs) -> Result<()> {
    let config = args.plugin_config()?;

    let ledger: LedgerBox = if args.sandbox {
        let sandbox = InMemoryLedger::new();
        if let Some(funding) = &config.funding {
            let name = config.naming.account_name(&funding.user_key);
            sandbox.seed_account(&name, args.sandbox_funds).await;
        }
        info!("using sandbox ledger");
        Arc::new(sandbox)
    } else {
        Arc::new(coinbase(cli)?)
    };

    let cancel = CancellationToken::new();
    let plugin = CointipPlugin::register(ledger, config, cancel.clone()).await?;

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
            ctrl_c.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = console::serve(&plugin, stdin, tokio::io::stdout(), cancel.clone()).await;
    if cancel.is_cancelled() {
        plugin.shutdown().await;
    } else {
        plugin.drain().await;
    }
    result
}
