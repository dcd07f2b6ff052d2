use super::cache::AccountCache;
use super::command::CommandOrchestrator;
use super::dispatch::{
    CointipCommandHandler, EventHandler, PriceCommandHandler, ReactionHandler, run_loop,
};
use super::priming::PrimingPolicy;
use super::tip::TipOrchestrator;
use crate::config::PluginConfig;
use crate::domain::event::{CommandEvent, Reply, TipEvent};
use crate::domain::money::Currency;
use crate::domain::ports::LedgerBox;
use crate::error::{Result, TipError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const PLUGIN_NAME: &str = "cointip";
/// Commands registered with the host, in registration order.
pub const COMMANDS: [&str; 3] = ["cointip", "btc", "eth"];

const QUEUE_DEPTH: usize = 64;

/// The tip bot as seen by a chat host: named commands plus one reaction hook.
///
/// Every command and the reaction hook get their own queue and worker task.
pub struct CointipPlugin {
    commands: HashMap<&'static str, mpsc::Sender<CommandEvent>>,
    reactions: mpsc::Sender<TipEvent>,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl CointipPlugin {
    /// Sets the plugin up and starts its event loops.
    ///
    /// With funding enabled, the funding account is resolved (and created if
    /// missing) first. Any failure there aborts registration before a single
    /// handler runs.
    pub async fn register(
        ledger: LedgerBox,
        config: PluginConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let mut cache = AccountCache::new(ledger.clone(), config.naming.clone());

        if let Some(funding) = &config.funding {
            let bank = cache.resolve(&funding.user_key, false).await.map_err(|e| {
                error!(error = %e, "failed to set up funding account, bailing");
                e
            })?;
            let policy = PrimingPolicy::new(bank, funding.prime_amount);
            let total_accounts = cache.len().await;
            info!(
                funding = %policy.funding().name,
                funding_id = %policy.funding().id,
                balance = %policy.funding().balance_summary(),
                seed = %policy.seed(),
                total_accounts,
                "starting plugin"
            );
            cache = cache.with_priming(policy);
        } else {
            info!("starting plugin without a funding account, new accounts will not be primed");
        }

        let cache = Arc::new(cache);
        let tips = Arc::new(TipOrchestrator::new(
            cache.clone(),
            ledger.clone(),
            config.denominations.clone(),
        ));
        let orchestrator = Arc::new(CommandOrchestrator::new(
            cache.clone(),
            ledger,
            config.refresh_before_deposit,
        ));

        let mut workers = Vec::with_capacity(COMMANDS.len() + 1);
        let mut commands = HashMap::new();
        for name in COMMANDS {
            let handler: Arc<dyn EventHandler<CommandEvent>> = match name {
                "btc" => Arc::new(PriceCommandHandler::new(orchestrator.clone(), Currency::Btc)),
                "eth" => Arc::new(PriceCommandHandler::new(orchestrator.clone(), Currency::Eth)),
                _ => Arc::new(CointipCommandHandler::new(orchestrator.clone())),
            };
            let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
            workers.push(tokio::spawn(run_loop(name, handler, rx, cancel.clone())));
            commands.insert(name, tx);
        }

        let (reactions, rx) = mpsc::channel(QUEUE_DEPTH);
        let handler = Arc::new(ReactionHandler::new(tips));
        workers.push(tokio::spawn(run_loop(
            "reactions",
            handler,
            rx,
            cancel.clone(),
        )));

        let symbols: Vec<&str> = config.denominations.symbols().collect();
        info!(
            plugin = PLUGIN_NAME,
            commands = ?COMMANDS,
            denominations = ?symbols,
            currency = %config.denominations.currency(),
            "plugin registered"
        );
        Ok(Self {
            commands,
            reactions,
            cancel,
            workers,
        })
    }

    pub fn command_names(&self) -> impl Iterator<Item = &'static str> {
        COMMANDS.into_iter()
    }

    /// Queues a command and waits for its reply.
    pub async fn dispatch_command(&self, command: &str, user_key: &str, text: &str) -> Result<Reply> {
        let queue = self
            .commands
            .get(command)
            .ok_or_else(|| TipError::validation(format!("unknown command: {command}")))?;
        let (event, reply) = CommandEvent::new(user_key, text);
        queue
            .send(event)
            .await
            .map_err(|_| TipError::PluginStopped)?;
        reply.await.map_err(|_| TipError::PluginStopped)
    }

    /// Queues a reaction. Tips run in the background; the outcome is only logged.
    pub async fn dispatch_reaction(&self, event: TipEvent) -> Result<()> {
        self.reactions
            .send(event)
            .await
            .map_err(|_| TipError::PluginStopped)
    }

    /// Cancels every loop and waits for in-flight events to finish.
    /// Queued events that have not started are dropped.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        Self::join(self.workers).await;
    }

    /// Closes every queue and waits until the loops have handled what was
    /// already queued.
    pub async fn drain(self) {
        let Self {
            commands,
            reactions,
            workers,
            ..
        } = self;
        drop(commands);
        drop(reactions);
        Self::join(workers).await;
    }

    async fn join(workers: Vec<JoinHandle<()>>) {
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "event loop panicked");
            }
        }
        info!(plugin = PLUGIN_NAME, "plugin stopped");
    }
}
