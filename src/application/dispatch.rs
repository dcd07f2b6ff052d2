//! Long-lived loops that drain one inbound event source each.
//!
//! A loop handles its events strictly in arrival order and only stops when
//! the cancellation token fires or the sending side goes away. Cancellation is
//! cooperative: an event already being handled runs to completion.

use super::command::CommandOrchestrator;
use super::tip::TipOrchestrator;
use crate::domain::event::{CommandEvent, TipEvent};
use crate::domain::money::Currency;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Consumes one event. Failures are handled inside; a handler never stops its loop.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    async fn handle(&self, event: E);
}

pub async fn run_loop<E, H>(
    name: &'static str,
    handler: Arc<H>,
    mut events: mpsc::Receiver<E>,
    cancel: CancellationToken,
) where
    E: Send + 'static,
    H: EventHandler<E> + ?Sized,
{
    info!(source = name, "event loop started");
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(source = name, "stopping event loop");
                return;
            }
            event = events.recv() => event,
        };
        match event {
            Some(event) => handler.handle(event).await,
            None => {
                info!(source = name, "event source closed");
                return;
            }
        }
    }
}

/// Reaction hook: one tip per event.
pub struct ReactionHandler {
    tips: Arc<TipOrchestrator>,
}

impl ReactionHandler {
    pub fn new(tips: Arc<TipOrchestrator>) -> Self {
        Self { tips }
    }
}

#[async_trait]
impl EventHandler<TipEvent> for ReactionHandler {
    async fn handle(&self, event: TipEvent) {
        if let Err(e) = self.tips.handle_tip(&event).await {
            error!(
                error = %e,
                from = %event.actor_key,
                to = %event.target_key,
                symbol = %event.symbol,
                "tip failed"
            );
        }
    }
}

/// The `/cointip` command.
pub struct CointipCommandHandler {
    commands: Arc<CommandOrchestrator>,
}

impl CointipCommandHandler {
    pub fn new(commands: Arc<CommandOrchestrator>) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl EventHandler<CommandEvent> for CointipCommandHandler {
    async fn handle(&self, event: CommandEvent) {
        let reply = self
            .commands
            .handle_command(&event.user_key, &event.text)
            .await;
        if event.reply.send(reply).is_err() {
            debug!(user = %event.user_key, "reply receiver dropped");
        }
    }
}

/// A spot price command such as `/btc`.
pub struct PriceCommandHandler {
    commands: Arc<CommandOrchestrator>,
    base: Currency,
}

impl PriceCommandHandler {
    pub fn new(commands: Arc<CommandOrchestrator>, base: Currency) -> Self {
        Self { commands, base }
    }
}

#[async_trait]
impl EventHandler<CommandEvent> for PriceCommandHandler {
    async fn handle(&self, event: CommandEvent) {
        let reply = self.commands.handle_price(self.base).await;
        if event.reply.send(reply).is_err() {
            debug!(user = %event.user_key, "reply receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl EventHandler<u32> for Recorder {
        async fn handle(&self, event: u32) {
            // Later events finish faster; order must still hold.
            tokio::time::sleep(Duration::from_millis(u64::from(10 - event % 10))).await;
            self.seen.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_events_processed_in_order() {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop("test", recorder.clone(), rx, cancel.clone()));

        for i in 0..20 {
            tx.send(i).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    struct Slow {
        started: Mutex<Vec<u32>>,
        finished: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl EventHandler<u32> for Slow {
        async fn handle(&self, event: u32) {
            self.started.lock().unwrap().push(event);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.finished.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_cancel_lets_current_event_finish() {
        let slow = Arc::new(Slow {
            started: Mutex::default(),
            finished: Mutex::default(),
        });
        let (tx, rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop("test", slow.clone(), rx, cancel.clone()));

        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(*slow.started.lock().unwrap(), vec![1]);
        assert_eq!(*slow.finished.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_loop_stops_on_cancel() {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop("test", recorder.clone(), rx, cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop after cancellation")
            .unwrap();
        // Sender is still alive; the loop exited on the token alone.
        assert!(tx.send(1).await.is_err());
    }
}
