use tokio::sync::oneshot;

/// A reaction placed by `actor_key` on an item posted by `target_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipEvent {
    pub actor_key: String,
    pub target_key: String,
    pub symbol: String,
}

impl TipEvent {
    pub fn new(
        actor_key: impl Into<String>,
        target_key: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            actor_key: actor_key.into(),
            target_key: target_key.into(),
            symbol: symbol.into(),
        }
    }

    pub fn is_self_tip(&self) -> bool {
        self.actor_key == self.target_key
    }
}

/// Outbound reply text. `in_channel` replies are visible to everyone,
/// the rest only to the user who issued the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub in_channel: bool,
}

impl Reply {
    pub fn private(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            in_channel: false,
        }
    }

    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            in_channel: true,
        }
    }
}

/// A command line typed by `user_key`. Consumed once; the handler answers
/// through `reply`.
#[derive(Debug)]
pub struct CommandEvent {
    pub user_key: String,
    pub text: String,
    pub reply: oneshot::Sender<Reply>,
}

impl CommandEvent {
    pub fn new(
        user_key: impl Into<String>,
        text: impl Into<String>,
    ) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        let event = Self {
            user_key: user_key.into(),
            text: text.into(),
            reply: tx,
        };
        (event, rx)
    }
}
