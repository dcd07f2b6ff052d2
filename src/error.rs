use crate::domain::account::Account;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TipError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("ledger unavailable during {operation}: {source}")]
    LedgerUnavailable {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("ledger rejected {operation}: unexpected status code {status}")]
    LedgerRejected { operation: &'static str, status: u16 },
    #[error("malformed ledger payload for {operation}: {source}")]
    MalformedPayload {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The account was created and primed, but the post-priming refresh failed.
    /// `account` is the record as it was before priming.
    #[error("account {} was primed but could not be refreshed: {source}", .account.id)]
    StaleAfterPriming {
        account: Box<Account>,
        #[source]
        source: Box<TipError>,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("plugin is not running")]
    PluginStopped,
}

impl TipError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for failures that originated in the ledger service or its transport.
    pub fn is_ledger_failure(&self) -> bool {
        matches!(
            self,
            Self::LedgerUnavailable { .. }
                | Self::LedgerRejected { .. }
                | Self::MalformedPayload { .. }
                | Self::StaleAfterPriming { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TipError>;
