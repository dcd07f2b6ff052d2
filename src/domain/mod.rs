//! Domain types shared by the cache, the orchestrators and the ledger adapters.

pub mod account;
pub mod denomination;
pub mod event;
pub mod money;
pub mod ports;
pub mod transaction;
