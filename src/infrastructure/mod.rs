//! Ledger adapters.

pub mod coinbase;
pub mod in_memory;
