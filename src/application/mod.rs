//! Application layer: account resolution and tip/command orchestration.
//!
//! `CointipPlugin` is the entry point. It owns an `AccountCache` shared by the
//! orchestrators and runs one `tokio` task per inbound event source, each
//! draining its own channel in order.

pub mod cache;
pub mod command;
pub mod dispatch;
pub mod plugin;
pub mod priming;
pub mod tip;
