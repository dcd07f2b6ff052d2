//! Outer surfaces: the command line and the console chat host.

pub mod cli;
pub mod console;
