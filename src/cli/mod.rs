//! Command-line interface
//!
//! Argument parsing for the `ledger-client` binary.

pub mod commands;

pub use commands::{Command, Opt};
