//! # Ledger Client
//!
//! Client for a remote ledger service. It fetches blocks, transactions and
//! leaderboard data over HTTP, and submits transactions gated by a
//! proof-of-work challenge.
//!
//! ## Layout
//! - `core/`: binary codec, script compiler, transaction builder, solver
//! - `network/`: HTTP transport and the request/response flows on top of it
//! - `config/`: connection settings from defaults, TOML and environment
//! - `utils/`: hashing and wire-format primitives
//! - `cli/`: command-line interface
//!
//! ## Submitting a transaction
//! 1. `build_transaction` turns structured JSON into a `Transaction`
//! 2. `Transaction::render` / `hash` give its wire bytes and identity
//! 3. `Client::get_nonce` fetches the complexity and solves the puzzle
//! 4. `Client::spend_tx` posts it under its own hash

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod utils;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    build_transaction, describe, Block, Instruction, ProofOfWork, Script, Solver, TXInput,
    TXOutput, Transaction, TxHash, TX_VERSION,
};
pub use error::{ClientError, Result};
pub use network::{
    parse_pow_token, Client, HttpRequest, HttpResponse, HttpTransport, Info, LeaderboardEntry,
    Method, Reply, Transport,
};
pub use utils::{sha256_digest, HASH_LEN};
