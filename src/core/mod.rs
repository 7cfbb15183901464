//! Core ledger data and the pure parts of the submission pipeline
//!
//! Binary codec for transactions and blocks, the script compiler, the
//! transaction builder and the proof-of-work solver. Nothing here does I/O.

pub mod block;
pub mod builder;
pub mod proof_of_work;
pub mod script;
pub mod transaction;

pub use block::{Block, BLOCK_VERSION};
pub use builder::{build_transaction, describe};
pub use proof_of_work::{ProofOfWork, Solver, MAX_COMPLEXITY, NONCE_LEN};
pub use script::{Instruction, Script};
pub use transaction::{TXInput, TXOutput, Transaction, TxHash, TX_VERSION};
