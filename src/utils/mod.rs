//! Utility functions and helpers
//!
//! Hashing and the low-level readers/writers the binary codec is built from.

pub mod crypto;
pub mod serialization;

pub use crypto::{sha256_digest, HASH_LEN};
pub use serialization::{WireReader, WireWriter};
