//! Error handling for the ledger client
//!
//! Every failure a caller can observe is one of these variants. None of them
//! are retried inside the crate.

use std::fmt;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error kinds surfaced by the codec, builder, solver and client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection or socket failure reported by the transport
    Transport(String),
    /// Malformed JSON body or malformed binary entity
    Decode(String),
    /// Service-reported `error` field
    Application(String),
    /// HTTP status outside the success range
    Status(u16),
    /// Malformed structured transaction input
    Validation { field: String, reason: String },
    /// Malformed script token; `field` is the script's path in the input
    Compile {
        field: String,
        position: usize,
        token: String,
        reason: String,
    },
    /// Proof-of-work solver failure
    Solver(String),
    /// Solver stopped through its cancel flag
    Cancelled { attempts: u64 },
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl ClientError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ClientError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        ClientError::Decode(msg.into())
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(msg) => write!(f, "Transport error: {msg}"),
            ClientError::Decode(msg) => write!(f, "Decode error: {msg}"),
            ClientError::Application(msg) => write!(f, "Service error: {msg}"),
            ClientError::Status(code) => write!(f, "Unexpected HTTP status: {code}"),
            ClientError::Validation { field, reason } => {
                write!(f, "Invalid field `{field}`: {reason}")
            }
            ClientError::Compile {
                field,
                position,
                token,
                reason,
            } => write!(
                f,
                "Script compile error in `{field}` at token {position} ({token:?}): {reason}"
            ),
            ClientError::Solver(msg) => write!(f, "Proof-of-work error: {msg}"),
            ClientError::Cancelled { attempts } => {
                write!(f, "Proof-of-work cancelled after {attempts} attempts")
            }
            ClientError::Config(msg) => write!(f, "Configuration error: {msg}"),
            ClientError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(format!("Invalid JSON: {err}"))
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
