//! Configuration management
//!
//! Connection settings for a single client instance: host, port, timeout
//! and scheme. Loaded from defaults, an optional TOML file and the
//! environment.

pub mod settings;

pub use settings::Config;
