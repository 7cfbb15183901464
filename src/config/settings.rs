use crate::error::{ClientError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

static DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8007;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const HOST_KEY: &str = "LEDGER_HOST";
const PORT_KEY: &str = "LEDGER_PORT";
const TIMEOUT_KEY: &str = "LEDGER_TIMEOUT";
const TLS_KEY: &str = "LEDGER_TLS";

/// Where the service lives and how long to wait for it. Owned by each client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
    pub tls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tls: false,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `LEDGER_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_KEY) {
            self.host = host;
        }
        if let Some(port) = lookup(PORT_KEY) {
            self.port = port
                .parse()
                .map_err(|_| ClientError::Config(format!("{PORT_KEY}={port:?} is not a port")))?;
        }
        if let Some(timeout) = lookup(TIMEOUT_KEY) {
            self.timeout_secs = timeout.parse().map_err(|_| {
                ClientError::Config(format!("{TIMEOUT_KEY}={timeout:?} is not a number of seconds"))
            })?;
        }
        if let Some(tls) = lookup(TLS_KEY) {
            self.tls = match tls.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ClientError::Config(format!(
                        "{TLS_KEY}={tls:?} is not a boolean"
                    )))
                }
            };
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
