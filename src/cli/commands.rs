use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ledger-client", version)]
pub struct Opt {
    #[arg(long, global = true, help = "TOML file with connection settings")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Service host (overrides config and LEDGER_HOST)")]
    pub host: Option<String>,
    #[arg(long, global = true, help = "Service port (overrides config and LEDGER_PORT)")]
    pub port: Option<u16>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "info", about = "Show service status")]
    Info,
    #[command(name = "leaderboard", about = "Show the leaderboard")]
    Leaderboard {
        #[arg(long, default_value_t = 10, help = "Number of entries to fetch")]
        limit: usize,
    },
    #[command(name = "block", about = "Fetch and decode a block")]
    Block {
        #[arg(help = "Block hash (hex)")]
        hash: String,
    },
    #[command(name = "tx", about = "Fetch and decode a transaction")]
    Tx {
        #[arg(help = "Transaction hash (hex)")]
        hash: String,
    },
    #[command(name = "complexity", about = "Show the current proof-of-work complexity")]
    Complexity,
    #[command(name = "nonce", about = "Solve the current proof-of-work puzzle")]
    Nonce {
        #[arg(long, help = "Seed the solver for reproducible nonces")]
        seed: Option<u64>,
    },
    #[command(name = "render", about = "Build a transaction from JSON and print its encoding")]
    Render {
        #[arg(help = "Path to the structured transaction (JSON)")]
        file: PathBuf,
    },
    #[command(name = "decode", about = "Decode a hex-encoded transaction")]
    Decode {
        #[arg(help = "Transaction hex")]
        hex: String,
    },
    #[command(name = "spend", about = "Build, solve and submit a transaction")]
    Spend {
        #[arg(help = "Path to the structured transaction (JSON)")]
        file: PathBuf,
        #[arg(long, help = "Seed the solver for reproducible nonces")]
        seed: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leaderboard_default_limit() {
        let opt = Opt::parse_from(["ledger-client", "leaderboard"]);
        assert!(matches!(opt.command, Command::Leaderboard { limit: 10 }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let opt = Opt::parse_from(["ledger-client", "nonce", "--seed", "7", "--port", "9000"]);
        assert_eq!(opt.port, Some(9000));
        assert!(matches!(opt.command, Command::Nonce { seed: Some(7) }));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Opt::command().debug_assert();
    }
}
