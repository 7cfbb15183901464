// Entry point for the ledger-client CLI
use clap::Parser;
use ledger_client::{
    build_transaction, describe, Client, Command, Config, HttpTransport, Opt, ProofOfWork,
    Transaction, TxHash,
};
use log::{error, LevelFilter};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;

fn main() {
    // RUST_LOG still overrides the default level
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(opt: &Opt) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load(opt.config.as_deref())?;
    if let Some(host) = &opt.host {
        config.host = host.clone();
    }
    if let Some(port) = opt.port {
        config.port = port;
    }
    Ok(config)
}

fn connect(config: &Config, seed: Option<u64>) -> Result<Client, Box<dyn std::error::Error>> {
    match seed {
        Some(seed) => Ok(Client::with_parts(
            Arc::new(HttpTransport::new(config)?),
            Arc::new(ProofOfWork::with_seed(seed)),
        )),
        None => Ok(Client::new(config)?),
    }
}

fn read_transaction(path: &Path) -> Result<Transaction, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    let raw: Value = serde_json::from_str(&text)?;
    Ok(build_transaction(&raw)?)
}

fn print_transaction(tx: &Transaction) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = describe(tx);
    view["hash"] = json!(tx.hash().to_hex());
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    match &opt.command {
        // Offline commands never touch the network or the config
        Command::Render { file } => {
            let tx = read_transaction(file)?;
            println!("hash: {}", tx.hash());
            println!("hex:  {}", tx.to_hex());
            return Ok(());
        }
        Command::Decode { hex } => {
            let tx = Transaction::from_hex(hex.trim())?;
            return print_transaction(&tx);
        }
        _ => {}
    }

    let config = load_config(&opt)?;
    match opt.command {
        Command::Info => {
            let info = connect(&config, None)?.get_info()?;
            if let Some(complexity) = info.complexity {
                println!("complexity: {complexity}");
            }
            for (key, value) in &info.extra {
                println!("{key}: {value}");
            }
        }
        Command::Leaderboard { limit } => {
            for entry in connect(&config, None)?.get_leaderboard(limit)? {
                println!("#{} {}", entry.rank, Value::Object(entry.fields));
            }
        }
        Command::Block { hash } => {
            let hash: TxHash = hash.parse()?;
            let block = connect(&config, None)?.get_block(&hash)?;
            println!("Block hash:   {}", block.hash());
            println!("Parent:       {}", block.get_parent());
            println!("Timestamp:    {}", block.get_timestamp());
            for tx in block.get_transactions() {
                println!("- Transaction {}", tx.hash());
                for input in tx.get_inputs() {
                    println!(
                        "-- Input hash = {}, index = {}, script = {}",
                        input.get_hash(),
                        input.get_index(),
                        input.get_script()
                    );
                }
                for output in tx.get_outputs() {
                    println!(
                        "-- Output value = {}, script = {}",
                        output.get_value(),
                        output.get_script()
                    );
                }
            }
        }
        Command::Tx { hash } => {
            let hash: TxHash = hash.parse()?;
            let tx = connect(&config, None)?.get_tx(&hash)?;
            print_transaction(&tx)?;
        }
        Command::Complexity => {
            println!("{}", connect(&config, None)?.get_complexity()?);
        }
        Command::Nonce { seed } => {
            println!("{}", connect(&config, seed)?.get_nonce()?);
        }
        Command::Spend { file, seed } => {
            let tx = read_transaction(&file)?;
            let tx = connect(&config, seed)?.submit(tx)?;
            println!("Submitted {}", tx.hash());
        }
        Command::Render { .. } | Command::Decode { .. } => {}
    }
    Ok(())
}
