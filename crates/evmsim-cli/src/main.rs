//! # evmsim
//!
//! Step-by-step EVM simulator on a private in-memory chain.
//!
//! ## Usage
//!
//! ```bash
//! # Deploy init code and step through the constructor
//! evmsim deploy 0x6009600455 --mode step
//!
//! # Deploy, then call a function on the new contract
//! evmsim deploy @Counter.hex --call "setNumber(uint256)" --arg uint256=7
//!
//! # Install runtime code and replay it with a pause between opcodes
//! evmsim exec 0x602a60005260206000f3 --mode auto --delay 200
//!
//! # Transfer wei from the master account
//! evmsim send --to 0x1111111111111111111111111111111111111111 --value 1000
//!
//! # Disassemble
//! evmsim disasm 0x6009600455
//! ```
//!
//! At the `step>` prompt: enter runs one opcode, a number runs that many,
//! `c` runs to the end and `q` aborts the transaction.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;
mod error;
mod observer;
mod output;

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let json = cli.json;
    if let Err(e) = run(cli).await {
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "error": format!("{:#}", e),
                    "success": false
                })
            );
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.mode.map(Into::into), cli.delay);
    tracing::debug!(mode = ?config.session.mode, "Effective configuration loaded");
    commands::execute(cli.command, &config, cli.json).await
}
