//! CLI argument parsing

use clap::{Args, Parser, Subcommand, ValueEnum};
use evmsim_debugger::DebugMode;
use std::path::PathBuf;

/// Step-by-step EVM simulator and debugger
#[derive(Parser, Debug)]
#[command(name = "evmsim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file with [chain] and [session] tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug mode for creations and calls
    #[arg(long, global = true, value_enum)]
    pub mode: Option<ModeArg>,

    /// Pause between opcodes in auto mode, in milliseconds
    #[arg(long, global = true)]
    pub delay: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Debug mode as typed on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Run without showing steps
    None,
    /// Wait for a keypress before every opcode
    Step,
    /// Advance after a fixed delay
    Auto,
}

impl From<ModeArg> for DebugMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::None => DebugMode::None,
            ModeArg::Step => DebugMode::Step,
            ModeArg::Auto => DebugMode::Auto,
        }
    }
}

/// CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deploy init code, then optionally call the new contract
    Deploy {
        /// Init code as hex, or @path to a file holding hex
        code: String,
        /// Endowment in wei
        #[arg(long, default_value = "0")]
        value: String,
        #[command(flatten)]
        call: CallArgs,
    },
    /// Install runtime code directly and call it
    Exec {
        /// Runtime code as hex, or @path to a file holding hex
        code: String,
        /// Install at this address instead of a fresh one
        #[arg(long)]
        address: Option<String>,
        #[command(flatten)]
        call: CallArgs,
    },
    /// Send wei from the master account
    Send {
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Amount in wei
        #[arg(long)]
        value: String,
    },
    /// Print the instructions of bytecode
    Disasm {
        /// Bytecode as hex, or @path to a file holding hex
        code: String,
    },
    /// Show the effective configuration
    Config,
}

/// Function call options
#[derive(Args, Debug, Clone, Default)]
pub struct CallArgs {
    /// Function signature, e.g. "setNumber(uint256)"; rawdata(any) sends raw hex
    #[arg(long)]
    pub call: Option<String>,
    /// Call argument as TYPE=VALUE, repeatable
    #[arg(long = "arg", value_name = "TYPE=VALUE")]
    pub args: Vec<String>,
    /// Value sent with the call, in wei
    #[arg(long, default_value = "0")]
    pub call_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["evmsim", "disasm", "0x00"]);
        assert!(cli.config.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json);
        assert!(cli.mode.is_none());
        assert!(cli.delay.is_none());
        assert!(matches!(cli.command, Commands::Disasm { code } if code == "0x00"));
    }

    #[test]
    fn test_cli_deploy_with_call() {
        let cli = Cli::parse_from([
            "evmsim",
            "--mode", "auto",
            "--delay", "10",
            "deploy", "0x6000",
            "--value", "5",
            "--call", "setNumber(uint256)",
            "--arg", "uint256=7",
            "--arg", "bool=true",
        ]);
        assert_eq!(cli.mode.map(DebugMode::from), Some(DebugMode::Auto));
        assert_eq!(cli.delay, Some(10));
        match cli.command {
            Commands::Deploy { code, value, call } => {
                assert_eq!(code, "0x6000");
                assert_eq!(value, "5");
                assert_eq!(call.call.as_deref(), Some("setNumber(uint256)"));
                assert_eq!(call.args, vec!["uint256=7", "bool=true"]);
                assert_eq!(call.call_value, "0");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "evmsim", "send", "--to", "0x01", "--value", "100", "--json", "--config", "/tmp/evmsim.toml",
        ]);
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/evmsim.toml")));
        assert!(matches!(cli.command, Commands::Send { .. }));
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["evmsim", "--mode", "sideways", "config"]).is_err());
    }
}
