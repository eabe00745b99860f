//! Command execution

use crate::cli::{CallArgs, Commands};
use crate::config::Config;
use crate::error::CliError;
use crate::observer::Observer;
use crate::output::Output;
use anyhow::{anyhow, bail, Result};
use evmsim_chain::{AbiArg, EvmHandler, RAW_DATA_SIGNATURE};
use evmsim_debugger::{Debugger, EventStream, Job, JobOutput};
use evmsim_evm::disassemble;
use evmsim_primitives::{bytes_to_hex, decode_hex, parse_u128, Address};

/// Run one command to completion
pub async fn execute(command: Commands, config: &Config, json: bool) -> Result<()> {
    match command {
        Commands::Deploy { code, value, call } => deploy(config, &code, &value, &call, json).await,
        Commands::Exec { code, address, call } => exec(config, &code, address.as_deref(), &call, json).await,
        Commands::Send { to, value } => send(config, &to, &value, json).await,
        Commands::Disasm { code } => disasm(&code, json),
        Commands::Config => show_config(config, json),
    }
}

/// A chain on its worker thread plus the terminal following it
struct Session {
    debugger: Debugger,
    events: EventStream,
    observer: Observer,
}

impl Session {
    fn start(config: &Config, json: bool) -> Result<Self> {
        let handler = EvmHandler::new(config.chain.clone())?;
        let (debugger, handle, events) = Debugger::spawn(handler, config.session.clone())?;
        Ok(Self {
            debugger,
            events,
            observer: Observer::new(handle, config.session.mode, json),
        })
    }

    async fn run(&mut self, job: Job) -> Result<JobOutput> {
        tracing::debug!("Submitting {}", job.name());
        let ticket = self.debugger.submit(job)?;
        self.observer.follow(&mut self.events, ticket).await
    }

    fn finish(self) -> Result<()> {
        self.debugger.shutdown()?;
        Ok(())
    }
}

async fn deploy(config: &Config, code: &str, value: &str, call: &CallArgs, json: bool) -> Result<()> {
    let init_code = parse_code(code)?;
    let value = parse_amount(value)?;

    let mut session = Session::start(config, json)?;
    let created = session.run(Job::CreateContract { init_code, value }).await?;
    let address = match created {
        JobOutput::Created(Some(address)) => address,
        JobOutput::Created(None) => bail!("contract creation failed"),
        other => bail!("unexpected worker output {:?}", other),
    };

    let mut output = Output::new(json)
        .field("address", &address.to_hex())
        .message(&format!("Deployed at {}", address));
    if let Some(signature) = &call.call {
        output = call_and_report(&mut session, address, signature, call, output).await?;
    }
    output = block_number(&mut session, output).await?;
    session.finish()?;
    output.print();
    Ok(())
}

async fn exec(config: &Config, code: &str, address: Option<&str>, call: &CallArgs, json: bool) -> Result<()> {
    let code = parse_code(code)?;
    let address = address.map(parse_address).transpose()?;

    let mut session = Session::start(config, json)?;
    let installed = match session.run(Job::SetCode { code, address }).await? {
        JobOutput::Address(address) => address,
        other => bail!("unexpected worker output {:?}", other),
    };

    let signature = call.call.as_deref().unwrap_or(RAW_DATA_SIGNATURE);
    let output = Output::new(json)
        .field("address", &installed.to_hex())
        .message(&format!("Code installed at {}", installed));
    let output = call_and_report(&mut session, installed, signature, call, output).await?;
    let output = block_number(&mut session, output).await?;
    session.finish()?;
    output.print();
    Ok(())
}

async fn send(config: &Config, to: &str, value: &str, json: bool) -> Result<()> {
    let to = parse_address(to)?;
    let value = parse_amount(value)?;

    let mut session = Session::start(config, json)?;
    session.run(Job::SendWei { to, value }).await?;
    let balance = match session.run(Job::GetBalance(to)).await? {
        JobOutput::Balance(balance) => balance,
        other => bail!("unexpected worker output {:?}", other),
    };
    let output = Output::new(json)
        .field("to", &to.to_hex())
        .field_u128("balance", balance)
        .message(&format!("Sent {} wei to {}, balance now {} wei", value, to, balance));
    let output = block_number(&mut session, output).await?;
    session.finish()?;
    output.print();
    Ok(())
}

/// Call `address` and add the outcome to `output`
async fn call_and_report(
    session: &mut Session,
    address: Address,
    signature: &str,
    call: &CallArgs,
    output: Output,
) -> Result<Output> {
    let mut args = call.args.iter().map(String::as_str).map(parse_arg).collect::<Result<Vec<_>, _>>()?;
    if signature == RAW_DATA_SIGNATURE && args.is_empty() {
        args.push(AbiArg::new("any", "0x"));
    }
    let job = Job::CallFunction {
        to: address,
        signature: signature.to_string(),
        args,
        value: parse_amount(&call.call_value)?,
    };
    match session.run(job).await? {
        JobOutput::Called { receipt, result, .. } => {
            let text = format!(
                "Call {}: status {}, gas used {}, output {}",
                signature,
                result.status,
                receipt.gas_used,
                bytes_to_hex(&result.output)
            );
            Ok(output
                .field("output", &bytes_to_hex(&result.output))
                .field("status", &result.status.to_string())
                .field_u64("gas_used", receipt.gas_used)
                .field_bool("success", receipt.is_success())
                .message(&text))
        }
        other => Err(anyhow!("unexpected worker output {:?}", other)),
    }
}

async fn block_number(session: &mut Session, output: Output) -> Result<Output> {
    match session.run(Job::GetBlockNumber).await? {
        JobOutput::BlockNumber(number) => Ok(output.field_u64("block_number", number)),
        other => bail!("unexpected worker output {:?}", other),
    }
}

fn disasm(code: &str, json: bool) -> Result<()> {
    let code = parse_code(code)?;
    let instructions = disassemble(&code);
    let rows: Vec<String> = instructions.iter().map(ToString::to_string).collect();
    Output::new(json)
        .field_u64("length", code.len() as u64)
        .field_value("instructions", serde_json::json!(rows))
        .message(&rows.join("\n"))
        .print();
    Ok(())
}

fn show_config(config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}

/// Hex code, or `@path` to a file holding hex
pub fn parse_code(input: &str) -> Result<Vec<u8>, CliError> {
    let text = match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => input.to_string(),
    };
    decode_hex(text.trim()).map_err(|_| CliError::InvalidHex(input.to_string()))
}

pub fn parse_address(input: &str) -> Result<Address, CliError> {
    Address::from_hex(input).map_err(|_| CliError::InvalidAddress(input.to_string()))
}

/// Decimal or 0x-prefixed wei amount
pub fn parse_amount(input: &str) -> Result<u128, CliError> {
    parse_u128(input).map_err(|_| CliError::InvalidAmount(input.to_string()))
}

/// `uint256=7` into an argument
pub fn parse_arg(input: &str) -> Result<AbiArg, CliError> {
    match input.split_once('=') {
        Some((kind, value)) if !kind.trim().is_empty() => Ok(AbiArg::new(kind.trim(), value)),
        _ => Err(CliError::InvalidArgument(input.to_string())),
    }
}
