//! CLI integration tests for evmsim
//!
//! Runs the binary with an isolated home directory so no user config is read.

use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const STORE_RUNTIME: &str = "0x600960045500";
const DEPLOY_STORE: &str = "0x61000661000f6000396100066000f3600960045500";
const RETURN_42: &str = "0x602a60005260206000f3";

fn evmsim(home: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_evmsim"));
    command.env("HOME", home.path()).env_remove("RUST_LOG");
    command
}

/// Helper to run the CLI with arguments and no input
fn run_evmsim(args: &[&str]) -> Output {
    let home = TempDir::new().unwrap();
    evmsim(&home)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute command")
}

/// Helper to run the CLI feeding `input` to the step prompt
fn run_with_input(args: &[&str], input: &str) -> Output {
    let home = TempDir::new().unwrap();
    let mut child = evmsim(&home)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn command");
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    child.wait_with_output().expect("Failed to wait for command")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ==================== Help & Version Tests ====================

#[test]
fn test_cli_help() {
    let output = run_evmsim(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["deploy", "exec", "send", "disasm", "config"] {
        assert!(stdout.contains(command), "help lists {}", command);
    }
}

#[test]
fn test_cli_version() {
    let output = run_evmsim(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("evmsim"));
}

// ==================== Disassembly Tests ====================

#[test]
fn test_disasm() {
    let output = run_evmsim(&["disasm", "0x6009600455"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PUSH1 0x09"));
    assert!(stdout.contains("SSTORE"));
}

#[test]
fn test_disasm_json() {
    let output = run_evmsim(&["--json", "disasm", STORE_RUNTIME]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["length"], 6);
    assert_eq!(json["instructions"].as_array().unwrap().len(), 4);
}

#[test]
fn test_disasm_invalid_hex() {
    let output = run_evmsim(&["disasm", "0xzz"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid hex"));
}

// ==================== Transfer Tests ====================

#[test]
fn test_send_json() {
    let to = "0x1111111111111111111111111111111111111111";
    let output = run_evmsim(&["send", "--to", to, "--value", "1000", "--json"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["to"], to);
    assert_eq!(json["balance"], "1000");
    assert!(json["block_number"].as_u64().is_some());
}

#[test]
fn test_send_invalid_address_json() {
    let output = run_evmsim(&["--json", "send", "--to", "0x12", "--value", "1"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Invalid address"));
    assert!(stdout.contains("\"success\":false"));
}

// ==================== Execution Tests ====================

#[test]
fn test_deploy_silent_json() {
    let output = run_evmsim(&[
        "deploy", DEPLOY_STORE, "--call", "rawdata(any)", "--mode", "none", "--json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    let address = json["address"].as_str().unwrap();
    assert_eq!(address.len(), 42);
    assert!(address.starts_with("0x"));
    assert_eq!(json["success"], true);
}

#[test]
fn test_exec_returns_output() {
    let output = run_evmsim(&["exec", RETURN_42, "--mode", "none", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    let returned = json["output"].as_str().unwrap();
    assert_eq!(returned.len(), 66);
    assert!(returned.ends_with("2a"));
    assert_eq!(json["status"], "success");
}

#[test]
fn test_exec_step_mode_runs_to_end_on_eof() {
    let output = run_evmsim(&["exec", STORE_RUNTIME, "--mode", "step"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PUSH1"));
    assert!(stdout.contains("storage[0] 0x04 = 0x09"));
    assert!(stdout.contains("Execution completed"));
}

#[test]
fn test_exec_step_mode_quit_aborts() {
    let output = run_with_input(&["exec", STORE_RUNTIME, "--mode", "step"], "q\n");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Execution aborted"));
    assert!(!stdout.contains("Execution completed"));
    assert!(stdout.contains("status aborted"));
}

#[test]
fn test_exec_auto_mode() {
    let output = run_evmsim(&["exec", RETURN_42, "--mode", "auto", "--delay", "1"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[0x0000] PUSH1"));
    assert!(stdout.contains("RETURN"));
    assert!(stdout.contains("Execution completed"));
}

// ==================== Config Tests ====================

#[test]
fn test_config_file_and_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("evmsim.toml");
    std::fs::write(&path, "[session]\nmode = \"auto\"\nstep_delay_ms = 20\n").unwrap();
    let path = path.to_str().unwrap();

    let output = run_evmsim(&["--config", path, "config"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mode = \"auto\""));
    assert!(stdout.contains("step_delay_ms = 20"));

    let output = run_evmsim(&["--config", path, "--delay", "3", "--json", "config"]);
    let json = stdout_json(&output);
    assert_eq!(json["session"]["mode"], "auto");
    assert_eq!(json["session"]["step_delay_ms"], 3);
}

#[test]
fn test_config_missing_file() {
    let output = run_evmsim(&["--config", "/nonexistent/evmsim.toml", "config"]);
    assert!(!output.status.success());
}
