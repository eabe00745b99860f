//! CLI configuration: a TOML file with `[chain]` and `[session]` tables

use crate::error::CliError;
use evmsim_chain::ChainConfig;
use evmsim_debugger::{DebugMode, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Effective configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Genesis and transaction settings
    pub chain: ChainConfig,
    /// Debugging session settings
    pub session: SessionConfig,
}

impl Config {
    /// `~/.evmsim/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".evmsim").join("config.toml"))
    }

    /// Load `path`, else the default file if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        tracing::debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply command-line flags over file values
    pub fn with_overrides(mut self, mode: Option<DebugMode>, step_delay_ms: Option<u64>) -> Self {
        if let Some(mode) = mode {
            self.session.mode = mode;
        }
        if let Some(delay) = step_delay_ms {
            self.session.step_delay_ms = delay;
        }
        self
    }

    /// Serialize as TOML
    pub fn to_toml(&self) -> Result<String, CliError> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.chain.chain_id, 1337);
        assert_eq!(config.session.mode, DebugMode::Step);
        assert_eq!(config.session.step_delay_ms, 500);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        let content = r#"
            [chain]
            chain_id = 5
            master_balance = "1000000000000000000000"

            [session]
            mode = "auto"
            step_delay_ms = 20
        "#;
        file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.chain.chain_id, 5);
        assert_eq!(config.chain.master_balance, 1_000 * evmsim_primitives::ETHER);
        assert_eq!(config.chain.gas_price, 1);
        assert_eq!(config.session.mode, DebugMode::Auto);
        assert_eq!(config.session.step_delay_ms, 20);
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::default().with_overrides(Some(DebugMode::None), Some(5));
        assert_eq!(config.session.mode, DebugMode::None);
        assert_eq!(config.session.step_delay_ms, 5);

        let untouched = Config::default().with_overrides(None, None);
        assert_eq!(untouched, Config::default());
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[chain]"));
        assert!(text.contains("[session]"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_bad_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[session]\nmode = \"sideways\"\n").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().starts_with("Config error"));
    }
}
