use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Target harness language of the emitted suite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `#[test]` functions against a `TestCpu` harness module
    #[default]
    Rust,
    /// `ep_test` functions against the C test harness
    C,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub dialect: Dialect,
    /// Import path of the Rust harness module
    pub harness: String,
    /// Mnemonics to generate, table order is kept; empty means all
    pub only: Vec<String>,
    /// Generator name written into the provenance comment
    pub provenance: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Rust,
            harness: "crate::harness".to_string(),
            only: Vec::new(),
            provenance: "gen6502".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether `mnemonic` passes the `only` filter.
    pub fn selects(&self, mnemonic: &str) -> bool {
        self.only.is_empty() || self.only.iter().any(|m| m.eq_ignore_ascii_case(mnemonic))
    }
}
