//! Error types.
//!
//! Every generator error is a definition-time error: the tables are static,
//! reviewed inputs, so a malformed entry aborts the whole run before any text
//! is written.

use crate::addressing::AddressingMode;
use crate::model::{OperandKey, Register};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("{mnemonic}: no template for addressing mode {mode}")]
    MissingTemplate {
        mnemonic: &'static str,
        mode: AddressingMode,
    },
    #[error("{mnemonic}: operand {key} has no location in addressing mode {mode}")]
    UnknownOperand {
        mnemonic: &'static str,
        key: OperandKey,
        mode: AddressingMode,
    },
    #[error("{mnemonic}: register {register} is not a valid target")]
    InvalidRegisterTarget {
        mnemonic: &'static str,
        register: Register,
    },
    #[error("{mnemonic}: operand domain {key} declared more than once")]
    DuplicateDomain {
        mnemonic: &'static str,
        key: OperandKey,
    },
    #[error("opcode ${opcode:02X} declared by both {first} and {second}")]
    DuplicateOpcode {
        opcode: u8,
        first: &'static str,
        second: &'static str,
    },
    #[error("{mnemonic}: addressing mode {mode} has no assertable operand cell")]
    MissingOperandCell {
        mnemonic: &'static str,
        mode: AddressingMode,
    },
    #[error("{mnemonic}: displacement ${displacement:02X} lands inside the branch itself")]
    LandingOverlap {
        mnemonic: &'static str,
        displacement: u8,
    },
    #[error("unknown instruction mnemonic '{0}'")]
    UnknownMnemonic(String),
}

#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("failed to format suite text")]
    Format(#[from] std::fmt::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
