//! Declarative 6502 instruction test-suite generator.
//!
//! The instruction table ([`instructions`]) and the addressing-mode template
//! catalog ([`addressing`]) are static data. [`generate_suite`] validates
//! them, expands every instruction's operand domains, evaluates the expected
//! machine state and renders one self-contained test per
//! case × mode × template variant.

pub mod addressing;
pub mod config;
pub mod emitter;
pub mod error;
pub mod expander;
pub mod instructions;
pub mod logging;
pub mod model;
pub mod semantics;
pub mod synth;

use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::error::{DefinitionError, GenerateError};
use crate::instructions::{table, Instruction};
use crate::logging::{log, LogCategory, LogLevel};
use crate::synth::{Synthesizer, TestUnit};

/// Instructions picked by `config.only`, in table order.
pub fn select(config: &GeneratorConfig) -> Result<Vec<&'static Instruction>, DefinitionError> {
    if let Some(unknown) = config
        .only
        .iter()
        .find(|name| instructions::find(name).is_none())
    {
        return Err(DefinitionError::UnknownMnemonic(unknown.clone()));
    }
    Ok(table()
        .iter()
        .filter(|instr| config.selects(instr.mnemonic))
        .collect())
}

/// Validate the whole table, then synthesize every selected unit.
pub fn synthesize(config: &GeneratorConfig) -> Result<Vec<TestUnit>, DefinitionError> {
    synth::validate(table())?;
    let selected = select(config)?;
    log(LogCategory::Table, LogLevel::Info, || {
        format!("{} of {} instructions selected", selected.len(), table().len())
    });

    let mut synthesizer = Synthesizer::new();
    let mut units = Vec::new();
    for instr in selected {
        units.extend(synthesizer.instruction(instr)?);
    }
    Ok(units)
}

/// Generate the complete suite text. Nothing is returned unless every unit
/// was synthesized and rendered.
pub fn generate_suite(config: &GeneratorConfig) -> Result<String, GenerateError> {
    let units = synthesize(config)?;
    emitter::render(&units, config)
}

/// Per-instruction overview printed by `gen6502 --summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionSummary {
    pub mnemonic: &'static str,
    pub modes: Vec<&'static str>,
    pub tests: usize,
}

pub fn summarize(config: &GeneratorConfig) -> Result<Vec<InstructionSummary>, DefinitionError> {
    synth::validate(table())?;
    Ok(select(config)?
        .into_iter()
        .map(|instr| InstructionSummary {
            mnemonic: instr.mnemonic,
            modes: instr.modes.iter().map(|e| e.mode.id()).collect(),
            tests: synth::unit_count(instr),
        })
        .collect())
}
