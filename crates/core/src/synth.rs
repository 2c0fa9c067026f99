//! Test synthesizer.
//!
//! Combines one test case, one addressing mode and one template variant with
//! the evaluated expected state into a dialect-neutral [`TestUnit`]. Table
//! validation lives here too since it checks exactly what synthesis relies on.

use std::collections::HashMap;

use crate::addressing::{AddressingMode, CodeTemplate, OperandCell, Segment, SCRATCH_FILL};
use crate::error::DefinitionError;
use crate::expander::{case_count, expand, TestCase};
use crate::instructions::{Instruction, ModeEntry};
use crate::logging::{log, LogCategory, LogLevel};
use crate::model::{ExpectedState, InputState, OperandKey, Register, STACK_PAGE};
use crate::semantics::evaluate;

/// One fixture setup action, applied in order after the memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setup {
    /// Start execution here instead of at the reset vector.
    Origin(u16),
    Register(Register, u8),
    Status(u8),
    Flag { bit: u8, set: bool },
    Store(u16, u8),
}

/// One post-execution assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Register(Register, u8),
    Memory(u16, u8),
    /// Byte at `0x0100 | (final sp + 1)`.
    Stack(u8),
    /// Address of the halt marker execution stopped on.
    Pc(u16),
    /// Bits inside `mask` must equal `value`; every other bit must be
    /// unchanged from the pre-execution snapshot.
    Flags { mask: u8, value: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnit {
    pub name: String,
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub opcode: u8,
    pub segments: Vec<Segment>,
    pub setup: Vec<Setup>,
    pub cycles: u32,
    pub checks: Vec<Check>,
}

/// Synthesizes units for one suite, keeping test names unique.
#[derive(Debug, Default)]
pub struct Synthesizer {
    names: HashMap<String, usize>,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unit for `instr`: modes, then cases, then template variants.
    pub fn instruction(&mut self, instr: &Instruction) -> Result<Vec<TestUnit>, DefinitionError> {
        let cases = expand(instr.domains);
        let mut units = Vec::new();
        for entry in instr.modes {
            for case in &cases {
                let value = template_value(case);
                let templates = instr
                    .templates
                    .templates(entry.mode, entry.opcode, value)
                    .ok_or(DefinitionError::MissingTemplate {
                        mnemonic: instr.mnemonic,
                        mode: entry.mode,
                    })?;
                for template in &templates {
                    units.push(self.unit(instr, entry, case, template)?);
                }
            }
        }
        log(LogCategory::Synth, LogLevel::Debug, || {
            format!("{}: {} units", instr.mnemonic, units.len())
        });
        Ok(units)
    }

    fn unit(
        &mut self,
        instr: &Instruction,
        entry: &ModeEntry,
        case: &TestCase,
        template: &CodeTemplate,
    ) -> Result<TestUnit, DefinitionError> {
        if let Some(target) = template.target {
            if template.overlaps_instruction(target) {
                return Err(DefinitionError::LandingOverlap {
                    mnemonic: instr.mnemonic,
                    displacement: template_value(case),
                });
            }
        }

        let (input, setup) = input_state(instr, entry.mode, case, template)?;
        let expected = evaluate(instr.op, &input);
        let checks = checks(instr, entry.mode, template, &input, &expected)?;
        let stall = instr.page_stall && template.crosses_page;
        let cycles = expected.cycles.unwrap_or(entry.cycles + stall as u32);

        Ok(TestUnit {
            name: self.unique_name(base_name(instr, entry.mode, case, template)),
            mnemonic: instr.mnemonic,
            mode: entry.mode,
            opcode: entry.opcode,
            segments: template.segments.clone(),
            setup,
            cycles,
            checks,
        })
    }

    fn unique_name(&mut self, base: String) -> String {
        let seen = self.names.entry(base.clone()).or_insert(0);
        *seen += 1;
        if *seen == 1 {
            base
        } else {
            format!("{}_dup{}", base, *seen - 1)
        }
    }
}

/// Byte handed to the template: the operand cell value, the branch
/// displacement, or the filler.
fn template_value(case: &TestCase) -> u8 {
    case.value(OperandKey::Memory)
        .or_else(|| case.value(OperandKey::Displacement))
        .unwrap_or(SCRATCH_FILL)
}

fn base_name(instr: &Instruction, mode: AddressingMode, case: &TestCase, template: &CodeTemplate) -> String {
    let mut name = format!("test_{}_{}", instr.mnemonic, mode.id());
    if let Some(tag) = template.tag {
        name.push('_');
        name.push_str(tag);
    }
    for (_, v) in &case.values {
        name.push_str(&format!("_{:02x}", v));
    }
    name.to_lowercase()
}

/// Reset defaults, then the case in declaration order, then the template
/// presets. Also returns the matching fixture setup.
fn input_state(
    instr: &Instruction,
    mode: AddressingMode,
    case: &TestCase,
    template: &CodeTemplate,
) -> Result<(InputState, Vec<Setup>), DefinitionError> {
    let mut input = InputState {
        operand: template_value(case),
        fallthrough: template.fallthrough,
        target: template.target,
        ..InputState::default()
    };
    let mut setup = Vec::new();
    if template.origin != 0 {
        setup.push(Setup::Origin(template.origin));
    }
    let mut stack = None;

    for &(key, v) in &case.values {
        match key {
            OperandKey::Reg(reg) => {
                if !reg.is_writable() {
                    return Err(DefinitionError::InvalidRegisterTarget {
                        mnemonic: instr.mnemonic,
                        register: reg,
                    });
                }
                input.set_register(reg, v);
                setup.push(Setup::Register(reg, v));
            }
            OperandKey::Status => {
                input.p = v;
                setup.push(Setup::Status(v));
            }
            OperandKey::Flag(bit) => {
                let set = v != 0;
                input.p = if set { input.p | bit } else { input.p & !bit };
                setup.push(Setup::Flag { bit, set });
            }
            OperandKey::Memory => {
                if !template.cell.accepts_value() {
                    return Err(DefinitionError::UnknownOperand {
                        mnemonic: instr.mnemonic,
                        key,
                        mode,
                    });
                }
            }
            OperandKey::Stack => stack = Some(v),
            OperandKey::Displacement => {
                if mode != AddressingMode::Relative {
                    return Err(DefinitionError::UnknownOperand {
                        mnemonic: instr.mnemonic,
                        key,
                        mode,
                    });
                }
            }
        }
    }

    for &(reg, v) in &template.presets {
        input.set_register(reg, v);
        setup.push(Setup::Register(reg, v));
    }

    // The slot follows the stack pointer the instruction actually sees.
    if let Some(v) = stack {
        input.stack = v;
        setup.push(Setup::Store(stack_slot(input.sp), v));
    }

    Ok((input, setup))
}

/// Address of the byte on top of the stack for stack pointer `sp`.
pub fn stack_slot(sp: u8) -> u16 {
    STACK_PAGE | sp.wrapping_add(1) as u16
}

fn checks(
    instr: &Instruction,
    mode: AddressingMode,
    template: &CodeTemplate,
    input: &InputState,
    expected: &ExpectedState,
) -> Result<Vec<Check>, DefinitionError> {
    let mut checks = Vec::new();
    for reg in [Register::A, Register::X, Register::Y, Register::SP] {
        if let Some(v) = expected.register(reg) {
            checks.push(Check::Register(reg, v));
        }
    }
    if let Some(v) = expected.memory {
        match template.cell {
            OperandCell::Memory(addr) => checks.push(Check::Memory(addr, v)),
            OperandCell::Accumulator => checks.push(Check::Register(Register::A, v)),
            OperandCell::None | OperandCell::Immediate(_) => {
                return Err(DefinitionError::MissingOperandCell {
                    mnemonic: instr.mnemonic,
                    mode,
                })
            }
        }
    }
    if let Some(v) = expected.stack {
        checks.push(Check::Stack(v));
    }
    if let Some(pc) = expected.pc {
        checks.push(Check::Pc(pc));
    }
    let mask = instr.flag_mask;
    checks.push(Check::Flags {
        mask,
        value: expected.flags.unwrap_or(input.p) & mask,
    });
    Ok(checks)
}

/// Number of units `instr` produces: the product of its domain sizes times
/// the template variants summed over its modes.
pub fn unit_count(instr: &Instruction) -> usize {
    let variants: usize = instr
        .modes
        .iter()
        .filter_map(|e| instr.templates.variant_count(e.mode))
        .sum();
    case_count(instr.domains) * variants
}

/// Check `table` for every malformed-definition class before any text is
/// produced.
pub fn validate(table: &[Instruction]) -> Result<(), DefinitionError> {
    let mut opcodes: HashMap<u8, &'static str> = HashMap::new();

    for instr in table {
        for entry in instr.modes {
            if let Some(first) = opcodes.insert(entry.opcode, instr.mnemonic) {
                return Err(DefinitionError::DuplicateOpcode {
                    opcode: entry.opcode,
                    first,
                    second: instr.mnemonic,
                });
            }
        }

        for (i, (key, _)) in instr.domains.iter().enumerate() {
            if instr.domains[..i].iter().any(|(k, _)| k == key) {
                return Err(DefinitionError::DuplicateDomain {
                    mnemonic: instr.mnemonic,
                    key: *key,
                });
            }
            if let OperandKey::Reg(reg) = key {
                if !reg.is_writable() {
                    return Err(DefinitionError::InvalidRegisterTarget {
                        mnemonic: instr.mnemonic,
                        register: *reg,
                    });
                }
            }
        }
        if let Some(reg) = instr.op.registers().into_iter().find(|r| !r.is_writable()) {
            return Err(DefinitionError::InvalidRegisterTarget {
                mnemonic: instr.mnemonic,
                register: reg,
            });
        }

        let writes_memory = evaluate(instr.op, &InputState::default()).memory.is_some();
        for entry in instr.modes {
            validate_mode(instr, entry.mode, entry.opcode, writes_memory)?;
        }
    }

    log(LogCategory::Table, LogLevel::Info, || {
        format!("validated {} instructions", table.len())
    });
    Ok(())
}

fn validate_mode(
    instr: &Instruction,
    mode: AddressingMode,
    opcode: u8,
    writes_memory: bool,
) -> Result<(), DefinitionError> {
    let displacements = instr
        .domain(OperandKey::Displacement)
        .unwrap_or(&[SCRATCH_FILL]);

    for &value in displacements {
        let templates = instr
            .templates
            .templates(mode, opcode, value)
            .ok_or(DefinitionError::MissingTemplate {
                mnemonic: instr.mnemonic,
                mode,
            })?;

        for template in &templates {
            for (key, _) in instr.domains {
                let placed = match key {
                    OperandKey::Memory => template.cell.accepts_value(),
                    OperandKey::Displacement => mode == AddressingMode::Relative,
                    _ => true,
                };
                if !placed {
                    return Err(DefinitionError::UnknownOperand {
                        mnemonic: instr.mnemonic,
                        key: *key,
                        mode,
                    });
                }
            }
            if writes_memory && !template.cell.is_assertable() {
                return Err(DefinitionError::MissingOperandCell {
                    mnemonic: instr.mnemonic,
                    mode,
                });
            }
            if let Some(target) = template.target {
                if template.overlaps_instruction(target) {
                    return Err(DefinitionError::LandingOverlap {
                        mnemonic: instr.mnemonic,
                        displacement: value,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::TemplateSet;
    use crate::instructions::{find, table, Op};
    use crate::model::flags;

    fn units(mnemonic: &str) -> Vec<TestUnit> {
        let instr = find(mnemonic).unwrap();
        Synthesizer::new().instruction(instr).unwrap()
    }

    fn unit<'a>(units: &'a [TestUnit], name: &str) -> &'a TestUnit {
        units.iter().find(|u| u.name == name).unwrap()
    }

    #[test]
    fn builtin_table_is_valid() {
        assert_eq!(validate(table()), Ok(()));
    }

    #[test]
    fn ldx_immediate_zero() {
        let ldx = units("LDX");
        let u = unit(&ldx, "test_ldx_imm_00");
        assert_eq!(u.cycles, 2);
        assert_eq!(u.segments[0].bytes, vec![0xA2, 0x00, 0x02]);
        assert!(u.checks.contains(&Check::Register(Register::X, 0x00)));
        assert!(u.checks.contains(&Check::Flags {
            mask: flags::N | flags::Z,
            value: flags::Z,
        }));
    }

    #[test]
    fn stall_applies_only_to_crossing_variant() {
        let lda = units("LDA");
        assert_eq!(unit(&lda, "test_lda_absx_42").cycles, 4);
        assert_eq!(unit(&lda, "test_lda_absx_xpage_42").cycles, 5);
        assert_eq!(unit(&lda, "test_lda_indy_xpage_42").cycles, 6);

        let sta = units("STA");
        assert_eq!(unit(&sta, "test_sta_absx_xpage_42").cycles, 5);
        assert_eq!(unit(&sta, "test_sta_absx_42").cycles, 5);
    }

    #[test]
    fn presets_follow_case_values() {
        let stx = units("STX");
        let u = unit(&stx, "test_stx_zpagey_overflow_80");
        assert_eq!(
            u.setup,
            vec![
                Setup::Register(Register::X, 0x80),
                Setup::Register(Register::Y, 0x04)
            ]
        );
        assert!(u.checks.contains(&Check::Memory(0x0003, 0x80)));
    }

    #[test]
    fn accumulator_result_is_checked_on_a() {
        let rol = units("ROL");
        let u = unit(&rol, "test_rol_acc_81_01");
        assert!(u.checks.contains(&Check::Register(Register::A, 0x03)));
        assert!(u.checks.contains(&Check::Flags {
            mask: flags::N | flags::Z | flags::C,
            value: flags::C,
        }));
    }

    #[test]
    fn php_then_plp() {
        let php = units("PHP");
        let u = unit(&php, "test_php_impl_cf");
        assert_eq!(u.setup, vec![Setup::Status(0xCF)]);
        assert!(u.checks.contains(&Check::Stack(0xFF)));
        assert!(u.checks.contains(&Check::Register(Register::SP, 0xFC)));

        let plp = units("PLP");
        let u = unit(&plp, "test_plp_impl_cf");
        assert_eq!(u.setup, vec![Setup::Store(0x01FE, 0xCF)]);
        assert!(u.checks.contains(&Check::Register(Register::SP, 0xFE)));
        assert!(u.checks.contains(&Check::Flags {
            mask: 0xCF,
            value: 0xCF,
        }));
    }

    #[test]
    fn branch_timing_and_landing() {
        let beq = units("BEQ");
        let taken = unit(&beq, "test_beq_rel_01_08");
        assert_eq!(taken.cycles, 3);
        assert!(taken.checks.contains(&Check::Pc(0x1108)));
        assert_eq!(
            taken.setup,
            vec![Setup::Origin(0x10FE), Setup::Flag { bit: flags::Z, set: true }]
        );

        let back = unit(&beq, "test_beq_rel_01_f0");
        assert_eq!(back.cycles, 4);
        assert!(back.checks.contains(&Check::Pc(0x10F0)));

        for disp in ["08", "7f", "80", "f0"] {
            let not_taken = unit(&beq, &format!("test_beq_rel_00_{}", disp));
            assert_eq!(not_taken.cycles, 2);
            assert!(not_taken.checks.contains(&Check::Pc(0x1100)));
        }
    }

    #[test]
    fn branch_crossing_follows_page_not_sign() {
        let beq = units("BEQ");
        let forward = unit(&beq, "test_beq_rel_midpage_01_7f");
        assert_eq!(forward.cycles, 4);
        assert!(forward.checks.contains(&Check::Pc(0x120F)));
        assert_eq!(forward.setup[0], Setup::Origin(0x118E));

        let backward = unit(&beq, "test_beq_rel_midpage_01_f0");
        assert_eq!(backward.cycles, 3);
        assert!(backward.checks.contains(&Check::Pc(0x1180)));

        let not_taken = unit(&beq, "test_beq_rel_midpage_00_80");
        assert_eq!(not_taken.cycles, 2);
        assert!(not_taken.checks.contains(&Check::Pc(0x1190)));
    }

    #[test]
    fn jmp_indirect_variants() {
        let jmp = units("JMP");
        assert_eq!(jmp.len(), 3);
        let wrap = unit(&jmp, "test_jmp_ind_ptrwrap");
        assert_eq!(wrap.cycles, 5);
        assert!(wrap.checks.contains(&Check::Pc(0x1000)));
    }

    #[test]
    fn counts_match_property() {
        for instr in table() {
            let units = Synthesizer::new().instruction(instr).unwrap();
            assert_eq!(units.len(), unit_count(instr), "{}", instr.mnemonic);
        }
    }

    #[test]
    fn every_unit_checks_flags() {
        for u in &units("TXS") {
            assert!(u
                .checks
                .iter()
                .any(|c| matches!(c, Check::Flags { mask: 0, .. })));
        }
    }

    #[test]
    fn duplicate_values_get_suffix() {
        static DUP: Instruction = Instruction {
            mnemonic: "LDA",
            op: Op::Load(Register::A),
            modes: &[ModeEntry {
                mode: AddressingMode::Immediate,
                opcode: 0xA9,
                cycles: 2,
            }],
            domains: &[(OperandKey::Memory, &[0x10, 0x10, 0x10])],
            flag_mask: flags::N | flags::Z,
            page_stall: false,
            templates: TemplateSet::Data,
        };
        let names: Vec<_> = Synthesizer::new()
            .instruction(&DUP)
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(
            names,
            vec!["test_lda_imm_10", "test_lda_imm_10_dup1", "test_lda_imm_10_dup2"]
        );
    }

    fn bad(modes: &'static [ModeEntry], domains: &'static [(OperandKey, &'static [u8])], op: Op) -> Instruction {
        Instruction {
            mnemonic: "BAD",
            op,
            modes,
            domains,
            flag_mask: 0,
            page_stall: false,
            templates: TemplateSet::Data,
        }
    }

    const IMM: &[ModeEntry] = &[ModeEntry {
        mode: AddressingMode::Immediate,
        opcode: 0xFF,
        cycles: 2,
    }];
    const IMPL: &[ModeEntry] = &[ModeEntry {
        mode: AddressingMode::Implied,
        opcode: 0xFF,
        cycles: 2,
    }];

    #[test]
    fn rejects_missing_template() {
        let rel: &'static [ModeEntry] = &[ModeEntry {
            mode: AddressingMode::Relative,
            opcode: 0xFF,
            cycles: 2,
        }];
        assert_eq!(
            validate(&[bad(rel, &[], Op::Nop)]),
            Err(DefinitionError::MissingTemplate {
                mnemonic: "BAD",
                mode: AddressingMode::Relative,
            })
        );
    }

    #[test]
    fn rejects_memory_on_implied() {
        let err = validate(&[bad(IMPL, &[(OperandKey::Memory, &[1])], Op::Nop)]);
        assert_eq!(
            err,
            Err(DefinitionError::UnknownOperand {
                mnemonic: "BAD",
                key: OperandKey::Memory,
                mode: AddressingMode::Implied,
            })
        );
    }

    #[test]
    fn rejects_displacement_off_relative() {
        let err = validate(&[bad(IMPL, &[(OperandKey::Displacement, &[1])], Op::Nop)]);
        assert!(matches!(err, Err(DefinitionError::UnknownOperand { .. })));
    }

    #[test]
    fn rejects_pc_target() {
        let err = validate(&[bad(IMPL, &[(OperandKey::Reg(Register::PC), &[1])], Op::Nop)]);
        assert_eq!(
            err,
            Err(DefinitionError::InvalidRegisterTarget {
                mnemonic: "BAD",
                register: Register::PC,
            })
        );
        let err = validate(&[bad(IMPL, &[], Op::Load(Register::PC))]);
        assert!(matches!(err, Err(DefinitionError::InvalidRegisterTarget { .. })));
    }

    #[test]
    fn rejects_duplicate_domain() {
        let err = validate(&[bad(
            IMM,
            &[(OperandKey::Memory, &[1]), (OperandKey::Memory, &[2])],
            Op::Nop,
        )]);
        assert!(matches!(err, Err(DefinitionError::DuplicateDomain { .. })));
    }

    #[test]
    fn rejects_duplicate_opcode() {
        let err = validate(&[bad(IMM, &[], Op::Nop), bad(IMPL, &[], Op::Nop)]);
        assert_eq!(
            err,
            Err(DefinitionError::DuplicateOpcode {
                opcode: 0xFF,
                first: "BAD",
                second: "BAD",
            })
        );
    }

    #[test]
    fn rejects_store_without_cell() {
        let err = validate(&[bad(IMM, &[], Op::Store(Register::A))]);
        assert_eq!(
            err,
            Err(DefinitionError::MissingOperandCell {
                mnemonic: "BAD",
                mode: AddressingMode::Immediate,
            })
        );
    }

    #[test]
    fn rejects_branch_onto_itself() {
        let rel: &'static [ModeEntry] = &[ModeEntry {
            mode: AddressingMode::Relative,
            opcode: 0xF0,
            cycles: 2,
        }];
        let instr = Instruction {
            templates: TemplateSet::Control,
            ..bad(rel, &[(OperandKey::Displacement, &[0x08, 0xFF])], Op::Nop)
        };
        assert_eq!(
            validate(&[instr]),
            Err(DefinitionError::LandingOverlap {
                mnemonic: "BAD",
                displacement: 0xFF,
            })
        );
        assert!(matches!(
            Synthesizer::new().instruction(&instr),
            Err(DefinitionError::LandingOverlap { displacement: 0xFF, .. })
        ));
    }
}
