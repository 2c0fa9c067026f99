//! # Instruction Semantics Table
//!
//! Static, read-only registry of every instruction the generator covers.
//! Each entry declares:
//! - the addressing modes it is exercised through, with opcode and base cycles
//! - ordered operand domains (the testcase domain)
//! - the semantics tag dispatched by [`crate::semantics::evaluate`]
//! - the flag mask (bits the instruction may change)
//! - whether it stalls one cycle on a page crossing
//! - which template set lays out its code
//!
//! Entries and modes are listed in generation order.

use crate::addressing::{AddressingMode, TemplateSet};
use crate::model::{flags, OperandKey, Register};

/// Branch condition: taken when `flag` is set (`set == true`) or clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Condition {
    pub flag: u8,
    pub set: bool,
}

/// Semantics tag, one case per instruction (register-parameterized where
/// several mnemonics share a rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Load(Register),
    Store(Register),
    Adc,
    Sbc,
    And,
    Ora,
    Eor,
    Compare(Register),
    Bit,
    Asl,
    Lsr,
    Rol,
    Ror,
    Inc,
    Dec,
    Increment(Register),
    Decrement(Register),
    Transfer { from: Register, to: Register },
    Pha,
    Php,
    Pla,
    Plp,
    SetFlag(u8),
    ClearFlag(u8),
    Nop,
    Jmp,
    Jsr,
    Branch(Condition),
}

impl Op {
    /// Registers this semantics rule reads or writes as 8-bit values.
    pub fn registers(self) -> Vec<Register> {
        match self {
            Op::Load(r) | Op::Store(r) | Op::Compare(r) | Op::Increment(r) | Op::Decrement(r) => {
                vec![r]
            }
            Op::Transfer { from, to } => vec![from, to],
            _ => Vec::new(),
        }
    }
}

/// One `(mode, opcode, base cycles)` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeEntry {
    pub mode: AddressingMode,
    pub opcode: u8,
    pub cycles: u32,
}

/// Operand key with its ordered list of values.
pub type Domain = (OperandKey, &'static [u8]);

#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub op: Op,
    pub modes: &'static [ModeEntry],
    pub domains: &'static [Domain],
    pub flag_mask: u8,
    pub page_stall: bool,
    pub templates: TemplateSet,
}

macro_rules! modes {
    ($($mode:ident => $opcode:literal, $cycles:literal);+ $(;)?) => {
        &[$(ModeEntry {
            mode: AddressingMode::$mode,
            opcode: $opcode,
            cycles: $cycles,
        }),+]
    };
}

const NZ: u8 = flags::N | flags::Z;
const NZC: u8 = flags::N | flags::Z | flags::C;
const NVZ: u8 = flags::N | flags::V | flags::Z;
const NVZC: u8 = flags::N | flags::V | flags::Z | flags::C;

const A: OperandKey = OperandKey::Reg(Register::A);
const X: OperandKey = OperandKey::Reg(Register::X);
const Y: OperandKey = OperandKey::Reg(Register::Y);
const SP: OperandKey = OperandKey::Reg(Register::SP);
const MEM: OperandKey = OperandKey::Memory;
const STACK: OperandKey = OperandKey::Stack;
const STATUS: OperandKey = OperandKey::Status;
const DISP: OperandKey = OperandKey::Displacement;

const BITS: &[u8] = &[0, 1];
const LOAD_VALUES: &[u8] = &[0x42, 0xAA, 0x00];
// $A5 is the operand-cell filler, keep it out of store domains
const STORE_VALUES: &[u8] = &[0x42, 0x80, 0x00];
const ARITH_A: &[u8] = &[0x50, 0xD0];
const ARITH_M: &[u8] = &[0x10, 0x50, 0x90, 0xF0];
const LOGIC_A: &[u8] = &[0xAA, 0x0F];
const LOGIC_M: &[u8] = &[0x55, 0xF0, 0x00];
const CMP_REG: &[u8] = &[0x40];
const CMP_M: &[u8] = &[0x30, 0x40, 0x50, 0xC0];
const BIT_A: &[u8] = &[0x0F, 0xF0];
const BIT_M: &[u8] = &[0xC0, 0x40, 0x30];
const SHIFT_M: &[u8] = &[0x81, 0x40, 0x00];
const STEP_VALUES: &[u8] = &[0xFF, 0x7F, 0x00, 0x80];
const TRANSFER_VALUES: &[u8] = &[0x42, 0x80, 0x00];
const PUSH_VALUES: &[u8] = &[0x42, 0x80];
const STATUS_VALUES: &[u8] = &[0xCF, 0x00];
const PULL_VALUES: &[u8] = &[0x42, 0x80, 0x00];
const PULL_STATUS_VALUES: &[u8] = &[0xCF, 0xFF, 0x00];
// Short and maximum reach in both directions; the two branch layouts decide
// which of them cross a page. $FE/$FF would land on the branch's own bytes.
const DISPLACEMENTS: &[u8] = &[0x08, 0x7F, 0x80, 0xF0];

const LOAD_DOMAINS: &[Domain] = &[(MEM, LOAD_VALUES)];
const ARITH_DOMAINS: &[Domain] = &[(A, ARITH_A), (MEM, ARITH_M), (OperandKey::Flag(flags::C), BITS)];
const LOGIC_DOMAINS: &[Domain] = &[(A, LOGIC_A), (MEM, LOGIC_M)];
const SHIFT_DOMAINS: &[Domain] = &[(MEM, SHIFT_M), (OperandKey::Flag(flags::C), BITS)];
const STEP_DOMAINS: &[Domain] = &[(MEM, STEP_VALUES)];

const fn data(
    mnemonic: &'static str,
    op: Op,
    modes: &'static [ModeEntry],
    domains: &'static [Domain],
    flag_mask: u8,
    page_stall: bool,
) -> Instruction {
    Instruction {
        mnemonic,
        op,
        modes,
        domains,
        flag_mask,
        page_stall,
        templates: TemplateSet::Data,
    }
}

const fn control(
    mnemonic: &'static str,
    op: Op,
    modes: &'static [ModeEntry],
    domains: &'static [Domain],
) -> Instruction {
    Instruction {
        mnemonic,
        op,
        modes,
        domains,
        flag_mask: 0,
        page_stall: false,
        templates: TemplateSet::Control,
    }
}

const fn branch(mnemonic: &'static str, opcode_modes: &'static [ModeEntry], flag: u8, set: bool) -> Instruction {
    let domains: &'static [Domain] = match flag {
        flags::N => &[(OperandKey::Flag(flags::N), BITS), (DISP, DISPLACEMENTS)],
        flags::V => &[(OperandKey::Flag(flags::V), BITS), (DISP, DISPLACEMENTS)],
        flags::C => &[(OperandKey::Flag(flags::C), BITS), (DISP, DISPLACEMENTS)],
        _ => &[(OperandKey::Flag(flags::Z), BITS), (DISP, DISPLACEMENTS)],
    };
    control(mnemonic, Op::Branch(Condition { flag, set }), opcode_modes, domains)
}

/// The instruction table, in generation order.
pub static INSTRUCTIONS: &[Instruction] = &[
    // Loads
    data(
        "LDA",
        Op::Load(Register::A),
        modes![
            Immediate => 0xA9, 2;
            ZeroPage => 0xA5, 3;
            ZeroPageX => 0xB5, 4;
            Absolute => 0xAD, 4;
            AbsoluteX => 0xBD, 4;
            AbsoluteY => 0xB9, 4;
            IndirectX => 0xA1, 6;
            IndirectY => 0xB1, 5;
        ],
        LOAD_DOMAINS,
        NZ,
        true,
    ),
    data(
        "LDX",
        Op::Load(Register::X),
        modes![
            Immediate => 0xA2, 2;
            ZeroPage => 0xA6, 3;
            ZeroPageY => 0xB6, 4;
            Absolute => 0xAE, 4;
            AbsoluteY => 0xBE, 4;
        ],
        LOAD_DOMAINS,
        NZ,
        true,
    ),
    data(
        "LDY",
        Op::Load(Register::Y),
        modes![
            Immediate => 0xA0, 2;
            ZeroPage => 0xA4, 3;
            ZeroPageX => 0xB4, 4;
            Absolute => 0xAC, 4;
            AbsoluteX => 0xBC, 4;
        ],
        LOAD_DOMAINS,
        NZ,
        true,
    ),
    // Stores: indexed forms always take the extra cycle, so it lives in the base count
    data(
        "STA",
        Op::Store(Register::A),
        modes![
            ZeroPage => 0x85, 3;
            ZeroPageX => 0x95, 4;
            Absolute => 0x8D, 4;
            AbsoluteX => 0x9D, 5;
            AbsoluteY => 0x99, 5;
            IndirectX => 0x81, 6;
            IndirectY => 0x91, 6;
        ],
        &[(A, STORE_VALUES)],
        0,
        false,
    ),
    data(
        "STX",
        Op::Store(Register::X),
        modes![
            ZeroPage => 0x86, 3;
            ZeroPageY => 0x96, 4;
            Absolute => 0x8E, 4;
        ],
        &[(X, STORE_VALUES)],
        0,
        false,
    ),
    data(
        "STY",
        Op::Store(Register::Y),
        modes![
            ZeroPage => 0x84, 3;
            ZeroPageX => 0x94, 4;
            Absolute => 0x8C, 4;
        ],
        &[(Y, STORE_VALUES)],
        0,
        false,
    ),
    // Arithmetic and logic
    data(
        "ADC",
        Op::Adc,
        modes![
            Immediate => 0x69, 2;
            ZeroPage => 0x65, 3;
            ZeroPageX => 0x75, 4;
            Absolute => 0x6D, 4;
            AbsoluteX => 0x7D, 4;
            AbsoluteY => 0x79, 4;
            IndirectX => 0x61, 6;
            IndirectY => 0x71, 5;
        ],
        ARITH_DOMAINS,
        NVZC,
        true,
    ),
    data(
        "SBC",
        Op::Sbc,
        modes![
            Immediate => 0xE9, 2;
            ZeroPage => 0xE5, 3;
            ZeroPageX => 0xF5, 4;
            Absolute => 0xED, 4;
            AbsoluteX => 0xFD, 4;
            AbsoluteY => 0xF9, 4;
            IndirectX => 0xE1, 6;
            IndirectY => 0xF1, 5;
        ],
        ARITH_DOMAINS,
        NVZC,
        true,
    ),
    data(
        "AND",
        Op::And,
        modes![
            Immediate => 0x29, 2;
            ZeroPage => 0x25, 3;
            ZeroPageX => 0x35, 4;
            Absolute => 0x2D, 4;
            AbsoluteX => 0x3D, 4;
            AbsoluteY => 0x39, 4;
            IndirectX => 0x21, 6;
            IndirectY => 0x31, 5;
        ],
        LOGIC_DOMAINS,
        NZ,
        true,
    ),
    data(
        "ORA",
        Op::Ora,
        modes![
            Immediate => 0x09, 2;
            ZeroPage => 0x05, 3;
            ZeroPageX => 0x15, 4;
            Absolute => 0x0D, 4;
            AbsoluteX => 0x1D, 4;
            AbsoluteY => 0x19, 4;
            IndirectX => 0x01, 6;
            IndirectY => 0x11, 5;
        ],
        LOGIC_DOMAINS,
        NZ,
        true,
    ),
    data(
        "EOR",
        Op::Eor,
        modes![
            Immediate => 0x49, 2;
            ZeroPage => 0x45, 3;
            ZeroPageX => 0x55, 4;
            Absolute => 0x4D, 4;
            AbsoluteX => 0x5D, 4;
            AbsoluteY => 0x59, 4;
            IndirectX => 0x41, 6;
            IndirectY => 0x51, 5;
        ],
        LOGIC_DOMAINS,
        NZ,
        true,
    ),
    // Compares
    data(
        "CMP",
        Op::Compare(Register::A),
        modes![
            Immediate => 0xC9, 2;
            ZeroPage => 0xC5, 3;
            ZeroPageX => 0xD5, 4;
            Absolute => 0xCD, 4;
            AbsoluteX => 0xDD, 4;
            AbsoluteY => 0xD9, 4;
            IndirectX => 0xC1, 6;
            IndirectY => 0xD1, 5;
        ],
        &[(A, CMP_REG), (MEM, CMP_M)],
        NZC,
        true,
    ),
    data(
        "CPX",
        Op::Compare(Register::X),
        modes![
            Immediate => 0xE0, 2;
            ZeroPage => 0xE4, 3;
            Absolute => 0xEC, 4;
        ],
        &[(X, CMP_REG), (MEM, CMP_M)],
        NZC,
        false,
    ),
    data(
        "CPY",
        Op::Compare(Register::Y),
        modes![
            Immediate => 0xC0, 2;
            ZeroPage => 0xC4, 3;
            Absolute => 0xCC, 4;
        ],
        &[(Y, CMP_REG), (MEM, CMP_M)],
        NZC,
        false,
    ),
    data(
        "BIT",
        Op::Bit,
        modes![
            ZeroPage => 0x24, 3;
            Absolute => 0x2C, 4;
        ],
        &[(A, BIT_A), (MEM, BIT_M)],
        NVZ,
        false,
    ),
    // Shifts and rotates
    data(
        "ASL",
        Op::Asl,
        modes![
            Accumulator => 0x0A, 2;
            ZeroPage => 0x06, 5;
            ZeroPageX => 0x16, 6;
            Absolute => 0x0E, 6;
            AbsoluteX => 0x1E, 7;
        ],
        SHIFT_DOMAINS,
        NZC,
        false,
    ),
    data(
        "LSR",
        Op::Lsr,
        modes![
            Accumulator => 0x4A, 2;
            ZeroPage => 0x46, 5;
            ZeroPageX => 0x56, 6;
            Absolute => 0x4E, 6;
            AbsoluteX => 0x5E, 7;
        ],
        SHIFT_DOMAINS,
        NZC,
        false,
    ),
    data(
        "ROL",
        Op::Rol,
        modes![
            Accumulator => 0x2A, 2;
            ZeroPage => 0x26, 5;
            ZeroPageX => 0x36, 6;
            Absolute => 0x2E, 6;
            AbsoluteX => 0x3E, 7;
        ],
        SHIFT_DOMAINS,
        NZC,
        false,
    ),
    data(
        "ROR",
        Op::Ror,
        modes![
            Accumulator => 0x6A, 2;
            ZeroPage => 0x66, 5;
            ZeroPageX => 0x76, 6;
            Absolute => 0x6E, 6;
            AbsoluteX => 0x7E, 7;
        ],
        SHIFT_DOMAINS,
        NZC,
        false,
    ),
    // Increments and decrements
    data(
        "INC",
        Op::Inc,
        modes![
            ZeroPage => 0xE6, 5;
            ZeroPageX => 0xF6, 6;
            Absolute => 0xEE, 6;
            AbsoluteX => 0xFE, 7;
        ],
        STEP_DOMAINS,
        NZ,
        false,
    ),
    data(
        "DEC",
        Op::Dec,
        modes![
            ZeroPage => 0xC6, 5;
            ZeroPageX => 0xD6, 6;
            Absolute => 0xCE, 6;
            AbsoluteX => 0xDE, 7;
        ],
        STEP_DOMAINS,
        NZ,
        false,
    ),
    data("INX", Op::Increment(Register::X), modes![Implied => 0xE8, 2], &[(X, STEP_VALUES)], NZ, false),
    data("INY", Op::Increment(Register::Y), modes![Implied => 0xC8, 2], &[(Y, STEP_VALUES)], NZ, false),
    data("DEX", Op::Decrement(Register::X), modes![Implied => 0xCA, 2], &[(X, STEP_VALUES)], NZ, false),
    data("DEY", Op::Decrement(Register::Y), modes![Implied => 0x88, 2], &[(Y, STEP_VALUES)], NZ, false),
    // Register transfers
    data(
        "TAX",
        Op::Transfer { from: Register::A, to: Register::X },
        modes![Implied => 0xAA, 2],
        &[(A, TRANSFER_VALUES)],
        NZ,
        false,
    ),
    data(
        "TAY",
        Op::Transfer { from: Register::A, to: Register::Y },
        modes![Implied => 0xA8, 2],
        &[(A, TRANSFER_VALUES)],
        NZ,
        false,
    ),
    data(
        "TXA",
        Op::Transfer { from: Register::X, to: Register::A },
        modes![Implied => 0x8A, 2],
        &[(X, TRANSFER_VALUES)],
        NZ,
        false,
    ),
    data(
        "TYA",
        Op::Transfer { from: Register::Y, to: Register::A },
        modes![Implied => 0x98, 2],
        &[(Y, TRANSFER_VALUES)],
        NZ,
        false,
    ),
    data(
        "TSX",
        Op::Transfer { from: Register::SP, to: Register::X },
        modes![Implied => 0xBA, 2],
        &[(SP, TRANSFER_VALUES)],
        NZ,
        false,
    ),
    // TXS is the one transfer that leaves the flags alone
    data(
        "TXS",
        Op::Transfer { from: Register::X, to: Register::SP },
        modes![Implied => 0x9A, 2],
        &[(X, TRANSFER_VALUES)],
        0,
        false,
    ),
    // Stack
    data("PHA", Op::Pha, modes![Implied => 0x48, 3], &[(A, PUSH_VALUES)], 0, false),
    data("PHP", Op::Php, modes![Implied => 0x08, 3], &[(STATUS, STATUS_VALUES)], 0, false),
    data("PLA", Op::Pla, modes![Implied => 0x68, 4], &[(STACK, PULL_VALUES)], NZ, false),
    data(
        "PLP",
        Op::Plp,
        modes![Implied => 0x28, 4],
        &[(STACK, PULL_STATUS_VALUES)],
        flags::ALL_LATCHED,
        false,
    ),
    // Flag set/clear
    data("CLC", Op::ClearFlag(flags::C), modes![Implied => 0x18, 2], &[(OperandKey::Flag(flags::C), BITS)], flags::C, false),
    data("SEC", Op::SetFlag(flags::C), modes![Implied => 0x38, 2], &[(OperandKey::Flag(flags::C), BITS)], flags::C, false),
    data("CLI", Op::ClearFlag(flags::I), modes![Implied => 0x58, 2], &[(OperandKey::Flag(flags::I), BITS)], flags::I, false),
    data("SEI", Op::SetFlag(flags::I), modes![Implied => 0x78, 2], &[(OperandKey::Flag(flags::I), BITS)], flags::I, false),
    data("CLV", Op::ClearFlag(flags::V), modes![Implied => 0xB8, 2], &[(OperandKey::Flag(flags::V), BITS)], flags::V, false),
    data("CLD", Op::ClearFlag(flags::D), modes![Implied => 0xD8, 2], &[(OperandKey::Flag(flags::D), BITS)], flags::D, false),
    data("SED", Op::SetFlag(flags::D), modes![Implied => 0xF8, 2], &[(OperandKey::Flag(flags::D), BITS)], flags::D, false),
    data("NOP", Op::Nop, modes![Implied => 0xEA, 2], &[], 0, false),
    // Control transfers
    control(
        "JMP",
        Op::Jmp,
        modes![
            Absolute => 0x4C, 3;
            Indirect => 0x6C, 5;
        ],
        &[],
    ),
    control("JSR", Op::Jsr, modes![Absolute => 0x20, 6], &[]),
    branch("BPL", modes![Relative => 0x10, 2], flags::N, false),
    branch("BMI", modes![Relative => 0x30, 2], flags::N, true),
    branch("BVC", modes![Relative => 0x50, 2], flags::V, false),
    branch("BVS", modes![Relative => 0x70, 2], flags::V, true),
    branch("BCC", modes![Relative => 0x90, 2], flags::C, false),
    branch("BCS", modes![Relative => 0xB0, 2], flags::C, true),
    branch("BNE", modes![Relative => 0xD0, 2], flags::Z, false),
    branch("BEQ", modes![Relative => 0xF0, 2], flags::Z, true),
];

/// The full instruction table.
pub fn table() -> &'static [Instruction] {
    INSTRUCTIONS
}

/// Look up an instruction by mnemonic (case-insensitive).
pub fn find(mnemonic: &str) -> Option<&'static Instruction> {
    INSTRUCTIONS
        .iter()
        .find(|instr| instr.mnemonic.eq_ignore_ascii_case(mnemonic))
}

impl Instruction {
    pub fn entry(&self, mode: AddressingMode) -> Option<&ModeEntry> {
        self.modes.iter().find(|e| e.mode == mode)
    }

    pub fn domain(&self, key: OperandKey) -> Option<&'static [u8]> {
        self.domains.iter().find(|(k, _)| *k == key).map(|(_, values)| *values)
    }
}
