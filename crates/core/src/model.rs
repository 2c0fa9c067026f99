//! Shared data model for the generator.
//!
//! The catalog, the semantics evaluator and the synthesizer exchange state
//! through the closed records defined here: [`InputState`] describes the
//! machine right before the instruction under test executes, and
//! [`ExpectedState`] is the sparse set of values the real CPU is defined to
//! leave behind.

use serde::Serialize;
use std::fmt;

/// Reserved opcode that stops the emulator; placed right after every
/// instruction under test.
pub const HLT_MARKER: u8 = 0x02;

/// Stack pointer after reset.
pub const RESET_SP: u8 = 0xFD;

/// Status register after reset (I and the unused bit set).
pub const RESET_STATUS: u8 = flags::I | flags::U;

/// Base of the hardware stack page.
pub const STACK_PAGE: u16 = 0x0100;

/// Status register bits (NV-BDIZC).
pub mod flags {
    pub const C: u8 = 0x01;
    pub const Z: u8 = 0x02;
    pub const I: u8 = 0x04;
    pub const D: u8 = 0x08;
    pub const B: u8 = 0x10;
    pub const U: u8 = 0x20;
    pub const V: u8 = 0x40;
    pub const N: u8 = 0x80;

    /// Bits with no latch behind them; forced set on push, ignored on pull.
    pub const RESERVED: u8 = B | U;

    /// Every bit a pull of the status register can change.
    pub const ALL_LATCHED: u8 = !RESERVED;

    /// Single-letter name of a flag bit, used in test names and comments.
    pub fn name(bit: u8) -> &'static str {
        match bit {
            C => "c",
            Z => "z",
            I => "i",
            D => "d",
            B => "b",
            U => "u",
            V => "v",
            N => "n",
            _ => "?",
        }
    }
}

/// CPU registers addressable by the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Register {
    A,
    X,
    Y,
    SP,
    PC,
}

impl Register {
    pub fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
            Register::SP => "SP",
            Register::PC => "PC",
        }
    }

    /// Whether a test may preload this register before running.
    ///
    /// The program counter is owned by the template layout (reset vector and
    /// halt markers), never by an operand domain.
    pub fn is_writable(self) -> bool {
        !matches!(self, Register::PC)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key of one operand-value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKey {
    /// Preload of a register.
    Reg(Register),
    /// Whole status byte.
    Status,
    /// One status bit, domain values are 0 or 1.
    Flag(u8),
    /// Value of the instruction's operand cell (immediate byte, memory cell
    /// or accumulator depending on the addressing mode).
    Memory,
    /// Byte sitting on top of the stack before execution.
    Stack,
    /// Signed relative branch offset.
    Displacement,
}

impl fmt::Display for OperandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKey::Reg(r) => write!(f, "{}", r),
            OperandKey::Status => f.write_str("Status"),
            OperandKey::Flag(bit) => write!(f, "Flag({})", flags::name(*bit).to_uppercase()),
            OperandKey::Memory => f.write_str("Memory"),
            OperandKey::Stack => f.write_str("Stack"),
            OperandKey::Displacement => f.write_str("Displacement"),
        }
    }
}

/// Machine state right before the instruction under test executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub p: u8,
    /// Byte in the instruction's operand cell.
    pub operand: u8,
    /// Byte at `0x0100 | (sp + 1)`.
    pub stack: u8,
    /// Address of the halt marker right after the instruction.
    pub fallthrough: u16,
    /// Landing marker of a control transfer, if the template has one.
    pub target: Option<u16>,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: RESET_SP,
            p: RESET_STATUS,
            operand: 0,
            stack: 0,
            fallthrough: 0,
            target: None,
        }
    }
}

impl InputState {
    pub fn register(&self, reg: Register) -> u8 {
        match reg {
            Register::A => self.a,
            Register::X => self.x,
            Register::Y => self.y,
            Register::SP => self.sp,
            // Table validation rejects PC as an 8-bit source.
            Register::PC => 0,
        }
    }

    pub fn set_register(&mut self, reg: Register, val: u8) {
        match reg {
            Register::A => self.a = val,
            Register::X => self.x = val,
            Register::Y => self.y = val,
            Register::SP => self.sp = val,
            Register::PC => {}
        }
    }

    pub fn flag(&self, bit: u8) -> bool {
        self.p & bit != 0
    }
}

/// Sparse expected final state. `None` means "not asserted".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpectedState {
    pub a: Option<u8>,
    pub x: Option<u8>,
    pub y: Option<u8>,
    pub sp: Option<u8>,
    /// Address of the halt marker execution stopped on.
    pub pc: Option<u16>,
    /// Final value of the operand cell.
    pub memory: Option<u8>,
    /// Status bits; only bits inside the instruction's flag mask are read.
    pub flags: Option<u8>,
    /// Byte at `0x0100 | (final sp + 1)`.
    pub stack: Option<u8>,
    /// Replaces the base-plus-stall cycle rule when present.
    pub cycles: Option<u32>,
}

impl ExpectedState {
    pub fn register(&self, reg: Register) -> Option<u8> {
        match reg {
            Register::A => self.a,
            Register::X => self.x,
            Register::Y => self.y,
            Register::SP => self.sp,
            Register::PC => None,
        }
    }

    pub fn set_register(&mut self, reg: Register, val: u8) {
        match reg {
            Register::A => self.a = Some(val),
            Register::X => self.x = Some(val),
            Register::Y => self.y = Some(val),
            Register::SP => self.sp = Some(val),
            Register::PC => {}
        }
    }
}
