//! Semantics evaluator.
//!
//! [`evaluate`] maps one semantics tag and one [`InputState`] to the sparse
//! [`ExpectedState`] a real NMOS 6502 leaves behind. The ALU helpers are
//! exposed on their own so the rules can be checked in isolation; they work
//! on whole status bytes and never look at decimal mode.

use crate::instructions::{Condition, Op};
use crate::logging::{log, LogCategory, LogLevel};
use crate::model::{flags, ExpectedState, InputState, Register};

/// Cycle cost of a branch that is not taken.
pub const BRANCH_CYCLES: u32 = 2;

fn set_flag(p: u8, bit: u8, on: bool) -> u8 {
    if on {
        p | bit
    } else {
        p & !bit
    }
}

/// Replace N and Z in `p` according to `v`.
pub fn set_zero_and_negative(p: u8, v: u8) -> u8 {
    let p = set_flag(p, flags::Z, v == 0);
    set_flag(p, flags::N, v & 0x80 != 0)
}

/// A + M + C. Returns `(result, status)`.
///
/// Overflow is derived from operand and result signs, not from carry
/// arithmetic.
pub fn add_with_carry(a: u8, m: u8, p: u8) -> (u8, u8) {
    let sum = a as u16 + m as u16 + (p & flags::C) as u16;
    let result = sum as u8;

    let a_negative = a & 0x80 != 0;
    let m_negative = m & 0x80 != 0;
    let r_negative = result & 0x80 != 0;
    let overflow = a_negative == m_negative && r_negative != a_negative;

    let status = set_zero_and_negative(p, result);
    let status = set_flag(status, flags::C, sum > 0xFF);
    (result, set_flag(status, flags::V, overflow))
}

/// A - M - !C, as an addition of the one's complement.
pub fn subtract_with_borrow(a: u8, m: u8, p: u8) -> (u8, u8) {
    add_with_carry(a, !m, p)
}

/// CMP/CPX/CPY status.
pub fn compare(reg: u8, m: u8, p: u8) -> u8 {
    let status = set_zero_and_negative(p, reg.wrapping_sub(m));
    set_flag(status, flags::C, reg >= m)
}

/// BIT status: Z from A & M, N and V straight from the operand.
pub fn bit_test(a: u8, m: u8, p: u8) -> u8 {
    let status = set_flag(p, flags::Z, a & m == 0);
    let status = set_flag(status, flags::N, m & 0x80 != 0);
    set_flag(status, flags::V, m & 0x40 != 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Asl,
    Lsr,
    Rol,
    Ror,
}

/// Shift or rotate `v` by one bit. Returns `(result, status)`.
pub fn shift(kind: Shift, v: u8, p: u8) -> (u8, u8) {
    let carry_in = p & flags::C;
    let (result, carry_out) = match kind {
        Shift::Asl => (v << 1, v & 0x80 != 0),
        Shift::Lsr => (v >> 1, v & 0x01 != 0),
        Shift::Rol => ((v << 1) | carry_in, v & 0x80 != 0),
        Shift::Ror => ((v >> 1) | (carry_in << 7), v & 0x01 != 0),
    };
    let status = set_zero_and_negative(p, result);
    (result, set_flag(status, flags::C, carry_out))
}

/// Cycles of a branch from the instruction ending at `fallthrough`.
///
/// Taken branches cost one extra cycle, two when the destination sits on a
/// different page than the fall-through address.
pub fn branch_cycles(fallthrough: u16, destination: Option<u16>) -> u32 {
    match destination {
        None => BRANCH_CYCLES,
        Some(dest) if dest & 0xFF00 == fallthrough & 0xFF00 => BRANCH_CYCLES + 1,
        Some(_) => BRANCH_CYCLES + 2,
    }
}

/// Destination of a taken branch whose displacement is `input.operand`.
pub fn branch_destination(input: &InputState) -> u16 {
    input.fallthrough.wrapping_add(input.operand as i8 as u16)
}

fn branch(cond: Condition, input: &InputState) -> ExpectedState {
    let taken = input.flag(cond.flag) == cond.set;
    let destination = taken.then(|| branch_destination(input));
    ExpectedState {
        pc: Some(destination.unwrap_or(input.fallthrough)),
        cycles: Some(branch_cycles(input.fallthrough, destination)),
        ..ExpectedState::default()
    }
}

/// Evaluate the effect of `op` on `input`.
///
/// Only the keys the instruction is defined to change are filled in.
pub fn evaluate(op: Op, input: &InputState) -> ExpectedState {
    let mut out = ExpectedState::default();
    let p = input.p;
    let m = input.operand;

    match op {
        Op::Load(reg) => {
            out.set_register(reg, m);
            out.flags = Some(set_zero_and_negative(p, m));
        }
        Op::Store(reg) => {
            out.memory = Some(input.register(reg));
        }
        Op::Adc => {
            let (a, status) = add_with_carry(input.a, m, p);
            out.a = Some(a);
            out.flags = Some(status);
        }
        Op::Sbc => {
            let (a, status) = subtract_with_borrow(input.a, m, p);
            out.a = Some(a);
            out.flags = Some(status);
        }
        Op::And | Op::Ora | Op::Eor => {
            let a = match op {
                Op::And => input.a & m,
                Op::Ora => input.a | m,
                _ => input.a ^ m,
            };
            out.a = Some(a);
            out.flags = Some(set_zero_and_negative(p, a));
        }
        Op::Compare(reg) => {
            out.flags = Some(compare(input.register(reg), m, p));
        }
        Op::Bit => {
            out.flags = Some(bit_test(input.a, m, p));
        }
        Op::Asl | Op::Lsr | Op::Rol | Op::Ror => {
            let kind = match op {
                Op::Asl => Shift::Asl,
                Op::Lsr => Shift::Lsr,
                Op::Rol => Shift::Rol,
                _ => Shift::Ror,
            };
            let (v, status) = shift(kind, m, p);
            out.memory = Some(v);
            out.flags = Some(status);
        }
        Op::Inc | Op::Dec => {
            let v = if op == Op::Inc {
                m.wrapping_add(1)
            } else {
                m.wrapping_sub(1)
            };
            out.memory = Some(v);
            out.flags = Some(set_zero_and_negative(p, v));
        }
        Op::Increment(reg) | Op::Decrement(reg) => {
            let old = input.register(reg);
            let v = if matches!(op, Op::Increment(_)) {
                old.wrapping_add(1)
            } else {
                old.wrapping_sub(1)
            };
            out.set_register(reg, v);
            out.flags = Some(set_zero_and_negative(p, v));
        }
        Op::Transfer { from, to } => {
            let v = input.register(from);
            out.set_register(to, v);
            if to != Register::SP {
                out.flags = Some(set_zero_and_negative(p, v));
            }
        }
        Op::Pha => {
            out.sp = Some(input.sp.wrapping_sub(1));
            out.stack = Some(input.a);
        }
        Op::Php => {
            out.sp = Some(input.sp.wrapping_sub(1));
            out.stack = Some(p | flags::RESERVED);
        }
        Op::Pla => {
            out.sp = Some(input.sp.wrapping_add(1));
            out.a = Some(input.stack);
            out.flags = Some(set_zero_and_negative(p, input.stack));
        }
        Op::Plp => {
            out.sp = Some(input.sp.wrapping_add(1));
            out.flags = Some((input.stack & flags::ALL_LATCHED) | (p & flags::RESERVED));
        }
        Op::SetFlag(bit) => out.flags = Some(p | bit),
        Op::ClearFlag(bit) => out.flags = Some(p & !bit),
        Op::Nop => {}
        Op::Jmp => {
            out.pc = input.target;
        }
        Op::Jsr => {
            // pushes the address of its own last byte, high byte first
            let [lo, _] = input.fallthrough.wrapping_sub(1).to_le_bytes();
            out.pc = input.target;
            out.sp = Some(input.sp.wrapping_sub(2));
            out.stack = Some(lo);
        }
        Op::Branch(cond) => out = branch(cond, input),
    }

    log(LogCategory::Synth, LogLevel::Trace, || {
        format!("{:?} on {:?} => {:?}", op, input, out)
    });
    out
}
