//! Addressing-mode template catalog
//!
//! Every addressing mode maps to one or more code layouts that exercise it.
//! A layout is a list of memory segments (program image plus any operand
//! bytes), the register presets needed to reach the intended effective
//! address, and the bookkeeping the synthesizer needs afterwards: where the
//! operand cell lives, whether the access crosses a page and where the halt
//! markers sit.
//!
//! Layouts come in two disjoint template sets. The data set covers all
//! data-addressing modes; the control set covers absolute jump, indirect jump
//! and relative branch, whose memory layout has nothing in common with data
//! accesses.

use crate::logging::{log, LogCategory, LogLevel};
use crate::model::{Register, HLT_MARKER};
use serde::Serialize;
use std::fmt;

/// Operand cell filler used when the instruction declares no `Memory`
/// domain, so that a store is never a silent no-op.
pub const SCRATCH_FILL: u8 = 0xA5;

/// Where relative branches are assembled. The fall-through halt marker then
/// sits on a page start, so a negative displacement always crosses a page.
pub const BRANCH_ORIGIN: u16 = 0x10FE;

/// Second branch layout with the fall-through at `$1190`: a forward `$7F`
/// crosses into the next page, a backward `$F0` stays on the same page.
pub const BRANCH_MIDPAGE_ORIGIN: u16 = 0x118E;

/// Reset vector location.
pub const RESET_VECTOR: u16 = 0xFFFC;

const JUMP_TARGET: u16 = 0x1000;
const JUMP_POINTER: u16 = 0x2000;
const DECOY_TARGET: u16 = 0x3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AddressingMode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Implied,
    Accumulator,
    Relative,
}

impl AddressingMode {
    /// Short identifier used in generated test names.
    pub fn id(self) -> &'static str {
        match self {
            AddressingMode::Immediate => "imm",
            AddressingMode::ZeroPage => "zpage",
            AddressingMode::ZeroPageX => "zpagex",
            AddressingMode::ZeroPageY => "zpagey",
            AddressingMode::Absolute => "abs",
            AddressingMode::AbsoluteX => "absx",
            AddressingMode::AbsoluteY => "absy",
            AddressingMode::Indirect => "ind",
            AddressingMode::IndirectX => "indx",
            AddressingMode::IndirectY => "indy",
            AddressingMode::Implied => "impl",
            AddressingMode::Accumulator => "acc",
            AddressingMode::Relative => "rel",
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Location of the value an instruction reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandCell {
    /// No operand (implied, control transfers).
    None,
    /// Immediate byte inside the instruction; readable but never asserted.
    Immediate(u16),
    /// Effective address in memory.
    Memory(u16),
    /// The accumulator stands in for memory.
    Accumulator,
}

impl OperandCell {
    /// Whether a `Memory` operand value has somewhere to go.
    pub fn accepts_value(self) -> bool {
        !matches!(self, OperandCell::None)
    }

    /// Whether a final `Memory` value can be asserted.
    pub fn is_assertable(self) -> bool {
        matches!(self, OperandCell::Memory(_) | OperandCell::Accumulator)
    }
}

/// `(base address, bytes)` written into the fixture before reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub base: u16,
    pub bytes: Vec<u8>,
}

/// One concrete code layout for one addressing mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTemplate {
    pub segments: Vec<Segment>,
    /// Applied after the test case's own register values.
    pub presets: Vec<(Register, u8)>,
    pub tag: Option<&'static str>,
    pub cell: OperandCell,
    pub crosses_page: bool,
    /// Address of the instruction under test.
    pub origin: u16,
    /// Halt marker right after the instruction.
    pub fallthrough: u16,
    /// Landing marker of a control transfer.
    pub target: Option<u16>,
}

impl CodeTemplate {
    /// Lay out `instr` at address zero followed by the halt marker.
    fn program(instr: &[u8]) -> Self {
        Self::program_at(0x0000, instr)
    }

    /// Lay out `instr` at `origin` followed by the halt marker. A non-zero
    /// origin also writes the reset vector.
    fn program_at(origin: u16, instr: &[u8]) -> Self {
        let mut bytes = instr.to_vec();
        bytes.push(HLT_MARKER);
        let mut segments = vec![Segment {
            base: origin,
            bytes,
        }];
        if origin != 0 {
            segments.push(Segment {
                base: RESET_VECTOR,
                bytes: vec![(origin & 0xFF) as u8, (origin >> 8) as u8],
            });
        }
        Self {
            segments,
            presets: Vec::new(),
            tag: None,
            cell: OperandCell::None,
            crosses_page: false,
            origin,
            fallthrough: origin.wrapping_add(instr.len() as u16),
            target: None,
        }
    }

    /// Append bytes right after the fall-through halt marker.
    fn trailing(mut self, bytes: &[u8]) -> Self {
        self.segments[0].bytes.extend_from_slice(bytes);
        self
    }

    fn segment(mut self, base: u16, bytes: &[u8]) -> Self {
        self.segments.push(Segment {
            base,
            bytes: bytes.to_vec(),
        });
        self
    }

    fn preset(mut self, reg: Register, val: u8) -> Self {
        self.presets.push((reg, val));
        self
    }

    fn tagged(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    fn cell(mut self, cell: OperandCell) -> Self {
        self.cell = cell;
        self
    }

    fn crossing(mut self) -> Self {
        self.crosses_page = true;
        self
    }

    fn landing(mut self, target: u16) -> Self {
        self.target = Some(target);
        self.segment(target, &[HLT_MARKER])
    }

    /// Whether `addr` falls on one of the instruction's own bytes.
    pub fn overlaps_instruction(&self, addr: u16) -> bool {
        addr.wrapping_sub(self.origin) < self.fallthrough.wrapping_sub(self.origin)
    }
}

/// Family of layouts an instruction draws its templates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemplateSet {
    /// Loads, stores, ALU, read-modify-write, stack and implied instructions.
    Data,
    /// Absolute jump (destination holds its own halt marker), indirect jump
    /// (pointer resolving to the destination) and relative branch (landing
    /// marker at the literal offset).
    Control,
}

impl TemplateSet {
    /// Templates for `mode`, or `None` when this set has no layout for it.
    ///
    /// `value` is the operand byte: the operand cell contents for data modes,
    /// the displacement for relative branches.
    pub fn templates(self, mode: AddressingMode, opcode: u8, value: u8) -> Option<Vec<CodeTemplate>> {
        let templates = match (self, mode) {
            (TemplateSet::Data, _) => data_templates(mode, opcode, value),
            (TemplateSet::Control, AddressingMode::Absolute) => Some(jump_templates(opcode)),
            (TemplateSet::Control, AddressingMode::Indirect) => Some(indirect_jump_templates(opcode)),
            (TemplateSet::Control, AddressingMode::Relative) => Some(branch_templates(opcode, value)),
            (TemplateSet::Control, _) => None,
        };
        if templates.is_none() {
            log(LogCategory::Catalog, LogLevel::Debug, || {
                format!("{:?} set has no template for mode {}", self, mode)
            });
        }
        templates
    }

    /// Number of variants for `mode`, without building them.
    pub fn variant_count(self, mode: AddressingMode) -> Option<usize> {
        self.templates(mode, 0x00, 0x00).map(|t| t.len())
    }
}

fn data_templates(mode: AddressingMode, op: u8, val: u8) -> Option<Vec<CodeTemplate>> {
    use AddressingMode::*;
    use Register::{X, Y};

    let templates = match mode {
        Immediate => vec![CodeTemplate::program(&[op, val]).cell(OperandCell::Immediate(0x0001))],
        Implied => vec![CodeTemplate::program(&[op])],
        Accumulator => vec![CodeTemplate::program(&[op])
            .preset(Register::A, val)
            .cell(OperandCell::Accumulator)],
        ZeroPage => vec![CodeTemplate::program(&[op, 0x03])
            .trailing(&[val])
            .cell(OperandCell::Memory(0x0003))],
        ZeroPageX | ZeroPageY => {
            let index = if mode == ZeroPageX { X } else { Y };
            vec![
                CodeTemplate::program(&[op, 0x02])
                    .trailing(&[val])
                    .preset(index, 0x01)
                    .cell(OperandCell::Memory(0x0003)),
                // $FF + 4 wraps around inside the zero page
                CodeTemplate::program(&[op, 0xFF])
                    .trailing(&[val])
                    .preset(index, 0x04)
                    .tagged("overflow")
                    .cell(OperandCell::Memory(0x0003)),
            ]
        }
        Absolute => vec![CodeTemplate::program(&[op, 0x01, 0x10])
            .segment(0x1001, &[val])
            .cell(OperandCell::Memory(0x1001))],
        AbsoluteX | AbsoluteY => {
            let index = if mode == AbsoluteX { X } else { Y };
            vec![
                CodeTemplate::program(&[op, 0x00, 0x10])
                    .segment(0x1001, &[val])
                    .preset(index, 0x01)
                    .cell(OperandCell::Memory(0x1001)),
                CodeTemplate::program(&[op, 0xFF, 0x0F])
                    .segment(0x1001, &[val])
                    .preset(index, 0x02)
                    .tagged("xpage")
                    .cell(OperandCell::Memory(0x1001))
                    .crossing(),
            ]
        }
        IndirectX => vec![
            CodeTemplate::program(&[op, 0x02])
                .trailing(&[0x80, 0x00])
                .segment(0x0080, &[val])
                .preset(X, 0x01)
                .cell(OperandCell::Memory(0x0080)),
            // pointer index $FF + 4 wraps to $03
            CodeTemplate::program(&[op, 0xFF])
                .trailing(&[0x80, 0x00])
                .segment(0x0080, &[val])
                .preset(X, 0x04)
                .tagged("overflow")
                .cell(OperandCell::Memory(0x0080)),
        ],
        IndirectY => vec![
            CodeTemplate::program(&[op, 0x03])
                .trailing(&[0x80, 0x10])
                .segment(0x1084, &[val])
                .preset(Y, 0x04)
                .cell(OperandCell::Memory(0x1084)),
            CodeTemplate::program(&[op, 0x03])
                .trailing(&[0x80, 0x10])
                .segment(0x1100, &[val])
                .preset(Y, 0x80)
                .tagged("xpage")
                .cell(OperandCell::Memory(0x1100))
                .crossing(),
        ],
        Indirect | Relative => return None,
    };
    Some(templates)
}

fn jump_templates(op: u8) -> Vec<CodeTemplate> {
    let [lo, hi] = JUMP_TARGET.to_le_bytes();
    vec![CodeTemplate::program(&[op, lo, hi]).landing(JUMP_TARGET)]
}

fn indirect_jump_templates(op: u8) -> Vec<CodeTemplate> {
    let [ptr_lo, ptr_hi] = JUMP_POINTER.to_le_bytes();
    let [lo, hi] = JUMP_TARGET.to_le_bytes();
    let wrap_ptr = JUMP_POINTER | 0x00FF;
    let [wrap_lo, wrap_hi] = wrap_ptr.to_le_bytes();
    vec![
        CodeTemplate::program(&[op, ptr_lo, ptr_hi])
            .segment(JUMP_POINTER, &[lo, hi])
            .landing(JUMP_TARGET),
        // NMOS parts fetch the pointer's high byte from the start of the same
        // page; the byte after the page holds a decoy leading to a second halt.
        CodeTemplate::program(&[op, wrap_lo, wrap_hi])
            .segment(wrap_ptr, &[lo])
            .segment(JUMP_POINTER, &[hi])
            .segment(wrap_ptr.wrapping_add(1), &[(DECOY_TARGET >> 8) as u8])
            .segment(DECOY_TARGET, &[HLT_MARKER])
            .tagged("ptrwrap")
            .landing(JUMP_TARGET),
    ]
}

fn branch_templates(op: u8, disp: u8) -> Vec<CodeTemplate> {
    let at = |origin: u16| {
        let template = CodeTemplate::program_at(origin, &[op, disp]);
        let target = template.fallthrough.wrapping_add(disp as i8 as u16);
        template.landing(target)
    };
    vec![at(BRANCH_ORIGIN), at(BRANCH_MIDPAGE_ORIGIN).tagged("midpage")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_layout() {
        let t = TemplateSet::Data
            .templates(AddressingMode::Immediate, 0xA9, 0x42)
            .unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].segments[0].bytes, vec![0xA9, 0x42, HLT_MARKER]);
        assert_eq!(t[0].fallthrough, 0x0002);
        assert!(!t[0].cell.is_assertable());
    }

    #[test]
    fn zero_page_x_wraps_inside_zero_page() {
        let t = TemplateSet::Data
            .templates(AddressingMode::ZeroPageX, 0xB5, 0x99)
            .unwrap();
        assert_eq!(t.len(), 2);
        let wrap = &t[1];
        assert_eq!(wrap.tag, Some("overflow"));
        let base = wrap.segments[0].bytes[1];
        let (_, x) = wrap.presets[0];
        assert_eq!(base.wrapping_add(x) as u16, 0x0003);
        assert_eq!(wrap.cell, OperandCell::Memory(0x0003));
        assert_eq!(wrap.segments[0].bytes[3], 0x99);
    }

    #[test]
    fn absolute_indexed_crossing_variant() {
        let t = TemplateSet::Data
            .templates(AddressingMode::AbsoluteY, 0xB9, 0x10)
            .unwrap();
        assert!(!t[0].crosses_page);
        assert!(t[1].crosses_page);
        assert_eq!(t[1].tag, Some("xpage"));
        let bytes = &t[1].segments[0].bytes;
        let base = u16::from_le_bytes([bytes[1], bytes[2]]);
        let (reg, y) = t[1].presets[0];
        assert_eq!(reg, Register::Y);
        assert_eq!(base + y as u16, 0x1001);
        assert_ne!(base & 0xFF00, 0x1001 & 0xFF00);
    }

    #[test]
    fn indirect_y_crossing_variant() {
        let t = TemplateSet::Data
            .templates(AddressingMode::IndirectY, 0xB1, 0x10)
            .unwrap();
        assert_eq!(t[0].cell, OperandCell::Memory(0x1084));
        assert_eq!(t[1].cell, OperandCell::Memory(0x1100));
        assert!(t[1].crosses_page);
    }

    #[test]
    fn accumulator_presets_a() {
        let t = TemplateSet::Data
            .templates(AddressingMode::Accumulator, 0x0A, 0x81)
            .unwrap();
        assert_eq!(t[0].presets, vec![(Register::A, 0x81)]);
        assert_eq!(t[0].cell, OperandCell::Accumulator);
    }

    #[test]
    fn data_set_has_no_control_transfer_modes() {
        assert!(TemplateSet::Data
            .templates(AddressingMode::Relative, 0xF0, 0x08)
            .is_none());
        assert!(TemplateSet::Data
            .templates(AddressingMode::Indirect, 0x6C, 0x00)
            .is_none());
        assert!(TemplateSet::Control
            .templates(AddressingMode::Immediate, 0x4C, 0x00)
            .is_none());
    }

    #[test]
    fn jump_places_halt_at_destination() {
        let t = TemplateSet::Control
            .templates(AddressingMode::Absolute, 0x4C, 0x00)
            .unwrap();
        assert_eq!(t[0].target, Some(0x1000));
        assert!(t[0]
            .segments
            .iter()
            .any(|s| s.base == 0x1000 && s.bytes == vec![HLT_MARKER]));
    }

    #[test]
    fn indirect_jump_pointer_wrap_variant() {
        let t = TemplateSet::Control
            .templates(AddressingMode::Indirect, 0x6C, 0x00)
            .unwrap();
        assert_eq!(t.len(), 2);
        let wrap = &t[1];
        assert_eq!(wrap.tag, Some("ptrwrap"));
        let lo = wrap.segments.iter().find(|s| s.base == 0x20FF).unwrap();
        let hi = wrap.segments.iter().find(|s| s.base == 0x2000).unwrap();
        assert_eq!(u16::from_le_bytes([lo.bytes[0], hi.bytes[0]]), 0x1000);
    }

    #[test]
    fn branch_layout_and_vector() {
        let t = TemplateSet::Control
            .templates(AddressingMode::Relative, 0xF0, 0x08)
            .unwrap();
        let t = &t[0];
        assert_eq!(t.origin, 0x10FE);
        assert_eq!(t.fallthrough, 0x1100);
        assert_eq!(t.target, Some(0x1108));
        assert!(t
            .segments
            .iter()
            .any(|s| s.base == RESET_VECTOR && s.bytes == vec![0xFE, 0x10]));
    }

    #[test]
    fn branch_backwards_lands_on_previous_page() {
        let t = TemplateSet::Control
            .templates(AddressingMode::Relative, 0xF0, 0xF0)
            .unwrap();
        assert_eq!(t[0].target, Some(0x10F0));
        assert!(!t[0].overlaps_instruction(0x10F0));
        assert!(t[0].overlaps_instruction(0x10FF));
        assert!(t[0].overlaps_instruction(0x10FE));
        assert!(!t[0].overlaps_instruction(0x1100));
    }

    #[test]
    fn midpage_branch_crosses_forward_only() {
        let forward = TemplateSet::Control
            .templates(AddressingMode::Relative, 0xF0, 0x7F)
            .unwrap();
        assert_eq!(forward.len(), 2);
        let mid = &forward[1];
        assert_eq!(mid.tag, Some("midpage"));
        assert_eq!(mid.fallthrough, 0x1190);
        assert_eq!(mid.target, Some(0x120F));
        assert!(mid
            .segments
            .iter()
            .any(|s| s.base == RESET_VECTOR && s.bytes == vec![0x8E, 0x11]));

        let backward = TemplateSet::Control
            .templates(AddressingMode::Relative, 0xF0, 0xF0)
            .unwrap();
        assert_eq!(backward[1].target, Some(0x1180));
        assert!(!backward[1].overlaps_instruction(0x1180));
    }

    #[test]
    fn variant_counts() {
        assert_eq!(TemplateSet::Data.variant_count(AddressingMode::Absolute), Some(1));
        assert_eq!(TemplateSet::Data.variant_count(AddressingMode::AbsoluteX), Some(2));
        assert_eq!(TemplateSet::Control.variant_count(AddressingMode::Indirect), Some(2));
        assert_eq!(TemplateSet::Control.variant_count(AddressingMode::Relative), Some(2));
        assert_eq!(TemplateSet::Control.variant_count(AddressingMode::Immediate), None);
    }
}
