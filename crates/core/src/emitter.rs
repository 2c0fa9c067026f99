//! Assertion emitter.
//!
//! Renders synthesized [`TestUnit`]s as suite source text. Each dialect is a
//! [`SuiteWriter`]; both start with a provenance comment and write units in
//! the order they are given.

use std::fmt::{self, Write};

use crate::config::{Dialect, GeneratorConfig};
use crate::error::GenerateError;
use crate::logging::{log, LogCategory, LogLevel};
use crate::model::Register;
use crate::synth::{Check, Setup, TestUnit};

/// One output dialect.
pub trait SuiteWriter {
    /// File header: provenance comment and imports.
    fn begin(&mut self, out: &mut dyn Write, provenance: &str) -> fmt::Result;

    /// One self-contained test.
    fn unit(&mut self, out: &mut dyn Write, unit: &TestUnit) -> fmt::Result;

    fn end(&mut self, _out: &mut dyn Write) -> fmt::Result {
        Ok(())
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{:02x}", b))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `#[test]` functions against a harness module exposing `TestCpu`.
///
/// The harness contract: `TestCpu::new(&[(u16, &[u8])])` builds a reset
/// fixture; `a x y sp status pc` are public fields; `load`/`store` access
/// memory; `run_to_halt()` returns `cycles` and `retired`.
pub struct RustWriter {
    harness: String,
}

impl RustWriter {
    pub fn new(harness: impl Into<String>) -> Self {
        Self {
            harness: harness.into(),
        }
    }

    fn field(reg: Register) -> &'static str {
        match reg {
            Register::A => "a",
            Register::X => "x",
            Register::Y => "y",
            Register::SP => "sp",
            Register::PC => "pc",
        }
    }
}

impl SuiteWriter for RustWriter {
    fn begin(&mut self, out: &mut dyn Write, provenance: &str) -> fmt::Result {
        writeln!(out, "// This file is auto-generated by {}. Do not edit.", provenance)?;
        writeln!(out)?;
        writeln!(out, "use {}::TestCpu;", self.harness)?;
        writeln!(out)
    }

    fn unit(&mut self, out: &mut dyn Write, unit: &TestUnit) -> fmt::Result {
        writeln!(out, "#[test]")?;
        writeln!(out, "fn {}() {{", unit.name)?;
        writeln!(out, "    let mut cpu = TestCpu::new(&[")?;
        for seg in &unit.segments {
            writeln!(out, "        (0x{:04x}, &[{}][..]),", seg.base, hex_bytes(&seg.bytes))?;
        }
        writeln!(out, "    ]);")?;

        for setup in &unit.setup {
            match *setup {
                Setup::Origin(addr) => writeln!(out, "    cpu.pc = 0x{:04x};", addr)?,
                Setup::Register(reg, v) => writeln!(out, "    cpu.{} = 0x{:02x};", Self::field(reg), v)?,
                Setup::Status(v) => writeln!(out, "    cpu.status = 0x{:02x};", v)?,
                Setup::Flag { bit, set: true } => writeln!(out, "    cpu.status |= 0x{:02x};", bit)?,
                Setup::Flag { bit, set: false } => writeln!(out, "    cpu.status &= 0x{:02x};", !bit)?,
                Setup::Store(addr, v) => writeln!(out, "    cpu.store(0x{:04x}, 0x{:02x});", addr, v)?,
            }
        }
        writeln!(out)?;
        writeln!(out, "    let orig_flags = cpu.status;")?;
        writeln!(out, "    let run = cpu.run_to_halt();")?;
        writeln!(out, "    // one cycle belongs to the halt marker")?;
        writeln!(out, "    assert_eq!(run.cycles - 1, {});", unit.cycles)?;
        writeln!(out, "    assert_eq!(run.retired, 2);")?;
        writeln!(out)?;

        for check in &unit.checks {
            match *check {
                Check::Register(reg, v) => {
                    writeln!(out, "    assert_eq!(cpu.{}, 0x{:02x});", Self::field(reg), v)?
                }
                Check::Memory(addr, v) => writeln!(out, "    assert_eq!(cpu.load(0x{:04x}), 0x{:02x});", addr, v)?,
                Check::Stack(v) => writeln!(
                    out,
                    "    assert_eq!(cpu.load(0x0100 | cpu.sp.wrapping_add(1) as u16), 0x{:02x});",
                    v
                )?,
                Check::Pc(addr) => writeln!(out, "    assert_eq!(cpu.pc.wrapping_sub(1), 0x{:04x});", addr)?,
                Check::Flags { mask, value } => {
                    writeln!(out, "    let flag_mask: u8 = 0x{:02x};", mask)?;
                    writeln!(out, "    assert_eq!(cpu.status & flag_mask, 0x{:02x});", value)?;
                    writeln!(out, "    assert_eq!(cpu.status & !flag_mask, orig_flags & !flag_mask);")?;
                }
            }
        }
        writeln!(out, "}}")?;
        writeln!(out)
    }
}

/// `ep_test` functions against the C harness (`init_test_cpu`,
/// `run_test_cpu`, `ep_verify_equal`).
#[derive(Debug, Default)]
pub struct CWriter;

impl CWriter {
    fn field(reg: Register) -> &'static str {
        reg.name()
    }
}

impl SuiteWriter for CWriter {
    fn begin(&mut self, out: &mut dyn Write, provenance: &str) -> fmt::Result {
        writeln!(out, "/* This file is auto-generated by {} */", provenance)?;
        writeln!(out)
    }

    fn unit(&mut self, out: &mut dyn Write, unit: &TestUnit) -> fmt::Result {
        writeln!(out, "ep_test({})", unit.name)?;
        writeln!(out, "{{")?;
        writeln!(out, "    const struct test_ram_segment segments[] = {{")?;
        for seg in &unit.segments {
            writeln!(
                out,
                "        MAKE_TEST_SEGMENT_VEC(0x{:04x}, {{{}}}),",
                seg.base,
                hex_bytes(&seg.bytes)
            )?;
        }
        writeln!(out, "    }};")?;
        writeln!(out)?;
        writeln!(out, "    struct mos6502_cpu cpu;")?;
        writeln!(out, "    init_test_cpu(&cpu, segments, {});", unit.segments.len())?;
        writeln!(out)?;

        for setup in &unit.setup {
            match *setup {
                // init_test_cpu clears the vector and has already fetched from $0000
                Setup::Origin(addr) => {
                    let [lo, hi] = addr.to_le_bytes();
                    writeln!(out, "    mos6502_store_word(&cpu, 0xfffc, 0x{:02x});", lo)?;
                    writeln!(out, "    mos6502_store_word(&cpu, 0xfffd, 0x{:02x});", hi)?;
                    writeln!(out, "    mos6502_reset(&cpu);")?;
                }
                Setup::Register(reg, v) => writeln!(out, "    cpu.{} = 0x{:02x};", Self::field(reg), v)?,
                Setup::Status(v) => writeln!(out, "    cpu.P = 0x{:02x};", v)?,
                Setup::Flag { bit, set: true } => writeln!(out, "    cpu.P |= 0x{:02x};", bit)?,
                Setup::Flag { bit, set: false } => writeln!(out, "    cpu.P &= 0x{:02x};", !bit)?,
                Setup::Store(addr, v) => {
                    writeln!(out, "    mos6502_store_word(&cpu, 0x{:04x}, 0x{:02x});", addr, v)?
                }
            }
        }
        writeln!(out, "    mos_word_t orig_flags = cpu.P;")?;
        writeln!(
            out,
            "    uint64_t cycles = run_test_cpu(&cpu) - 1 /* Subtract 1 cycle for HLT */;"
        )?;
        writeln!(out)?;
        writeln!(out, "    ep_verify_equal(cycles, {});", unit.cycles)?;
        writeln!(out, "    ep_verify_equal(cpu.total_retired, 2);")?;

        for check in &unit.checks {
            match *check {
                Check::Register(reg, v) => {
                    writeln!(out, "    ep_verify_equal(cpu.{}, 0x{:02x});", Self::field(reg), v)?
                }
                Check::Memory(addr, v) => writeln!(
                    out,
                    "    ep_verify_equal(mos6502_load_word(&cpu, 0x{:04x}), 0x{:02x});",
                    addr, v
                )?,
                Check::Stack(v) => writeln!(
                    out,
                    "    ep_verify_equal(mos6502_load_word(&cpu, 0x0100 | (mos_word_t)(cpu.SP + 1)), 0x{:02x});",
                    v
                )?,
                Check::Pc(addr) => {
                    writeln!(out, "    ep_verify_equal((mos_pa_t)(cpu.PC - 1), 0x{:04x});", addr)?
                }
                Check::Flags { mask, value } => {
                    writeln!(out)?;
                    writeln!(out, "    mos_word_t flag_mask = 0x{:02x};", mask)?;
                    writeln!(out, "    ep_verify_equal(cpu.P & flag_mask, 0x{:02x});", value)?;
                    writeln!(
                        out,
                        "    ep_verify_equal(cpu.P & ~flag_mask, orig_flags & ~flag_mask);"
                    )?;
                }
            }
        }
        writeln!(out)?;
        writeln!(out, "    free_test_cpu(&cpu);")?;
        writeln!(out, "}}")?;
        writeln!(out)
    }
}

/// Writer for the configured dialect.
pub fn writer_for(config: &GeneratorConfig) -> Box<dyn SuiteWriter> {
    match config.dialect {
        Dialect::Rust => Box::new(RustWriter::new(config.harness.clone())),
        Dialect::C => Box::new(CWriter),
    }
}

/// Render `units` into one suite string.
pub fn render(units: &[TestUnit], config: &GeneratorConfig) -> Result<String, GenerateError> {
    let mut writer = writer_for(config);
    let mut out = String::new();
    writer.begin(&mut out, &config.provenance)?;
    for unit in units {
        writer.unit(&mut out, unit)?;
    }
    writer.end(&mut out)?;

    log(LogCategory::Emitter, LogLevel::Info, || {
        format!("rendered {} units ({} bytes, {:?})", units.len(), out.len(), config.dialect)
    });
    Ok(out)
}
