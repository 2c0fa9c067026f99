//! Whole-suite properties checked through the public API.

use std::collections::HashSet;

use testgen_core::addressing::AddressingMode;
use testgen_core::config::{Dialect, GeneratorConfig};
use testgen_core::expander::case_count;
use testgen_core::instructions::{find, table, Op};
use testgen_core::logging::{LogCategory, LogConfig, LogLevel};
use testgen_core::synth::{Check, TestUnit};
use testgen_core::{generate_suite, synthesize};

fn all_units() -> Vec<TestUnit> {
    synthesize(&GeneratorConfig::default()).unwrap()
}

#[test]
fn counts_are_domain_product_times_variants() {
    let units = all_units();
    for instr in table() {
        let variants: usize = instr
            .modes
            .iter()
            .map(|e| instr.templates.variant_count(e.mode).unwrap())
            .sum();
        let produced = units.iter().filter(|u| u.mnemonic == instr.mnemonic).count();
        assert_eq!(produced, case_count(instr.domains) * variants, "{}", instr.mnemonic);
    }
}

#[test]
fn generation_is_deterministic() {
    for dialect in [Dialect::Rust, Dialect::C] {
        let config = GeneratorConfig {
            dialect,
            ..GeneratorConfig::default()
        };
        let first = generate_suite(&config).unwrap();
        let second = generate_suite(&config).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn names_are_unique() {
    let units = all_units();
    let names: HashSet<_> = units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names.len(), units.len());
}

#[test]
fn every_unit_checks_flags_once() {
    for unit in all_units() {
        let flag_checks = unit
            .checks
            .iter()
            .filter(|c| matches!(c, Check::Flags { .. }))
            .count();
        assert_eq!(flag_checks, 1, "{}", unit.name);
    }

    let config = GeneratorConfig {
        dialect: Dialect::C,
        ..GeneratorConfig::default()
    };
    let text = generate_suite(&config).unwrap();
    let tests = text.matches("ep_test(").count();
    let unchanged = text
        .matches("ep_verify_equal(cpu.P & ~flag_mask, orig_flags & ~flag_mask);")
        .count();
    assert_eq!(tests, all_units().len());
    assert_eq!(unchanged, tests);
}

#[test]
fn page_crossing_timing() {
    for unit in all_units() {
        let instr = find(unit.mnemonic).unwrap();
        if matches!(instr.op, Op::Branch(_)) {
            continue;
        }
        let base = instr.entry(unit.mode).unwrap().cycles;
        let crossing = unit.name.contains("_xpage");
        let expected = if instr.page_stall && crossing { base + 1 } else { base };
        assert_eq!(unit.cycles, expected, "{}", unit.name);
    }
}

#[test]
fn branch_cycles_depend_on_page_not_sign() {
    let taken: Vec<_> = all_units()
        .into_iter()
        .filter(|u| u.mode == AddressingMode::Relative && u.cycles > 2)
        .collect();
    for backward in [false, true] {
        let cycles: HashSet<_> = taken
            .iter()
            .filter(|u| (u.name.ends_with("_80") || u.name.ends_with("_f0")) == backward)
            .map(|u| u.cycles)
            .collect();
        assert_eq!(cycles, HashSet::from([3, 4]), "backward: {}", backward);
    }
}

#[test]
fn branch_cycles_stay_in_range() {
    for unit in all_units().iter().filter(|u| u.mode == AddressingMode::Relative) {
        assert!((2..=4).contains(&unit.cycles), "{}", unit.name);
        assert!(unit.checks.iter().any(|c| matches!(c, Check::Pc(_))));
    }
}

#[test]
fn ldx_immediate_zero_scenario() {
    let config = GeneratorConfig {
        only: vec!["LDX".to_string()],
        ..GeneratorConfig::default()
    };
    let text = generate_suite(&config).unwrap();
    let start = text.find("fn test_ldx_imm_00()").unwrap();
    let body = &text[start..];
    let body = &body[..body.find("\n}\n").unwrap()];

    assert!(body.contains("(0x0000, &[0xa2, 0x00, 0x02][..]),"));
    assert!(body.contains("assert_eq!(run.cycles - 1, 2);"));
    assert!(body.contains("assert_eq!(cpu.x, 0x00);"));
    assert!(body.contains("let flag_mask: u8 = 0x82;"));
    assert!(body.contains("assert_eq!(cpu.status & flag_mask, 0x02);"));
}

#[test]
fn beq_scenarios() {
    let config = GeneratorConfig {
        only: vec!["BEQ".to_string()],
        dialect: Dialect::C,
        ..GeneratorConfig::default()
    };
    let text = generate_suite(&config).unwrap();
    let body = |name: &str| {
        let start = text.find(&format!("ep_test({})", name)).unwrap();
        let rest = &text[start..];
        rest[..rest.find("\n}\n").unwrap()].to_string()
    };

    let taken = body("test_beq_rel_01_08");
    assert!(taken.contains(
        "    mos6502_store_word(&cpu, 0xfffc, 0xfe);\n\
         \x20   mos6502_store_word(&cpu, 0xfffd, 0x10);\n\
         \x20   mos6502_reset(&cpu);\n\
         \x20   cpu.P |= 0x02;\n"
    ));
    assert!(taken.contains("cpu.P |= 0x02;"));
    assert!(taken.contains("ep_verify_equal(cycles, 3);"));
    assert!(taken.contains("ep_verify_equal((mos_pa_t)(cpu.PC - 1), 0x1108);"));

    let crossing = body("test_beq_rel_01_f0");
    assert!(crossing.contains("ep_verify_equal(cycles, 4);"));

    let forward = body("test_beq_rel_midpage_01_7f");
    assert!(forward.contains("mos6502_store_word(&cpu, 0xfffc, 0x8e);"));
    assert!(forward.contains("ep_verify_equal(cycles, 4);"));
    assert!(forward.contains("ep_verify_equal((mos_pa_t)(cpu.PC - 1), 0x120f);"));

    let same_page = body("test_beq_rel_midpage_01_f0");
    assert!(same_page.contains("ep_verify_equal(cycles, 3);"));

    let not_taken = body("test_beq_rel_00_7f");
    assert!(not_taken.contains("cpu.P &= 0xfd;"));
    assert!(not_taken.contains("ep_verify_equal(cycles, 2);"));
    assert!(not_taken.contains("ep_verify_equal((mos_pa_t)(cpu.PC - 1), 0x1100);"));
}

#[test]
fn logging_to_file() {
    let path = std::env::temp_dir().join("testgen_suite_properties.log");
    std::fs::remove_file(&path).ok();

    let config = LogConfig::global();
    config.set_level(LogCategory::Synth, LogLevel::Debug);
    config.set_log_file(&path).unwrap();

    let only = GeneratorConfig {
        only: vec!["LDX".to_string()],
        ..GeneratorConfig::default()
    };
    generate_suite(&only).unwrap();

    config.clear_log_file();
    config.set_level(LogCategory::Synth, LogLevel::Off);

    let log = std::fs::read_to_string(&path).unwrap();
    assert!(log.contains("[Synth] LDX: 21 units"));
    std::fs::remove_file(&path).ok();
}
