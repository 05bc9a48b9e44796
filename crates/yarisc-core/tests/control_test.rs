//! NOP/HLT semantics, invalid opcodes, and strict-mode diagnostics.

mod common;

use common::TestMachine;
use proptest as _;
use rstest::rstest;
use tempfile as _;
use yarisc_core::{Assembler, ExecutionMode, FeatureLevel, Machine, MachineError, Opcode};

#[test]
fn nop_only_advances_the_instruction_pointer() {
    let word = Assembler::latest().basic(Opcode::Nop).expect("valid NOP");
    let mut current = TestMachine::with_word(word);

    assert_eq!(current.disassemble_instruction(1), "NOP");

    let mut expected = current.clone();
    expected.advance_ip(1);

    assert!(current.execute_instruction().expect("NOP executes"));
    assert_eq!(current, expected);
}

#[test]
fn hlt_stops_execution_with_ip_past_the_instruction() {
    let word = Assembler::latest().basic(Opcode::Hlt).expect("valid HLT");
    let mut current = TestMachine::with_word(word);

    assert_eq!(current.disassemble_instruction(1), "HLT");

    let mut expected = current.clone();
    expected.advance_ip(1);

    let keep_going = current.execute_instruction().expect("HLT executes");
    assert!(!keep_going);
    assert_eq!(current, expected);
}

#[rstest]
#[case(0x0003)]
#[case(0x0005)]
#[case(0x002b)]
#[case(0x002d)]
fn relative_addressing_opcodes_panic(#[case] word: u16) {
    let mut current = TestMachine::with_word(word);

    let error = current.execute_instruction().expect_err("reserved opcode");
    assert_eq!(
        error,
        format!("Invalid instruction 0x{word:04x} at memory location 0x002a")
    );
}

#[test]
fn unassigned_opcodes_panic_with_their_location() {
    let mut current = TestMachine::with_word(0x0020);

    let error = current.execute_instruction().expect_err("unassigned opcode");
    assert_eq!(error, "Invalid instruction 0x0020 at memory location 0x002a");
}

#[rstest]
#[case(0x007f, 0)] // HLT with operand bits
#[case(0x1681, 2)] // MOV r2, r3 with op2 bits
#[case(0xa081, 7)] // MOV immediate form with the assignment flag
#[case(0xc281, 3)] // MOV next-word immediate with st bits
#[case(0xd010, 4)] // ADD next-word immediate with bit 12
#[case(0x806a, 6)] // JMP long with short address bits
#[case(0x016c, 5)] // conditional jump with the unassigned cflag bit
fn strict_mode_reports_reserved_bits_with_reason_codes(#[case] word: u16, #[case] reason: u8) {
    let mut current = TestMachine::with_word(word);

    let error = current.execute_instruction().expect_err("reserved bits");
    assert_eq!(
        error,
        format!("Invalid non-zero bits in instruction 0x{word:04x} (reason: {reason})")
    );
}

#[test]
fn normal_mode_executes_reserved_bit_patterns() {
    // HLT with stray operand bits halts in normal mode
    let mut machine = Machine::new();
    machine.memory_mut().store(0x0, 0x007f);

    let halted = machine
        .execute(ExecutionMode::Normal)
        .expect("normal mode skips the check");
    assert!(halted);
}

#[test]
fn v1_opcodes_panic_at_the_min_feature_level() {
    let mut machine = Machine::with_level(FeatureLevel::Min);
    machine.memory_mut().store(0x0, 0x003e);

    let error = machine
        .execute(ExecutionMode::Normal)
        .expect_err("NOP requires v1");
    assert_eq!(
        error,
        MachineError::Panic(String::from(
            "Invalid instruction 0x003e at memory location 0x0000"
        ))
    );
}

#[test]
fn panics_without_a_debugger_abort_execution() {
    let mut machine = Machine::new();
    machine.memory_mut().store(0x0, 0x0003);

    let error = machine
        .execute(ExecutionMode::Normal)
        .expect_err("panic escapes");
    assert!(matches!(error, MachineError::Panic(_)));
}

#[test]
fn panics_with_a_debugger_stop_as_a_breakpoint() {
    let mut machine = Machine::with_debugger(FeatureLevel::V1);
    machine.memory_mut().store(0x0, 0x0003);

    let halted = machine
        .execute(ExecutionMode::Normal)
        .expect("panic latches on the debugger");
    assert!(!halted);

    let debugger = machine.debugger().expect("debugger attached");
    assert!(debugger.is_panic());
    assert_eq!(
        debugger.message(),
        "Invalid instruction 0x0003 at memory location 0x0000"
    );
}
