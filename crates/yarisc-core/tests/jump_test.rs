//! JMP and conditional jump semantics and disassembly.

mod common;

use common::{TestMachine, STATUS_C, STATUS_Z, STATUS_ZC};
use proptest as _;
use rstest::rstest;
use tempfile as _;
use yarisc_core::{
    Assembler, CondJumpTarget, JumpCondition, JumpTarget, Opcode, ShortCondJumpAddress,
    ShortJumpAddress,
};

fn assemble_jmp(target: JumpTarget) -> u16 {
    Assembler::latest()
        .jump(Opcode::Jmp, target)
        .expect("valid JMP encoding")
}

fn assemble_cond(cond: JumpCondition, target: CondJumpTarget) -> u16 {
    Assembler::latest()
        .cond_jump(Opcode::CondJump, cond, target)
        .expect("valid conditional jump encoding")
}

fn short_target(address: u16) -> JumpTarget {
    JumpTarget::Short(ShortJumpAddress::new(address).expect("valid short jump address"))
}

fn short_cond_target(address: u16) -> CondJumpTarget {
    CondJumpTarget::Short(ShortCondJumpAddress::new(address).expect("valid short cond address"))
}

#[rstest]
#[case(0)]
#[case(STATUS_C)]
#[case(STATUS_Z)]
#[case(STATUS_ZC)]
fn jmp_ignores_the_status_flags(#[case] status: u16) {
    let mut current = TestMachine::with_word(assemble_jmp(short_target(0x01fc)));

    assert_eq!(current.disassemble_instruction(1), "JMP 0x01fc");

    current.set_status(status);

    let mut expected = current.clone();
    expected.set_ip(0x01fc);

    assert!(current.execute_instruction().expect("JMP executes"));
    assert_eq!(current, expected);
}

#[test]
fn jmp_sign_extends_negative_short_addresses() {
    let mut current = TestMachine::with_word(assemble_jmp(short_target(0xffe0)));

    assert_eq!(current.disassemble_instruction(1), "JMP 0xffe0");

    let mut expected = current.clone();
    expected.set_ip(0xffe0);

    assert!(current.execute_instruction().expect("JMP executes"));
    assert_eq!(current, expected);
}

#[test]
fn jmp_takes_long_addresses_from_the_following_word() {
    let mut current = TestMachine::with_words(assemble_jmp(JumpTarget::Immediate), 0x6124);

    assert_eq!(current.disassemble_instruction(2), "JMP 0x6124");

    let mut expected = current.clone();
    expected.set_ip(0x6124);

    assert!(current.execute_instruction().expect("JMP executes"));
    assert_eq!(current, expected);
}

#[rstest]
#[case(JumpCondition::Jc, "JMC", 0, false)]
#[case(JumpCondition::Jc, "JMC", STATUS_C, true)]
#[case(JumpCondition::Jc, "JMC", STATUS_Z, false)]
#[case(JumpCondition::Jc, "JMC", STATUS_ZC, true)]
#[case(JumpCondition::Jnc, "JNC", 0, true)]
#[case(JumpCondition::Jnc, "JNC", STATUS_C, false)]
#[case(JumpCondition::Jnc, "JNC", STATUS_Z, true)]
#[case(JumpCondition::Jnc, "JNC", STATUS_ZC, false)]
#[case(JumpCondition::Jz, "JMZ", 0, false)]
#[case(JumpCondition::Jz, "JMZ", STATUS_C, false)]
#[case(JumpCondition::Jz, "JMZ", STATUS_Z, true)]
#[case(JumpCondition::Jz, "JMZ", STATUS_ZC, true)]
#[case(JumpCondition::Jnz, "JNZ", 0, true)]
#[case(JumpCondition::Jnz, "JNZ", STATUS_C, true)]
#[case(JumpCondition::Jnz, "JNZ", STATUS_Z, false)]
#[case(JumpCondition::Jnz, "JNZ", STATUS_ZC, false)]
fn conditional_jumps_follow_the_status_mask(
    #[case] cond: JumpCondition,
    #[case] mnemonic: &str,
    #[case] status: u16,
    #[case] taken: bool,
) {
    let mut current = TestMachine::with_word(assemble_cond(cond, short_cond_target(0x1a)));

    assert_eq!(
        current.disassemble_instruction(1),
        format!("{mnemonic} 0x001a")
    );

    current.set_status(status);

    let mut expected = current.clone();
    if taken {
        expected.set_ip(0x1a);
    } else {
        expected.advance_ip(1);
    }

    assert!(current.execute_instruction().expect("jump executes"));
    assert_eq!(current, expected);
}

#[test]
fn conditional_jumps_sign_extend_negative_short_addresses() {
    let mut current =
        TestMachine::with_word(assemble_cond(JumpCondition::Jc, short_cond_target(0xffe0)));

    assert_eq!(current.disassemble_instruction(1), "JMC 0xffe0");

    current.set_status(STATUS_C);

    let mut expected = current.clone();
    expected.set_ip(0xffe0);

    assert!(current.execute_instruction().expect("jump executes"));
    assert_eq!(current, expected);
}

#[rstest]
#[case(STATUS_C, true)]
#[case(STATUS_Z, false)]
fn conditional_long_jumps_consume_the_following_word(#[case] status: u16, #[case] taken: bool) {
    let mut current = TestMachine::with_words(
        assemble_cond(JumpCondition::Jc, CondJumpTarget::Immediate),
        0x1ff0,
    );

    assert_eq!(current.disassemble_instruction(2), "JMC 0x1ff0");

    current.set_status(status);

    let mut expected = current.clone();
    if taken {
        expected.set_ip(0x1ff0);
    } else {
        expected.advance_ip(2);
    }

    assert!(current.execute_instruction().expect("jump executes"));
    assert_eq!(current, expected);
}

#[test]
fn untaken_jumps_preserve_the_status_register() {
    let mut current =
        TestMachine::with_word(assemble_cond(JumpCondition::Jnz, short_cond_target(0x1a)));

    current.set_status(STATUS_ZC);

    let mut expected = current.clone();
    expected.advance_ip(1);

    assert!(current.execute_instruction().expect("jump executes"));
    assert_eq!(current, expected);
}
