//! Single-instruction disassembler.

use std::fmt::Write as _;

use crate::isa::{
    descriptor, reserved_bits_violation, short_cond_jump_address, short_immediate,
    short_jump_address, Optype, ADDR_LOC_MASK, AS_MASK, COND_FLAG_CARRY_MASK, COND_FLAG_ZERO_MASK,
    COND_NEG_MASK, LOC_MASK, OP0_MASK, OP0_OFFSET, OP1_MASK, OP1_OFFSET, OP2_MASK, OP2_OFFSET,
    SEL_MASK,
};
use crate::level::FeatureLevel;
use crate::registers::REGISTER_NAMES;
use crate::word::{Address, Word};

const MNEMONIC_SEP: &str = " ";
const ARGUMENT_SEP: &str = ", ";

/// Result of disassembling an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    /// Number of words consumed (0 if there was an error).
    pub words: usize,
    /// Textual representation of the instruction or the error.
    pub text: String,
}

impl Disassembly {
    fn error(text: String) -> Self {
        Self { words: 0, text }
    }
}

fn invalid_level_error(level: FeatureLevel) -> Disassembly {
    Disassembly::error(format!("Invalid feature level {}", level.as_u16()))
}

fn invalid_opcode_error(instr: Word) -> Disassembly {
    Disassembly::error(format!("Invalid instruction 0x{instr:04x}"))
}

fn invalid_bits_error(instr: Word) -> Disassembly {
    Disassembly::error(format!("Invalid non-zero bits in instruction 0x{instr:04x}"))
}

fn op0_name(instr: Word) -> &'static str {
    REGISTER_NAMES[usize::from((instr & OP0_MASK) >> OP0_OFFSET)]
}

fn op1_name(instr: Word) -> &'static str {
    REGISTER_NAMES[usize::from((instr & OP1_MASK) >> OP1_OFFSET)]
}

fn op2_name(instr: Word) -> &'static str {
    REGISTER_NAMES[usize::from((instr & OP2_MASK) >> OP2_OFFSET)]
}

/// Formats an immediate constant: decimal below 10, minimum-width hex
/// (1, 2, or 4 nibbles) otherwise.
fn format_immediate(imm: Word) -> String {
    if imm < 10 {
        imm.to_string()
    } else if imm < 0x10 {
        format!("0x{imm:x}")
    } else if imm < 0x100 {
        format!("0x{imm:02x}")
    } else {
        format!("0x{imm:04x}")
    }
}

/// Formats a byte address: always full-width hex.
fn format_address(address: Address) -> String {
    format!("0x{address:04x}")
}

fn convert_one_operand(mnemonic: &str, instr: Word) -> Disassembly {
    Disassembly {
        words: 1,
        text: format!("{mnemonic}{MNEMONIC_SEP}{}", op0_name(instr)),
    }
}

fn convert_two_operands(mnemonic: &str, instr: Word, arg: Word) -> Disassembly {
    let mut words = 1;

    let operand = if instr & SEL_MASK != 0 {
        if instr & LOC_MASK != 0 {
            words += 1;
            format_immediate(arg)
        } else {
            format_immediate(short_immediate(instr))
        }
    } else {
        op1_name(instr).to_string()
    };

    Disassembly {
        words,
        text: format!(
            "{mnemonic}{MNEMONIC_SEP}{}{ARGUMENT_SEP}{operand}",
            op0_name(instr)
        ),
    }
}

fn convert_three_operands(mnemonic: &str, instr: Word, arg: Word) -> Disassembly {
    let mut words = 1;

    let (first, second) = if instr & SEL_MASK != 0 {
        let (immediate, reg) = if instr & LOC_MASK != 0 {
            words += 1;
            (format_immediate(arg), op1_name(instr))
        } else {
            (format_immediate(short_immediate(instr)), op0_name(instr))
        };

        if instr & AS_MASK != 0 {
            (reg.to_string(), immediate)
        } else {
            (immediate, reg.to_string())
        }
    } else {
        (op1_name(instr).to_string(), op2_name(instr).to_string())
    };

    Disassembly {
        words,
        text: format!(
            "{mnemonic}{MNEMONIC_SEP}{}{ARGUMENT_SEP}{first}{ARGUMENT_SEP}{second}",
            op0_name(instr)
        ),
    }
}

fn convert_jump_operand(mnemonic: &str, instr: Word, arg: Word) -> Disassembly {
    let mut words = 1;

    let address = if instr & ADDR_LOC_MASK != 0 {
        words += 1;
        format_address(arg)
    } else {
        format_address(short_jump_address(instr))
    };

    Disassembly {
        words,
        text: format!("{mnemonic}{MNEMONIC_SEP}{address}"),
    }
}

fn convert_cond_jump_operand(mnemonic: &str, instr: Word, arg: Word) -> Disassembly {
    let mut words = 1;
    let mut text = String::from(mnemonic);

    text.push(if instr & COND_NEG_MASK != 0 { 'N' } else { 'M' });
    if instr & COND_FLAG_CARRY_MASK != 0 {
        text.push('C');
    }
    if instr & COND_FLAG_ZERO_MASK != 0 {
        text.push('Z');
    }

    let address = if instr & ADDR_LOC_MASK != 0 {
        words += 1;
        format_address(arg)
    } else {
        format_address(short_cond_jump_address(instr))
    };

    let _ = write!(text, "{MNEMONIC_SEP}{address}");

    Disassembly { words, text }
}

/// Disassembles a single instruction.
///
/// `arg` is the word following the instruction word; it is only consulted
/// (and counted in `words`) when the instruction stores an immediate constant
/// or address there.
#[must_use]
pub fn disassemble(instr: Word, arg: Word, level: FeatureLevel) -> Disassembly {
    if level == FeatureLevel::None {
        return invalid_level_error(level);
    }

    let entry = descriptor(instr);

    if !entry.supported(level) {
        return invalid_opcode_error(instr);
    }

    if reserved_bits_violation(instr, entry.optype).is_some() {
        return invalid_bits_error(instr);
    }

    match entry.optype {
        Optype::Basic => Disassembly {
            words: 1,
            text: entry.mnemonic.to_string(),
        },
        Optype::Op0 => convert_one_operand(entry.mnemonic, instr),
        Optype::Op0Op1 => convert_two_operands(entry.mnemonic, instr, arg),
        Optype::Op0Op1Op2 => convert_three_operands(entry.mnemonic, instr, arg),
        Optype::Jump => convert_jump_operand(entry.mnemonic, instr, arg),
        Optype::CondJump => convert_cond_jump_operand(entry.mnemonic, instr, arg),
    }
}
