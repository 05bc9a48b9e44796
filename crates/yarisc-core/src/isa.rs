//! Instruction word layout and the opcode table.
//!
//! All instructions other than jumps may have zero to three operands. These
//! instructions have the following layout:
//!
//! ```text
//! [15] [14-9] [8-6] [5-0]
//! sel   ops    op0  opcode
//! ```
//!
//! The `sel` flag selects register or immediate constant mode.
//!
//! `sel == 0` selects register mode; the operands `op1` and `op2` are 3-bit
//! register addresses inside `ops`:
//!
//! ```text
//! [14-12] [11-9]
//!   op2    op1
//! ```
//!
//! `sel == 1` selects immediate constant mode with `ops` laid out as:
//!
//! ```text
//! [14] [13] [12-9]
//! loc   as    st
//! ```
//!
//! The location flag `loc` selects where the constant is stored: `loc == 0`
//! in the 4-bit `st` field (bit 3 is the sign, so the representable values
//! are -8..=7), `loc == 1` in the word following the instruction word. The
//! assignment flag `as` selects which operand the constant becomes: `op1`
//! when clear, `op2` when set. The remaining register operand is `op0` when
//! `loc == 0` and the register named by bits [11-9] when `loc == 1` (bit [12]
//! must then be zero).
//!
//! Jump instructions have a different layout:
//!
//! ```text
//! [15] [14-6] [5-0]
//! aloc  addr  opcode
//! ```
//!
//! `aloc == 0` stores a short address in `addr`, counted in words with the
//! sign in bit [14]; `aloc == 1` takes the byte address from the following
//! word. Conditional jumps additionally carry condition flags:
//!
//! ```text
//! [15] [14] [13-9] [8-6] [5-0]
//! aloc cneg caddr  cflag opcode
//! ```
//!
//! The jump is taken when `status & cflag != 0`, inverted by `cneg`. Bit [8]
//! of `cflag` must be zero.

use crate::level::FeatureLevel;
use crate::word::Word;

/// Instruction opcode mask.
pub const OPCODE_MASK: Word = 0b0000_0000_0011_1111;

/// Mask covering all operand bits.
pub const OPERAND_MASK: Word = 0b1111_1111_1100_0000;

/// Mask for the `op0` register.
pub const OP0_MASK: Word = 0b0000_0001_1100_0000;
/// Mask for the `op1` register.
pub const OP1_MASK: Word = 0b0000_1110_0000_0000;
/// Mask for the `op2` register.
pub const OP2_MASK: Word = 0b0111_0000_0000_0000;

/// Mask for the `sel` flag.
pub const SEL_MASK: Word = 0b1000_0000_0000_0000;
/// Mask for the `loc` flag.
pub const LOC_MASK: Word = 0b0100_0000_0000_0000;
/// Mask for the `as` flag.
pub const AS_MASK: Word = 0b0010_0000_0000_0000;
/// Mask for the `st` short immediate field.
pub const ST_MASK: Word = 0b0001_1110_0000_0000;
/// Sign bit of the `st` short immediate field (relative to the value).
pub const ST_SIGN_MASK: Word = 0x0008;

/// Bit pattern selecting an immediate constant in the next word.
pub const IMM_MASK: Word = SEL_MASK | LOC_MASK;
/// Bit that has no meaning when the immediate constant is in the next word.
pub const IMM_UNASSIGNED_MASK: Word = 0b0001_0000_0000_0000;
/// Bit combination that forms an invalid three-operand instruction word.
pub const IMM_INVALID_MASK: Word = IMM_MASK | IMM_UNASSIGNED_MASK;

/// Offset in bits of the `op0` register.
pub const OP0_OFFSET: usize = 6;
/// Offset in bits of the `op1` register.
pub const OP1_OFFSET: usize = 9;
/// Offset in bits of the `op2` register.
pub const OP2_OFFSET: usize = 12;
/// Offset in bits of the `st` field.
pub const ST_OFFSET: usize = 9;
/// Offset in bits of the `as` flag.
pub const AS_OFFSET: usize = 13;

/// Mask for the jump address `addr`.
pub const ADDR_MASK: Word = 0b0111_1111_1100_0000;
/// Mask for the `aloc` flag.
pub const ADDR_LOC_MASK: Word = 0b1000_0000_0000_0000;
/// Offset in bits of the jump address `addr`.
pub const ADDR_OFFSET: usize = 6;
/// Shift used when decoding `addr`, accounting for word-counted addresses.
pub const ADDR_WORD_OFFSET: usize = ADDR_OFFSET - 1;
/// Sign bit of the decoded short jump byte address.
pub const ADDR_SIGN_MASK: Word = 0x0200;

/// Mask for the conditional jump `cflag` field.
pub const COND_FLAG_MASK: Word = 0b0000_0000_1100_0000;
/// Carry bit inside `cflag`.
pub const COND_FLAG_CARRY_MASK: Word = 0b0000_0000_0100_0000;
/// Zero bit inside `cflag`.
pub const COND_FLAG_ZERO_MASK: Word = 0b0000_0000_1000_0000;
/// Currently unassigned `cflag` bit; must be zero.
pub const COND_UNASSIGNED_MASK: Word = 0b0000_0001_0000_0000;
/// Bit combination that forms an invalid conditional jump word.
pub const COND_INVALID_MASK: Word = COND_UNASSIGNED_MASK;
/// Mask for the conditional jump address `caddr`.
pub const COND_ADDR_MASK: Word = 0b0011_1110_0000_0000;
/// Mask for the `cneg` flag.
pub const COND_NEG_MASK: Word = 0b0100_0000_0000_0000;
/// Offset in bits of the `cflag` field.
pub const COND_FLAG_OFFSET: usize = 6;
/// Offset in bits of the address `caddr`.
pub const COND_ADDR_OFFSET: usize = 9;
/// Shift used when decoding `caddr`, accounting for word-counted addresses.
pub const COND_ADDR_WORD_OFFSET: usize = COND_ADDR_OFFSET - 1;
/// Sign bit of the decoded short conditional jump byte address.
pub const COND_ADDR_SIGN_MASK: Word = 0x0020;

/// Instruction opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Moves `op1` or an immediate constant into register `op0`. Updates the
    /// zero flag.
    Mov = 0x01,
    /// Loads from the address `op1` or an immediate address into register
    /// `op0`. Updates the zero flag.
    Ldr = 0x02,
    /// Stores the value of register `op0` to the address `op1` or an
    /// immediate address.
    Str = 0x04,
    /// Adds `op1` and `op2` and stores the result in register `op0`. Updates
    /// the zero and carry flags.
    Add = 0x10,
    /// Adds `op1`, `op2`, and the carry flag and stores the result in
    /// register `op0`. Updates the zero and carry flags.
    Adc = 0x11,
    /// Unconditional jump to an immediate address.
    Jmp = 0x2a,
    /// Conditional jump (JMC/JNC/JMZ/JNZ) selected by a status bitmask and a
    /// negate flag.
    CondJump = 0x2c,
    /// No operation.
    Nop = 0x3e,
    /// Halts the processor.
    Hlt = 0x3f,
}

impl Opcode {
    /// Extracts the opcode of an instruction word.
    ///
    /// `None` means the opcode slot is unassigned at every feature level.
    /// The slots `0x03`, `0x05`, `0x2b`, and `0x2d` are reserved for
    /// instruction-pointer relative addressing and are rejected as well.
    #[must_use]
    pub const fn from_word(instr: Word) -> Option<Self> {
        match instr & OPCODE_MASK {
            0x01 => Some(Self::Mov),
            0x02 => Some(Self::Ldr),
            0x04 => Some(Self::Str),
            0x10 => Some(Self::Add),
            0x11 => Some(Self::Adc),
            0x2a => Some(Self::Jmp),
            0x2c => Some(Self::CondJump),
            0x3e => Some(Self::Nop),
            0x3f => Some(Self::Hlt),
            _ => None,
        }
    }

    /// Returns the opcode bits of this opcode.
    #[must_use]
    pub const fn as_word(self) -> Word {
        self as Word
    }

    /// Returns the instruction table entry of this opcode.
    #[must_use]
    pub const fn descriptor(self) -> &'static InstructionDescriptor {
        &INSTRUCTION_TABLE[self as usize]
    }
}

/// Operand format class of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Optype {
    /// Instruction without operands.
    Basic,
    /// Instruction with one register operand.
    Op0,
    /// Instruction with two operands.
    Op0Op1,
    /// Instruction with three operands.
    Op0Op1Op2,
    /// Jump instruction.
    Jump,
    /// Conditional jump instruction.
    CondJump,
}

/// One slot of the instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDescriptor {
    /// Mnemonic, e.g. `"MOV"`. For conditional jumps this is only the prefix
    /// of the condition mnemonic. Empty for unassigned slots.
    pub mnemonic: &'static str,
    /// Lowest feature level that supports the instruction;
    /// [`FeatureLevel::None`] marks an unassigned slot.
    pub level: FeatureLevel,
    /// Operand format of the instruction.
    pub optype: Optype,
}

impl InstructionDescriptor {
    const fn unassigned() -> Self {
        Self {
            mnemonic: "",
            level: FeatureLevel::None,
            optype: Optype::Basic,
        }
    }

    const fn new(mnemonic: &'static str, level: FeatureLevel, optype: Optype) -> Self {
        Self {
            mnemonic,
            level,
            optype,
        }
    }

    /// Returns true when the instruction exists at the given feature level.
    #[must_use]
    pub fn supported(&self, level: FeatureLevel) -> bool {
        self.level != FeatureLevel::None && self.level <= level
    }
}

/// Number of opcode slots.
pub const NUM_OPCODES: usize = OPCODE_MASK as usize + 1;

/// The sparse 64-slot instruction table keyed by opcode number.
///
/// This table is the single source of truth for which opcodes exist, at which
/// feature level, and with which operand format.
pub const INSTRUCTION_TABLE: [InstructionDescriptor; NUM_OPCODES] = {
    let mut table = [InstructionDescriptor::unassigned(); NUM_OPCODES];

    table[Opcode::Mov as usize] =
        InstructionDescriptor::new("MOV", FeatureLevel::Min, Optype::Op0Op1);
    table[Opcode::Ldr as usize] =
        InstructionDescriptor::new("LDR", FeatureLevel::Min, Optype::Op0Op1);
    table[Opcode::Str as usize] =
        InstructionDescriptor::new("STR", FeatureLevel::Min, Optype::Op0Op1);
    table[Opcode::Add as usize] =
        InstructionDescriptor::new("ADD", FeatureLevel::Min, Optype::Op0Op1Op2);
    table[Opcode::Adc as usize] =
        InstructionDescriptor::new("ADC", FeatureLevel::Min, Optype::Op0Op1Op2);
    table[Opcode::Jmp as usize] = InstructionDescriptor::new("JMP", FeatureLevel::V1, Optype::Jump);
    table[Opcode::CondJump as usize] =
        InstructionDescriptor::new("J", FeatureLevel::Min, Optype::CondJump);
    table[Opcode::Nop as usize] = InstructionDescriptor::new("NOP", FeatureLevel::V1, Optype::Basic);
    table[Opcode::Hlt as usize] =
        InstructionDescriptor::new("HLT", FeatureLevel::Min, Optype::Basic);

    table
};

/// Returns the instruction table entry for an instruction word.
#[must_use]
pub const fn descriptor(instr: Word) -> &'static InstructionDescriptor {
    &INSTRUCTION_TABLE[(instr & OPCODE_MASK) as usize]
}

/// Decodes the `st` short immediate of an instruction word, sign-extended.
#[must_use]
pub const fn short_immediate(instr: Word) -> Word {
    crate::word::sign_extend((instr & ST_MASK) >> ST_OFFSET, ST_SIGN_MASK)
}

/// Decodes the short jump byte address of a jump instruction word.
///
/// The field counts words; the decoded byte address keeps bit 0 zero and is
/// sign-extended from bit 9.
#[must_use]
pub const fn short_jump_address(instr: Word) -> Word {
    crate::word::sign_extend((instr & ADDR_MASK) >> ADDR_WORD_OFFSET, ADDR_SIGN_MASK)
}

/// Decodes the short jump byte address of a conditional jump instruction
/// word, sign-extended from bit 5.
#[must_use]
pub const fn short_cond_jump_address(instr: Word) -> Word {
    crate::word::sign_extend(
        (instr & COND_ADDR_MASK) >> COND_ADDR_WORD_OFFSET,
        COND_ADDR_SIGN_MASK,
    )
}

/// Reasons why reserved-zero bits of an instruction word are invalid.
///
/// The numeric codes are stable and appear in strict-mode diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InvalidBitsReason {
    /// Operand bits set on an instruction without operands.
    NonZeroNoOperands = 0,
    /// `op1`/`op2` bits set on a one-operand instruction.
    NonZeroOneOperand = 1,
    /// `op2` bits set on a two-operand register-mode instruction.
    NonZeroRegTwoOperands = 2,
    /// `st` bits set although the immediate is in the next word.
    NonZeroStTwoOperands = 3,
    /// The unassigned bit [12] set in a three-operand next-word immediate.
    NonZeroUnassignedThreeOperands = 4,
    /// The unassigned `cflag` bit [8] set in a conditional jump.
    NonZeroUnassignedCondOperands = 5,
    /// Address bits set although the address is in the next word.
    NonZeroJumpAddrOperands = 6,
    /// The `as` flag set on a two-operand instruction.
    AssignmentTwoOperands = 7,
}

impl InvalidBitsReason {
    /// Returns the stable diagnostic code of this reason.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Validates the reserved-zero bits of an instruction word against its
/// operand format.
///
/// Returns the violation, or `None` when the word is well-formed.
#[must_use]
pub const fn reserved_bits_violation(instr: Word, optype: Optype) -> Option<InvalidBitsReason> {
    match optype {
        Optype::Basic => {
            if instr & OPERAND_MASK != 0 {
                return Some(InvalidBitsReason::NonZeroNoOperands);
            }
        }
        Optype::Op0 => {
            if instr & (OP1_MASK | OP2_MASK) != 0 {
                return Some(InvalidBitsReason::NonZeroOneOperand);
            }
        }
        Optype::Op0Op1 => {
            if instr & SEL_MASK != 0 {
                if instr & AS_MASK != 0 {
                    return Some(InvalidBitsReason::AssignmentTwoOperands);
                }
                if instr & LOC_MASK != 0 && instr & ST_MASK != 0 {
                    return Some(InvalidBitsReason::NonZeroStTwoOperands);
                }
            } else if instr & OP2_MASK != 0 {
                return Some(InvalidBitsReason::NonZeroRegTwoOperands);
            }
        }
        Optype::Op0Op1Op2 => {
            if instr & IMM_INVALID_MASK == IMM_INVALID_MASK {
                return Some(InvalidBitsReason::NonZeroUnassignedThreeOperands);
            }
        }
        Optype::Jump => {
            if instr & ADDR_LOC_MASK != 0 && instr & ADDR_MASK != 0 {
                return Some(InvalidBitsReason::NonZeroJumpAddrOperands);
            }
        }
        Optype::CondJump => {
            if instr & ADDR_LOC_MASK != 0 && instr & COND_ADDR_MASK != 0 {
                return Some(InvalidBitsReason::NonZeroJumpAddrOperands);
            }
            if instr & COND_INVALID_MASK == COND_INVALID_MASK {
                return Some(InvalidBitsReason::NonZeroUnassignedCondOperands);
            }
        }
    }

    None
}
