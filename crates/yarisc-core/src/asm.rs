//! Programmatic instruction builder.
//!
//! Each constructor of [`Assembler`] accepts only the operand shapes that are
//! valid for the opcode's operand format and returns the fully encoded
//! instruction word. When an operand selects [`UnaryOperand::Immediate`] (or
//! one of its siblings), the constant itself is stored in the word following
//! the instruction and has to be emitted by the caller.

use crate::error::AssembleError;
use crate::isa::{
    Opcode, Optype, ADDR_LOC_MASK, ADDR_MASK, ADDR_WORD_OFFSET, AS_MASK, COND_ADDR_MASK,
    COND_ADDR_WORD_OFFSET, COND_FLAG_CARRY_MASK, COND_FLAG_ZERO_MASK, COND_NEG_MASK, IMM_MASK,
    OP0_MASK, OP0_OFFSET, OP1_MASK, OP1_OFFSET, OP2_MASK, OP2_OFFSET, SEL_MASK, ST_MASK, ST_OFFSET,
};
use crate::level::{FeatureLevel, FEATURE_LEVEL_LATEST};
use crate::word::{sign_extend, Word};

/// Register address usable as an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum RegAddr {
    R0 = 0x0,
    R1 = 0x1,
    R2 = 0x2,
    R3 = 0x3,
    R4 = 0x4,
    R5 = 0x5,
    Sp = 0x6,
    Ip = 0x7,
}

impl RegAddr {
    /// Returns the 3-bit register address.
    #[must_use]
    pub const fn as_word(self) -> Word {
        self as Word
    }
}

/// Jump condition of conditional jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpCondition {
    /// Jump if the carry flag is set (`JMC`).
    Jc,
    /// Jump if the zero flag is set (`JMZ`).
    Jz,
    /// Jump if the carry flag is clear (`JNC`).
    Jnc,
    /// Jump if the zero flag is clear (`JNZ`).
    Jnz,
}

impl JumpCondition {
    /// Returns the `cflag`/`cneg` bits of this condition.
    #[must_use]
    pub const fn as_word(self) -> Word {
        match self {
            Self::Jc => COND_FLAG_CARRY_MASK,
            Self::Jz => COND_FLAG_ZERO_MASK,
            Self::Jnc => COND_FLAG_CARRY_MASK | COND_NEG_MASK,
            Self::Jnz => COND_FLAG_ZERO_MASK | COND_NEG_MASK,
        }
    }
}

fn check_immediate(value: Word, mask: Word, sign: Word) -> Result<Word, AssembleError> {
    if sign_extend(value & (mask | sign), sign) == value {
        Ok(value)
    } else {
        Err(AssembleError::InvalidImmediate {
            imm: value,
            mask: mask | sign,
        })
    }
}

/// Short immediate constant that fits the `st` field of an instruction word.
///
/// Representable values are the sign-extended 4-bit patterns, i.e. `0..=7`
/// and `0xfff8..=0xffff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShortImmediate(Word);

impl ShortImmediate {
    const MASK: Word = 0x0007;
    const SIGN: Word = 0x0008;

    /// Creates a range-checked short immediate.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::InvalidImmediate`] when `value` is not a
    /// sign-extended 4-bit pattern.
    pub fn new(value: Word) -> Result<Self, AssembleError> {
        check_immediate(value, Self::MASK, Self::SIGN).map(Self)
    }

    /// Returns the immediate constant value.
    #[must_use]
    pub const fn get(self) -> Word {
        self.0
    }
}

/// Short jump byte address that fits the `addr` field of a jump instruction.
///
/// Representable values are even and sign-extended from bit 9, i.e.
/// `0..=0x1fe` and `0xfe00..=0xfffe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShortJumpAddress(Word);

impl ShortJumpAddress {
    const MASK: Word = 0x01fe;
    const SIGN: Word = 0x0200;

    /// Creates a range-checked short jump address.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::InvalidImmediate`] when `value` is odd or out
    /// of range.
    pub fn new(value: Word) -> Result<Self, AssembleError> {
        check_immediate(value, Self::MASK, Self::SIGN).map(Self)
    }

    /// Returns the byte address.
    #[must_use]
    pub const fn get(self) -> Word {
        self.0
    }
}

/// Short conditional jump byte address that fits the `caddr` field.
///
/// Representable values are even and sign-extended from bit 5, i.e.
/// `0..=0x1e` and `0xffe0..=0xfffe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShortCondJumpAddress(Word);

impl ShortCondJumpAddress {
    const MASK: Word = 0x001e;
    const SIGN: Word = 0x0020;

    /// Creates a range-checked short conditional jump address.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::InvalidImmediate`] when `value` is odd or out
    /// of range.
    pub fn new(value: Word) -> Result<Self, AssembleError> {
        check_immediate(value, Self::MASK, Self::SIGN).map(Self)
    }

    /// Returns the byte address.
    #[must_use]
    pub const fn get(self) -> Word {
        self.0
    }
}

/// Second operand of a two-operand instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperand {
    /// A register operand.
    Reg(RegAddr),
    /// A short immediate stored inside the instruction word.
    Short(ShortImmediate),
    /// An immediate constant stored in the word following the instruction.
    Immediate,
}

/// Operand of a three-operand instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperand {
    /// A register operand.
    Reg(RegAddr),
    /// A short immediate stored inside the instruction word.
    Short(ShortImmediate),
    /// An immediate constant stored in the word following the instruction.
    Immediate,
    /// Placeholder re-using the first operand register.
    ///
    /// Used together with short immediate constants; the remaining operand
    /// implicitly is the same as the first operand, effectively writing the
    /// result back into the first operand register.
    Accumulator,
}

/// Target of a jump instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTarget {
    /// A short address stored inside the instruction word.
    Short(ShortJumpAddress),
    /// A byte address stored in the word following the instruction.
    Immediate,
}

/// Target of a conditional jump instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondJumpTarget {
    /// A short address stored inside the instruction word.
    Short(ShortCondJumpAddress),
    /// A byte address stored in the word following the instruction.
    Immediate,
}

const fn make_op0(addr: RegAddr) -> Word {
    (addr.as_word() << OP0_OFFSET) & OP0_MASK
}

const fn make_op1(addr: RegAddr) -> Word {
    (addr.as_word() << OP1_OFFSET) & OP1_MASK
}

const fn make_op2(addr: RegAddr) -> Word {
    (addr.as_word() << OP2_OFFSET) & OP2_MASK
}

const fn make_short_immediate(imm: ShortImmediate) -> Word {
    (imm.get() << ST_OFFSET) & ST_MASK
}

const fn make_jump_address(address: ShortJumpAddress) -> Word {
    (address.get() << ADDR_WORD_OFFSET) & ADDR_MASK
}

const fn make_cond_jump_address(address: ShortCondJumpAddress) -> Word {
    (address.get() << COND_ADDR_WORD_OFFSET) & COND_ADDR_MASK
}

/// Instruction builder bound to a feature level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assembler {
    level: FeatureLevel,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::latest()
    }
}

impl Assembler {
    /// Creates a builder emitting code for the given feature level.
    #[must_use]
    pub const fn new(level: FeatureLevel) -> Self {
        Self { level }
    }

    /// Creates a builder for the latest feature level.
    #[must_use]
    pub const fn latest() -> Self {
        Self::new(FEATURE_LEVEL_LATEST)
    }

    /// Returns the feature level this builder emits code for.
    #[must_use]
    pub const fn level(&self) -> FeatureLevel {
        self.level
    }

    fn check(&self, op: Opcode, optype: Optype) -> Result<(), AssembleError> {
        let entry = op.descriptor();

        if !entry.supported(self.level) {
            return Err(AssembleError::UnsupportedOpcode(op.as_word()));
        }
        if entry.optype != optype {
            return Err(AssembleError::InvalidOperands(op.as_word()));
        }

        Ok(())
    }

    /// Assembles an instruction without operands.
    ///
    /// # Errors
    ///
    /// Returns an error when the opcode is unsupported at the builder's level
    /// or does not take this operand shape.
    pub fn basic(&self, op: Opcode) -> Result<Word, AssembleError> {
        self.check(op, Optype::Basic)?;

        Ok(op.as_word())
    }

    /// Assembles an instruction with one register operand.
    ///
    /// # Errors
    ///
    /// Returns an error when the opcode is unsupported at the builder's level
    /// or does not take this operand shape.
    pub fn unary(&self, op: Opcode, op0: RegAddr) -> Result<Word, AssembleError> {
        self.check(op, Optype::Op0)?;

        Ok(op.as_word() | make_op0(op0))
    }

    /// Assembles an instruction with two operands.
    ///
    /// # Errors
    ///
    /// Returns an error when the opcode is unsupported at the builder's level
    /// or does not take this operand shape.
    pub fn binary(
        &self,
        op: Opcode,
        op0: RegAddr,
        op1: UnaryOperand,
    ) -> Result<Word, AssembleError> {
        self.check(op, Optype::Op0Op1)?;

        let operands = match op1 {
            UnaryOperand::Reg(reg) => make_op1(reg),
            UnaryOperand::Short(imm) => make_short_immediate(imm) | SEL_MASK,
            UnaryOperand::Immediate => IMM_MASK,
        };

        Ok(op.as_word() | make_op0(op0) | operands)
    }

    /// Assembles an instruction with three operands.
    ///
    /// Valid shapes are register/register, one following-word immediate in
    /// either operand position, or a short immediate paired with the
    /// [`BinaryOperand::Accumulator`] placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error when the opcode is unsupported at the builder's
    /// level, does not take three operands, or the shape is not encodable.
    pub fn ternary(
        &self,
        op: Opcode,
        op0: RegAddr,
        op1: BinaryOperand,
        op2: BinaryOperand,
    ) -> Result<Word, AssembleError> {
        self.check(op, Optype::Op0Op1Op2)?;

        let operands = match (op1, op2) {
            (BinaryOperand::Reg(a), BinaryOperand::Reg(b)) => make_op1(a) | make_op2(b),
            (BinaryOperand::Immediate, BinaryOperand::Reg(b)) => make_op1(b) | IMM_MASK,
            (BinaryOperand::Reg(a), BinaryOperand::Immediate) => make_op1(a) | AS_MASK | IMM_MASK,
            (BinaryOperand::Short(imm), BinaryOperand::Accumulator) => {
                make_short_immediate(imm) | SEL_MASK
            }
            (BinaryOperand::Accumulator, BinaryOperand::Short(imm)) => {
                make_short_immediate(imm) | AS_MASK | SEL_MASK
            }
            _ => return Err(AssembleError::InvalidOperands(op.as_word())),
        };

        Ok(op.as_word() | make_op0(op0) | operands)
    }

    /// Assembles a jump instruction.
    ///
    /// # Errors
    ///
    /// Returns an error when the opcode is unsupported at the builder's level
    /// or does not take this operand shape.
    pub fn jump(&self, op: Opcode, target: JumpTarget) -> Result<Word, AssembleError> {
        self.check(op, Optype::Jump)?;

        let operands = match target {
            JumpTarget::Short(address) => make_jump_address(address),
            JumpTarget::Immediate => ADDR_LOC_MASK,
        };

        Ok(op.as_word() | operands)
    }

    /// Assembles a conditional jump instruction.
    ///
    /// # Errors
    ///
    /// Returns an error when the opcode is unsupported at the builder's level
    /// or does not take this operand shape.
    pub fn cond_jump(
        &self,
        op: Opcode,
        cond: JumpCondition,
        target: CondJumpTarget,
    ) -> Result<Word, AssembleError> {
        self.check(op, Optype::CondJump)?;

        let operands = match target {
            CondJumpTarget::Short(address) => make_cond_jump_address(address),
            CondJumpTarget::Immediate => ADDR_LOC_MASK,
        };

        Ok(op.as_word() | cond.as_word() | operands)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Assembler, BinaryOperand, CondJumpTarget, JumpCondition, JumpTarget, RegAddr,
        ShortCondJumpAddress, ShortImmediate, ShortJumpAddress, UnaryOperand,
    };
    use crate::error::AssembleError;
    use crate::isa::Opcode;
    use crate::level::FeatureLevel;

    fn short(value: u16) -> UnaryOperand {
        UnaryOperand::Short(ShortImmediate::new(value).expect("valid short immediate"))
    }

    fn short3(value: u16) -> BinaryOperand {
        BinaryOperand::Short(ShortImmediate::new(value).expect("valid short immediate"))
    }

    #[test]
    fn short_immediates_are_signed_4_bit_patterns() {
        for valid in [0x0000, 0x0007, 0xfff8, 0xffff, 0xfff9] {
            assert!(ShortImmediate::new(valid).is_ok(), "{valid:#06x}");
        }
        for invalid in [0x0008, 0x000f, 0x0010, 0x7fff] {
            assert_eq!(
                ShortImmediate::new(invalid),
                Err(AssembleError::InvalidImmediate {
                    imm: invalid,
                    mask: 0x000f
                }),
                "{invalid:#06x}"
            );
        }
    }

    #[test]
    fn short_jump_addresses_are_even_and_signed() {
        for valid in [0x0000, 0x01fc, 0x01fe, 0xfe00, 0xffe0, 0xfffe] {
            assert!(ShortJumpAddress::new(valid).is_ok(), "{valid:#06x}");
        }
        for invalid in [0x0001, 0x01ff, 0x0200, 0x1000, 0xfdfe] {
            assert!(ShortJumpAddress::new(invalid).is_err(), "{invalid:#06x}");
        }

        for valid in [0x0000, 0x001a, 0x001e, 0xffe0, 0xfffe] {
            assert!(ShortCondJumpAddress::new(valid).is_ok(), "{valid:#06x}");
        }
        for invalid in [0x0001, 0x0020, 0x00ff, 0xffd0] {
            assert!(ShortCondJumpAddress::new(invalid).is_err(), "{invalid:#06x}");
        }
    }

    #[test]
    fn two_operand_encodings_are_bit_exact() {
        let asm = Assembler::latest();

        assert_eq!(
            asm.binary(Opcode::Mov, RegAddr::R2, UnaryOperand::Reg(RegAddr::R3)),
            Ok(0x0681)
        );
        assert_eq!(asm.binary(Opcode::Mov, RegAddr::R2, short(0)), Ok(0x8081));
        assert_eq!(
            asm.binary(Opcode::Mov, RegAddr::R5, UnaryOperand::Immediate),
            Ok(0xc141)
        );
        assert_eq!(
            asm.binary(Opcode::Ldr, RegAddr::R3, UnaryOperand::Immediate),
            Ok(0xc0c2)
        );
    }

    #[test]
    fn three_operand_encodings_are_bit_exact() {
        let asm = Assembler::latest();

        assert_eq!(
            asm.ternary(
                Opcode::Add,
                RegAddr::R0,
                BinaryOperand::Reg(RegAddr::R1),
                BinaryOperand::Reg(RegAddr::R2),
            ),
            Ok(0x2210)
        );
        assert_eq!(
            asm.ternary(
                Opcode::Add,
                RegAddr::R5,
                short3(6),
                BinaryOperand::Accumulator,
            ),
            Ok(0x8d50)
        );
        assert_eq!(
            asm.ternary(
                Opcode::Add,
                RegAddr::R4,
                BinaryOperand::Accumulator,
                short3(5),
            ),
            Ok(0xab10)
        );
        assert_eq!(
            asm.ternary(
                Opcode::Add,
                RegAddr::R2,
                BinaryOperand::Immediate,
                BinaryOperand::Reg(RegAddr::R4),
            ),
            Ok(0xc890)
        );
        assert_eq!(
            asm.ternary(
                Opcode::Add,
                RegAddr::R3,
                BinaryOperand::Reg(RegAddr::R0),
                BinaryOperand::Immediate,
            ),
            Ok(0xe0d0)
        );
    }

    #[test]
    fn jump_encodings_are_bit_exact() {
        let asm = Assembler::latest();
        let target = |a| JumpTarget::Short(ShortJumpAddress::new(a).expect("valid address"));
        let cond_target =
            |a| CondJumpTarget::Short(ShortCondJumpAddress::new(a).expect("valid address"));

        assert_eq!(asm.jump(Opcode::Jmp, target(0x01fc)), Ok(0x3faa));
        assert_eq!(asm.jump(Opcode::Jmp, target(0xffe0)), Ok(0x7c2a));
        assert_eq!(asm.jump(Opcode::Jmp, JumpTarget::Immediate), Ok(0x802a));

        assert_eq!(
            asm.cond_jump(Opcode::CondJump, JumpCondition::Jc, cond_target(0x1a)),
            Ok(0x1a6c)
        );
        assert_eq!(
            asm.cond_jump(Opcode::CondJump, JumpCondition::Jnz, cond_target(0x1a)),
            Ok(0x5aac)
        );
        assert_eq!(
            asm.cond_jump(Opcode::CondJump, JumpCondition::Jz, CondJumpTarget::Immediate),
            Ok(0x80ac)
        );
    }

    #[test]
    fn basic_encodings_are_the_opcode_alone() {
        let asm = Assembler::latest();
        assert_eq!(asm.basic(Opcode::Nop), Ok(0x003e));
        assert_eq!(asm.basic(Opcode::Hlt), Ok(0x003f));
    }

    #[test]
    fn feature_level_gating_rejects_v1_opcodes_at_min() {
        let asm = Assembler::new(FeatureLevel::Min);

        assert_eq!(
            asm.basic(Opcode::Nop),
            Err(AssembleError::UnsupportedOpcode(0x3e))
        );
        assert_eq!(
            asm.jump(Opcode::Jmp, JumpTarget::Immediate),
            Err(AssembleError::UnsupportedOpcode(0x2a))
        );
        assert_eq!(asm.basic(Opcode::Hlt), Ok(0x003f));
    }

    #[test]
    fn operand_shapes_must_match_the_optype() {
        let asm = Assembler::latest();

        assert_eq!(
            asm.basic(Opcode::Mov),
            Err(AssembleError::InvalidOperands(0x01))
        );
        assert_eq!(
            asm.binary(Opcode::Add, RegAddr::R0, UnaryOperand::Reg(RegAddr::R1)),
            Err(AssembleError::InvalidOperands(0x10))
        );
        assert_eq!(
            asm.unary(Opcode::Hlt, RegAddr::R0),
            Err(AssembleError::InvalidOperands(0x3f))
        );
        assert_eq!(
            asm.ternary(
                Opcode::Adc,
                RegAddr::R0,
                BinaryOperand::Accumulator,
                BinaryOperand::Accumulator,
            ),
            Err(AssembleError::InvalidOperands(0x11))
        );
        assert_eq!(
            asm.ternary(
                Opcode::Adc,
                RegAddr::R0,
                short3(1),
                BinaryOperand::Reg(RegAddr::R1),
            ),
            Err(AssembleError::InvalidOperands(0x11))
        );
    }
}
