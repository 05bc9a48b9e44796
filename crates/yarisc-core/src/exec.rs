//! The fetch-decode-execute engine.
//!
//! The engine is parameterised over two independent policy axes: debugger
//! presence and strict checking. Each axis has an enabled and a no-op
//! implementation, so the four combinations monomorphize into four step
//! loops. A panic latches on the attached debugger and stops execution with
//! breakpoint semantics; without a debugger it aborts execution as a
//! [`MachineError::Panic`].

use crate::debugger::Debugger;
use crate::error::MachineError;
use crate::isa::{
    descriptor, reserved_bits_violation, short_cond_jump_address, short_immediate,
    short_jump_address, InvalidBitsReason, Opcode, Optype, ADDR_LOC_MASK, AS_MASK, AS_OFFSET,
    COND_FLAG_MASK, COND_FLAG_OFFSET, COND_NEG_MASK, LOC_MASK, OP0_MASK, OP0_OFFSET, OP1_MASK,
    OP1_OFFSET, OP2_MASK, OP2_OFFSET, SEL_MASK,
};
use crate::level::FeatureLevel;
use crate::memory::Memory;
use crate::registers::{MachineRegisters, StatusRegister};
use crate::word::{is_aligned, Address, DoubleWord, Word, WORD_BYTES};

/// Execution mode of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecutionMode {
    /// No additional checks.
    #[default]
    Normal,
    /// Adds runtime checks: unassigned instruction bits must be zero and
    /// loads and stores must be word-aligned and in range.
    Strict,
}

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteResult {
    /// False once the machine halted or stopped at a breakpoint.
    pub keep_going: bool,
    /// True when execution stopped at a breakpoint (or latched panic).
    pub breakpoint: bool,
}

impl Default for ExecuteResult {
    fn default() -> Self {
        Self::CONTINUE
    }
}

impl ExecuteResult {
    /// Execution continues with the next instruction.
    pub const CONTINUE: Self = Self {
        keep_going: true,
        breakpoint: false,
    };

    /// The machine executed a halt instruction.
    pub const HALT: Self = Self {
        keep_going: false,
        breakpoint: false,
    };

    /// Execution stopped at a breakpoint or latched panic.
    pub const BREAKPOINT: Self = Self {
        keep_going: false,
        breakpoint: true,
    };
}

fn instruction_error(reg: &MachineRegisters, instr: Word) -> String {
    let location = reg.named.ip().wrapping_sub(WORD_BYTES as Word);

    format!("Invalid instruction 0x{instr:04x} at memory location 0x{location:04x}")
}

fn nonzero_error(instr: Word, reason: InvalidBitsReason) -> String {
    format!(
        "Invalid non-zero bits in instruction 0x{instr:04x} (reason: {})",
        reason.code()
    )
}

fn address_error(address: Address, access: &str) -> String {
    format!("Invalid {access} access to address 0x{address:04x}")
}

/// Debugger side of an execution policy.
pub trait DebugPolicy {
    /// True when the policy observes a debugger.
    const ENABLED: bool;

    /// Returns whether a panic is already latched.
    fn has_panic(&self) -> bool;

    /// Latches a panic message.
    ///
    /// # Errors
    ///
    /// Without a debugger the panic escapes as [`MachineError::Panic`].
    fn panic(&mut self, msg: String) -> Result<(), MachineError>;

    /// Address-breakpoint predicate consulted on `ip` before each step.
    fn breakpoint(&self, _address: Address) -> bool {
        false
    }

    /// Write-data breakpoint predicate consulted before each store.
    fn data_breakpoint(&self, _address: Address, _value: Word) -> bool {
        false
    }
}

/// Debug policy that latches panics on an attached debugger.
#[derive(Debug)]
pub struct DebugExecution<'a> {
    debugger: &'a mut Debugger,
}

impl<'a> DebugExecution<'a> {
    /// Creates the policy around the given debugger.
    pub fn new(debugger: &'a mut Debugger) -> Self {
        Self { debugger }
    }
}

impl DebugPolicy for DebugExecution<'_> {
    const ENABLED: bool = true;

    fn has_panic(&self) -> bool {
        self.debugger.is_panic()
    }

    fn panic(&mut self, msg: String) -> Result<(), MachineError> {
        self.debugger.set_panic(msg);

        Ok(())
    }
}

/// Debug policy used when no debugger is attached; panics are fatal.
#[derive(Debug, Default)]
pub struct NoopDebug;

impl DebugPolicy for NoopDebug {
    const ENABLED: bool = false;

    fn has_panic(&self) -> bool {
        false
    }

    fn panic(&mut self, msg: String) -> Result<(), MachineError> {
        Err(MachineError::Panic(msg))
    }
}

/// Strict side of an execution policy.
pub trait StrictPolicy {
    /// True when strict checks are performed.
    const ENABLED: bool;

    /// Validates a load/store address.
    fn check_address(_mem: &Memory, _address: Address) -> bool {
        true
    }
}

/// Strict policy validating alignment and range of every engine access.
#[derive(Debug, Default)]
pub struct StrictChecks;

impl StrictPolicy for StrictChecks {
    const ENABLED: bool = true;

    fn check_address(mem: &Memory, address: Address) -> bool {
        is_aligned(address as usize) && (address as usize) < mem.size()
    }
}

/// Strict policy with all checks disabled.
#[derive(Debug, Default)]
pub struct NoopStrict;

impl StrictPolicy for NoopStrict {
    const ENABLED: bool = false;
}

/// Memory access outside the checked range in normal mode: align the address
/// downward and wrap it modulo the memory size.
fn wrapped_address(mem: &Memory, address: Address) -> Option<Address> {
    if mem.is_empty() {
        return None;
    }

    Some(((address as usize & !0x1) % mem.size()) as Address)
}

/// Composition of a debug and a strict policy.
#[derive(Debug)]
pub struct ExecutionPolicy<D, S> {
    /// Debugger side of the policy.
    pub debug: D,
    /// Strict side of the policy.
    pub strict: S,
}

impl<D: DebugPolicy, S: StrictPolicy> ExecutionPolicy<D, S> {
    /// Composes an execution policy from its two sides.
    pub fn new(debug: D, strict: S) -> Self {
        Self { debug, strict }
    }

    fn panic(&mut self, msg: String, result: &mut ExecuteResult) -> Result<(), MachineError> {
        self.debug.panic(msg)?;
        *result = ExecuteResult::BREAKPOINT;

        Ok(())
    }

    fn load(
        &mut self,
        mem: &Memory,
        address: Address,
        result: &mut ExecuteResult,
    ) -> Result<Word, MachineError> {
        if S::ENABLED && !S::check_address(mem, address) {
            self.panic(address_error(address, "read"), result)?;
            return Ok(0);
        }

        Ok(wrapped_address(mem, address).map_or(0, |address| mem.load(address)))
    }

    fn store(
        &mut self,
        mem: &mut Memory,
        address: Address,
        value: Word,
        result: &mut ExecuteResult,
    ) -> Result<(), MachineError> {
        if S::ENABLED && !S::check_address(mem, address) {
            return self.panic(address_error(address, "write"), result);
        }

        if D::ENABLED && self.debug.data_breakpoint(address, value) {
            *result = ExecuteResult::BREAKPOINT;
            return Ok(());
        }

        if let Some(address) = wrapped_address(mem, address) {
            mem.store(address, value);
        }

        Ok(())
    }

    fn check(
        &mut self,
        instr: Word,
        optype: Optype,
        result: &mut ExecuteResult,
    ) -> Result<(), MachineError> {
        if S::ENABLED && !self.debug.has_panic() {
            if let Some(reason) = reserved_bits_violation(instr, optype) {
                self.panic(nonzero_error(instr, reason), result)?;
            }
        }

        Ok(())
    }
}

/// Fetches the word at `ip` and advances `ip` past it.
fn load_instruction<D: DebugPolicy, S: StrictPolicy>(
    policy: &mut ExecutionPolicy<D, S>,
    reg: &mut MachineRegisters,
    mem: &Memory,
    result: &mut ExecuteResult,
) -> Result<Word, MachineError> {
    let ip = reg.named.ip();
    reg.named.set_ip(ip.wrapping_add(WORD_BYTES as Word));

    policy.load(mem, ip, result)
}

const fn first_operand_index(instr: Word) -> usize {
    ((instr & OP0_MASK) >> OP0_OFFSET) as usize
}

const fn second_reg_operand_index(instr: Word) -> usize {
    ((instr & OP1_MASK) >> OP1_OFFSET) as usize
}

const fn third_reg_operand_index(instr: Word) -> usize {
    ((instr & OP2_MASK) >> OP2_OFFSET) as usize
}

/// Reads the second operand of a two-operand instruction.
fn second_operand<D: DebugPolicy, S: StrictPolicy>(
    policy: &mut ExecutionPolicy<D, S>,
    instr: Word,
    reg: &mut MachineRegisters,
    mem: &Memory,
    result: &mut ExecuteResult,
) -> Result<Word, MachineError> {
    if instr & SEL_MASK != 0 {
        if instr & LOC_MASK != 0 {
            load_instruction(policy, reg, mem, result)
        } else {
            Ok(short_immediate(instr))
        }
    } else {
        Ok(reg.named.r[second_reg_operand_index(instr)])
    }
}

/// Reads the second and third operands of a three-operand instruction.
///
/// `op0` is the current value of the first operand register; the accumulator
/// encoding re-uses it for the remaining operand slot.
fn second_third_operands<D: DebugPolicy, S: StrictPolicy>(
    policy: &mut ExecutionPolicy<D, S>,
    instr: Word,
    reg: &mut MachineRegisters,
    mem: &Memory,
    op0: Word,
    result: &mut ExecuteResult,
) -> Result<(Word, Word), MachineError> {
    if instr & SEL_MASK != 0 {
        let operands = if instr & LOC_MASK != 0 {
            let imm = load_instruction(policy, reg, mem, result)?;
            [imm, reg.named.r[second_reg_operand_index(instr)]]
        } else {
            [short_immediate(instr), op0]
        };

        let assignment = ((instr & AS_MASK) >> AS_OFFSET) as usize;

        Ok((operands[assignment], operands[1 - assignment]))
    } else {
        Ok((
            reg.named.r[second_reg_operand_index(instr)],
            reg.named.r[third_reg_operand_index(instr)],
        ))
    }
}

/// Reads the target address of a jump instruction.
fn jump_address_operand<D: DebugPolicy, S: StrictPolicy>(
    policy: &mut ExecutionPolicy<D, S>,
    instr: Word,
    reg: &mut MachineRegisters,
    mem: &Memory,
    result: &mut ExecuteResult,
) -> Result<Address, MachineError> {
    if instr & ADDR_LOC_MASK != 0 {
        load_instruction(policy, reg, mem, result)
    } else {
        Ok(short_jump_address(instr))
    }
}

/// Reads the target address of a conditional jump instruction.
fn cond_jump_address_operand<D: DebugPolicy, S: StrictPolicy>(
    policy: &mut ExecutionPolicy<D, S>,
    instr: Word,
    reg: &mut MachineRegisters,
    mem: &Memory,
    result: &mut ExecuteResult,
) -> Result<Address, MachineError> {
    if instr & ADDR_LOC_MASK != 0 {
        load_instruction(policy, reg, mem, result)
    } else {
        Ok(short_cond_jump_address(instr))
    }
}

fn execute_move(reg: &mut MachineRegisters, op0: usize, op1: Word) {
    reg.named.r[op0] = op1;

    // Update the zero flag, preserve everything else
    reg.status.set_zero(op1 == 0);
}

fn execute_alu(reg: &mut MachineRegisters, op0: usize, op1: Word, op2: Word, carry_in: DoubleWord) {
    let result = DoubleWord::from(op1) + DoubleWord::from(op2) + carry_in;
    let word = result as Word;

    reg.status.s = if word == 0 {
        StatusRegister::ZERO_FLAG
    } else {
        0
    };
    reg.status.s |= ((result >> (8 * WORD_BYTES)) as Word) & StatusRegister::CARRY_FLAG;

    reg.named.r[op0] = word;
}

fn execute_cond_jump(reg: &mut MachineRegisters, instr: Word, address: Address) {
    let flags = (instr & COND_FLAG_MASK) >> COND_FLAG_OFFSET;
    let taken = reg.status.s & flags != 0;
    let negate = instr & COND_NEG_MASK != 0;

    if taken != negate {
        reg.named.set_ip(address);
    }
}

/// Executes a single instruction under the given policy.
///
/// Fetches the word at `ip`, advances `ip`, decodes and executes the
/// instruction, and (in strict mode) validates its reserved-zero bits.
///
/// # Errors
///
/// Returns [`MachineError::Panic`] when a panic occurs and the policy has no
/// debugger to latch it on.
pub fn execute_instruction<D: DebugPolicy, S: StrictPolicy>(
    policy: &mut ExecutionPolicy<D, S>,
    level: FeatureLevel,
    reg: &mut MachineRegisters,
    mem: &mut Memory,
) -> Result<ExecuteResult, MachineError> {
    if D::ENABLED && policy.debug.breakpoint(reg.named.ip()) {
        return Ok(ExecuteResult::BREAKPOINT);
    }

    let mut result = ExecuteResult::CONTINUE;

    let instr = load_instruction(policy, reg, mem, &mut result)?;
    if D::ENABLED && result.breakpoint {
        return Ok(result);
    }

    let supported = Opcode::from_word(instr)
        .filter(|op| op.descriptor().supported(level));

    let Some(op) = supported else {
        policy.panic(instruction_error(reg, instr), &mut result)?;
        return Ok(result);
    };

    match op {
        Opcode::Mov => {
            let op0 = first_operand_index(instr);
            let op1 = second_operand(policy, instr, reg, mem, &mut result)?;

            if !result.breakpoint {
                execute_move(reg, op0, op1);
            }
        }
        Opcode::Ldr => {
            let op0 = first_operand_index(instr);
            let address = second_operand(policy, instr, reg, mem, &mut result)?;

            if !result.breakpoint {
                let value = policy.load(mem, address, &mut result)?;

                if !result.breakpoint {
                    execute_move(reg, op0, value);
                }
            }
        }
        Opcode::Str => {
            let op0 = first_operand_index(instr);
            let address = second_operand(policy, instr, reg, mem, &mut result)?;

            if !result.breakpoint {
                let value = reg.named.r[op0];
                policy.store(mem, address, value, &mut result)?;
            }
        }
        Opcode::Add | Opcode::Adc => {
            let op0 = first_operand_index(instr);
            let op0_value = reg.named.r[op0];
            let (op1, op2) = second_third_operands(policy, instr, reg, mem, op0_value, &mut result)?;

            if !result.breakpoint {
                let carry_in = if op == Opcode::Adc {
                    DoubleWord::from(reg.status.s & StatusRegister::CARRY_FLAG)
                } else {
                    0
                };

                execute_alu(reg, op0, op1, op2, carry_in);
            }
        }
        Opcode::Jmp => {
            let address = jump_address_operand(policy, instr, reg, mem, &mut result)?;

            if !result.breakpoint {
                reg.named.set_ip(address);
            }
        }
        Opcode::CondJump => {
            let address = cond_jump_address_operand(policy, instr, reg, mem, &mut result)?;

            if !result.breakpoint {
                execute_cond_jump(reg, instr, address);
            }
        }
        Opcode::Nop => {}
        Opcode::Hlt => result = ExecuteResult::HALT,
    }

    policy.check(instr, descriptor(instr).optype, &mut result)?;

    Ok(result)
}
