//! CPU emulation core for the YaRISC 16-bit processor.
//!
//! The crate models the architecture bottom-up: word primitives, memory,
//! registers, the instruction format, a programmatic instruction builder and
//! a single-instruction disassembler, and the fetch-decode-execute engine
//! that drives the [`Machine`] aggregate. Text views with current-vs-previous
//! diffing are provided for interactive front-ends.

/// Machine word and address primitives.
pub mod word;
pub use word::{
    is_aligned, load_word, sign_extend, store_word, Address, DoubleWord, Word, NUM_REGISTERS,
    WORD_BYTES,
};

/// Error taxonomy of the emulation core.
pub mod error;
pub use error::{AssembleError, ImageError, MachineError, MemoryError};

/// Feature levels of the machine.
pub mod level;
pub use level::{FeatureLevel, FEATURE_LEVEL_LATEST};

/// Instruction word layout and the opcode table.
pub mod isa;
pub use isa::{
    descriptor, reserved_bits_violation, InstructionDescriptor, InvalidBitsReason, Opcode, Optype,
    INSTRUCTION_TABLE, NUM_OPCODES, OPCODE_MASK,
};

/// Register file and status register.
pub mod registers;
pub use registers::{MachineRegisters, Registers, StatusRegister, REGISTER_NAMES};

/// Main memory and non-owning memory views.
pub mod memory;
pub use memory::{Memory, MemoryView};

/// Programmatic instruction builder.
pub mod asm;
pub use asm::{
    Assembler, BinaryOperand, CondJumpTarget, JumpCondition, JumpTarget, RegAddr,
    ShortCondJumpAddress, ShortImmediate, ShortJumpAddress, UnaryOperand,
};

/// Single-instruction disassembler.
pub mod disasm;
pub use disasm::{disassemble, Disassembly};

/// Debugger state used by the machine.
pub mod debugger;
pub use debugger::{store_debug_message, Debugger};

/// The fetch-decode-execute engine.
pub mod exec;
pub use exec::{
    execute_instruction, DebugExecution, DebugPolicy, ExecuteResult, ExecutionMode,
    ExecutionPolicy, NoopDebug, NoopStrict, StrictChecks, StrictPolicy,
};

/// The machine aggregate.
pub mod machine;
pub use machine::{Machine, RegistersView};

/// Textual views and diff rendering.
pub mod render;
pub use render::{
    render_debugger_view, render_memory, render_memory_diff, render_registers,
    render_registers_diff, ColorContext, DebuggerView, OutputFormat,
};
