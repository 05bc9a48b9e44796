//! Error taxonomy of the emulation core.

use thiserror::Error;

use crate::word::Word;

/// Errors raised while constructing instruction words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AssembleError {
    /// A short immediate constant does not fit its instruction field.
    #[error("short immediate constant 0x{imm:04x} too large (mask: 0x{mask:04x})")]
    InvalidImmediate {
        /// The rejected constant.
        imm: Word,
        /// Mask of the value and sign bits the field can hold.
        mask: Word,
    },
    /// The opcode does not exist at the requested feature level.
    #[error("opcode 0x{0:02x} is not supported at the selected feature level")]
    UnsupportedOpcode(Word),
    /// The operand shape is not valid for the opcode.
    #[error("invalid operand shape for opcode 0x{0:02x}")]
    InvalidOperands(Word),
}

/// Errors raised by memory construction and view operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MemoryError {
    /// A size, offset, or base address was not word-aligned.
    #[error("unaligned memory view")]
    Unaligned,
    /// An offset pointed beyond the end of the memory area.
    #[error("memory out of range")]
    OutOfRange,
    /// A requested size exceeds the addressable space of the machine.
    #[error("memory not addressable")]
    NotAddressable,
}

/// Fatal errors surfaced by the machine.
///
/// An execution panic is only returned when no debugger is attached;
/// otherwise it is latched on the debugger and execution stops with
/// breakpoint semantics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// An execution panic escaped because no debugger was attached.
    #[error("{0}")]
    Panic(String),
    /// A feature level code outside the defined set.
    #[error("Invalid feature level {0}")]
    InvalidFeatureLevel(u16),
}

/// Errors raised while loading a memory image from disk.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The image file could not be read.
    #[error("could not open image file: {0}")]
    Io(#[from] std::io::Error),
    /// The image file does not fit into main memory.
    #[error("the image file is too big ({size} bytes into {memory} bytes of memory)")]
    TooBig {
        /// Size of the image file in bytes.
        size: usize,
        /// Size of main memory in bytes.
        memory: usize,
    },
}
