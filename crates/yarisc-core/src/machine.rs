//! The machine aggregate: registers, memory, debugger, and feature level.

use std::fs;
use std::path::Path;

use crate::debugger::Debugger;
use crate::error::{ImageError, MachineError, MemoryError};
use crate::exec::{
    execute_instruction, DebugExecution, DebugPolicy, ExecuteResult, ExecutionMode,
    ExecutionPolicy, NoopDebug, NoopStrict, StrictChecks, StrictPolicy,
};
use crate::level::{FeatureLevel, FEATURE_LEVEL_LATEST};
use crate::memory::{Memory, MemoryView};
use crate::registers::MachineRegisters;
use crate::word::{is_aligned, Address, Word, WORD_BYTES};

/// Snapshot of the registers used to output the machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegistersView {
    /// Copy of the named registers and the status register.
    pub reg: MachineRegisters,
    /// The two instruction words at `ip`, for a disassembly preview.
    ///
    /// Only present when memory is non-empty and `ip` is word-aligned; the
    /// fetches wrap modulo the memory size.
    pub instruction: Option<[Word; 2]>,
}

impl RegistersView {
    /// Creates a view from a copy of the given machine registers.
    #[must_use]
    pub const fn new(reg: MachineRegisters) -> Self {
        Self {
            reg,
            instruction: None,
        }
    }

    /// Creates a view including the current instruction words fetched from
    /// the given memory.
    #[must_use]
    pub fn with_memory(reg: MachineRegisters, mem: &Memory) -> Self {
        let mut view = Self::new(reg);

        let ip = reg.named.ip() as usize;
        if !mem.is_empty() && is_aligned(ip) {
            let size = mem.size();

            view.instruction = Some([
                mem.load((ip % size) as Address),
                mem.load(((ip + WORD_BYTES) % size) as Address),
            ]);
        }

        view
    }
}

/// Full description of the machine: CPU internal state and main memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    reg: MachineRegisters,
    mem: Memory,
    debugger: Option<Debugger>,
    level: FeatureLevel,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// Constructs the machine in the initial state at the latest feature
    /// level with a full 64 KiB of memory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_level(FEATURE_LEVEL_LATEST)
    }

    /// Constructs the machine in the initial state at the given feature
    /// level.
    #[must_use]
    pub fn with_level(level: FeatureLevel) -> Self {
        Self {
            reg: MachineRegisters::default(),
            mem: Memory::new(),
            debugger: None,
            level,
        }
    }

    /// Constructs the machine in the initial state with a debugger attached.
    #[must_use]
    pub fn with_debugger(level: FeatureLevel) -> Self {
        Self {
            debugger: Some(Debugger::new()),
            ..Self::with_level(level)
        }
    }

    /// Replaces the main memory, e.g. with a smaller test memory.
    #[must_use]
    pub fn with_memory(mut self, mem: Memory) -> Self {
        self.mem = mem;
        self
    }

    /// Returns the feature level of the machine.
    #[must_use]
    pub const fn level(&self) -> FeatureLevel {
        self.level
    }

    /// Returns the CPU internal registers.
    #[must_use]
    pub const fn registers(&self) -> &MachineRegisters {
        &self.reg
    }

    /// Returns the CPU internal registers for mutation.
    pub fn registers_mut(&mut self) -> &mut MachineRegisters {
        &mut self.reg
    }

    /// Returns the main memory of the machine.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.mem
    }

    /// Returns the main memory of the machine for mutation.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// Returns the attached debugger, if any.
    #[must_use]
    pub const fn debugger(&self) -> Option<&Debugger> {
        self.debugger.as_ref()
    }

    /// Returns the attached debugger for mutation, if any.
    pub fn debugger_mut(&mut self) -> Option<&mut Debugger> {
        self.debugger.as_mut()
    }

    /// Returns the state of the machine for output.
    #[must_use]
    pub fn state_view(&self) -> RegistersView {
        RegistersView::with_memory(self.reg, &self.mem)
    }

    /// Returns a view into main memory with the registers attached for
    /// visualization.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError`] when `off` is unaligned or out of range.
    pub fn memory_view(&self, off: usize, sz: usize) -> Result<MemoryView<'_>, MemoryError> {
        self.mem.sub(off, sz, Some(&self.reg))
    }

    /// Resets the machine to the initial state.
    ///
    /// Zeroes all registers and the status register, clears memory, and
    /// clears the panic latch of the attached debugger.
    pub fn reset(&mut self) {
        self.reg = MachineRegisters::default();
        self.mem.clear();

        if let Some(debugger) = &mut self.debugger {
            debugger.reset_panic();
        }
    }

    /// Loads an image into main memory at address 0.
    ///
    /// If the image is smaller than main memory only the bytes from the
    /// image are written; it is recommended to reset the machine first.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] when the file cannot be read or does not fit
    /// into main memory.
    pub fn load(&mut self, image: &Path) -> Result<(), ImageError> {
        let bytes = fs::read(image)?;

        if bytes.len() > self.mem.size() {
            return Err(ImageError::TooBig {
                size: bytes.len(),
                memory: self.mem.size(),
            });
        }

        self.mem.data_mut()[..bytes.len()].copy_from_slice(&bytes);

        Ok(())
    }

    /// Executes until a halt instruction is executed or a breakpoint is hit.
    ///
    /// Returns true if halted, false if a breakpoint (or latched panic)
    /// stopped execution.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Panic`] when a panic occurs without an
    /// attached debugger and [`MachineError::InvalidFeatureLevel`] when the
    /// machine's feature level is not executable.
    pub fn execute(&mut self, mode: ExecutionMode) -> Result<bool, MachineError> {
        self.check_level()?;

        let level = self.level;
        match (&mut self.debugger, mode) {
            (Some(debugger), ExecutionMode::Strict) => run(
                ExecutionPolicy::new(DebugExecution::new(debugger), StrictChecks),
                level,
                &mut self.reg,
                &mut self.mem,
            ),
            (Some(debugger), ExecutionMode::Normal) => run(
                ExecutionPolicy::new(DebugExecution::new(debugger), NoopStrict),
                level,
                &mut self.reg,
                &mut self.mem,
            ),
            (None, ExecutionMode::Strict) => run(
                ExecutionPolicy::new(NoopDebug, StrictChecks),
                level,
                &mut self.reg,
                &mut self.mem,
            ),
            (None, ExecutionMode::Normal) => run(
                ExecutionPolicy::new(NoopDebug, NoopStrict),
                level,
                &mut self.reg,
                &mut self.mem,
            ),
        }
    }

    /// Executes at most `steps` instructions.
    ///
    /// Returns whether the machine halted and the number of executed steps.
    ///
    /// # Errors
    ///
    /// See [`Machine::execute`].
    pub fn execute_steps(
        &mut self,
        steps: u64,
        mode: ExecutionMode,
    ) -> Result<(bool, u64), MachineError> {
        self.check_level()?;

        let level = self.level;
        match (&mut self.debugger, mode) {
            (Some(debugger), ExecutionMode::Strict) => run_steps(
                ExecutionPolicy::new(DebugExecution::new(debugger), StrictChecks),
                level,
                &mut self.reg,
                &mut self.mem,
                steps,
            ),
            (Some(debugger), ExecutionMode::Normal) => run_steps(
                ExecutionPolicy::new(DebugExecution::new(debugger), NoopStrict),
                level,
                &mut self.reg,
                &mut self.mem,
                steps,
            ),
            (None, ExecutionMode::Strict) => run_steps(
                ExecutionPolicy::new(NoopDebug, StrictChecks),
                level,
                &mut self.reg,
                &mut self.mem,
                steps,
            ),
            (None, ExecutionMode::Normal) => run_steps(
                ExecutionPolicy::new(NoopDebug, NoopStrict),
                level,
                &mut self.reg,
                &mut self.mem,
                steps,
            ),
        }
    }

    fn check_level(&self) -> Result<(), MachineError> {
        match self.level {
            FeatureLevel::Min | FeatureLevel::V1 => Ok(()),
            FeatureLevel::None => Err(MachineError::InvalidFeatureLevel(self.level.as_u16())),
        }
    }
}

fn run<D: DebugPolicy, S: StrictPolicy>(
    mut policy: ExecutionPolicy<D, S>,
    level: FeatureLevel,
    reg: &mut MachineRegisters,
    mem: &mut Memory,
) -> Result<bool, MachineError> {
    let mut result = ExecuteResult::CONTINUE;

    while result.keep_going {
        result = execute_instruction(&mut policy, level, reg, mem)?;
    }

    Ok(!result.breakpoint)
}

fn run_steps<D: DebugPolicy, S: StrictPolicy>(
    mut policy: ExecutionPolicy<D, S>,
    level: FeatureLevel,
    reg: &mut MachineRegisters,
    mem: &mut Memory,
    steps: u64,
) -> Result<(bool, u64), MachineError> {
    let mut result = ExecuteResult::CONTINUE;
    let mut executed = 0;
    let mut compute = steps > 0;

    while compute {
        result = execute_instruction(&mut policy, level, reg, mem)?;
        executed += 1;

        compute = result.keep_going && steps > executed;
    }

    Ok((!result.breakpoint && !result.keep_going, executed))
}
