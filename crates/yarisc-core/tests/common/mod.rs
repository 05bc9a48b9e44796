//! Shared test machine with a fixed initial state and strict stepping.

#![allow(dead_code)]

use yarisc_core::{
    disassemble, Address, ExecutionMode, FeatureLevel, Machine, Memory, StatusRegister, Word,
};

/// Status word with only the carry flag set.
pub const STATUS_C: Word = StatusRegister::CARRY_FLAG;
/// Status word with only the zero flag set.
pub const STATUS_Z: Word = StatusRegister::ZERO_FLAG;
/// Status word with the zero and carry flags set.
pub const STATUS_ZC: Word = StatusRegister::ZERO_FLAG | StatusRegister::CARRY_FLAG;

const INITIAL_SP: Word = 0x5f;
const INITIAL_IP: Word = 0x2a;

const SMALL_MEMORY: usize = 0x60;

/// Machine fixture with pattern-filled memory, fixed initial registers, a
/// debugger, and strict single-stepping.
///
/// Whole-fixture equality compares registers, status, memory, and the
/// debugger, so tests can clone an `expected` machine, apply the expected
/// effects, and compare.
#[derive(Debug, Clone, PartialEq)]
pub struct TestMachine {
    machine: Machine,
}

impl TestMachine {
    /// Creates the fixture with a small pattern-filled memory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_memory_size(SMALL_MEMORY)
    }

    /// Creates the fixture with the instruction word stored at `ip`.
    #[must_use]
    pub fn with_word(word: Word) -> Self {
        let mut machine = Self::new();
        machine.store(INITIAL_IP, word);
        machine
    }

    /// Creates the fixture with an instruction word and its immediate word.
    #[must_use]
    pub fn with_words(word0: Word, word1: Word) -> Self {
        let mut machine = Self::with_word(word0);
        machine.store(INITIAL_IP + 2, word1);
        machine
    }

    /// Creates the fixture with the full 64 KiB of pattern-filled memory.
    #[must_use]
    pub fn with_max_memory(word: Word) -> Self {
        let mut machine = Self::with_memory_size(Memory::MAX_SIZE);
        machine.store(INITIAL_IP, word);
        machine
    }

    fn with_memory_size(size: usize) -> Self {
        let mut machine =
            Machine::with_debugger(FeatureLevel::V1).with_memory(pattern_memory(size));

        let named = &mut machine.registers_mut().named;
        named.set_r0(0xa9b4);
        named.set_r1(0x1172);
        named.set_r2(0x30cc);
        named.set_r3(0x6ce5);
        named.set_r4(0x8bd3);
        named.set_r5(0xf196);
        named.set_sp(INITIAL_SP);
        named.set_ip(INITIAL_IP);

        Self { machine }
    }

    /// Returns the underlying machine.
    #[must_use]
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Returns the underlying machine for mutation.
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Reads the word at `off`, or `0xffff` outside the memory area.
    #[must_use]
    pub fn load(&self, off: usize) -> Word {
        assert!(off % 2 == 0, "unaligned address in load");

        if off < self.machine.memory().size() {
            self.machine.memory().load(off as Address)
        } else {
            0xffff
        }
    }

    /// Stores a word at `off`.
    pub fn store(&mut self, off: Word, word: Word) {
        self.machine.memory_mut().store(off, word);
    }

    /// Sets the status register.
    pub fn set_status(&mut self, status: Word) {
        self.machine.registers_mut().status.s = status;
    }

    /// Sets a named register by index.
    pub fn set_r(&mut self, index: usize, word: Word) {
        self.machine.registers_mut().named.r[index] = word;
    }

    /// Sets the instruction pointer.
    pub fn set_ip(&mut self, address: Word) {
        self.machine.registers_mut().named.set_ip(address);
    }

    /// Advances the instruction pointer by a number of instruction words.
    pub fn advance_ip(&mut self, num_words: Word) {
        let ip = self.machine.registers().named.ip();
        self.set_ip(ip.wrapping_add(num_words * 2));
    }

    /// Executes one instruction in strict mode.
    ///
    /// Returns `Ok(true)` to keep going and `Ok(false)` after a halt; any
    /// panic surfaces as an error carrying the diagnostic message.
    pub fn execute_instruction(&mut self) -> Result<bool, String> {
        let (halted, _steps) = self
            .machine
            .execute_steps(1, ExecutionMode::Strict)
            .map_err(|error| error.to_string())?;

        let debugger = self.machine.debugger().expect("fixture has a debugger");
        if debugger.is_panic() {
            return Err(debugger.message().to_string());
        }

        Ok(!halted)
    }

    /// Disassembles the instruction at `ip` and checks the consumed words.
    ///
    /// # Panics
    ///
    /// Panics on disassembly errors or an unexpected word count.
    #[must_use]
    pub fn disassemble_instruction(&self, expected_words: usize) -> String {
        let ip = self.machine.registers().named.ip() as usize;

        let result = disassemble(self.load(ip), self.load(ip + 2), FeatureLevel::V1);

        assert!(result.words > 0, "{}", result.text);
        assert_eq!(result.words, expected_words, "wrong number of instruction words");

        result.text
    }
}

impl Default for TestMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn pattern_memory(size: usize) -> Memory {
    let mut memory = Memory::with_size(size).expect("aligned test memory size");

    for (i, byte) in memory.data_mut().iter_mut().enumerate() {
        *byte = i as u8;
    }

    memory
}
