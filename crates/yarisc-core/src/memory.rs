//! Main memory and non-owning memory views.

use crate::error::MemoryError;
use crate::registers::MachineRegisters;
use crate::word::{is_aligned, load_word, store_word, Address, Word};

fn check_aligned(value: usize) -> Result<(), MemoryError> {
    if is_aligned(value) {
        Ok(())
    } else {
        Err(MemoryError::Unaligned)
    }
}

fn check_in_range(off: usize, size: usize) -> Result<(), MemoryError> {
    if off > size {
        Err(MemoryError::OutOfRange)
    } else {
        Ok(())
    }
}

/// Main memory of the machine.
///
/// Owns a contiguous block of word-aligned memory. Sizes and offsets are in
/// bytes; operations that take them report [`MemoryError::Unaligned`] when
/// they are not word-aligned.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    data: Box<[u8]>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("size", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Maximum size in bytes that can be addressed by the machine.
    pub const MAX_SIZE: usize = Address::MAX as usize + 1;

    /// Size value requesting everything up to the end of the memory area.
    pub const NPOS: usize = usize::MAX;

    /// Allocates the maximum size that can be addressed by the machine,
    /// zero-initialized.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: vec![0; Self::MAX_SIZE].into_boxed_slice(),
        }
    }

    /// Allocates `sz` bytes of zero-initialized memory.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Unaligned`] when `sz` is not word-aligned and
    /// [`MemoryError::NotAddressable`] when it exceeds the addressable space.
    pub fn with_size(sz: usize) -> Result<Self, MemoryError> {
        check_aligned(sz)?;

        if sz > Self::MAX_SIZE {
            return Err(MemoryError::NotAddressable);
        }

        Ok(Self {
            data: vec![0; sz].into_boxed_slice(),
        })
    }

    /// Returns the size of the memory in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true when the memory area is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the raw bytes of the memory.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the raw bytes of the memory for mutation.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Clears the memory to all zeros.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Loads a word from memory.
    ///
    /// `address` must be word-aligned and within the memory area.
    ///
    /// # Panics
    ///
    /// Panics when `address` points beyond the memory area.
    #[must_use]
    pub fn load(&self, address: Address) -> Word {
        debug_assert!(is_aligned(address as usize));

        load_word(&self.data[address as usize..])
    }

    /// Stores a word to memory.
    ///
    /// `address` must be word-aligned and within the memory area.
    ///
    /// # Panics
    ///
    /// Panics when `address` points beyond the memory area.
    pub fn store(&mut self, address: Address, value: Word) {
        debug_assert!(is_aligned(address as usize));

        store_word(&mut self.data[address as usize..], value);
    }

    /// Returns a view into a subarea of the memory.
    ///
    /// The given size `sz` is trimmed to the end of memory; pass
    /// [`Memory::NPOS`] for everything up to the end.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Unaligned`] when `off` is not word-aligned and
    /// [`MemoryError::OutOfRange`] when it points beyond the memory area.
    pub fn sub<'a>(
        &'a self,
        off: usize,
        sz: usize,
        registers: Option<&'a MachineRegisters>,
    ) -> Result<MemoryView<'a>, MemoryError> {
        check_aligned(off)?;
        check_in_range(off, self.size())?;

        let sz = sz.min(self.size() - off);

        MemoryView::new(&self.data[off..off + sz], off as Address, registers)
    }

    /// Returns a view of the whole memory area.
    #[must_use]
    pub fn view<'a>(&'a self, registers: Option<&'a MachineRegisters>) -> MemoryView<'a> {
        MemoryView {
            data: &self.data,
            base: 0,
            registers,
        }
    }
}

/// Non-owning aligned view of machine memory.
///
/// Stores a word-aligned window into the memory of the machine together with
/// the base address the window corresponds to in the emulated address space
/// and an optional reference to the machine registers for visualization.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    data: &'a [u8],
    base: Address,
    registers: Option<&'a MachineRegisters>,
}

impl<'a> MemoryView<'a> {
    /// Creates a view over `data` with the given base address.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Unaligned`] when the length of `data` or the
    /// base address are not word-aligned.
    pub fn new(
        data: &'a [u8],
        base: Address,
        registers: Option<&'a MachineRegisters>,
    ) -> Result<Self, MemoryError> {
        check_aligned(data.len())?;
        check_aligned(base as usize)?;

        Ok(Self {
            data,
            base,
            registers,
        })
    }

    /// Returns the bytes of the view.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the size of the view in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true when the view is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the byte address in machine memory that corresponds to the
    /// start of the view.
    #[must_use]
    pub const fn base(&self) -> Address {
        self.base
    }

    /// Returns the machine registers attached for visualization.
    #[must_use]
    pub const fn registers(&self) -> Option<&'a MachineRegisters> {
        self.registers
    }

    /// Returns a view into a subarea of this view.
    ///
    /// The given size `sz` is trimmed to the end of the view; pass
    /// [`Memory::NPOS`] for everything up to the end.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Unaligned`] when `off` is not word-aligned and
    /// [`MemoryError::OutOfRange`] when it points beyond the view.
    pub fn sub(&self, off: usize, sz: usize) -> Result<Self, MemoryError> {
        check_aligned(off)?;
        check_in_range(off, self.size())?;

        let sz = sz.min(self.size() - off);

        Ok(Self {
            data: &self.data[off..off + sz],
            base: self.base.wrapping_add(off as Address),
            registers: self.registers,
        })
    }
}
