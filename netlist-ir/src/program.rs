//! The program container: register table, memory-block table, instructions.

use std::borrow::Cow;

use crate::instruction::Instruction;
use crate::types::{BusWidth, MemId, RegId};

bitflags::bitflags! {
    /// Role flags of a register.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct RegisterFlags: u8 {
        /// The register is set by the external driver before each cycle and
        /// has no defining instruction.
        const INPUT = 0b01;
        /// The register's value is reported to the external driver after
        /// each cycle.
        const OUTPUT = 0b10;
    }
}

/// A fixed-width bit-vector storage cell.
///
/// Width, name and flags are immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    pub(crate) width: BusWidth,
    pub(crate) name: Option<String>,
    pub(crate) flags: RegisterFlags,
}

impl Register {
    /// The register's bus width.
    pub const fn width(&self) -> BusWidth {
        self.width
    }

    /// The register's declared name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The register's role flags.
    pub const fn flags(&self) -> RegisterFlags {
        self.flags
    }

    /// Whether the register is set externally before each cycle.
    pub const fn is_input(&self) -> bool {
        self.flags.contains(RegisterFlags::INPUT)
    }

    /// Whether the register is reported externally after each cycle.
    pub const fn is_output(&self) -> bool {
        self.flags.contains(RegisterFlags::OUTPUT)
    }
}

/// Kind of a memory block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryKind {
    /// Read-only; must be preloaded with an image before simulation.
    Rom,
    /// Readable and writable; zero-initialized unless preloaded.
    Ram,
}

/// A memory block of `2^addr_width` words of `word_width` bits, associated
/// with a single `ROM` or `RAM` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryBlock {
    pub(crate) addr_width: BusWidth,
    pub(crate) word_width: BusWidth,
    pub(crate) kind: MemoryKind,
    pub(crate) output: RegId,
}

impl MemoryBlock {
    /// Width of the address bus; the block holds `2^addr_width` words.
    pub const fn addr_width(&self) -> BusWidth {
        self.addr_width
    }

    /// Width of a stored word.
    pub const fn word_width(&self) -> BusWidth {
        self.word_width
    }

    /// Whether the block is a ROM or a RAM.
    pub const fn kind(&self) -> MemoryKind {
        self.kind
    }

    /// The register written by the instruction owning this block. The
    /// register's name doubles as the block's name for image loading.
    pub const fn output(&self) -> RegId {
        self.output
    }

    /// Number of words in the block.
    pub const fn len(&self) -> usize {
        1usize << self.addr_width.get()
    }

    /// A block always holds at least two words (`addr_width >= 1`).
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// A validated netlist program.
///
/// Owns the register table, the memory-block table and the ordered
/// instruction list. Construction goes through [`crate::ProgramBuilder`],
/// which guarantees that every referenced index is in range and that every
/// register is either an input or the output of exactly one instruction.
///
/// A program is immutable during simulation; several simulator instances may
/// borrow the same program.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) registers: Vec<Register>,
    pub(crate) memories: Vec<MemoryBlock>,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) inputs: Vec<RegId>,
    pub(crate) outputs: Vec<RegId>,
}

impl Program {
    /// The register table, indexed by [`RegId`].
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// The register behind `id`.
    pub fn register(&self, id: RegId) -> &Register {
        &self.registers[id.to_usize()]
    }

    /// Convenience accessor for a register's width in bits.
    pub fn width(&self, id: RegId) -> u32 {
        self.register(id).width.get()
    }

    /// The display name of a register: its declared name, or `__rN` for
    /// anonymous registers.
    pub fn register_name(&self, id: RegId) -> Cow<'_, str> {
        match self.register(id).name() {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(id.to_string()),
        }
    }

    /// The memory-block table, indexed by [`MemId`].
    pub fn memories(&self) -> &[MemoryBlock] {
        &self.memories
    }

    /// The memory block behind `id`.
    pub fn memory(&self, id: MemId) -> &MemoryBlock {
        &self.memories[id.to_usize()]
    }

    /// Finds the memory block whose owning register bears `name`.
    pub fn memory_by_name(&self, name: &str) -> Option<MemId> {
        self.memories
            .iter()
            .position(|block| self.register_name(block.output) == name)
            .map(MemId::from_index)
    }

    /// The instruction list, in its current (possibly scheduled) order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Registers flagged `INPUT`, in creation order.
    pub fn inputs(&self) -> &[RegId] {
        &self.inputs
    }

    /// Registers flagged `OUTPUT`, in creation order.
    pub fn outputs(&self) -> &[RegId] {
        &self.outputs
    }

    /// For every register, the index of the instruction that writes it, or
    /// `None` for inputs.
    pub fn definitions(&self) -> Vec<Option<usize>> {
        let mut defs = vec![None; self.registers.len()];
        for (index, inst) in self.instructions.iter().enumerate() {
            defs[inst.output().to_usize()] = Some(index);
        }
        defs
    }

    /// Replaces the instruction sequence with a permutation of itself.
    ///
    /// This is the scheduler's commit point: `order[k]` is the index, in the
    /// current list, of the instruction to run `k`-th.
    ///
    /// # Panics
    ///
    /// Panics if `order` is not a permutation of `0..instructions.len()`.
    pub fn reorder_instructions(&mut self, order: &[usize]) {
        assert_eq!(order.len(), self.instructions.len());
        let mut seen = vec![false; order.len()];
        for &index in order {
            assert!(!seen[index], "duplicate instruction index in schedule");
            seen[index] = true;
        }
        self.instructions = order.iter().map(|&index| self.instructions[index]).collect();
    }
}
