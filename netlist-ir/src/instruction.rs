//! The netlist instruction set.

use crate::types::{MemId, RegId, Word};

/// Mnemonic of an [`Instruction`], without its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "UPPERCASE")]
pub enum Opcode {
    /// Load an immediate constant.
    Const,
    /// Copy a register.
    Load,
    /// Bitwise complement.
    Not,
    /// Bitwise conjunction.
    And,
    /// Bitwise disjunction.
    Or,
    /// Negated conjunction.
    Nand,
    /// Negated disjunction.
    Nor,
    /// Bitwise exclusive or.
    Xor,
    /// Negated exclusive or.
    Xnor,
    /// Two-way multiplexer.
    Mux,
    /// One-cycle delay.
    Reg,
    /// Bus concatenation.
    Concat,
    /// Single-bit extraction.
    Select,
    /// Contiguous bit-range extraction.
    Slice,
    /// Read-only memory read.
    Rom,
    /// Random-access memory read and conditional write.
    Ram,
}

/// A single netlist instruction.
///
/// Every instruction writes exactly one output register. Operand registers
/// are referred to by [`RegId`]; the width invariants relating operands to
/// the output are enforced by [`crate::ProgramBuilder`] and can be assumed to
/// hold on any instruction reachable from a built [`crate::Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    /// `output ← value & mask(w_out)`
    Const {
        /// Destination register.
        output: RegId,
        /// Immediate value, masked to the output width on execution.
        value: Word,
    },
    /// `output ← input`
    Load {
        /// Destination register.
        output: RegId,
        /// Source register, same width as the output.
        input: RegId,
    },
    /// `output ← ~input & mask(w_out)`
    Not {
        /// Destination register.
        output: RegId,
        /// Source register, same width as the output.
        input: RegId,
    },
    /// `output ← lhs & rhs`
    And {
        /// Destination register.
        output: RegId,
        /// Left operand.
        lhs: RegId,
        /// Right operand.
        rhs: RegId,
    },
    /// `output ← lhs | rhs`
    Or {
        /// Destination register.
        output: RegId,
        /// Left operand.
        lhs: RegId,
        /// Right operand.
        rhs: RegId,
    },
    /// `output ← ~(lhs & rhs) & mask(w_out)`
    Nand {
        /// Destination register.
        output: RegId,
        /// Left operand.
        lhs: RegId,
        /// Right operand.
        rhs: RegId,
    },
    /// `output ← ~(lhs | rhs) & mask(w_out)`
    Nor {
        /// Destination register.
        output: RegId,
        /// Left operand.
        lhs: RegId,
        /// Right operand.
        rhs: RegId,
    },
    /// `output ← lhs ^ rhs`
    Xor {
        /// Destination register.
        output: RegId,
        /// Left operand.
        lhs: RegId,
        /// Right operand.
        rhs: RegId,
    },
    /// `output ← ~(lhs ^ rhs) & mask(w_out)`
    Xnor {
        /// Destination register.
        output: RegId,
        /// Left operand.
        lhs: RegId,
        /// Right operand.
        rhs: RegId,
    },
    /// `output ← if choice == 0 { a } else { b }`
    Mux {
        /// Destination register.
        output: RegId,
        /// 1-bit selector.
        choice: RegId,
        /// Value taken when `choice` is 0.
        a: RegId,
        /// Value taken when `choice` is 1.
        b: RegId,
    },
    /// `output ← input` as it was at the *end of the previous cycle*.
    ///
    /// This is the only combinational feedback breaker: its operand does not
    /// create a same-cycle dependency.
    Reg {
        /// Destination register.
        output: RegId,
        /// Source register, read one cycle late.
        input: RegId,
    },
    /// `output ← (lhs << width(rhs)) | rhs`
    ///
    /// `rhs` occupies the low bits and `lhs` the high bits;
    /// `width(output) = width(lhs) + width(rhs)`.
    Concat {
        /// Destination register.
        output: RegId,
        /// High part.
        lhs: RegId,
        /// Low part.
        rhs: RegId,
    },
    /// `output ← (input >> bit) & 1`, with bit 0 the least significant.
    Select {
        /// Destination register, 1 bit wide.
        output: RegId,
        /// Bit position, `bit < width(input)`.
        bit: u32,
        /// Source register.
        input: RegId,
    },
    /// `output ← bits first..=end of input`, with bit `first` landing at bit
    /// 0 of the output; `width(output) = end - first + 1`.
    Slice {
        /// Destination register.
        output: RegId,
        /// First extracted bit, LSB-first.
        first: u32,
        /// Last extracted bit, inclusive; `first <= end < width(input)`.
        end: u32,
        /// Source register.
        input: RegId,
    },
    /// `output ← block[read_addr]`
    Rom {
        /// Destination register, as wide as the block's words.
        output: RegId,
        /// The memory block read from.
        block: MemId,
        /// Read address, as wide as the block's address bus.
        read_addr: RegId,
    },
    /// `output ← block[read_addr]` as the block stands *before* any write of
    /// this cycle; if `write_enable` is 1, `block[write_addr] ← write_data`
    /// is committed at the end of the cycle.
    Ram {
        /// Destination register, as wide as the block's words.
        output: RegId,
        /// The memory block read and written.
        block: MemId,
        /// Read address, as wide as the block's address bus.
        read_addr: RegId,
        /// 1-bit write strobe, sampled at this instruction's position.
        write_enable: RegId,
        /// Write address, as wide as the block's address bus.
        write_addr: RegId,
        /// Written word, as wide as the block's words.
        write_data: RegId,
    },
}

impl Instruction {
    /// The register this instruction writes.
    pub const fn output(&self) -> RegId {
        match *self {
            Self::Const { output, .. }
            | Self::Load { output, .. }
            | Self::Not { output, .. }
            | Self::And { output, .. }
            | Self::Or { output, .. }
            | Self::Nand { output, .. }
            | Self::Nor { output, .. }
            | Self::Xor { output, .. }
            | Self::Xnor { output, .. }
            | Self::Mux { output, .. }
            | Self::Reg { output, .. }
            | Self::Concat { output, .. }
            | Self::Select { output, .. }
            | Self::Slice { output, .. }
            | Self::Rom { output, .. }
            | Self::Ram { output, .. } => output,
        }
    }

    /// The mnemonic of this instruction.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Const { .. } => Opcode::Const,
            Self::Load { .. } => Opcode::Load,
            Self::Not { .. } => Opcode::Not,
            Self::And { .. } => Opcode::And,
            Self::Or { .. } => Opcode::Or,
            Self::Nand { .. } => Opcode::Nand,
            Self::Nor { .. } => Opcode::Nor,
            Self::Xor { .. } => Opcode::Xor,
            Self::Xnor { .. } => Opcode::Xnor,
            Self::Mux { .. } => Opcode::Mux,
            Self::Reg { .. } => Opcode::Reg,
            Self::Concat { .. } => Opcode::Concat,
            Self::Select { .. } => Opcode::Select,
            Self::Slice { .. } => Opcode::Slice,
            Self::Rom { .. } => Opcode::Rom,
            Self::Ram { .. } => Opcode::Ram,
        }
    }

    /// The operand registers that must already hold their current-cycle value
    /// when this instruction executes.
    ///
    /// The `REG` operand and the RAM write operands are excluded: the former
    /// reads the previous cycle, the latter are only committed at the end of
    /// the cycle. Operands flagged `INPUT` still appear here; dependency
    /// analysis filters them out since inputs are set before the cycle.
    pub fn same_cycle_inputs(&self) -> Vec<RegId> {
        match *self {
            Self::Const { .. } | Self::Reg { .. } => Vec::new(),
            Self::Load { input, .. }
            | Self::Not { input, .. }
            | Self::Select { input, .. }
            | Self::Slice { input, .. } => vec![input],
            Self::And { lhs, rhs, .. }
            | Self::Or { lhs, rhs, .. }
            | Self::Nand { lhs, rhs, .. }
            | Self::Nor { lhs, rhs, .. }
            | Self::Xor { lhs, rhs, .. }
            | Self::Xnor { lhs, rhs, .. }
            | Self::Concat { lhs, rhs, .. } => vec![lhs, rhs],
            Self::Mux { choice, a, b, .. } => vec![choice, a, b],
            Self::Rom { read_addr, .. } | Self::Ram { read_addr, .. } => vec![read_addr],
        }
    }

    /// The operand registers read across the cycle boundary: the `REG` source
    /// and the RAM write operands. They never create same-cycle dependencies.
    pub fn deferred_inputs(&self) -> Vec<RegId> {
        match *self {
            Self::Reg { input, .. } => vec![input],
            Self::Ram {
                write_enable,
                write_addr,
                write_data,
                ..
            } => vec![write_enable, write_addr, write_data],
            _ => Vec::new(),
        }
    }
}
