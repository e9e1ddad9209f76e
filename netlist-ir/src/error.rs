//! Construction errors reported by the program builder.

use itertools::Itertools;

use crate::instruction::Opcode;

/// A single violation recorded while building a program.
///
/// Registers are identified by their display name (`__rN` when anonymous) so
/// the message stays meaningful once the builder is gone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    /// A requested bus width falls outside `1..=64`.
    #[error("bus width {width} is outside the supported range 1..=64")]
    InvalidWidth {
        /// The rejected width.
        width: u32,
    },
    /// An operand refers to a register that was never allocated.
    #[error("register index {index} is out of range")]
    UnknownRegister {
        /// The out-of-range raw index.
        index: usize,
    },
    /// Two operands of equal-width positions disagree.
    #[error("{opcode}: operands `{lhs}` ({lhs_width} bits) and `{rhs}` ({rhs_width} bits) must have the same width")]
    OperandWidthMismatch {
        /// Offending opcode.
        opcode: Opcode,
        /// Display name of the left operand.
        lhs: String,
        /// Width of the left operand.
        lhs_width: u32,
        /// Display name of the right operand.
        rhs: String,
        /// Width of the right operand.
        rhs_width: u32,
    },
    /// An operand has a fixed expected width and a different actual width.
    #[error("{opcode}: operand `{name}` is {found} bits wide, expected {expected}")]
    WrongOperandWidth {
        /// Offending opcode.
        opcode: Opcode,
        /// Display name of the operand.
        name: String,
        /// Expected width in bits.
        expected: u32,
        /// Actual width in bits.
        found: u32,
    },
    /// A `SELECT` or `SLICE` bit position does not fit its operand.
    #[error("{opcode}: bit {bit} is out of range for `{name}` ({width} bits)")]
    BitOutOfRange {
        /// Offending opcode.
        opcode: Opcode,
        /// The rejected bit position.
        bit: u32,
        /// Display name of the operand.
        name: String,
        /// Width of the operand.
        width: u32,
    },
    /// A `SLICE` range runs backwards.
    #[error("SLICE: range {first}..={end} is empty")]
    EmptySlice {
        /// First bit of the slice.
        first: u32,
        /// Last bit of the slice.
        end: u32,
    },
    /// Two registers were declared with the same name.
    #[error("register name `{name}` is already in use")]
    DuplicateName {
        /// The colliding name.
        name: String,
    },
    /// Two instructions write the same register.
    #[error("register `{name}` has more than one defining instruction")]
    DuplicateDefinition {
        /// Display name of the register.
        name: String,
    },
    /// A non-input register has no defining instruction.
    #[error("register `{name}` is neither an input nor defined by an instruction")]
    MissingDefinition {
        /// Display name of the register.
        name: String,
    },
    /// An input register has a defining instruction.
    #[error("input register `{name}` must not have a defining instruction")]
    InputHasDefinition {
        /// Display name of the register.
        name: String,
    },
}

/// Every violation recorded during a failed build, in recording order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildErrors(pub Vec<BuildError>);

impl std::fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().map(ToString::to_string).join("; "))
    }
}

impl std::error::Error for BuildErrors {}

impl BuildErrors {
    /// The first recorded violation.
    pub fn first(&self) -> &BuildError {
        &self.0[0]
    }
}
