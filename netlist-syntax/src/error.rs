//! Diagnostics for the textual front end.

use netlist_ir::BuildErrors;

use crate::token::SourcePos;

/// An error detected while lexing or parsing netlist source.
///
/// Every variant carries the source position it was detected at; the caller
/// is expected to prefix the file name when rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SyntaxError {
    /// A character outside the language's alphabet.
    #[error("{pos}: unexpected character `{ch}`")]
    UnexpectedChar {
        /// Position of the character.
        pos: SourcePos,
        /// The rejected character.
        ch: char,
    },
    /// A numeric literal with missing or foreign digits.
    #[error("{pos}: malformed literal `{spelling}`")]
    MalformedLiteral {
        /// Position of the literal.
        pos: SourcePos,
        /// The rejected spelling.
        spelling: String,
    },
    /// The grammar expected something else here.
    #[error("{pos}: unexpected token `{found}`, expected {expected}")]
    UnexpectedToken {
        /// Position of the offending token.
        pos: SourcePos,
        /// Spelling of the offending token.
        found: String,
        /// Description of what was acceptable.
        expected: String,
    },
    /// A variable that the `VAR` section does not declare.
    #[error("{pos}: unknown variable `{name}`")]
    UnknownVariable {
        /// Position of the reference.
        pos: SourcePos,
        /// The unresolved name.
        name: String,
    },
    /// A name declared twice in the `VAR` section.
    #[error("{pos}: variable `{name}` is already declared")]
    DuplicateDeclaration {
        /// Position of the second declaration.
        pos: SourcePos,
        /// The redeclared name.
        name: String,
    },
    /// A name listed twice in `INPUT` or twice in `OUTPUT`.
    #[error("{pos}: `{name}` is already listed as an {role}")]
    DuplicateRole {
        /// Position of the second listing.
        pos: SourcePos,
        /// The relisted name.
        name: String,
        /// `"input"` or `"output"`.
        role: &'static str,
    },
    /// A name listed in `INPUT`/`OUTPUT` but missing from `VAR`.
    #[error("{pos}: `{name}` is listed as an {role} but not declared in VAR")]
    UndeclaredRole {
        /// Position of the listing.
        pos: SourcePos,
        /// The undeclared name.
        name: String,
        /// `"input"` or `"output"`.
        role: &'static str,
    },
    /// A second equation for the same variable.
    #[error("{pos}: variable `{name}` already has an equation")]
    DuplicateEquation {
        /// Position of the second equation.
        pos: SourcePos,
        /// The redefined name.
        name: String,
    },
    /// An equation whose left-hand side is an input.
    #[error("{pos}: input variable `{name}` cannot have an equation")]
    InputEquation {
        /// Position of the equation.
        pos: SourcePos,
        /// The input's name.
        name: String,
    },
    /// A declared non-input variable without an equation.
    #[error("{pos}: variable `{name}` has no equation and is not an input")]
    MissingEquation {
        /// Position of the declaration.
        pos: SourcePos,
        /// The undefined name.
        name: String,
    },
    /// An operand whose width differs from what its position requires.
    #[error("{pos}: `{name}` is {found} bits wide, expected {expected}")]
    WidthMismatch {
        /// Position of the expression.
        pos: SourcePos,
        /// Display name of the operand.
        name: String,
        /// Required width.
        expected: u32,
        /// Actual width.
        found: u32,
    },
    /// Two operands that must agree on width but do not.
    #[error("{pos}: `{lhs}` ({lhs_width} bits) and `{rhs}` ({rhs_width} bits) must have the same width")]
    OperandWidthMismatch {
        /// Position of the expression.
        pos: SourcePos,
        /// Display name of the first operand.
        lhs: String,
        /// Width of the first operand.
        lhs_width: u32,
        /// Display name of the second operand.
        rhs: String,
        /// Width of the second operand.
        rhs_width: u32,
    },
    /// A `SELECT`/`SLICE` bit position outside its operand.
    #[error("{pos}: bit {bit} is out of range for `{name}` ({width} bits)")]
    BitOutOfRange {
        /// Position of the expression.
        pos: SourcePos,
        /// The rejected bit.
        bit: u32,
        /// Display name of the operand.
        name: String,
        /// Width of the operand.
        width: u32,
    },
    /// A `SLICE` whose bounds run backwards.
    #[error("{pos}: slice {first}..={end} is empty")]
    EmptySlice {
        /// Position of the expression.
        pos: SourcePos,
        /// First bit.
        first: u32,
        /// Last bit.
        end: u32,
    },
    /// A constant too large for its width.
    #[error("{pos}: value {value} does not fit in {width} bits")]
    ValueTooWide {
        /// Position of the literal.
        pos: SourcePos,
        /// The rejected value.
        value: u64,
        /// The width it must fit.
        width: u32,
    },
    /// A width outside `1..=64`.
    #[error("{pos}: width {width} is outside the supported range 1..=64")]
    WidthOutOfRange {
        /// Position of the width.
        pos: SourcePos,
        /// The rejected width.
        width: u64,
    },
    /// A constant that does not fit a 64-bit word at all.
    #[error("{pos}: constant `{spelling}` does not fit in 64 bits")]
    LiteralOverflow {
        /// Position of the literal.
        pos: SourcePos,
        /// Spelling of the literal, prefix included.
        spelling: String,
    },
    /// A `0d`/`0x` constant without its mandatory `:width` suffix.
    #[error("{pos}: constant `{spelling}` needs an explicit `:width` suffix")]
    MissingWidthSuffix {
        /// Position of the literal.
        pos: SourcePos,
        /// Spelling of the literal, prefix included.
        spelling: String,
    },
    /// Violations the builder detected that the parser did not.
    #[error(transparent)]
    Build(#[from] BuildErrors),
}
