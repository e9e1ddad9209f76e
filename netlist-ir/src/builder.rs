//! Checked construction of netlist programs.

use hashbrown::HashMap;

use crate::error::{BuildError, BuildErrors};
use crate::instruction::{Instruction, Opcode};
use crate::program::{MemoryBlock, MemoryKind, Program, Register, RegisterFlags};
use crate::types::{BusWidth, MemId, RegId, Word};

/// Builds a [`Program`], checking every width invariant at insertion.
///
/// Violations do not abort the build immediately; they are recorded and the
/// whole batch is surfaced by [`ProgramBuilder::build`], so a front end can
/// report several problems in one pass. A builder that recorded at least one
/// violation never yields a program.
///
/// ```
/// use netlist_ir::{ProgramBuilder, RegisterFlags};
///
/// let mut builder = ProgramBuilder::new();
/// let a = builder.add_register(8, Some("a"), RegisterFlags::INPUT);
/// let b = builder.add_register(8, Some("b"), RegisterFlags::OUTPUT);
/// builder.add_not(b, a);
/// let program = builder.build().unwrap();
/// assert_eq!(program.instructions().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    registers: Vec<Register>,
    memories: Vec<MemoryBlock>,
    instructions: Vec<Instruction>,
    names: HashMap<String, RegId>,
    errors: Vec<BuildError>,
}

impl ProgramBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a register and returns its index.
    ///
    /// `width` must be in `1..=64` and `name`, when given, must be unique; a
    /// violation is recorded and a placeholder register is allocated so that
    /// construction can continue.
    pub fn add_register(
        &mut self,
        width: u32,
        name: Option<&str>,
        flags: RegisterFlags,
    ) -> RegId {
        let width = match BusWidth::new(width) {
            Some(width) => width,
            None => {
                self.errors.push(BuildError::InvalidWidth { width });
                BusWidth::new(1).expect("1 is a valid width")
            }
        };

        let id = RegId::from_index(self.registers.len());
        let name = match name {
            Some(name) if self.names.contains_key(name) => {
                self.errors.push(BuildError::DuplicateName {
                    name: name.to_owned(),
                });
                None
            }
            Some(name) => {
                self.names.insert(name.to_owned(), id);
                Some(name.to_owned())
            }
            None => None,
        };

        self.registers.push(Register { width, name, flags });
        id
    }

    /// `output ← value & mask(width(output))`
    ///
    /// The immediate is masked to the destination width at insertion.
    pub fn add_const(&mut self, output: RegId, value: Word) {
        let value = match self.checked(output) {
            Some(width) => value & crate::types::mask(width),
            None => value,
        };
        self.instructions.push(Instruction::Const { output, value });
    }

    /// `output ← input`
    pub fn add_load(&mut self, output: RegId, input: RegId) {
        self.expect_same_width(Opcode::Load, output, input);
        self.instructions.push(Instruction::Load { output, input });
    }

    /// `output ← ~input`
    pub fn add_not(&mut self, output: RegId, input: RegId) {
        self.expect_same_width(Opcode::Not, output, input);
        self.instructions.push(Instruction::Not { output, input });
    }

    /// `output ← lhs & rhs`
    pub fn add_and(&mut self, output: RegId, lhs: RegId, rhs: RegId) {
        self.binary(Opcode::And, output, lhs, rhs);
        self.instructions.push(Instruction::And { output, lhs, rhs });
    }

    /// `output ← lhs | rhs`
    pub fn add_or(&mut self, output: RegId, lhs: RegId, rhs: RegId) {
        self.binary(Opcode::Or, output, lhs, rhs);
        self.instructions.push(Instruction::Or { output, lhs, rhs });
    }

    /// `output ← ~(lhs & rhs)`
    pub fn add_nand(&mut self, output: RegId, lhs: RegId, rhs: RegId) {
        self.binary(Opcode::Nand, output, lhs, rhs);
        self.instructions.push(Instruction::Nand { output, lhs, rhs });
    }

    /// `output ← ~(lhs | rhs)`
    pub fn add_nor(&mut self, output: RegId, lhs: RegId, rhs: RegId) {
        self.binary(Opcode::Nor, output, lhs, rhs);
        self.instructions.push(Instruction::Nor { output, lhs, rhs });
    }

    /// `output ← lhs ^ rhs`
    pub fn add_xor(&mut self, output: RegId, lhs: RegId, rhs: RegId) {
        self.binary(Opcode::Xor, output, lhs, rhs);
        self.instructions.push(Instruction::Xor { output, lhs, rhs });
    }

    /// `output ← ~(lhs ^ rhs)`
    pub fn add_xnor(&mut self, output: RegId, lhs: RegId, rhs: RegId) {
        self.binary(Opcode::Xnor, output, lhs, rhs);
        self.instructions.push(Instruction::Xnor { output, lhs, rhs });
    }

    /// `output ← if choice == 0 { a } else { b }`
    pub fn add_mux(&mut self, output: RegId, choice: RegId, a: RegId, b: RegId) {
        self.expect_width(Opcode::Mux, choice, 1);
        self.expect_same_width(Opcode::Mux, a, b);
        self.expect_same_width(Opcode::Mux, output, a);
        self.instructions.push(Instruction::Mux {
            output,
            choice,
            a,
            b,
        });
    }

    /// `output ← input` delayed by one cycle.
    pub fn add_reg(&mut self, output: RegId, input: RegId) {
        self.expect_same_width(Opcode::Reg, output, input);
        self.instructions.push(Instruction::Reg { output, input });
    }

    /// `output ← (lhs << width(rhs)) | rhs`
    pub fn add_concat(&mut self, output: RegId, lhs: RegId, rhs: RegId) {
        if let (Some(out_w), Some(lhs_w), Some(rhs_w)) = (
            self.checked(output),
            self.checked(lhs),
            self.checked(rhs),
        ) {
            if out_w != lhs_w + rhs_w {
                self.errors.push(BuildError::WrongOperandWidth {
                    opcode: Opcode::Concat,
                    name: self.display_name(output),
                    expected: lhs_w + rhs_w,
                    found: out_w,
                });
            }
        }
        self.instructions.push(Instruction::Concat { output, lhs, rhs });
    }

    /// `output ← bit `bit` of input` (LSB = bit 0).
    pub fn add_select(&mut self, output: RegId, bit: u32, input: RegId) {
        self.expect_width(Opcode::Select, output, 1);
        if let Some(width) = self.checked(input) {
            if bit >= width {
                self.errors.push(BuildError::BitOutOfRange {
                    opcode: Opcode::Select,
                    bit,
                    name: self.display_name(input),
                    width,
                });
            }
        }
        self.instructions.push(Instruction::Select { output, bit, input });
    }

    /// `output ← bits first..=end of input` (LSB = bit 0).
    pub fn add_slice(&mut self, output: RegId, first: u32, end: u32, input: RegId) {
        if first > end {
            self.errors.push(BuildError::EmptySlice { first, end });
        } else if let Some(width) = self.checked(input) {
            if end >= width {
                self.errors.push(BuildError::BitOutOfRange {
                    opcode: Opcode::Slice,
                    bit: end,
                    name: self.display_name(input),
                    width,
                });
            }
            if let Some(out_w) = self.checked(output) {
                if out_w != end - first + 1 {
                    self.errors.push(BuildError::WrongOperandWidth {
                        opcode: Opcode::Slice,
                        name: self.display_name(output),
                        expected: end - first + 1,
                        found: out_w,
                    });
                }
            }
        }
        self.instructions.push(Instruction::Slice {
            output,
            first,
            end,
            input,
        });
    }

    /// Allocates a ROM block of `2^addr_width` words and its read
    /// instruction `output ← block[read_addr]`.
    pub fn add_rom(
        &mut self,
        output: RegId,
        addr_width: u32,
        word_width: u32,
        read_addr: RegId,
    ) -> MemId {
        let block = self.add_memory(MemoryKind::Rom, output, addr_width, word_width);
        self.expect_width(Opcode::Rom, read_addr, addr_width);
        self.expect_width(Opcode::Rom, output, word_width);
        self.instructions.push(Instruction::Rom {
            output,
            block,
            read_addr,
        });
        block
    }

    /// Allocates a RAM block of `2^addr_width` words and its combined
    /// read/write instruction.
    ///
    /// The read is combinational; the write operands are sampled during the
    /// cycle and committed at its end.
    pub fn add_ram(
        &mut self,
        output: RegId,
        addr_width: u32,
        word_width: u32,
        read_addr: RegId,
        write_enable: RegId,
        write_addr: RegId,
        write_data: RegId,
    ) -> MemId {
        let block = self.add_memory(MemoryKind::Ram, output, addr_width, word_width);
        self.expect_width(Opcode::Ram, read_addr, addr_width);
        self.expect_width(Opcode::Ram, write_enable, 1);
        self.expect_width(Opcode::Ram, write_addr, addr_width);
        self.expect_width(Opcode::Ram, write_data, word_width);
        self.expect_width(Opcode::Ram, output, word_width);
        self.instructions.push(Instruction::Ram {
            output,
            block,
            read_addr,
            write_enable,
            write_addr,
            write_data,
        });
        block
    }

    /// Finishes construction.
    ///
    /// On top of the per-insertion checks this verifies that every register
    /// is either an `INPUT` or the output of exactly one instruction. If any
    /// violation was recorded, the whole batch is returned and no program is
    /// produced.
    pub fn build(mut self) -> Result<Program, BuildErrors> {
        let mut definitions = vec![0usize; self.registers.len()];
        for inst in &self.instructions {
            let output = inst.output().to_usize();
            if output < definitions.len() {
                definitions[output] += 1;
            }
        }

        for (index, register) in self.registers.iter().enumerate() {
            let count = definitions[index];
            let name = || display_name_of(register, RegId::from_index(index));
            if register.is_input() {
                if count > 0 {
                    self.errors.push(BuildError::InputHasDefinition { name: name() });
                }
            } else if count == 0 {
                self.errors.push(BuildError::MissingDefinition { name: name() });
            } else if count > 1 {
                self.errors.push(BuildError::DuplicateDefinition { name: name() });
            }
        }

        if !self.errors.is_empty() {
            return Err(BuildErrors(self.errors));
        }

        let inputs = flagged(&self.registers, RegisterFlags::INPUT);
        let outputs = flagged(&self.registers, RegisterFlags::OUTPUT);

        Ok(Program {
            registers: self.registers,
            memories: self.memories,
            instructions: self.instructions,
            inputs,
            outputs,
        })
    }

    /// The violations recorded so far.
    pub fn errors(&self) -> &[BuildError] {
        &self.errors
    }

    /// Width of an already-allocated register, for front ends that track
    /// widths while lowering.
    pub fn width_of(&self, id: RegId) -> Option<u32> {
        self.registers.get(id.to_usize()).map(|r| r.width.get())
    }

    /// Display name of an already-allocated register, `__rN` when anonymous.
    pub fn register_name(&self, id: RegId) -> String {
        self.display_name(id)
    }

    fn add_memory(
        &mut self,
        kind: MemoryKind,
        output: RegId,
        addr_width: u32,
        word_width: u32,
    ) -> MemId {
        let addr_width = self.validated_width(addr_width);
        let word_width = self.validated_width(word_width);
        let id = MemId::from_index(self.memories.len());
        self.memories.push(MemoryBlock {
            addr_width,
            word_width,
            kind,
            output,
        });
        id
    }

    fn validated_width(&mut self, width: u32) -> BusWidth {
        match BusWidth::new(width) {
            Some(width) => width,
            None => {
                self.errors.push(BuildError::InvalidWidth { width });
                BusWidth::new(1).expect("1 is a valid width")
            }
        }
    }

    /// Records an error if `id` is out of range, otherwise returns its width.
    fn checked(&mut self, id: RegId) -> Option<u32> {
        match self.registers.get(id.to_usize()) {
            Some(register) => Some(register.width.get()),
            None => {
                self.errors.push(BuildError::UnknownRegister {
                    index: id.to_usize(),
                });
                None
            }
        }
    }

    fn expect_same_width(&mut self, opcode: Opcode, lhs: RegId, rhs: RegId) {
        if let (Some(lhs_w), Some(rhs_w)) = (self.checked(lhs), self.checked(rhs)) {
            if lhs_w != rhs_w {
                self.errors.push(BuildError::OperandWidthMismatch {
                    opcode,
                    lhs: self.display_name(lhs),
                    lhs_width: lhs_w,
                    rhs: self.display_name(rhs),
                    rhs_width: rhs_w,
                });
            }
        }
    }

    fn expect_width(&mut self, opcode: Opcode, id: RegId, expected: u32) {
        if let Some(found) = self.checked(id) {
            if found != expected {
                self.errors.push(BuildError::WrongOperandWidth {
                    opcode,
                    name: self.display_name(id),
                    expected,
                    found,
                });
            }
        }
    }

    fn binary(&mut self, opcode: Opcode, output: RegId, lhs: RegId, rhs: RegId) {
        self.expect_same_width(opcode, lhs, rhs);
        self.expect_same_width(opcode, output, lhs);
    }

    fn display_name(&self, id: RegId) -> String {
        match self.registers.get(id.to_usize()) {
            Some(register) => display_name_of(register, id),
            None => id.to_string(),
        }
    }
}

fn display_name_of(register: &Register, id: RegId) -> String {
    match register.name() {
        Some(name) => name.to_owned(),
        None => id.to_string(),
    }
}

fn flagged(registers: &[Register], flag: RegisterFlags) -> Vec<RegId> {
    registers
        .iter()
        .enumerate()
        .filter(|(_, register)| register.flags.contains(flag))
        .map(|(index, _)| RegId::from_index(index))
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    type BinaryAdd = fn(&mut ProgramBuilder, RegId, RegId, RegId);

    fn assert_single_error(builder: ProgramBuilder, expected: &BuildError) {
        let errors = builder.build().unwrap_err();
        assert_eq!(errors.first(), expected);
    }

    #[test]
    fn rejects_zero_and_oversized_widths() {
        let mut builder = ProgramBuilder::new();
        builder.add_register(0, None, RegisterFlags::INPUT);
        builder.add_register(65, None, RegisterFlags::INPUT);
        let errors = builder.build().unwrap_err();
        assert_eq!(
            errors.0,
            vec![
                BuildError::InvalidWidth { width: 0 },
                BuildError::InvalidWidth { width: 65 },
            ]
        );
    }

    #[rstest]
    #[case::and(ProgramBuilder::add_and as BinaryAdd)]
    #[case::or(ProgramBuilder::add_or as BinaryAdd)]
    #[case::nand(ProgramBuilder::add_nand as BinaryAdd)]
    #[case::nor(ProgramBuilder::add_nor as BinaryAdd)]
    #[case::xor(ProgramBuilder::add_xor as BinaryAdd)]
    #[case::xnor(ProgramBuilder::add_xnor as BinaryAdd)]
    fn binary_operands_must_share_the_output_width(#[case] add: BinaryAdd) {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(4, Some("a"), RegisterFlags::INPUT);
        let b = builder.add_register(8, Some("b"), RegisterFlags::INPUT);
        let c = builder.add_register(4, Some("c"), RegisterFlags::OUTPUT);
        add(&mut builder, c, a, b);
        assert!(matches!(
            builder.build().unwrap_err().first(),
            BuildError::OperandWidthMismatch { .. }
        ));
    }

    #[test]
    fn mux_choice_must_be_one_bit() {
        let mut builder = ProgramBuilder::new();
        let s = builder.add_register(2, Some("s"), RegisterFlags::INPUT);
        let a = builder.add_register(8, Some("a"), RegisterFlags::INPUT);
        let b = builder.add_register(8, Some("b"), RegisterFlags::INPUT);
        let d = builder.add_register(8, Some("d"), RegisterFlags::OUTPUT);
        builder.add_mux(d, s, a, b);
        assert_single_error(
            builder,
            &BuildError::WrongOperandWidth {
                opcode: Opcode::Mux,
                name: "s".into(),
                expected: 1,
                found: 2,
            },
        );
    }

    #[test]
    fn concat_output_width_is_the_operand_sum() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(4, Some("a"), RegisterFlags::INPUT);
        let b = builder.add_register(3, Some("b"), RegisterFlags::INPUT);
        let c = builder.add_register(8, Some("c"), RegisterFlags::OUTPUT);
        builder.add_concat(c, a, b);
        assert_single_error(
            builder,
            &BuildError::WrongOperandWidth {
                opcode: Opcode::Concat,
                name: "c".into(),
                expected: 7,
                found: 8,
            },
        );
    }

    #[rstest]
    #[case::in_range(2, true)]
    #[case::boundary(4, false)]
    fn select_bit_must_be_inside_the_operand(#[case] bit: u32, #[case] ok: bool) {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(4, Some("a"), RegisterFlags::INPUT);
        let o = builder.add_register(1, Some("o"), RegisterFlags::OUTPUT);
        builder.add_select(o, bit, a);
        assert_eq!(builder.build().is_ok(), ok);
    }

    #[test]
    fn slice_bounds_are_validated() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(8, Some("a"), RegisterFlags::INPUT);
        let o = builder.add_register(4, Some("o"), RegisterFlags::OUTPUT);
        builder.add_slice(o, 3, 1, a);
        assert_single_error(builder, &BuildError::EmptySlice { first: 3, end: 1 });

        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(8, Some("a"), RegisterFlags::INPUT);
        let o = builder.add_register(4, Some("o"), RegisterFlags::OUTPUT);
        builder.add_slice(o, 5, 8, a);
        assert_single_error(
            builder,
            &BuildError::BitOutOfRange {
                opcode: Opcode::Slice,
                bit: 8,
                name: "a".into(),
                width: 8,
            },
        );
    }

    #[test]
    fn single_bit_slice_is_allowed() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(8, Some("a"), RegisterFlags::INPUT);
        let o = builder.add_register(1, Some("o"), RegisterFlags::OUTPUT);
        builder.add_slice(o, 2, 2, a);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn ram_geometry_is_validated() {
        let mut builder = ProgramBuilder::new();
        let ra = builder.add_register(8, Some("ra"), RegisterFlags::INPUT);
        let we = builder.add_register(1, Some("we"), RegisterFlags::INPUT);
        let wa = builder.add_register(4, Some("wa"), RegisterFlags::INPUT);
        let wd = builder.add_register(16, Some("wd"), RegisterFlags::INPUT);
        let o = builder.add_register(16, Some("o"), RegisterFlags::OUTPUT);
        builder.add_ram(o, 8, 16, ra, we, wa, wd);
        assert_single_error(
            builder,
            &BuildError::WrongOperandWidth {
                opcode: Opcode::Ram,
                name: "wa".into(),
                expected: 8,
                found: 4,
            },
        );
    }

    #[test]
    fn registers_need_exactly_one_definition() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(1, Some("a"), RegisterFlags::INPUT);
        let b = builder.add_register(1, Some("b"), RegisterFlags::OUTPUT);
        let _c = builder.add_register(1, Some("c"), RegisterFlags::empty());
        builder.add_not(b, a);
        builder.add_not(b, a);
        let errors = builder.build().unwrap_err();
        assert!(errors
            .0
            .contains(&BuildError::DuplicateDefinition { name: "b".into() }));
        assert!(errors
            .0
            .contains(&BuildError::MissingDefinition { name: "c".into() }));
    }

    #[test]
    fn inputs_must_not_be_defined() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(1, Some("a"), RegisterFlags::INPUT);
        builder.add_const(a, 1);
        assert_single_error(builder, &BuildError::InputHasDefinition { name: "a".into() });
    }

    #[test]
    fn names_must_be_unique() {
        let mut builder = ProgramBuilder::new();
        builder.add_register(1, Some("a"), RegisterFlags::INPUT);
        builder.add_register(1, Some("a"), RegisterFlags::INPUT);
        assert_single_error(builder, &BuildError::DuplicateName { name: "a".into() });
    }

    #[test]
    fn constants_are_masked_at_insertion() {
        let mut builder = ProgramBuilder::new();
        let o = builder.add_register(4, Some("o"), RegisterFlags::OUTPUT);
        builder.add_const(o, 0xffff);
        let program = builder.build().unwrap();
        assert_eq!(
            program.instructions()[0],
            Instruction::Const {
                output: o,
                value: 0b1111
            },
        );
    }

    #[test]
    fn inputs_and_outputs_keep_creation_order() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(1, Some("a"), RegisterFlags::INPUT);
        let b = builder.add_register(1, Some("b"), RegisterFlags::INPUT | RegisterFlags::OUTPUT);
        let c = builder.add_register(1, Some("c"), RegisterFlags::OUTPUT);
        builder.add_not(c, a);
        let program = builder.build().unwrap();
        assert_eq!(program.inputs(), &[a, b]);
        assert_eq!(program.outputs(), &[b, c]);
    }
}
