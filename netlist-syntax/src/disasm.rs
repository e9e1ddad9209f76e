//! Textual rendering of programs, round-trippable through [`crate::parse`].

use std::fmt::Write;

use itertools::Itertools;
use netlist_ir::{Instruction, Program, RegId};

/// Renders a program as netlist source.
///
/// Sections appear in the order `INPUT`, `OUTPUT`, `VAR`, `IN`, followed by
/// one equation per instruction in the program's current instruction order;
/// disassembling a scheduled program therefore yields the scheduled text.
/// Declarations carry a `:width` suffix when the width is not 1, anonymous
/// registers appear as `__rN`, and constants print as zero-padded binary at
/// the width of their destination.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();

    let names = |regs: &[RegId]| {
        regs.iter()
            .map(|&reg| program.register_name(reg).into_owned())
            .join(", ")
    };

    writeln!(out, "INPUT {}", names(program.inputs())).expect("infallible");
    writeln!(out, "OUTPUT {}", names(program.outputs())).expect("infallible");

    let declarations = program
        .registers()
        .iter()
        .enumerate()
        .map(|(index, register)| {
            let name = program.register_name(RegId::from_index(index));
            match register.width().get() {
                1 => name.into_owned(),
                width => format!("{name}:{width}"),
            }
        })
        .join(", ");
    writeln!(out, "VAR {declarations}").expect("infallible");
    writeln!(out, "IN").expect("infallible");

    for inst in program.instructions() {
        writeln!(out, "{}", equation(program, inst)).expect("infallible");
    }

    out
}

fn equation(program: &Program, inst: &Instruction) -> String {
    let name = |reg: RegId| program.register_name(reg);
    let output = name(inst.output());

    match *inst {
        Instruction::Const { output: o, value } => {
            let width = program.width(o) as usize;
            format!("{output} = {value:0width$b}")
        }
        Instruction::Load { input, .. } => format!("{output} = {}", name(input)),
        Instruction::Not { input, .. } => format!("{output} = NOT {}", name(input)),
        Instruction::And { lhs, rhs, .. }
        | Instruction::Or { lhs, rhs, .. }
        | Instruction::Nand { lhs, rhs, .. }
        | Instruction::Nor { lhs, rhs, .. }
        | Instruction::Xor { lhs, rhs, .. }
        | Instruction::Xnor { lhs, rhs, .. } => {
            format!("{output} = {} {} {}", inst.opcode(), name(lhs), name(rhs))
        }
        Instruction::Mux { choice, a, b, .. } => {
            format!("{output} = MUX {} {} {}", name(choice), name(a), name(b))
        }
        Instruction::Reg { input, .. } => format!("{output} = REG {}", name(input)),
        Instruction::Concat { lhs, rhs, .. } => {
            format!("{output} = CONCAT {} {}", name(lhs), name(rhs))
        }
        Instruction::Select { bit, input, .. } => {
            format!("{output} = SELECT {bit} {}", name(input))
        }
        Instruction::Slice {
            first, end, input, ..
        } => format!("{output} = SLICE {first} {end} {}", name(input)),
        Instruction::Rom {
            block, read_addr, ..
        } => {
            let block = program.memory(block);
            format!(
                "{output} = ROM {} {} {}",
                block.addr_width(),
                block.word_width(),
                name(read_addr)
            )
        }
        Instruction::Ram {
            block,
            read_addr,
            write_enable,
            write_addr,
            write_data,
            ..
        } => {
            let block = program.memory(block);
            format!(
                "{output} = RAM {} {} {} {} {} {}",
                block.addr_width(),
                block.word_width(),
                name(read_addr),
                name(write_enable),
                name(write_addr),
                name(write_data)
            )
        }
    }
}
