//! Graphviz rendering of the dependency graph.

use std::fmt::Write;

use netlist_ir::{Program, RegId};

use crate::graph::DependencyGraph;

impl DependencyGraph {
    /// Renders the program's data flow as a Graphviz digraph.
    ///
    /// One node per register, labelled with its name and width; `OUTPUT`
    /// registers are drawn as rectangles. Same-cycle dependencies are solid
    /// edges; the broken feedback edges (`REG` sources and RAM write
    /// operands) are dashed.
    pub fn to_dot(&self, program: &Program) -> String {
        let mut out = String::from("digraph {\n");

        for (index, register) in program.registers().iter().enumerate() {
            let id = RegId::from_index(index);
            let _ = write!(
                out,
                "\tr{index} [label=<<b>{}</b><br/><i>size</i>: {}",
                program.register_name(id),
                register.width(),
            );
            if let Some(def) = program
                .instructions()
                .iter()
                .find(|inst| inst.output() == id)
            {
                let _ = write!(out, "<br/><i>eq</i>: {}", def.opcode());
            }
            out.push('>');
            if register.is_output() {
                out.push_str(", shape=rect");
            }
            out.push_str("]\n");
        }

        for inst in program.instructions() {
            let output = inst.output().to_usize();
            for source in inst.same_cycle_inputs() {
                let _ = writeln!(out, "\tr{} -> r{output}", source.to_usize());
            }
            for source in inst.deferred_inputs() {
                let _ = writeln!(out, "\tr{} -> r{output} [style=dashed]", source.to_usize());
            }
        }

        out.push_str("}\n");
        out
    }
}
