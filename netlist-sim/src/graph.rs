//! Same-cycle dependency analysis and topological scheduling.

use netlist_ir::{Program, RegId};

use crate::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Visited,
}

/// The same-cycle dependency graph of a program.
///
/// For every instruction there is an edge from each operand register that
/// must hold its current-cycle value to the instruction's output register.
/// Three operand classes break the feedback path and create no edge: the
/// `REG` source (read one cycle late), the RAM write operands (committed at
/// end of cycle), and `INPUT` registers (set before the cycle begins).
///
/// Building the graph is `O(instructions + operands)`.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// `operands[r]`: same-cycle sources of the instruction defining `r`.
    operands: Vec<Vec<RegId>>,
    /// `dependents[r]`: outputs whose instructions read `r` this cycle.
    dependents: Vec<Vec<RegId>>,
}

impl DependencyGraph {
    /// Derives the graph from a built program.
    pub fn build(program: &Program) -> Self {
        let count = program.registers().len();
        let mut operands = vec![Vec::new(); count];
        let mut dependents = vec![Vec::new(); count];

        for inst in program.instructions() {
            let output = inst.output();
            for source in inst.same_cycle_inputs() {
                if program.register(source).is_input() {
                    continue;
                }
                operands[output.to_usize()].push(source);
                dependents[source.to_usize()].push(output);
            }
        }

        tracing::debug!(
            registers = count,
            edges = operands.iter().map(Vec::len).sum::<usize>(),
            "dependency graph built"
        );

        Self {
            operands,
            dependents,
        }
    }

    /// Whether evaluating `a` requires `b` to be evaluated first in the same
    /// cycle, i.e. whether `a` is reachable from `b` along forward edges.
    pub fn depends(&self, a: RegId, b: RegId) -> bool {
        let mut visited = vec![false; self.dependents.len()];
        let mut stack: Vec<RegId> = self.dependents[b.to_usize()].clone();
        while let Some(reg) = stack.pop() {
            if reg == a {
                return true;
            }
            if !std::mem::replace(&mut visited[reg.to_usize()], true) {
                stack.extend_from_slice(&self.dependents[reg.to_usize()]);
            }
        }
        false
    }

    /// Reorders the program's instructions into a valid evaluation order.
    ///
    /// Depth-first three-color traversal over registers, rooted at register
    /// 0, 1, … in table order. Because the roots and the operand lists are
    /// fixed by the register table rather than by instruction insertion
    /// order, two programs that differ only in the insertion order of
    /// independent instructions schedule identically, and re-scheduling an
    /// already scheduled program is a no-op.
    ///
    /// `program` must be the program this graph was built from.
    ///
    /// Returns an error naming a register on the cycle if the graph is
    /// cyclic; the program is left untouched in that case.
    pub fn schedule(&self, program: &mut Program) -> Result<(), ScheduleError> {
        debug_assert_eq!(self.operands.len(), program.registers().len());

        let definitions = program.definitions();
        let mut marks = vec![Mark::Unvisited; self.operands.len()];
        let mut order = Vec::with_capacity(program.instructions().len());
        // (register, count of operands already descended into)
        let mut stack: Vec<(RegId, usize)> = Vec::new();

        for root in (0..self.operands.len()).map(RegId::from_index) {
            if marks[root.to_usize()] != Mark::Unvisited
                || definitions[root.to_usize()].is_none()
            {
                continue;
            }

            marks[root.to_usize()] = Mark::InProgress;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let reg = frame.0;
                let cursor = frame.1;
                frame.1 += 1;

                match self.operands[reg.to_usize()].get(cursor).copied() {
                    Some(source) => match marks[source.to_usize()] {
                        Mark::Unvisited => {
                            marks[source.to_usize()] = Mark::InProgress;
                            stack.push((source, 0));
                        }
                        Mark::InProgress => {
                            return Err(ScheduleError {
                                register: program.register_name(source).into_owned(),
                            });
                        }
                        Mark::Visited => {}
                    },
                    None => {
                        stack.pop();
                        marks[reg.to_usize()] = Mark::Visited;
                        let index = definitions[reg.to_usize()]
                            .expect("only defined registers are traversed");
                        order.push(index);
                    }
                }
            }
        }

        debug_assert_eq!(order.len(), program.instructions().len());
        program.reorder_instructions(&order);
        tracing::debug!(instructions = order.len(), "program scheduled");
        Ok(())
    }
}
