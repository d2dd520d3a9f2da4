//! Backwards liveness analysis over the lowered program.

use util::FnvHashMap;

use crate::ir::{Opcode, Operand, Program};

/// Walks blocks tail to head and instructions tail to head, decrementing
/// the program counter at every step.
///
/// For an instruction with an assignee, the recorded last-use position of
/// that name becomes the interval `end`; a definition past every use is
/// rewritten to [`Opcode::Dead`](enum.Opcode.html#variant.Dead) and its
/// operands are not recorded, so a chain of only-dead uses collapses
/// entirely. The table is keyed per variable name: temporaries are fresh
/// per definition, user variables fold repeated assignments into one
/// range.
pub(crate) fn calculate_live_intervals(program: &mut Program, total: usize) {
    let mut live: FnvHashMap<String, usize> = FnvHashMap::default();
    let mut pc = total;

    for block in program.blocks.iter_mut().rev() {
        for inst in block.instructions.iter_mut().rev() {
            pc -= 1;

            if let Some(assignee) = &inst.assignee {
                let end = live.get(assignee).copied().unwrap_or(0);
                if pc > end {
                    inst.opcode = Opcode::Dead;
                    log::warn!(
                        "dead variable '{}' at line {}, col {}",
                        assignee,
                        inst.span.line,
                        inst.span.col
                    );
                    continue;
                }

                inst.start = pc;
                inst.end = end;
            }

            for operand in &inst.operands {
                if let Operand::Variable(name) = operand {
                    live.entry(name.clone()).or_insert(pc);
                }
            }
        }
    }
}
