//! Branch elimination.
//!
//! A conditional terminator whose condition is a literal constant either
//! becomes an unconditional branch to the taken target or disappears
//! entirely. Successor/predecessor pruning happens at the CFG tier, not
//! here.

use nxsh_ir::{BlockId, FlowGraph, Opcode};

/// Examines the terminator of `block`. Returns `true` on rewrite.
pub(crate) fn run_block(graph: &mut FlowGraph, block: BlockId) -> bool {
    let Some(last) = graph.block(block).last_node() else {
        return false;
    };
    let node = graph.node(last);
    let Some(opcode) = node.opcode() else {
        return false;
    };
    let invert = match opcode {
        Opcode::BranchIfTrue => false,
        Opcode::BranchIfFalse => true,
        _ => return false,
    };
    if node.sources().len() != 2 {
        return false;
    }
    let Some(cond) = graph.const_value(node.src(0)) else {
        return false;
    };
    let taken = (cond != 0) != invert;

    let successors = &graph.block(block).successors;
    let distinct_targets =
        successors.len() == 2 && successors[0] != successors[1];

    if taken && distinct_targets {
        let target = graph.node(last).src(1);
        graph.turn_into(last, Opcode::Branch.into(), &[target]);
    } else {
        // Not taken (fall through) or both targets coincide.
        graph.remove_node(last);
    }
    true
}
