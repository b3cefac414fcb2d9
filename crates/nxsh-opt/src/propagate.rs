//! Copy and half-float pack propagation.

use nxsh_ir::{FlowGraph, NodeId, Opcode};

/// Forwards a `Copy d ← s` into every consumer of `d`, then removes it.
///
/// Caller guarantees the destination is a local variable.
pub(crate) fn copy(graph: &mut FlowGraph, id: NodeId) {
    let dest = graph.node(id).dest().expect("copy without destination");
    let src = graph.node(id).src(0);
    graph.replace_uses(dest, src);
    graph.remove_node(id);
}

/// Cancels `UnpackHalf2x16` consumers of a `PackHalf2x16 d ← (lo, hi)`
/// by rewriting each into a `Copy` of the packed lane. Returns `true` if
/// any consumer was rewritten; the caller removes the pack once its
/// destination has no uses left.
pub(crate) fn pack(graph: &mut FlowGraph, id: NodeId) -> bool {
    let dest = graph.node(id).dest().expect("pack without destination");
    let consumers: Vec<NodeId> = graph.operand(dest).used_by().to_vec();
    let mut modified = false;

    for user in consumers {
        let node = graph.node(user);
        let Some(op) = node.as_op() else {
            continue;
        };
        if !op.inst.is(Opcode::UnpackHalf2x16) || node.src(0) != dest {
            continue;
        }
        let lane = op.index as usize;
        let value = graph.node(id).src(lane);
        graph.turn_into_copy(user, value);
        modified = true;
    }
    modified
}
