//! Fragment-coordinate W cancellation.
//!
//! Guest compilers inject a multiply by `fragCoord.w` whose result is later
//! multiplied by `1.0 / fragCoord.w` for perspective correction. The pair
//! cancels exactly; recognizing it lets the whole tree die.

use nxsh_ir::{FRAG_COORD_W, FlowGraph, NodeId, Opcode, OperandId, OperandKind};

/// Examines an FP32 multiply `a * b`. When one side is `x * fragCoord.w`
/// and the other is `1.0 / fragCoord.w`, rewrites the node into a `Copy`
/// of `x`. Returns `true` on rewrite.
pub(crate) fn run_node(graph: &mut FlowGraph, id: NodeId) -> bool {
    let node = graph.node(id);
    if node.sources().len() != 2 {
        return false;
    }
    let (a, b) = (node.src(0), node.src(1));

    for (mul, div) in [(a, b), (b, a)] {
        if let Some(x) = match_w_multiply(graph, mul)
            && is_reciprocal_of_w(graph, div)
        {
            graph.turn_into_copy(id, x);
            return true;
        }
    }
    false
}

/// Matches `o = x * fragCoord.w` (either operand order) and returns `x`.
fn match_w_multiply(graph: &FlowGraph, o: OperandId) -> Option<OperandId> {
    let (def, op) = graph.defining_op(o)?;
    if !(op.inst.is(Opcode::Multiply) && op.inst.is_fp32()) {
        return None;
    }
    let node = graph.node(def);
    if node.sources().len() != 2 {
        return None;
    }
    let (s0, s1) = (node.src(0), node.src(1));
    if is_frag_coord_w(graph, s1) {
        Some(s0)
    } else if is_frag_coord_w(graph, s0) {
        Some(s1)
    } else {
        None
    }
}

/// Matches `o = 1.0 / fragCoord.w` with a literal FP32 one.
fn is_reciprocal_of_w(graph: &FlowGraph, o: OperandId) -> bool {
    let Some((def, op)) = graph.defining_op(o) else {
        return false;
    };
    if !(op.inst.is(Opcode::Divide) && op.inst.is_fp32()) {
        return false;
    }
    let node = graph.node(def);
    node.sources().len() == 2
        && graph.const_value(node.src(0)) == Some(1.0f32.to_bits())
        && is_frag_coord_w(graph, node.src(1))
}

fn is_frag_coord_w(graph: &FlowGraph, o: OperandId) -> bool {
    let operand = graph.operand(o);
    operand.kind == OperandKind::Attribute && operand.value == FRAG_COORD_W
}
