//! Algebraic simplification.
//!
//! Identity rewrites that replace an operation with a `Copy` of one of its
//! operands or of a fresh constant. Arithmetic identities fire on
//! integer-typed instructions only; rewriting FP operands would alter
//! observable NaN and signed-zero behavior. Select-on-constant fires
//! regardless of typing.

use nxsh_ir::{FlowGraph, NodeId, Opcode};

/// Simplifies `id` if an identity matches. Returns `true` on rewrite.
pub(crate) fn run_node(graph: &mut FlowGraph, id: NodeId) -> bool {
    let node = graph.node(id);
    let Some(op) = node.as_op() else {
        return false;
    };
    if node.dest().is_none() {
        return false;
    }
    let inst = op.inst;
    let opcode = inst.opcode();

    if opcode == Opcode::ConditionalSelect && node.sources().len() == 3 {
        if let Some(cond) = graph.const_value(node.src(0)) {
            let chosen = if cond != 0 { node.src(1) } else { node.src(2) };
            graph.turn_into_copy(id, chosen);
            return true;
        }
        return false;
    }

    if inst.is_fp() || node.sources().len() != 2 {
        return false;
    }
    let (a, b) = (node.src(0), node.src(1));

    match opcode {
        Opcode::Add => {
            // x + 0 → x, commutative.
            if graph.const_value(b) == Some(0) {
                graph.turn_into_copy(id, a);
                return true;
            }
            if graph.const_value(a) == Some(0) {
                graph.turn_into_copy(id, b);
                return true;
            }
        }
        Opcode::Subtract => {
            if graph.const_value(b) == Some(0) {
                graph.turn_into_copy(id, a);
                return true;
            }
            if graph.is_same_value(a, b) {
                return copy_const(graph, id, 0);
            }
        }
        Opcode::Multiply => {
            if let Some(other) = match_commutative_const(graph, a, b, 1) {
                graph.turn_into_copy(id, other);
                return true;
            }
            if match_commutative_const(graph, a, b, 0).is_some() {
                return copy_const(graph, id, 0);
            }
        }
        Opcode::BitwiseAnd => {
            if graph.is_same_value(a, b) {
                graph.turn_into_copy(id, a);
                return true;
            }
            if match_commutative_const(graph, a, b, 0).is_some() {
                return copy_const(graph, id, 0);
            }
            if let Some(other) = match_commutative_const(graph, a, b, u32::MAX) {
                graph.turn_into_copy(id, other);
                return true;
            }
        }
        Opcode::BitwiseOr => {
            if graph.is_same_value(a, b) {
                graph.turn_into_copy(id, a);
                return true;
            }
            if let Some(other) = match_commutative_const(graph, a, b, 0) {
                graph.turn_into_copy(id, other);
                return true;
            }
            if match_commutative_const(graph, a, b, u32::MAX).is_some() {
                return copy_const(graph, id, u32::MAX);
            }
        }
        Opcode::BitwiseExclusiveOr => {
            if graph.is_same_value(a, b) {
                return copy_const(graph, id, 0);
            }
            if let Some(other) = match_commutative_const(graph, a, b, 0) {
                graph.turn_into_copy(id, other);
                return true;
            }
        }
        Opcode::ShiftLeft | Opcode::ShiftRightS32 | Opcode::ShiftRightU32 => {
            if graph.const_value(b) == Some(0) {
                graph.turn_into_copy(id, a);
                return true;
            }
        }
        // Unsigned comparisons against the lower boundary.
        Opcode::CompareLessU32 => {
            if graph.const_value(b) == Some(0) {
                return copy_const(graph, id, 0);
            }
        }
        Opcode::CompareGreaterOrEqualU32 => {
            if graph.const_value(b) == Some(0) {
                return copy_const(graph, id, 1);
            }
        }
        _ => {}
    }
    false
}

/// When one side is the constant `value`, returns the other side.
fn match_commutative_const(
    graph: &FlowGraph,
    a: nxsh_ir::OperandId,
    b: nxsh_ir::OperandId,
    value: u32,
) -> Option<nxsh_ir::OperandId> {
    if graph.const_value(b) == Some(value) {
        Some(a)
    } else if graph.const_value(a) == Some(value) {
        Some(b)
    } else {
        None
    }
}

fn copy_const(graph: &mut FlowGraph, id: NodeId, value: u32) -> bool {
    let c = graph.const_u32(value);
    graph.turn_into_copy(id, c);
    true
}
