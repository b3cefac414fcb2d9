//! Constant folding.
//!
//! Evaluates operations whose sources are all literal constants with the
//! exact bit semantics of the instruction's type tag, then rewrites the
//! node into a `Copy` of the folded constant.

use nxsh_ir::{FlowGraph, NodeId, Opcode};

/// Folds `id` if possible. Returns `true` on rewrite.
pub(crate) fn run_node(graph: &mut FlowGraph, id: NodeId) -> bool {
    let node = graph.node(id);
    let Some(op) = node.as_op() else {
        return false;
    };
    if node.dest().is_none()
        || node.sources().is_empty()
        || !node
            .sources()
            .iter()
            .all(|&s| graph.operand(s).is_constant())
    {
        return false;
    }

    let inst = op.inst;
    let mut vals = [0u32; 3];
    for (i, &s) in node.sources().iter().take(3).enumerate() {
        vals[i] = graph.operand(s).value;
    }
    let arity = node.sources().len();

    let folded = if inst.is_fp32() {
        fold_f32(inst.opcode(), arity, &vals)
    } else if inst.is_fp() {
        // FP64 payloads do not fit the 32-bit operand; leave them alone.
        None
    } else {
        fold_int(inst.opcode(), arity, &vals)
    };

    match folded {
        Some(bits) => {
            let c = graph.const_u32(bits);
            graph.turn_into_copy(id, c);
            true
        }
        None => false,
    }
}

fn bool_bits(v: bool) -> u32 {
    v as u32
}

fn fold_f32(op: Opcode, arity: usize, vals: &[u32; 3]) -> Option<u32> {
    let a = f32::from_bits(vals[0]);
    let b = f32::from_bits(vals[1]);
    Some(match (op, arity) {
        (Opcode::Add, 2) => (a + b).to_bits(),
        (Opcode::Subtract, 2) => (a - b).to_bits(),
        (Opcode::Multiply, 2) => (a * b).to_bits(),
        (Opcode::Divide, 2) => (a / b).to_bits(),
        (Opcode::Negate, 1) => (-a).to_bits(),
        (Opcode::CompareEqual, 2) => bool_bits(a == b),
        (Opcode::CompareNotEqual, 2) => bool_bits(a != b),
        (Opcode::CompareLess, 2) => bool_bits(a < b),
        (Opcode::CompareLessOrEqual, 2) => bool_bits(a <= b),
        (Opcode::CompareGreater, 2) => bool_bits(a > b),
        (Opcode::CompareGreaterOrEqual, 2) => bool_bits(a >= b),
        (Opcode::ConvertFP32ToS32, 1) => (a as i32) as u32,
        (Opcode::ConvertFP32ToU32, 1) => a as u32,
        _ => return None,
    })
}

fn fold_int(op: Opcode, arity: usize, vals: &[u32; 3]) -> Option<u32> {
    let (a, b) = (vals[0], vals[1]);
    let (sa, sb) = (a as i32, b as i32);
    Some(match (op, arity) {
        (Opcode::Add, 2) => a.wrapping_add(b),
        (Opcode::Subtract, 2) => a.wrapping_sub(b),
        (Opcode::Multiply, 2) => a.wrapping_mul(b),
        (Opcode::Negate, 1) => sa.wrapping_neg() as u32,
        (Opcode::BitwiseAnd, 2) => a & b,
        (Opcode::BitwiseOr, 2) => a | b,
        (Opcode::BitwiseExclusiveOr, 2) => a ^ b,
        // Shift counts are taken modulo 32, matching the hardware.
        (Opcode::ShiftLeft, 2) => a.wrapping_shl(b),
        (Opcode::ShiftRightS32, 2) => sa.wrapping_shr(b) as u32,
        (Opcode::ShiftRightU32, 2) => a.wrapping_shr(b),
        (Opcode::CompareEqual, 2) => bool_bits(a == b),
        (Opcode::CompareNotEqual, 2) => bool_bits(a != b),
        (Opcode::CompareLess, 2) => bool_bits(sa < sb),
        (Opcode::CompareLessOrEqual, 2) => bool_bits(sa <= sb),
        (Opcode::CompareGreater, 2) => bool_bits(sa > sb),
        (Opcode::CompareGreaterOrEqual, 2) => bool_bits(sa >= sb),
        (Opcode::CompareLessU32, 2) => bool_bits(a < b),
        (Opcode::CompareLessOrEqualU32, 2) => bool_bits(a <= b),
        (Opcode::CompareGreaterU32, 2) => bool_bits(a > b),
        (Opcode::CompareGreaterOrEqualU32, 2) => bool_bits(a >= b),
        (Opcode::ConvertS32ToFP32, 1) => (sa as f32).to_bits(),
        (Opcode::ConvertU32ToFP32, 1) => (a as f32).to_bits(),
        _ => return None,
    })
}
