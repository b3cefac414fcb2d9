//! Global-to-storage lowering.
//!
//! Global memory accesses whose address provably derives from a storage
//! buffer descriptor (held in driver-reserved constant-buffer space)
//! become typed storage-buffer accesses. The address is sliced backwards
//! through additions, shifts, and multiplies with constants until a
//! constant-buffer origin appears; the config decides whether a storage
//! buffer actually backs that origin.

use nxsh_ir::{FlowGraph, NodeId, Opcode, OperandId, OperandKind};

use crate::config::TranslatorConfig;

/// Bound on the slicing walk; deeper address math stays global.
const MAX_SLICE_DEPTH: u32 = 8;

/// Examines a `LoadGlobal`/`StoreGlobal`. Returns `true` when the node was
/// rewritten to a storage access, recording the buffer in `sb_use_mask`.
pub(crate) fn run_node(
    graph: &mut FlowGraph,
    id: NodeId,
    config: &dyn TranslatorConfig,
    sb_use_mask: &mut u32,
) -> bool {
    let node = graph.node(id);
    let opcode = match node.opcode() {
        Some(op @ (Opcode::LoadGlobal | Opcode::StoreGlobal)) => op,
        _ => return false,
    };
    if node.sources().is_empty() {
        return false;
    }
    let addr = node.src(0);
    let Some((slot, offset)) = find_cbuf_origin(graph, addr, 0) else {
        return false;
    };
    let Some(binding) = config.storage_buffer_binding(slot, offset) else {
        return false;
    };
    debug_assert!(binding < 32, "storage binding out of mask range");
    *sb_use_mask |= 1 << (binding & 31);

    let binding_const = graph.const_u32(binding);
    match opcode {
        Opcode::LoadGlobal => {
            graph.turn_into(id, Opcode::LoadStorage.into(), &[binding_const, addr]);
        }
        _ => {
            let value = graph.node(id).src(1);
            graph.turn_into(
                id,
                Opcode::StoreStorage.into(),
                &[binding_const, addr, value],
            );
        }
    }
    true
}

/// Walks the definition chain of `o` through integer `Add`/`ShiftLeft`/
/// `Multiply` address math until a constant-buffer operand appears. The
/// descriptor base sits on one side of each step; the first side that
/// resolves wins, and an index chain rooted in anything else resolves to
/// nothing.
fn find_cbuf_origin(graph: &FlowGraph, o: OperandId, depth: u32) -> Option<(u16, u16)> {
    if depth > MAX_SLICE_DEPTH {
        return None;
    }
    let operand = graph.operand(o);
    match operand.kind {
        OperandKind::ConstantBuffer => Some((operand.cbuf_slot(), operand.cbuf_offset())),
        OperandKind::LocalVariable => {
            let (def, op) = graph.defining_op(o)?;
            if op.inst.is_fp() {
                return None;
            }
            match op.inst.opcode() {
                Opcode::Copy | Opcode::Add | Opcode::ShiftLeft | Opcode::Multiply => {
                    let sources = graph.node(def).sources().to_vec();
                    sources
                        .iter()
                        .find_map(|&s| find_cbuf_origin(graph, s, depth + 1))
                }
                _ => None,
            }
        }
        _ => None,
    }
}
