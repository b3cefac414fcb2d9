//! Bindless texture lowerings.
//!
//! Two one-shot rewrites over texture accesses whose handle arrives as a
//! runtime value: a handle loaded from a uniform array index becomes an
//! indexed access against the fixed binding table, and a handle loaded
//! from a constant constant-buffer word is replaced by the descriptor the
//! config resolves for it.

use nxsh_ir::{FlowGraph, NodeId, NodeKind, Opcode, OperandId, TextureFlags};

use crate::config::TranslatorConfig;

/// Packs a constant-buffer origin into the binding field of an indexed
/// texture access.
fn pack_table_origin(slot: u16, offset: u16) -> u32 {
    (slot as u32) << 16 | offset as u32
}

fn bindless_handle(graph: &FlowGraph, id: NodeId) -> Option<OperandId> {
    let node = graph.node(id);
    let op = node.as_op()?;
    if !op.inst.opcode().is_texture()
        || !op.texture?.flags.contains(TextureFlags::BINDLESS)
        || node.sources().is_empty()
    {
        return None;
    }
    Some(node.src(0))
}

/// Matches `handle = LoadConstant(slot, offset)` with a constant slot.
/// Returns the defining node, the slot, and the offset operand.
fn match_constant_load(
    graph: &FlowGraph,
    handle: OperandId,
) -> Option<(NodeId, u16, OperandId)> {
    let (def, op) = graph.defining_op(handle)?;
    if !op.inst.is(Opcode::LoadConstant) {
        return None;
    }
    let node = graph.node(def);
    if node.sources().len() != 2 {
        return None;
    }
    let slot = graph.const_value(node.src(0))?;
    Some((def, slot as u16, node.src(1)))
}

/// Converts a bindless access whose handle indexes a uniform handle array
/// into an indexed access. Returns `true` on rewrite.
pub(crate) fn to_indexed(graph: &mut FlowGraph, id: NodeId) -> bool {
    let Some(handle) = bindless_handle(graph, id) else {
        return false;
    };
    let Some((_, slot, offset)) = match_constant_load(graph, handle) else {
        return false;
    };
    // A constant offset is a fixed descriptor, not an array index; that
    // shape belongs to bindless elimination.
    if graph.operand(offset).is_constant() {
        return false;
    }
    // Split `offset = index + base` when the base is a literal.
    let (index, base) = match graph.defining_op(offset) {
        Some((def, op)) if op.inst.is(Opcode::Add) && graph.node(def).sources().len() == 2 => {
            let node = graph.node(def);
            let (a, b) = (node.src(0), node.src(1));
            if let Some(base) = graph.const_value(b) {
                (a, base as u16)
            } else if let Some(base) = graph.const_value(a) {
                (b, base as u16)
            } else {
                (offset, 0)
            }
        }
        _ => (offset, 0),
    };

    graph.set_source(id, 0, index);
    if let NodeKind::Op(op) = &mut graph.node_mut(id).kind
        && let Some(tex) = op.texture.as_mut()
    {
        tex.flags = tex.flags.without(TextureFlags::BINDLESS) | TextureFlags::INDEXED;
        tex.binding = pack_table_origin(slot, base);
    }
    true
}

/// Substitutes the resolved descriptor for a handle loaded from a constant
/// constant-buffer word. Returns `true` on rewrite, recording the slot in
/// `ube_use_mask`.
pub(crate) fn eliminate(
    graph: &mut FlowGraph,
    id: NodeId,
    config: &dyn TranslatorConfig,
    ube_use_mask: &mut u32,
) -> bool {
    let Some(handle) = bindless_handle(graph, id) else {
        return false;
    };
    let Some((slot, offset)) = resolve_constant_handle(graph, handle) else {
        return false;
    };
    let Some(binding) = config.bindless_texture_binding(slot, offset) else {
        return false;
    };

    graph.remove_source(id, 0);
    if let NodeKind::Op(op) = &mut graph.node_mut(id).kind
        && let Some(tex) = op.texture.as_mut()
    {
        tex.flags = tex.flags.without(TextureFlags::BINDLESS);
        tex.binding = binding;
    }
    *ube_use_mask |= 1 << (slot as u32 & 31);
    true
}

/// A handle is constant when it is a constant-buffer operand directly or a
/// `LoadConstant` from a literal slot/offset pair.
fn resolve_constant_handle(graph: &FlowGraph, handle: OperandId) -> Option<(u16, u16)> {
    let operand = graph.operand(handle);
    if operand.kind == nxsh_ir::OperandKind::ConstantBuffer {
        return Some((operand.cbuf_slot(), operand.cbuf_offset()));
    }
    let (_, slot, offset) = match_constant_load(graph, handle)?;
    let offset = graph.const_value(offset)?;
    Some((slot, offset as u16))
}
