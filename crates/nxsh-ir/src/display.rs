//! Text dump of a flow graph for debugging.

use std::fmt::Write;

use crate::graph::FlowGraph;
use crate::inst::Instruction;
use crate::node::{NodeId, NodeKind};
use crate::operand::{OperandId, OperandKind};

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.opcode())?;
        if self.is_fp32() {
            write!(f, ".f32")?;
        } else if self.is_fp() {
            write!(f, ".f64")?;
        }
        Ok(())
    }
}

fn write_operand(out: &mut String, graph: &FlowGraph, id: OperandId) {
    let o = graph.operand(id);
    match o.kind {
        OperandKind::Constant => {
            let _ = write!(out, "0x{:x}", o.value);
        }
        OperandKind::ConstantBuffer => {
            let _ = write!(out, "cb{}[{}]", o.cbuf_slot(), o.cbuf_offset());
        }
        OperandKind::LocalVariable => {
            let _ = write!(out, "%{}", id.index());
        }
        OperandKind::Attribute => {
            let _ = write!(out, "attr0x{:x}", o.value);
        }
        OperandKind::Argument => {
            let _ = write!(out, "a{}", o.value);
        }
        OperandKind::Label => {
            let _ = write!(out, "B{}", o.value);
        }
        OperandKind::Undefined => out.push_str("undef"),
    }
}

fn write_node(out: &mut String, graph: &FlowGraph, id: NodeId) {
    let node = graph.node(id);
    out.push_str("  ");
    for (i, &d) in node.dests().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_operand(out, graph, d);
    }
    if !node.dests().is_empty() {
        out.push_str(" = ");
    }
    match &node.kind {
        NodeKind::Op(op) => {
            let _ = write!(out, "{}", op.inst);
            if op.index != 0 {
                let _ = write!(out, ":{}", op.index);
            }
            for (i, &s) in node.sources().iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                write_operand(out, graph, s);
            }
        }
        NodeKind::Phi(phi) => {
            out.push_str("Phi");
            for (i, &s) in node.sources().iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                let _ = write!(out, "[B{}: ", phi.blocks[i].index());
                write_operand(out, graph, s);
                out.push(']');
            }
        }
    }
    out.push('\n');
}

/// Renders the graph as one line per node, grouped by block.
pub fn dump_graph(graph: &FlowGraph) -> String {
    let mut out = String::new();
    for block_id in graph.block_ids() {
        let block = graph.block(block_id);
        let _ = write!(out, "block B{}", block_id.index());
        if !block.successors.is_empty() {
            out.push_str(" ->");
            for s in &block.successors {
                let _ = write!(out, " B{}", s.index());
            }
        }
        out.push('\n');
        for &node in block.nodes() {
            write_node(&mut out, graph, node);
        }
    }
    out
}
