//! Derivative recognition from subgroup shuffles.
//!
//! The source ISA computes screen-space derivatives by a quad `ShuffleXor`
//! followed by a lane-selective `SwizzleAdd`. Matching the exact mask
//! constants recovers the `Ddx`/`Ddy` the shader author wrote.

use nxsh_ir::{FlowGraph, Instruction, NodeId, Opcode};

/// Shuffle clamp covering all four lanes of the quad.
const QUAD_CLAMP_FULL: u32 = 0x1c03;
/// Negate-then-add selection for DDX (lanes 0b10011001).
const DDX_ADD_PATTERN: u32 = 0b1001_1001;
/// Negate-then-add selection for DDY (lanes 0b10100101).
const DDY_ADD_PATTERN: u32 = 0b1010_0101;

/// Examines a `ShuffleXor v ← (x, lane_mask, clamp)` and rewrites matching
/// `SwizzleAdd` consumers into derivatives of `x`. Returns `true` if any
/// consumer was rewritten; the caller removes the shuffle once dead.
pub(crate) fn run_node(graph: &mut FlowGraph, id: NodeId) -> bool {
    let node = graph.node(id);
    if node.sources().len() != 3 {
        return false;
    }
    let is_ddx = match graph.const_value(node.src(1)) {
        Some(1) => true,
        Some(2) => false,
        _ => return false,
    };
    if graph.const_value(node.src(2)) != Some(QUAD_CLAMP_FULL) {
        return false;
    }
    let x = node.src(0);
    let dest = node.dest().expect("shuffle without destination");
    let pattern = if is_ddx { DDX_ADD_PATTERN } else { DDY_ADD_PATTERN };
    let derivative = if is_ddx { Opcode::Ddx } else { Opcode::Ddy };

    let consumers: Vec<NodeId> = graph.operand(dest).used_by().to_vec();
    let mut modified = false;
    for user in consumers {
        let unode = graph.node(user);
        let Some(op) = unode.as_op() else {
            continue;
        };
        if !op.inst.is(Opcode::SwizzleAdd) || unode.sources().len() != 3 {
            continue;
        }
        let second_is_x = unode.src(1) == x || graph.is_same_value(unode.src(1), x);
        if unode.src(0) != dest
            || !second_is_x
            || graph.const_value(unode.src(2)) != Some(pattern)
        {
            continue;
        }
        graph.turn_into(user, Instruction::fp32(derivative), &[x]);
        modified = true;
    }
    modified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_shuffle(
        g: &mut FlowGraph,
        blk: nxsh_ir::BlockId,
        lane_mask: u32,
        clamp: u32,
    ) -> (nxsh_ir::OperandId, NodeId, nxsh_ir::OperandId) {
        let x = g.argument(0);
        let lane = g.const_u32(lane_mask);
        let clamp = g.const_u32(clamp);
        let v = g.local();
        let shuffle = g.append_op(
            blk,
            Opcode::ShuffleXor.into(),
            Some(v),
            &[x, lane, clamp],
        );
        (x, shuffle, v)
    }

    #[test]
    fn recognizes_ddx() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let (x, shuffle, v) = build_shuffle(&mut g, blk, 1, QUAD_CLAMP_FULL);
        let pattern = g.const_u32(DDX_ADD_PATTERN);
        let r = g.local();
        let swz = g.append_op(blk, Opcode::SwizzleAdd.into(), Some(r), &[v, x, pattern]);

        assert!(run_node(&mut g, shuffle));
        assert_eq!(g.node(swz).opcode(), Some(Opcode::Ddx));
        assert_eq!(g.node(swz).sources(), &[x]);
        assert_eq!(g.operand(v).use_count(), 0);
    }

    #[test]
    fn recognizes_ddy() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let (x, shuffle, v) = build_shuffle(&mut g, blk, 2, QUAD_CLAMP_FULL);
        let pattern = g.const_u32(DDY_ADD_PATTERN);
        let r = g.local();
        let swz = g.append_op(blk, Opcode::SwizzleAdd.into(), Some(r), &[v, x, pattern]);

        assert!(run_node(&mut g, shuffle));
        assert_eq!(g.node(swz).opcode(), Some(Opcode::Ddy));
    }

    #[test]
    fn wrong_clamp_mask_declines() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let (x, shuffle, v) = build_shuffle(&mut g, blk, 1, 0x1f00);
        let pattern = g.const_u32(DDX_ADD_PATTERN);
        let r = g.local();
        g.append_op(blk, Opcode::SwizzleAdd.into(), Some(r), &[v, x, pattern]);

        assert!(!run_node(&mut g, shuffle));
    }

    #[test]
    fn mismatched_pattern_declines() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let (x, shuffle, v) = build_shuffle(&mut g, blk, 1, QUAD_CLAMP_FULL);
        // DDY pattern against a DDX lane mask.
        let pattern = g.const_u32(DDY_ADD_PATTERN);
        let r = g.local();
        let swz = g.append_op(blk, Opcode::SwizzleAdd.into(), Some(r), &[v, x, pattern]);

        assert!(!run_node(&mut g, shuffle));
        assert_eq!(g.node(swz).opcode(), Some(Opcode::SwizzleAdd));
    }
}
