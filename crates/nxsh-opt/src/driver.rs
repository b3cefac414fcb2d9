//! The fixpoint driver.
//!
//! Sweeps every block, applying phi collapsing, unused-node removal, the
//! peephole kernels, and the propagation/pattern rewrites, and repeats
//! until a full sweep changes nothing. Termination: every rewrite strictly
//! shrinks the number of local definitions or of non-copy operations.

use nxsh_ir::{FlowGraph, NodeId, Opcode};

use crate::config::ShaderStage;
use crate::{branch_elim, const_fold, derivative, frag_coord, propagate, simplify};

/// Runs local rewrites over the whole graph until none fires.
pub(crate) fn run_to_fixpoint(graph: &mut FlowGraph, stage: ShaderStage) {
    let mut sweeps = 0usize;
    loop {
        sweeps += 1;
        let mut modified = false;
        for block in graph.block_ids().collect::<Vec<_>>() {
            modified |= run_block(graph, block, stage);
        }
        if !modified {
            break;
        }
    }
    log::debug!("optimizer reached fixpoint after {sweeps} sweep(s)");
}

fn run_block(graph: &mut FlowGraph, block: nxsh_ir::BlockId, stage: ShaderStage) -> bool {
    let mut modified = false;

    // Snapshot the order; removals may detach nodes anywhere in the graph.
    let order: Vec<NodeId> = graph.block(block).nodes().to_vec();
    for id in order {
        if graph.node(id).block().is_none() {
            continue;
        }

        if graph.node(id).is_phi() {
            if try_collapse_phi(graph, id) {
                modified = true;
                continue;
            }
        }

        if graph.is_unused(id) {
            graph.remove_node(id);
            modified = true;
            continue;
        }

        if graph.node(id).is_phi() {
            continue;
        }

        modified |= const_fold::run_node(graph, id);
        modified |= simplify::run_node(graph, id);

        let dest_is_local = graph
            .node(id)
            .dest()
            .is_some_and(|d| graph.operand(d).is_local());
        if !dest_is_local {
            continue;
        }

        // Re-read the tag: folding or simplification may have rewritten it.
        match graph.node(id).opcode() {
            Some(Opcode::Copy) => {
                propagate::copy(graph, id);
                modified = true;
            }
            Some(Opcode::PackHalf2x16) => {
                modified |= propagate::pack(graph, id);
                modified |= remove_if_dead(graph, id);
            }
            Some(Opcode::ShuffleXor) => {
                modified |= derivative::run_node(graph, id);
                modified |= remove_if_dead(graph, id);
            }
            Some(Opcode::Multiply)
                if stage == ShaderStage::Fragment
                    && graph.node(id).inst().is_some_and(|i| i.is_fp32()) =>
            {
                modified |= frag_coord::run_node(graph, id);
            }
            _ => {}
        }
    }

    modified | branch_elim::run_block(graph, block)
}

fn remove_if_dead(graph: &mut FlowGraph, id: NodeId) -> bool {
    if graph.is_unused(id) {
        graph.remove_node(id);
        true
    } else {
        false
    }
}

/// Collapses a phi whose incoming values are all same-valued, forwarding
/// the common source into every consumer.
fn try_collapse_phi(graph: &mut FlowGraph, id: NodeId) -> bool {
    let node = graph.node(id);
    let Some(&first) = node.sources().first() else {
        return false;
    };
    if !node
        .sources()
        .iter()
        .all(|&s| graph.is_same_value(first, s))
    {
        return false;
    }
    let dest = node.dest().expect("phi without destination");
    graph.replace_uses(dest, first);
    graph.remove_node(id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxsh_ir::{Instruction, validate};

    #[test]
    fn dead_chain_is_removed() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let a = g.argument(0);
        let b = g.argument(1);
        let c = g.argument(2);
        let d = g.argument(3);
        let t1 = g.local();
        let t2 = g.local();
        let t3 = g.local();
        g.append_op(blk, Opcode::Add.into(), Some(t1), &[a, b]);
        g.append_op(blk, Opcode::Add.into(), Some(t2), &[t1, c]);
        g.append_op(blk, Opcode::Add.into(), Some(t3), &[t2, d]);

        run_to_fixpoint(&mut g, ShaderStage::Compute);
        assert!(g.block(blk).is_empty());
        assert!(validate(&g).is_ok());
    }

    #[test]
    fn phi_of_equal_constants_collapses() {
        let mut g = FlowGraph::new();
        let b0 = g.add_block();
        let b1 = g.add_block();
        let b2 = g.add_block();
        g.add_edge(b0, b2);
        g.add_edge(b1, b2);

        let five_a = g.const_u32(5);
        let five_b = g.const_u32(5);
        let d = g.local();
        g.append_phi(b2, d, &[(b0, five_a), (b1, five_b)]);
        let out = g.attribute(0);
        let user = g.append_op(b2, Opcode::Copy.into(), Some(out), &[d]);

        run_to_fixpoint(&mut g, ShaderStage::Compute);
        assert_eq!(g.node(user).src(0), five_a);
        assert_eq!(g.block(b2).nodes().len(), 1);
        assert!(validate(&g).is_ok());
    }

    #[test]
    fn phi_of_distinct_values_survives() {
        let mut g = FlowGraph::new();
        let b0 = g.add_block();
        let b1 = g.add_block();
        let b2 = g.add_block();
        g.add_edge(b0, b2);
        g.add_edge(b1, b2);

        let five = g.const_u32(5);
        let six = g.const_u32(6);
        let d = g.local();
        let phi = g.append_phi(b2, d, &[(b0, five), (b1, six)]);
        let out = g.attribute(0);
        g.append_op(b2, Opcode::Copy.into(), Some(out), &[d]);

        run_to_fixpoint(&mut g, ShaderStage::Compute);
        assert!(g.node(phi).block().is_some());
    }

    #[test]
    fn copy_chain_is_forwarded_and_removed() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let a = g.argument(0);
        let b = g.local();
        let c = g.local();
        g.append_op(blk, Opcode::Copy.into(), Some(b), &[a]);
        g.append_op(blk, Opcode::Copy.into(), Some(c), &[b]);
        let addr = g.argument(1);
        let store = g.append_op(blk, Opcode::StoreGlobal.into(), None, &[addr, c]);

        run_to_fixpoint(&mut g, ShaderStage::Compute);
        assert_eq!(g.block(blk).nodes(), &[store]);
        assert_eq!(g.node(store).src(1), a);
        assert!(validate(&g).is_ok());
    }

    #[test]
    fn constant_expression_tree_folds_to_one_value() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let c2 = g.const_u32(2);
        let c3 = g.const_u32(3);
        let c4 = g.const_u32(4);
        let t1 = g.local();
        let t2 = g.local();
        g.append_op(blk, Opcode::Multiply.into(), Some(t1), &[c2, c3]);
        g.append_op(blk, Opcode::Add.into(), Some(t2), &[t1, c4]);
        let addr = g.argument(0);
        let store = g.append_op(blk, Opcode::StoreGlobal.into(), None, &[addr, t2]);

        run_to_fixpoint(&mut g, ShaderStage::Compute);
        assert_eq!(g.block(blk).nodes(), &[store]);
        assert_eq!(g.const_value(g.node(store).src(1)), Some(10));
    }

    #[test]
    fn fixpoint_is_idempotent() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let a = g.argument(0);
        let zero = g.const_u32(0);
        let t = g.local();
        g.append_op(blk, Opcode::Add.into(), Some(t), &[a, zero]);
        let addr = g.argument(1);
        g.append_op(blk, Opcode::StoreGlobal.into(), None, &[addr, t]);

        run_to_fixpoint(&mut g, ShaderStage::Compute);
        let after_first = nxsh_ir::dump_graph(&g);
        run_to_fixpoint(&mut g, ShaderStage::Compute);
        assert_eq!(nxsh_ir::dump_graph(&g), after_first);
    }

    #[test]
    fn side_effecting_nodes_survive_without_uses() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let ptr = g.argument(0);
        let one = g.const_u32(1);
        let dead = g.local();
        g.append_op(blk, Opcode::AtomicAdd.into(), Some(dead), &[ptr, one]);

        run_to_fixpoint(&mut g, ShaderStage::Compute);
        assert_eq!(g.block(blk).nodes().len(), 1);
    }

    #[test]
    fn derivative_idiom_is_recovered_end_to_end() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let x = g.argument(0);
        let lane = g.const_u32(1);
        let clamp = g.const_u32(0x1c03);
        let v = g.local();
        g.append_op(blk, Opcode::ShuffleXor.into(), Some(v), &[x, lane, clamp]);
        let pattern = g.const_u32(0b1001_1001);
        let r = g.local();
        let swz = g.append_op(blk, Opcode::SwizzleAdd.into(), Some(r), &[v, x, pattern]);
        let addr = g.argument(1);
        g.append_op(blk, Opcode::StoreGlobal.into(), None, &[addr, r]);

        run_to_fixpoint(&mut g, ShaderStage::Fragment);
        // The shuffle died; only Ddx and the store remain.
        assert_eq!(g.block(blk).nodes().len(), 2);
        assert_eq!(g.node(swz).opcode(), Some(Opcode::Ddx));
        assert_eq!(g.node(swz).sources(), &[x]);
        assert!(validate(&g).is_ok());
    }

    #[test]
    fn perspective_cancellation_end_to_end() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let x = g.argument(0);
        let w1 = g.attribute(nxsh_ir::FRAG_COORD_W);
        let w2 = g.attribute(nxsh_ir::FRAG_COORD_W);
        let y = g.local();
        g.append_op(blk, Instruction::fp32(Opcode::Multiply), Some(y), &[x, w1]);
        let one = g.const_f32(1.0);
        let inv = g.local();
        g.append_op(blk, Instruction::fp32(Opcode::Divide), Some(inv), &[one, w2]);
        let v = g.local();
        g.append_op(blk, Instruction::fp32(Opcode::Multiply), Some(v), &[y, inv]);
        let addr = g.argument(1);
        let store = g.append_op(blk, Opcode::StoreGlobal.into(), None, &[addr, v]);

        run_to_fixpoint(&mut g, ShaderStage::Fragment);
        // Multiply, divide, and both w-reads are gone; the store reads x.
        assert_eq!(g.block(blk).nodes(), &[store]);
        assert_eq!(g.node(store).src(1), x);
        assert!(validate(&g).is_ok());
    }

    #[test]
    fn perspective_pair_is_kept_outside_fragment_stage() {
        let mut g = FlowGraph::new();
        let blk = g.add_block();
        let x = g.argument(0);
        let w = g.attribute(nxsh_ir::FRAG_COORD_W);
        let y = g.local();
        g.append_op(blk, Instruction::fp32(Opcode::Multiply), Some(y), &[x, w]);
        let one = g.const_f32(1.0);
        let inv = g.local();
        let w2 = g.attribute(nxsh_ir::FRAG_COORD_W);
        g.append_op(blk, Instruction::fp32(Opcode::Divide), Some(inv), &[one, w2]);
        let v = g.local();
        g.append_op(blk, Instruction::fp32(Opcode::Multiply), Some(v), &[y, inv]);
        let addr = g.argument(1);
        g.append_op(blk, Opcode::StoreGlobal.into(), None, &[addr, v]);

        run_to_fixpoint(&mut g, ShaderStage::Vertex);
        assert_eq!(g.block(blk).nodes().len(), 4);
    }
}
