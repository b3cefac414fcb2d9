//! Structural validation of the def/use bookkeeping.
//!
//! Checked by the optimizer in debug builds after every phase; tests call
//! it directly. A failure means a mutation bypassed the graph helpers.

use std::collections::HashMap;

use crate::error::IrError;
use crate::graph::FlowGraph;
use crate::node::NodeId;
use crate::operand::OperandId;

/// Verifies that def/use lists exactly mirror the structural edges of
/// every node attached to a block.
pub fn validate(graph: &FlowGraph) -> Result<(), IrError> {
    // (operand, consumer) → number of source slots.
    let mut expected: HashMap<(OperandId, NodeId), usize> = HashMap::new();

    for block_id in graph.block_ids() {
        let block = graph.block(block_id);
        for &node_id in block.nodes() {
            let node = graph.node(node_id);

            for &d in node.dests() {
                if graph.operand(d).is_local()
                    && graph.operand(d).assigned_by() != Some(node_id)
                {
                    return Err(IrError::DefLinkMismatch {
                        node: node_id,
                        operand: d,
                    });
                }
            }

            for &s in node.sources() {
                if !graph.operand(s).is_local() {
                    continue;
                }
                *expected.entry((s, node_id)).or_default() += 1;
                let live_def = graph
                    .operand(s)
                    .assigned_by()
                    .is_some_and(|def| graph.node(def).block().is_some());
                if !live_def {
                    return Err(IrError::UndefinedLocal {
                        operand: s,
                        node: node_id,
                    });
                }
            }

            if let Some(phi) = node.as_phi() {
                let arity_ok = phi.blocks.len() == node.sources().len()
                    && (block.predecessors.is_empty()
                        || block.predecessors.len() == node.sources().len());
                if !arity_ok {
                    return Err(IrError::PhiArityMismatch {
                        block: block_id,
                        sources: node.sources().len(),
                        predecessors: block.predecessors.len(),
                    });
                }
            }
        }
    }

    // Recorded use lists must match the collected multiset exactly.
    for block_id in graph.block_ids() {
        for &node_id in graph.block(block_id).nodes() {
            for &s in graph.node(node_id).sources() {
                let o = graph.operand(s);
                if !o.is_local() {
                    continue;
                }
                let want = expected.get(&(s, node_id)).copied().unwrap_or(0);
                let got = o.used_by().iter().filter(|&&u| u == node_id).count();
                if want != got {
                    return Err(IrError::UseListMismatch {
                        operand: s,
                        expected: want,
                        recorded: got,
                    });
                }
                let total: usize = o.use_count();
                let total_want: usize = expected
                    .iter()
                    .filter(|((op, _), _)| *op == s)
                    .map(|(_, n)| n)
                    .sum();
                if total != total_want {
                    return Err(IrError::UseListMismatch {
                        operand: s,
                        expected: total_want,
                        recorded: total,
                    });
                }
            }
        }
    }

    Ok(())
}
