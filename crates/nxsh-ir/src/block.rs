//! Basic blocks — ordered node lists with CFG edges.

use crate::node::NodeId;

/// Stable index of a block in its [`FlowGraph`](crate::FlowGraph).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    /// Returns the zero-based index of this id.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A basic block: phis first, then operations, then an optional terminating
/// branch. Predecessor/successor sets are maintained by the CFG construction
/// tier; the optimizer reads them but never repairs them.
#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    pub(crate) nodes: Vec<NodeId>,
    pub predecessors: Vec<BlockId>,
    pub successors: Vec<BlockId>,
}

impl BasicBlock {
    /// Nodes in program order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The last node of the block, the terminator candidate.
    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Returns `true` if the block holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
