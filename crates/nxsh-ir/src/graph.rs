//! The block graph and its def/use-preserving mutation helpers.
//!
//! Every structural edit (source rewriting, node rewriting, node removal)
//! goes through [`FlowGraph`] so that `assigned_by`/`used_by` stay exact
//! mirrors of the source/destination lists. Desynchronization is a
//! programmer error and fails loudly.

use crate::block::{BasicBlock, BlockId};
use crate::inst::{Instruction, Opcode, TextureFlags};
use crate::node::{Node, NodeId, NodeKind, OpNode, PhiNode, TextureInfo};
use crate::operand::{Operand, OperandId, OperandKind};

/// A control-flow graph of basic blocks over three-address nodes.
///
/// Blocks, nodes, and operands live in flat pools addressed by stable
/// typed indices; removal detaches a node from its block but never
/// invalidates ids.
#[derive(Clone, Debug, Default)]
pub struct FlowGraph {
    blocks: Vec<BasicBlock>,
    nodes: Vec<Node>,
    operands: Vec<Operand>,
}

impl FlowGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // --- construction ---

    /// Appends an empty block and returns its id.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(u32::try_from(self.blocks.len()).expect("block pool overflow"));
        self.blocks.push(BasicBlock::default());
        id
    }

    /// Records a CFG edge `from → to`.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.index()].successors.push(to);
        self.blocks[to.index()].predecessors.push(from);
    }

    fn add_operand(&mut self, kind: OperandKind, value: u32) -> OperandId {
        let id = OperandId(u32::try_from(self.operands.len()).expect("operand pool overflow"));
        self.operands.push(Operand::new(kind, value));
        id
    }

    /// A literal 32-bit constant.
    pub fn const_u32(&mut self, value: u32) -> OperandId {
        self.add_operand(OperandKind::Constant, value)
    }

    /// A literal FP32 constant, stored as its bit pattern.
    pub fn const_f32(&mut self, value: f32) -> OperandId {
        self.add_operand(OperandKind::Constant, value.to_bits())
    }

    /// A fresh SSA-like local variable.
    pub fn local(&mut self) -> OperandId {
        self.add_operand(OperandKind::LocalVariable, 0)
    }

    /// A constant-buffer word at `slot[offset]`.
    pub fn cbuf(&mut self, slot: u16, offset: u16) -> OperandId {
        self.add_operand(
            OperandKind::ConstantBuffer,
            (slot as u32) << 16 | offset as u32,
        )
    }

    /// A shader attribute at the given byte offset.
    pub fn attribute(&mut self, offset: u32) -> OperandId {
        self.add_operand(OperandKind::Attribute, offset)
    }

    /// An argument of the surrounding function.
    pub fn argument(&mut self, index: u32) -> OperandId {
        self.add_operand(OperandKind::Argument, index)
    }

    /// A branch target naming `block`.
    pub fn label(&mut self, block: BlockId) -> OperandId {
        self.add_operand(OperandKind::Label, block.0)
    }

    /// An undefined value.
    pub fn undef(&mut self) -> OperandId {
        self.add_operand(OperandKind::Undefined, 0)
    }

    fn insert_node(&mut self, block: BlockId, node: Node) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node pool overflow"));
        for &s in &node.sources {
            if self.operands[s.index()].is_local() {
                self.operands[s.index()].used_by.push(id);
            }
        }
        for &d in &node.dests {
            let dest = &mut self.operands[d.index()];
            if dest.is_local() {
                assert!(
                    dest.assigned_by.is_none(),
                    "local {d:?} assigned by more than one node"
                );
                dest.assigned_by = Some(id);
            }
        }
        self.nodes.push(node);
        self.blocks[block.index()].nodes.push(id);
        id
    }

    /// Appends an operation to `block`, wiring def/use edges.
    pub fn append_op(
        &mut self,
        block: BlockId,
        inst: Instruction,
        dest: Option<OperandId>,
        sources: &[OperandId],
    ) -> NodeId {
        self.insert_node(
            block,
            Node {
                block: Some(block),
                sources: sources.to_vec(),
                dests: dest.into_iter().collect(),
                kind: NodeKind::Op(OpNode {
                    inst,
                    index: 0,
                    texture: None,
                }),
            },
        )
    }

    /// Appends an operation carrying a component/lane index.
    pub fn append_op_indexed(
        &mut self,
        block: BlockId,
        inst: Instruction,
        index: u32,
        dest: Option<OperandId>,
        sources: &[OperandId],
    ) -> NodeId {
        let id = self.append_op(block, inst, dest, sources);
        if let NodeKind::Op(op) = &mut self.nodes[id.index()].kind {
            op.index = index;
        }
        id
    }

    /// Appends a texture operation.
    pub fn append_texture_op(
        &mut self,
        block: BlockId,
        inst: Instruction,
        flags: TextureFlags,
        binding: u32,
        dest: Option<OperandId>,
        sources: &[OperandId],
    ) -> NodeId {
        let id = self.append_op(block, inst, dest, sources);
        if let NodeKind::Op(op) = &mut self.nodes[id.index()].kind {
            op.texture = Some(TextureInfo { flags, binding });
        }
        id
    }

    /// Appends a phi to `block`. `incoming` pairs a predecessor block with
    /// the value it contributes.
    pub fn append_phi(
        &mut self,
        block: BlockId,
        dest: OperandId,
        incoming: &[(BlockId, OperandId)],
    ) -> NodeId {
        self.insert_node(
            block,
            Node {
                block: Some(block),
                sources: incoming.iter().map(|&(_, v)| v).collect(),
                dests: vec![dest],
                kind: NodeKind::Phi(PhiNode {
                    blocks: incoming.iter().map(|&(b, _)| b).collect(),
                }),
            },
        )
    }

    // --- accessors ---

    /// Number of blocks in the graph.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// All block ids, in graph order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    /// The block with the given id.
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// Mutable access to a block's CFG edge lists.
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// The node with the given id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Mutable access to a node's payload. Source/destination lists stay
    /// behind the mutation helpers.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// The operand with the given id.
    pub fn operand(&self, id: OperandId) -> &Operand {
        &self.operands[id.index()]
    }

    /// Constant payload of `id`, when it is a literal constant.
    pub fn const_value(&self, id: OperandId) -> Option<u32> {
        let o = self.operand(id);
        o.is_constant().then_some(o.value)
    }

    /// The operation defining `id`, when `id` is a local assigned by a
    /// non-phi node still attached to a block.
    pub fn defining_op(&self, id: OperandId) -> Option<(NodeId, &OpNode)> {
        let def = self.operand(id).assigned_by?;
        let node = self.node(def);
        node.block?;
        node.as_op().map(|op| (def, op))
    }

    /// Same-valued test used by phi collapsing and algebraic rewrites:
    /// the literal same local, or constants with identical bit patterns,
    /// or the same constant-buffer word. Values produced by loads or other
    /// opaque definitions never unify.
    pub fn is_same_value(&self, a: OperandId, b: OperandId) -> bool {
        let (oa, ob) = (self.operand(a), self.operand(b));
        if a == b && oa.is_local() {
            return true;
        }
        match (oa.kind, ob.kind) {
            (OperandKind::Constant, OperandKind::Constant)
            | (OperandKind::ConstantBuffer, OperandKind::ConstantBuffer) => oa.value == ob.value,
            _ => false,
        }
    }

    // --- mutation helpers ---

    fn add_use(&mut self, operand: OperandId, node: NodeId) {
        if self.operands[operand.index()].is_local() {
            self.operands[operand.index()].used_by.push(node);
        }
    }

    fn drop_use(&mut self, operand: OperandId, node: NodeId) {
        if !self.operands[operand.index()].is_local() {
            return;
        }
        let uses = &mut self.operands[operand.index()].used_by;
        let pos = uses
            .iter()
            .position(|&u| u == node)
            .expect("def/use lists out of sync");
        uses.swap_remove(pos);
    }

    /// Rewrites source `index` of `node` to `operand`.
    pub fn set_source(&mut self, node: NodeId, index: usize, operand: OperandId) {
        let old = self.nodes[node.index()].sources[index];
        if old == operand {
            return;
        }
        self.drop_use(old, node);
        self.nodes[node.index()].sources[index] = operand;
        self.add_use(operand, node);
    }

    /// Removes source `index` of `node`, shifting later sources down.
    pub fn remove_source(&mut self, node: NodeId, index: usize) {
        let old = self.nodes[node.index()].sources.remove(index);
        self.drop_use(old, node);
    }

    /// Rewrites every consumer of `of` to read `with` instead.
    ///
    /// `of` must be a local variable; its use list is empty afterwards.
    pub fn replace_uses(&mut self, of: OperandId, with: OperandId) {
        assert!(
            self.operands[of.index()].is_local(),
            "only locals carry use lists"
        );
        if of == with {
            return;
        }
        let consumers = std::mem::take(&mut self.operands[of.index()].used_by);
        for &n in &consumers {
            for slot in self.nodes[n.index()].sources.iter_mut() {
                if *slot == of {
                    *slot = with;
                }
            }
        }
        if self.operands[with.index()].is_local() {
            // One use entry per rewritten slot, preserving the multiset.
            self.operands[with.index()].used_by.extend(consumers);
        }
    }

    /// Rewrites `node` in place into `inst` over `sources`, keeping its
    /// destinations. The node becomes a plain operation.
    pub fn turn_into(&mut self, node: NodeId, inst: Instruction, sources: &[OperandId]) {
        let old = std::mem::take(&mut self.nodes[node.index()].sources);
        for &s in &old {
            self.drop_use(s, node);
        }
        self.nodes[node.index()].sources = sources.to_vec();
        for &s in sources {
            self.add_use(s, node);
        }
        self.nodes[node.index()].kind = NodeKind::Op(OpNode {
            inst,
            index: 0,
            texture: None,
        });
    }

    /// Rewrites `node` into a `Copy` of `src`.
    pub fn turn_into_copy(&mut self, node: NodeId, src: OperandId) {
        self.turn_into(node, Instruction::new(Opcode::Copy), &[src]);
    }

    /// A node is unused iff it has no side effects, has at least one
    /// destination, and every destination is a local with an empty use list.
    pub fn is_unused(&self, id: NodeId) -> bool {
        let node = self.node(id);
        if let Some(op) = node.as_op()
            && op.inst.opcode().has_side_effects()
        {
            return false;
        }
        if node.dests.is_empty() {
            return false;
        }
        node.dests.iter().all(|&d| {
            let o = self.operand(d);
            o.is_local() && o.used_by.is_empty()
        })
    }

    /// Removes `id` from its block and cascades: any defining node whose
    /// last use disappeared is re-checked and removed in turn. Worklist
    /// based; never recurses through the def/use cycle.
    pub fn remove_node(&mut self, id: NodeId) {
        let mut candidates = Vec::new();
        self.unlink(id, &mut candidates);
        while let Some(cand) = candidates.pop() {
            if self.node(cand).block().is_some() && self.is_unused(cand) {
                self.unlink(cand, &mut candidates);
            }
        }
    }

    fn unlink(&mut self, id: NodeId, candidates: &mut Vec<NodeId>) {
        let block = self.nodes[id.index()]
            .block
            .take()
            .expect("node removed twice");
        self.blocks[block.index()].nodes.retain(|&n| n != id);

        let sources = std::mem::take(&mut self.nodes[id.index()].sources);
        for &s in &sources {
            self.drop_use(s, id);
            let o = &self.operands[s.index()];
            if o.is_local()
                && o.used_by.is_empty()
                && let Some(def) = o.assigned_by
            {
                candidates.push(def);
            }
        }

        let dests = std::mem::take(&mut self.nodes[id.index()].dests);
        for &d in &dests {
            let o = &mut self.operands[d.index()];
            if o.assigned_by == Some(id) {
                o.assigned_by = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_op_wires_def_use() {
        let mut g = FlowGraph::new();
        let b = g.add_block();
        let a = g.local();
        let c = g.const_u32(1);
        let d = g.local();
        let def = g.append_op(b, Opcode::Copy.into(), Some(a), &[c]);
        let add = g.append_op(b, Opcode::Add.into(), Some(d), &[a, a]);

        assert_eq!(g.operand(a).assigned_by(), Some(def));
        // One use entry per source slot.
        assert_eq!(g.operand(a).used_by(), &[add, add]);
        assert_eq!(g.operand(d).assigned_by(), Some(add));
    }

    #[test]
    fn set_source_moves_use() {
        let mut g = FlowGraph::new();
        let b = g.add_block();
        let x = g.local();
        let y = g.local();
        let d = g.local();
        let c = g.const_u32(0);
        g.append_op(b, Opcode::Copy.into(), Some(x), &[c]);
        g.append_op(b, Opcode::Copy.into(), Some(y), &[c]);
        let n = g.append_op(b, Opcode::Negate.into(), Some(d), &[x]);

        g.set_source(n, 0, y);
        assert_eq!(g.operand(x).use_count(), 0);
        assert_eq!(g.operand(y).used_by(), &[n]);
    }

    #[test]
    fn replace_uses_rewrites_all_slots() {
        let mut g = FlowGraph::new();
        let b = g.add_block();
        let x = g.local();
        let y = g.local();
        let d = g.local();
        let c = g.const_u32(7);
        g.append_op(b, Opcode::Copy.into(), Some(x), &[c]);
        g.append_op(b, Opcode::Copy.into(), Some(y), &[c]);
        let n = g.append_op(b, Opcode::Multiply.into(), Some(d), &[x, x]);

        g.replace_uses(x, y);
        assert_eq!(g.node(n).sources(), &[y, y]);
        assert_eq!(g.operand(x).use_count(), 0);
        assert_eq!(g.operand(y).use_count(), 2);
    }

    #[test]
    fn turn_into_copy_adjusts_uses() {
        let mut g = FlowGraph::new();
        let b = g.add_block();
        let x = g.local();
        let y = g.local();
        let d = g.local();
        let c = g.const_u32(7);
        g.append_op(b, Opcode::Copy.into(), Some(x), &[c]);
        g.append_op(b, Opcode::Copy.into(), Some(y), &[c]);
        let n = g.append_op(b, Opcode::Add.into(), Some(d), &[x, y]);

        g.turn_into_copy(n, x);
        assert_eq!(g.node(n).opcode(), Some(Opcode::Copy));
        assert_eq!(g.node(n).sources(), &[x]);
        assert_eq!(g.operand(x).used_by(), &[n]);
        assert_eq!(g.operand(y).use_count(), 0);
    }

    #[test]
    fn remove_node_cascades_through_dead_chain() {
        // t1 = a + b; t2 = t1 + c; t3 = t2 + d — removing t3 kills all three.
        let mut g = FlowGraph::new();
        let b = g.add_block();
        let a = g.argument(0);
        let bb = g.argument(1);
        let c = g.argument(2);
        let d = g.argument(3);
        let t1 = g.local();
        let t2 = g.local();
        let t3 = g.local();
        g.append_op(b, Opcode::Add.into(), Some(t1), &[a, bb]);
        g.append_op(b, Opcode::Add.into(), Some(t2), &[t1, c]);
        let n3 = g.append_op(b, Opcode::Add.into(), Some(t3), &[t2, d]);

        g.remove_node(n3);
        assert!(g.block(b).is_empty());
        assert!(g.operand(t1).assigned_by().is_none());
        assert!(g.operand(t2).assigned_by().is_none());
    }

    #[test]
    fn cascade_stops_at_side_effects() {
        let mut g = FlowGraph::new();
        let b = g.add_block();
        let v = g.local();
        let ptr = g.argument(0);
        let one = g.const_u32(1);
        g.append_op(b, Opcode::AtomicAdd.into(), Some(v), &[ptr, one]);
        let t = g.local();
        let n = g.append_op(b, Opcode::Negate.into(), Some(t), &[v]);

        g.remove_node(n);
        // The atomic stays even though its result is now dead.
        assert_eq!(g.block(b).nodes().len(), 1);
    }

    #[test]
    fn unused_requires_a_destination() {
        let mut g = FlowGraph::new();
        let b = g.add_block();
        let addr = g.argument(0);
        let val = g.argument(1);
        let store = g.append_op(b, Opcode::StoreGlobal.into(), None, &[addr, val]);
        assert!(!g.is_unused(store));
    }

    #[test]
    fn same_value_cases() {
        let mut g = FlowGraph::new();
        let b = g.add_block();
        let c1 = g.const_u32(5);
        let c2 = g.const_u32(5);
        let c3 = g.const_u32(6);
        let cb1 = g.cbuf(1, 4);
        let cb2 = g.cbuf(1, 4);
        let l = g.local();
        g.append_op(b, Opcode::Copy.into(), Some(l), &[c1]);

        assert!(g.is_same_value(c1, c2));
        assert!(!g.is_same_value(c1, c3));
        assert!(g.is_same_value(cb1, cb2));
        assert!(g.is_same_value(l, l));
        assert!(!g.is_same_value(l, c1));
    }
}
