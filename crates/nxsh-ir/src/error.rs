//! Error types for the NxSH IR.

use crate::block::BlockId;
use crate::node::NodeId;
use crate::operand::OperandId;

/// Structural violations detected by [`validate`](crate::validate).
///
/// Well-formed IR is a precondition everywhere else; these exist so debug
/// builds and tests can report exactly which link went stale.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A destination's `assigned_by` does not point back at its node.
    #[error("node {node:?} writes {operand:?}, but the operand's def link disagrees")]
    DefLinkMismatch { node: NodeId, operand: OperandId },

    /// A use list does not mirror the source slots naming the operand.
    #[error("use list of {operand:?} records {recorded} entries for {expected} source slots")]
    UseListMismatch {
        operand: OperandId,
        expected: usize,
        recorded: usize,
    },

    /// A local variable is read but has no live definition.
    #[error("local {operand:?} is read by {node:?} but never assigned")]
    UndefinedLocal { operand: OperandId, node: NodeId },

    /// A phi's incoming-value count disagrees with its block list or the
    /// containing block's predecessors.
    #[error("phi in block {block:?} has {sources} sources for {predecessors} predecessors")]
    PhiArityMismatch {
        block: BlockId,
        sources: usize,
        predecessors: usize,
    },
}
