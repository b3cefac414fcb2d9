//! NxSH intermediate representation.
//!
//! A three-address, SSA-like IR over basic blocks, built by the shader
//! decoder and rewritten in place by the optimizer. Local variables carry
//! exact def/use back-references; all structural mutation goes through
//! [`FlowGraph`] so those references stay coherent.

mod block;
mod display;
mod error;
mod graph;
mod inst;
mod node;
mod operand;
mod validate;

pub use block::{BasicBlock, BlockId};
pub use display::dump_graph;
pub use error::IrError;
pub use graph::FlowGraph;
pub use inst::{Instruction, Opcode, TextureFlags, TypeFlags};
pub use node::{Node, NodeId, NodeKind, OpNode, PhiNode, TextureInfo};
pub use operand::{FRAG_COORD_W, FRAG_COORD_X, Operand, OperandId, OperandKind};
pub use validate::validate;
