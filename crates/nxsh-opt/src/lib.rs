//! Optimization driver for the NxSH shader translator.
//!
//! Rewrites the decoded block graph in place: a fixpoint sweep of
//! peephole, propagation, and pattern rewrites; one visit of the one-shot
//! lowerings that specialize global-memory and bindless texture accesses;
//! and a final fixpoint sweep to clear whatever the lowerings orphaned.

mod bindless;
mod branch_elim;
mod config;
mod const_fold;
mod derivative;
mod driver;
mod frag_coord;
mod global_to_storage;
mod propagate;
mod simplify;

pub use config::{ShaderStage, TranslatorConfig};

use nxsh_ir::FlowGraph;

/// Optimizes `graph` to a fixpoint and publishes the accessible-buffer
/// masks to `config` exactly once.
///
/// Precondition: the graph is well-formed (coherent def/use lists, single
/// assignment per local, one phi source per predecessor). Postcondition:
/// still well-formed, and no unused local definition remains.
pub fn optimize(graph: &mut FlowGraph, config: &mut dyn TranslatorConfig) {
    let stage = config.stage();

    driver::run_to_fixpoint(graph, stage);
    debug_validate(graph, "fixpoint");

    lower_accesses(graph, config);
    debug_validate(graph, "one-shot lowerings");

    driver::run_to_fixpoint(graph, stage);
    debug_validate(graph, "final fixpoint");
    debug_assert_no_unused(graph);
}

/// Visits every block exactly once with the one-shot lowerings, then hands
/// the accumulated use masks to the config sink.
fn lower_accesses(graph: &mut FlowGraph, config: &mut dyn TranslatorConfig) {
    let mut sb_use_mask = 0u32;
    let mut ube_use_mask = 0u32;

    for block in graph.block_ids().collect::<Vec<_>>() {
        for id in graph.block(block).nodes().to_vec() {
            if graph.node(id).block().is_none() {
                continue;
            }
            if global_to_storage::run_node(graph, id, config, &mut sb_use_mask) {
                continue;
            }
            if bindless::to_indexed(graph, id) {
                continue;
            }
            bindless::eliminate(graph, id, config, &mut ube_use_mask);
        }
    }

    log::debug!(
        "accessible buffers: sb=0x{sb_use_mask:08x} ube=0x{ube_use_mask:08x}"
    );
    config.set_accessible_buffer_masks(sb_use_mask, ube_use_mask);
}

#[cfg(debug_assertions)]
fn debug_validate(graph: &FlowGraph, phase: &str) {
    if let Err(e) = nxsh_ir::validate(graph) {
        panic!("IR invariant violated after {phase}: {e}");
    }
}

#[cfg(not(debug_assertions))]
fn debug_validate(_graph: &FlowGraph, _phase: &str) {}

#[cfg(debug_assertions)]
fn debug_assert_no_unused(graph: &FlowGraph) {
    for block in graph.block_ids() {
        for &id in graph.block(block).nodes() {
            debug_assert!(!graph.is_unused(id), "unused node survived the driver");
        }
    }
}

#[cfg(not(debug_assertions))]
fn debug_assert_no_unused(_graph: &FlowGraph) {}
