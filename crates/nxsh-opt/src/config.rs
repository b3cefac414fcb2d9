//! The translator configuration consumed by the optimizer.

/// Pipeline stage of the shader being translated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Compute,
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
}

/// Interface the surrounding translator exposes to the optimizer.
///
/// The introspection hooks return `None` when a binding cannot be
/// resolved; the corresponding lowering then leaves the node untouched.
/// [`set_accessible_buffer_masks`](Self::set_accessible_buffer_masks) is
/// invoked exactly once per [`optimize`](crate::optimize) call, after the
/// one-shot lowerings have visited every block.
pub trait TranslatorConfig {
    /// The stage of the shader under translation.
    fn stage(&self) -> ShaderStage;

    /// The storage buffer whose descriptor lives at `(slot, offset)` in
    /// constant-buffer space, if the driver reserved one there.
    fn storage_buffer_binding(&self, slot: u16, offset: u16) -> Option<u32>;

    /// The fixed texture binding for a bindless handle loaded from
    /// `(slot, offset)`, if the descriptor can be resolved now.
    fn bindless_texture_binding(&self, slot: u16, offset: u16) -> Option<u32>;

    /// Receives the storage-buffer and bindless-elimination use masks.
    fn set_accessible_buffer_masks(&mut self, sb_use_mask: u32, ube_use_mask: u32);
}
