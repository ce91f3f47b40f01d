//! Session-scoped deduplication caches
//!
//! Keys are composite structural identities. Equality and hashing include
//! the usage discriminant, so the same source texture exported for two
//! different conversion purposes yields two distinct glTF textures while the
//! same (mesh, material set) from two nodes collapses to one glTF mesh.
//! Caches live and die with one exporter session.

use crate::textures::TextureSlot;

/// Identity of one exported mesh: geometry plus its material bindings and
/// skinning state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PrimKey {
    pub mesh: usize,
    pub materials: Vec<Option<usize>>,
    pub skinned: bool,
}

/// Identity of one exported texture: source plus usage/conversion kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct UniqueTexture {
    pub texture: usize,
    pub slot: TextureSlot,
}
