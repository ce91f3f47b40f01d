//! Per-session asset cache
//!
//! Owned by exactly one import session and discarded with it. The
//! mesh-attribute table is either filled lazily during the scene build or
//! installed in one shot by the parallel pre-pass; it is never mutated while
//! another thread reads it.

use std::collections::HashMap;

use gltfforge_core::{Pixels, Vec2, Vec3, Vec4};
use gltfforge_schema::DrawMode;

/// Decoded image pixels plus dimensions
#[derive(Debug, Clone)]
pub(crate) struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Pixels,
}

/// CPU-side attribute arrays for one primitive, already in engine space
/// (coordinate conversion and winding flip applied)
#[derive(Debug, Clone, Default)]
pub(crate) struct PrimitiveAttributes {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub uv0: Vec<Vec2>,
    pub uv1: Vec<Vec2>,
    pub colors: Vec<gltfforge_core::Color>,
    pub indices: Vec<u32>,
    pub mode: DrawMode,
    /// (name-index, position/normal/tangent deltas) per morph target
    pub targets: Vec<MorphTargetAttributes>,
}

/// Per-vertex morph deltas for one target of one primitive
#[derive(Debug, Clone, Default)]
pub(crate) struct MorphTargetAttributes {
    pub delta_positions: Vec<Vec3>,
    pub delta_normals: Vec<Vec3>,
    pub delta_tangents: Vec<Vec3>,
}

/// Session-scoped caches keyed by document indices
#[derive(Debug, Default)]
pub(crate) struct AssetCache {
    /// Resolved buffer bytes, one entry per document buffer
    pub buffers: Vec<Vec<u8>>,
    /// Decoded images; `None` marks an unreadable image
    pub images: Vec<Option<DecodedImage>>,
    /// Attribute arrays per (mesh, primitive); `None` until built
    pub mesh_attributes: Vec<Vec<Option<PrimitiveAttributes>>>,
    /// glTF mesh index -> (scene mesh index, per-submesh material slots)
    pub meshes: HashMap<usize, (usize, Vec<Option<usize>>)>,
    /// glTF material index -> scene material index; `None` key holds the
    /// session default material (uniform caching, no index-0 sentinel)
    pub materials: HashMap<Option<usize>, usize>,
    /// glTF texture index -> scene texture index
    pub textures: HashMap<usize, usize>,
    /// light index within the document light list -> scene light index
    pub lights: HashMap<usize, usize>,
    /// glTF camera index -> scene camera index
    pub cameras: HashMap<usize, usize>,
}
