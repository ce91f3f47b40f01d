//! glTF 2.0 document model
//!
//! Serde-backed schema types for the glTF 2.0 JSON document, the GLB binary
//! container, and the extension registry. All cross-references between
//! document objects are typed index newtypes ([`ids`]); the [`GltfRoot`]
//! exclusively owns every child list.

pub mod accessor;
pub mod animation;
pub mod error;
pub mod extensions;
pub mod glb;
pub mod ids;
pub mod material;
pub mod mesh;
pub mod root;
pub mod texture;
pub mod uri;

mod ser;

pub use accessor::{
    Accessor, AccessorSparse, AccessorType, Buffer, BufferView, BufferViewTarget, ComponentType,
    SparseIndices, SparseValues,
};
pub use animation::{
    Animation, AnimationChannel, AnimationChannelTarget, AnimationSampler, Interpolation,
    TargetPath,
};
pub use error::{GltfError, GltfResult};
pub use extensions::{Extension, ExtensionMap};
pub use glb::Glb;
pub use ids::*;
pub use material::{
    AlphaMode, Material, NormalTextureInfo, OcclusionTextureInfo, PbrMetallicRoughness,
    TextureInfo,
};
pub use mesh::{DrawMode, Mesh, MeshPrimitive};
pub use root::{
    Asset, Camera, CameraOrthographic, CameraPerspective, CameraType, GltfRoot, Node, Scene,
};
pub use texture::{FilterMode, Image, Sampler, Texture, WrapMode};
