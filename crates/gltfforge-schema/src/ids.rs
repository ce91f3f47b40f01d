//! Typed index newtypes
//!
//! Every cross-reference in a glTF document is an integer index into one of
//! the root's lists. Wrapping each index family in its own type keeps a mesh
//! index from being used where an accessor index is expected; the indices are
//! stable once assigned and never reused within a document.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Index into [`crate::GltfRoot::scenes`]
    SceneId
);
define_id!(
    /// Index into [`crate::GltfRoot::nodes`]
    NodeId
);
define_id!(
    /// Index into [`crate::GltfRoot::meshes`]
    MeshId
);
define_id!(
    /// Index into [`crate::GltfRoot::materials`]
    MaterialId
);
define_id!(
    /// Index into [`crate::GltfRoot::textures`]
    TextureId
);
define_id!(
    /// Index into [`crate::GltfRoot::images`]
    ImageId
);
define_id!(
    /// Index into [`crate::GltfRoot::samplers`]
    SamplerId
);
define_id!(
    /// Index into [`crate::GltfRoot::buffers`]
    BufferId
);
define_id!(
    /// Index into [`crate::GltfRoot::buffer_views`]
    BufferViewId
);
define_id!(
    /// Index into [`crate::GltfRoot::accessors`]
    AccessorId
);
define_id!(
    /// Index into [`crate::GltfRoot::cameras`]
    CameraId
);
define_id!(
    /// Index into the KHR_lights_punctual light list
    LightId
);
