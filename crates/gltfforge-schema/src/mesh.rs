//! Meshes and primitives

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{AccessorId, MaterialId};
use crate::ser::numeric_enum;

/// Attribute semantic names
pub mod semantic {
    pub const POSITION: &str = "POSITION";
    pub const NORMAL: &str = "NORMAL";
    pub const TANGENT: &str = "TANGENT";
    pub const TEXCOORD_0: &str = "TEXCOORD_0";
    pub const TEXCOORD_1: &str = "TEXCOORD_1";
    pub const COLOR_0: &str = "COLOR_0";

    /// Semantic name of the nth TEXCOORD set
    pub fn texcoord(set: u32) -> String {
        format!("TEXCOORD_{set}")
    }
}

numeric_enum! {
    /// Primitive draw mode, serialized as its GL code
    pub enum DrawMode {
        Points = 0,
        Lines = 1,
        LineLoop = 2,
        LineStrip = 3,
        Triangles = 4,
        TriangleStrip = 5,
        TriangleFan = 6,
    }
}

impl Default for DrawMode {
    fn default() -> Self {
        DrawMode::Triangles
    }
}

impl DrawMode {
    fn is_default(&self) -> bool {
        *self == DrawMode::Triangles
    }
}

/// A mesh: an ordered list of primitives plus optional morph-target weights
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<MeshPrimitive>,
    /// Default morph-target weights, parallel to each primitive's targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f32>>,
    /// Free-form payload; morph target names live in `extras.targetNames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

/// One drawable piece of a mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshPrimitive {
    /// Semantic name to accessor mapping; BTreeMap keeps output deterministic
    pub attributes: BTreeMap<String, AccessorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<AccessorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialId>,
    #[serde(default, skip_serializing_if = "DrawMode::is_default")]
    pub mode: DrawMode,
    /// Morph-target accessor sets, parallel to the mesh weights
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<BTreeMap<String, AccessorId>>>,
}

impl MeshPrimitive {
    /// Sequential index list for primitives without explicit indices
    pub fn generate_indices(vertex_count: usize) -> Vec<u32> {
        (0..vertex_count as u32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_indices() {
        assert_eq!(MeshPrimitive::generate_indices(3), vec![0, 1, 2]);
        assert!(MeshPrimitive::generate_indices(0).is_empty());
    }

    #[test]
    fn test_default_mode_not_serialized() {
        let prim = MeshPrimitive::default();
        let json = serde_json::to_value(&prim).unwrap();
        assert!(json.get("mode").is_none());

        let prim = MeshPrimitive {
            mode: DrawMode::Lines,
            ..Default::default()
        };
        let json = serde_json::to_value(&prim).unwrap();
        assert_eq!(json["mode"], 1);
    }
}
