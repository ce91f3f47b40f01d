//! The document root and scene-graph objects

use serde::{Deserialize, Serialize};

use crate::accessor::{Accessor, Buffer, BufferView};
use crate::animation::Animation;
use crate::error::{GltfError, GltfResult};
use crate::extensions::{Extension, ExtensionMap};
use crate::ids::{CameraId, MeshId, NodeId, SceneId};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::texture::{Image, Sampler, Texture};

/// Document metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "minVersion")]
    pub min_version: Option<String>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            generator: Some(concat!("gltfforge ", env!("CARGO_PKG_VERSION")).to_string()),
            min_version: None,
        }
    }
}

/// A scene: the indices of its root nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeId>,
}

/// A scene-graph node with a local TRS transform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    /// Quaternion (x, y, z, w)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    /// Column-major; mutually exclusive with TRS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f32; 16]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "ExtensionMap::is_empty")]
    pub extensions: ExtensionMap,
}

/// Camera projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub camera_type: CameraType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perspective: Option<CameraPerspective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orthographic: Option<CameraOrthographic>,
}

/// Camera projection kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    Perspective,
    Orthographic,
}

/// Perspective projection, angles in radians
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraPerspective {
    pub yfov: f32,
    pub znear: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zfar: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "aspectRatio")]
    pub aspect_ratio: Option<f32>,
}

/// Orthographic projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraOrthographic {
    pub xmag: f32,
    pub ymag: f32,
    pub znear: f32,
    pub zfar: f32,
}

/// The glTF document root.
///
/// Owns every child list; all cross-references between objects are typed
/// indices into these lists. Indices are stable once assigned and never
/// reused within a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GltfRoot {
    #[serde(default)]
    pub asset: Asset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<SceneId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cameras: Vec<Camera>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<Texture>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samplers: Vec<Sampler>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    #[serde(
        default,
        rename = "bufferViews",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<Animation>,
    #[serde(
        default,
        rename = "extensionsUsed",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extensions_used: Vec<String>,
    #[serde(
        default,
        rename = "extensionsRequired",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extensions_required: Vec<String>,
    #[serde(default, skip_serializing_if = "ExtensionMap::is_empty")]
    pub extensions: ExtensionMap,
}

impl GltfRoot {
    /// Parse a document from JSON bytes
    pub fn from_json_slice(data: &[u8]) -> GltfResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Serialize the document to a JSON string
    pub fn to_json_string(&self, pretty: bool) -> GltfResult<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    /// The scene selected by the `scene` property, if any
    pub fn default_scene(&self) -> Option<&Scene> {
        self.scene.and_then(|id| self.scenes.get(id.index()))
    }

    /// Resolve the requested scene index, falling back to the default scene.
    /// Fails when neither is available.
    pub fn resolve_scene(&self, requested: Option<usize>) -> GltfResult<&Scene> {
        if let Some(index) = requested {
            return self.scenes.get(index).ok_or_else(|| {
                GltfError::InvalidDocument(format!(
                    "requested scene {index} out of range ({} scenes)",
                    self.scenes.len()
                ))
            });
        }
        self.default_scene().ok_or_else(|| {
            GltfError::InvalidDocument("no default scene in glTF file".to_string())
        })
    }

    /// Record an extension name in `extensionsUsed` (and `extensionsRequired`
    /// when `required`). Names are recorded once.
    pub fn declare_extension(&mut self, name: &str, required: bool) {
        if !self.extensions_used.iter().any(|n| n == name) {
            self.extensions_used.push(name.to_string());
        }
        if required && !self.extensions_required.iter().any(|n| n == name) {
            self.extensions_required.push(name.to_string());
        }
    }

    /// Remove an extension name from the used/required lists
    pub fn undeclare_extension(&mut self, name: &str) {
        self.extensions_used.retain(|n| n != name);
        self.extensions_required.retain(|n| n != name);
    }

    /// Attach a root-level extension payload and declare it
    pub fn add_extension(&mut self, extension: Box<dyn Extension>, required: bool) {
        let name = extension.name().to_string();
        self.extensions.insert(extension);
        self.declare_extension(&name, required);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_round_trip() {
        let root = GltfRoot::default();
        let json = root.to_json_string(false).unwrap();
        let back = GltfRoot::from_json_slice(json.as_bytes()).unwrap();
        assert_eq!(back.asset.version, "2.0");
        assert!(back.nodes.is_empty());
    }

    #[test]
    fn test_resolve_scene_requires_default() {
        let root = GltfRoot::default();
        assert!(root.resolve_scene(None).is_err());

        let mut root = GltfRoot::default();
        root.scenes.push(Scene::default());
        // still no default pointer, explicit index works
        assert!(root.resolve_scene(None).is_err());
        assert!(root.resolve_scene(Some(0)).is_ok());

        root.scene = Some(SceneId(0));
        assert!(root.resolve_scene(None).is_ok());
    }

    #[test]
    fn test_declare_extension_once() {
        let mut root = GltfRoot::default();
        root.declare_extension("KHR_materials_ior", false);
        root.declare_extension("KHR_materials_ior", true);
        assert_eq!(root.extensions_used.len(), 1);
        assert_eq!(root.extensions_required, vec!["KHR_materials_ior"]);

        root.undeclare_extension("KHR_materials_ior");
        assert!(root.extensions_used.is_empty());
        assert!(root.extensions_required.is_empty());
    }
}
