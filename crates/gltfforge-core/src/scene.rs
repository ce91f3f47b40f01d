//! Engine-agnostic scene representation
//!
//! The exporter walks this representation to produce a glTF document, and the
//! importer produces it from one. A host engine binding converts between this
//! and its native scene graph; nothing in here references engine objects.
//!
//! Geometry is stored in the source engine's convention (left-handed, Y-up,
//! degrees for angles, glossiness-style materials allowed). The handedness
//! flip, winding flip, and unit conversions happen inside the exporter and
//! importer so callers never apply them ad hoc.

use serde::{Deserialize, Serialize};

use crate::math::{Color, Quat, Vec2, Vec3, Vec4};

/// A complete scene: node arena plus the resource pools nodes reference.
///
/// All cross-references are indices into the pools on this struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneSource {
    /// Scene name
    pub name: Option<String>,
    /// All nodes, in arbitrary order
    pub nodes: Vec<NodeSource>,
    /// Indices of root nodes
    pub roots: Vec<usize>,
    /// Mesh pool
    pub meshes: Vec<MeshSource>,
    /// Material pool
    pub materials: Vec<MaterialSource>,
    /// Texture pool
    pub textures: Vec<TextureSource>,
    /// Light pool
    pub lights: Vec<LightSource>,
    /// Camera pool
    pub cameras: Vec<CameraSource>,
    /// Animation clips
    pub animations: Vec<AnimationClip>,
}

impl SceneSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Add a node and return its index
    pub fn add_node(&mut self, node: NodeSource) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Add a root node and return its index
    pub fn add_root(&mut self, node: NodeSource) -> usize {
        let index = self.add_node(node);
        self.roots.push(index);
        index
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// One scene-graph node with a local TRS transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSource {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Renderable geometry attached to this node
    pub mesh: Option<MeshInstance>,
    /// Index into [`SceneSource::lights`]
    pub light: Option<usize>,
    /// Index into [`SceneSource::cameras`]
    pub camera: Option<usize>,
    /// Indices of child nodes
    pub children: Vec<usize>,
}

impl NodeSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            light: None,
            camera: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, instance: MeshInstance) -> Self {
        self.mesh = Some(instance);
        self
    }

    pub fn with_translation(mut self, t: Vec3) -> Self {
        self.translation = t;
        self
    }
}

/// A mesh attached to a node, with per-submesh material bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshInstance {
    /// Index into [`SceneSource::meshes`]
    pub mesh: usize,
    /// One material slot per submesh; `None` slots are skipped on export
    pub materials: Vec<Option<usize>>,
    /// Whether a skinned renderer drives this instance
    pub skinned: bool,
    /// Current blend-shape weights in engine percent (0..100)
    pub blend_weights: Vec<f32>,
}

impl MeshInstance {
    pub fn new(mesh: usize, materials: Vec<Option<usize>>) -> Self {
        Self {
            mesh,
            materials,
            skinned: false,
            blend_weights: Vec::new(),
        }
    }
}

/// Mesh geometry with per-vertex attribute streams.
///
/// All streams other than `positions` are optional and, when present, must
/// have the same length as `positions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshSource {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub uv0: Vec<Vec2>,
    pub uv1: Vec<Vec2>,
    pub colors: Vec<Color>,
    /// One submesh per material slot
    pub submeshes: Vec<SubMesh>,
    /// Morph targets
    pub blend_shapes: Vec<BlendShape>,
}

impl MeshSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes
            .iter()
            .filter(|s| s.topology == Topology::Triangles)
            .map(|s| s.indices.len() / 3)
            .sum()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    pub fn blend_shape_count(&self) -> usize {
        self.blend_shapes.len()
    }
}

/// Index range of a mesh drawn with one material slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubMesh {
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl SubMesh {
    pub fn triangles(indices: Vec<u32>) -> Self {
        Self {
            indices,
            topology: Topology::Triangles,
        }
    }
}

/// Primitive topology of a submesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    Triangles,
}

/// A named morph target with one or more progressive frames.
///
/// glTF supports a single frame per target; the exporter uses the last frame
/// (the fully-applied shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub frames: Vec<BlendShapeFrame>,
}

/// Per-vertex deltas for one frame of a blend shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendShapeFrame {
    /// Frame weight in engine percent (0..100)
    pub weight: f32,
    pub delta_positions: Vec<Vec3>,
    pub delta_normals: Vec<Vec3>,
    pub delta_tangents: Vec<Vec3>,
}

/// Metallic workflow variants of an engine material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Workflow {
    /// glTF-native metallic/roughness
    MetallicRoughness {
        metallic: f32,
        roughness: f32,
        /// Metal in B, roughness in G (glTF channel layout)
        texture: Option<TextureRef>,
    },
    /// Engine-style metallic/glossiness; converted on export
    /// (roughness = 1 - glossiness, texture channels repacked)
    MetallicGloss {
        metallic: f32,
        glossiness: f32,
        /// Metal in R, glossiness in A (engine channel layout)
        texture: Option<TextureRef>,
    },
}

impl Default for Workflow {
    fn default() -> Self {
        Workflow::MetallicRoughness {
            metallic: 0.0,
            roughness: 0.5,
            texture: None,
        }
    }
}

/// Reference to a texture in the pool, with UV addressing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureRef {
    /// Index into [`SceneSource::textures`]
    pub texture: usize,
    /// TEXCOORD set to sample
    pub uv_set: u32,
    pub tiling: Vec2,
    pub offset: Vec2,
}

impl TextureRef {
    pub fn new(texture: usize) -> Self {
        Self {
            texture,
            uv_set: 0,
            tiling: Vec2::ONE,
            offset: Vec2::ZERO,
        }
    }

    /// Whether tiling/offset deviate from the identity transform
    pub fn has_transform(&self) -> bool {
        self.tiling != Vec2::ONE || self.offset != Vec2::ZERO
    }
}

/// Alpha handling of a material surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlphaSource {
    Opaque,
    Mask { cutoff: f32 },
    Blend,
}

impl Default for AlphaSource {
    fn default() -> Self {
        AlphaSource::Opaque
    }
}

/// An engine material property set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialSource {
    pub name: String,
    pub base_color: Color,
    pub base_color_texture: Option<TextureRef>,
    pub workflow: Workflow,
    pub normal_texture: Option<TextureRef>,
    pub normal_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_strength: f32,
    /// Emission color; channels above 1.0 carry HDR intensity
    pub emissive: Color,
    pub emissive_texture: Option<TextureRef>,
    pub alpha: AlphaSource,
    pub double_sided: bool,
    /// Shader binding name assigned by the importer's shader table
    pub shader: Option<String>,
    // Properties beyond core PBR, exported as KHR_materials_* extensions
    pub transmission: Option<f32>,
    pub ior: Option<f32>,
    pub specular: Option<SpecularProps>,
    pub volume: Option<VolumeProps>,
    pub iridescence: Option<IridescenceProps>,
}

impl MaterialSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: Color::WHITE,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            emissive: Color::BLACK,
            ..Default::default()
        }
    }
}

/// KHR_materials_specular inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecularProps {
    pub factor: f32,
    pub color: Color,
}

/// KHR_materials_volume inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProps {
    pub thickness: f32,
    pub attenuation_distance: f32,
    pub attenuation_color: Color,
}

/// KHR_materials_iridescence inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IridescenceProps {
    pub factor: f32,
    pub ior: f32,
    pub thickness_min: f32,
    pub thickness_max: f32,
}

/// Decoded texture pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Pixels {
    /// 8-bit RGBA, row-major from the top-left
    Rgba8(Vec<u8>),
    /// Float RGBA for HDR sources
    RgbaF32(Vec<f32>),
}

impl Pixels {
    pub fn is_hdr(&self) -> bool {
        matches!(self, Pixels::RgbaF32(_))
    }
}

/// Texture addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapSource {
    Repeat,
    Clamp,
    Mirror,
}

/// Texture filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterSource {
    Nearest,
    Linear,
}

/// A source texture with decoded pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureSource {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Pixels,
    pub wrap: WrapSource,
    pub filter: FilterSource,
}

impl TextureSource {
    pub fn rgba8(name: impl Into<String>, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            pixels: Pixels::Rgba8(data),
            wrap: WrapSource::Repeat,
            filter: FilterSource::Linear,
        }
    }
}

/// Punctual light kind with kind-specific parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    /// Cone angles in degrees (full angle, engine convention)
    Spot { inner_angle: f32, outer_angle: f32 },
}

/// A punctual light in engine units (intensity is multiplied by pi on
/// export, angles are halved and converted to radians).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightSource {
    pub name: String,
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    /// Attenuation range; 0 means unbounded
    pub range: f32,
}

/// Camera projection in engine units (vertical FOV in degrees).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CameraProjection {
    Perspective {
        yfov: f32,
        znear: f32,
        zfar: Option<f32>,
    },
    Orthographic {
        /// Half of the vertical view extent
        size: f32,
        znear: f32,
        zfar: f32,
    },
}

/// A camera component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSource {
    pub name: String,
    pub projection: CameraProjection,
}

/// A named animation clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<ClipChannel>,
}

/// One animated property: a target object, a property name in engine terms,
/// and the sampled keyframes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipChannel {
    pub target: AnimationTarget,
    /// Engine property name, e.g. `_EmissionColor` or `m_Intensity`
    pub property: String,
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: ClipInterpolation,
}

/// What a clip channel animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationTarget {
    /// Index into [`SceneSource::nodes`]
    Node(usize),
    /// Index into [`SceneSource::materials`]
    Material(usize),
    /// Index into [`SceneSource::lights`]
    Light(usize),
    /// Index into [`SceneSource::cameras`]
    Camera(usize),
}

/// Keyframe value stream, one entry per time sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelValues {
    Float(Vec<f32>),
    Vec2(Vec<Vec2>),
    Vec3(Vec<Vec3>),
    Vec4(Vec<Vec4>),
    Quat(Vec<Quat>),
    Color(Vec<Color>),
}

impl ChannelValues {
    pub fn len(&self) -> usize {
        match self {
            ChannelValues::Float(v) => v.len(),
            ChannelValues::Vec2(v) => v.len(),
            ChannelValues::Vec3(v) => v.len(),
            ChannelValues::Vec4(v) => v.len(),
            ChannelValues::Quat(v) => v.len(),
            ChannelValues::Color(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keyframe interpolation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipInterpolation {
    Linear,
    Step,
    CubicSpline,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_quad() -> MeshSource {
        let mut mesh = MeshSource::new("quad");
        mesh.positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        mesh.submeshes = vec![SubMesh::triangles(vec![0, 1, 2, 1, 3, 2])];
        mesh
    }

    #[test]
    fn test_mesh_counts() {
        let mesh = make_quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.blend_shape_count(), 0);
    }

    #[test]
    fn test_scene_node_arena() {
        let mut scene = SceneSource::new("test");
        let root = scene.add_root(NodeSource::new("root"));
        let child = scene.add_node(NodeSource::new("child"));
        scene.nodes[root].children.push(child);

        assert_eq!(scene.roots, vec![0]);
        assert_eq!(scene.nodes[0].children, vec![1]);
    }

    #[test]
    fn test_texture_ref_transform() {
        let mut tr = TextureRef::new(0);
        assert!(!tr.has_transform());
        tr.tiling = Vec2::new(2.0, 2.0);
        assert!(tr.has_transform());
    }
}
