//! Scene to glTF 2.0 exporter
//!
//! One [`GltfExporter`] session walks a [`SceneSource`] depth-first and
//! builds a [`GltfRoot`] document plus one binary buffer. Identical
//! resources (meshes, textures, materials) are emitted once through
//! session-owned dedup caches; animated properties are registered during the
//! walk and resolved to absolute JSON-pointer paths in a second pass once
//! every object has its final index.
//!
//! Export is single-threaded; a session's caches must never be shared
//! between concurrent exports.

mod animation;
mod buffer;
mod cache;
mod materials;
mod scene;
mod textures;

pub use animation::PointerResolver;
pub use buffer::BufferWriter;
pub use textures::TextureSlot;

use std::collections::HashMap;
use std::path::Path;

use gltfforge_core::SceneSource;
use gltfforge_schema::extensions::{KhrLightsPunctual, PunctualLight};
use gltfforge_schema::{
    CameraId, Glb, GltfError, GltfRoot, LightId, MaterialId, MeshId, NodeId, SamplerId, TextureId,
};

use crate::animation::PendingPointer;
use crate::cache::{PrimKey, UniqueTexture};

/// glTF export options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Include normals in export
    pub export_normals: bool,
    /// Include tangents
    pub export_tangents: bool,
    /// Include UV channels
    pub export_uvs: bool,
    /// Include vertex colors
    pub export_colors: bool,
    /// Write object names into the document
    pub export_names: bool,
    /// Export animation clips
    pub export_animations: bool,
    /// Encode morph-target position deltas as sparse accessors
    pub blend_shape_sparse_accessors: bool,
    /// Pretty-print JSON when writing .gltf
    pub pretty_json: bool,
    /// Allow JPEG for textures known to carry no alpha
    pub texture_file_type_heuristic: bool,
    /// JPEG encode quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            export_normals: true,
            export_tangents: false,
            export_uvs: true,
            export_colors: false,
            export_names: true,
            export_animations: true,
            blend_shape_sparse_accessors: false,
            pretty_json: true,
            texture_file_type_heuristic: true,
            jpeg_quality: 90,
        }
    }
}

/// glTF export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Container error: {0}")]
    Container(#[from] GltfError),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid scene data: {0}")]
    InvalidScene(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// One export session over one scene
pub struct GltfExporter<'a> {
    pub(crate) source: &'a SceneSource,
    pub(crate) options: ExportOptions,
    pub(crate) root: GltfRoot,
    pub(crate) buffer: BufferWriter,

    // source index -> assigned document index
    pub(crate) node_ids: HashMap<usize, NodeId>,
    pub(crate) material_ids: HashMap<usize, MaterialId>,
    pub(crate) default_material: Option<MaterialId>,
    pub(crate) light_ids: HashMap<usize, LightId>,
    pub(crate) camera_ids: HashMap<usize, CameraId>,

    // dedup caches, discarded with the session
    pub(crate) prim_cache: HashMap<PrimKey, MeshId>,
    pub(crate) mesh_accessors: HashMap<usize, scene::MeshAccessors>,
    pub(crate) blend_shape_cache: HashMap<usize, scene::BlendShapeAccessors>,
    pub(crate) texture_cache: HashMap<UniqueTexture, TextureId>,
    pub(crate) sampler_cache: HashMap<(u32, u32), SamplerId>,

    /// Lights accumulated for the root KHR_lights_punctual payload
    pub(crate) lights: Vec<PunctualLight>,
    /// Pointer channels awaiting the second resolution pass
    pub(crate) pending_pointers: Vec<PendingPointer>,
    pub(crate) resolvers: Vec<Box<dyn PointerResolver>>,
}

impl<'a> GltfExporter<'a> {
    pub fn new(source: &'a SceneSource, options: ExportOptions) -> Self {
        Self {
            source,
            options,
            root: GltfRoot::default(),
            buffer: BufferWriter::new(),
            node_ids: HashMap::new(),
            material_ids: HashMap::new(),
            default_material: None,
            light_ids: HashMap::new(),
            camera_ids: HashMap::new(),
            prim_cache: HashMap::new(),
            mesh_accessors: HashMap::new(),
            blend_shape_cache: HashMap::new(),
            texture_cache: HashMap::new(),
            sampler_cache: HashMap::new(),
            lights: Vec::new(),
            pending_pointers: Vec::new(),
            resolvers: Vec::new(),
        }
    }

    /// Register a custom resolver for animation pointer targets the built-in
    /// dispatch cannot place. Resolvers are tried in registration order.
    pub fn register_resolver(&mut self, resolver: Box<dyn PointerResolver>) {
        self.resolvers.push(resolver);
    }

    /// Run the export and return the finished document
    pub fn export(mut self) -> ExportResult<ExportedDocument> {
        self.export_scene_graph()?;

        if self.options.export_animations {
            self.export_animations()?;
        }
        // Second pass: every exportable object now has its final index
        self.resolve_animation_pointers();

        if !self.lights.is_empty() {
            let lights = std::mem::take(&mut self.lights);
            self.root
                .add_extension(Box::new(KhrLightsPunctual::Root { lights }), false);
        }

        let binary = self.buffer.into_inner();
        if !binary.is_empty() {
            self.root.buffers.push(gltfforge_schema::Buffer {
                uri: None,
                byte_length: binary.len(),
                name: None,
            });
        }

        let pretty_json = self.options.pretty_json;
        Ok(ExportedDocument {
            root: self.root,
            binary,
            pretty_json,
        })
    }
}

/// A finished export: document root plus its binary buffer
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub root: GltfRoot,
    pub binary: Vec<u8>,
    pretty_json: bool,
}

impl ExportedDocument {
    /// Write separate `.gltf` + `.bin` files next to each other
    pub fn write_gltf(&self, output_path: impl AsRef<Path>) -> ExportResult<()> {
        let output_path = output_path.as_ref();
        let json_path = output_path.with_extension("gltf");
        let bin_path = output_path.with_extension("bin");

        let mut root = self.root.clone();
        if let Some(buffer) = root.buffers.first_mut() {
            let bin_name = bin_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "data.bin".to_string());
            buffer.uri = Some(bin_name);
        }

        let json = root.to_json_string(self.pretty_json)?;
        std::fs::write(&json_path, json)?;
        if !self.binary.is_empty() {
            std::fs::write(&bin_path, &self.binary)?;
        }
        Ok(())
    }

    /// Write a single `.glb` container
    pub fn write_glb(&self, output_path: impl AsRef<Path>) -> ExportResult<()> {
        let bytes = self.to_glb_bytes()?;
        std::fs::write(output_path.as_ref().with_extension("glb"), bytes)?;
        Ok(())
    }

    /// Serialize to GLB container bytes
    pub fn to_glb_bytes(&self) -> ExportResult<Vec<u8>> {
        let glb = Glb {
            json: self.root.to_json_string(false)?.into_bytes(),
            bin: if self.binary.is_empty() {
                None
            } else {
                Some(self.binary.clone())
            },
        };
        Ok(glb.to_vec()?)
    }
}
