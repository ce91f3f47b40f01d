//! glTF 2.0 to scene importer
//!
//! One [`GltfImporter`] parses a `.gltf`/`.glb` payload into a [`GltfRoot`],
//! resolves every buffer and image up front (URI, base64 data URI, or GLB
//! chunk), then builds an engine-agnostic [`SceneSource`]. Meshes and
//! materials are constructed lazily and cached per index, so a mesh
//! referenced by many nodes is only rebuilt once. An optional pre-pass
//! constructs all per-primitive attribute arrays in parallel before the
//! scene build starts.

mod accessors;
mod cache;
mod resolve;
mod scene;

pub use resolve::{FileLoader, NullLoader, ResourceLoader};

use std::collections::HashMap;
use std::path::Path;

use gltfforge_core::SceneSource;
use gltfforge_schema::{Glb, GltfError, GltfRoot};

use crate::cache::AssetCache;
use crate::scene::ImportSession;

/// Importer errors. The fatal category aborts the whole import; everything
/// recoverable is logged and substituted instead.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document error: {0}")]
    Document(#[from] GltfError),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Node hierarchy contains a cycle through node {node}")]
    NodeCycle { node: usize },

    #[error("Unsupported draw mode for topology mapping: {mode:?}")]
    UnsupportedDrawMode { mode: gltfforge_schema::DrawMode },

    #[error("Buffer {index} could not be resolved: {reason}")]
    BufferResolution { index: usize, reason: String },

    #[error("Shader table is missing the required {0:?} entry")]
    MissingShaderEntry(MaterialKind),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Material families that need a shader binding on the host side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    PbrMetallicRoughness,
    PbrSpecularGlossiness,
    Unlit,
}

/// Explicit material-kind to shader-name mapping passed into the importer
/// session. The required PbrMetallicRoughness entry is checked when the
/// session is created, not at lookup time.
#[derive(Debug, Clone, Default)]
pub struct ShaderTable {
    entries: HashMap<MaterialKind, String>,
}

impl ShaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the standard fallback shader bound to the required entry
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.insert(MaterialKind::PbrMetallicRoughness, "Standard");
        table
    }

    pub fn insert(&mut self, kind: MaterialKind, shader: impl Into<String>) {
        self.entries.insert(kind, shader.into());
    }

    pub fn shader_for(&self, kind: MaterialKind) -> Option<&str> {
        self.entries.get(&kind).map(|s| s.as_str())
    }

    /// Required-entries check, run at session start
    pub fn validate(&self) -> ImportResult<()> {
        if !self.entries.contains_key(&MaterialKind::PbrMetallicRoughness) {
            return Err(ImportError::MissingShaderEntry(
                MaterialKind::PbrMetallicRoughness,
            ));
        }
        Ok(())
    }

    /// Shader for the required fallback entry; validated to exist
    pub(crate) fn fallback(&self) -> &str {
        self.shader_for(MaterialKind::PbrMetallicRoughness)
            .unwrap_or("Standard")
    }
}

/// glTF import options
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Scene to instantiate; `None` uses the document default
    pub scene_index: Option<usize>,
    /// Build per-primitive attribute arrays in a parallel pre-pass
    pub multithreaded: bool,
    /// Material-kind to shader-name bindings
    pub shader_table: ShaderTable,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            scene_index: None,
            multithreaded: false,
            shader_table: ShaderTable::standard(),
        }
    }
}

/// One importer configuration; each `import_*` call runs an isolated session
/// whose caches are discarded with it
pub struct GltfImporter {
    options: ImportOptions,
    loader: Box<dyn ResourceLoader>,
}

impl std::fmt::Debug for GltfImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GltfImporter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl GltfImporter {
    /// Create an importer. Fails when the shader table is missing required
    /// entries, so misconfiguration surfaces before any loading starts.
    pub fn new(loader: Box<dyn ResourceLoader>, options: ImportOptions) -> ImportResult<Self> {
        options.shader_table.validate()?;
        Ok(Self { options, loader })
    }

    /// Import a `.gltf` or `.glb` file; relative URIs resolve against the
    /// file's directory
    pub fn import_file(path: impl AsRef<Path>, options: ImportOptions) -> ImportResult<SceneSource> {
        let path = path.as_ref();
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let importer = Self::new(Box::new(FileLoader::new(base)), options)?;
        let data = std::fs::read(path)?;
        importer.import_slice(&data)
    }

    /// Import from raw `.gltf` JSON or `.glb` container bytes
    pub fn import_slice(&self, data: &[u8]) -> ImportResult<SceneSource> {
        let (root, glb_bin) = if Glb::sniff(data) {
            let glb = Glb::parse(data)?;
            (GltfRoot::from_json_slice(&glb.json)?, glb.bin)
        } else {
            (GltfRoot::from_json_slice(data)?, None)
        };
        self.import_document(root, glb_bin)
    }

    /// Import an already-parsed document plus its optional GLB chunk
    pub fn import_document(
        &self,
        root: GltfRoot,
        glb_bin: Option<Vec<u8>>,
    ) -> ImportResult<SceneSource> {
        let mut session = ImportSession {
            root,
            glb_bin,
            loader: self.loader.as_ref(),
            options: &self.options,
            cache: AssetCache::default(),
            scene: SceneSource::default(),
            node_map: HashMap::new(),
        };
        session.run()
    }
}
