//! Scene builder
//!
//! Turns a parsed document plus resolved buffers/images into the
//! engine-agnostic scene representation. Nodes instantiate recursively with
//! cycle detection; meshes and materials build lazily and are cached per
//! index, so a mesh referenced by many nodes is only rebuilt once. Materials
//! cache uniformly by `Option<usize>`, with the session default material
//! under the `None` key.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use gltfforge_core::convert::{convert_position, convert_rotation, RAD_TO_DEG};
use gltfforge_core::{
    AlphaSource, BlendShape, BlendShapeFrame, CameraProjection, CameraSource, Color, FilterSource,
    IridescenceProps, LightKind, LightSource, MaterialSource, MeshInstance, MeshSource,
    NodeSource, Quat, SceneSource, SpecularProps, SubMesh, TextureRef, TextureSource, Topology,
    Vec2, Vec3, VolumeProps, Workflow, WrapSource,
};
use gltfforge_schema::extensions::{
    ExtTextureExr, KhrLightsPunctual, KhrMaterialsEmissiveStrength, KhrMaterialsIor,
    KhrMaterialsIridescence, KhrMaterialsSpecular, KhrMaterialsTransmission, KhrMaterialsVolume,
    KhrTextureTransform,
};
use gltfforge_schema::{
    AlphaMode, CameraType, DrawMode, ExtensionMap, FilterMode, GltfRoot, Material, WrapMode,
};

use crate::accessors::build_primitive_attributes;
use crate::cache::{AssetCache, PrimitiveAttributes};
use crate::resolve::ResourceLoader;
use crate::{ImportError, ImportOptions, ImportResult, MaterialKind};

/// State of one import; caches die with it
pub(crate) struct ImportSession<'a> {
    pub root: GltfRoot,
    pub glb_bin: Option<Vec<u8>>,
    pub loader: &'a dyn ResourceLoader,
    pub options: &'a ImportOptions,
    pub cache: AssetCache,
    pub scene: SceneSource,
    /// document node index -> scene node index
    pub node_map: HashMap<usize, usize>,
}

impl ImportSession<'_> {
    pub fn run(mut self) -> ImportResult<SceneSource> {
        // fatal when absent and no explicit index was requested
        let scene_def = self.root.resolve_scene(self.options.scene_index)?.clone();

        self.resolve_buffers()?;
        self.resolve_images()?;
        self.prebuild_attributes()?;

        self.scene.name = Some(
            scene_def
                .name
                .clone()
                .unwrap_or_else(|| "GLTFScene".to_string()),
        );
        for node_id in &scene_def.nodes {
            let mut path = Vec::new();
            let index = self.build_node(node_id.index(), &mut path)?;
            self.scene.roots.push(index);
        }

        Ok(self.scene)
    }

    /// Parallel pre-pass over all per-primitive attribute arrays. Builds
    /// into a fresh table and installs it in one assignment once every
    /// worker has finished; nothing reads the cache until then.
    fn prebuild_attributes(&mut self) -> ImportResult<()> {
        if !self.options.multithreaded {
            self.cache.mesh_attributes = vec![Vec::new(); self.root.meshes.len()];
            return Ok(());
        }

        let root = &self.root;
        let buffers = &self.cache.buffers;
        let built = root
            .meshes
            .par_iter()
            .enumerate()
            .map(|(mesh_index, mesh)| {
                (0..mesh.primitives.len())
                    .map(|prim_index| {
                        match build_primitive_attributes(root, buffers, mesh_index, prim_index) {
                            Ok(attrs) => Ok(Some(attrs)),
                            Err(err @ ImportError::UnsupportedDrawMode { .. }) => Err(err),
                            Err(err) => {
                                warn!(mesh = mesh_index, primitive = prim_index, error = %err, "unreadable primitive, skipping");
                                Ok(None)
                            }
                        }
                    })
                    .collect::<ImportResult<Vec<_>>>()
            })
            .collect::<ImportResult<Vec<_>>>()?;

        self.cache.mesh_attributes = built;
        Ok(())
    }

    fn build_node(&mut self, index: usize, path: &mut Vec<usize>) -> ImportResult<usize> {
        if path.contains(&index) {
            return Err(ImportError::NodeCycle { node: index });
        }
        // a node reachable through two parents builds once
        if let Some(&existing) = self.node_map.get(&index) {
            return Ok(existing);
        }
        let node = self.root.nodes.get(index).cloned().ok_or_else(|| {
            ImportError::InvalidDocument(format!("node {index} out of range"))
        })?;

        let mut ir = NodeSource::new(node.name.clone().unwrap_or_else(|| "GLTFNode".to_string()));
        if let Some(t) = node.translation {
            ir.translation = convert_position(Vec3::from_array(t));
        }
        if let Some(r) = node.rotation {
            ir.rotation = convert_rotation(Quat::from_array(r));
        }
        if let Some(s) = node.scale {
            ir.scale = Vec3::from_array(s);
        }
        if let Some(m) = node.matrix {
            debug!(node = index, "matrix transform: only the translation column is applied");
            ir.translation = convert_position(Vec3::new(m[12], m[13], m[14]));
        }

        if let Some(mesh_id) = node.mesh {
            if let Some((mesh_index, materials)) = self.build_mesh(mesh_id.index())? {
                let mut instance = MeshInstance::new(mesh_index, materials);
                let weights = node.weights.clone().or_else(|| {
                    self.root
                        .meshes
                        .get(mesh_id.index())
                        .and_then(|m| m.weights.clone())
                });
                if let Some(weights) = weights {
                    instance.blend_weights = weights.iter().map(|w| w * 100.0).collect();
                }
                ir.mesh = Some(instance);
            }
        }
        if let Some(camera_id) = node.camera {
            ir.camera = self.build_camera(camera_id.index());
        }
        if let Some(KhrLightsPunctual::Node { light }) =
            node.extensions.get_as(KhrLightsPunctual::NAME)
        {
            ir.light = self.build_light(light.index());
        }

        let ir_index = self.scene.add_node(ir);
        self.node_map.insert(index, ir_index);

        path.push(index);
        let mut children = Vec::new();
        for child in &node.children {
            children.push(self.build_node(child.index(), path)?);
        }
        path.pop();
        self.scene.nodes[ir_index].children = children;
        Ok(ir_index)
    }

    /// Build one document mesh into the scene, concatenating its primitives
    /// into submeshes. Returns the scene mesh index plus per-submesh
    /// material slots; cached per document mesh index.
    fn build_mesh(&mut self, mesh_index: usize) -> ImportResult<Option<(usize, Vec<Option<usize>>)>> {
        if let Some(cached) = self.cache.meshes.get(&mesh_index) {
            return Ok(Some(cached.clone()));
        }
        let Some(mesh) = self.root.meshes.get(mesh_index).cloned() else {
            warn!(mesh = mesh_index, "mesh index out of range, skipping");
            return Ok(None);
        };
        if mesh.primitives.is_empty() {
            warn!(mesh = mesh_index, "mesh has no primitives, skipping");
            return Ok(None);
        }

        let target_names: Vec<String> = mesh
            .extras
            .as_ref()
            .and_then(|extras| extras.get("targetNames"))
            .and_then(|names| serde_json::from_value(names.clone()).ok())
            .unwrap_or_default();

        let mut ir = MeshSource::new(
            mesh.name
                .clone()
                .unwrap_or_else(|| format!("Mesh{mesh_index}")),
        );
        let mut slots = Vec::new();
        let mut blend_shapes: Vec<BlendShape> = Vec::new();

        for (prim_index, primitive) in mesh.primitives.iter().enumerate() {
            let attrs = match self.primitive_attributes(mesh_index, prim_index) {
                Ok(attrs) => attrs,
                // unsupported topology is fatal; unreadable data skips the
                // primitive and the scene build continues
                Err(err @ ImportError::UnsupportedDrawMode { .. }) => return Err(err),
                Err(err) => {
                    warn!(mesh = mesh_index, primitive = prim_index, error = %err, "unreadable primitive, skipping");
                    continue;
                }
            };

            let vertex_offset = ir.positions.len();
            let vertex_count = attrs.positions.len();

            ir.positions.extend_from_slice(&attrs.positions);
            extend_stream(&mut ir.normals, &attrs.normals, vertex_offset, vertex_count);
            extend_stream(&mut ir.tangents, &attrs.tangents, vertex_offset, vertex_count);
            extend_stream(&mut ir.uv0, &attrs.uv0, vertex_offset, vertex_count);
            extend_stream(&mut ir.uv1, &attrs.uv1, vertex_offset, vertex_count);
            extend_stream(&mut ir.colors, &attrs.colors, vertex_offset, vertex_count);

            let indices: Vec<u32> = attrs
                .indices
                .iter()
                .map(|i| i + vertex_offset as u32)
                .collect();
            ir.submeshes.push(SubMesh {
                indices,
                topology: topology_of(attrs.mode),
            });
            slots.push(Some(self.build_material(primitive.material.map(|m| m.index()))?));

            for (target_index, morph) in attrs.targets.iter().enumerate() {
                if blend_shapes.len() <= target_index {
                    blend_shapes.push(BlendShape {
                        name: target_names
                            .get(target_index)
                            .cloned()
                            .unwrap_or_else(|| format!("Target{target_index}")),
                        frames: vec![BlendShapeFrame {
                            weight: 100.0,
                            delta_positions: Vec::new(),
                            delta_normals: Vec::new(),
                            delta_tangents: Vec::new(),
                        }],
                    });
                }
                let frame = &mut blend_shapes[target_index].frames[0];
                extend_stream(
                    &mut frame.delta_positions,
                    &morph.delta_positions,
                    vertex_offset,
                    vertex_count,
                );
                extend_stream(
                    &mut frame.delta_normals,
                    &morph.delta_normals,
                    vertex_offset,
                    vertex_count,
                );
                extend_stream(
                    &mut frame.delta_tangents,
                    &morph.delta_tangents,
                    vertex_offset,
                    vertex_count,
                );
            }
        }

        if slots.is_empty() {
            return Ok(None);
        }

        let total = ir.positions.len();
        for shape in &mut blend_shapes {
            let frame = &mut shape.frames[0];
            if !frame.delta_positions.is_empty() {
                frame.delta_positions.resize(total, Vec3::ZERO);
            }
            if !frame.delta_normals.is_empty() {
                frame.delta_normals.resize(total, Vec3::ZERO);
            }
            if !frame.delta_tangents.is_empty() {
                frame.delta_tangents.resize(total, Vec3::ZERO);
            }
        }
        ir.blend_shapes = blend_shapes;

        let ir_index = self.scene.meshes.len();
        self.scene.meshes.push(ir);
        self.cache
            .meshes
            .insert(mesh_index, (ir_index, slots.clone()));
        Ok(Some((ir_index, slots)))
    }

    /// Lazily-built per-primitive attribute arrays. The parallel pre-pass
    /// fills these ahead of time; otherwise they build on first use.
    fn primitive_attributes(
        &mut self,
        mesh_index: usize,
        prim_index: usize,
    ) -> ImportResult<PrimitiveAttributes> {
        let prim_count = self
            .root
            .meshes
            .get(mesh_index)
            .map(|m| m.primitives.len())
            .unwrap_or(0);
        {
            if self.cache.mesh_attributes.len() <= mesh_index {
                self.cache
                    .mesh_attributes
                    .resize_with(mesh_index + 1, Vec::new);
            }
            let entry = &mut self.cache.mesh_attributes[mesh_index];
            if entry.len() < prim_count {
                entry.resize(prim_count, None);
            }
            if let Some(attrs) = entry.get_mut(prim_index).and_then(|slot| slot.take()) {
                return Ok(attrs);
            }
        }
        build_primitive_attributes(&self.root, &self.cache.buffers, mesh_index, prim_index)
    }

    /// Materials cache uniformly by optional index; `None` is the session
    /// default material used by primitives without one
    fn build_material(&mut self, index: Option<usize>) -> ImportResult<usize> {
        if let Some(&cached) = self.cache.materials.get(&index) {
            return Ok(cached);
        }

        let ir = match index {
            None => {
                let mut material = MaterialSource::new("Default");
                material.shader = Some(self.options.shader_table.fallback().to_string());
                material
            }
            Some(i) => match self.root.materials.get(i).cloned() {
                Some(def) => self.convert_material(i, &def),
                None => {
                    warn!(material = i, "material index out of range, substituting default");
                    let mut material = MaterialSource::new(format!("Material{i}"));
                    material.shader = Some(self.options.shader_table.fallback().to_string());
                    material
                }
            },
        };

        let ir_index = self.scene.materials.len();
        self.scene.materials.push(ir);
        self.cache.materials.insert(index, ir_index);
        Ok(ir_index)
    }

    fn convert_material(&mut self, index: usize, def: &Material) -> MaterialSource {
        let mut ir = MaterialSource::new(
            def.name.clone().unwrap_or_else(|| format!("Material{index}")),
        );

        // shader binding comes from the session table; a missing entry
        // substitutes the required fallback instead of aborting
        let kind = MaterialKind::PbrMetallicRoughness;
        ir.shader = match self.options.shader_table.shader_for(kind) {
            Some(shader) => Some(shader.to_string()),
            None => {
                warn!(material = %ir.name, ?kind, "no shader supplied for material type, using fallback");
                Some(self.options.shader_table.fallback().to_string())
            }
        };

        if let Some(pbr) = &def.pbr_metallic_roughness {
            ir.base_color = Color::from_array(pbr.base_color_factor);
            ir.base_color_texture = pbr
                .base_color_texture
                .as_ref()
                .and_then(|info| {
                    self.build_texture_ref(info.index.index(), info.tex_coord, &info.extensions)
                });
            let texture = pbr.metallic_roughness_texture.as_ref().and_then(|info| {
                self.build_texture_ref(info.index.index(), info.tex_coord, &info.extensions)
            });
            ir.workflow = Workflow::MetallicRoughness {
                metallic: pbr.metallic_factor,
                roughness: pbr.roughness_factor,
                texture,
            };
        }

        if let Some(info) = &def.normal_texture {
            ir.normal_texture =
                self.build_texture_ref(info.index.index(), info.tex_coord, &info.extensions);
            ir.normal_scale = info.scale;
        }
        if let Some(info) = &def.occlusion_texture {
            ir.occlusion_texture =
                self.build_texture_ref(info.index.index(), info.tex_coord, &info.extensions);
            ir.occlusion_strength = info.strength;
        }

        let strength = def
            .extensions
            .get_as::<KhrMaterialsEmissiveStrength>(KhrMaterialsEmissiveStrength::NAME)
            .map(|e| e.emissive_strength)
            .unwrap_or(1.0);
        ir.emissive = Color::rgb(
            def.emissive_factor[0] * strength,
            def.emissive_factor[1] * strength,
            def.emissive_factor[2] * strength,
        );
        if let Some(info) = &def.emissive_texture {
            ir.emissive_texture =
                self.build_texture_ref(info.index.index(), info.tex_coord, &info.extensions);
        }

        ir.alpha = match def.alpha_mode {
            AlphaMode::Opaque => AlphaSource::Opaque,
            AlphaMode::Mask => AlphaSource::Mask {
                cutoff: def.alpha_cutoff,
            },
            AlphaMode::Blend => AlphaSource::Blend,
        };
        ir.double_sided = def.double_sided;

        if let Some(ext) = def
            .extensions
            .get_as::<KhrMaterialsTransmission>(KhrMaterialsTransmission::NAME)
        {
            ir.transmission = Some(ext.transmission_factor);
        }
        if let Some(ext) = def.extensions.get_as::<KhrMaterialsIor>(KhrMaterialsIor::NAME) {
            ir.ior = Some(ext.ior);
        }
        if let Some(ext) = def
            .extensions
            .get_as::<KhrMaterialsSpecular>(KhrMaterialsSpecular::NAME)
        {
            ir.specular = Some(SpecularProps {
                factor: ext.specular_factor,
                color: Color::rgb(
                    ext.specular_color_factor[0],
                    ext.specular_color_factor[1],
                    ext.specular_color_factor[2],
                ),
            });
        }
        if let Some(ext) = def
            .extensions
            .get_as::<KhrMaterialsVolume>(KhrMaterialsVolume::NAME)
        {
            ir.volume = Some(VolumeProps {
                thickness: ext.thickness_factor,
                attenuation_distance: ext.attenuation_distance.unwrap_or(0.0),
                attenuation_color: Color::rgb(
                    ext.attenuation_color[0],
                    ext.attenuation_color[1],
                    ext.attenuation_color[2],
                ),
            });
        }
        if let Some(ext) = def
            .extensions
            .get_as::<KhrMaterialsIridescence>(KhrMaterialsIridescence::NAME)
        {
            ir.iridescence = Some(IridescenceProps {
                factor: ext.iridescence_factor,
                ior: ext.iridescence_ior,
                thickness_min: ext.iridescence_thickness_minimum,
                thickness_max: ext.iridescence_thickness_maximum,
            });
        }

        ir
    }

    fn build_texture_ref(
        &mut self,
        texture_index: usize,
        tex_coord: u32,
        extensions: &ExtensionMap,
    ) -> Option<TextureRef> {
        let scene_texture = self.build_texture(texture_index)?;
        let mut tex_ref = TextureRef::new(scene_texture);
        tex_ref.uv_set = tex_coord;
        if let Some(transform) =
            extensions.get_as::<KhrTextureTransform>(KhrTextureTransform::NAME)
        {
            tex_ref.tiling = Vec2::new(transform.scale[0], transform.scale[1]);
            // inverse of the export-side V mirror; the formula is involutive
            tex_ref.offset = Vec2::new(
                transform.offset[0],
                1.0 - transform.offset[1] - transform.scale[1],
            );
            if let Some(tc) = transform.tex_coord {
                tex_ref.uv_set = tc;
            }
        }
        Some(tex_ref)
    }

    fn build_texture(&mut self, index: usize) -> Option<usize> {
        if let Some(&cached) = self.cache.textures.get(&index) {
            return Some(cached);
        }
        let Some(texture) = self.root.textures.get(index).cloned() else {
            warn!(texture = index, "texture index out of range, skipping");
            return None;
        };

        // EXT_texture_exr points at the EXR image source
        let source = texture
            .extensions
            .get_as::<ExtTextureExr>(ExtTextureExr::NAME)
            .map(|e| e.source)
            .or(texture.source)?;
        let Some(image) = self
            .cache
            .images
            .get(source.index())
            .and_then(|slot| slot.as_ref())
        else {
            warn!(texture = index, image = source.index(), "texture references an unreadable image, skipping");
            return None;
        };

        let (wrap, filter) = texture
            .sampler
            .and_then(|s| self.root.samplers.get(s.index()))
            .map(|sampler| {
                let wrap = match sampler.wrap_s {
                    WrapMode::ClampToEdge => WrapSource::Clamp,
                    WrapMode::MirroredRepeat => WrapSource::Mirror,
                    WrapMode::Repeat => WrapSource::Repeat,
                };
                let filter = match sampler.min_filter {
                    Some(FilterMode::Nearest) | Some(FilterMode::NearestMipmapNearest)
                    | Some(FilterMode::NearestMipmapLinear) => FilterSource::Nearest,
                    _ => FilterSource::Linear,
                };
                (wrap, filter)
            })
            .unwrap_or((WrapSource::Repeat, FilterSource::Linear));

        let ir = TextureSource {
            name: texture
                .name
                .clone()
                .unwrap_or_else(|| format!("Texture{index}")),
            width: image.width,
            height: image.height,
            pixels: image.pixels.clone(),
            wrap,
            filter,
        };

        let ir_index = self.scene.textures.len();
        self.scene.textures.push(ir);
        self.cache.textures.insert(index, ir_index);
        Some(ir_index)
    }

    /// Inverse of the export-side light conversion: intensity divides by pi,
    /// cone angles double back into full degrees
    fn build_light(&mut self, index: usize) -> Option<usize> {
        if let Some(&cached) = self.cache.lights.get(&index) {
            return Some(cached);
        }
        let lights = match self
            .root
            .extensions
            .get_as::<KhrLightsPunctual>(KhrLightsPunctual::NAME)
        {
            Some(KhrLightsPunctual::Root { lights }) => lights,
            _ => {
                warn!(light = index, "document declares no light list, skipping");
                return None;
            }
        };
        let light = lights.get(index)?.clone();

        use gltfforge_schema::extensions::LightType;
        let kind = match light.light_type {
            LightType::Directional => LightKind::Directional,
            LightType::Point => LightKind::Point,
            LightType::Spot => {
                let spot = light.spot.clone().unwrap_or(
                    gltfforge_schema::extensions::SpotLight {
                        inner_cone_angle: 0.0,
                        outer_cone_angle: std::f32::consts::FRAC_PI_4,
                    },
                );
                LightKind::Spot {
                    inner_angle: spot.inner_cone_angle * RAD_TO_DEG * 2.0,
                    outer_angle: spot.outer_cone_angle * RAD_TO_DEG * 2.0,
                }
            }
        };

        let ir = LightSource {
            name: light
                .name
                .clone()
                .unwrap_or_else(|| format!("Light{index}")),
            kind,
            color: Color::rgb(light.color[0], light.color[1], light.color[2]),
            intensity: light.intensity / std::f32::consts::PI,
            range: light.range.unwrap_or(0.0),
        };

        let ir_index = self.scene.lights.len();
        self.scene.lights.push(ir);
        self.cache.lights.insert(index, ir_index);
        Some(ir_index)
    }

    fn build_camera(&mut self, index: usize) -> Option<usize> {
        if let Some(&cached) = self.cache.cameras.get(&index) {
            return Some(cached);
        }
        let camera = self.root.cameras.get(index)?.clone();

        let projection = match camera.camera_type {
            CameraType::Perspective => {
                let p = camera.perspective.as_ref()?;
                CameraProjection::Perspective {
                    yfov: p.yfov * RAD_TO_DEG,
                    znear: p.znear,
                    zfar: p.zfar,
                }
            }
            CameraType::Orthographic => {
                let o = camera.orthographic.as_ref()?;
                CameraProjection::Orthographic {
                    size: o.ymag,
                    znear: o.znear,
                    zfar: o.zfar,
                }
            }
        };

        let ir = CameraSource {
            name: camera
                .name
                .clone()
                .unwrap_or_else(|| format!("Camera{index}")),
            projection,
        };

        let ir_index = self.scene.cameras.len();
        self.scene.cameras.push(ir);
        self.cache.cameras.insert(index, ir_index);
        Some(ir_index)
    }
}

fn topology_of(mode: DrawMode) -> Topology {
    match mode {
        DrawMode::Points => Topology::Points,
        DrawMode::Lines => Topology::Lines,
        DrawMode::LineStrip => Topology::LineStrip,
        // the attribute builder rejected every other mode already
        _ => Topology::Triangles,
    }
}

/// Keep an optional attribute stream aligned with the concatenated vertex
/// count, padding with defaults where a primitive lacks the stream
fn extend_stream<T: Clone + Default>(dst: &mut Vec<T>, src: &[T], offset: usize, count: usize) {
    if src.is_empty() && dst.is_empty() {
        return;
    }
    if dst.len() < offset {
        dst.resize(offset, T::default());
    }
    if src.is_empty() {
        dst.resize(offset + count, T::default());
    } else {
        dst.extend_from_slice(src);
    }
}
