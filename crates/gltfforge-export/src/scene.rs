//! Scene graph walker
//!
//! Depth-first traversal of the source graph. Each visited node emits a
//! document node in preorder, so parents always get lower indices than their
//! children. Meshes, lights, and cameras are exported through the session
//! caches on first encounter.

use std::collections::BTreeMap;

use tracing::warn;

use gltfforge_core::{CameraProjection, LightKind, MeshInstance, MeshSource, Topology, Vec3};
use gltfforge_schema::extensions::{KhrLightsPunctual, LightType, PunctualLight, SpotLight};
use gltfforge_schema::mesh::semantic;
use gltfforge_schema::{
    AccessorId, BufferViewTarget, Camera, CameraId, CameraOrthographic, CameraPerspective,
    CameraType, DrawMode, LightId, Mesh, MeshId, MeshPrimitive, Node, NodeId, Scene, SceneId,
};

use gltfforge_core::convert::{
    convert_direction, convert_position, convert_rotation, convert_tangent, convert_uv,
    flip_triangle_winding, DEG_TO_RAD,
};

use crate::cache::PrimKey;
use crate::{ExportResult, GltfExporter};

/// Attribute accessors shared by every primitive of one source mesh
#[derive(Debug, Clone)]
pub(crate) struct MeshAccessors {
    pub position: AccessorId,
    pub normal: Option<AccessorId>,
    pub tangent: Option<AccessorId>,
    pub texcoord0: Option<AccessorId>,
    pub texcoord1: Option<AccessorId>,
    pub color0: Option<AccessorId>,
}

/// Morph-target accessors shared by every primitive of one source mesh
#[derive(Debug, Clone, Default)]
pub(crate) struct BlendShapeAccessors {
    pub targets: Vec<BTreeMap<String, AccessorId>>,
    pub names: Vec<String>,
}

impl GltfExporter<'_> {
    pub(crate) fn export_scene_graph(&mut self) -> ExportResult<()> {
        let roots = self.source.roots.clone();
        let mut scene_nodes = Vec::new();
        for root_index in roots {
            if let Some(id) = self.export_node(root_index)? {
                scene_nodes.push(id);
            }
        }

        self.root.scenes.push(Scene {
            name: self.name_of(self.source.name.as_deref().unwrap_or("Scene")),
            nodes: scene_nodes,
        });
        self.root.scene = Some(SceneId(0));
        Ok(())
    }

    fn name_of(&self, name: &str) -> Option<String> {
        if self.options.export_names && !name.is_empty() {
            Some(name.to_string())
        } else {
            None
        }
    }

    fn export_node(&mut self, index: usize) -> ExportResult<Option<NodeId>> {
        let source = self.source;
        let Some(node_src) = source.nodes.get(index) else {
            warn!(node = index, "node index out of range, skipping");
            return Ok(None);
        };
        if let Some(&existing) = self.node_ids.get(&index) {
            // a node reachable through two parents is emitted once
            warn!(node = index, name = %node_src.name, "node visited twice, reusing exported node");
            return Ok(Some(existing));
        }

        let id = NodeId(self.root.nodes.len());
        self.root.nodes.push(Node::default());
        self.node_ids.insert(index, id);

        let mut node = Node {
            name: self.name_of(&node_src.name),
            ..Default::default()
        };
        if node_src.translation != Vec3::ZERO {
            node.translation = Some(convert_position(node_src.translation).to_array());
        }
        if !node_src.rotation.is_identity() {
            node.rotation = Some(convert_rotation(node_src.rotation).to_array());
        }
        if node_src.scale != Vec3::ONE {
            node.scale = Some(node_src.scale.to_array());
        }

        if let Some(instance) = &node_src.mesh {
            node.mesh = self.export_mesh_instance(instance)?;
        }
        if let Some(light) = node_src.light {
            if let Some(light_id) = self.export_light(light) {
                node.extensions
                    .insert(Box::new(KhrLightsPunctual::Node { light: light_id }));
            }
        }
        if let Some(camera) = node_src.camera {
            node.camera = self.export_camera(camera);
        }

        let mut children = Vec::new();
        for &child in &node_src.children {
            if let Some(child_id) = self.export_node(child)? {
                children.push(child_id);
            }
        }
        node.children = children;

        self.root.nodes[id.index()] = node;
        Ok(Some(id))
    }

    /// Export a (mesh, material set) combination, reusing the cached mesh id
    /// when the same combination was already seen on another node
    fn export_mesh_instance(&mut self, instance: &MeshInstance) -> ExportResult<Option<MeshId>> {
        let key = PrimKey {
            mesh: instance.mesh,
            materials: instance.materials.clone(),
            skinned: instance.skinned,
        };
        if let Some(&id) = self.prim_cache.get(&key) {
            return Ok(Some(id));
        }

        let source = self.source;
        let Some(mesh_src) = source.meshes.get(instance.mesh) else {
            warn!(mesh = instance.mesh, "mesh index out of range, skipping");
            return Ok(None);
        };
        if mesh_src.positions.is_empty() {
            warn!(mesh = %mesh_src.name, "mesh contains no vertices, won't export");
            return Ok(None);
        }

        let primitives = self.export_primitives(instance.mesh, mesh_src, &instance.materials)?;
        if primitives.is_empty() {
            return Ok(None);
        }

        let mut mesh = Mesh {
            name: self.name_of(&mesh_src.name),
            primitives,
            weights: None,
            extras: None,
        };

        if !mesh_src.blend_shapes.is_empty() {
            let shapes = self.export_blend_shapes(instance.mesh, mesh_src);
            if !shapes.targets.is_empty() {
                for primitive in &mut mesh.primitives {
                    primitive.targets = Some(shapes.targets.clone());
                }
                let weights = if instance.blend_weights.len() == shapes.targets.len() {
                    instance.blend_weights.iter().map(|w| w / 100.0).collect()
                } else {
                    vec![0.0; shapes.targets.len()]
                };
                mesh.weights = Some(weights);
                mesh.extras = Some(serde_json::json!({ "targetNames": shapes.names }));
            }
        }

        let id = MeshId(self.root.meshes.len());
        self.root.meshes.push(mesh);
        self.prim_cache.insert(key, id);
        Ok(Some(id))
    }

    /// Attribute accessors are exported once per source mesh and shared by
    /// all primitives and material sets referencing it
    fn mesh_accessors(&mut self, mesh_index: usize, mesh_src: &MeshSource) -> MeshAccessors {
        if let Some(cached) = self.mesh_accessors.get(&mesh_index) {
            return cached.clone();
        }

        let positions: Vec<Vec3> = mesh_src.positions.iter().map(|p| convert_position(*p)).collect();
        let position = self.export_vec3_accessor(&positions, true, Some(BufferViewTarget::ArrayBuffer));

        let normal = if self.options.export_normals && mesh_src.has_normals() {
            let normals: Vec<Vec3> = mesh_src.normals.iter().map(|n| convert_direction(*n)).collect();
            Some(self.export_vec3_accessor(&normals, false, Some(BufferViewTarget::ArrayBuffer)))
        } else {
            None
        };

        let tangent = if self.options.export_tangents && mesh_src.has_tangents() {
            let tangents: Vec<_> = mesh_src.tangents.iter().map(|t| convert_tangent(*t)).collect();
            Some(self.export_vec4_accessor(&tangents, Some(BufferViewTarget::ArrayBuffer)))
        } else {
            None
        };

        let texcoord0 = if self.options.export_uvs && !mesh_src.uv0.is_empty() {
            let uvs: Vec<_> = mesh_src.uv0.iter().map(|uv| convert_uv(*uv)).collect();
            Some(self.export_vec2_accessor(&uvs))
        } else {
            None
        };
        let texcoord1 = if self.options.export_uvs && !mesh_src.uv1.is_empty() {
            let uvs: Vec<_> = mesh_src.uv1.iter().map(|uv| convert_uv(*uv)).collect();
            Some(self.export_vec2_accessor(&uvs))
        } else {
            None
        };

        let color0 = if self.options.export_colors && !mesh_src.colors.is_empty() {
            Some(self.export_color_accessor(&mesh_src.colors, true, Some(BufferViewTarget::ArrayBuffer)))
        } else {
            None
        };

        let accessors = MeshAccessors {
            position,
            normal,
            tangent,
            texcoord0,
            texcoord1,
            color0,
        };
        self.mesh_accessors.insert(mesh_index, accessors.clone());
        accessors
    }

    /// One primitive per submesh slot with a bound material
    fn export_primitives(
        &mut self,
        mesh_index: usize,
        mesh_src: &MeshSource,
        materials: &[Option<usize>],
    ) -> ExportResult<Vec<MeshPrimitive>> {
        let accessors = self.mesh_accessors(mesh_index, mesh_src);

        let mut primitives = Vec::new();
        for (slot, submesh) in mesh_src.submeshes.iter().enumerate() {
            let Some(&Some(material_index)) = materials.get(slot) else {
                // empty material slot: primitive not drawn, not exported
                continue;
            };
            if submesh.indices.is_empty() {
                continue;
            }

            let mut indices = submesh.indices.clone();
            if submesh.topology == Topology::Triangles {
                flip_triangle_winding(&mut indices);
            }

            let mut attributes = BTreeMap::new();
            attributes.insert(semantic::POSITION.to_string(), accessors.position);
            if let Some(normal) = accessors.normal {
                attributes.insert(semantic::NORMAL.to_string(), normal);
            }
            if let Some(tangent) = accessors.tangent {
                attributes.insert(semantic::TANGENT.to_string(), tangent);
            }
            if let Some(texcoord0) = accessors.texcoord0 {
                attributes.insert(semantic::TEXCOORD_0.to_string(), texcoord0);
            }
            if let Some(texcoord1) = accessors.texcoord1 {
                attributes.insert(semantic::TEXCOORD_1.to_string(), texcoord1);
            }
            if let Some(color0) = accessors.color0 {
                attributes.insert(semantic::COLOR_0.to_string(), color0);
            }

            primitives.push(MeshPrimitive {
                attributes,
                indices: Some(self.export_index_accessor(&indices)),
                material: Some(self.export_material(material_index)?),
                mode: draw_mode(submesh.topology),
                targets: None,
            });
        }
        Ok(primitives)
    }

    /// Morph targets always use the final frame of each blend shape. Sparse
    /// encoding applies to position deltas only; normal and tangent deltas
    /// stay dense.
    fn export_blend_shapes(
        &mut self,
        mesh_index: usize,
        mesh_src: &MeshSource,
    ) -> BlendShapeAccessors {
        if let Some(cached) = self.blend_shape_cache.get(&mesh_index) {
            return cached.clone();
        }

        let mut out = BlendShapeAccessors::default();
        for shape in &mesh_src.blend_shapes {
            let Some(frame) = shape.frames.last() else {
                continue;
            };

            let mut target = BTreeMap::new();
            let deltas: Vec<Vec3> = frame
                .delta_positions
                .iter()
                .map(|d| convert_position(*d))
                .collect();
            if self.options.blend_shape_sparse_accessors {
                if let Some(accessor) = self.export_sparse_vec3_accessor(&deltas) {
                    target.insert(semantic::POSITION.to_string(), accessor);
                }
            } else {
                let accessor =
                    self.export_vec3_accessor(&deltas, true, Some(BufferViewTarget::ArrayBuffer));
                target.insert(semantic::POSITION.to_string(), accessor);
            }

            if mesh_src.has_normals() && !frame.delta_normals.is_empty() {
                let deltas: Vec<Vec3> = frame
                    .delta_normals
                    .iter()
                    .map(|d| convert_direction(*d))
                    .collect();
                let accessor =
                    self.export_vec3_accessor(&deltas, false, Some(BufferViewTarget::ArrayBuffer));
                target.insert(semantic::NORMAL.to_string(), accessor);
            }
            if mesh_src.has_tangents() && !frame.delta_tangents.is_empty() {
                let deltas: Vec<Vec3> = frame
                    .delta_tangents
                    .iter()
                    .map(|d| convert_direction(*d))
                    .collect();
                let accessor =
                    self.export_vec3_accessor(&deltas, false, Some(BufferViewTarget::ArrayBuffer));
                target.insert(semantic::TANGENT.to_string(), accessor);
            }

            if !target.is_empty() {
                out.targets.push(target);
                out.names.push(shape.name.clone());
            }
        }

        self.blend_shape_cache.insert(mesh_index, out.clone());
        out
    }

    /// Lights collect into the root KHR_lights_punctual payload; intensity is
    /// multiplied by pi and spot angles are halved and converted to radians
    pub(crate) fn export_light(&mut self, index: usize) -> Option<LightId> {
        if let Some(&id) = self.light_ids.get(&index) {
            return Some(id);
        }
        let Some(light_src) = self.source.lights.get(index) else {
            warn!(light = index, "light index out of range, skipping");
            return None;
        };

        let (light_type, spot) = match &light_src.kind {
            LightKind::Directional => (LightType::Directional, None),
            LightKind::Point => (LightType::Point, None),
            LightKind::Spot {
                inner_angle,
                outer_angle,
            } => (
                LightType::Spot,
                Some(SpotLight {
                    inner_cone_angle: inner_angle * DEG_TO_RAD / 2.0,
                    outer_cone_angle: outer_angle * DEG_TO_RAD / 2.0,
                }),
            ),
        };

        let id = LightId(self.lights.len());
        self.lights.push(PunctualLight {
            name: self.name_of(&light_src.name),
            light_type,
            color: light_src.color.to_rgb_array(),
            intensity: light_src.intensity * std::f32::consts::PI,
            range: (light_src.range > 0.0).then_some(light_src.range),
            spot,
        });
        self.light_ids.insert(index, id);
        self.root.declare_extension(KhrLightsPunctual::NAME, false);
        Some(id)
    }

    pub(crate) fn export_camera(&mut self, index: usize) -> Option<CameraId> {
        if let Some(&id) = self.camera_ids.get(&index) {
            return Some(id);
        }
        let Some(camera_src) = self.source.cameras.get(index) else {
            warn!(camera = index, "camera index out of range, skipping");
            return None;
        };

        let camera = match &camera_src.projection {
            CameraProjection::Perspective { yfov, znear, zfar } => Camera {
                name: self.name_of(&camera_src.name),
                camera_type: CameraType::Perspective,
                perspective: Some(CameraPerspective {
                    yfov: yfov * DEG_TO_RAD,
                    znear: *znear,
                    zfar: *zfar,
                    aspect_ratio: None,
                }),
                orthographic: None,
            },
            CameraProjection::Orthographic { size, znear, zfar } => Camera {
                name: self.name_of(&camera_src.name),
                camera_type: CameraType::Orthographic,
                perspective: None,
                orthographic: Some(CameraOrthographic {
                    xmag: *size,
                    ymag: *size,
                    znear: *znear,
                    zfar: *zfar,
                }),
            },
        };

        let id = CameraId(self.root.cameras.len());
        self.root.cameras.push(camera);
        self.camera_ids.insert(index, id);
        Some(id)
    }
}

fn draw_mode(topology: Topology) -> DrawMode {
    match topology {
        Topology::Points => DrawMode::Points,
        Topology::Lines => DrawMode::Lines,
        Topology::LineStrip => DrawMode::LineStrip,
        Topology::Triangles => DrawMode::Triangles,
    }
}
