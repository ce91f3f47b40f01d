//! Importer integration tests
//!
//! Documents are assembled programmatically and fed through
//! `import_document` with their binary payload standing in for a GLB chunk.

use std::collections::BTreeMap;

use gltfforge_core::{AlphaSource, Topology, Workflow};
use gltfforge_import::{
    GltfImporter, ImportError, ImportOptions, MaterialKind, NullLoader, ShaderTable,
};
use gltfforge_schema::extensions::{KhrMaterialsEmissiveStrength, KhrMaterialsIor};
use gltfforge_schema::{
    Accessor, AccessorId, AccessorType, AlphaMode, Buffer, BufferId, BufferView, BufferViewId,
    ComponentType, GltfRoot, Material, MaterialId, Mesh, MeshId, MeshPrimitive, Node, NodeId,
    Scene, SceneId,
};

fn importer() -> GltfImporter {
    GltfImporter::new(Box::new(NullLoader), ImportOptions::default()).unwrap()
}

/// A document with one triangle mesh on node 1 and an empty node 0
fn two_node_doc() -> (GltfRoot, Vec<u8>) {
    let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let mut bin = Vec::new();
    for p in &positions {
        for c in p {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }

    let mut root = GltfRoot::default();
    root.buffers.push(Buffer {
        uri: None,
        byte_length: bin.len(),
        name: None,
    });
    root.buffer_views.push(BufferView {
        buffer: BufferId(0),
        byte_offset: 0,
        byte_length: bin.len(),
        byte_stride: None,
        target: None,
        name: None,
    });
    root.accessors.push(Accessor {
        buffer_view: Some(BufferViewId(0)),
        byte_offset: 0,
        component_type: ComponentType::Float,
        normalized: false,
        count: 3,
        accessor_type: AccessorType::Vec3,
        max: Some(vec![1.0, 1.0, 0.0]),
        min: Some(vec![0.0, 0.0, 0.0]),
        sparse: None,
        name: None,
    });

    let mut attributes = BTreeMap::new();
    attributes.insert("POSITION".to_string(), AccessorId(0));
    root.meshes.push(Mesh {
        name: Some("tri".to_string()),
        primitives: vec![MeshPrimitive {
            attributes,
            indices: None,
            material: Some(MaterialId(0)),
            ..Default::default()
        }],
        weights: None,
        extras: None,
    });
    root.materials.push(Material::new("mat"));

    root.nodes.push(Node {
        name: Some("empty".to_string()),
        ..Default::default()
    });
    root.nodes.push(Node {
        name: Some("geo".to_string()),
        mesh: Some(MeshId(0)),
        ..Default::default()
    });
    root.scenes.push(Scene {
        name: Some("main".to_string()),
        nodes: vec![NodeId(0), NodeId(1)],
    });
    root.scene = Some(SceneId(0));

    (root, bin)
}

#[test]
fn two_node_scene_builds_two_nodes_with_one_cached_material() {
    let (root, bin) = two_node_doc();
    let scene = importer().import_document(root, Some(bin)).unwrap();

    assert_eq!(scene.nodes.len(), 2);
    assert_eq!(scene.roots, vec![0, 1]);
    assert!(scene.nodes[0].mesh.is_none());

    let instance = scene.nodes[1].mesh.as_ref().expect("node 1 has a mesh");
    assert_eq!(instance.materials, vec![Some(0)]);
    assert_eq!(scene.materials.len(), 1);
    assert_eq!(scene.materials[0].shader.as_deref(), Some("Standard"));

    let mesh = &scene.meshes[instance.mesh];
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.submeshes.len(), 1);
    assert_eq!(mesh.submeshes[0].topology, Topology::Triangles);
    // generated sequential indices, winding flipped at the import boundary
    assert_eq!(mesh.submeshes[0].indices, vec![0, 2, 1]);
    // X negated by the coordinate conversion
    assert!((mesh.positions[1].x - (-1.0)).abs() < 1e-6);
}

#[test]
fn missing_default_scene_is_fatal() {
    let (mut root, bin) = two_node_doc();
    root.scene = None;
    let err = importer().import_document(root, Some(bin)).unwrap_err();
    assert!(matches!(err, ImportError::Document(_)), "{err}");
}

#[test]
fn explicit_scene_index_overrides_missing_default() {
    let (mut root, bin) = two_node_doc();
    root.scene = None;
    let options = ImportOptions {
        scene_index: Some(0),
        ..Default::default()
    };
    let importer = GltfImporter::new(Box::new(NullLoader), options).unwrap();
    assert!(importer.import_document(root, Some(bin)).is_ok());
}

#[test]
fn node_cycle_is_fatal() {
    let (mut root, bin) = two_node_doc();
    root.nodes[0].children = vec![NodeId(1)];
    root.nodes[1].children = vec![NodeId(0)];
    root.scenes[0].nodes = vec![NodeId(0)];

    let err = importer().import_document(root, Some(bin)).unwrap_err();
    assert!(matches!(err, ImportError::NodeCycle { .. }), "{err}");
}

#[test]
fn shared_mesh_across_nodes_builds_once() {
    let (mut root, bin) = two_node_doc();
    root.nodes[0].mesh = Some(MeshId(0));

    let scene = importer().import_document(root, Some(bin)).unwrap();
    assert_eq!(scene.meshes.len(), 1);
    let a = scene.nodes[0].mesh.as_ref().unwrap().mesh;
    let b = scene.nodes[1].mesh.as_ref().unwrap().mesh;
    assert_eq!(a, b);
}

#[test]
fn materials_cache_uniformly_including_index_zero_and_default() {
    let (mut root, bin) = two_node_doc();
    // three primitives: two with material 0, one with none
    let primitive = root.meshes[0].primitives[0].clone();
    let mut second = primitive.clone();
    second.material = Some(MaterialId(0));
    let mut third = primitive.clone();
    third.material = None;
    root.meshes[0].primitives = vec![primitive, second, third];

    let scene = importer().import_document(root, Some(bin)).unwrap();
    let instance = scene.nodes[1].mesh.as_ref().unwrap();
    // material 0 cached once, default material cached once under None
    assert_eq!(scene.materials.len(), 2);
    assert_eq!(instance.materials[0], instance.materials[1]);
    assert_ne!(instance.materials[0], instance.materials[2]);
    assert_eq!(scene.materials[1].name, "Default");
}

#[test]
fn normalized_color_accessor_rescales() {
    let (mut root, mut bin) = two_node_doc();
    let offset = bin.len();
    // three RGBA u8 colors
    bin.extend_from_slice(&[255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 127]);
    root.buffer_views.push(BufferView {
        buffer: BufferId(0),
        byte_offset: offset,
        byte_length: 12,
        byte_stride: None,
        target: None,
        name: None,
    });
    root.buffers[0].byte_length = bin.len();
    root.accessors.push(Accessor {
        buffer_view: Some(BufferViewId(1)),
        byte_offset: 0,
        component_type: ComponentType::UnsignedByte,
        normalized: true,
        count: 3,
        accessor_type: AccessorType::Vec4,
        max: None,
        min: None,
        sparse: None,
        name: None,
    });
    root.meshes[0].primitives[0]
        .attributes
        .insert("COLOR_0".to_string(), AccessorId(1));

    let scene = importer().import_document(root, Some(bin)).unwrap();
    let mesh = &scene.meshes[0];
    assert_eq!(mesh.colors.len(), 3);
    assert!((mesh.colors[0].r - 1.0).abs() < 1e-3);
    assert!((mesh.colors[2].a - 127.0 / 255.0).abs() < 1e-3);
}

#[test]
fn material_extensions_lower_into_scene_material() {
    let (mut root, bin) = two_node_doc();
    let material = &mut root.materials[0];
    material.emissive_factor = [1.0, 0.5, 0.0];
    material.alpha_mode = AlphaMode::Mask;
    material.alpha_cutoff = 0.25;
    material
        .extensions
        .insert(Box::new(KhrMaterialsEmissiveStrength {
            emissive_strength: 3.0,
        }));
    material.extensions.insert(Box::new(KhrMaterialsIor { ior: 1.33 }));

    let scene = importer().import_document(root, Some(bin)).unwrap();
    let mat = &scene.materials[0];
    // emissive strength folds back into the HDR color
    assert!((mat.emissive.r - 3.0).abs() < 1e-6);
    assert!((mat.emissive.g - 1.5).abs() < 1e-6);
    assert_eq!(mat.ior, Some(1.33));
    assert!(matches!(mat.alpha, AlphaSource::Mask { cutoff } if (cutoff - 0.25).abs() < 1e-6));
    assert!(matches!(mat.workflow, Workflow::MetallicRoughness { .. }));
}

#[test]
fn empty_shader_table_fails_at_session_start() {
    let options = ImportOptions {
        shader_table: ShaderTable::new(),
        ..Default::default()
    };
    let err = GltfImporter::new(Box::new(NullLoader), options).unwrap_err();
    assert!(matches!(
        err,
        ImportError::MissingShaderEntry(MaterialKind::PbrMetallicRoughness)
    ));
}

#[test]
fn accessor_bounds_violation_skips_primitive() {
    let (mut root, bin) = two_node_doc();
    // accessor claims more elements than the view holds
    root.accessors[0].count = 10;

    let scene = importer().import_document(root, Some(bin)).unwrap();
    // the unreadable primitive is skipped; node 1 ends up without a mesh
    assert!(scene.nodes[1].mesh.is_none());
}

#[test]
fn multithreaded_prebuild_matches_lazy_path() {
    let (root, bin) = two_node_doc();
    let lazy = importer().import_document(root.clone(), Some(bin.clone())).unwrap();

    let options = ImportOptions {
        multithreaded: true,
        ..Default::default()
    };
    let importer = GltfImporter::new(Box::new(NullLoader), options).unwrap();
    let parallel = importer.import_document(root, Some(bin)).unwrap();

    assert_eq!(lazy.meshes.len(), parallel.meshes.len());
    assert_eq!(
        lazy.meshes[0].positions.len(),
        parallel.meshes[0].positions.len()
    );
    assert_eq!(lazy.meshes[0].submeshes[0].indices, parallel.meshes[0].submeshes[0].indices);
}
