//! Export → import round-trip tests
//!
//! The coordinate conversion is applied on the way out and undone on the way
//! in, so geometry must survive a full cycle within float32 tolerance.

use gltfforge_core::{
    BlendShape, BlendShapeFrame, Color, LightKind, LightSource, MaterialSource, MeshInstance,
    MeshSource, NodeSource, Quat, SceneSource, SubMesh, Vec2, Vec3,
};
use gltfforge_export::{ExportOptions, GltfExporter};
use gltfforge_import::{GltfImporter, ImportOptions, NullLoader};

fn cube_mesh() -> MeshSource {
    let mut mesh = MeshSource::new("cube");
    for z in [-0.5f32, 0.5] {
        for y in [-0.5f32, 0.5] {
            for x in [-0.5f32, 0.5] {
                mesh.positions.push(Vec3::new(x, y, z));
                mesh.normals.push(Vec3::new(x, y, z).normalize());
                mesh.uv0.push(Vec2::new(x + 0.5, y + 0.5));
            }
        }
    }
    // 12 triangles over the 8 corners
    let indices: Vec<u32> = vec![
        0, 1, 2, 1, 3, 2, // back
        4, 6, 5, 5, 6, 7, // front
        0, 4, 1, 1, 4, 5, // bottom
        2, 3, 6, 3, 7, 6, // top
        0, 2, 4, 2, 6, 4, // left
        1, 5, 3, 3, 5, 7, // right
    ];
    mesh.submeshes = vec![SubMesh::triangles(indices)];
    mesh.blend_shapes.push(BlendShape {
        name: "inflate".to_string(),
        frames: vec![BlendShapeFrame {
            weight: 100.0,
            delta_positions: (0..8).map(|i| Vec3::new(0.0, 0.1 * i as f32, 0.0)).collect(),
            delta_normals: Vec::new(),
            delta_tangents: Vec::new(),
        }],
    });
    mesh
}

fn cube_scene() -> SceneSource {
    let mut scene = SceneSource::new("roundtrip");
    scene.meshes.push(cube_mesh());
    scene.materials.push(MaterialSource::new("cube-mat"));

    let mut node = NodeSource::new("cube").with_mesh(MeshInstance::new(0, vec![Some(0)]));
    node.translation = Vec3::new(1.0, 2.0, 3.0);
    node.rotation = Quat::new(0.0, 0.7071, 0.0, 0.7071);
    scene.add_root(node);
    scene
}

fn roundtrip(scene: &SceneSource, multithreaded: bool) -> SceneSource {
    let exported = GltfExporter::new(scene, ExportOptions::default())
        .export()
        .expect("export failed");
    let glb = exported.to_glb_bytes().expect("glb serialization failed");

    let options = ImportOptions {
        multithreaded,
        ..Default::default()
    };
    GltfImporter::new(Box::new(NullLoader), options)
        .expect("importer construction failed")
        .import_slice(&glb)
        .expect("import failed")
}

#[test]
fn mesh_survives_roundtrip() {
    let scene = cube_scene();
    let back = roundtrip(&scene, false);

    assert_eq!(back.nodes.len(), 1);
    let instance = back.nodes[0].mesh.as_ref().expect("mesh lost in roundtrip");
    let original = &scene.meshes[0];
    let imported = &back.meshes[instance.mesh];

    assert_eq!(imported.vertex_count(), original.vertex_count());
    assert_eq!(imported.triangle_count(), original.triangle_count());
    assert_eq!(imported.blend_shape_count(), original.blend_shape_count());

    for (a, b) in original.positions.iter().zip(&imported.positions) {
        assert!((a.x - b.x).abs() < 1e-6);
        assert!((a.y - b.y).abs() < 1e-6);
        assert!((a.z - b.z).abs() < 1e-6);
    }
    for (a, b) in original.uv0.iter().zip(&imported.uv0) {
        assert!((a.x - b.x).abs() < 1e-6);
        assert!((a.y - b.y).abs() < 1e-6);
    }

    // winding flips cancel: triangle index order is restored
    assert_eq!(
        imported.submeshes[0].indices,
        original.submeshes[0].indices
    );

    // blend shape deltas survive
    let original_frame = &original.blend_shapes[0].frames[0];
    let imported_frame = imported.blend_shapes[0].frames.last().unwrap();
    for (a, b) in original_frame
        .delta_positions
        .iter()
        .zip(&imported_frame.delta_positions)
    {
        assert!((a.y - b.y).abs() < 1e-6);
    }
}

#[test]
fn node_transform_survives_roundtrip() {
    let scene = cube_scene();
    let back = roundtrip(&scene, false);

    let original = &scene.nodes[0];
    let imported = &back.nodes[0];
    assert!((original.translation.x - imported.translation.x).abs() < 1e-6);
    assert!((original.translation.y - imported.translation.y).abs() < 1e-6);
    assert!((original.translation.z - imported.translation.z).abs() < 1e-6);
    assert!((original.rotation.y - imported.rotation.y).abs() < 1e-6);
}

#[test]
fn multithreaded_import_matches_sequential() {
    let scene = cube_scene();
    let sequential = roundtrip(&scene, false);
    let parallel = roundtrip(&scene, true);

    assert_eq!(
        sequential.meshes[0].positions.len(),
        parallel.meshes[0].positions.len()
    );
    for (a, b) in sequential.meshes[0]
        .positions
        .iter()
        .zip(&parallel.meshes[0].positions)
    {
        assert_eq!(a, b);
    }
}

#[test]
fn light_survives_roundtrip_with_pi_conversion() {
    let mut scene = SceneSource::new("lit");
    scene.lights.push(LightSource {
        name: "spot".to_string(),
        kind: LightKind::Spot {
            inner_angle: 30.0,
            outer_angle: 60.0,
        },
        color: Color::rgb(1.0, 0.9, 0.8),
        intensity: 2.5,
        range: 12.0,
    });
    let mut node = NodeSource::new("lamp");
    node.light = Some(0);
    scene.add_root(node);

    let back = roundtrip(&scene, false);
    assert_eq!(back.lights.len(), 1);
    let light = &back.lights[0];
    assert!((light.intensity - 2.5).abs() < 1e-5);
    assert!((light.range - 12.0).abs() < 1e-6);
    match &light.kind {
        LightKind::Spot {
            inner_angle,
            outer_angle,
        } => {
            assert!((inner_angle - 30.0).abs() < 1e-3);
            assert!((outer_angle - 60.0).abs() < 1e-3);
        }
        other => panic!("light kind changed: {other:?}"),
    }
}

#[test]
fn hdr_emissive_material_survives_roundtrip() {
    let mut scene = cube_scene();
    scene.materials[0].emissive = Color::rgb(3.0, 1.5, 0.0);

    let back = roundtrip(&scene, false);
    let material = &back.materials[0];
    assert!((material.emissive.r - 3.0).abs() < 1e-5);
    assert!((material.emissive.g - 1.5).abs() < 1e-5);
}
