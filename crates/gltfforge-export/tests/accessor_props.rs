//! Property tests for the binary buffer writer
//!
//! Mixing 2-byte index accessors with 4-byte float accessors across meshes
//! of arbitrary sizes must never produce a misaligned or out-of-bounds
//! accessor.

use proptest::prelude::*;

use gltfforge_core::{
    MaterialSource, MeshInstance, MeshSource, NodeSource, SceneSource, SubMesh, Vec2, Vec3,
};
use gltfforge_export::{ExportOptions, GltfExporter};

fn scene_from_sizes(sizes: &[usize]) -> SceneSource {
    let mut scene = SceneSource::new("prop");
    scene.materials.push(MaterialSource::new("mat"));
    for (index, &n) in sizes.iter().enumerate() {
        let mut mesh = MeshSource::new(format!("mesh{index}"));
        for i in 0..n {
            let f = i as f32;
            mesh.positions.push(Vec3::new(f, f * 0.5, -f));
            mesh.uv0.push(Vec2::new(f / n as f32, 0.25));
        }
        let indices: Vec<u32> = (0..n as u32)
            .flat_map(|i| [i, (i + 1) % n as u32, (i + 2) % n as u32])
            .collect();
        mesh.submeshes = vec![SubMesh::triangles(indices)];
        scene.meshes.push(mesh);
        let node = NodeSource::new(format!("node{index}"))
            .with_mesh(MeshInstance::new(index, vec![Some(0)]));
        scene.add_root(node);
    }
    scene
}

proptest! {
    #[test]
    fn exported_accessors_stay_aligned_and_bounded(
        sizes in prop::collection::vec(1usize..48, 1..6)
    ) {
        let scene = scene_from_sizes(&sizes);
        let doc = GltfExporter::new(&scene, ExportOptions::default())
            .export()
            .expect("export failed");

        for accessor in &doc.root.accessors {
            let Some(view_id) = accessor.buffer_view else { continue };
            let view = &doc.root.buffer_views[view_id.index()];
            let component_size = accessor.component_type.size();

            prop_assert_eq!(accessor.byte_offset % component_size, 0);
            prop_assert_eq!((view.byte_offset + accessor.byte_offset) % component_size, 0);
            prop_assert!(
                accessor.byte_offset + accessor.count * accessor.element_size()
                    <= view.byte_length
            );
            prop_assert!(view.byte_offset + view.byte_length <= doc.binary.len());
        }
    }
}
