//! Exporter integration tests
//!
//! Covers accessor layout invariants, resource deduplication, and the
//! animation pointer subsystem, including the channel decomposition rules.

use gltfforge_core::{
    AnimationClip, AnimationTarget, CameraProjection, CameraSource, ChannelValues, ClipChannel,
    ClipInterpolation, Color, LightKind, LightSource, MaterialSource, MeshInstance, MeshSource,
    NodeSource, SceneSource, SubMesh, TextureRef, TextureSource, Vec2, Vec3, Vec4,
};
use gltfforge_export::{ExportOptions, ExportedDocument, GltfExporter};
use gltfforge_schema::extensions::{
    KhrAnimationPointer, KhrMaterialsEmissiveStrength, KhrTextureTransform,
};
use gltfforge_schema::{AccessorId, TargetPath};

fn quad_mesh() -> MeshSource {
    let mut mesh = MeshSource::new("quad");
    mesh.positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    mesh.normals = vec![Vec3::new(0.0, 0.0, 1.0); 4];
    mesh.uv0 = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
    ];
    mesh.submeshes = vec![SubMesh::triangles(vec![0, 1, 2, 1, 3, 2])];
    mesh
}

fn scene_with_mesh() -> SceneSource {
    let mut scene = SceneSource::new("test");
    scene.meshes.push(quad_mesh());
    scene.materials.push(MaterialSource::new("mat"));
    let node = NodeSource::new("quad").with_mesh(MeshInstance::new(0, vec![Some(0)]));
    scene.add_root(node);
    scene
}

fn export(scene: &SceneSource) -> ExportedDocument {
    GltfExporter::new(scene, ExportOptions::default())
        .export()
        .expect("export failed")
}

/// Read an f32 accessor's components back out of the binary buffer
fn accessor_f32s(doc: &ExportedDocument, accessor: AccessorId) -> Vec<f32> {
    let acc = &doc.root.accessors[accessor.index()];
    let view = &doc.root.buffer_views[acc.buffer_view.expect("dense accessor").index()];
    let start = view.byte_offset + acc.byte_offset;
    let components = acc.accessor_type.component_count();
    (0..acc.count * components)
        .map(|i| {
            let offset = start + i * 4;
            f32::from_le_bytes(doc.binary[offset..offset + 4].try_into().unwrap())
        })
        .collect()
}

fn pointer_of(doc: &ExportedDocument, animation: usize, channel: usize) -> String {
    doc.root.animations[animation].channels[channel]
        .target
        .extensions
        .get_as::<KhrAnimationPointer>(KhrAnimationPointer::NAME)
        .expect("channel carries no pointer")
        .pointer
        .clone()
}

/// `/nodes/{i}/...`, `/materials/{i}/...`, `/cameras/{i}/...`, or
/// `/extensions/KHR_lights_punctual/lights/{i}/...` with a concrete index
fn is_absolute_pointer(path: &str) -> bool {
    let rest = for_prefix(path);
    let Some(rest) = rest else { return false };
    let mut parts = rest.splitn(2, '/');
    let index = parts.next().unwrap_or("");
    let tail = parts.next().unwrap_or("");
    !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) && !tail.is_empty()
}

fn for_prefix(path: &str) -> Option<&str> {
    for prefix in [
        "/nodes/",
        "/materials/",
        "/cameras/",
        "/extensions/KHR_lights_punctual/lights/",
    ] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return Some(rest);
        }
    }
    None
}

#[test]
fn accessor_invariants_hold_for_every_exported_accessor() {
    let mut scene = scene_with_mesh();
    // second mesh with enough vertices to force u32 index narrowing paths
    let mut big = quad_mesh();
    big.name = "big".to_string();
    scene.meshes.push(big);
    scene
        .nodes
        .push(NodeSource::new("second").with_mesh(MeshInstance::new(1, vec![Some(0)])));
    let second = scene.nodes.len() - 1;
    scene.roots.push(second);

    let doc = export(&scene);
    assert!(!doc.root.accessors.is_empty());

    for accessor in &doc.root.accessors {
        let Some(view_id) = accessor.buffer_view else {
            continue;
        };
        let view = &doc.root.buffer_views[view_id.index()];
        let component_size = accessor.component_type.size();
        assert_eq!(
            (view.byte_offset + accessor.byte_offset) % component_size,
            0,
            "accessor misaligned"
        );
        assert!(
            accessor.byte_offset + accessor.count * accessor.element_size() <= view.byte_length,
            "accessor exceeds its buffer view"
        );
        assert!(view.byte_offset + view.byte_length <= doc.binary.len());
    }
}

#[test]
fn same_mesh_and_materials_from_two_nodes_dedups_to_one_mesh() {
    let mut scene = scene_with_mesh();
    let node = NodeSource::new("copy").with_mesh(MeshInstance::new(0, vec![Some(0)]));
    let index = scene.add_node(node);
    scene.roots.push(index);

    let doc = export(&scene);
    assert_eq!(doc.root.meshes.len(), 1, "dedup failed");
    assert_eq!(doc.root.nodes.len(), 2);
    let referenced: Vec<_> = doc.root.nodes.iter().filter_map(|n| n.mesh).collect();
    assert_eq!(referenced.len(), 2);
    assert_eq!(referenced[0], referenced[1]);
}

#[test]
fn different_material_set_exports_a_second_mesh() {
    let mut scene = scene_with_mesh();
    scene.materials.push(MaterialSource::new("other"));
    let node = NodeSource::new("variant").with_mesh(MeshInstance::new(0, vec![Some(1)]));
    let index = scene.add_node(node);
    scene.roots.push(index);

    let doc = export(&scene);
    assert_eq!(doc.root.meshes.len(), 2);
}

#[test]
fn animated_light_intensity_exports_pi_scaled_pointer_channel() {
    let mut scene = SceneSource::new("lit");
    scene.lights.push(LightSource {
        name: "sun".to_string(),
        kind: LightKind::Point,
        color: Color::WHITE,
        intensity: 1.0,
        range: 0.0,
    });
    let mut node = NodeSource::new("light");
    node.light = Some(0);
    scene.add_root(node);
    scene.animations.push(AnimationClip {
        name: "pulse".to_string(),
        channels: vec![ClipChannel {
            target: AnimationTarget::Light(0),
            property: "m_Intensity".to_string(),
            times: vec![0.0, 1.0],
            values: ChannelValues::Float(vec![0.0, 2.0]),
            interpolation: ClipInterpolation::Linear,
        }],
    });

    let doc = export(&scene);
    assert_eq!(doc.root.animations.len(), 1);
    let animation = &doc.root.animations[0];
    assert_eq!(animation.channels.len(), 1);

    assert_eq!(
        pointer_of(&doc, 0, 0),
        "/extensions/KHR_lights_punctual/lights/0/intensity"
    );

    let output = animation.samplers[animation.channels[0].sampler].output;
    let values = accessor_f32s(&doc, output);
    assert_eq!(values.len(), 2);
    assert!((values[0] - 0.0).abs() < 1e-6);
    assert!((values[1] - 2.0 * std::f32::consts::PI).abs() < 1e-4);
}

#[test]
fn ldr_emissive_animation_drops_strength_channel_and_extension() {
    let mut scene = scene_with_mesh();
    scene.animations.push(AnimationClip {
        name: "glow".to_string(),
        channels: vec![ClipChannel {
            target: AnimationTarget::Material(0),
            property: "_EmissionColor".to_string(),
            times: vec![0.0, 1.0],
            values: ChannelValues::Color(vec![Color::BLACK, Color::rgb(1.0, 0.5, 0.25)]),
            interpolation: ClipInterpolation::Linear,
        }],
    });

    let doc = export(&scene);
    let animation = &doc.root.animations[0];
    assert_eq!(animation.channels.len(), 1, "strength channel must be dropped");
    assert!(
        !doc.root
            .extensions_used
            .iter()
            .any(|n| n == KhrMaterialsEmissiveStrength::NAME),
        "extension must not be declared when every sample is <= 1"
    );
    assert_eq!(pointer_of(&doc, 0, 0), "/materials/0/emissiveFactor");
}

#[test]
fn hdr_emissive_animation_splits_into_color_and_strength_channels() {
    let mut scene = scene_with_mesh();
    scene.animations.push(AnimationClip {
        name: "glow".to_string(),
        channels: vec![ClipChannel {
            target: AnimationTarget::Material(0),
            property: "_EmissionColor".to_string(),
            times: vec![0.0, 1.0],
            values: ChannelValues::Color(vec![Color::BLACK, Color::rgb(4.0, 2.0, 0.0)]),
            interpolation: ClipInterpolation::Linear,
        }],
    });

    let doc = export(&scene);
    let animation = &doc.root.animations[0];
    assert_eq!(animation.channels.len(), 2);
    assert!(doc
        .root
        .extensions_used
        .iter()
        .any(|n| n == KhrMaterialsEmissiveStrength::NAME));

    assert_eq!(pointer_of(&doc, 0, 0), "/materials/0/emissiveFactor");
    assert_eq!(
        pointer_of(&doc, 0, 1),
        format!(
            "/materials/0/extensions/{}/emissiveStrength",
            KhrMaterialsEmissiveStrength::NAME
        )
    );

    // color channel is clamped, strength carries the excess
    let color_output = animation.samplers[animation.channels[0].sampler].output;
    let colors = accessor_f32s(&doc, color_output);
    assert!(colors.iter().all(|v| *v <= 1.0));
    let strength_output = animation.samplers[animation.channels[1].sampler].output;
    let strengths = accessor_f32s(&doc, strength_output);
    assert!((strengths[1] - 4.0).abs() < 1e-6);

    // the material itself now carries a static strength payload
    assert!(doc.root.materials[0]
        .extensions
        .contains(KhrMaterialsEmissiveStrength::NAME));
}

#[test]
fn texture_st_animation_splits_into_scale_and_offset_channels() {
    let mut scene = scene_with_mesh();
    scene
        .textures
        .push(TextureSource::rgba8("pixel", 1, 1, vec![255, 0, 0, 255]));
    scene.materials[0].base_color_texture = Some(TextureRef::new(0));
    scene.animations.push(AnimationClip {
        name: "scroll".to_string(),
        channels: vec![ClipChannel {
            target: AnimationTarget::Material(0),
            property: "_MainTex_ST".to_string(),
            times: vec![0.0, 1.0],
            values: ChannelValues::Vec4(vec![
                Vec4::new(1.0, 1.0, 0.0, 0.0),
                Vec4::new(2.0, 2.0, 0.5, 0.5),
            ]),
            interpolation: ClipInterpolation::Linear,
        }],
    });

    let doc = export(&scene);
    let animation = &doc.root.animations[0];
    assert_eq!(animation.channels.len(), 2);

    let scale_path = pointer_of(&doc, 0, 0);
    let offset_path = pointer_of(&doc, 0, 1);
    assert!(scale_path.ends_with("/scale"), "{scale_path}");
    assert!(offset_path.ends_with("/offset"), "{offset_path}");
    assert!(scale_path.contains(KhrTextureTransform::NAME));
    assert!(doc
        .root
        .extensions_used
        .iter()
        .any(|n| n == KhrTextureTransform::NAME));

    // both channels share one time accessor
    let a = &animation.samplers[animation.channels[0].sampler];
    let b = &animation.samplers[animation.channels[1].sampler];
    assert_eq!(a.input, b.input);
}

#[test]
fn texture_st_animation_without_texture_is_dropped() {
    let mut scene = scene_with_mesh();
    scene.animations.push(AnimationClip {
        name: "scroll".to_string(),
        channels: vec![ClipChannel {
            target: AnimationTarget::Material(0),
            property: "_MainTex_ST".to_string(),
            times: vec![0.0, 1.0],
            values: ChannelValues::Vec4(vec![Vec4::ZERO, Vec4::ONE]),
            interpolation: ClipInterpolation::Linear,
        }],
    });

    let doc = export(&scene);
    assert!(doc.root.animations.is_empty());
}

#[test]
fn orthographic_size_drives_both_magnifications_from_one_sampler() {
    let mut scene = SceneSource::new("cams");
    scene.cameras.push(CameraSource {
        name: "ortho".to_string(),
        projection: CameraProjection::Orthographic {
            size: 5.0,
            znear: 0.1,
            zfar: 100.0,
        },
    });
    let mut node = NodeSource::new("camera");
    node.camera = Some(0);
    scene.add_root(node);
    scene.animations.push(AnimationClip {
        name: "zoom".to_string(),
        channels: vec![ClipChannel {
            target: AnimationTarget::Camera(0),
            property: "orthographic size".to_string(),
            times: vec![0.0, 1.0],
            values: ChannelValues::Float(vec![5.0, 10.0]),
            interpolation: ClipInterpolation::Linear,
        }],
    });

    let doc = export(&scene);
    let animation = &doc.root.animations[0];
    assert_eq!(animation.channels.len(), 2);
    assert_eq!(pointer_of(&doc, 0, 0), "/cameras/0/orthographic/ymag");
    assert_eq!(pointer_of(&doc, 0, 1), "/cameras/0/orthographic/xmag");

    let a = &animation.samplers[animation.channels[0].sampler];
    let b = &animation.samplers[animation.channels[1].sampler];
    assert_eq!(a.output, b.output);
}

#[test]
fn every_resolved_pointer_is_absolute() {
    let mut scene = scene_with_mesh();
    scene.lights.push(LightSource {
        name: "lamp".to_string(),
        kind: LightKind::Spot {
            inner_angle: 20.0,
            outer_angle: 40.0,
        },
        color: Color::WHITE,
        intensity: 2.0,
        range: 10.0,
    });
    scene.nodes[0].light = Some(0);
    scene.animations.push(AnimationClip {
        name: "mixed".to_string(),
        channels: vec![
            ClipChannel {
                target: AnimationTarget::Material(0),
                property: "_Metallic".to_string(),
                times: vec![0.0, 1.0],
                values: ChannelValues::Float(vec![0.0, 1.0]),
                interpolation: ClipInterpolation::Linear,
            },
            ClipChannel {
                target: AnimationTarget::Light(0),
                property: "m_SpotAngle".to_string(),
                times: vec![0.0, 1.0],
                values: ChannelValues::Float(vec![40.0, 60.0]),
                interpolation: ClipInterpolation::Linear,
            },
        ],
    });

    let doc = export(&scene);
    let mut pointer_channels = 0;
    for (ai, animation) in doc.root.animations.iter().enumerate() {
        for (ci, channel) in animation.channels.iter().enumerate() {
            if channel.target.path == TargetPath::Pointer {
                let path = pointer_of(&doc, ai, ci);
                assert!(is_absolute_pointer(&path), "unresolved pointer: {path}");
                pointer_channels += 1;
            }
        }
    }
    assert!(pointer_channels >= 2);
}

#[test]
fn glossiness_animation_flips_into_roughness() {
    let mut scene = scene_with_mesh();
    scene.animations.push(AnimationClip {
        name: "wear".to_string(),
        channels: vec![ClipChannel {
            target: AnimationTarget::Material(0),
            property: "_Glossiness".to_string(),
            times: vec![0.0, 1.0],
            values: ChannelValues::Float(vec![0.25, 1.0]),
            interpolation: ClipInterpolation::Linear,
        }],
    });

    let doc = export(&scene);
    assert_eq!(
        pointer_of(&doc, 0, 0),
        "/materials/0/pbrMetallicRoughness/roughnessFactor"
    );
    let animation = &doc.root.animations[0];
    let output = animation.samplers[animation.channels[0].sampler].output;
    let values = accessor_f32s(&doc, output);
    assert!((values[0] - 0.75).abs() < 1e-6);
    assert!((values[1] - 0.0).abs() < 1e-6);
}

#[test]
fn sparse_morph_targets_omit_base_storage() {
    let mut scene = scene_with_mesh();
    let mesh = &mut scene.meshes[0];
    mesh.blend_shapes.push(gltfforge_core::BlendShape {
        name: "bulge".to_string(),
        frames: vec![gltfforge_core::BlendShapeFrame {
            weight: 100.0,
            delta_positions: vec![
                Vec3::ZERO,
                Vec3::new(0.0, 0.5, 0.0),
                Vec3::ZERO,
                Vec3::ZERO,
            ],
            delta_normals: Vec::new(),
            delta_tangents: Vec::new(),
        }],
    });

    let options = ExportOptions {
        blend_shape_sparse_accessors: true,
        ..Default::default()
    };
    let doc = GltfExporter::new(&scene, options).export().unwrap();

    let primitive = &doc.root.meshes[0].primitives[0];
    let targets = primitive.targets.as_ref().expect("morph targets missing");
    assert_eq!(targets.len(), 1);
    let accessor_id = targets[0]["POSITION"];
    let accessor = &doc.root.accessors[accessor_id.index()];
    assert!(accessor.buffer_view.is_none(), "base storage must be omitted");
    let sparse = accessor.sparse.as_ref().expect("sparse encoding missing");
    assert_eq!(accessor.count, 4);
    assert_eq!(sparse.count, 1);
}

#[test]
fn blend_shapes_use_final_frame_and_record_names() {
    let mut scene = scene_with_mesh();
    let mesh = &mut scene.meshes[0];
    mesh.blend_shapes.push(gltfforge_core::BlendShape {
        name: "open".to_string(),
        frames: vec![
            gltfforge_core::BlendShapeFrame {
                weight: 50.0,
                delta_positions: vec![Vec3::new(0.0, 0.1, 0.0); 4],
                delta_normals: Vec::new(),
                delta_tangents: Vec::new(),
            },
            gltfforge_core::BlendShapeFrame {
                weight: 100.0,
                delta_positions: vec![Vec3::new(0.0, 0.9, 0.0); 4],
                delta_normals: Vec::new(),
                delta_tangents: Vec::new(),
            },
        ],
    });
    scene.nodes[0].mesh.as_mut().unwrap().blend_weights = vec![25.0];

    let doc = export(&scene);
    let mesh = &doc.root.meshes[0];
    assert_eq!(mesh.weights.as_deref(), Some(&[0.25][..]));
    let extras = mesh.extras.as_ref().unwrap();
    assert_eq!(extras["targetNames"][0], "open");

    let targets = doc.root.meshes[0].primitives[0].targets.as_ref().unwrap();
    let accessor_id = targets[0]["POSITION"];
    let deltas = accessor_f32s(&doc, accessor_id);
    // final frame delta y = 0.9, x negated by the coordinate conversion
    assert!((deltas[1] - 0.9).abs() < 1e-6);
}

#[test]
fn triangle_winding_flips_on_export() {
    let scene = scene_with_mesh();
    let doc = export(&scene);
    let primitive = &doc.root.meshes[0].primitives[0];
    let indices_id = primitive.indices.unwrap();
    let accessor = &doc.root.accessors[indices_id.index()];
    let view = &doc.root.buffer_views[accessor.buffer_view.unwrap().index()];
    let start = view.byte_offset;
    let indices: Vec<u16> = (0..accessor.count)
        .map(|i| u16::from_le_bytes(doc.binary[start + i * 2..start + i * 2 + 2].try_into().unwrap()))
        .collect();
    assert_eq!(indices, vec![0, 2, 1, 1, 2, 3]);
}
