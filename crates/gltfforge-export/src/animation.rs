//! Animation export and the KHR_animation_pointer subsystem
//!
//! Node TRS channels export as core glTF channels. Everything else becomes a
//! pointer channel: during the walk the property name is mapped through a
//! per-target-type dispatch table to a path fragment (sometimes splitting one
//! engine property into two glTF channels), and a second pass after the whole
//! graph is exported turns each fragment into an absolute `/nodes/{i}/...`,
//! `/materials/{i}/...`, `/cameras/{i}/...`, or
//! `/extensions/KHR_lights_punctual/lights/{i}/...` pointer.

use tracing::warn;

use gltfforge_core::{
    AnimationTarget, CameraProjection, ChannelValues, ClipChannel, ClipInterpolation, Color, Vec2,
};
use gltfforge_schema::extensions::{
    KhrAnimationPointer, KhrLightsPunctual, KhrMaterialsEmissiveStrength, KhrMaterialsIor,
    KhrMaterialsIridescence, KhrMaterialsSpecular, KhrMaterialsTransmission, KhrMaterialsVolume,
    KhrTextureTransform,
};
use gltfforge_schema::{
    AccessorId, Animation, AnimationChannel, AnimationChannelTarget, AnimationSampler, Extension,
    Interpolation, NodeId, TargetPath,
};

use gltfforge_core::convert::{convert_position, convert_rotation, DEG_TO_RAD};

use crate::materials::decompose_emission;
use crate::{ExportResult, GltfExporter};

/// Pluggable resolver for animation pointer targets outside the built-in
/// material/light/camera dispatch. Resolvers are tried in registration
/// order; the first to return `true` wins.
pub trait PointerResolver {
    fn try_resolve(&self, target: &AnimationTarget, path: &mut String) -> bool;
}

/// A pointer channel waiting for the second resolution pass
#[derive(Debug)]
pub(crate) struct PendingPointer {
    pub target: AnimationTarget,
    pub property: String,
    pub animation: usize,
    pub channel: usize,
}

/// How one registered property maps onto glTF channels
struct ChannelPlan {
    property: String,
    second_property: Option<String>,
    extension: Option<&'static str>,
    flip_value_range: bool,
    value_multiplier: Option<f32>,
    is_texture_transform: bool,
    keep_color_alpha: bool,
}

impl ChannelPlan {
    fn plain(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            second_property: None,
            extension: None,
            flip_value_range: false,
            value_multiplier: None,
            is_texture_transform: false,
            keep_color_alpha: true,
        }
    }

    fn with_extension(mut self, name: &'static str) -> Self {
        self.extension = Some(name);
        self
    }

    fn flipped(mut self) -> Self {
        self.flip_value_range = true;
        self
    }

    fn scaled(mut self, multiplier: f32) -> Self {
        self.value_multiplier = Some(multiplier);
        self
    }

    fn without_alpha(mut self) -> Self {
        self.keep_color_alpha = false;
        self
    }

    /// Texture tiling/offset split: one ST property becomes scale + offset
    /// sub-channels under KHR_texture_transform
    fn texture_transform(texture_path: &str) -> Self {
        let base = format!(
            "{texture_path}/extensions/{}",
            KhrTextureTransform::NAME
        );
        Self {
            property: format!("{base}/{}", KhrTextureTransform::SCALE),
            second_property: Some(format!("{base}/{}", KhrTextureTransform::OFFSET)),
            extension: Some(KhrTextureTransform::NAME),
            flip_value_range: false,
            value_multiplier: None,
            is_texture_transform: true,
            keep_color_alpha: true,
        }
    }
}

fn is_transform_property(property: &str) -> bool {
    matches!(property, "translation" | "rotation" | "scale" | "weights")
}

/// Engine light property names to KHR_lights_punctual paths. Intensity
/// picks up the pi multiplier, cone angles halve into radians, matching the
/// steady-state light export.
fn plan_light_channel(property: &str) -> ChannelPlan {
    let mut plan = match property {
        "m_Color" => ChannelPlan::plain("color"),
        "m_Intensity" => ChannelPlan::plain("intensity").scaled(std::f32::consts::PI),
        "m_SpotAngle" => ChannelPlan::plain("spot/outerConeAngle").scaled(DEG_TO_RAD / 2.0),
        "m_InnerSpotAngle" => ChannelPlan::plain("spot/innerConeAngle").scaled(DEG_TO_RAD / 2.0),
        "m_Range" => ChannelPlan::plain("range"),
        other => return ChannelPlan::plain(other),
    };
    plan.extension = Some(KhrLightsPunctual::NAME);
    plan
}

fn convert_interpolation(interpolation: ClipInterpolation) -> Interpolation {
    match interpolation {
        ClipInterpolation::Linear => Interpolation::Linear,
        ClipInterpolation::Step => Interpolation::Step,
        ClipInterpolation::CubicSpline => Interpolation::CubicSpline,
    }
}

impl GltfExporter<'_> {
    pub(crate) fn export_animations(&mut self) -> ExportResult<()> {
        let source = self.source;
        for clip in &source.animations {
            let animation_index = self.root.animations.len();
            let mut animation = Animation::new(clip.name.as_str());
            if !self.options.export_names {
                animation.name = None;
            }

            for channel in &clip.channels {
                match (&channel.target, channel.property.as_str()) {
                    (AnimationTarget::Node(node), property)
                        if is_transform_property(property) =>
                    {
                        self.export_core_node_channel(&mut animation, *node, channel);
                    }
                    _ => self.add_animation_data(&mut animation, animation_index, channel),
                }
            }

            if !animation.channels.is_empty() {
                self.root.animations.push(animation);
            }
        }
        Ok(())
    }

    /// Plain node TRS/weights channel; no pointer needed
    fn export_core_node_channel(
        &mut self,
        animation: &mut Animation,
        node: usize,
        channel: &ClipChannel,
    ) {
        let Some(&node_id) = self.node_ids.get(&node) else {
            warn!(node, property = %channel.property, "animated node was not exported, dropping channel");
            return;
        };
        if channel.times.is_empty() || channel.values.is_empty() {
            return;
        }

        let (path, output) = match (channel.property.as_str(), &channel.values) {
            ("translation", ChannelValues::Vec3(values)) => {
                let converted: Vec<_> = values.iter().map(|v| convert_position(*v)).collect();
                (
                    TargetPath::Translation,
                    self.export_vec3_accessor(&converted, false, None),
                )
            }
            ("rotation", ChannelValues::Quat(values)) => {
                let converted: Vec<_> = values.iter().map(|q| convert_rotation(*q)).collect();
                (TargetPath::Rotation, self.export_quat_accessor(&converted))
            }
            ("scale", ChannelValues::Vec3(values)) => {
                (TargetPath::Scale, self.export_vec3_accessor(values, false, None))
            }
            ("weights", ChannelValues::Float(values)) => {
                let scaled: Vec<f32> = values.iter().map(|w| w / 100.0).collect();
                (TargetPath::Weights, self.export_scalar_accessor(&scaled))
            }
            (property, _) => {
                warn!(node, property, "transform channel has mismatched value type, dropping");
                return;
            }
        };

        let input = self.export_time_accessor(&channel.times);
        let sampler = animation.samplers.len();
        animation.samplers.push(AnimationSampler {
            input,
            interpolation: convert_interpolation(channel.interpolation),
            output,
        });
        animation.channels.push(AnimationChannel {
            sampler,
            target: AnimationChannelTarget {
                node: Some(node_id),
                path,
                extensions: Default::default(),
            },
        });
    }

    /// Register an animated property on an arbitrary target. The property
    /// name is mapped through the per-target-type dispatch table; the channel
    /// target becomes `pointer` and joins the pending list for the second
    /// resolution pass.
    pub(crate) fn add_animation_data(
        &mut self,
        animation: &mut Animation,
        animation_index: usize,
        channel: &ClipChannel,
    ) {
        if channel.times.is_empty() || channel.values.is_empty() {
            return;
        }
        if !self.target_was_exported(channel.target) {
            warn!(
                target = ?channel.target,
                property = %channel.property,
                "animated object has not been exported, is it disabled? dropping channel"
            );
            return;
        }

        let Some(mut plan) = self.plan_channel(channel.target, &channel.property) else {
            return;
        };

        let input = self.export_time_accessor(&channel.times);
        let interpolation = convert_interpolation(channel.interpolation);

        let mut second_output: Option<AccessorId> = None;
        let mut need_second = plan.second_property.is_some();

        let output = match &channel.values {
            ChannelValues::Float(values) => {
                let data: Vec<f32> = if plan.flip_value_range {
                    values.iter().map(|v| 1.0 - v).collect()
                } else if let Some(multiplier) = plan.value_multiplier {
                    values.iter().map(|v| v * multiplier).collect()
                } else {
                    values.clone()
                };
                let accessor = self.export_scalar_accessor(&data);
                // orthographic size drives both magnifications from one sampler
                if plan.property == "orthographic/ymag" {
                    second_output = Some(accessor);
                }
                accessor
            }
            ChannelValues::Vec2(values) => self.export_vec2_accessor(values),
            ChannelValues::Vec3(values) => self.export_vec3_accessor(values, false, None),
            ChannelValues::Vec4(values) => {
                if plan.is_texture_transform {
                    let scales: Vec<Vec2> =
                        values.iter().map(|st| Vec2::new(st.x, st.y)).collect();
                    let offsets: Vec<Vec2> = values
                        .iter()
                        .map(|st| Vec2::new(st.z, 1.0 - st.w - st.y))
                        .collect();
                    second_output = Some(self.export_vec2_accessor(&offsets));
                    self.export_vec2_accessor(&scales)
                } else {
                    self.export_vec4_accessor(values, None)
                }
            }
            ChannelValues::Quat(values) => self.export_quat_accessor(values),
            ChannelValues::Color(values) => {
                if plan.property == "emissiveFactor" && plan.second_property.is_some() {
                    // decompose each sample; the strength channel only
                    // survives if any sampled intensity actually exceeds 1
                    let mut colors = Vec::with_capacity(values.len());
                    let mut strengths = Vec::with_capacity(values.len());
                    need_second = false;
                    for value in values {
                        let (rgb, strength) = decompose_emission(*value);
                        colors.push(Color::rgb(rgb[0], rgb[1], rgb[2]));
                        strengths.push(strength);
                        if strength > 1.0 {
                            need_second = true;
                        }
                    }
                    second_output = Some(self.export_scalar_accessor(&strengths));
                    self.export_color_accessor(&colors, false, None)
                } else {
                    self.export_color_accessor(values, plan.keep_color_alpha, None)
                }
            }
        };

        let sampler = animation.samplers.len();
        animation.samplers.push(AnimationSampler {
            input,
            interpolation,
            output,
        });
        let channel_index = animation.channels.len();
        animation.channels.push(AnimationChannel {
            sampler,
            target: AnimationChannelTarget {
                node: None,
                path: TargetPath::Pointer,
                extensions: Default::default(),
            },
        });
        self.register_pointer(
            channel.target,
            plan.property.clone(),
            animation_index,
            channel_index,
        );

        // full-sample inspection may have shown the split is unnecessary
        if !need_second {
            plan.second_property = None;
            if !plan.is_texture_transform {
                plan.extension = None;
            }
        }

        if let Some(extension_name) = plan.extension {
            self.root.declare_extension(extension_name, false);
            if let AnimationTarget::Material(material) = channel.target {
                if plan.is_texture_transform {
                    self.ensure_texture_transform(material, &plan.property);
                } else {
                    self.ensure_material_extension(material, extension_name);
                }
            }
        }

        if let (Some(second_property), Some(output)) = (plan.second_property, second_output) {
            let sampler = animation.samplers.len();
            animation.samplers.push(AnimationSampler {
                input,
                interpolation,
                output,
            });
            let channel_index = animation.channels.len();
            animation.channels.push(AnimationChannel {
                sampler,
                target: AnimationChannelTarget {
                    node: None,
                    path: TargetPath::Pointer,
                    extensions: Default::default(),
                },
            });
            self.register_pointer(channel.target, second_property, animation_index, channel_index);
        }
    }

    fn target_was_exported(&self, target: AnimationTarget) -> bool {
        match target {
            AnimationTarget::Node(i) => self.node_ids.contains_key(&i),
            AnimationTarget::Material(i) => self.material_ids.contains_key(&i),
            AnimationTarget::Light(i) => self.light_ids.contains_key(&i),
            AnimationTarget::Camera(i) => self.camera_ids.contains_key(&i),
        }
    }

    fn plan_channel(&self, target: AnimationTarget, property: &str) -> Option<ChannelPlan> {
        match target {
            AnimationTarget::Material(i) => self.plan_material_channel(i, property),
            AnimationTarget::Light(_) => Some(plan_light_channel(property)),
            AnimationTarget::Camera(i) => Some(self.plan_camera_channel(i, property)),
            AnimationTarget::Node(_) => Some(ChannelPlan::plain(property)),
        }
    }

    /// Engine material property names to glTF property paths
    fn plan_material_channel(&self, material: usize, property: &str) -> Option<ChannelPlan> {
        let mat_src = self.source.materials.get(material)?;
        let plan = match property {
            "_Color" | "_BaseColor" | "_BaseColorFactor" | "baseColorFactor" => {
                ChannelPlan::plain("pbrMetallicRoughness/baseColorFactor")
            }
            "_Smoothness" | "_Glossiness" => {
                ChannelPlan::plain("pbrMetallicRoughness/roughnessFactor").flipped()
            }
            "_Roughness" | "_RoughnessFactor" | "roughnessFactor" => {
                ChannelPlan::plain("pbrMetallicRoughness/roughnessFactor")
            }
            "_Metallic" | "_MetallicFactor" | "metallicFactor" => {
                ChannelPlan::plain("pbrMetallicRoughness/metallicFactor")
            }
            "_MainTex_ST" | "_BaseMap_ST" | "_BaseColorTexture_ST" | "baseColorTexture_ST" => {
                mat_src.base_color_texture.as_ref()?;
                ChannelPlan::texture_transform("pbrMetallicRoughness/baseColorTexture")
            }
            "_EmissionColor" | "_EmissiveFactor" | "emissiveFactor" => ChannelPlan {
                property: "emissiveFactor".to_string(),
                second_property: Some(format!(
                    "extensions/{}/emissiveStrength",
                    KhrMaterialsEmissiveStrength::NAME
                )),
                extension: Some(KhrMaterialsEmissiveStrength::NAME),
                flip_value_range: false,
                value_multiplier: None,
                is_texture_transform: false,
                keep_color_alpha: false,
            },
            "_EmissionMap_ST" | "_EmissiveTexture_ST" | "emissiveTexture_ST" => {
                mat_src.emissive_texture.as_ref()?;
                ChannelPlan::texture_transform("emissiveTexture")
            }
            "_Cutoff" | "_AlphaCutoff" | "alphaCutoff" => ChannelPlan::plain("alphaCutoff"),
            "_BumpScale" | "_NormalScale" | "normalScale" | "normalTextureScale" => {
                ChannelPlan::plain("normalTexture/scale")
            }
            "_BumpMap_ST" | "_NormalTexture_ST" | "normalTexture_ST" => {
                mat_src.normal_texture.as_ref()?;
                ChannelPlan::texture_transform("normalTexture")
            }
            "_OcclusionStrength" | "occlusionStrength" | "occlusionTextureStrength" => {
                ChannelPlan::plain("occlusionTexture/strength")
            }
            "_OcclusionMap_ST" | "_OcclusionTexture_ST" | "occlusionTexture_ST" => {
                mat_src.occlusion_texture.as_ref()?;
                ChannelPlan::texture_transform("occlusionTexture")
            }
            "_TransmissionFactor" | "transmissionFactor" => ChannelPlan::plain(format!(
                "extensions/{}/transmissionFactor",
                KhrMaterialsTransmission::NAME
            ))
            .with_extension(KhrMaterialsTransmission::NAME),
            "_ThicknessFactor" | "thicknessFactor" => ChannelPlan::plain(format!(
                "extensions/{}/thicknessFactor",
                KhrMaterialsVolume::NAME
            ))
            .with_extension(KhrMaterialsVolume::NAME),
            "_AttenuationDistance" | "attenuationDistance" => ChannelPlan::plain(format!(
                "extensions/{}/attenuationDistance",
                KhrMaterialsVolume::NAME
            ))
            .with_extension(KhrMaterialsVolume::NAME),
            "_AttenuationColor" | "attenuationColor" => ChannelPlan::plain(format!(
                "extensions/{}/attenuationColor",
                KhrMaterialsVolume::NAME
            ))
            .with_extension(KhrMaterialsVolume::NAME)
            .without_alpha(),
            "_IOR" | "ior" => {
                ChannelPlan::plain(format!("extensions/{}/ior", KhrMaterialsIor::NAME))
                    .with_extension(KhrMaterialsIor::NAME)
            }
            "_IridescenceFactor" | "iridescenceFactor" => ChannelPlan::plain(format!(
                "extensions/{}/iridescenceFactor",
                KhrMaterialsIridescence::NAME
            ))
            .with_extension(KhrMaterialsIridescence::NAME),
            "_IridescenceIor" | "iridescenceIor" => ChannelPlan::plain(format!(
                "extensions/{}/iridescenceIor",
                KhrMaterialsIridescence::NAME
            ))
            .with_extension(KhrMaterialsIridescence::NAME),
            "_IridescenceThicknessMinimum" | "iridescenceThicknessMinimum" => {
                ChannelPlan::plain(format!(
                    "extensions/{}/iridescenceThicknessMinimum",
                    KhrMaterialsIridescence::NAME
                ))
                .with_extension(KhrMaterialsIridescence::NAME)
            }
            "_IridescenceThicknessMaximum" | "iridescenceThicknessMaximum" => {
                ChannelPlan::plain(format!(
                    "extensions/{}/iridescenceThicknessMaximum",
                    KhrMaterialsIridescence::NAME
                ))
                .with_extension(KhrMaterialsIridescence::NAME)
            }
            "_SpecularFactor" | "specularFactor" => ChannelPlan::plain(format!(
                "extensions/{}/specularFactor",
                KhrMaterialsSpecular::NAME
            ))
            .with_extension(KhrMaterialsSpecular::NAME),
            "_SpecularColorFactor" | "specularColorFactor" => ChannelPlan::plain(format!(
                "extensions/{}/specularColorFactor",
                KhrMaterialsSpecular::NAME
            ))
            .with_extension(KhrMaterialsSpecular::NAME)
            .without_alpha(),
            other => ChannelPlan::plain(other),
        };
        Some(plan)
    }

    fn plan_camera_channel(&self, camera: usize, property: &str) -> ChannelPlan {
        let orthographic = matches!(
            self.source.cameras.get(camera).map(|c| &c.projection),
            Some(CameraProjection::Orthographic { .. })
        );
        if orthographic {
            match property {
                "orthographic size" => ChannelPlan {
                    property: "orthographic/ymag".to_string(),
                    second_property: Some("orthographic/xmag".to_string()),
                    extension: None,
                    flip_value_range: false,
                    value_multiplier: None,
                    is_texture_transform: false,
                    keep_color_alpha: true,
                },
                "near clip plane" => ChannelPlan::plain("orthographic/znear"),
                "far clip plane" => ChannelPlan::plain("orthographic/zfar"),
                other => ChannelPlan::plain(other),
            }
        } else {
            match property {
                "field of view" => {
                    ChannelPlan::plain("perspective/yfov").scaled(DEG_TO_RAD)
                }
                "near clip plane" => ChannelPlan::plain("perspective/znear"),
                "far clip plane" => ChannelPlan::plain("perspective/zfar"),
                other => ChannelPlan::plain(other),
            }
        }
    }

    fn register_pointer(
        &mut self,
        target: AnimationTarget,
        property: String,
        animation: usize,
        channel: usize,
    ) {
        self.pending_pointers.push(PendingPointer {
            target,
            property,
            animation,
            channel,
        });
        self.root.declare_extension(KhrAnimationPointer::NAME, false);
    }

    /// Ensure the exported material carries a static payload for an
    /// extension an animation channel targets
    fn ensure_material_extension(&mut self, material: usize, extension_name: &str) {
        let Some(&material_id) = self.material_ids.get(&material) else {
            return;
        };
        let material = &mut self.root.materials[material_id.index()];
        if material.extensions.contains(extension_name) {
            return;
        }
        let payload: Option<Box<dyn Extension>> = match extension_name {
            KhrMaterialsEmissiveStrength::NAME => {
                Some(Box::<KhrMaterialsEmissiveStrength>::default())
            }
            KhrMaterialsTransmission::NAME => Some(Box::<KhrMaterialsTransmission>::default()),
            KhrMaterialsVolume::NAME => Some(Box::<KhrMaterialsVolume>::default()),
            KhrMaterialsIor::NAME => Some(Box::<KhrMaterialsIor>::default()),
            KhrMaterialsSpecular::NAME => Some(Box::<KhrMaterialsSpecular>::default()),
            KhrMaterialsIridescence::NAME => Some(Box::<KhrMaterialsIridescence>::default()),
            _ => None,
        };
        if let Some(payload) = payload {
            material.extensions.insert(payload);
        }
    }

    /// Ensure the texture info a transform channel points at carries a
    /// KHR_texture_transform payload
    fn ensure_texture_transform(&mut self, material: usize, property: &str) {
        let Some(&material_id) = self.material_ids.get(&material) else {
            return;
        };
        let material = &mut self.root.materials[material_id.index()];

        let extensions = if property.starts_with("pbrMetallicRoughness/baseColorTexture") {
            material
                .pbr_metallic_roughness
                .as_mut()
                .and_then(|pbr| pbr.base_color_texture.as_mut())
                .map(|info| &mut info.extensions)
        } else if property.starts_with("emissiveTexture") {
            material.emissive_texture.as_mut().map(|info| &mut info.extensions)
        } else if property.starts_with("normalTexture") {
            material.normal_texture.as_mut().map(|info| &mut info.extensions)
        } else if property.starts_with("occlusionTexture") {
            material.occlusion_texture.as_mut().map(|info| &mut info.extensions)
        } else {
            None
        };

        if let Some(extensions) = extensions {
            if !extensions.contains(KhrTextureTransform::NAME) {
                extensions.insert(Box::<KhrTextureTransform>::default());
            }
        }
    }

    /// Second pass: every exportable object now has a final index, so each
    /// pending fragment concatenates into an absolute pointer. No further
    /// graph traversal happens here.
    pub(crate) fn resolve_animation_pointers(&mut self) {
        let pending = std::mem::take(&mut self.pending_pointers);
        for entry in pending {
            let path = match entry.target {
                AnimationTarget::Light(i) => self.light_ids.get(&i).map(|id| {
                    format!(
                        "/extensions/{}/lights/{}/{}",
                        KhrLightsPunctual::NAME,
                        id.index(),
                        entry.property
                    )
                }),
                AnimationTarget::Camera(i) => self
                    .camera_ids
                    .get(&i)
                    .map(|id| format!("/cameras/{}/{}", id.index(), entry.property)),
                AnimationTarget::Material(i) => self
                    .material_ids
                    .get(&i)
                    .map(|id| format!("/materials/{}/{}", id.index(), entry.property)),
                AnimationTarget::Node(i) => {
                    self.node_ids.get(&i).copied().map(|id: NodeId| {
                        let mut path = format!("/nodes/{}/{}", id.index(), entry.property);
                        let mut resolved = false;
                        for resolver in &self.resolvers {
                            if resolver.try_resolve(&entry.target, &mut path) {
                                resolved = true;
                                break;
                            }
                        }
                        if !resolved && !is_transform_property(&entry.property) {
                            warn!(
                                target = ?entry.target,
                                path = %path,
                                "could not resolve animation pointer; attach a custom resolver to animate extension properties"
                            );
                        }
                        path
                    })
                }
            };

            let Some(path) = path else { continue };
            let target = &mut self.root.animations[entry.animation].channels[entry.channel].target;
            target
                .extensions
                .insert(Box::new(KhrAnimationPointer::new(path)));
        }
    }
}
