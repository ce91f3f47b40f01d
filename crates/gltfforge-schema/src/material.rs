//! Materials

use serde::{Deserialize, Serialize};

use crate::extensions::ExtensionMap;
use crate::ids::TextureId;
use crate::ser::u32_is_zero;

/// Alpha coverage mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

impl Default for AlphaMode {
    fn default() -> Self {
        AlphaMode::Opaque
    }
}

impl AlphaMode {
    fn is_default(&self) -> bool {
        *self == AlphaMode::Opaque
    }
}

/// Reference to a texture plus the TEXCOORD set to sample it with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureInfo {
    pub index: TextureId,
    #[serde(default, rename = "texCoord", skip_serializing_if = "u32_is_zero")]
    pub tex_coord: u32,
    #[serde(default, skip_serializing_if = "ExtensionMap::is_empty")]
    pub extensions: ExtensionMap,
}

impl TextureInfo {
    pub fn new(index: TextureId) -> Self {
        Self {
            index,
            tex_coord: 0,
            extensions: ExtensionMap::new(),
        }
    }
}

/// Normal texture reference with tangent-space scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalTextureInfo {
    pub index: TextureId,
    #[serde(default, rename = "texCoord", skip_serializing_if = "u32_is_zero")]
    pub tex_coord: u32,
    #[serde(default = "default_unit", skip_serializing_if = "is_unit")]
    pub scale: f32,
    #[serde(default, skip_serializing_if = "ExtensionMap::is_empty")]
    pub extensions: ExtensionMap,
}

/// Occlusion texture reference with strength
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcclusionTextureInfo {
    pub index: TextureId,
    #[serde(default, rename = "texCoord", skip_serializing_if = "u32_is_zero")]
    pub tex_coord: u32,
    #[serde(default = "default_unit", skip_serializing_if = "is_unit")]
    pub strength: f32,
    #[serde(default, skip_serializing_if = "ExtensionMap::is_empty")]
    pub extensions: ExtensionMap,
}

/// Core metallic-roughness parameter set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PbrMetallicRoughness {
    #[serde(
        default = "default_base_color",
        rename = "baseColorFactor",
        skip_serializing_if = "is_default_base_color"
    )]
    pub base_color_factor: [f32; 4],
    #[serde(skip_serializing_if = "Option::is_none", rename = "baseColorTexture")]
    pub base_color_texture: Option<TextureInfo>,
    #[serde(default = "default_unit", rename = "metallicFactor", skip_serializing_if = "is_unit")]
    pub metallic_factor: f32,
    #[serde(default = "default_unit", rename = "roughnessFactor", skip_serializing_if = "is_unit")]
    pub roughness_factor: f32,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "metallicRoughnessTexture"
    )]
    pub metallic_roughness_texture: Option<TextureInfo>,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: default_base_color(),
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
        }
    }
}

/// A material: factor scalars/colors, texture slots, alpha handling, and an
/// open-ended extension map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "pbrMetallicRoughness"
    )]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "normalTexture")]
    pub normal_texture: Option<NormalTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "occlusionTexture")]
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "emissiveTexture")]
    pub emissive_texture: Option<TextureInfo>,
    #[serde(
        default,
        rename = "emissiveFactor",
        skip_serializing_if = "is_black"
    )]
    pub emissive_factor: [f32; 3],
    #[serde(default, rename = "alphaMode", skip_serializing_if = "AlphaMode::is_default")]
    pub alpha_mode: AlphaMode,
    #[serde(
        default = "default_alpha_cutoff",
        rename = "alphaCutoff",
        skip_serializing_if = "is_default_alpha_cutoff"
    )]
    pub alpha_cutoff: f32,
    #[serde(
        default,
        rename = "doubleSided",
        skip_serializing_if = "crate::ser::is_false"
    )]
    pub double_sided: bool,
    #[serde(default, skip_serializing_if = "ExtensionMap::is_empty")]
    pub extensions: ExtensionMap,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            pbr_metallic_roughness: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            emissive_factor: [0.0, 0.0, 0.0],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: default_alpha_cutoff(),
            double_sided: false,
            extensions: ExtensionMap::new(),
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

fn default_base_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn is_default_base_color(factor: &[f32; 4]) -> bool {
    *factor == [1.0, 1.0, 1.0, 1.0]
}

fn default_unit() -> f32 {
    1.0
}

fn is_unit(v: &f32) -> bool {
    *v == 1.0
}

fn is_black(factor: &[f32; 3]) -> bool {
    *factor == [0.0, 0.0, 0.0]
}

fn default_alpha_cutoff() -> f32 {
    0.5
}

fn is_default_alpha_cutoff(v: &f32) -> bool {
    *v == 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_material_serializes_empty() {
        let material = Material {
            alpha_cutoff: 0.5,
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&material).unwrap(), json!({}));
    }

    #[test]
    fn test_alpha_mode_round_trip() {
        let material = Material {
            alpha_mode: AlphaMode::Mask,
            alpha_cutoff: 0.25,
            ..Default::default()
        };
        let json = serde_json::to_value(&material).unwrap();
        assert_eq!(json["alphaMode"], "MASK");
        let back: Material = serde_json::from_value(json).unwrap();
        assert_eq!(back.alpha_mode, AlphaMode::Mask);
        assert!((back.alpha_cutoff - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_missing_alpha_cutoff_defaults() {
        let material: Material = serde_json::from_value(json!({ "alphaMode": "MASK" })).unwrap();
        assert!((material.alpha_cutoff - 0.5).abs() < 1e-6);
    }
}
