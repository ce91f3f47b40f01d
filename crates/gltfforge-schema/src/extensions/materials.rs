//! KHR_materials_* payloads
//!
//! Factor defaults follow the respective extension specifications; absent
//! texture slots are omitted from the serialized form.

use serde::{Deserialize, Serialize};

use super::impl_extension;
use crate::material::TextureInfo;

/// KHR_materials_transmission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KhrMaterialsTransmission {
    #[serde(default, rename = "transmissionFactor")]
    pub transmission_factor: f32,
    #[serde(skip_serializing_if = "Option::is_none", rename = "transmissionTexture")]
    pub transmission_texture: Option<TextureInfo>,
}

impl_extension!(KhrMaterialsTransmission, "KHR_materials_transmission");

/// KHR_materials_ior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhrMaterialsIor {
    #[serde(default = "default_ior")]
    pub ior: f32,
}

impl_extension!(KhrMaterialsIor, "KHR_materials_ior");

impl Default for KhrMaterialsIor {
    fn default() -> Self {
        Self { ior: default_ior() }
    }
}

fn default_ior() -> f32 {
    1.5
}

/// KHR_materials_volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhrMaterialsVolume {
    #[serde(default, rename = "thicknessFactor")]
    pub thickness_factor: f32,
    #[serde(skip_serializing_if = "Option::is_none", rename = "thicknessTexture")]
    pub thickness_texture: Option<TextureInfo>,
    /// Absent means unbounded attenuation
    #[serde(skip_serializing_if = "Option::is_none", rename = "attenuationDistance")]
    pub attenuation_distance: Option<f32>,
    #[serde(
        default = "default_white",
        rename = "attenuationColor",
        skip_serializing_if = "is_white"
    )]
    pub attenuation_color: [f32; 3],
}

impl_extension!(KhrMaterialsVolume, "KHR_materials_volume");

impl Default for KhrMaterialsVolume {
    fn default() -> Self {
        Self {
            thickness_factor: 0.0,
            thickness_texture: None,
            attenuation_distance: None,
            attenuation_color: default_white(),
        }
    }
}

/// KHR_materials_specular
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhrMaterialsSpecular {
    #[serde(default = "default_one", rename = "specularFactor")]
    pub specular_factor: f32,
    #[serde(
        default = "default_white",
        rename = "specularColorFactor",
        skip_serializing_if = "is_white"
    )]
    pub specular_color_factor: [f32; 3],
}

impl_extension!(KhrMaterialsSpecular, "KHR_materials_specular");

impl Default for KhrMaterialsSpecular {
    fn default() -> Self {
        Self {
            specular_factor: 1.0,
            specular_color_factor: default_white(),
        }
    }
}

/// KHR_materials_emissive_strength
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhrMaterialsEmissiveStrength {
    #[serde(default = "default_one", rename = "emissiveStrength")]
    pub emissive_strength: f32,
}

impl_extension!(KhrMaterialsEmissiveStrength, "KHR_materials_emissive_strength");

impl Default for KhrMaterialsEmissiveStrength {
    fn default() -> Self {
        Self {
            emissive_strength: 1.0,
        }
    }
}

/// KHR_materials_iridescence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhrMaterialsIridescence {
    #[serde(default, rename = "iridescenceFactor")]
    pub iridescence_factor: f32,
    /// R channel
    #[serde(skip_serializing_if = "Option::is_none", rename = "iridescenceTexture")]
    pub iridescence_texture: Option<TextureInfo>,
    #[serde(default = "default_iridescence_ior", rename = "iridescenceIor")]
    pub iridescence_ior: f32,
    #[serde(
        default = "default_thickness_min",
        rename = "iridescenceThicknessMinimum"
    )]
    pub iridescence_thickness_minimum: f32,
    #[serde(
        default = "default_thickness_max",
        rename = "iridescenceThicknessMaximum"
    )]
    pub iridescence_thickness_maximum: f32,
    /// G channel
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "iridescenceThicknessTexture"
    )]
    pub iridescence_thickness_texture: Option<TextureInfo>,
}

impl_extension!(KhrMaterialsIridescence, "KHR_materials_iridescence");

impl Default for KhrMaterialsIridescence {
    fn default() -> Self {
        Self {
            iridescence_factor: 0.0,
            iridescence_texture: None,
            iridescence_ior: default_iridescence_ior(),
            iridescence_thickness_minimum: default_thickness_min(),
            iridescence_thickness_maximum: default_thickness_max(),
            iridescence_thickness_texture: None,
        }
    }
}

fn default_one() -> f32 {
    1.0
}

fn default_white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn is_white(color: &[f32; 3]) -> bool {
    *color == [1.0, 1.0, 1.0]
}

fn default_iridescence_ior() -> f32 {
    1.3
}

fn default_thickness_min() -> f32 {
    100.0
}

fn default_thickness_max() -> f32 {
    400.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_empty_payload() {
        let ior: KhrMaterialsIor = serde_json::from_value(json!({})).unwrap();
        assert!((ior.ior - 1.5).abs() < 1e-6);

        let iri: KhrMaterialsIridescence = serde_json::from_value(json!({})).unwrap();
        assert!((iri.iridescence_ior - 1.3).abs() < 1e-6);
        assert!((iri.iridescence_thickness_maximum - 400.0).abs() < 1e-6);

        let strength: KhrMaterialsEmissiveStrength = serde_json::from_value(json!({})).unwrap();
        assert!((strength.emissive_strength - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_volume_serializes_sparse() {
        let volume = KhrMaterialsVolume {
            thickness_factor: 0.2,
            ..Default::default()
        };
        let json = serde_json::to_value(&volume).unwrap();
        assert_eq!(json, json!({ "thicknessFactor": 0.2 }));
    }
}
