//! KHR_texture_transform

use serde::{Deserialize, Serialize};

use super::impl_extension;

/// UV transform attached to a texture reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhrTextureTransform {
    #[serde(default = "default_offset", skip_serializing_if = "is_default_offset")]
    pub offset: [f32; 2],
    /// Radians, counter-clockwise around the UV origin
    #[serde(default, skip_serializing_if = "f32_is_zero")]
    pub rotation: f32,
    #[serde(default = "default_scale", skip_serializing_if = "is_default_scale")]
    pub scale: [f32; 2],
    /// Overrides the owning texture info's TEXCOORD set when present
    #[serde(skip_serializing_if = "Option::is_none", rename = "texCoord")]
    pub tex_coord: Option<u32>,
}

impl_extension!(KhrTextureTransform, "KHR_texture_transform");

impl KhrTextureTransform {
    /// Property name of the scale field, used by animation pointer paths
    pub const SCALE: &'static str = "scale";
    /// Property name of the offset field, used by animation pointer paths
    pub const OFFSET: &'static str = "offset";

    pub fn new(scale: [f32; 2], offset: [f32; 2]) -> Self {
        Self {
            offset,
            rotation: 0.0,
            scale,
            tex_coord: None,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.offset == [0.0, 0.0]
            && self.rotation == 0.0
            && self.scale == [1.0, 1.0]
            && self.tex_coord.is_none()
    }
}

impl Default for KhrTextureTransform {
    fn default() -> Self {
        Self::new([1.0, 1.0], [0.0, 0.0])
    }
}

fn default_offset() -> [f32; 2] {
    [0.0, 0.0]
}

fn is_default_offset(offset: &[f32; 2]) -> bool {
    *offset == [0.0, 0.0]
}

fn default_scale() -> [f32; 2] {
    [1.0, 1.0]
}

fn is_default_scale(scale: &[f32; 2]) -> bool {
    *scale == [1.0, 1.0]
}

pub(crate) fn f32_is_zero(v: &f32) -> bool {
    *v == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_serializes_empty() {
        let transform = KhrTextureTransform::default();
        assert!(transform.is_identity());
        let json = serde_json::to_value(&transform).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
