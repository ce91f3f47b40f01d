//! Textures, images, and samplers

use serde::{Deserialize, Serialize};

use crate::extensions::ExtensionMap;
use crate::ids::{BufferViewId, ImageId, SamplerId};
use crate::ser::numeric_enum;

numeric_enum! {
    /// Magnification/minification filter, serialized as its GL code.
    /// Mipmapped minification variants collapse to their base filter on
    /// import.
    pub enum FilterMode {
        Nearest = 9728,
        Linear = 9729,
        NearestMipmapNearest = 9984,
        LinearMipmapNearest = 9985,
        NearestMipmapLinear = 9986,
        LinearMipmapLinear = 9987,
    }
}

numeric_enum! {
    /// Texture addressing mode, serialized as its GL code
    pub enum WrapMode {
        ClampToEdge = 33071,
        MirroredRepeat = 33648,
        Repeat = 10497,
    }
}

impl Default for WrapMode {
    fn default() -> Self {
        WrapMode::Repeat
    }
}

impl WrapMode {
    fn is_default(&self) -> bool {
        *self == WrapMode::Repeat
    }
}

/// Texture = image source + sampler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Texture {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<SamplerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ImageId>,
    #[serde(default, skip_serializing_if = "ExtensionMap::is_empty")]
    pub extensions: ExtensionMap,
}

/// Image payload: URI (external or base64 data URI) or an embedded
/// buffer-view range with a MIME type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "bufferView")]
    pub buffer_view: Option<BufferViewId>,
}

/// Wrap and filter state shared by textures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sampler {
    #[serde(skip_serializing_if = "Option::is_none", rename = "magFilter")]
    pub mag_filter: Option<FilterMode>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "minFilter")]
    pub min_filter: Option<FilterMode>,
    #[serde(default, rename = "wrapS", skip_serializing_if = "WrapMode::is_default")]
    pub wrap_s: WrapMode,
    #[serde(default, rename = "wrapT", skip_serializing_if = "WrapMode::is_default")]
    pub wrap_t: WrapMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_codes() {
        let sampler = Sampler {
            mag_filter: Some(FilterMode::Nearest),
            min_filter: Some(FilterMode::LinearMipmapLinear),
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::Repeat,
        };
        let json = serde_json::to_value(&sampler).unwrap();
        assert_eq!(json["magFilter"], 9728);
        assert_eq!(json["minFilter"], 9987);
        assert_eq!(json["wrapS"], 33071);
        assert!(json.get("wrapT").is_none());
    }
}
