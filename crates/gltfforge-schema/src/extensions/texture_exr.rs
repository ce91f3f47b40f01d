//! EXT_texture_exr
//!
//! Marks a texture whose image source is OpenEXR rather than PNG/JPEG.

use serde::{Deserialize, Serialize};

use super::impl_extension;
use crate::ids::ImageId;

/// EXR image source of the owning texture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtTextureExr {
    pub source: ImageId,
}

impl_extension!(ExtTextureExr, "EXT_texture_exr");

impl ExtTextureExr {
    pub fn new(source: ImageId) -> Self {
        Self { source }
    }
}
