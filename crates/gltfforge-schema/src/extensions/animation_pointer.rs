//! KHR_animation_pointer
//!
//! Lets an animation channel target an arbitrary JSON-pointer path instead
//! of only node TRS properties. The channel's target path becomes the
//! literal string `pointer` and the absolute path lives in this payload.

use serde::{Deserialize, Serialize};

use super::impl_extension;

/// Absolute JSON-pointer target of an animation channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhrAnimationPointer {
    /// e.g. `/materials/0/pbrMetallicRoughness/baseColorFactor`
    pub pointer: String,
}

impl_extension!(KhrAnimationPointer, "KHR_animation_pointer");

impl KhrAnimationPointer {
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
        }
    }
}
