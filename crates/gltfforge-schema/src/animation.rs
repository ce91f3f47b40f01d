//! Animations

use serde::{Deserialize, Serialize};

use crate::extensions::ExtensionMap;
use crate::ids::{AccessorId, NodeId};

/// An animation: ordered sampler and channel lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Animation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub channels: Vec<AnimationChannel>,
    pub samplers: Vec<AnimationSampler>,
}

impl Animation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Pairs a sampler (by index into the owning animation's sampler list) with
/// a target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationChannel {
    /// Index into [`Animation::samplers`]
    pub sampler: usize,
    pub target: AnimationChannelTarget,
}

/// What a channel drives: a node property, or a pointer path carried in the
/// KHR_animation_pointer extension
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimationChannelTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
    pub path: TargetPath,
    #[serde(default, skip_serializing_if = "ExtensionMap::is_empty")]
    pub extensions: ExtensionMap,
}

/// Channel target property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
    /// Extension-based pointer target; the concrete path lives in the
    /// channel target's KHR_animation_pointer payload
    Pointer,
}

impl Default for TargetPath {
    fn default() -> Self {
        TargetPath::Translation
    }
}

/// Time accessor + value accessor + interpolation mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSampler {
    pub input: AccessorId,
    #[serde(default, skip_serializing_if = "Interpolation::is_default")]
    pub interpolation: Interpolation,
    pub output: AccessorId,
}

/// Keyframe interpolation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpolation {
    Linear,
    Step,
    #[serde(rename = "CUBICSPLINE")]
    CubicSpline,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Linear
    }
}

impl Interpolation {
    fn is_default(&self) -> bool {
        *self == Interpolation::Linear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_path_strings() {
        assert_eq!(
            serde_json::to_value(TargetPath::Pointer).unwrap(),
            serde_json::json!("pointer")
        );
        assert_eq!(
            serde_json::to_value(TargetPath::Translation).unwrap(),
            serde_json::json!("translation")
        );
    }

    #[test]
    fn test_interpolation_strings() {
        assert_eq!(
            serde_json::to_value(Interpolation::CubicSpline).unwrap(),
            serde_json::json!("CUBICSPLINE")
        );
    }
}
