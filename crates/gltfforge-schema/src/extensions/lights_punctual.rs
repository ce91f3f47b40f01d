//! KHR_lights_punctual
//!
//! The same extension name appears in two places: the document root carries
//! the light list, a node carries the index of the light it instantiates.

use serde::{Deserialize, Serialize};

use super::impl_extension;
use crate::ids::LightId;

/// Root-level light list or node-level light reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KhrLightsPunctual {
    /// Attached to a node: the light this node instantiates
    Node { light: LightId },
    /// Attached to the root: all punctual lights in the document
    Root { lights: Vec<PunctualLight> },
}

impl_extension!(KhrLightsPunctual, "KHR_lights_punctual");

/// Punctual light kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    Directional,
    Point,
    Spot,
}

/// One punctual light definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunctualLight {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub light_type: LightType,
    #[serde(default = "default_color", skip_serializing_if = "is_default_color")]
    pub color: [f32; 3],
    /// Candela for point/spot, lux for directional
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot: Option<SpotLight>,
}

/// Spot cone, angles in radians measured from the axis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotLight {
    #[serde(
        default,
        rename = "innerConeAngle",
        skip_serializing_if = "super::texture_transform::f32_is_zero"
    )]
    pub inner_cone_angle: f32,
    #[serde(default = "default_outer_cone_angle", rename = "outerConeAngle")]
    pub outer_cone_angle: f32,
}

fn default_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn is_default_color(color: &[f32; 3]) -> bool {
    *color == [1.0, 1.0, 1.0]
}

fn default_intensity() -> f32 {
    1.0
}

fn default_outer_cone_angle() -> f32 {
    std::f32::consts::FRAC_PI_4
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_and_root_shapes() {
        let node: KhrLightsPunctual = serde_json::from_value(json!({ "light": 2 })).unwrap();
        assert!(matches!(node, KhrLightsPunctual::Node { light: LightId(2) }));

        let root: KhrLightsPunctual = serde_json::from_value(json!({
            "lights": [{ "type": "point", "intensity": 3.0 }]
        }))
        .unwrap();
        match root {
            KhrLightsPunctual::Root { lights } => {
                assert_eq!(lights.len(), 1);
                assert_eq!(lights[0].light_type, LightType::Point);
            }
            _ => panic!("expected root shape"),
        }
    }
}
