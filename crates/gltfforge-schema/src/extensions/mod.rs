//! Extension payloads and the extension registry
//!
//! Each extension is a named, independently serializable payload. Built-in
//! extension names deserialize through a factory table into typed payloads;
//! unrecognized names are preserved opaquely as raw JSON so they survive a
//! round trip. Payloads are never shared between owners; duplicating an
//! owner deep-clones its extension map.

mod animation_pointer;
mod lights_punctual;
mod materials;
mod texture_exr;
mod texture_transform;

pub use animation_pointer::KhrAnimationPointer;
pub use lights_punctual::{KhrLightsPunctual, LightType, PunctualLight, SpotLight};
pub use materials::{
    KhrMaterialsEmissiveStrength, KhrMaterialsIor, KhrMaterialsIridescence,
    KhrMaterialsSpecular, KhrMaterialsTransmission, KhrMaterialsVolume,
};
pub use texture_exr::ExtTextureExr;
pub use texture_transform::KhrTextureTransform;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::GltfResult;

/// A polymorphic extension payload.
///
/// Implementors provide their JSON form, a deep clone, and runtime downcast
/// access. Deserialization goes through the factory table instead.
pub trait Extension: fmt::Debug + Send + Sync {
    /// Extension name as it appears in the document, e.g. `KHR_materials_ior`
    fn name(&self) -> &str;

    /// Serialize to the JSON property value stored under the name
    fn to_json(&self) -> Value;

    /// Deep copy for object duplication
    fn clone_boxed(&self) -> Box<dyn Extension>;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;
}

/// Implements [`Extension`] for a serde-derived payload type.
macro_rules! impl_extension {
    ($ty:ty, $name:expr) => {
        impl $ty {
            pub const NAME: &'static str = $name;
        }

        impl $crate::extensions::Extension for $ty {
            fn name(&self) -> &str {
                Self::NAME
            }

            fn to_json(&self) -> serde_json::Value {
                serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
            }

            fn clone_boxed(&self) -> Box<dyn $crate::extensions::Extension> {
                Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    };
}

pub(crate) use impl_extension;

/// Payload kept verbatim for extensions we do not understand
#[derive(Debug, Clone)]
pub struct OpaqueExtension {
    pub name: String,
    pub value: Value,
}

impl Extension for OpaqueExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_json(&self) -> Value {
        self.value.clone()
    }

    fn clone_boxed(&self) -> Box<dyn Extension> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type ExtensionFactory = fn(&Value) -> GltfResult<Box<dyn Extension>>;

fn factory<T>(value: &Value) -> GltfResult<Box<dyn Extension>>
where
    T: Extension + DeserializeOwned + 'static,
{
    let ext: T = serde_json::from_value(value.clone())?;
    Ok(Box::new(ext))
}

/// Closed dispatch table for the built-in extension set
static FACTORIES: Lazy<BTreeMap<&'static str, ExtensionFactory>> = Lazy::new(|| {
    let mut table: BTreeMap<&'static str, ExtensionFactory> = BTreeMap::new();
    table.insert(KhrLightsPunctual::NAME, factory::<KhrLightsPunctual>);
    table.insert(KhrMaterialsTransmission::NAME, factory::<KhrMaterialsTransmission>);
    table.insert(KhrMaterialsVolume::NAME, factory::<KhrMaterialsVolume>);
    table.insert(KhrMaterialsIor::NAME, factory::<KhrMaterialsIor>);
    table.insert(KhrMaterialsSpecular::NAME, factory::<KhrMaterialsSpecular>);
    table.insert(
        KhrMaterialsEmissiveStrength::NAME,
        factory::<KhrMaterialsEmissiveStrength>,
    );
    table.insert(KhrMaterialsIridescence::NAME, factory::<KhrMaterialsIridescence>);
    table.insert(KhrTextureTransform::NAME, factory::<KhrTextureTransform>);
    table.insert(KhrAnimationPointer::NAME, factory::<KhrAnimationPointer>);
    table.insert(ExtTextureExr::NAME, factory::<ExtTextureExr>);
    table
});

/// Deserialize a named extension payload, falling back to opaque passthrough
/// for unrecognized names.
pub fn deserialize_extension(name: &str, value: &Value) -> GltfResult<Box<dyn Extension>> {
    match FACTORIES.get(name) {
        Some(factory) => factory(value),
        None => Ok(Box::new(OpaqueExtension {
            name: name.to_string(),
            value: value.clone(),
        })),
    }
}

/// Name-keyed extension payloads attached to one document object
#[derive(Debug, Default)]
pub struct ExtensionMap(BTreeMap<String, Box<dyn Extension>>);

impl ExtensionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Insert a payload under its own name, replacing any previous payload
    pub fn insert(&mut self, extension: Box<dyn Extension>) {
        self.0.insert(extension.name().to_string(), extension);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Extension> {
        self.0.get(name).map(|e| e.as_ref())
    }

    /// Typed lookup via downcast
    pub fn get_as<T: Extension + 'static>(&self, name: &str) -> Option<&T> {
        self.0.get(name).and_then(|e| e.as_any().downcast_ref::<T>())
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Extension>> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Extension)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl Clone for ExtensionMap {
    fn clone(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone_boxed()))
                .collect(),
        )
    }
}

impl Serialize for ExtensionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, extension) in &self.0 {
            map.serialize_entry(name, &extension.to_json())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtensionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut out = BTreeMap::new();
        for (name, value) in raw {
            let extension = deserialize_extension(&name, &value).map_err(|e| {
                serde::de::Error::custom(format!("extension {name}: {e}"))
            })?;
            out.insert(name, extension);
        }
        Ok(Self(out))
    }
}
