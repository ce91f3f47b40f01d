//! Buffers, buffer views, and accessors
//!
//! Three-level indirection over the binary payload: a [`Buffer`] is a raw
//! byte blob (or URI reference), a [`BufferView`] is a byte range with an
//! optional stride inside a buffer, and an [`Accessor`] interprets a view as
//! a typed, counted array with an optional sparse override list.

use serde::{Deserialize, Serialize};

use crate::error::{GltfError, GltfResult};
use crate::ids::{BufferId, BufferViewId};
use crate::ser::{numeric_enum, usize_is_zero};

numeric_enum! {
    /// Accessor component type, serialized as its GL code
    pub enum ComponentType {
        Byte = 5120,
        UnsignedByte = 5121,
        Short = 5122,
        UnsignedShort = 5123,
        UnsignedInt = 5125,
        Float = 5126,
    }
}

impl ComponentType {
    /// Size of one component in bytes
    pub fn size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }
}

/// Accessor element shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessorType {
    #[serde(rename = "SCALAR")]
    Scalar,
    #[serde(rename = "VEC2")]
    Vec2,
    #[serde(rename = "VEC3")]
    Vec3,
    #[serde(rename = "VEC4")]
    Vec4,
    #[serde(rename = "MAT2")]
    Mat2,
    #[serde(rename = "MAT3")]
    Mat3,
    #[serde(rename = "MAT4")]
    Mat4,
}

impl AccessorType {
    /// Number of components per element
    pub fn component_count(self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 | AccessorType::Mat2 => 4,
            AccessorType::Mat3 => 9,
            AccessorType::Mat4 => 16,
        }
    }
}

numeric_enum! {
    /// GPU binding hint for a buffer view
    pub enum BufferViewTarget {
        ArrayBuffer = 34962,
        ElementArrayBuffer = 34963,
    }
}

/// A raw byte blob, inline (GLB chunk, `uri: None`) or referenced by URI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buffer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A byte range plus optional stride within a buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferView {
    pub buffer: BufferId,
    #[serde(
        default,
        rename = "byteOffset",
        skip_serializing_if = "usize_is_zero"
    )]
    pub byte_offset: usize,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none", rename = "byteStride")]
    pub byte_stride: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<BufferViewTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Typed, counted view over a buffer view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accessor {
    #[serde(skip_serializing_if = "Option::is_none", rename = "bufferView")]
    pub buffer_view: Option<BufferViewId>,
    #[serde(
        default,
        rename = "byteOffset",
        skip_serializing_if = "usize_is_zero"
    )]
    pub byte_offset: usize,
    #[serde(rename = "componentType")]
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "crate::ser::is_false")]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: AccessorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse: Option<AccessorSparse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Accessor {
    /// Size in bytes of one tightly-packed element
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.accessor_type.component_count()
    }

    /// Check the alignment and bounds invariants against the owning view.
    ///
    /// `index` is only used to label the error.
    pub fn validate(&self, index: usize, view: &BufferView) -> GltfResult<()> {
        let component_size = self.component_type.size();
        if self.byte_offset % component_size != 0 {
            return Err(GltfError::AccessorAlignment {
                accessor: index,
                offset: self.byte_offset,
                component_size,
            });
        }

        let element_size = self.element_size();
        let stride = view.byte_stride.unwrap_or(element_size);
        let required = if self.count == 0 {
            0
        } else {
            self.byte_offset + stride * (self.count - 1) + element_size
        };
        if required > view.byte_length {
            return Err(GltfError::AccessorBounds {
                accessor: index,
                offset: self.byte_offset,
                required,
                available: view.byte_length,
            });
        }

        Ok(())
    }
}

/// Sparse override list layered on top of a (possibly implicit) base array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessorSparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

/// Where the overridden element indices live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseIndices {
    #[serde(rename = "bufferView")]
    pub buffer_view: BufferViewId,
    #[serde(
        default,
        rename = "byteOffset",
        skip_serializing_if = "usize_is_zero"
    )]
    pub byte_offset: usize,
    #[serde(rename = "componentType")]
    pub component_type: ComponentType,
}

/// Where the override values live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseValues {
    #[serde(rename = "bufferView")]
    pub buffer_view: BufferViewId,
    #[serde(
        default,
        rename = "byteOffset",
        skip_serializing_if = "usize_is_zero"
    )]
    pub byte_offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(byte_length: usize, stride: Option<usize>) -> BufferView {
        BufferView {
            buffer: BufferId(0),
            byte_offset: 0,
            byte_length,
            byte_stride: stride,
            target: None,
            name: None,
        }
    }

    fn vec3_accessor(byte_offset: usize, count: usize) -> Accessor {
        Accessor {
            buffer_view: Some(BufferViewId(0)),
            byte_offset,
            component_type: ComponentType::Float,
            normalized: false,
            count,
            accessor_type: AccessorType::Vec3,
            max: None,
            min: None,
            sparse: None,
            name: None,
        }
    }

    #[test]
    fn test_component_sizes() {
        assert_eq!(ComponentType::UnsignedByte.size(), 1);
        assert_eq!(ComponentType::UnsignedShort.size(), 2);
        assert_eq!(ComponentType::Float.size(), 4);
        assert_eq!(ComponentType::from_code(5126), Some(ComponentType::Float));
        assert_eq!(ComponentType::from_code(9999), None);
    }

    #[test]
    fn test_validate_in_bounds() {
        let acc = vec3_accessor(0, 4);
        assert!(acc.validate(0, &view(48, None)).is_ok());
    }

    #[test]
    fn test_validate_out_of_bounds() {
        let acc = vec3_accessor(12, 4);
        let err = acc.validate(0, &view(48, None)).unwrap_err();
        assert!(matches!(err, GltfError::AccessorBounds { .. }));
    }

    #[test]
    fn test_validate_misaligned() {
        let acc = vec3_accessor(2, 1);
        let err = acc.validate(0, &view(48, None)).unwrap_err();
        assert!(matches!(err, GltfError::AccessorAlignment { .. }));
    }

    #[test]
    fn test_validate_strided() {
        // 4 elements, 16-byte stride, last element ends at 48 + 12 = 60
        let acc = vec3_accessor(0, 4);
        assert!(acc.validate(0, &view(60, Some(16))).is_ok());
        assert!(acc.validate(0, &view(59, Some(16))).is_err());
    }
}
