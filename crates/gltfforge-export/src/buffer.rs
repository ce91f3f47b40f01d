//! Binary buffer writer and accessor export
//!
//! All geometry and animation data lands in one session-owned byte buffer.
//! Every accessor export pads the write cursor to a 4-byte boundary first,
//! then records a buffer view over the appended range. Multi-byte components
//! are always little-endian.

use gltfforge_core::{Color, Quat, Vec2, Vec3, Vec4};
use gltfforge_schema::{
    Accessor, AccessorId, AccessorSparse, AccessorType, BufferId, BufferView, BufferViewId,
    BufferViewTarget, ComponentType, SparseIndices, SparseValues,
};

use crate::GltfExporter;

/// Session-owned byte buffer with an append cursor
#[derive(Debug, Default)]
pub struct BufferWriter {
    data: Vec<u8>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Round `offset` up to the next multiple of `alignment`
    pub fn align_to(offset: usize, alignment: usize) -> usize {
        (offset + alignment - 1) / alignment * alignment
    }

    /// Pad the cursor to `alignment` with zero bytes, returning the aligned
    /// write offset
    pub fn pad_to(&mut self, alignment: usize) -> usize {
        let aligned = Self::align_to(self.data.len(), alignment);
        self.data.resize(aligned, 0);
        aligned
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

/// Little-endian flattening of f32-backed element arrays
fn f32_bytes(values: &[f32]) -> Vec<u8> {
    if cfg!(target_endian = "little") {
        bytemuck::cast_slice(values).to_vec()
    } else {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

impl GltfExporter<'_> {
    /// Append raw element bytes and record a buffer view + accessor over them
    pub(crate) fn push_accessor(
        &mut self,
        bytes: &[u8],
        component_type: ComponentType,
        accessor_type: AccessorType,
        count: usize,
        min: Option<Vec<f32>>,
        max: Option<Vec<f32>>,
        target: Option<BufferViewTarget>,
    ) -> AccessorId {
        let offset = self.buffer.pad_to(4);
        self.buffer.extend(bytes);

        let view_id = BufferViewId(self.root.buffer_views.len());
        self.root.buffer_views.push(BufferView {
            buffer: BufferId(0),
            byte_offset: offset,
            byte_length: bytes.len(),
            byte_stride: None,
            target,
            name: None,
        });

        let accessor_id = AccessorId(self.root.accessors.len());
        self.root.accessors.push(Accessor {
            buffer_view: Some(view_id),
            byte_offset: 0,
            component_type,
            normalized: false,
            count,
            accessor_type,
            max,
            min,
            sparse: None,
            name: None,
        });
        accessor_id
    }

    pub(crate) fn export_scalar_accessor(&mut self, values: &[f32]) -> AccessorId {
        self.push_accessor(
            &f32_bytes(values),
            ComponentType::Float,
            AccessorType::Scalar,
            values.len(),
            None,
            None,
            None,
        )
    }

    /// Export a time accessor; min/max are required on animation inputs
    pub(crate) fn export_time_accessor(&mut self, times: &[f32]) -> AccessorId {
        let min = times.iter().copied().fold(f32::MAX, f32::min);
        let max = times.iter().copied().fold(f32::MIN, f32::max);
        self.push_accessor(
            &f32_bytes(times),
            ComponentType::Float,
            AccessorType::Scalar,
            times.len(),
            Some(vec![min]),
            Some(vec![max]),
            None,
        )
    }

    pub(crate) fn export_vec2_accessor(&mut self, values: &[Vec2]) -> AccessorId {
        let flat: Vec<f32> = values.iter().flat_map(|v| v.to_array()).collect();
        self.push_accessor(
            &f32_bytes(&flat),
            ComponentType::Float,
            AccessorType::Vec2,
            values.len(),
            None,
            None,
            Some(BufferViewTarget::ArrayBuffer),
        )
    }

    /// `with_bounds` computes per-component min/max; positions require it
    pub(crate) fn export_vec3_accessor(
        &mut self,
        values: &[Vec3],
        with_bounds: bool,
        target: Option<BufferViewTarget>,
    ) -> AccessorId {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        let mut flat = Vec::with_capacity(values.len() * 3);
        for v in values {
            let a = v.to_array();
            for i in 0..3 {
                min[i] = min[i].min(a[i]);
                max[i] = max[i].max(a[i]);
            }
            flat.extend_from_slice(&a);
        }

        let (min, max) = if with_bounds && !values.is_empty() {
            (Some(min.to_vec()), Some(max.to_vec()))
        } else {
            (None, None)
        };
        self.push_accessor(
            &f32_bytes(&flat),
            ComponentType::Float,
            AccessorType::Vec3,
            values.len(),
            min,
            max,
            target,
        )
    }

    pub(crate) fn export_vec4_accessor(
        &mut self,
        values: &[Vec4],
        target: Option<BufferViewTarget>,
    ) -> AccessorId {
        let flat: Vec<f32> = values.iter().flat_map(|v| v.to_array()).collect();
        self.push_accessor(
            &f32_bytes(&flat),
            ComponentType::Float,
            AccessorType::Vec4,
            values.len(),
            None,
            None,
            target,
        )
    }

    pub(crate) fn export_quat_accessor(&mut self, values: &[Quat]) -> AccessorId {
        let flat: Vec<f32> = values.iter().flat_map(|v| v.to_array()).collect();
        self.push_accessor(
            &f32_bytes(&flat),
            ComponentType::Float,
            AccessorType::Vec4,
            values.len(),
            None,
            None,
            None,
        )
    }

    /// Colors export as VEC4 with alpha or VEC3 without
    pub(crate) fn export_color_accessor(
        &mut self,
        values: &[Color],
        keep_alpha: bool,
        target: Option<BufferViewTarget>,
    ) -> AccessorId {
        if keep_alpha {
            let flat: Vec<f32> = values.iter().flat_map(|c| c.to_array()).collect();
            self.push_accessor(
                &f32_bytes(&flat),
                ComponentType::Float,
                AccessorType::Vec4,
                values.len(),
                None,
                None,
                target,
            )
        } else {
            let flat: Vec<f32> = values.iter().flat_map(|c| c.to_rgb_array()).collect();
            self.push_accessor(
                &f32_bytes(&flat),
                ComponentType::Float,
                AccessorType::Vec3,
                values.len(),
                None,
                None,
                target,
            )
        }
    }

    /// Index accessors narrow to u16 when every index fits
    pub(crate) fn export_index_accessor(&mut self, indices: &[u32]) -> AccessorId {
        let fits_u16 = indices.iter().all(|&i| i <= u16::MAX as u32);
        if fits_u16 {
            let bytes: Vec<u8> = indices
                .iter()
                .flat_map(|&i| (i as u16).to_le_bytes())
                .collect();
            self.push_accessor(
                &bytes,
                ComponentType::UnsignedShort,
                AccessorType::Scalar,
                indices.len(),
                None,
                None,
                Some(BufferViewTarget::ElementArrayBuffer),
            )
        } else {
            let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
            self.push_accessor(
                &bytes,
                ComponentType::UnsignedInt,
                AccessorType::Scalar,
                indices.len(),
                None,
                None,
                Some(BufferViewTarget::ElementArrayBuffer),
            )
        }
    }

    /// Sparse VEC3 export for morph-target position deltas.
    ///
    /// Only the non-zero elements are stored; the base array is implicit
    /// zeros, so no base buffer view is written. Returns `None` when every
    /// delta is zero (the target contributes nothing).
    pub(crate) fn export_sparse_vec3_accessor(&mut self, deltas: &[Vec3]) -> Option<AccessorId> {
        let nonzero: Vec<(u32, Vec3)> = deltas
            .iter()
            .enumerate()
            .filter(|(_, d)| **d != Vec3::ZERO)
            .map(|(i, d)| (i as u32, *d))
            .collect();
        if nonzero.is_empty() {
            return None;
        }

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for d in deltas {
            let a = d.to_array();
            for i in 0..3 {
                min[i] = min[i].min(a[i]);
                max[i] = max[i].max(a[i]);
            }
        }

        let index_offset = self.buffer.pad_to(4);
        let index_bytes: Vec<u8> = nonzero.iter().flat_map(|(i, _)| i.to_le_bytes()).collect();
        self.buffer.extend(&index_bytes);
        let indices_view = BufferViewId(self.root.buffer_views.len());
        self.root.buffer_views.push(BufferView {
            buffer: BufferId(0),
            byte_offset: index_offset,
            byte_length: index_bytes.len(),
            byte_stride: None,
            target: None,
            name: None,
        });

        let value_offset = self.buffer.pad_to(4);
        let flat: Vec<f32> = nonzero.iter().flat_map(|(_, d)| d.to_array()).collect();
        let value_bytes = f32_bytes(&flat);
        self.buffer.extend(&value_bytes);
        let values_view = BufferViewId(self.root.buffer_views.len());
        self.root.buffer_views.push(BufferView {
            buffer: BufferId(0),
            byte_offset: value_offset,
            byte_length: value_bytes.len(),
            byte_stride: None,
            target: None,
            name: None,
        });

        let accessor_id = AccessorId(self.root.accessors.len());
        self.root.accessors.push(Accessor {
            buffer_view: None,
            byte_offset: 0,
            component_type: ComponentType::Float,
            normalized: false,
            count: deltas.len(),
            accessor_type: AccessorType::Vec3,
            max: Some(max.to_vec()),
            min: Some(min.to_vec()),
            sparse: Some(AccessorSparse {
                count: nonzero.len(),
                indices: SparseIndices {
                    buffer_view: indices_view,
                    byte_offset: 0,
                    component_type: ComponentType::UnsignedInt,
                },
                values: SparseValues {
                    buffer_view: values_view,
                    byte_offset: 0,
                },
            }),
            name: None,
        });
        Some(accessor_id)
    }
}
