//! Accessor reading
//!
//! Turns (accessor, buffer view, buffer bytes) triples into strongly-typed
//! arrays: stride-aware little-endian decoding, unsigned/signed normalized
//! rescale, and sparse override application on top of the (possibly
//! implicit all-zero) base array. Alignment and bounds invariants are
//! checked before any byte is touched.

use gltfforge_core::convert::{
    convert_direction, convert_position, convert_tangent, convert_uv, flip_triangle_winding,
};
use gltfforge_core::{Color, Vec2, Vec3, Vec4};
use gltfforge_schema::mesh::semantic;
use gltfforge_schema::{Accessor, AccessorType, ComponentType, DrawMode, GltfRoot, MeshPrimitive};

use crate::cache::{MorphTargetAttributes, PrimitiveAttributes};
use crate::{ImportError, ImportResult};

/// Reads typed arrays out of resolved buffers. Free of session state so the
/// parallel pre-pass can use it from worker threads.
pub(crate) struct AccessorReader<'a> {
    pub root: &'a GltfRoot,
    pub buffers: &'a [Vec<u8>],
}

impl AccessorReader<'_> {
    fn accessor(&self, index: usize) -> ImportResult<&Accessor> {
        self.root.accessors.get(index).ok_or_else(|| {
            ImportError::InvalidDocument(format!("accessor {index} out of range"))
        })
    }

    fn view_slice(&self, view_index: usize) -> ImportResult<&[u8]> {
        let view = self.root.buffer_views.get(view_index).ok_or_else(|| {
            ImportError::InvalidDocument(format!("buffer view {view_index} out of range"))
        })?;
        let buffer = self.buffers.get(view.buffer.index()).ok_or_else(|| {
            ImportError::InvalidDocument(format!("buffer {} out of range", view.buffer))
        })?;
        buffer
            .get(view.byte_offset..view.byte_offset + view.byte_length)
            .ok_or_else(|| {
                ImportError::InvalidDocument(format!(
                    "buffer view {view_index} exceeds buffer bounds"
                ))
            })
    }

    /// Read an accessor's elements as flattened f32 components, applying
    /// normalization and the sparse overlay
    pub fn read_f32_elements(&self, index: usize) -> ImportResult<Vec<f32>> {
        let accessor = self.accessor(index)?.clone();
        let components = accessor.accessor_type.component_count();
        let component_size = accessor.component_type.size();
        let mut out = vec![0.0f32; accessor.count * components];

        if let Some(view_id) = accessor.buffer_view {
            let view = self.root.buffer_views.get(view_id.index()).ok_or_else(|| {
                ImportError::InvalidDocument(format!("buffer view {view_id} out of range"))
            })?;
            accessor.validate(index, view)?;
            let bytes = self.view_slice(view_id.index())?;
            let stride = view.byte_stride.unwrap_or(accessor.element_size());

            for element in 0..accessor.count {
                let base = accessor.byte_offset + element * stride;
                for component in 0..components {
                    let offset = base + component * component_size;
                    out[element * components + component] = read_component_f32(
                        bytes,
                        offset,
                        accessor.component_type,
                        accessor.normalized,
                    )?;
                }
            }
        }

        if let Some(sparse) = &accessor.sparse {
            let indices = {
                let bytes = self.view_slice(sparse.indices.buffer_view.index())?;
                let size = sparse.indices.component_type.size();
                let mut indices = Vec::with_capacity(sparse.count);
                for k in 0..sparse.count {
                    let offset = sparse.indices.byte_offset + k * size;
                    indices.push(read_component_u32(bytes, offset, sparse.indices.component_type)?);
                }
                indices
            };

            let bytes = self.view_slice(sparse.values.buffer_view.index())?;
            for (k, &element) in indices.iter().enumerate() {
                let element = element as usize;
                if element >= accessor.count {
                    return Err(ImportError::InvalidDocument(format!(
                        "sparse index {element} exceeds accessor count {}",
                        accessor.count
                    )));
                }
                for component in 0..components {
                    let offset =
                        sparse.values.byte_offset + (k * components + component) * component_size;
                    out[element * components + component] = read_component_f32(
                        bytes,
                        offset,
                        accessor.component_type,
                        accessor.normalized,
                    )?;
                }
            }
        }

        Ok(out)
    }

    /// Read an index accessor. Only unsigned integer component types are
    /// legal for indices.
    pub fn read_indices(&self, index: usize) -> ImportResult<Vec<u32>> {
        let accessor = self.accessor(index)?.clone();
        let Some(view_id) = accessor.buffer_view else {
            return Ok(vec![0; accessor.count]);
        };
        let view = self.root.buffer_views.get(view_id.index()).ok_or_else(|| {
            ImportError::InvalidDocument(format!("buffer view {view_id} out of range"))
        })?;
        accessor.validate(index, view)?;

        if !matches!(
            accessor.component_type,
            ComponentType::UnsignedByte | ComponentType::UnsignedShort | ComponentType::UnsignedInt
        ) {
            return Err(ImportError::InvalidDocument(format!(
                "index accessor {index} uses non-unsigned component type"
            )));
        }

        let bytes = self.view_slice(view_id.index())?;
        let size = accessor.component_type.size();
        let stride = view.byte_stride.unwrap_or(size);
        let mut out = Vec::with_capacity(accessor.count);
        for element in 0..accessor.count {
            let offset = accessor.byte_offset + element * stride;
            out.push(read_component_u32(bytes, offset, accessor.component_type)?);
        }
        Ok(out)
    }

    pub fn read_vec2(&self, index: usize) -> ImportResult<Vec<Vec2>> {
        let flat = self.read_f32_elements(index)?;
        Ok(flat.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect())
    }

    pub fn read_vec3(&self, index: usize) -> ImportResult<Vec<Vec3>> {
        let flat = self.read_f32_elements(index)?;
        Ok(flat
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect())
    }

    pub fn read_vec4(&self, index: usize) -> ImportResult<Vec<Vec4>> {
        let flat = self.read_f32_elements(index)?;
        Ok(flat
            .chunks_exact(4)
            .map(|c| Vec4::new(c[0], c[1], c[2], c[3]))
            .collect())
    }

    /// COLOR_0 may be VEC3 or VEC4; missing alpha fills with 1.0
    pub fn read_colors(&self, index: usize) -> ImportResult<Vec<Color>> {
        let accessor_type = self.accessor(index)?.accessor_type;
        let flat = self.read_f32_elements(index)?;
        Ok(match accessor_type {
            AccessorType::Vec3 => flat
                .chunks_exact(3)
                .map(|c| Color::rgb(c[0], c[1], c[2]))
                .collect(),
            _ => flat
                .chunks_exact(4)
                .map(|c| Color::new(c[0], c[1], c[2], c[3]))
                .collect(),
        })
    }
}

fn byte_at(bytes: &[u8], offset: usize, size: usize) -> ImportResult<&[u8]> {
    bytes.get(offset..offset + size).ok_or_else(|| {
        ImportError::InvalidDocument(format!("accessor read past end of buffer view at {offset}"))
    })
}

fn read_component_f32(
    bytes: &[u8],
    offset: usize,
    component_type: ComponentType,
    normalized: bool,
) -> ImportResult<f32> {
    let raw = byte_at(bytes, offset, component_type.size())?;
    Ok(match component_type {
        ComponentType::Float => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        ComponentType::UnsignedByte => {
            let v = raw[0] as f32;
            if normalized {
                v / 255.0
            } else {
                v
            }
        }
        ComponentType::Byte => {
            let v = raw[0] as i8 as f32;
            if normalized {
                (v / 127.0).max(-1.0)
            } else {
                v
            }
        }
        ComponentType::UnsignedShort => {
            let v = u16::from_le_bytes([raw[0], raw[1]]) as f32;
            if normalized {
                v / 65535.0
            } else {
                v
            }
        }
        ComponentType::Short => {
            let v = i16::from_le_bytes([raw[0], raw[1]]) as f32;
            if normalized {
                (v / 32767.0).max(-1.0)
            } else {
                v
            }
        }
        ComponentType::UnsignedInt => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f32,
    })
}

fn read_component_u32(
    bytes: &[u8],
    offset: usize,
    component_type: ComponentType,
) -> ImportResult<u32> {
    let raw = byte_at(bytes, offset, component_type.size())?;
    Ok(match component_type {
        ComponentType::UnsignedByte => raw[0] as u32,
        ComponentType::UnsignedShort => u16::from_le_bytes([raw[0], raw[1]]) as u32,
        ComponentType::UnsignedInt => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        other => {
            return Err(ImportError::InvalidDocument(format!(
                "unexpected component type {:?} for integer read",
                other
            )))
        }
    })
}

/// Build the CPU-side attribute arrays for one primitive, applying the
/// coordinate conversion and winding flip at this boundary. Safe to call
/// from worker threads; touches only the document and resolved buffers.
pub(crate) fn build_primitive_attributes(
    root: &GltfRoot,
    buffers: &[Vec<u8>],
    mesh_index: usize,
    prim_index: usize,
) -> ImportResult<PrimitiveAttributes> {
    let reader = AccessorReader { root, buffers };
    let primitive: &MeshPrimitive = root
        .meshes
        .get(mesh_index)
        .and_then(|m| m.primitives.get(prim_index))
        .ok_or_else(|| {
            ImportError::InvalidDocument(format!(
                "primitive ({mesh_index}, {prim_index}) out of range"
            ))
        })?;

    match primitive.mode {
        DrawMode::Points | DrawMode::Lines | DrawMode::LineStrip | DrawMode::Triangles => {}
        mode => return Err(ImportError::UnsupportedDrawMode { mode }),
    }

    let mut attrs = PrimitiveAttributes {
        mode: primitive.mode,
        ..Default::default()
    };

    if let Some(id) = primitive.attributes.get(semantic::POSITION) {
        attrs.positions = reader
            .read_vec3(id.index())?
            .into_iter()
            .map(convert_position)
            .collect();
    }
    if let Some(id) = primitive.attributes.get(semantic::NORMAL) {
        attrs.normals = reader
            .read_vec3(id.index())?
            .into_iter()
            .map(convert_direction)
            .collect();
    }
    if let Some(id) = primitive.attributes.get(semantic::TANGENT) {
        attrs.tangents = reader
            .read_vec4(id.index())?
            .into_iter()
            .map(convert_tangent)
            .collect();
    }
    if let Some(id) = primitive.attributes.get(semantic::TEXCOORD_0) {
        attrs.uv0 = reader
            .read_vec2(id.index())?
            .into_iter()
            .map(convert_uv)
            .collect();
    }
    if let Some(id) = primitive.attributes.get(semantic::TEXCOORD_1) {
        attrs.uv1 = reader
            .read_vec2(id.index())?
            .into_iter()
            .map(convert_uv)
            .collect();
    }
    if let Some(id) = primitive.attributes.get(semantic::COLOR_0) {
        attrs.colors = reader.read_colors(id.index())?;
    }

    attrs.indices = match primitive.indices {
        Some(id) => reader.read_indices(id.index())?,
        // fall back to a generated sequential index list
        None => MeshPrimitive::generate_indices(attrs.positions.len()),
    };
    if primitive.mode == DrawMode::Triangles {
        flip_triangle_winding(&mut attrs.indices);
    }

    if let Some(targets) = &primitive.targets {
        for target in targets {
            let mut morph = MorphTargetAttributes::default();
            if let Some(id) = target.get(semantic::POSITION) {
                morph.delta_positions = reader
                    .read_vec3(id.index())?
                    .into_iter()
                    .map(convert_position)
                    .collect();
            }
            if let Some(id) = target.get(semantic::NORMAL) {
                morph.delta_normals = reader
                    .read_vec3(id.index())?
                    .into_iter()
                    .map(convert_direction)
                    .collect();
            }
            if let Some(id) = target.get(semantic::TANGENT) {
                morph.delta_tangents = reader
                    .read_vec3(id.index())?
                    .into_iter()
                    .map(convert_direction)
                    .collect();
            }
            attrs.targets.push(morph);
        }
    }

    Ok(attrs)
}
