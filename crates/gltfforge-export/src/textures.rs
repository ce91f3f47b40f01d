//! Texture export
//!
//! Each texture is exported per usage slot: the slot decides the channel
//! conversion (metal/gloss repack, normal reconstruction), the colorspace,
//! and the encoded format. Encoded bytes are embedded in the session buffer
//! behind a buffer view, so the document needs no external image files.
//! Identity for dedup is (source texture, slot); the same source used as a
//! base color map and as a normal map becomes two glTF textures.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgba32FImage, RgbaImage};
use tracing::warn;

use gltfforge_core::{FilterSource, Pixels, TextureSource, WrapSource};
use gltfforge_schema::extensions::ExtTextureExr;
use gltfforge_schema::{
    BufferId, BufferView, BufferViewId, FilterMode, Image, ImageId, Sampler, SamplerId, Texture,
    TextureId, WrapMode,
};

use crate::cache::UniqueTexture;
use crate::{ExportResult, GltfExporter};

/// Usage slot of an exported texture; part of the dedup identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// sRGB, alpha preserved
    BaseColor,
    /// Linear, already in glTF channel layout (roughness G, metal B)
    MetallicRoughness,
    /// Linear, engine layout (metal R, gloss A); repacked on export
    MetallicGloss,
    /// Linear, reconstructed from the engine's AG storage
    Normal,
    /// Linear occlusion in R
    Occlusion,
    /// sRGB
    Emissive,
    /// Float pixels encoded as EXR with EXT_texture_exr
    Hdr,
}

impl TextureSlot {
    /// Whether this slot holds linear data. Base color and emissive are
    /// sRGB; everything else must not be gamma-encoded.
    pub fn is_linear(self) -> bool {
        !matches!(self, TextureSlot::BaseColor | TextureSlot::Emissive)
    }

    /// Whether alpha can matter for this slot's encoded image
    fn alpha_matters(self) -> bool {
        matches!(self, TextureSlot::BaseColor | TextureSlot::Hdr)
    }
}

impl GltfExporter<'_> {
    pub(crate) fn export_texture(
        &mut self,
        texture: usize,
        slot: TextureSlot,
    ) -> ExportResult<Option<TextureId>> {
        let slot = if self
            .source
            .textures
            .get(texture)
            .map(|t| t.pixels.is_hdr())
            .unwrap_or(false)
        {
            TextureSlot::Hdr
        } else {
            slot
        };

        let key = UniqueTexture { texture, slot };
        if let Some(&id) = self.texture_cache.get(&key) {
            return Ok(Some(id));
        }

        let source = self.source;
        let Some(tex_src) = source.textures.get(texture) else {
            warn!(texture, "texture index out of range, skipping");
            return Ok(None);
        };
        let expected = tex_src.width as usize * tex_src.height as usize * 4;
        let actual = match &tex_src.pixels {
            Pixels::Rgba8(data) => data.len(),
            Pixels::RgbaF32(data) => data.len(),
        };
        if expected == 0 || actual != expected {
            warn!(texture = %tex_src.name, expected, actual, "texture pixel data size mismatch, skipping");
            return Ok(None);
        }

        let image_id = self.export_image(tex_src, slot)?;
        let sampler_id = self.export_sampler(tex_src);

        let mut gltf_texture = Texture {
            name: if self.options.export_names && !tex_src.name.is_empty() {
                Some(tex_src.name.clone())
            } else {
                None
            },
            sampler: Some(sampler_id),
            source: Some(image_id),
            ..Default::default()
        };

        if slot == TextureSlot::Hdr {
            gltf_texture
                .extensions
                .insert(Box::new(ExtTextureExr::new(image_id)));
            self.root.declare_extension(ExtTextureExr::NAME, false);
        }

        let id = TextureId(self.root.textures.len());
        self.root.textures.push(gltf_texture);
        self.texture_cache.insert(key, id);
        Ok(Some(id))
    }

    /// Encode pixels per slot and embed them behind a buffer view
    fn export_image(&mut self, tex_src: &TextureSource, slot: TextureSlot) -> ExportResult<ImageId> {
        let (bytes, mime_type) = if slot == TextureSlot::Hdr {
            (encode_exr(tex_src)?, "image/x-exr")
        } else {
            let mut img = to_rgba_image(tex_src);
            match slot {
                TextureSlot::MetallicGloss => repack_metal_gloss(&mut img),
                TextureSlot::Normal => repack_normal(&mut img),
                _ => {}
            }

            // JPEG only for gamma-encoded slots that carry no alpha; linear
            // data streams always keep lossless PNG
            let use_jpeg = self.options.texture_file_type_heuristic
                && !slot.is_linear()
                && !(slot.alpha_matters() && has_alpha(&img));
            if use_jpeg {
                (encode_jpeg(&img, self.options.jpeg_quality)?, "image/jpeg")
            } else {
                (encode_png(&img)?, "image/png")
            }
        };

        let offset = self.buffer.pad_to(4);
        self.buffer.extend(&bytes);
        let view_id = BufferViewId(self.root.buffer_views.len());
        self.root.buffer_views.push(BufferView {
            buffer: BufferId(0),
            byte_offset: offset,
            byte_length: bytes.len(),
            byte_stride: None,
            target: None,
            name: None,
        });

        let id = ImageId(self.root.images.len());
        self.root.images.push(Image {
            name: if self.options.export_names && !tex_src.name.is_empty() {
                Some(tex_src.name.clone())
            } else {
                None
            },
            uri: None,
            mime_type: Some(mime_type.to_string()),
            buffer_view: Some(view_id),
        });
        Ok(id)
    }

    fn export_sampler(&mut self, tex_src: &TextureSource) -> SamplerId {
        let wrap = match tex_src.wrap {
            WrapSource::Repeat => WrapMode::Repeat,
            WrapSource::Clamp => WrapMode::ClampToEdge,
            WrapSource::Mirror => WrapMode::MirroredRepeat,
        };
        let filter = match tex_src.filter {
            FilterSource::Nearest => FilterMode::Nearest,
            FilterSource::Linear => FilterMode::Linear,
        };

        let key = (wrap.code(), filter.code());
        if let Some(&id) = self.sampler_cache.get(&key) {
            return id;
        }

        let id = SamplerId(self.root.samplers.len());
        self.root.samplers.push(Sampler {
            mag_filter: Some(filter),
            min_filter: Some(filter),
            wrap_s: wrap,
            wrap_t: wrap,
        });
        self.sampler_cache.insert(key, id);
        id
    }
}

fn to_rgba_image(tex_src: &TextureSource) -> RgbaImage {
    let data = match &tex_src.pixels {
        Pixels::Rgba8(data) => data.clone(),
        Pixels::RgbaF32(data) => data
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect(),
    };
    // length was validated by the caller
    RgbaImage::from_raw(tex_src.width, tex_src.height, data)
        .unwrap_or_else(|| RgbaImage::new(tex_src.width.max(1), tex_src.height.max(1)))
}

fn has_alpha(img: &RgbaImage) -> bool {
    img.pixels().any(|p| p[3] != 255)
}

/// Engine metal/gloss to glTF metal/roughness: metal moves from R to B,
/// gloss inverts from A into the roughness G channel.
fn repack_metal_gloss(img: &mut RgbaImage) {
    for pixel in img.pixels_mut() {
        let metal = pixel[0];
        let gloss = pixel[3];
        pixel[0] = 255;
        pixel[1] = 255 - gloss;
        pixel[2] = metal;
        pixel[3] = 255;
    }
}

/// Engine two-channel normal storage (X in A, Y in G) back to a full RGB
/// normal map with reconstructed Z
fn repack_normal(img: &mut RgbaImage) {
    for pixel in img.pixels_mut() {
        let x = pixel[3] as f32 / 255.0 * 2.0 - 1.0;
        let y = pixel[1] as f32 / 255.0 * 2.0 - 1.0;
        let z = (1.0 - x * x - y * y).max(0.0).sqrt();
        pixel[0] = ((x * 0.5 + 0.5) * 255.0).round() as u8;
        pixel[1] = ((y * 0.5 + 0.5) * 255.0).round() as u8;
        pixel[2] = ((z * 0.5 + 0.5) * 255.0).round() as u8;
        pixel[3] = 255;
    }
}

fn encode_png(img: &RgbaImage) -> ExportResult<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn encode_jpeg(img: &RgbaImage, quality: u8) -> ExportResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut Cursor::new(&mut bytes), quality).encode_image(&rgb)?;
    Ok(bytes)
}

fn encode_exr(tex_src: &TextureSource) -> ExportResult<Vec<u8>> {
    let data = match &tex_src.pixels {
        Pixels::RgbaF32(data) => data.clone(),
        Pixels::Rgba8(data) => data.iter().map(|v| *v as f32 / 255.0).collect(),
    };
    let img = Rgba32FImage::from_raw(tex_src.width, tex_src.height, data)
        .unwrap_or_else(|| Rgba32FImage::new(tex_src.width.max(1), tex_src.height.max(1)));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba32F(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::OpenExr)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repack_metal_gloss() {
        let mut img = RgbaImage::from_raw(1, 1, vec![200, 0, 0, 60]).unwrap();
        repack_metal_gloss(&mut img);
        let pixel = img.get_pixel(0, 0);
        assert_eq!(pixel[1], 195); // roughness = 255 - gloss
        assert_eq!(pixel[2], 200); // metal moved to B
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn test_repack_normal_reconstructs_z() {
        // flat normal: x = 0, y = 0 stored as A = 128, G = 128
        let mut img = RgbaImage::from_raw(1, 1, vec![0, 128, 0, 128]).unwrap();
        repack_normal(&mut img);
        let pixel = img.get_pixel(0, 0);
        // z should be ~1.0 -> encoded near 255
        assert!(pixel[2] > 250);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn test_has_alpha() {
        let opaque = RgbaImage::from_raw(1, 1, vec![1, 2, 3, 255]).unwrap();
        assert!(!has_alpha(&opaque));
        let cutout = RgbaImage::from_raw(1, 1, vec![1, 2, 3, 0]).unwrap();
        assert!(has_alpha(&cutout));
    }
}
