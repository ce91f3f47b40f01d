//! Buffer and image resolution
//!
//! All buffers resolve first, then all images, before any geometry build
//! begins. Each resolves from one of three sources: an external URI through
//! the [`ResourceLoader`], an inline base64 data URI, or (for buffers with no
//! URI) the GLB binary chunk; images may also reference a buffer view.

use tracing::warn;

use gltfforge_core::Pixels;
use gltfforge_schema::uri;

use crate::cache::DecodedImage;
use crate::scene::ImportSession;
use crate::{ImportError, ImportResult};

/// URI to bytes. The importer never touches the filesystem or network
/// directly; callers supply the policy (and their own timeouts).
pub trait ResourceLoader {
    fn load(&self, uri: &str) -> std::io::Result<Vec<u8>>;
}

/// Resolves URIs relative to a base directory
pub struct FileLoader {
    base: std::path::PathBuf,
}

impl FileLoader {
    pub fn new(base: impl Into<std::path::PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl ResourceLoader for FileLoader {
    fn load(&self, uri: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.base.join(uri))
    }
}

/// Rejects every external URI; for self-contained GLB payloads
pub struct NullLoader;

impl ResourceLoader for NullLoader {
    fn load(&self, uri: &str) -> std::io::Result<Vec<u8>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("no loader available for external uri: {uri}"),
        ))
    }
}

impl ImportSession<'_> {
    /// Resolve every buffer into the session cache. Failure here is fatal:
    /// geometry cannot be built from missing bytes.
    pub(crate) fn resolve_buffers(&mut self) -> ImportResult<()> {
        for index in 0..self.root.buffers.len() {
            let buffer = &self.root.buffers[index];
            let data = match &buffer.uri {
                Some(uri) if uri::is_data_uri(uri) => uri::decode_data_uri(uri)?,
                Some(uri) => self.loader.load(uri).map_err(|e| {
                    ImportError::BufferResolution {
                        index,
                        reason: e.to_string(),
                    }
                })?,
                // no URI: GLB binary chunk
                None => {
                    self.glb_bin
                        .clone()
                        .ok_or_else(|| ImportError::BufferResolution {
                            index,
                            reason: "buffer has no uri and no GLB chunk is present".to_string(),
                        })?
                }
            };
            if data.len() < buffer.byte_length {
                return Err(ImportError::BufferResolution {
                    index,
                    reason: format!(
                        "resolved {} bytes, buffer declares {}",
                        data.len(),
                        buffer.byte_length
                    ),
                });
            }
            self.cache.buffers.push(data);
        }
        Ok(())
    }

    /// Resolve and decode every image. An unreadable image is recoverable:
    /// the slot stays empty and textures referencing it are skipped with a
    /// warning.
    pub(crate) fn resolve_images(&mut self) -> ImportResult<()> {
        for index in 0..self.root.images.len() {
            let image = self.root.images[index].clone();
            let bytes: Option<Vec<u8>> = if let Some(uri) = &image.uri {
                if uri::is_data_uri(uri) {
                    match uri::decode_data_uri(uri) {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            warn!(image = index, error = %e, "invalid image data uri, skipping");
                            None
                        }
                    }
                } else {
                    match self.loader.load(uri) {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            warn!(image = index, uri = %uri, error = %e, "image load failed, skipping");
                            None
                        }
                    }
                }
            } else if let Some(view_id) = image.buffer_view {
                self.view_bytes(view_id.index()).map(|b| b.to_vec())
            } else {
                warn!(image = index, "image has neither uri nor bufferView, skipping");
                None
            };

            let decoded = bytes.and_then(|bytes| match image::load_from_memory(&bytes) {
                Ok(img) => Some(decode_dynamic(img)),
                Err(e) => {
                    warn!(image = index, error = %e, "image decode failed, skipping");
                    None
                }
            });
            self.cache.images.push(decoded);
        }
        Ok(())
    }

    /// Byte range of a buffer view within its resolved buffer
    pub(crate) fn view_bytes(&self, view_index: usize) -> Option<&[u8]> {
        let view = self.root.buffer_views.get(view_index)?;
        let buffer = self.cache.buffers.get(view.buffer.index())?;
        buffer.get(view.byte_offset..view.byte_offset + view.byte_length)
    }
}

fn decode_dynamic(img: image::DynamicImage) -> DecodedImage {
    use image::DynamicImage;
    let width = img.width();
    let height = img.height();
    let pixels = match &img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            Pixels::RgbaF32(img.to_rgba32f().into_raw())
        }
        _ => Pixels::Rgba8(img.to_rgba8().into_raw()),
    };
    DecodedImage {
        width,
        height,
        pixels,
    }
}
