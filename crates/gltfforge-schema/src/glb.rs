//! GLB binary container
//!
//! Layout: 12-byte header (magic "glTF", version 2, total length), a JSON
//! chunk, and an optional binary chunk. Chunks are 4-byte aligned; the JSON
//! chunk is padded with spaces, the binary chunk with zeros.

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{GltfError, GltfResult};

/// "glTF" magic bytes
pub const GLB_MAGIC: [u8; 4] = *b"glTF";
/// "JSON" chunk type
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
/// "BIN\0" chunk type
pub const CHUNK_BIN: u32 = 0x004E_4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// A split GLB container: JSON chunk bytes plus the optional binary chunk
#[derive(Debug, Clone, Default)]
pub struct Glb {
    pub json: Vec<u8>,
    pub bin: Option<Vec<u8>>,
}

impl Glb {
    /// Whether the byte slice starts with the GLB magic
    pub fn sniff(data: &[u8]) -> bool {
        data.len() >= 4 && data[..4] == GLB_MAGIC
    }

    /// Parse a GLB container. A malformed header is a fatal error.
    pub fn parse(data: &[u8]) -> GltfResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(GltfError::Truncated { offset: data.len() });
        }
        if data[..4] != GLB_MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(&data[..4]);
            return Err(GltfError::InvalidMagic {
                expected: GLB_MAGIC,
                found,
            });
        }

        let mut cursor = Cursor::new(&data[4..HEADER_LEN]);
        let version = cursor.read_u32::<LittleEndian>()?;
        if version != 2 {
            return Err(GltfError::UnsupportedVersion { version });
        }
        let total_length = cursor.read_u32::<LittleEndian>()? as usize;
        if total_length > data.len() {
            return Err(GltfError::Truncated { offset: data.len() });
        }

        let mut json = None;
        let mut bin = None;
        let mut offset = HEADER_LEN;
        while offset + CHUNK_HEADER_LEN <= total_length {
            let mut cursor = Cursor::new(&data[offset..offset + CHUNK_HEADER_LEN]);
            let chunk_length = cursor.read_u32::<LittleEndian>()? as usize;
            let chunk_type = cursor.read_u32::<LittleEndian>()?;
            let body_start = offset + CHUNK_HEADER_LEN;
            let body_end = body_start + chunk_length;
            if body_end > total_length {
                return Err(GltfError::Truncated { offset: body_start });
            }

            let body = &data[body_start..body_end];
            match chunk_type {
                CHUNK_JSON => json = Some(body.to_vec()),
                CHUNK_BIN => bin = Some(body.to_vec()),
                other => {
                    // Unknown chunks after the first two are skippable per
                    // spec, but a document leading with one is malformed.
                    if json.is_none() {
                        return Err(GltfError::UnknownChunkType { chunk_type: other });
                    }
                }
            }
            offset = body_end;
        }

        let json = json.ok_or(GltfError::Truncated { offset })?;
        Ok(Self { json, bin })
    }

    /// Write the container, padding each chunk to a 4-byte boundary
    pub fn write<W: Write>(&self, mut writer: W) -> GltfResult<()> {
        let json_padding = padding_for(self.json.len());
        let bin_padding = self.bin.as_ref().map(|b| padding_for(b.len())).unwrap_or(0);

        let mut total = HEADER_LEN + CHUNK_HEADER_LEN + self.json.len() + json_padding;
        if let Some(bin) = &self.bin {
            total += CHUNK_HEADER_LEN + bin.len() + bin_padding;
        }

        writer.write_all(&GLB_MAGIC)?;
        writer.write_u32::<LittleEndian>(2)?;
        writer.write_u32::<LittleEndian>(total as u32)?;

        writer.write_u32::<LittleEndian>((self.json.len() + json_padding) as u32)?;
        writer.write_u32::<LittleEndian>(CHUNK_JSON)?;
        writer.write_all(&self.json)?;
        for _ in 0..json_padding {
            writer.write_all(&[0x20])?;
        }

        if let Some(bin) = &self.bin {
            writer.write_u32::<LittleEndian>((bin.len() + bin_padding) as u32)?;
            writer.write_u32::<LittleEndian>(CHUNK_BIN)?;
            writer.write_all(bin)?;
            for _ in 0..bin_padding {
                writer.write_all(&[0x00])?;
            }
        }

        Ok(())
    }

    /// Serialize to a byte vector
    pub fn to_vec(&self) -> GltfResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }
}

fn padding_for(length: usize) -> usize {
    (4 - (length % 4)) % 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let glb = Glb {
            json: br#"{"asset":{"version":"2.0"}}"#.to_vec(),
            bin: Some(vec![1, 2, 3, 4, 5]),
        };
        let bytes = glb.to_vec().unwrap();
        assert_eq!(&bytes[..4], b"glTF");
        assert_eq!(bytes.len() % 4, 0);

        let parsed = Glb::parse(&bytes).unwrap();
        // JSON chunk keeps its space padding; trim before comparing
        let json_str = String::from_utf8(parsed.json).unwrap();
        assert_eq!(json_str.trim_end(), r#"{"asset":{"version":"2.0"}}"#);
        let bin = parsed.bin.unwrap();
        assert_eq!(&bin[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let err = Glb::parse(b"notGLTF_container").unwrap_err();
        assert!(matches!(err, GltfError::InvalidMagic { .. }));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = Glb {
            json: b"{}".to_vec(),
            bin: None,
        }
        .to_vec()
        .unwrap();
        bytes[4] = 3; // bump the version field
        let err = Glb::parse(&bytes).unwrap_err();
        assert!(matches!(err, GltfError::UnsupportedVersion { version: 3 }));
    }

    #[test]
    fn test_truncated_container() {
        let bytes = Glb {
            json: b"{}".to_vec(),
            bin: None,
        }
        .to_vec()
        .unwrap();
        assert!(Glb::parse(&bytes[..10]).is_err());
    }
}
