//! Document parsing and validation errors

use thiserror::Error;

/// Errors raised while reading or validating a glTF document
#[derive(Error, Debug)]
pub enum GltfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid magic bytes: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("Unsupported GLB container version: {version} (supported: 2)")]
    UnsupportedVersion { version: u32 },

    #[error("Truncated GLB container at offset {offset}")]
    Truncated { offset: usize },

    #[error("Unknown GLB chunk type: 0x{chunk_type:08X}")]
    UnknownChunkType { chunk_type: u32 },

    #[error("Unknown accessor component type: {0}")]
    UnknownComponentType(u32),

    #[error(
        "Accessor {accessor} out of bounds: needs {required} bytes at offset {offset}, \
         buffer view holds {available}"
    )]
    AccessorBounds {
        accessor: usize,
        offset: usize,
        required: usize,
        available: usize,
    },

    #[error("Accessor {accessor} byte offset {offset} is not aligned to component size {component_size}")]
    AccessorAlignment {
        accessor: usize,
        offset: usize,
        component_size: usize,
    },

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// Result type for schema operations
pub type GltfResult<T> = Result<T, GltfError>;
