//! base64 data-URI helpers for embedded buffers and images

use crate::error::{GltfError, GltfResult};

const BASE64_MARKER: &str = ";base64,";

/// Whether a buffer/image URI carries inline data
pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Decode a `data:<mime>;base64,<payload>` URI
pub fn decode_data_uri(uri: &str) -> GltfResult<Vec<u8>> {
    if !is_data_uri(uri) {
        return Err(GltfError::InvalidDataUri("missing data: prefix".to_string()));
    }
    let payload_start = uri
        .find(BASE64_MARKER)
        .map(|i| i + BASE64_MARKER.len())
        .ok_or_else(|| GltfError::InvalidDataUri("missing ;base64, marker".to_string()))?;
    base64::decode(&uri[payload_start..])
        .map_err(|e| GltfError::InvalidDataUri(e.to_string()))
}

/// Encode bytes as a base64 data URI with the given MIME type
pub fn encode_data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{mime};base64,{}", base64::encode(data))
}
