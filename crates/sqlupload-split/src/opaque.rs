//! Opaque payload packager
//!
//! Everything that is neither markup nor script is stored byte for byte.

use crate::SplitResult;
use crate::mime::{FALLBACK_CONTENT_TYPE, content_type_for};

/// Wrap `bytes` unmodified as a payload with `stub` as its shell.
///
/// The content type comes from the extension table, then from
/// `declared_content_type`, then falls back to `application/octet-stream`.
pub fn package(
    bytes: &[u8],
    stub: &str,
    extension: &str,
    declared_content_type: Option<&str>,
) -> SplitResult {
    let content_type = content_type_for(extension)
        .or(declared_content_type.filter(|ct| !ct.trim().is_empty()))
        .unwrap_or(FALLBACK_CONTENT_TYPE);

    SplitResult {
        shell: Some(stub.to_string()),
        payload: bytes.to_vec(),
        content_type: content_type.to_string(),
    }
}
