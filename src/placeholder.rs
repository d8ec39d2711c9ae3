//! Inline low-quality image placeholders.
//!
//! A placeholder is the whole source re-encoded as a heavily compressed WebP
//! and inlined as a `data:` URI, so the frontend can paint something blurry
//! before the real variant arrives. It is computed fresh on every call and
//! never written to storage.

use crate::imaging::{ImageBackend, Quality};
use crate::storage::{MediaStorage, SourceImage};
use base64::{Engine as _, engine::general_purpose};
use tracing::warn;

pub const DATA_URI_PREFIX: &str = "data:image/webp;base64,";

/// Encode `source` as a base64 WebP data URI at `quality`.
///
/// Returns `None` when there is no source or it can't be read or decoded;
/// failures are logged, never returned.
pub fn encode_placeholder(
    backend: &impl ImageBackend,
    storage: &MediaStorage,
    source: Option<&SourceImage>,
    quality: Quality,
) -> Option<String> {
    let source = source?;
    let path = match storage.path(&source.path) {
        Ok(p) if p.is_file() => p,
        Ok(_) => {
            warn!(source = %source.path, "placeholder skipped: source file missing");
            return None;
        }
        Err(e) => {
            warn!(source = %source.path, error = %e, "placeholder skipped");
            return None;
        }
    };

    match backend.placeholder(&path, quality) {
        Ok(bytes) => Some(format!(
            "{DATA_URI_PREFIX}{}",
            general_purpose::STANDARD.encode(bytes)
        )),
        Err(e) => {
            warn!(source = %source.path, error = %e, "placeholder encoding failed");
            None
        }
    }
}
