//! Bookkeeping for derived image variants.
//!
//! Variant files are a pure cache: any of them can be deleted at any time and
//! will be re-rendered on next access. This module records enough about each
//! rendered file to know whether it is still valid without decoding anything.
//!
//! # Design
//!
//! Entries are keyed by the variant's path relative to the cache directory
//! (`gallery/pool.jpg/large.webp`). That path is already deterministic in the
//! source path and the spec name, so the key answers "which file", and the
//! recorded hashes answer "is it still right".
//!
//! ## Hashes
//!
//! - **`source_hash`**: SHA-256 of the source file contents at render time.
//!   Content-based rather than mtime-based so it survives restores from
//!   backup (which reset modification times).
//!
//! - **`params_hash`**: SHA-256 of the spec parameters: fit strategy, target
//!   box, padding background, output format and quality. Editing a spec in the
//!   registry changes this hash and the variant is re-rendered on next access.
//!
//! A cache hit on the request path requires:
//! 1. An entry with matching `params_hash` exists
//! 2. The previously-written file still exists on disk and starts with a
//!    complete WebP container header (`RIFF<size>WEBP`) whose declared size
//!    fits in the file
//!
//! Batch processing additionally requires the `source_hash` to match, which
//! catches sources replaced on disk behind the store's back. The request path
//! skips that check so serving a payload never re-reads every original.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<cache_dir>/.variant-manifest.json`. A
//! missing, corrupt, or version-mismatched manifest loads as empty, which
//! costs one re-render per variant and nothing else.

use crate::imaging::{FitStrategy, VariantSpec};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Name of the manifest file within the cache directory.
const MANIFEST_FILENAME: &str = ".variant-manifest.json";

/// Version of the manifest format. Bump this to invalidate all existing
/// caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 2;

/// A single rendered variant.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk manifest mapping variant paths to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the cache directory. Returns an empty manifest if the file
    /// doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(cache_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(cache_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return Self::empty(),
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    /// Save to the cache directory, creating it if needed.
    pub fn save(&self, cache_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(cache_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(cache_dir), json)
    }

    /// Whether `rel` was rendered with `params_hash` and is still on disk.
    pub fn is_fresh(&self, rel: &str, params_hash: &str, cache_dir: &Path) -> bool {
        self.entries
            .get(rel)
            .is_some_and(|e| e.params_hash == params_hash)
            && is_intact_webp(&cache_dir.join(rel))
    }

    /// Like [`is_fresh`](Self::is_fresh), and also rendered from the same
    /// source bytes.
    pub fn is_current(
        &self,
        rel: &str,
        source_hash: &str,
        params_hash: &str,
        cache_dir: &Path,
    ) -> bool {
        self.entries
            .get(rel)
            .is_some_and(|e| e.source_hash == source_hash)
            && self.is_fresh(rel, params_hash, cache_dir)
    }

    pub fn insert(&mut self, rel: String, source_hash: String, params_hash: String) {
        self.entries.insert(
            rel,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    pub fn remove(&mut self, rel: &str) -> Option<CacheEntry> {
        self.entries.remove(rel)
    }

    /// Drop every entry under directory `prefix`. Returns how many went.
    pub fn remove_under(&mut self, prefix: &str) -> usize {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        let before = self.entries.len();
        self.entries.retain(|path, _| !path.starts_with(&dir));
        before - self.entries.len()
    }
}

/// Whether `path` holds a RIFF/WebP container that is not cut short.
///
/// Reads the 12-byte header only; pixel data is never decoded.
fn is_intact_webp(path: &Path) -> bool {
    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let Ok(meta) = file.metadata() else {
        return false;
    };
    let mut header = [0u8; 12];
    if !meta.is_file() || file.read_exact(&mut header).is_err() {
        return false;
    }
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WEBP" {
        return false;
    }
    let declared = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    meta.len() >= u64::from(declared) + 8
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of everything that determines a variant's pixels.
///
/// The spec name is not hashed: two names with identical parameters
/// render identical bytes.
pub fn hash_variant_params(spec: &VariantSpec) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(spec.fit.tag().as_bytes());
    hasher.update(b"\0");
    if let FitStrategy::FitPadded { background } = spec.fit {
        hasher.update(background);
    }
    if spec.fit != FitStrategy::NoResize {
        hasher.update(spec.width.to_le_bytes());
        hasher.update(spec.height.to_le_bytes());
    }
    hasher.update(spec.format.extension().as_bytes());
    hasher.update(b"\0");
    hasher.update(spec.quality.value().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a materializer's lifetime.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub failures: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn fail(&mut self) {
        self.failures += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses + self.failures
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )?;
        } else {
            write!(f, "{} encoded", self.misses)?;
        }
        if self.failures > 0 {
            write!(f, ", {} failed", self.failures)?;
        }
        Ok(())
    }
}

/// Resolve the manifest path for a cache directory.
pub fn manifest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{TRANSPARENT, VariantSpec};
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, data: &[u8]) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    /// Minimal RIFF/WebP container around `payload`.
    fn webp(payload: &[u8]) -> Vec<u8> {
        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&(payload.len() as u32 + 4).to_le_bytes());
        out.extend_from_slice(b"WEBP");
        out.extend_from_slice(payload);
        out
    }

    // =========================================================================
    // Freshness
    // =========================================================================

    #[test]
    fn empty_manifest_has_no_entries() {
        let m = CacheManifest::empty();
        assert_eq!(m.version, MANIFEST_VERSION);
        assert!(m.entries.is_empty());
    }

    #[test]
    fn fresh_when_params_match_and_file_exists() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("news/a/webp.webp".into(), "src".into(), "prm".into());
        write(tmp.path(), "news/a/webp.webp", &webp(b"data"));

        assert!(m.is_fresh("news/a/webp.webp", "prm", tmp.path()));
    }

    #[test]
    fn stale_when_params_change() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("x.webp".into(), "src".into(), "prm_a".into());
        write(tmp.path(), "x.webp", &webp(b"data"));

        assert!(!m.is_fresh("x.webp", "prm_b", tmp.path()));
    }

    #[test]
    fn stale_when_file_deleted() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("gone.webp".into(), "s".into(), "p".into());
        assert!(!m.is_fresh("gone.webp", "p", tmp.path()));
    }

    #[test]
    fn stale_when_file_truncated() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("empty.webp".into(), "s".into(), "p".into());
        write(tmp.path(), "empty.webp", b"");
        assert!(!m.is_fresh("empty.webp", "p", tmp.path()));
    }

    #[test]
    fn stale_when_file_is_not_webp() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("junk.webp".into(), "s".into(), "p".into());
        write(tmp.path(), "junk.webp", b"<html>502 Bad Gateway</html>");
        assert!(!m.is_fresh("junk.webp", "p", tmp.path()));
    }

    #[test]
    fn stale_when_webp_body_is_cut_short() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("cut.webp".into(), "s".into(), "p".into());
        let mut bytes = webp(&[7u8; 64]);
        bytes.truncate(40);
        write(tmp.path(), "cut.webp", &bytes);
        assert!(!m.is_fresh("cut.webp", "p", tmp.path()));
    }

    #[test]
    fn current_also_checks_source_hash() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("x.webp".into(), "old_src".into(), "p".into());
        write(tmp.path(), "x.webp", &webp(b"data"));

        assert!(m.is_fresh("x.webp", "p", tmp.path()));
        assert!(!m.is_current("x.webp", "new_src", "p", tmp.path()));
        assert!(m.is_current("x.webp", "old_src", "p", tmp.path()));
    }

    #[test]
    fn remove_under_only_touches_that_directory() {
        let mut m = CacheManifest::empty();
        m.insert("gallery/pool.jpg/large.webp".into(), "s".into(), "p".into());
        m.insert("gallery/pool.jpg/small.webp".into(), "s".into(), "p".into());
        m.insert("gallery/pool.png/large.webp".into(), "s".into(), "p".into());

        assert_eq!(m.remove_under("gallery/pool.jpg"), 2);
        assert!(m.entries.contains_key("gallery/pool.png/large.webp"));
    }

    // =========================================================================
    // Save / Load
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("CACHE/images");
        let mut m = CacheManifest::empty();
        m.insert("a/webp.webp".into(), "s1".into(), "p1".into());
        m.insert("b/card.webp".into(), "s2".into(), "p2".into());

        m.save(&cache_dir).unwrap();
        let loaded = CacheManifest::load(&cache_dir);

        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(
            loaded.entries["a/webp.webp"],
            CacheEntry {
                source_hash: "s1".into(),
                params_hash: "p1".into()
            }
        );
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(manifest_path(tmp.path()), "not json").unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "entries": {{"a": {{"source_hash":"h","params_hash":"p"}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(manifest_path(tmp.path()), json).unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    // =========================================================================
    // Hash functions
    // =========================================================================

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");

        fs::write(&path, b"version 1").unwrap();
        let h1 = hash_file(&path).unwrap();
        assert_eq!(h1.len(), 64);

        fs::write(&path, b"version 2").unwrap();
        assert_ne!(h1, hash_file(&path).unwrap());
    }

    #[test]
    fn params_hash_ignores_spec_name() {
        assert_eq!(
            hash_variant_params(&VariantSpec::fill("webp", 1920, 1080, 85)),
            hash_variant_params(&VariantSpec::fill("full", 1920, 1080, 85))
        );
    }

    #[test]
    fn params_hash_varies_with_box_and_quality() {
        let base = hash_variant_params(&VariantSpec::fill("x", 600, 400, 80));
        assert_ne!(base, hash_variant_params(&VariantSpec::fill("x", 600, 401, 80)));
        assert_ne!(base, hash_variant_params(&VariantSpec::fill("x", 600, 400, 81)));
    }

    #[test]
    fn params_hash_varies_with_fit_and_background() {
        let fill = hash_variant_params(&VariantSpec::fill("x", 512, 512, 90));
        let padded = hash_variant_params(&VariantSpec::padded("x", 512, 512, 90, TRANSPARENT));
        let white = hash_variant_params(&VariantSpec::padded("x", 512, 512, 90, [255; 4]));
        assert_ne!(fill, padded);
        assert_ne!(padded, white);
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let s = CacheStats {
            hits: 5,
            misses: 2,
            failures: 0,
        };
        assert_eq!(format!("{}", s), "5 cached, 2 encoded (7 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let s = CacheStats {
            misses: 3,
            ..CacheStats::default()
        };
        assert_eq!(format!("{}", s), "3 encoded");
    }

    #[test]
    fn cache_stats_display_with_failures() {
        let s = CacheStats {
            hits: 1,
            misses: 1,
            failures: 2,
        };
        assert_eq!(format!("{}", s), "1 cached, 1 encoded (4 total), 2 failed");
    }
}
