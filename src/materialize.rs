//! Lazy, cached rendering of variant specs.
//!
//! A [`Materializer`] owns the image backend, the media storage, and the
//! variant manifest. Given a source image and a [`VariantSpec`] it returns the
//! storage-relative path of the derived file, rendering it first if the cache
//! has nothing valid. Derived files land at a deterministic path:
//!
//! ```text
//! <media_root>/<cache_dir>/<source path>/<spec name>.webp
//! ```
//!
//! Three entry points differ only in how much they trust the cache:
//!
//! | Method | Cache hit requires | Used by |
//! |---|---|---|
//! | [`materialize`](Materializer::materialize) | file exists, params hash matches | payload resolution |
//! | [`refresh`](Materializer::refresh) | … and source hash matches | `process-images` |
//! | [`regenerate`](Materializer::regenerate) | never hits | `regenerate-variants` |
//!
//! The manifest is shared behind a `Mutex`, so one materializer can serve a
//! whole rayon batch. Two workers racing to render the same variant both
//! write identical bytes; the later rename wins.

use crate::cache::{self, CacheManifest, CacheStats};
use crate::imaging::{BackendError, ImageBackend, RenderParams, RustBackend, VariantSpec};
use crate::storage::{MediaStorage, SourceImage, StorageError};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Source image missing: {0}")]
    SourceMissing(String),
    #[error("No variant '{variant}' declared for {model}.{field}")]
    UnknownVariant {
        model: String,
        field: String,
        variant: String,
    },
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Failed to encode: {0}")]
    Encode(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<BackendError> for MaterializeError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Io(io) => MaterializeError::Storage(StorageError::Io(io)),
            BackendError::Decode { path, reason } => MaterializeError::Decode { path, reason },
            BackendError::Encode(msg) => MaterializeError::Encode(msg),
        }
    }
}

impl From<std::io::Error> for MaterializeError {
    fn from(e: std::io::Error) -> Self {
        MaterializeError::Storage(StorageError::Io(e))
    }
}

/// A derived file, ready to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedVariant {
    /// Storage-relative path of the derived file.
    pub path: String,
    /// `true` if served from cache, `false` if rendered by this call.
    pub cached: bool,
}

pub struct Materializer<B: ImageBackend = RustBackend> {
    backend: B,
    storage: MediaStorage,
    cache_dir: String,
    manifest: Mutex<CacheManifest>,
    stats: Mutex<CacheStats>,
}

impl Materializer<RustBackend> {
    pub fn new(storage: MediaStorage, cache_dir: &str) -> Self {
        Self::with_backend(RustBackend::new(), storage, cache_dir)
    }
}

/// Lock that survives a panicked holder; the guarded data stays consistent
/// because every critical section is a single insert or remove.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<B: ImageBackend> Materializer<B> {
    pub fn with_backend(backend: B, storage: MediaStorage, cache_dir: &str) -> Self {
        let cache_dir = cache_dir.trim_matches('/').to_string();
        let manifest = CacheManifest::load(&storage.root().join(&cache_dir));
        Self {
            backend,
            storage,
            cache_dir,
            manifest: Mutex::new(manifest),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn storage(&self) -> &MediaStorage {
        &self.storage
    }

    pub fn cache_dir(&self) -> &str {
        &self.cache_dir
    }

    /// Absolute path of the cache directory.
    pub fn cache_root(&self) -> PathBuf {
        self.storage.root().join(&self.cache_dir)
    }

    /// Storage-relative directory holding every variant of `source`.
    ///
    /// Named after the full source path, extension included: `pool.jpg`
    /// and `pool.png` in one upload dir never share variants.
    pub fn variant_dir(&self, source: &SourceImage) -> String {
        format!("{}/{}", self.cache_dir, source.path)
    }

    /// Manifest key: the derived path relative to the cache directory.
    pub(crate) fn manifest_key(source: &SourceImage, spec: &VariantSpec) -> String {
        format!("{}/{}.{}", source.path, spec.name, spec.format.extension())
    }

    /// Storage-relative path the variant is (or will be) written to.
    pub fn derived_path(&self, source: &SourceImage, spec: &VariantSpec) -> String {
        format!("{}/{}", self.cache_dir, Self::manifest_key(source, spec))
    }

    fn source_path(&self, source: &SourceImage) -> Result<PathBuf, MaterializeError> {
        let path = self.storage.path(&source.path)?;
        if !path.is_file() {
            return Err(MaterializeError::SourceMissing(source.path.clone()));
        }
        Ok(path)
    }

    /// Return the cached variant, or render it if the cache has nothing valid.
    pub fn materialize(
        &self,
        source: &SourceImage,
        spec: &VariantSpec,
    ) -> Result<DerivedVariant, MaterializeError> {
        self.source_path(source)?;
        let key = Self::manifest_key(source, spec);
        let params_hash = cache::hash_variant_params(spec);

        if lock(&self.manifest).is_fresh(&key, &params_hash, &self.cache_root()) {
            debug!(source = %source.path, variant = spec.name, "variant cache hit");
            lock(&self.stats).hit();
            return Ok(DerivedVariant {
                path: self.derived_path(source, spec),
                cached: true,
            });
        }
        self.render(source, spec, &params_hash)
    }

    /// Like [`materialize`](Self::materialize), but also re-renders when the
    /// source bytes differ from what the cached variant was made from.
    pub fn refresh(
        &self,
        source: &SourceImage,
        spec: &VariantSpec,
    ) -> Result<DerivedVariant, MaterializeError> {
        let source_abs = self.source_path(source)?;
        let key = Self::manifest_key(source, spec);
        let params_hash = cache::hash_variant_params(spec);
        let source_hash = cache::hash_file(&source_abs)?;

        if lock(&self.manifest).is_current(&key, &source_hash, &params_hash, &self.cache_root()) {
            debug!(source = %source.path, variant = spec.name, "variant up to date");
            lock(&self.stats).hit();
            return Ok(DerivedVariant {
                path: self.derived_path(source, spec),
                cached: true,
            });
        }
        self.render(source, spec, &params_hash)
    }

    /// Delete the variant and render it again unconditionally.
    pub fn regenerate(
        &self,
        source: &SourceImage,
        spec: &VariantSpec,
    ) -> Result<DerivedVariant, MaterializeError> {
        self.invalidate_variant(source, spec)?;
        let params_hash = cache::hash_variant_params(spec);
        self.render(source, spec, &params_hash)
    }

    fn render(
        &self,
        source: &SourceImage,
        spec: &VariantSpec,
        params_hash: &str,
    ) -> Result<DerivedVariant, MaterializeError> {
        let result = self.render_uncounted(source, spec, params_hash);
        match &result {
            Ok(_) => lock(&self.stats).miss(),
            Err(_) => lock(&self.stats).fail(),
        }
        result
    }

    fn render_uncounted(
        &self,
        source: &SourceImage,
        spec: &VariantSpec,
        params_hash: &str,
    ) -> Result<DerivedVariant, MaterializeError> {
        let source_abs = self.source_path(source)?;
        let source_hash = cache::hash_file(&source_abs)?;
        let rel = self.derived_path(source, spec);
        let output = self.storage.path(&rel)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.backend.render(&RenderParams {
            source: source_abs,
            output,
            spec: *spec,
        })?;
        info!(source = %source.path, variant = spec.name, "rendered variant");

        lock(&self.manifest).insert(
            Self::manifest_key(source, spec),
            source_hash,
            params_hash.to_string(),
        );
        Ok(DerivedVariant {
            path: rel,
            cached: false,
        })
    }

    /// Remove every derived file of `source`. Returns how many manifest
    /// entries were dropped.
    pub fn invalidate(&self, source: &SourceImage) -> Result<usize, MaterializeError> {
        self.storage.delete_dir(&self.variant_dir(source))?;
        let dropped = lock(&self.manifest).remove_under(&source.path);
        debug!(source = %source.path, dropped, "invalidated variants");
        Ok(dropped)
    }

    /// Remove one derived file of `source`.
    pub fn invalidate_variant(
        &self,
        source: &SourceImage,
        spec: &VariantSpec,
    ) -> Result<(), MaterializeError> {
        self.storage.delete(&self.derived_path(source, spec))?;
        lock(&self.manifest).remove(&Self::manifest_key(source, spec));
        Ok(())
    }

    /// Drop the manifest entry for a derived file found on disk, given its
    /// path relative to the cache directory.
    pub(crate) fn forget(&self, key: &str) {
        lock(&self.manifest).remove(key);
    }

    /// Persist the manifest. Call once after a batch or a payload build.
    pub fn save(&self) -> Result<(), MaterializeError> {
        lock(&self.manifest).save(&self.cache_root())?;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.stats).clone()
    }

    /// Delete an original upload together with all of its variants.
    pub fn discard_source(&self, source: &SourceImage) -> Result<(), MaterializeError> {
        self.invalidate(source)?;
        self.storage.delete(&source.path)?;
        info!(source = %source.path, "removed source image");
        Ok(())
    }
}

impl<B: ImageBackend> crate::store::MediaCleanup for Materializer<B> {
    fn discard(&self, path: &str) {
        let Some(source) = SourceImage::from_field(Some(path)) else {
            return;
        };
        if let Err(e) = self.discard_source(&source) {
            warn!(source = %source.path, error = %e, "could not remove media file");
        }
    }
}
