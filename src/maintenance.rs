//! Batch variant maintenance.
//!
//! The request path renders variants lazily. These operations do the same
//! work ahead of time, or clean up after it:
//!
//! - [`process_images`]: bring every declared variant up to date, re-rendering
//!   only what is missing, stale, or built from different source bytes.
//! - [`regenerate_variants`]: re-render unconditionally.
//! - [`prune_cache`]: delete derived files no stored image maps to.
//!
//! Work is spread over the global rayon pool, one task per stored image. A
//! failed image is logged and counted; it never aborts the batch.

use crate::cache::{self, CacheStats};
use crate::imaging::{ImageBackend, VariantSpec};
use crate::materialize::{MaterializeError, Materializer};
use crate::registry::Model;
use crate::store::{ImageRef, Store, StoreError};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to persist variant manifest: {0}")]
    Materialize(#[from] MaterializeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk cache directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("No selected model declares a variant named '{0}'")]
    UnknownVariant(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Refresh,
    Regenerate,
}

/// Per-model outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReport {
    pub model: Model,
    /// Stored images visited.
    pub images: usize,
    /// Variants rendered by this run.
    pub rendered: usize,
    /// Variants already up to date.
    pub cached: usize,
    /// Variants that failed to render.
    pub failed: usize,
    /// Images whose source file is gone.
    pub missing: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    rendered: usize,
    cached: usize,
    failed: usize,
    missing: usize,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            rendered: self.rendered + other.rendered,
            cached: self.cached + other.cached,
            failed: self.failed + other.failed,
            missing: self.missing + other.missing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaintenanceReport {
    pub models: Vec<ModelReport>,
    pub stats: CacheStats,
}

impl MaintenanceReport {
    pub fn failed(&self) -> usize {
        self.models.iter().map(|m| m.failed).sum()
    }
}

impl fmt::Display for ModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} images, {} rendered, {} up to date",
            self.model, self.images, self.rendered, self.cached
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.missing > 0 {
            write!(f, ", {} missing source", self.missing)?;
        }
        Ok(())
    }
}

impl fmt::Display for MaintenanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.models {
            writeln!(f, "{m}")?;
        }
        write!(f, "Variants: {}", self.stats)
    }
}

/// Bring every declared variant of `models` up to date. With `variant`,
/// only specs of that name are touched.
pub fn process_images<B: ImageBackend>(
    store: &Store,
    materializer: &Materializer<B>,
    models: &[Model],
    variant: Option<&str>,
) -> Result<MaintenanceReport, MaintenanceError> {
    run(Mode::Refresh, store, materializer, models, variant)
}

/// Delete and re-render every declared variant of `models` (or only those
/// named `variant`).
pub fn regenerate_variants<B: ImageBackend>(
    store: &Store,
    materializer: &Materializer<B>,
    models: &[Model],
    variant: Option<&str>,
) -> Result<MaintenanceReport, MaintenanceError> {
    run(Mode::Regenerate, store, materializer, models, variant)
}

fn run<B: ImageBackend>(
    mode: Mode,
    store: &Store,
    materializer: &Materializer<B>,
    models: &[Model],
    variant: Option<&str>,
) -> Result<MaintenanceReport, MaintenanceError> {
    if let Some(name) = variant {
        let declared = models
            .iter()
            .flat_map(|m| m.fields())
            .any(|f| f.spec(name).is_some());
        if !declared {
            return Err(MaintenanceError::UnknownVariant(name.to_string()));
        }
    }

    let mut reports = Vec::with_capacity(models.len());
    for &model in models {
        let refs = store.image_sources(model)?;
        info!(model = %model, images = refs.len(), ?mode, "processing variants");

        let tally = refs
            .par_iter()
            .map(|r| process_one(mode, materializer, r, variant))
            .reduce(Tally::default, Tally::merge);

        reports.push(ModelReport {
            model,
            images: refs.len(),
            rendered: tally.rendered,
            cached: tally.cached,
            failed: tally.failed,
            missing: tally.missing,
        });
    }

    materializer.save()?;
    Ok(MaintenanceReport {
        models: reports,
        stats: materializer.stats(),
    })
}

fn selected_specs(r: &ImageRef, variant: Option<&str>) -> Vec<&'static VariantSpec> {
    r.field
        .variants
        .iter()
        .filter(|s| variant.is_none_or(|name| s.name == name))
        .collect()
}

fn process_one<B: ImageBackend>(
    mode: Mode,
    materializer: &Materializer<B>,
    r: &ImageRef,
    variant: Option<&str>,
) -> Tally {
    let mut tally = Tally::default();
    for spec in selected_specs(r, variant) {
        let result = match mode {
            Mode::Refresh => materializer.refresh(&r.source, spec),
            Mode::Regenerate => materializer.regenerate(&r.source, spec),
        };
        match result {
            Ok(d) if d.cached => tally.cached += 1,
            Ok(_) => tally.rendered += 1,
            Err(MaterializeError::SourceMissing(path)) => {
                warn!(model = %r.model, id = r.id, field = r.field.name, %path, "source image missing");
                tally.missing += 1;
                break;
            }
            Err(e) => {
                warn!(
                    model = %r.model,
                    id = r.id,
                    field = r.field.name,
                    variant = spec.name,
                    error = %e,
                    "variant failed"
                );
                tally.failed += 1;
            }
        }
    }
    tally
}

/// Outcome of [`prune_cache`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    /// Derived files still mapped to a stored image.
    pub kept: usize,
    /// Orphaned derived files and stray temp files deleted.
    pub removed: usize,
    /// Empty directories deleted.
    pub dirs_removed: usize,
}

impl fmt::Display for PruneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kept, {} removed, {} empty directories removed",
            self.kept, self.removed, self.dirs_removed
        )
    }
}

/// Delete every file under the cache directory that is not the derived path
/// of some declared variant of some stored image.
pub fn prune_cache<B: ImageBackend>(
    store: &Store,
    materializer: &Materializer<B>,
) -> Result<PruneReport, MaintenanceError> {
    let mut expected = HashSet::new();
    for model in Model::ALL {
        for r in store.image_sources(model)? {
            for spec in r.field.variants {
                expected.insert(Materializer::<B>::manifest_key(&r.source, spec));
            }
        }
    }

    let root = materializer.cache_root();
    let mut report = PruneReport::default();
    if !root.is_dir() {
        return Ok(report);
    }
    let manifest = cache::manifest_path(&root);

    for entry in WalkDir::new(&root).min_depth(1).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_dir() {
            if is_empty_dir(path)? {
                std::fs::remove_dir(path)?;
                report.dirs_removed += 1;
            }
            continue;
        }
        if path == manifest {
            continue;
        }
        let key = cache_key(&root, path);
        let stray = path.extension().is_some_and(|e| e == "tmp");
        if !stray && key.as_ref().is_some_and(|k| expected.contains(k)) {
            report.kept += 1;
            continue;
        }
        std::fs::remove_file(path)?;
        if let Some(key) = key {
            materializer.forget(&key);
        }
        debug!(path = %path.display(), "pruned cache file");
        report.removed += 1;
    }

    materializer.save()?;
    info!(kept = report.kept, removed = report.removed, "cache pruned");
    Ok(report)
}

/// Path of `path` relative to the cache root, `/`-separated.
fn cache_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

fn is_empty_dir(path: &Path) -> std::io::Result<bool> {
    Ok(std::fs::read_dir(path)?.next().is_none())
}
