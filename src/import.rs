//! Content bundle import.
//!
//! A bundle is one JSON file describing content to add. File fields hold
//! paths relative to the bundle file; each is copied into media storage under
//! its field's upload directory before the row is written.
//!
//! ```json
//! {
//!   "site_settings": { "site_name": "Lakeside", "logo": "img/logo.png" },
//!   "lodge_types": [
//!     { "name": "Cabins", "hero_image": "img/cabins.jpg",
//!       "lodges": [{ "name": "Pine Cabin", "capacity": 4,
//!                    "images": [{ "image": "img/pine.jpg" }] }] }
//!   ],
//!   "restaurant": { "title": "Pine Hall", "images": [{ "image": "img/hall.jpg" }],
//!                   "benefits": [{ "text": "Lake view terrace" }] },
//!   "meal_types": [{ "name": "Breakfast", "time_start": "07:30:00" }]
//! }
//! ```
//!
//! Parent ids (`lodge_type_id`, `hero_section_id`, …) come from nesting and
//! are ignored if present. Singletons that already exist are updated rather
//! than recreated. The import is not atomic: it stops at the first error,
//! keeping whatever was written before it.

use crate::registry::Model;
use crate::storage::{MediaStorage, StorageError};
use crate::store::{
    Activity, EventType, GalleryImage, HeroImage, HeroSection, Lodge, LodgeImage, LodgeType,
    MealType, MediaCleanup, News, Restaurant, RestaurantBenefit, RestaurantImage, SiteSettings, Statistic, Store, StoreError,
    upload_dir,
};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid bundle: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Not a file name: {0}")]
    BadFileName(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentBundle {
    pub site_settings: Option<SiteSettings>,
    pub statistics: Vec<Statistic>,
    pub gallery: Vec<GalleryImage>,
    pub hero_sections: Vec<HeroBundle>,
    pub lodge_types: Vec<LodgeTypeBundle>,
    pub activities: Vec<Activity>,
    pub events: Vec<EventType>,
    pub news: Vec<News>,
    pub restaurant: Option<RestaurantBundle>,
    pub meal_types: Vec<MealType>,
}

#[derive(Debug, Deserialize)]
pub struct HeroBundle {
    #[serde(flatten)]
    pub section: HeroSection,
    #[serde(default)]
    pub images: Vec<HeroImage>,
}

#[derive(Debug, Deserialize)]
pub struct LodgeTypeBundle {
    #[serde(flatten)]
    pub lodge_type: LodgeType,
    #[serde(default)]
    pub lodges: Vec<LodgeBundle>,
}

#[derive(Debug, Deserialize)]
pub struct LodgeBundle {
    #[serde(flatten)]
    pub lodge: Lodge,
    #[serde(default)]
    pub images: Vec<LodgeImage>,
}

#[derive(Debug, Deserialize)]
pub struct RestaurantBundle {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    #[serde(default)]
    pub images: Vec<RestaurantImage>,
    #[serde(default)]
    pub benefits: Vec<RestaurantBenefit>,
}

/// Rows written by an import, by kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub site_settings: bool,
    pub statistics: usize,
    pub gallery: usize,
    pub hero_sections: usize,
    pub hero_images: usize,
    pub lodge_types: usize,
    pub lodges: usize,
    pub lodge_images: usize,
    pub activities: usize,
    pub events: usize,
    pub news: usize,
    pub restaurant: bool,
    pub restaurant_images: usize,
    pub restaurant_benefits: usize,
    pub meal_types: usize,
    /// Files copied into media storage.
    pub files: usize,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = [
            ("statistics", self.statistics),
            ("gallery images", self.gallery),
            ("hero sections", self.hero_sections),
            ("hero images", self.hero_images),
            ("lodge types", self.lodge_types),
            ("lodges", self.lodges),
            ("lodge images", self.lodge_images),
            ("activities", self.activities),
            ("events", self.events),
            ("news", self.news),
            ("restaurant images", self.restaurant_images),
            ("restaurant benefits", self.restaurant_benefits),
            ("meal types", self.meal_types),
        ];
        let mut parts: Vec<String> = Vec::new();
        if self.site_settings {
            parts.push("site settings".into());
        }
        if self.restaurant {
            parts.push("restaurant".into());
        }
        parts.extend(
            counts
                .iter()
                .filter(|(_, n)| *n > 0)
                .map(|(label, n)| format!("{n} {label}")),
        );
        if parts.is_empty() {
            return write!(f, "Nothing imported");
        }
        write!(f, "Imported {} ({} files)", parts.join(", "), self.files)
    }
}

/// Parse a bundle file.
pub fn load_bundle(path: &Path) -> Result<ContentBundle, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Copy a local file into storage under the upload directory of
/// `model.field`. Returns the storage-relative path.
pub fn store_upload(
    storage: &MediaStorage,
    model: Model,
    field: &str,
    local: &Path,
) -> Result<String, ImportError> {
    let dir = upload_dir(model, field).ok_or_else(|| StoreError::UnknownField {
        model: model.name(),
        field: field.to_string(),
    })?;
    let name = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ImportError::BadFileName(local.display().to_string()))?;
    let bytes = std::fs::read(local).map_err(|source| ImportError::Read {
        path: local.to_path_buf(),
        source,
    })?;
    let rel = storage.save(dir, name, &bytes)?;
    debug!(model = %model, field, path = %rel, "stored upload");
    Ok(rel)
}

/// Writes a bundle into a store, copying its files into media storage.
pub struct Importer<'a> {
    storage: &'a MediaStorage,
    cleanup: &'a dyn MediaCleanup,
    base: PathBuf,
    report: ImportReport,
}

impl<'a> Importer<'a> {
    /// `base` is the directory bundle file paths are relative to. Files
    /// replaced on existing singletons go to `cleanup`.
    pub fn new(storage: &'a MediaStorage, cleanup: &'a dyn MediaCleanup, base: &Path) -> Self {
        Self {
            storage,
            cleanup,
            base: base.to_path_buf(),
            report: ImportReport::default(),
        }
    }

    /// Replace a bundle-relative path with the stored path.
    fn ingest(&mut self, model: Model, field: &str, value: &mut Option<String>) -> Result<(), ImportError> {
        let Some(local) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
            *value = None;
            return Ok(());
        };
        let stored = store_upload(self.storage, model, field, &self.base.join(local))?;
        *value = Some(stored);
        self.report.files += 1;
        Ok(())
    }

    pub fn import(mut self, store: &mut Store, bundle: ContentBundle) -> Result<ImportReport, ImportError> {
        if let Some(settings) = bundle.site_settings {
            self.site_settings(store, settings)?;
        }
        for s in &bundle.statistics {
            store.insert_statistic(s)?;
            self.report.statistics += 1;
        }
        for mut g in bundle.gallery {
            self.ingest(Model::GalleryImage, "image", &mut g.image)?;
            store.insert_gallery_image(&g)?;
            self.report.gallery += 1;
        }
        for hero in bundle.hero_sections {
            self.hero_section(store, hero)?;
        }
        for t in bundle.lodge_types {
            self.lodge_type(store, t)?;
        }
        for mut a in bundle.activities {
            self.ingest(Model::Activity, "image", &mut a.image)?;
            self.ingest(Model::Activity, "video", &mut a.video)?;
            store.insert_activity(&a)?;
            self.report.activities += 1;
        }
        for mut e in bundle.events {
            self.ingest(Model::EventType, "image", &mut e.image)?;
            store.insert_event_type(&e)?;
            self.report.events += 1;
        }
        for mut n in bundle.news {
            self.ingest(Model::News, "image", &mut n.image)?;
            store.insert_news(&n)?;
            self.report.news += 1;
        }
        if let Some(r) = bundle.restaurant {
            self.restaurant(store, r)?;
        }
        for m in bundle.meal_types {
            store.insert_meal_type(&m)?;
            self.report.meal_types += 1;
        }
        info!(files = self.report.files, "bundle imported");
        Ok(self.report)
    }

    fn site_settings(&mut self, store: &mut Store, mut s: SiteSettings) -> Result<(), ImportError> {
        let images = [
            ("logo", &mut s.logo),
            ("national_projects_logo", &mut s.national_projects_logo),
            ("hero_image", &mut s.hero_image),
            ("base_plan_image", &mut s.base_plan_image),
        ];
        let mut stored = Vec::new();
        for (field, value) in images {
            self.ingest(Model::SiteSettings, field, value)?;
            if let Some(path) = value.clone() {
                stored.push((field, path));
            }
        }

        if store.site_settings()?.is_none() {
            store.create_site_settings(&s)?;
        } else {
            store.update_site_settings(&s)?;
            for (field, path) in &stored {
                store.set_file(Model::SiteSettings, 1, field, Some(path.as_str()), self.cleanup)?;
            }
        }
        self.report.site_settings = true;
        Ok(())
    }

    fn hero_section(&mut self, store: &mut Store, hero: HeroBundle) -> Result<(), ImportError> {
        let mut section = hero.section;
        self.ingest(Model::HeroSection, "preview_image", &mut section.preview_image)?;
        self.ingest(Model::HeroSection, "video_poster", &mut section.video_poster)?;
        self.ingest(Model::HeroSection, "promo_video", &mut section.promo_video)?;
        let id = store.insert_hero_section(&section)?;
        self.report.hero_sections += 1;

        for mut image in hero.images {
            image.hero_section_id = id;
            self.ingest(Model::HeroImage, "image", &mut image.image)?;
            store.insert_hero_image(&image)?;
            self.report.hero_images += 1;
        }
        Ok(())
    }

    fn lodge_type(&mut self, store: &mut Store, bundle: LodgeTypeBundle) -> Result<(), ImportError> {
        let mut t = bundle.lodge_type;
        self.ingest(Model::LodgeType, "hero_image", &mut t.hero_image)?;
        let type_id = store.insert_lodge_type(&t)?;
        self.report.lodge_types += 1;

        for lodge in bundle.lodges {
            let mut l = lodge.lodge;
            l.lodge_type_id = type_id;
            let lodge_id = store.insert_lodge(&l)?;
            self.report.lodges += 1;

            for mut image in lodge.images {
                image.lodge_id = lodge_id;
                self.ingest(Model::LodgeImage, "image", &mut image.image)?;
                store.insert_lodge_image(&image)?;
                self.report.lodge_images += 1;
            }
        }
        Ok(())
    }

    fn restaurant(&mut self, store: &mut Store, bundle: RestaurantBundle) -> Result<(), ImportError> {
        if store.restaurant()?.is_none() {
            store.create_restaurant(&bundle.restaurant)?;
        } else {
            store.update_restaurant(&bundle.restaurant)?;
        }
        self.report.restaurant = true;

        for mut image in bundle.images {
            self.ingest(Model::RestaurantImage, "image", &mut image.image)?;
            store.insert_restaurant_image(&image)?;
            self.report.restaurant_images += 1;
        }
        for benefit in bundle.benefits {
            store.insert_restaurant_benefit(&benefit)?;
            self.report.restaurant_benefits += 1;
        }
        Ok(())
    }
}

/// Load `path` and import it, resolving file paths against its directory.
pub fn import_file(
    store: &mut Store,
    storage: &MediaStorage,
    cleanup: &dyn MediaCleanup,
    path: &Path,
) -> Result<ImportReport, ImportError> {
    let bundle = load_bundle(path)?;
    let base = path.parent().unwrap_or(Path::new("."));
    Importer::new(storage, cleanup, base).import(store, bundle)
}
