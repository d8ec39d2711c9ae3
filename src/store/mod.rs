//! SQLite content store.
//!
//! One [`Store`] wraps one `rusqlite::Connection`. Reads return plain model
//! structs; writes validate singletons and slugs before touching the table.
//!
//! ## File ownership
//!
//! Image and video columns hold storage-relative paths. Rows own their files:
//! replacing a field's value or deleting a row (including rows removed by
//! `ON DELETE CASCADE`) hands every orphaned path to a [`MediaCleanup`], which
//! removes the original and its derived variants. Cleanup runs only after the
//! transaction commits, so a failed delete never loses files.
//!
//! The entity-specific queries live in submodules:
//! - `site`: site settings, statistics, gallery, hero sections
//! - `lodges`: lodge types, lodges, lodge images
//! - `content`: activities, events, news, restaurant

mod content;
mod lodges;
pub mod models;
mod schema;
mod site;

pub use models::*;

use crate::registry::{ImageField, Model};
use crate::storage::SourceImage;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Singleton(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("Invalid value: {0}")]
    Validation(String),
    #[error("{model} has no file field '{field}'")]
    UnknownField { model: &'static str, field: String },
}

/// Receives file paths whose owning row is gone.
pub trait MediaCleanup {
    fn discard(&self, path: &str);
}

/// Leaves files in place. For callers that manage media themselves.
impl MediaCleanup for () {
    fn discard(&self, _path: &str) {}
}

pub struct Store {
    conn: Connection,
}

/// File columns per table; `seo` tables also own `seo.og_image`.
struct FileColumns {
    table: &'static str,
    columns: &'static [&'static str],
    seo: bool,
}

const FILE_COLUMNS: &[FileColumns] = &[
    FileColumns {
        table: "site_settings",
        columns: &["logo", "national_projects_logo", "hero_image", "base_plan_image"],
        seo: true,
    },
    FileColumns {
        table: "gallery_images",
        columns: &["image"],
        seo: false,
    },
    FileColumns {
        table: "hero_sections",
        columns: &["preview_image", "promo_video", "video_poster"],
        seo: true,
    },
    FileColumns {
        table: "hero_images",
        columns: &["image"],
        seo: false,
    },
    FileColumns {
        table: "lodge_types",
        columns: &["hero_image"],
        seo: true,
    },
    FileColumns {
        table: "lodges",
        columns: &[],
        seo: true,
    },
    FileColumns {
        table: "lodge_images",
        columns: &["image"],
        seo: false,
    },
    FileColumns {
        table: "activities",
        columns: &["image", "video"],
        seo: true,
    },
    FileColumns {
        table: "event_types",
        columns: &["image"],
        seo: true,
    },
    FileColumns {
        table: "news",
        columns: &["image"],
        seo: true,
    },
    FileColumns {
        table: "restaurant",
        columns: &[],
        seo: true,
    },
    FileColumns {
        table: "restaurant_images",
        columns: &["image"],
        seo: false,
    },
];

/// Non-image file fields accepted by [`Store::set_file`]: (model, field, upload dir).
const VIDEO_FIELDS: &[(Model, &str, &str)] = &[
    (Model::HeroSection, "promo_video", "hero/videos/"),
    (Model::Activity, "video", "activities/videos/"),
];

/// Table backing an image-holding model.
pub fn table_of(model: Model) -> &'static str {
    match model {
        Model::SiteSettings => "site_settings",
        Model::GalleryImage => "gallery_images",
        Model::HeroSection => "hero_sections",
        Model::HeroImage => "hero_images",
        Model::LodgeType => "lodge_types",
        Model::LodgeImage => "lodge_images",
        Model::Activity => "activities",
        Model::EventType => "event_types",
        Model::News => "news",
        Model::RestaurantImage => "restaurant_images",
    }
}

/// Upload directory for a file field, image or video.
pub fn upload_dir(model: Model, field: &str) -> Option<&'static str> {
    model.field(field).map(|f| f.upload_to).or_else(|| {
        VIDEO_FIELDS
            .iter()
            .find(|(m, f, _)| *m == model && *f == field)
            .map(|(_, _, dir)| *dir)
    })
}

/// One stored image, as enumerated for batch processing.
#[derive(Debug, Clone)]
pub struct ImageRef {
    pub model: Model,
    pub id: i64,
    pub field: &'static ImageField,
    pub source: SourceImage,
}

/// Lowercase ASCII slug: alphanumerics kept, everything else becomes `-`,
/// runs collapse, edges are trimmed. Truncated at a dash before
/// `MAX_SLUG_LEN` where possible.
pub fn slugify(text: &str) -> String {
    const MAX_SLUG_LEN: usize = 80;

    let mut slug = String::with_capacity(text.len());
    let mut prev_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let trimmed = slug.trim_matches('-');

    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}

pub(crate) fn seo_column(row: &Row<'_>) -> rusqlite::Result<Seo> {
    let text: String = row.get("seo")?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn seo_json(seo: &Seo) -> Result<String, StoreError> {
    Ok(serde_json::to_string(seo)?)
}

/// Treat empty strings as no file.
pub(crate) fn file_value(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn collect_files(
    conn: &Connection,
    table: &str,
    clause: &str,
    id: i64,
) -> Result<Vec<String>, StoreError> {
    let Some(spec) = FILE_COLUMNS.iter().find(|f| f.table == table) else {
        return Ok(Vec::new());
    };
    let mut columns: Vec<&str> = spec.columns.to_vec();
    if spec.seo {
        columns.push("seo");
    }
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!("SELECT {} FROM {table} WHERE {clause}", columns.join(", "));
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([id])?;
    let mut files = Vec::new();
    while let Some(row) = rows.next()? {
        for (i, column) in columns.iter().enumerate() {
            let value: Option<String> = row.get(i)?;
            let value = if *column == "seo" {
                value
                    .and_then(|json| serde_json::from_str::<Seo>(&json).ok())
                    .and_then(|seo| seo.og_image)
            } else {
                value
            };
            if let Some(path) = file_value(&value) {
                files.push(path.to_string());
            }
        }
    }
    Ok(files)
}

impl Store {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Self { conn })
    }

    /// Pick a slug unique within `table`: the given one, else one derived from
    /// `name`, else `fallback`; suffixed `-2`, `-3`, … on collision.
    fn unique_slug(
        &self,
        table: &str,
        given: &str,
        name: &str,
        fallback: &str,
        own_id: i64,
    ) -> Result<String, StoreError> {
        let mut base = slugify(if given.trim().is_empty() { name } else { given });
        if base.is_empty() {
            base = fallback.to_string();
        }
        let sql = format!("SELECT 1 FROM {table} WHERE slug = ?1 AND id != ?2");
        let mut candidate = base.clone();
        let mut n = 2;
        while self
            .conn
            .query_row(&sql, params![candidate, own_id], |_| Ok(()))
            .optional()?
            .is_some()
        {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        Ok(candidate)
    }

    /// Fail with [`StoreError::Singleton`] if `table` already has a row.
    fn ensure_vacant(&self, table: &str, message: &str) -> Result<(), StoreError> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        if count > 0 {
            return Err(StoreError::Singleton(message.to_string()));
        }
        Ok(())
    }

    /// Delete a row and its cascaded children, then hand every file they
    /// owned to `cleanup`.
    ///
    /// `children` lists `(table, clause)` pairs whose clause selects, with the
    /// parent id bound as `?1`, every descendant row the cascade will remove.
    fn delete_with_files(
        &mut self,
        entity: &'static str,
        table: &'static str,
        id: i64,
        children: &[(&'static str, &'static str)],
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let mut files = collect_files(&tx, table, "id = ?1", id)?;
        for (child, clause) in children {
            files.extend(collect_files(&tx, child, clause, id)?);
        }
        let deleted = tx.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound { entity, id });
        }
        tx.commit()?;

        for path in &files {
            cleanup.discard(path);
        }
        info!(entity, id, files = files.len(), "deleted");
        Ok(())
    }

    /// Point a file field at `path` (or clear it with `None`). The previous
    /// file, if different, goes to `cleanup`. Returns the previous value.
    pub fn set_file(
        &mut self,
        model: Model,
        id: i64,
        field: &str,
        path: Option<&str>,
        cleanup: &dyn MediaCleanup,
    ) -> Result<Option<String>, StoreError> {
        if upload_dir(model, field).is_none() {
            return Err(StoreError::UnknownField {
                model: model.name(),
                field: field.to_string(),
            });
        }
        let table = table_of(model);
        let tx = self.conn.transaction()?;
        let previous: Option<Option<String>> = tx
            .query_row(
                &format!("SELECT {field} FROM {table} WHERE id = ?1"),
                [id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(previous) = previous else {
            return Err(StoreError::NotFound {
                entity: model.name(),
                id,
            });
        };
        tx.execute(
            &format!("UPDATE {table} SET {field} = ?1 WHERE id = ?2"),
            params![path, id],
        )?;
        tx.commit()?;

        if let Some(old) = file_value(&previous)
            && Some(old) != path
        {
            cleanup.discard(old);
        }
        debug!(model = %model, id, field, "file field updated");
        Ok(previous)
    }

    /// Every non-empty image of `model`, by field then id.
    pub fn image_sources(&self, model: Model) -> Result<Vec<ImageRef>, StoreError> {
        let table = table_of(model);
        let mut out = Vec::new();
        for field in model.fields() {
            let sql = format!(
                "SELECT id, {col} FROM {table} WHERE {col} IS NOT NULL AND {col} != '' ORDER BY id",
                col = field.name
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
            for row in rows {
                let (id, path) = row?;
                if let Some(source) = SourceImage::from_field(Some(&path)) {
                    out.push(ImageRef {
                        model,
                        id,
                        field,
                        source,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Every file path referenced by any row, images and videos alike.
    pub fn all_file_paths(&self) -> Result<Vec<String>, StoreError> {
        let mut out = Vec::new();
        for spec in FILE_COLUMNS {
            let mut stmt = self.conn.prepare(&format!("SELECT id FROM {}", spec.table))?;
            let ids: Vec<i64> = stmt
                .query_map([], |r| r.get(0))?
                .collect::<Result<_, _>>()?;
            for id in ids {
                out.extend(collect_files(&self.conn, spec.table, "id = ?1", id)?);
            }
        }
        Ok(out)
    }
}
