use super::models::*;
use super::{MediaCleanup, Store, StoreError, seo_column, seo_json};
use rusqlite::{OptionalExtension, Row, params, params_from_iter, types::Value};

fn lodge_type_from_row(r: &Row<'_>) -> rusqlite::Result<LodgeType> {
    Ok(LodgeType {
        id: r.get("id")?,
        name: r.get("name")?,
        slug: r.get("slug")?,
        subtitle: r.get("subtitle")?,
        hero_image: r.get("hero_image")?,
        description: r.get("description")?,
        is_active: r.get("is_active")?,
        order: r.get("sort_order")?,
        seo: seo_column(r)?,
    })
}

fn lodge_from_row(r: &Row<'_>) -> rusqlite::Result<Lodge> {
    Ok(Lodge {
        id: r.get("id")?,
        lodge_type_id: r.get("lodge_type_id")?,
        name: r.get("name")?,
        slug: r.get("slug")?,
        description: r.get("description")?,
        short_description: r.get("short_description")?,
        capacity: r.get("capacity")?,
        area: r.get("area")?,
        price_from: r.get("price_from")?,
        location_description: r.get("location_description")?,
        is_active: r.get("is_active")?,
        order: r.get("sort_order")?,
        seo: seo_column(r)?,
    })
}

fn lodge_image_from_row(r: &Row<'_>) -> rusqlite::Result<LodgeImage> {
    Ok(LodgeImage {
        id: r.get("id")?,
        lodge_id: r.get("lodge_id")?,
        image: r.get("image")?,
        alt_text: r.get("alt_text")?,
        order: r.get("sort_order")?,
    })
}

/// SQL condition and bound values for a [`LodgeFilter`]. Always restricts to
/// active lodges.
fn filter_clause(filter: &LodgeFilter) -> (String, Vec<Value>) {
    let mut conds = vec!["is_active = 1".to_string()];
    let mut values = Vec::new();
    let mut bind = |cond: &str, value: Value, conds: &mut Vec<String>| {
        values.push(value);
        conds.push(cond.replace('?', &format!("?{}", values.len())));
    };

    if let Some(id) = filter.lodge_type_id {
        bind("lodge_type_id = ?", Value::Integer(id), &mut conds);
    }
    if let Some(min) = filter.price_from_min {
        bind("price_from >= ?", Value::Real(min), &mut conds);
    }
    if let Some(max) = filter.price_from_max {
        bind("price_from <= ?", Value::Real(max), &mut conds);
    }
    if let Some(min) = filter.capacity_min {
        bind("capacity >= ?", Value::Integer(min), &mut conds);
    }
    if let Some(max) = filter.capacity_max {
        bind("capacity <= ?", Value::Integer(max), &mut conds);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim)
        && !search.is_empty()
    {
        let pattern = format!("%{}%", search.to_lowercase());
        bind(
            "(lower(name) LIKE ? OR lower(description) LIKE ? OR lower(short_description) LIKE ?)",
            Value::Text(pattern),
            &mut conds,
        );
    }
    (conds.join(" AND "), values)
}

impl Store {
    // =========================================================================
    // Lodge types
    // =========================================================================

    /// Insert a lodge type, deriving a unique slug when none is given.
    /// Returns the new id.
    pub fn insert_lodge_type(&mut self, t: &LodgeType) -> Result<i64, StoreError> {
        let slug = self.unique_slug("lodge_types", &t.slug, &t.name, "lodge-type", 0)?;
        self.conn.execute(
            "INSERT INTO lodge_types (name, slug, subtitle, hero_image, description, is_active,
                sort_order, seo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                t.name,
                slug,
                t.subtitle,
                t.hero_image,
                t.description,
                t.is_active,
                t.order,
                seo_json(&t.seo)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn lodge_types(&self) -> Result<Vec<LodgeType>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM lodge_types WHERE is_active = 1 ORDER BY sort_order, name")?;
        let rows = stmt.query_map([], lodge_type_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// A lodge type by id, active or not.
    pub fn lodge_type(&self, id: i64) -> Result<Option<LodgeType>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM lodge_types WHERE id = ?1",
                [id],
                lodge_type_from_row,
            )
            .optional()?)
    }

    pub fn lodge_type_by_slug(&self, slug: &str) -> Result<Option<LodgeType>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM lodge_types WHERE slug = ?1 AND is_active = 1",
                [slug],
                lodge_type_from_row,
            )
            .optional()?)
    }

    /// Delete a lodge type with all its lodges and their images.
    pub fn delete_lodge_type(
        &mut self,
        id: i64,
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        self.delete_with_files(
            "LodgeType",
            "lodge_types",
            id,
            &[
                ("lodges", "lodge_type_id = ?1"),
                (
                    "lodge_images",
                    "lodge_id IN (SELECT id FROM lodges WHERE lodge_type_id = ?1)",
                ),
            ],
            cleanup,
        )
    }

    // =========================================================================
    // Lodges
    // =========================================================================

    pub fn insert_lodge(&mut self, l: &Lodge) -> Result<i64, StoreError> {
        if l.capacity < 1 {
            return Err(StoreError::Validation(format!(
                "lodge capacity must be at least 1, got {}",
                l.capacity
            )));
        }
        let slug = self.unique_slug("lodges", &l.slug, &l.name, "lodge", 0)?;
        self.conn.execute(
            "INSERT INTO lodges (lodge_type_id, name, slug, description, short_description,
                capacity, area, price_from, location_description, is_active, sort_order, seo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                l.lodge_type_id,
                l.name,
                slug,
                l.description,
                l.short_description,
                l.capacity,
                l.area,
                l.price_from,
                l.location_description,
                l.is_active,
                l.order,
                seo_json(&l.seo)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Active lodges matching `filter`, by (order, name).
    pub fn lodges(&self, filter: &LodgeFilter) -> Result<Vec<Lodge>, StoreError> {
        let (clause, values) = filter_clause(filter);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT * FROM lodges WHERE {clause} ORDER BY sort_order, name"
        ))?;
        let rows = stmt.query_map(params_from_iter(values), lodge_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn lodges_of_type(&self, lodge_type_id: i64) -> Result<Vec<Lodge>, StoreError> {
        self.lodges(&LodgeFilter {
            lodge_type_id: Some(lodge_type_id),
            ..LodgeFilter::default()
        })
    }

    pub fn lodge_by_slug(&self, slug: &str) -> Result<Option<Lodge>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM lodges WHERE slug = ?1 AND is_active = 1",
                [slug],
                lodge_from_row,
            )
            .optional()?)
    }

    pub fn delete_lodge(&mut self, id: i64, cleanup: &dyn MediaCleanup) -> Result<(), StoreError> {
        self.delete_with_files(
            "Lodge",
            "lodges",
            id,
            &[("lodge_images", "lodge_id = ?1")],
            cleanup,
        )
    }

    // =========================================================================
    // Lodge images
    // =========================================================================

    pub fn insert_lodge_image(&mut self, i: &LodgeImage) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO lodge_images (lodge_id, image, alt_text, sort_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![i.lodge_id, i.image, i.alt_text, i.order],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn lodge_images(&self, lodge_id: i64) -> Result<Vec<LodgeImage>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM lodge_images WHERE lodge_id = ?1 ORDER BY sort_order, id")?;
        let rows = stmt.query_map([lodge_id], lodge_image_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn delete_lodge_image(
        &mut self,
        id: i64,
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        self.delete_with_files("LodgeImage", "lodge_images", id, &[], cleanup)
    }
}
