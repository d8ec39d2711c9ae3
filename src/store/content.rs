//! Activities, event types, news and the restaurant.

use super::models::*;
use super::{MediaCleanup, Store, StoreError, seo_column, seo_json};
use chrono::{DateTime, Utc};
use rusqlite::{ErrorCode, OptionalExtension, Row, params};
use tracing::info;

const RESTAURANT_EXISTS: &str =
    "The restaurant already exists; edit the existing record instead of creating another";

/// Id of the single restaurant row.
pub const RESTAURANT_ID: i64 = 1;

fn activity_from_row(r: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: r.get("id")?,
        category: r.get("category")?,
        season: r.get("season")?,
        title: r.get("title")?,
        slug: r.get("slug")?,
        description: r.get("description")?,
        image: r.get("image")?,
        video: r.get("video")?,
        is_active: r.get("is_active")?,
        order: r.get("sort_order")?,
        seo: seo_column(r)?,
    })
}

fn event_from_row(r: &Row<'_>) -> rusqlite::Result<EventType> {
    Ok(EventType {
        id: r.get("id")?,
        title: r.get("title")?,
        slug: r.get("slug")?,
        description: r.get("description")?,
        image: r.get("image")?,
        is_active: r.get("is_active")?,
        order: r.get("sort_order")?,
        seo: seo_column(r)?,
    })
}

fn news_from_row(r: &Row<'_>) -> rusqlite::Result<News> {
    Ok(News {
        id: r.get("id")?,
        title: r.get("title")?,
        slug: r.get("slug")?,
        content: r.get("content")?,
        short_description: r.get("short_description")?,
        excerpt: r.get("excerpt")?,
        image: r.get("image")?,
        published_at: r.get("published_at")?,
        is_published: r.get("is_published")?,
        created_at: r.get("created_at")?,
        updated_at: r.get("updated_at")?,
        seo: seo_column(r)?,
    })
}

fn restaurant_from_row(r: &Row<'_>) -> rusqlite::Result<Restaurant> {
    Ok(Restaurant {
        id: r.get("id")?,
        title: r.get("title")?,
        description: r.get("description")?,
        is_active: r.get("is_active")?,
        seo: seo_column(r)?,
    })
}

fn restaurant_image_from_row(r: &Row<'_>) -> rusqlite::Result<RestaurantImage> {
    Ok(RestaurantImage {
        id: r.get("id")?,
        restaurant_id: r.get("restaurant_id")?,
        image: r.get("image")?,
        alt_text: r.get("alt_text")?,
        order: r.get("sort_order")?,
    })
}

fn meal_type_from_row(r: &Row<'_>) -> rusqlite::Result<MealType> {
    Ok(MealType {
        id: r.get("id")?,
        name: r.get("name")?,
        icon_name: r.get("icon_name")?,
        description: r.get("description")?,
        time_start: r.get("time_start")?,
        order: r.get("sort_order")?,
    })
}

fn benefit_from_row(r: &Row<'_>) -> rusqlite::Result<RestaurantBenefit> {
    Ok(RestaurantBenefit {
        id: r.get("id")?,
        restaurant_id: r.get("restaurant_id")?,
        text: r.get("text")?,
        order: r.get("sort_order")?,
    })
}

impl Store {
    // =========================================================================
    // Activities
    // =========================================================================

    pub fn insert_activity(&mut self, a: &Activity) -> Result<i64, StoreError> {
        let slug = self.unique_slug("activities", &a.slug, &a.title, "activity", 0)?;
        self.conn.execute(
            "INSERT INTO activities (category, season, title, slug, description, image, video,
                is_active, sort_order, seo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                a.category,
                a.season,
                a.title,
                slug,
                a.description,
                a.image,
                a.video,
                a.is_active,
                a.order,
                seo_json(&a.seo)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Active activities by (category, season, order, title).
    pub fn activities(
        &self,
        category: Option<ActivityCategory>,
        season: Option<Season>,
    ) -> Result<Vec<Activity>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM activities
             WHERE is_active = 1
               AND (?1 IS NULL OR category = ?1)
               AND (?2 IS NULL OR season = ?2)
             ORDER BY category, season, sort_order, title",
        )?;
        let rows = stmt.query_map(params![category, season], activity_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn activity_by_slug(&self, slug: &str) -> Result<Option<Activity>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM activities WHERE slug = ?1 AND is_active = 1",
                [slug],
                activity_from_row,
            )
            .optional()?)
    }

    pub fn delete_activity(
        &mut self,
        id: i64,
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        self.delete_with_files("Activity", "activities", id, &[], cleanup)
    }

    // =========================================================================
    // Event types
    // =========================================================================

    pub fn insert_event_type(&mut self, e: &EventType) -> Result<i64, StoreError> {
        let slug = self.unique_slug("event_types", &e.slug, &e.title, "event", 0)?;
        self.conn.execute(
            "INSERT INTO event_types (title, slug, description, image, is_active, sort_order, seo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                e.title,
                slug,
                e.description,
                e.image,
                e.is_active,
                e.order,
                seo_json(&e.seo)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Active event types by (order, title).
    pub fn event_types(&self) -> Result<Vec<EventType>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM event_types WHERE is_active = 1 ORDER BY sort_order, title")?;
        let rows = stmt.query_map([], event_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn event_type_by_slug(&self, slug: &str) -> Result<Option<EventType>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM event_types WHERE slug = ?1 AND is_active = 1",
                [slug],
                event_from_row,
            )
            .optional()?)
    }

    pub fn delete_event_type(
        &mut self,
        id: i64,
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        self.delete_with_files("EventType", "event_types", id, &[], cleanup)
    }

    // =========================================================================
    // News
    // =========================================================================

    pub fn insert_news(&mut self, n: &News) -> Result<i64, StoreError> {
        let slug = self.unique_slug("news", &n.slug, &n.title, "news", 0)?;
        self.conn.execute(
            "INSERT INTO news (title, slug, content, short_description, excerpt, image,
                published_at, is_published, created_at, updated_at, seo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                n.title,
                slug,
                n.content,
                n.short_description,
                n.excerpt,
                n.image,
                n.published_at,
                n.is_published,
                n.created_at,
                n.updated_at,
                seo_json(&n.seo)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Published news visible at `now`, newest first.
    ///
    /// Timestamps are compared after parsing rather than as stored text.
    pub fn published_news(&self, now: DateTime<Utc>) -> Result<Vec<News>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM news WHERE is_published = 1")?;
        let rows = stmt.query_map([], news_from_row)?;
        let mut news: Vec<News> = rows
            .filter(|r| r.as_ref().map_or(true, |n| n.published_at <= now))
            .collect::<Result<_, _>>()?;
        news.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(news)
    }

    /// A published news item by slug, hidden until its publication time.
    pub fn news_by_slug(&self, slug: &str, now: DateTime<Utc>) -> Result<Option<News>, StoreError> {
        let item = self
            .conn
            .query_row(
                "SELECT * FROM news WHERE slug = ?1 AND is_published = 1",
                [slug],
                news_from_row,
            )
            .optional()?;
        Ok(item.filter(|n| n.published_at <= now))
    }

    pub fn delete_news(&mut self, id: i64, cleanup: &dyn MediaCleanup) -> Result<(), StoreError> {
        self.delete_with_files("News", "news", id, &[], cleanup)
    }

    // =========================================================================
    // Restaurant (hard singleton)
    // =========================================================================

    pub fn restaurant(&self) -> Result<Option<Restaurant>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM restaurant WHERE id = ?1",
                [RESTAURANT_ID],
                restaurant_from_row,
            )
            .optional()?)
    }

    /// Create the restaurant row. Fails if one already exists.
    pub fn create_restaurant(&mut self, r: &Restaurant) -> Result<i64, StoreError> {
        self.ensure_vacant("restaurant", RESTAURANT_EXISTS)?;
        let result = self.conn.execute(
            "INSERT INTO restaurant (id, title, description, is_active, seo)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                RESTAURANT_ID,
                r.title,
                r.description,
                r.is_active,
                seo_json(&r.seo)?
            ],
        );
        match result {
            Ok(_) => Ok(RESTAURANT_ID),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Singleton(RESTAURANT_EXISTS.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_restaurant(&mut self, r: &Restaurant) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE restaurant SET title = ?1, description = ?2, is_active = ?3, seo = ?4
             WHERE id = ?5",
            params![
                r.title,
                r.description,
                r.is_active,
                seo_json(&r.seo)?,
                RESTAURANT_ID
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "Restaurant",
                id: RESTAURANT_ID,
            });
        }
        Ok(())
    }

    /// Add an image to the restaurant. The restaurant row must exist.
    pub fn insert_restaurant_image(&mut self, i: &RestaurantImage) -> Result<i64, StoreError> {
        if self.restaurant()?.is_none() {
            return Err(StoreError::NotFound {
                entity: "Restaurant",
                id: RESTAURANT_ID,
            });
        }
        self.conn.execute(
            "INSERT INTO restaurant_images (restaurant_id, image, alt_text, sort_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![RESTAURANT_ID, i.image, i.alt_text, i.order],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn restaurant_images(&self) -> Result<Vec<RestaurantImage>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM restaurant_images WHERE restaurant_id = ?1 ORDER BY sort_order, id",
        )?;
        let rows = stmt.query_map([RESTAURANT_ID], restaurant_image_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn insert_meal_type(&mut self, m: &MealType) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO meal_types (name, icon_name, description, time_start, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![m.name, m.icon_name, m.description, m.time_start, m.order],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Every meal type by (order, name).
    pub fn meal_types(&self) -> Result<Vec<MealType>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM meal_types ORDER BY sort_order, name, id")?;
        let rows = stmt.query_map([], meal_type_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn delete_meal_type(&mut self, id: i64) -> Result<(), StoreError> {
        if self.conn.execute("DELETE FROM meal_types WHERE id = ?1", [id])? == 0 {
            return Err(StoreError::NotFound {
                entity: "MealType",
                id,
            });
        }
        Ok(())
    }

    /// Add a benefit to the restaurant. The restaurant row must exist.
    pub fn insert_restaurant_benefit(&mut self, b: &RestaurantBenefit) -> Result<i64, StoreError> {
        if self.restaurant()?.is_none() {
            return Err(StoreError::NotFound {
                entity: "Restaurant",
                id: RESTAURANT_ID,
            });
        }
        self.conn.execute(
            "INSERT INTO restaurant_benefits (restaurant_id, text, sort_order)
             VALUES (?1, ?2, ?3)",
            params![RESTAURANT_ID, b.text, b.order],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn restaurant_benefits(&self) -> Result<Vec<RestaurantBenefit>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM restaurant_benefits WHERE restaurant_id = ?1 ORDER BY sort_order, id",
        )?;
        let rows = stmt.query_map([RESTAURANT_ID], benefit_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn delete_restaurant_benefit(&mut self, id: i64) -> Result<(), StoreError> {
        if self
            .conn
            .execute("DELETE FROM restaurant_benefits WHERE id = ?1", [id])?
            == 0
        {
            return Err(StoreError::NotFound {
                entity: "RestaurantBenefit",
                id,
            });
        }
        Ok(())
    }

    pub fn delete_restaurant(&mut self, cleanup: &dyn MediaCleanup) -> Result<(), StoreError> {
        self.delete_with_files(
            "Restaurant",
            "restaurant",
            RESTAURANT_ID,
            &[("restaurant_images", "restaurant_id = ?1")],
            cleanup,
        )
    }

    pub fn delete_restaurant_image(
        &mut self,
        id: i64,
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        self.delete_with_files("RestaurantImage", "restaurant_images", id, &[], cleanup)
    }

    /// Create default site settings and restaurant rows if missing.
    /// Returns how many rows were created.
    pub fn ensure_singletons(&mut self) -> Result<usize, StoreError> {
        let mut created = 0;
        if self.site_settings()?.is_none() {
            self.create_site_settings(&SiteSettings::default())?;
            created += 1;
        }
        if self.restaurant()?.is_none() {
            self.create_restaurant(&Restaurant::default())?;
            created += 1;
        }
        if created > 0 {
            info!(created, "created default singleton rows");
        }
        Ok(created)
    }
}
