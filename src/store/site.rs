//! Site-wide content: settings singleton, statistics, gallery, hero.

use super::{MediaCleanup, Store, StoreError, seo_column, seo_json};
use super::models::*;
use rusqlite::{ErrorCode, OptionalExtension, Row, params, params_from_iter};
use tracing::info;

const SITE_SETTINGS_EXISTS: &str =
    "Site settings already exist; edit the existing record instead of creating another";
const HERO_ALREADY_ACTIVE: &str =
    "Only one hero section can be active at a time; deactivate the current one first";

fn site_settings_from_row(r: &Row<'_>) -> rusqlite::Result<SiteSettings> {
    Ok(SiteSettings {
        id: r.get("id")?,
        site_name: r.get("site_name")?,
        logo: r.get("logo")?,
        phone_primary: r.get("phone_primary")?,
        phone_secondary: r.get("phone_secondary")?,
        email: r.get("email")?,
        address: r.get("address")?,
        telegram_url: r.get("telegram_url")?,
        vk_url: r.get("vk_url")?,
        registry_number: r.get("registry_number")?,
        registry_url: r.get("registry_url")?,
        national_projects_logo: r.get("national_projects_logo")?,
        hero_image: r.get("hero_image")?,
        hero_title: r.get("hero_title")?,
        hero_subtitle: r.get("hero_subtitle")?,
        base_plan_image: r.get("base_plan_image")?,
        base_plan_description: r.get("base_plan_description")?,
        seo: seo_column(r)?,
    })
}

fn statistic_from_row(r: &Row<'_>) -> rusqlite::Result<Statistic> {
    Ok(Statistic {
        id: r.get("id")?,
        number: r.get("number")?,
        label: r.get("label")?,
        description: r.get("description")?,
        is_active: r.get("is_active")?,
        order: r.get("sort_order")?,
    })
}

fn gallery_from_row(r: &Row<'_>) -> rusqlite::Result<GalleryImage> {
    Ok(GalleryImage {
        id: r.get("id")?,
        image: r.get("image")?,
        alt_text: r.get("alt_text")?,
        position: r.get("position")?,
        column: r.get("column_name")?,
        order: r.get("sort_order")?,
        is_active: r.get("is_active")?,
    })
}

fn hero_section_from_row(r: &Row<'_>) -> rusqlite::Result<HeroSection> {
    Ok(HeroSection {
        id: r.get("id")?,
        title: r.get("title")?,
        subtitle: r.get("subtitle")?,
        preview_image: r.get("preview_image")?,
        promo_video: r.get("promo_video")?,
        video_poster: r.get("video_poster")?,
        display_type: r.get("display_type")?,
        autoplay_video: r.get("autoplay_video")?,
        loop_video: r.get("loop_video")?,
        mute_video: r.get("mute_video")?,
        is_active: r.get("is_active")?,
        order: r.get("sort_order")?,
        seo: seo_column(r)?,
    })
}

fn hero_image_from_row(r: &Row<'_>) -> rusqlite::Result<HeroImage> {
    Ok(HeroImage {
        id: r.get("id")?,
        hero_section_id: r.get("hero_section_id")?,
        image: r.get("image")?,
        alt_text: r.get("alt_text")?,
        order: r.get("sort_order")?,
        is_active: r.get("is_active")?,
        transition_duration: r.get("transition_duration")?,
    })
}

/// Map a hit on the single-active-hero index to a singleton error.
fn hero_constraint(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Singleton(HERO_ALREADY_ACTIVE.to_string())
        }
        _ => StoreError::Sqlite(e),
    }
}

impl Store {
    // =========================================================================
    // Site settings (hard singleton)
    // =========================================================================

    pub fn site_settings(&self) -> Result<Option<SiteSettings>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT * FROM site_settings WHERE id = 1", [], site_settings_from_row)
            .optional()?)
    }

    /// Create the settings row. Fails if one already exists.
    pub fn create_site_settings(&mut self, s: &SiteSettings) -> Result<i64, StoreError> {
        self.ensure_vacant("site_settings", SITE_SETTINGS_EXISTS)?;
        let result = self.conn.execute(
            "INSERT INTO site_settings (id, site_name, logo, phone_primary, phone_secondary, email,
                address, telegram_url, vk_url, registry_number, registry_url, national_projects_logo,
                hero_image, hero_title, hero_subtitle, base_plan_image, base_plan_description, seo)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                s.site_name,
                s.logo,
                s.phone_primary,
                s.phone_secondary,
                s.email,
                s.address,
                s.telegram_url,
                s.vk_url,
                s.registry_number,
                s.registry_url,
                s.national_projects_logo,
                s.hero_image,
                s.hero_title,
                s.hero_subtitle,
                s.base_plan_image,
                s.base_plan_description,
                seo_json(&s.seo)?,
            ],
        );
        match result {
            Ok(_) => Ok(1),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Singleton(SITE_SETTINGS_EXISTS.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Update the text fields of the settings row. File fields go through
    /// [`set_file`](Store::set_file).
    pub fn update_site_settings(&mut self, s: &SiteSettings) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE site_settings SET site_name = ?1, phone_primary = ?2, phone_secondary = ?3,
                email = ?4, address = ?5, telegram_url = ?6, vk_url = ?7, registry_number = ?8,
                registry_url = ?9, hero_title = ?10, hero_subtitle = ?11,
                base_plan_description = ?12, seo = ?13
             WHERE id = 1",
            params![
                s.site_name,
                s.phone_primary,
                s.phone_secondary,
                s.email,
                s.address,
                s.telegram_url,
                s.vk_url,
                s.registry_number,
                s.registry_url,
                s.hero_title,
                s.hero_subtitle,
                s.base_plan_description,
                seo_json(&s.seo)?,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "SiteSettings",
                id: 1,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    pub fn insert_statistic(&mut self, s: &Statistic) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO statistics (number, label, description, is_active, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![s.number, s.label, s.description, s.is_active, s.order],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn active_statistics(&self) -> Result<Vec<Statistic>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM statistics WHERE is_active = 1 ORDER BY sort_order, id",
        )?;
        let rows = stmt.query_map([], statistic_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn delete_statistic(&mut self, id: i64) -> Result<(), StoreError> {
        self.delete_with_files("Statistic", "statistics", id, &[], &())
    }

    // =========================================================================
    // Gallery
    // =========================================================================

    pub fn insert_gallery_image(&mut self, g: &GalleryImage) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO gallery_images (image, alt_text, position, column_name, sort_order, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![g.image, g.alt_text, g.position, g.column, g.order, g.is_active],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Active gallery images, optionally for one position, by
    /// (position, order, id).
    pub fn gallery_images(
        &self,
        position: Option<GalleryPosition>,
    ) -> Result<Vec<GalleryImage>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM gallery_images
             WHERE is_active = 1 AND (?1 IS NULL OR position = ?1)
             ORDER BY position, sort_order, id",
        )?;
        let rows = stmt.query_map([position], gallery_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn delete_gallery_image(
        &mut self,
        id: i64,
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        self.delete_with_files("GalleryImage", "gallery_images", id, &[], cleanup)
    }

    // =========================================================================
    // Hero sections (soft singleton)
    // =========================================================================

    fn active_hero_id(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM hero_sections WHERE is_active = 1",
                [],
                |r| r.get(0),
            )
            .optional()?)
    }

    /// Insert a hero section. Inserting an active one while another is
    /// active fails with [`StoreError::Singleton`].
    pub fn insert_hero_section(&mut self, h: &HeroSection) -> Result<i64, StoreError> {
        if h.is_active && self.active_hero_id()?.is_some() {
            return Err(StoreError::Singleton(HERO_ALREADY_ACTIVE.to_string()));
        }
        self.conn
            .execute(
                "INSERT INTO hero_sections (title, subtitle, preview_image, promo_video, video_poster,
                    display_type, autoplay_video, loop_video, mute_video, is_active, sort_order, seo)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    h.title,
                    h.subtitle,
                    h.preview_image,
                    h.promo_video,
                    h.video_poster,
                    h.display_type,
                    h.autoplay_video,
                    h.loop_video,
                    h.mute_video,
                    h.is_active,
                    h.order,
                    seo_json(&h.seo)?,
                ],
            )
            .map_err(hero_constraint)?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn hero_section(&self, id: i64) -> Result<Option<HeroSection>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM hero_sections WHERE id = ?1",
                [id],
                hero_section_from_row,
            )
            .optional()?)
    }

    pub fn active_hero_section(&self) -> Result<Option<HeroSection>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM hero_sections WHERE is_active = 1",
                [],
                hero_section_from_row,
            )
            .optional()?)
    }

    /// Make exactly one of `ids` the active hero section.
    ///
    /// In one transaction: every section is deactivated, then the first of
    /// the selected sections by (order, id) is activated. Returns the id that
    /// ended up active, or `None` if no selected id exists.
    pub fn activate_hero_sections(&mut self, ids: &[i64]) -> Result<Option<i64>, StoreError> {
        if ids.is_empty() {
            return Ok(None);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let tx = self.conn.transaction()?;
        let chosen: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT id FROM hero_sections WHERE id IN ({placeholders})
                     ORDER BY sort_order, id LIMIT 1"
                ),
                params_from_iter(ids.iter()),
                |r| r.get(0),
            )
            .optional()?;
        let Some(chosen) = chosen else {
            return Ok(None);
        };
        tx.execute("UPDATE hero_sections SET is_active = 0 WHERE is_active = 1", [])?;
        tx.execute("UPDATE hero_sections SET is_active = 1 WHERE id = ?1", [chosen])?;
        tx.commit()?;

        if ids.len() > 1 {
            info!(active = chosen, selected = ids.len(), "activated first selected hero section");
        } else {
            info!(active = chosen, "activated hero section");
        }
        Ok(Some(chosen))
    }

    /// Deactivate the given sections. Returns how many rows changed.
    pub fn deactivate_hero_sections(&mut self, ids: &[i64]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let changed = self.conn.execute(
            &format!("UPDATE hero_sections SET is_active = 0 WHERE id IN ({placeholders})"),
            params_from_iter(ids.iter()),
        )?;
        Ok(changed)
    }

    pub fn delete_hero_section(
        &mut self,
        id: i64,
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        self.delete_with_files(
            "HeroSection",
            "hero_sections",
            id,
            &[("hero_images", "hero_section_id = ?1")],
            cleanup,
        )
    }

    pub fn insert_hero_image(&mut self, h: &HeroImage) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO hero_images (hero_section_id, image, alt_text, sort_order, is_active,
                transition_duration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                h.hero_section_id,
                h.image,
                h.alt_text,
                h.order,
                h.is_active,
                h.transition_duration
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Active images of a hero section by (order, id).
    pub fn hero_images(&self, hero_section_id: i64) -> Result<Vec<HeroImage>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM hero_images WHERE hero_section_id = ?1 AND is_active = 1
             ORDER BY sort_order, id",
        )?;
        let rows = stmt.query_map([hero_section_id], hero_image_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn delete_hero_image(
        &mut self,
        id: i64,
        cleanup: &dyn MediaCleanup,
    ) -> Result<(), StoreError> {
        self.delete_with_files("HeroImage", "hero_images", id, &[], cleanup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::Recorder;

    fn hero(title: &str, order: i64, active: bool) -> HeroSection {
        HeroSection {
            title: title.into(),
            order,
            is_active: active,
            ..HeroSection::default()
        }
    }

    fn active_ids(store: &Store) -> Vec<i64> {
        let mut stmt = store
            .conn
            .prepare("SELECT id FROM hero_sections WHERE is_active = 1")
            .unwrap();
        let ids = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        ids
    }

    // =========================================================================
    // Site settings
    // =========================================================================

    #[test]
    fn second_site_settings_is_rejected_and_first_kept() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .create_site_settings(&SiteSettings {
                site_name: "Lakeside".into(),
                ..SiteSettings::default()
            })
            .unwrap();

        let err = store
            .create_site_settings(&SiteSettings {
                site_name: "Impostor".into(),
                ..SiteSettings::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Singleton(_)));
        assert_eq!(store.site_settings().unwrap().unwrap().site_name, "Lakeside");
    }

    #[test]
    fn schema_rejects_second_settings_row_directly() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute("INSERT INTO site_settings (id) VALUES (1)", [])
            .unwrap();
        assert!(
            store
                .conn
                .execute("INSERT INTO site_settings (id) VALUES (2)", [])
                .is_err()
        );
    }

    #[test]
    fn update_site_settings_keeps_images() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .create_site_settings(&SiteSettings {
                site_name: "Lakeside".into(),
                logo: Some("site/logo.png".into()),
                ..SiteSettings::default()
            })
            .unwrap();
        let mut s = store.site_settings().unwrap().unwrap();
        s.phone_primary = "+7 900 000-00-00".into();
        s.logo = None;
        store.update_site_settings(&s).unwrap();

        let reread = store.site_settings().unwrap().unwrap();
        assert_eq!(reread.phone_primary, "+7 900 000-00-00");
        assert_eq!(reread.logo.as_deref(), Some("site/logo.png"));
    }

    // =========================================================================
    // Statistics and gallery
    // =========================================================================

    #[test]
    fn statistics_filter_inactive_and_sort() {
        let mut store = Store::open_in_memory().unwrap();
        for (label, order, active) in [("b", 2, true), ("a", 1, true), ("hidden", 0, false)] {
            store
                .insert_statistic(&Statistic {
                    number: "10".into(),
                    label: label.into(),
                    order,
                    is_active: active,
                    ..Statistic::default()
                })
                .unwrap();
        }
        let labels: Vec<_> = store
            .active_statistics()
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, ["a", "b"]);
    }

    #[test]
    fn gallery_filters_by_position() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .insert_gallery_image(&GalleryImage {
                image: Some("gallery/a.jpg".into()),
                position: GalleryPosition::Hero,
                ..GalleryImage::default()
            })
            .unwrap();
        store
            .insert_gallery_image(&GalleryImage {
                image: Some("gallery/b.jpg".into()),
                column: Some(GalleryColumn::Left),
                ..GalleryImage::default()
            })
            .unwrap();

        assert_eq!(store.gallery_images(None).unwrap().len(), 2);
        let main = store.gallery_images(Some(GalleryPosition::Main)).unwrap();
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].column, Some(GalleryColumn::Left));
    }

    #[test]
    fn deleting_gallery_image_discards_file() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store
            .insert_gallery_image(&GalleryImage {
                image: Some("gallery/a.jpg".into()),
                ..GalleryImage::default()
            })
            .unwrap();
        let rec = Recorder::default();
        store.delete_gallery_image(id, &rec).unwrap();
        assert_eq!(*rec.0.borrow(), ["gallery/a.jpg"]);
        assert!(matches!(
            store.delete_gallery_image(id, &rec),
            Err(StoreError::NotFound { .. })
        ));
    }

    // =========================================================================
    // Hero sections
    // =========================================================================

    #[test]
    fn second_active_hero_is_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        store.insert_hero_section(&hero("one", 0, true)).unwrap();
        let err = store.insert_hero_section(&hero("two", 0, true)).unwrap_err();
        assert!(matches!(err, StoreError::Singleton(_)));
        // Inactive ones are fine
        store.insert_hero_section(&hero("three", 0, false)).unwrap();
    }

    #[test]
    fn index_rejects_second_active_row_directly() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute("INSERT INTO hero_sections (is_active) VALUES (1)", [])
            .unwrap();
        assert!(
            store
                .conn
                .execute("INSERT INTO hero_sections (is_active) VALUES (1)", [])
                .is_err()
        );
    }

    #[test]
    fn batch_activation_leaves_exactly_one_active() {
        let mut store = Store::open_in_memory().unwrap();
        let current = store.insert_hero_section(&hero("current", 0, true)).unwrap();
        let late = store.insert_hero_section(&hero("late", 5, false)).unwrap();
        let early = store.insert_hero_section(&hero("early", 1, false)).unwrap();

        let chosen = store.activate_hero_sections(&[late, early]).unwrap();
        assert_eq!(chosen, Some(early));
        assert_eq!(active_ids(&store), [early]);
        assert_ne!(current, early);
    }

    #[test]
    fn activation_ties_break_by_id() {
        let mut store = Store::open_in_memory().unwrap();
        let a = store.insert_hero_section(&hero("a", 0, false)).unwrap();
        let b = store.insert_hero_section(&hero("b", 0, false)).unwrap();
        assert_eq!(store.activate_hero_sections(&[b, a]).unwrap(), Some(a));
    }

    #[test]
    fn activating_unknown_ids_changes_nothing() {
        let mut store = Store::open_in_memory().unwrap();
        let a = store.insert_hero_section(&hero("a", 0, true)).unwrap();
        assert_eq!(store.activate_hero_sections(&[99]).unwrap(), None);
        assert_eq!(active_ids(&store), [a]);
    }

    #[test]
    fn deactivate_clears_selected() {
        let mut store = Store::open_in_memory().unwrap();
        let a = store.insert_hero_section(&hero("a", 0, true)).unwrap();
        assert_eq!(store.deactivate_hero_sections(&[a]).unwrap(), 1);
        assert!(store.active_hero_section().unwrap().is_none());
    }

    #[test]
    fn deleting_hero_section_cascades_to_images() {
        let mut store = Store::open_in_memory().unwrap();
        let section = store
            .insert_hero_section(&HeroSection {
                preview_image: Some("hero/preview.jpg".into()),
                seo: Seo {
                    og_image: Some("og_images/hero.jpg".into()),
                    ..Seo::default()
                },
                ..hero("h", 0, true)
            })
            .unwrap();
        for name in ["hero/images/1.jpg", "hero/images/2.jpg"] {
            store
                .insert_hero_image(&HeroImage {
                    hero_section_id: section,
                    image: Some(name.into()),
                    ..HeroImage::default()
                })
                .unwrap();
        }

        let rec = Recorder::default();
        store.delete_hero_section(section, &rec).unwrap();

        let mut discarded = rec.0.borrow().clone();
        discarded.sort();
        assert_eq!(
            discarded,
            [
                "hero/images/1.jpg",
                "hero/images/2.jpg",
                "hero/preview.jpg",
                "og_images/hero.jpg"
            ]
        );
        assert!(store.hero_images(section).unwrap().is_empty());
    }
}
