use super::{Api, ApiError, Result};
use crate::imaging::ImageBackend;
use crate::registry::Model;
use crate::resolver::RequestContext;
use crate::store::{GalleryImage, GalleryPosition, HeroImage, HeroSection};
use serde_json::{Value, json};

impl<B: ImageBackend> Api<'_, B> {
    pub fn site_settings(&self, ctx: &RequestContext) -> Result<Value> {
        let s = self
            .store
            .site_settings()?
            .ok_or_else(|| ApiError::NotFound("site settings".into()))?;

        let mut payload = json!({
            "id": s.id,
            "site_name": s.site_name,
            "phone_primary": s.phone_primary,
            "phone_secondary": s.phone_secondary,
            "email": s.email,
            "address": s.address,
            "telegram_url": s.telegram_url,
            "vk_url": s.vk_url,
            "registry_number": s.registry_number,
            "registry_url": s.registry_url,
            "hero_title": s.hero_title,
            "hero_subtitle": s.hero_subtitle,
            "base_plan_description": s.base_plan_description,
            "seo_fields": self.seo_fields(&s.seo, ctx),
        });
        let model = Model::SiteSettings;
        self.with_image(&mut payload, model, "logo", s.logo.as_deref(), ctx);
        self.with_image(
            &mut payload,
            model,
            "national_projects_logo",
            s.national_projects_logo.as_deref(),
            ctx,
        );
        self.with_image(&mut payload, model, "hero_image", s.hero_image.as_deref(), ctx);
        self.with_image(
            &mut payload,
            model,
            "base_plan_image",
            s.base_plan_image.as_deref(),
            ctx,
        );
        Ok(payload)
    }

    pub fn statistics(&self, _ctx: &RequestContext) -> Result<Value> {
        let stats: Vec<Value> = self
            .store
            .active_statistics()?
            .into_iter()
            .map(|s| {
                json!({
                    "id": s.id,
                    "number": s.number,
                    "label": s.label,
                    "description": s.description,
                    "is_active": s.is_active,
                    "order": s.order,
                })
            })
            .collect();
        Ok(Value::Array(stats))
    }

    fn gallery_image(&self, g: &GalleryImage, ctx: &RequestContext) -> Value {
        let mut payload = json!({
            "id": g.id,
            "alt_text": g.alt_text,
            "position": g.position,
            "position_display": g.position.label(),
            "column": g.column,
            "column_display": g.column.map(|c| c.label()),
            "order": g.order,
            "is_active": g.is_active,
        });
        self.with_image(&mut payload, Model::GalleryImage, "image", g.image.as_deref(), ctx);
        payload
    }

    /// Active gallery images, optionally restricted to one position.
    pub fn gallery(&self, ctx: &RequestContext, position: Option<GalleryPosition>) -> Result<Value> {
        let images = self.store.gallery_images(position)?;
        Ok(Value::Array(
            images.iter().map(|g| self.gallery_image(g, ctx)).collect(),
        ))
    }

    fn hero_image(&self, h: &HeroImage, ctx: &RequestContext) -> Value {
        let mut payload = json!({
            "id": h.id,
            "alt_text": h.alt_text,
            "order": h.order,
            "is_active": h.is_active,
            "transition_duration": h.transition_duration,
        });
        self.with_image(&mut payload, Model::HeroImage, "image", h.image.as_deref(), ctx);
        payload
    }

    fn hero_section(&self, h: &HeroSection, ctx: &RequestContext) -> Result<Value> {
        let images: Vec<Value> = self
            .store
            .hero_images(h.id)?
            .iter()
            .map(|i| self.hero_image(i, ctx))
            .collect();

        let mut payload = json!({
            "id": h.id,
            "title": h.title,
            "subtitle": h.subtitle,
            "display_type": h.display_type,
            "display_type_display": h.display_type.label(),
            "autoplay_video": h.autoplay_video,
            "loop_video": h.loop_video,
            "mute_video": h.mute_video,
            "is_active": h.is_active,
            "order": h.order,
            "images": images,
            "seo_fields": self.seo_fields(&h.seo, ctx),
        });
        let model = Model::HeroSection;
        self.with_image(&mut payload, model, "preview_image", h.preview_image.as_deref(), ctx);
        self.with_image(&mut payload, model, "video_poster", h.video_poster.as_deref(), ctx);
        self.with_file(&mut payload, "promo_video", h.promo_video.as_deref(), ctx);
        Ok(payload)
    }

    /// The active hero section with its active slider images.
    pub fn hero(&self, ctx: &RequestContext) -> Result<Value> {
        let section = self
            .store
            .active_hero_section()?
            .ok_or_else(|| ApiError::NotFound("active hero section".into()))?;
        self.hero_section(&section, ctx)
    }
}
