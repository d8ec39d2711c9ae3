use super::{Api, ApiError, Result};
use crate::imaging::ImageBackend;
use crate::registry::Model;
use crate::resolver::RequestContext;
use crate::store::{
    Activity, ActivityCategory, EventType, MealType, News, RestaurantBenefit, RestaurantImage,
    Season,
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

impl<B: ImageBackend> Api<'_, B> {
    fn activity_payload(&self, a: &Activity, ctx: &RequestContext) -> Value {
        let mut payload = json!({
            "id": a.id,
            "category": a.category,
            "category_display": a.category.label(),
            "season": a.season,
            "season_display": a.season.map(|s| s.label()),
            "title": a.title,
            "slug": a.slug,
            "description": a.description,
            "is_active": a.is_active,
            "order": a.order,
            "seo_fields": self.seo_fields(&a.seo, ctx),
        });
        self.with_image(&mut payload, Model::Activity, "image", a.image.as_deref(), ctx);
        self.with_file(&mut payload, "video", a.video.as_deref(), ctx);
        payload
    }

    pub fn activities(
        &self,
        ctx: &RequestContext,
        category: Option<ActivityCategory>,
        season: Option<Season>,
    ) -> Result<Value> {
        Ok(Value::Array(
            self.store
                .activities(category, season)?
                .iter()
                .map(|a| self.activity_payload(a, ctx))
                .collect(),
        ))
    }

    fn event_payload(&self, e: &EventType, ctx: &RequestContext) -> Value {
        let mut payload = json!({
            "id": e.id,
            "title": e.title,
            "slug": e.slug,
            "description": e.description,
            "is_active": e.is_active,
            "order": e.order,
            "seo_fields": self.seo_fields(&e.seo, ctx),
        });
        self.with_image(&mut payload, Model::EventType, "image", e.image.as_deref(), ctx);
        payload
    }

    pub fn events(&self, ctx: &RequestContext) -> Result<Value> {
        Ok(Value::Array(
            self.store
                .event_types()?
                .iter()
                .map(|e| self.event_payload(e, ctx))
                .collect(),
        ))
    }

    pub fn event(&self, ctx: &RequestContext, slug: &str) -> Result<Value> {
        let e = self
            .store
            .event_type_by_slug(slug)?
            .ok_or_else(|| ApiError::NotFound(format!("event '{slug}'")))?;
        Ok(self.event_payload(&e, ctx))
    }

    /// List shape: no body, no SEO block.
    fn news_summary(&self, n: &News, ctx: &RequestContext) -> Value {
        let mut payload = json!({
            "id": n.id,
            "title": n.title,
            "slug": n.slug,
            "short_description": n.short_description,
            "excerpt": n.excerpt,
            "published_at": n.published_at,
        });
        self.with_image(&mut payload, Model::News, "image", n.image.as_deref(), ctx);
        payload
    }

    fn news_detail(&self, n: &News, ctx: &RequestContext) -> Value {
        let mut payload = self.news_summary(n, ctx);
        if let Value::Object(map) = &mut payload {
            map.insert("content".into(), json!(n.content));
            map.insert("is_published".into(), json!(n.is_published));
            map.insert("created_at".into(), json!(n.created_at));
            map.insert("updated_at".into(), json!(n.updated_at));
            map.insert("seo_fields".into(), self.seo_fields(&n.seo, ctx));
        }
        payload
    }

    /// Published news visible now, newest first.
    pub fn news(&self, ctx: &RequestContext) -> Result<Value> {
        self.news_at(ctx, Utc::now())
    }

    pub fn news_at(&self, ctx: &RequestContext, now: DateTime<Utc>) -> Result<Value> {
        Ok(Value::Array(
            self.store
                .published_news(now)?
                .iter()
                .map(|n| self.news_summary(n, ctx))
                .collect(),
        ))
    }

    pub fn news_item(&self, ctx: &RequestContext, slug: &str) -> Result<Value> {
        let n = self
            .store
            .news_by_slug(slug, Utc::now())?
            .ok_or_else(|| ApiError::NotFound(format!("news '{slug}'")))?;
        Ok(self.news_detail(&n, ctx))
    }

    fn restaurant_image_payload(&self, i: &RestaurantImage, ctx: &RequestContext) -> Value {
        let mut image = json!({
            "id": i.id,
            "alt_text": i.alt_text,
            "order": i.order,
        });
        self.with_image(
            &mut image,
            Model::RestaurantImage,
            "image",
            i.image.as_deref(),
            ctx,
        );
        image
    }

    fn meal_type_payload(m: &MealType) -> Value {
        json!({
            "id": m.id,
            "name": m.name,
            "icon_name": m.icon_name,
            "description": m.description,
            "time_start": m.time_start,
            "order": m.order,
        })
    }

    fn benefit_payload(b: &RestaurantBenefit) -> Value {
        json!({
            "id": b.id,
            "text": b.text,
            "order": b.order,
        })
    }

    /// Restaurant images by (order, id). Empty when there is no restaurant.
    pub fn restaurant_images(&self, ctx: &RequestContext) -> Result<Value> {
        Ok(Value::Array(
            self.store
                .restaurant_images()?
                .iter()
                .map(|i| self.restaurant_image_payload(i, ctx))
                .collect(),
        ))
    }

    /// Every meal type by (order, name).
    pub fn meal_types(&self, _ctx: &RequestContext) -> Result<Value> {
        Ok(Value::Array(
            self.store
                .meal_types()?
                .iter()
                .map(Self::meal_type_payload)
                .collect(),
        ))
    }

    pub fn restaurant_benefits(&self, _ctx: &RequestContext) -> Result<Value> {
        Ok(Value::Array(
            self.store
                .restaurant_benefits()?
                .iter()
                .map(Self::benefit_payload)
                .collect(),
        ))
    }

    /// The restaurant with its images, meal types and benefits.
    pub fn restaurant(&self, ctx: &RequestContext) -> Result<Value> {
        let r = self
            .store
            .restaurant()?
            .ok_or_else(|| ApiError::NotFound("restaurant".into()))?;

        Ok(json!({
            "id": r.id,
            "title": r.title,
            "description": r.description,
            "is_active": r.is_active,
            "images": self.restaurant_images(ctx)?,
            "meal_types": self.meal_types(ctx)?,
            "benefits": self.restaurant_benefits(ctx)?,
            "seo_fields": self.seo_fields(&r.seo, ctx),
        }))
    }
}
