use super::{Api, ApiError, Result};
use crate::imaging::ImageBackend;
use crate::registry::Model;
use crate::resolver::RequestContext;
use crate::store::{Lodge, LodgeFilter, LodgeType};
use serde_json::{Value, json};

impl<B: ImageBackend> Api<'_, B> {
    fn lodge_payload(&self, l: &Lodge, t: &LodgeType, ctx: &RequestContext) -> Result<Value> {
        let images: Vec<Value> = self
            .store
            .lodge_images(l.id)?
            .iter()
            .map(|i| {
                let mut image = json!({
                    "id": i.id,
                    "alt_text": i.alt_text,
                    "order": i.order,
                });
                self.with_image(&mut image, Model::LodgeImage, "image", i.image.as_deref(), ctx);
                image
            })
            .collect();

        Ok(json!({
            "id": l.id,
            "name": l.name,
            "slug": l.slug,
            "lodge_type": t.id,
            "lodge_type_name": t.name,
            "lodge_type_slug": t.slug,
            "description": l.description,
            "short_description": l.short_description,
            "capacity": l.capacity,
            "area": l.area,
            "price_from": l.price_from,
            "location_description": l.location_description,
            "is_active": l.is_active,
            "order": l.order,
            "images": images,
            "breadcrumbs": [
                { "name": "Home", "url": "/" },
                { "name": t.name, "url": format!("/lodges/types/{}/", t.slug) },
                { "name": l.name, "url": format!("/lodges/{}/", l.slug) },
            ],
            "seo_fields": self.seo_fields(&l.seo, ctx),
        }))
    }

    fn lodge_with_type(&self, l: &Lodge, ctx: &RequestContext) -> Result<Value> {
        let t = self
            .store
            .lodge_type(l.lodge_type_id)?
            .ok_or_else(|| ApiError::NotFound(format!("lodge type {}", l.lodge_type_id)))?;
        self.lodge_payload(l, &t, ctx)
    }

    fn lodge_type_payload(&self, t: &LodgeType, ctx: &RequestContext) -> Result<Value> {
        let lodges = self
            .store
            .lodges_of_type(t.id)?
            .iter()
            .map(|l| self.lodge_payload(l, t, ctx))
            .collect::<Result<Vec<_>>>()?;

        let mut payload = json!({
            "id": t.id,
            "name": t.name,
            "slug": t.slug,
            "subtitle": t.subtitle,
            "description": t.description,
            "is_active": t.is_active,
            "order": t.order,
            "lodges": lodges,
            "seo_fields": self.seo_fields(&t.seo, ctx),
        });
        self.with_image(&mut payload, Model::LodgeType, "hero_image", t.hero_image.as_deref(), ctx);
        Ok(payload)
    }

    /// Active lodge types, each with its active lodges.
    pub fn lodge_types(&self, ctx: &RequestContext) -> Result<Value> {
        let types = self
            .store
            .lodge_types()?
            .iter()
            .map(|t| self.lodge_type_payload(t, ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(types))
    }

    pub fn lodge_type(&self, ctx: &RequestContext, slug: &str) -> Result<Value> {
        let t = self
            .store
            .lodge_type_by_slug(slug)?
            .ok_or_else(|| ApiError::NotFound(format!("lodge type '{slug}'")))?;
        self.lodge_type_payload(&t, ctx)
    }

    /// Active lodges matching `filter`.
    pub fn lodges(&self, ctx: &RequestContext, filter: &LodgeFilter) -> Result<Value> {
        let lodges = self
            .store
            .lodges(filter)?
            .iter()
            .map(|l| self.lodge_with_type(l, ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(lodges))
    }

    pub fn lodge(&self, ctx: &RequestContext, slug: &str) -> Result<Value> {
        let l = self
            .store
            .lodge_by_slug(slug)?
            .ok_or_else(|| ApiError::NotFound(format!("lodge '{slug}'")))?;
        self.lodge_with_type(&l, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::resolver::Resolver;
    use crate::store::LodgeImage;
    use crate::test_helpers::{MockFixture, upload};

    fn seed(fx: &mut MockFixture) -> i64 {
        let hero = upload(&fx.materializer, "lodges/types/", "cabins.jpg");
        let t = fx
            .store
            .insert_lodge_type(&LodgeType {
                name: "Cabins".into(),
                hero_image: Some(hero),
                ..LodgeType::default()
            })
            .unwrap();
        let lodge = fx
            .store
            .insert_lodge(&Lodge {
                lodge_type_id: t,
                name: "Pine Cabin".into(),
                capacity: 4,
                price_from: Some(5000.0),
                ..Lodge::default()
            })
            .unwrap();
        fx.store
            .insert_lodge(&Lodge {
                lodge_type_id: t,
                name: "Closed Cabin".into(),
                is_active: false,
                ..Lodge::default()
            })
            .unwrap();
        let photo = upload(&fx.materializer, "lodges/images/", "pine.jpg");
        fx.store
            .insert_lodge_image(&LodgeImage {
                lodge_id: lodge,
                image: Some(photo),
                alt_text: "Porch".into(),
                ..LodgeImage::default()
            })
            .unwrap();
        t
    }

    #[test]
    fn lodge_types_nest_active_lodges() {
        let mut fx = MockFixture::new();
        seed(&mut fx);
        let api = Api::new(&fx.store, Resolver::new(&fx.materializer, Quality::new(50)));

        let p = api.lodge_types(&RequestContext::relative()).unwrap();
        assert_eq!(p[0]["slug"], "cabins");
        assert_eq!(
            p[0]["hero_image_webp_url"],
            "/media/CACHE/images/lodges/types/cabins.jpg/webp.webp"
        );
        let lodges = p[0]["lodges"].as_array().unwrap();
        assert_eq!(lodges.len(), 1);
        assert_eq!(lodges[0]["lodge_type_name"], "Cabins");
        assert_eq!(lodges[0]["images"][0]["alt_text"], "Porch");
        assert!(lodges[0]["images"][0]["image_webp_url"].is_string());
    }

    #[test]
    fn lodge_detail_has_breadcrumbs() {
        let mut fx = MockFixture::new();
        seed(&mut fx);
        let api = Api::new(&fx.store, Resolver::new(&fx.materializer, Quality::new(50)));

        let p = api.lodge(&RequestContext::relative(), "pine-cabin").unwrap();
        assert_eq!(p["price_from"], 5000.0);
        assert_eq!(p["breadcrumbs"][1]["url"], "/lodges/types/cabins/");
        assert_eq!(p["breadcrumbs"][2]["name"], "Pine Cabin");
    }

    #[test]
    fn inactive_lodge_is_not_found() {
        let mut fx = MockFixture::new();
        seed(&mut fx);
        let api = Api::new(&fx.store, Resolver::new(&fx.materializer, Quality::new(50)));
        assert!(matches!(
            api.lodge(&RequestContext::relative(), "closed-cabin"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn lodge_list_applies_filter() {
        let mut fx = MockFixture::new();
        seed(&mut fx);
        let api = Api::new(&fx.store, Resolver::new(&fx.materializer, Quality::new(50)));

        let all = api
            .lodges(&RequestContext::relative(), &LodgeFilter::default())
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);

        let none = api
            .lodges(
                &RequestContext::relative(),
                &LodgeFilter {
                    capacity_min: Some(10),
                    ..LodgeFilter::default()
                },
            )
            .unwrap();
        assert!(none.as_array().unwrap().is_empty());
    }
}
