//! JSON payload builders.
//!
//! Each public method on [`Api`] produces the representation of one resource
//! as a `serde_json::Value`. Every image field goes through the
//! [`Resolver`], so payloads carry `<field>_url`, `<field>_webp_url` and,
//! where registered, `<field>_variants` and `<field>_placeholder_*`.
//!
//! Builders are grouped by resource family:
//! - `site`: site settings, statistics, gallery, hero
//! - `lodges`: lodge types and lodges
//! - `content`: activities, events, news, restaurant

mod content;
mod lodges;
mod site;

use crate::imaging::{ImageBackend, RustBackend};
use crate::registry::Model;
use crate::resolver::{RequestContext, Resolver};
use crate::store::{Seo, Store, StoreError};
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0} not found")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Resource paths listed by [`api_root`], relative to the API prefix.
const RESOURCES: &[(&str, &[(&str, &str)])] = &[
    ("lodges", &[("list", "lodges/"), ("types", "lodges/types/")]),
    ("activities", &[("list", "activities/")]),
    ("events", &[("list", "events/")]),
    ("news", &[("list", "news/")]),
    (
        "restaurant",
        &[
            ("detail", "restaurant/"),
            ("images", "restaurant/images/"),
            ("meal-types", "restaurant/meal-types/"),
            ("benefits", "restaurant/benefits/"),
        ],
    ),
    (
        "core",
        &[
            ("hero", "hero/"),
            ("site-settings", "site-settings/"),
            ("statistics", "statistics/"),
            ("gallery", "gallery/"),
        ],
    ),
];

/// Index of every resource path, absolute when the context has a base URL.
pub fn api_root(ctx: &RequestContext) -> Value {
    let mut root = Map::new();
    for (group, entries) in RESOURCES {
        let links: Map<String, Value> = entries
            .iter()
            .map(|(name, path)| {
                (
                    name.to_string(),
                    Value::String(ctx.absolute(&format!("/api/{path}"))),
                )
            })
            .collect();
        root.insert(group.to_string(), Value::Object(links));
    }
    Value::Object(root)
}

/// Payload builder over one store and one resolver.
pub struct Api<'a, B: ImageBackend = RustBackend> {
    store: &'a Store,
    resolver: Resolver<'a, B>,
}

impl<'a, B: ImageBackend> Api<'a, B> {
    pub fn new(store: &'a Store, resolver: Resolver<'a, B>) -> Self {
        Self { store, resolver }
    }

    pub fn store(&self) -> &'a Store {
        self.store
    }

    pub fn resolver(&self) -> &Resolver<'a, B> {
        &self.resolver
    }

    /// SEO block with `og_image` resolved to a URL.
    pub fn seo_fields(&self, seo: &Seo, ctx: &RequestContext) -> Value {
        json!({
            "meta_title": seo.meta_title,
            "meta_description": seo.meta_description,
            "meta_keywords": seo.meta_keywords,
            "og_title": seo.og_title,
            "og_description": seo.og_description,
            "og_image": self.resolver.file_url(seo.og_image.as_deref(), ctx),
            "canonical_url": seo.canonical_url,
            "robots_meta": seo.robots_meta,
        })
    }

    /// Merge the image keys of `field` (named after the field) into `payload`.
    fn with_image(
        &self,
        payload: &mut Value,
        model: Model,
        field: &str,
        value: Option<&str>,
        ctx: &RequestContext,
    ) {
        if let Value::Object(map) = payload {
            map.extend(self.resolver.image_fields(model, field, field, value, ctx));
        }
    }

    fn with_file(&self, payload: &mut Value, key: &str, value: Option<&str>, ctx: &RequestContext) {
        if let Value::Object(map) = payload {
            map.insert(
                format!("{key}_url"),
                self.resolver
                    .file_url(value, ctx)
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
        }
    }
}
