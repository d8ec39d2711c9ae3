//! URL resolution with fallback to the original upload.
//!
//! Every image URL in every payload goes through [`Resolver`]. The contract is
//! simple and never fails:
//!
//! 1. No source → `None`.
//! 2. Try the requested variant (or each variant of a chain, in order).
//! 3. Anything goes wrong → the original upload's URL.
//!
//! Failures are logged and swallowed here so payload builders never deal with
//! image errors.

use crate::imaging::{ImageBackend, Quality, RustBackend};
use crate::materialize::{MaterializeError, Materializer};
use crate::placeholder::encode_placeholder;
use crate::registry::{self, Model, PLACEHOLDER};
use crate::storage::SourceImage;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Per-request URL context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// `scheme://host` of the incoming request. When set, every URL is
    /// absolute; otherwise URLs are site-relative (`/media/...`).
    pub base_url: Option<String>,
}

impl RequestContext {
    pub fn relative() -> Self {
        Self::default()
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }

    /// Make `url` absolute if this context carries a base URL.
    pub fn absolute(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !url.contains("://") => {
                format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }
}

pub struct Resolver<'a, B: ImageBackend = RustBackend> {
    materializer: &'a Materializer<B>,
    placeholder_quality: Quality,
}

impl<'a, B: ImageBackend> Resolver<'a, B> {
    pub fn new(materializer: &'a Materializer<B>, placeholder_quality: Quality) -> Self {
        Self {
            materializer,
            placeholder_quality,
        }
    }

    pub fn materializer(&self) -> &'a Materializer<B> {
        self.materializer
    }

    /// URL of a stored file with no variants (videos, OpenGraph images).
    pub fn file_url(&self, path: Option<&str>, ctx: &RequestContext) -> Option<String> {
        let source = SourceImage::from_field(path)?;
        self.original_url(Some(&source), ctx)
    }

    pub fn original_url(&self, source: Option<&SourceImage>, ctx: &RequestContext) -> Option<String> {
        source.map(|s| ctx.absolute(&self.materializer.storage().url(&s.path)))
    }

    /// URL of one named variant, falling back to the original.
    pub fn resolve(
        &self,
        model: Model,
        field: &str,
        source: Option<&SourceImage>,
        variant: &str,
        ctx: &RequestContext,
    ) -> Option<String> {
        self.resolve_chain(model, field, source, &[variant], ctx)
    }

    /// URL of the first variant in `chain` that materializes, falling back to
    /// the original.
    pub fn resolve_chain(
        &self,
        model: Model,
        field: &str,
        source: Option<&SourceImage>,
        chain: &[&str],
        ctx: &RequestContext,
    ) -> Option<String> {
        let source = source?;
        for name in chain {
            match self.try_variant(model, field, source, name) {
                Ok(path) => {
                    return Some(ctx.absolute(&self.materializer.storage().url(&path)));
                }
                Err(MaterializeError::SourceMissing(path)) => {
                    warn!(model = %model, field, source = %path, "source image missing on disk");
                    break;
                }
                Err(e) => {
                    warn!(model = %model, field, source = %source.path, variant = *name, error = %e,
                        "variant unavailable, falling back");
                }
            }
        }
        debug!(model = %model, field, source = %source.path, "serving original");
        self.original_url(Some(source), ctx)
    }

    fn try_variant(
        &self,
        model: Model,
        field: &str,
        source: &SourceImage,
        name: &str,
    ) -> Result<String, MaterializeError> {
        let spec = model
            .field(field)
            .and_then(|f| f.spec(name))
            .ok_or_else(|| MaterializeError::UnknownVariant {
                model: model.name().to_string(),
                field: field.to_string(),
                variant: name.to_string(),
            })?;
        Ok(self.materializer.materialize(source, spec)?.path)
    }

    /// Variant name → URL for every listed variant of the field. Each entry
    /// falls back to the original independently.
    pub fn variants(
        &self,
        model: Model,
        field: &str,
        source: Option<&SourceImage>,
        ctx: &RequestContext,
    ) -> Option<BTreeMap<String, String>> {
        let source = source?;
        let image_field = model.field(field)?;
        Some(
            image_field
                .listed_variants()
                .filter_map(|spec| {
                    self.resolve(model, field, Some(source), spec.name, ctx)
                        .map(|url| (spec.name.to_string(), url))
                })
                .collect(),
        )
    }

    pub fn placeholder_base64(&self, source: Option<&SourceImage>) -> Option<String> {
        encode_placeholder(
            self.materializer.backend(),
            self.materializer.storage(),
            source,
            self.placeholder_quality,
        )
    }

    /// All payload keys for one image field.
    ///
    /// Always emits `<key>_url`. Fields with registered variants add
    /// `<key>_webp_url` and `<key>_variants`; fields with a `placeholder`
    /// variant add `<key>_placeholder_url` and `<key>_placeholder_base64`.
    /// With no source, every emitted key is `null`.
    pub fn image_fields(
        &self,
        model: Model,
        field: &str,
        key: &str,
        value: Option<&str>,
        ctx: &RequestContext,
    ) -> Map<String, Value> {
        let source = SourceImage::from_field(value);
        let source = source.as_ref();
        let mut out = Map::new();

        out.insert(format!("{key}_url"), opt(self.original_url(source, ctx)));

        let Some(image_field) = model.field(field) else {
            return out;
        };
        if !registry::specs_for(model, field).is_empty() {
            out.insert(
                format!("{key}_webp_url"),
                opt(self.resolve_chain(model, field, source, image_field.primary, ctx)),
            );
            out.insert(
                format!("{key}_variants"),
                match self.variants(model, field, source, ctx) {
                    Some(map) => serde_json::to_value(map).unwrap_or(Value::Null),
                    None => Value::Null,
                },
            );
        }
        if image_field.has_placeholder() {
            out.insert(
                format!("{key}_placeholder_url"),
                opt(self.resolve(model, field, source, PLACEHOLDER, ctx)),
            );
            out.insert(
                format!("{key}_placeholder_base64"),
                opt(self.placeholder_base64(source)),
            );
        }
        out
    }
}

fn opt(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}
