//! Static variant registry.
//!
//! Every image-holding model declares its image fields here: where uploads
//! land, which derived renditions exist, and which renditions the payload's
//! `<field>_webp_url` tries before falling back to the original. Adding a
//! variant is an edit to the tables below; nothing else in the crate names a
//! specific size.
//!
//! Spec names must be unique within a field. [`validate`] checks that (and
//! that every primary-chain name refers to a declared spec) and runs at
//! startup and in tests.

use crate::imaging::{TRANSPARENT, VariantSpec};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the spec that, when present, enables `<field>_placeholder_*`.
pub const PLACEHOLDER: &str = "placeholder";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{model}.{field}: duplicate variant name '{variant}'")]
    DuplicateVariant {
        model: &'static str,
        field: &'static str,
        variant: &'static str,
    },
    #[error("{model}.{field}: primary chain names undeclared variant '{variant}'")]
    UndeclaredPrimary {
        model: &'static str,
        field: &'static str,
        variant: &'static str,
    },
    #[error("unknown model '{0}' (expected one of: {list})", list = Model::names().join(", "))]
    UnknownModel(String),
}

/// A model that owns at least one image field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Model {
    SiteSettings,
    GalleryImage,
    HeroSection,
    HeroImage,
    LodgeType,
    LodgeImage,
    Activity,
    EventType,
    News,
    RestaurantImage,
}

impl Model {
    pub const ALL: [Model; 10] = [
        Model::SiteSettings,
        Model::GalleryImage,
        Model::HeroSection,
        Model::HeroImage,
        Model::LodgeType,
        Model::LodgeImage,
        Model::Activity,
        Model::EventType,
        Model::News,
        Model::RestaurantImage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Model::SiteSettings => "SiteSettings",
            Model::GalleryImage => "GalleryImage",
            Model::HeroSection => "HeroSection",
            Model::HeroImage => "HeroImage",
            Model::LodgeType => "LodgeType",
            Model::LodgeImage => "LodgeImage",
            Model::Activity => "Activity",
            Model::EventType => "EventType",
            Model::News => "News",
            Model::RestaurantImage => "RestaurantImage",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.name()).collect()
    }

    /// Image fields declared for this model, in declaration order.
    pub fn fields(self) -> &'static [ImageField] {
        match self {
            Model::SiteSettings => SITE_SETTINGS,
            Model::GalleryImage => GALLERY_IMAGE,
            Model::HeroSection => HERO_SECTION,
            Model::HeroImage => HERO_IMAGE,
            Model::LodgeType => LODGE_TYPE,
            Model::LodgeImage => LODGE_IMAGE,
            Model::Activity => ACTIVITY,
            Model::EventType => EVENT_TYPE,
            Model::News => NEWS,
            Model::RestaurantImage => RESTAURANT_IMAGE,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static ImageField> {
        self.fields().iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = RegistryError;

    /// Accepts the model name case-insensitively, with or without
    /// underscores (`LodgeType`, `lodgetype`, `lodge_type`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| RegistryError::UnknownModel(s.to_string()))
    }
}

/// One image field of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageField {
    /// Column name, also the prefix of the payload keys.
    pub name: &'static str,
    /// Storage-relative directory new uploads are written to.
    pub upload_to: &'static str,
    pub variants: &'static [VariantSpec],
    /// Variant names tried in order for `<field>_webp_url`.
    pub primary: &'static [&'static str],
}

impl ImageField {
    pub fn spec(&self, name: &str) -> Option<&'static VariantSpec> {
        self.variants.iter().find(|s| s.name == name)
    }

    pub fn has_placeholder(&self) -> bool {
        self.spec(PLACEHOLDER).is_some()
    }

    /// Variants exposed in `<field>_variants`: everything but the placeholder.
    pub fn listed_variants(&self) -> impl Iterator<Item = &'static VariantSpec> {
        self.variants.iter().filter(|s| s.name != PLACEHOLDER)
    }
}

/// Ordered specs for a model's field. Unknown fields have none.
pub fn specs_for(model: Model, field: &str) -> &'static [VariantSpec] {
    model.field(field).map(|f| f.variants).unwrap_or(&[])
}

/// Check every declared field for duplicate names and dangling primaries.
pub fn validate() -> Result<(), RegistryError> {
    for model in Model::ALL {
        for field in model.fields() {
            for (i, spec) in field.variants.iter().enumerate() {
                if field.variants[..i].iter().any(|s| s.name == spec.name) {
                    return Err(RegistryError::DuplicateVariant {
                        model: model.name(),
                        field: field.name,
                        variant: spec.name,
                    });
                }
            }
            if let Some(missing) = field.primary.iter().find(|n| field.spec(n).is_none()) {
                return Err(RegistryError::UndeclaredPrimary {
                    model: model.name(),
                    field: field.name,
                    variant: missing,
                });
            }
        }
    }
    Ok(())
}

// ============================================================================
// Variant tables
// ============================================================================

const HERO_VARIANTS: &[VariantSpec] = &[
    VariantSpec::fill("webp", 1920, 1080, 85),
    VariantSpec::fill("full", 1920, 1080, 85),
    VariantSpec::fill("thumb", 400, 225, 75),
    VariantSpec::original(PLACEHOLDER, 50),
];

const WIDE_WEBP: &[VariantSpec] = &[VariantSpec::fill("webp", 1920, 1080, 85)];

const LOGO: &[VariantSpec] = &[VariantSpec::padded("webp", 512, 512, 90, TRANSPARENT)];

const SITE_SETTINGS: &[ImageField] = &[
    ImageField {
        name: "logo",
        upload_to: "site/",
        variants: LOGO,
        primary: &["webp"],
    },
    ImageField {
        name: "national_projects_logo",
        upload_to: "site/",
        variants: LOGO,
        primary: &["webp"],
    },
    ImageField {
        name: "hero_image",
        upload_to: "site/hero/",
        variants: &[
            VariantSpec::fill("full", 1920, 1080, 85),
            VariantSpec::fill("thumb", 400, 225, 75),
            VariantSpec::original(PLACEHOLDER, 50),
        ],
        primary: &["full"],
    },
    ImageField {
        name: "base_plan_image",
        upload_to: "site/plan/",
        variants: &[
            VariantSpec::fill("full", 1388, 972, 85),
            VariantSpec::fill("thumb", 400, 280, 75),
            VariantSpec::original(PLACEHOLDER, 50),
        ],
        primary: &["full"],
    },
];

const GALLERY_IMAGE: &[ImageField] = &[ImageField {
    name: "image",
    upload_to: "gallery/",
    variants: &[
        VariantSpec::original("webp", 85),
        VariantSpec::fill("large", 1410, 940, 85),
        VariantSpec::fill("medium", 626, 456, 80),
        VariantSpec::fill("small", 414, 296, 75),
        VariantSpec::original(PLACEHOLDER, 50),
    ],
    primary: &["webp"],
}];

const HERO_SECTION: &[ImageField] = &[
    ImageField {
        name: "preview_image",
        upload_to: "hero/",
        variants: HERO_VARIANTS,
        primary: &["webp"],
    },
    ImageField {
        name: "video_poster",
        upload_to: "hero/posters/",
        variants: &[],
        primary: &[],
    },
];

const HERO_IMAGE: &[ImageField] = &[ImageField {
    name: "image",
    upload_to: "hero/images/",
    variants: HERO_VARIANTS,
    primary: &["webp"],
}];

const LODGE_TYPE: &[ImageField] = &[ImageField {
    name: "hero_image",
    upload_to: "lodges/types/",
    variants: WIDE_WEBP,
    primary: &["webp"],
}];

const LODGE_IMAGE: &[ImageField] = &[ImageField {
    name: "image",
    upload_to: "lodges/images/",
    variants: WIDE_WEBP,
    primary: &["webp"],
}];

const ACTIVITY: &[ImageField] = &[ImageField {
    name: "image",
    upload_to: "activities/",
    variants: WIDE_WEBP,
    primary: &["webp"],
}];

const EVENT_TYPE: &[ImageField] = &[ImageField {
    name: "image",
    upload_to: "events/",
    variants: &[
        VariantSpec::fill("webp", 1920, 1080, 85),
        VariantSpec::fill("large", 1200, 800, 85),
        VariantSpec::fill("card", 600, 400, 80),
        VariantSpec::fill("thumb", 300, 200, 75),
    ],
    primary: &["card", "webp"],
}];

const NEWS: &[ImageField] = &[ImageField {
    name: "image",
    upload_to: "news/",
    variants: WIDE_WEBP,
    primary: &["webp"],
}];

const RESTAURANT_IMAGE: &[ImageField] = &[ImageField {
    name: "image",
    upload_to: "restaurant/images/",
    variants: WIDE_WEBP,
    primary: &["webp"],
}];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::FitStrategy;

    #[test]
    fn registry_is_valid() {
        validate().unwrap();
    }

    #[test]
    fn gallery_has_four_sizes_and_placeholder() {
        let names: Vec<_> = specs_for(Model::GalleryImage, "image")
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["webp", "large", "medium", "small", "placeholder"]);
        let field = Model::GalleryImage.field("image").unwrap();
        assert!(field.has_placeholder());
        assert_eq!(field.listed_variants().count(), 4);
    }

    #[test]
    fn event_primary_prefers_card() {
        let field = Model::EventType.field("image").unwrap();
        assert_eq!(field.primary, ["card", "webp"]);
        let card = field.spec("card").unwrap();
        assert_eq!((card.width, card.height, card.quality.value()), (600, 400, 80));
    }

    #[test]
    fn logos_are_padded_not_cropped() {
        for name in ["logo", "national_projects_logo"] {
            let spec = Model::SiteSettings.field(name).unwrap().spec("webp").unwrap();
            assert!(matches!(spec.fit, FitStrategy::FitPadded { .. }));
        }
    }

    #[test]
    fn video_poster_has_no_variants() {
        assert!(specs_for(Model::HeroSection, "video_poster").is_empty());
    }

    #[test]
    fn unknown_field_has_no_specs() {
        assert!(specs_for(Model::News, "cover").is_empty());
    }

    #[test]
    fn hero_image_and_preview_share_specs() {
        assert_eq!(
            specs_for(Model::HeroImage, "image"),
            specs_for(Model::HeroSection, "preview_image")
        );
    }

    #[test]
    fn model_parses_loosely() {
        assert_eq!("LodgeType".parse::<Model>().unwrap(), Model::LodgeType);
        assert_eq!("lodge_type".parse::<Model>().unwrap(), Model::LodgeType);
        assert_eq!("news".parse::<Model>().unwrap(), Model::News);
        assert!(matches!(
            "Lodge".parse::<Model>(),
            Err(RegistryError::UnknownModel(_))
        ));
    }

    #[test]
    fn every_model_round_trips_through_its_name() {
        for model in Model::ALL {
            assert_eq!(model.name().parse::<Model>().unwrap(), model);
        }
    }
}
