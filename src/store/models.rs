//! Content entities as stored in SQLite.
//!
//! Image and file fields hold storage-relative paths (`None` when empty).
//! Every struct deserializes with `#[serde(default)]` so import bundles only
//! need to spell out the fields they care about.

use chrono::{DateTime, NaiveTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of string choices stored as TEXT.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($value:literal, $label:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Human-readable label for `*_display` payload fields.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("invalid {} '{}'", stringify!($name), other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

text_enum! {
    /// Where a gallery image is shown.
    GalleryPosition {
        Main => ("main", "Main gallery"),
        Hero => ("hero", "Hero section"),
        Lodge => ("lodge", "Lodging section"),
        Activity => ("activity", "Activities section"),
    }
}

text_enum! {
    /// Column of the main gallery grid.
    GalleryColumn {
        Left => ("left", "Left column"),
        Center => ("center", "Center column"),
        Right => ("right", "Right column"),
    }
}

text_enum! {
    DisplayType {
        Image => ("image", "Image"),
        Video => ("video", "Video"),
        Slider => ("slider", "Image slider"),
    }
}

text_enum! {
    ActivityCategory {
        Active => ("active", "Active leisure"),
        Peaceful => ("peaceful", "Peaceful leisure"),
    }
}

text_enum! {
    Season {
        Winter => ("winter", "Winter"),
        Summer => ("summer", "Summer"),
    }
}

impl Default for GalleryPosition {
    fn default() -> Self {
        GalleryPosition::Main
    }
}

impl Default for DisplayType {
    fn default() -> Self {
        DisplayType::Image
    }
}

impl Default for ActivityCategory {
    fn default() -> Self {
        ActivityCategory::Active
    }
}

/// SEO block shared by every page-like entity. Stored as one JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seo {
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: Option<String>,
    pub canonical_url: String,
    pub robots_meta: String,
}

impl Default for Seo {
    fn default() -> Self {
        Self {
            meta_title: String::new(),
            meta_description: String::new(),
            meta_keywords: String::new(),
            og_title: String::new(),
            og_description: String::new(),
            og_image: None,
            canonical_url: String::new(),
            robots_meta: "index, follow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub id: i64,
    pub site_name: String,
    pub logo: Option<String>,
    pub phone_primary: String,
    pub phone_secondary: String,
    pub email: String,
    pub address: String,
    pub telegram_url: String,
    pub vk_url: String,
    pub registry_number: String,
    pub registry_url: String,
    pub national_projects_logo: Option<String>,
    pub hero_image: Option<String>,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub base_plan_image: Option<String>,
    pub base_plan_description: String,
    pub seo: Seo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistic {
    pub id: i64,
    pub number: String,
    pub label: String,
    pub description: String,
    pub is_active: bool,
    pub order: i64,
}

impl Default for Statistic {
    fn default() -> Self {
        Self {
            id: 0,
            number: String::new(),
            label: String::new(),
            description: String::new(),
            is_active: true,
            order: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryImage {
    pub id: i64,
    pub image: Option<String>,
    pub alt_text: String,
    pub position: GalleryPosition,
    pub column: Option<GalleryColumn>,
    pub order: i64,
    pub is_active: bool,
}

impl Default for GalleryImage {
    fn default() -> Self {
        Self {
            id: 0,
            image: None,
            alt_text: String::new(),
            position: GalleryPosition::Main,
            column: None,
            order: 0,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroSection {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub preview_image: Option<String>,
    pub promo_video: Option<String>,
    pub video_poster: Option<String>,
    pub display_type: DisplayType,
    pub autoplay_video: bool,
    pub loop_video: bool,
    pub mute_video: bool,
    pub is_active: bool,
    pub order: i64,
    pub seo: Seo,
}

impl Default for HeroSection {
    fn default() -> Self {
        Self {
            id: 0,
            title: String::new(),
            subtitle: String::new(),
            preview_image: None,
            promo_video: None,
            video_poster: None,
            display_type: DisplayType::Image,
            autoplay_video: true,
            loop_video: true,
            mute_video: true,
            is_active: false,
            order: 0,
            seo: Seo::default(),
        }
    }
}

/// Default slide duration of a hero slider image, in milliseconds.
pub const DEFAULT_TRANSITION_MS: i64 = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroImage {
    pub id: i64,
    pub hero_section_id: i64,
    pub image: Option<String>,
    pub alt_text: String,
    pub order: i64,
    pub is_active: bool,
    pub transition_duration: i64,
}

impl Default for HeroImage {
    fn default() -> Self {
        Self {
            id: 0,
            hero_section_id: 0,
            image: None,
            alt_text: String::new(),
            order: 0,
            is_active: true,
            transition_duration: DEFAULT_TRANSITION_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodgeType {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub subtitle: String,
    pub hero_image: Option<String>,
    pub description: String,
    pub is_active: bool,
    pub order: i64,
    pub seo: Seo,
}

impl Default for LodgeType {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            slug: String::new(),
            subtitle: String::new(),
            hero_image: None,
            description: String::new(),
            is_active: true,
            order: 0,
            seo: Seo::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lodge {
    pub id: i64,
    pub lodge_type_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    pub capacity: i64,
    /// Floor area in square metres.
    pub area: f64,
    pub price_from: Option<f64>,
    pub location_description: String,
    pub is_active: bool,
    pub order: i64,
    pub seo: Seo,
}

impl Default for Lodge {
    fn default() -> Self {
        Self {
            id: 0,
            lodge_type_id: 0,
            name: String::new(),
            slug: String::new(),
            description: String::new(),
            short_description: String::new(),
            capacity: 1,
            area: 0.0,
            price_from: None,
            location_description: String::new(),
            is_active: true,
            order: 0,
            seo: Seo::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodgeImage {
    pub id: i64,
    pub lodge_id: i64,
    pub image: Option<String>,
    pub alt_text: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activity {
    pub id: i64,
    pub category: ActivityCategory,
    pub season: Option<Season>,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub is_active: bool,
    pub order: i64,
    pub seo: Seo,
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            id: 0,
            category: ActivityCategory::Active,
            season: None,
            title: String::new(),
            slug: String::new(),
            description: String::new(),
            image: None,
            video: None,
            is_active: true,
            order: 0,
            seo: Seo::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventType {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub order: i64,
    pub seo: Seo,
}

impl Default for EventType {
    fn default() -> Self {
        Self {
            id: 0,
            title: String::new(),
            slug: String::new(),
            description: String::new(),
            image: None,
            is_active: true,
            order: 0,
            seo: Seo::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub short_description: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seo: Seo,
}

impl Default for News {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: String::new(),
            slug: String::new(),
            content: String::new(),
            short_description: String::new(),
            excerpt: String::new(),
            image: None,
            published_at: now,
            is_published: false,
            created_at: now,
            updated_at: now,
            seo: Seo::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restaurant {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub seo: Seo,
}

impl Default for Restaurant {
    fn default() -> Self {
        Self {
            id: 0,
            title: "Restaurant".to_string(),
            description: String::new(),
            is_active: true,
            seo: Seo::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantImage {
    pub id: i64,
    pub restaurant_id: i64,
    pub image: Option<String>,
    pub alt_text: String,
    pub order: i64,
}

/// A meal served by the restaurant (breakfast, dinner, ...). Not tied to the
/// restaurant row: the list is site-wide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealType {
    pub id: i64,
    pub name: String,
    pub icon_name: Option<String>,
    pub description: Option<String>,
    pub time_start: Option<NaiveTime>,
    pub order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantBenefit {
    pub id: i64,
    pub restaurant_id: i64,
    pub text: String,
    pub order: i64,
}

/// Filters accepted by the lodge listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LodgeFilter {
    pub lodge_type_id: Option<i64>,
    pub price_from_min: Option<f64>,
    pub price_from_max: Option<f64>,
    pub capacity_min: Option<i64>,
    pub capacity_max: Option<i64>,
    /// Case-insensitive substring over name and both descriptions.
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enum_round_trips() {
        for p in GalleryPosition::ALL {
            assert_eq!(p.as_str().parse::<GalleryPosition>().unwrap(), *p);
        }
        assert!("sidebar".parse::<GalleryPosition>().is_err());
    }

    #[test]
    fn text_enum_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ActivityCategory::Peaceful).unwrap(),
            "\"peaceful\""
        );
        let s: Season = serde_json::from_str("\"winter\"").unwrap();
        assert_eq!(s, Season::Winter);
    }

    #[test]
    fn seo_defaults_to_indexable() {
        assert_eq!(Seo::default().robots_meta, "index, follow");
        let parsed: Seo = serde_json::from_str(r#"{"meta_title":"Lodges"}"#).unwrap();
        assert_eq!(parsed.meta_title, "Lodges");
        assert_eq!(parsed.robots_meta, "index, follow");
    }

    #[test]
    fn partial_entities_deserialize_with_defaults() {
        let lodge: Lodge = serde_json::from_str(r#"{"name":"Pine cabin","capacity":4}"#).unwrap();
        assert!(lodge.is_active);
        assert_eq!(lodge.capacity, 4);
        assert_eq!(lodge.price_from, None);

        let hero: HeroImage = serde_json::from_str("{}").unwrap();
        assert_eq!(hero.transition_duration, DEFAULT_TRANSITION_MS);
    }
}
