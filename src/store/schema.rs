//! Database schema. Applied idempotently on every open.
//!
//! Singletons are enforced here as well as in the write path:
//! `CHECK (id = 1)` for site settings and the restaurant, and a partial unique
//! index allowing a single active hero section.

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS site_settings (
    id                      INTEGER PRIMARY KEY CHECK (id = 1),
    site_name               TEXT NOT NULL DEFAULT '',
    logo                    TEXT,
    phone_primary           TEXT NOT NULL DEFAULT '',
    phone_secondary         TEXT NOT NULL DEFAULT '',
    email                   TEXT NOT NULL DEFAULT '',
    address                 TEXT NOT NULL DEFAULT '',
    telegram_url            TEXT NOT NULL DEFAULT '',
    vk_url                  TEXT NOT NULL DEFAULT '',
    registry_number         TEXT NOT NULL DEFAULT '',
    registry_url            TEXT NOT NULL DEFAULT '',
    national_projects_logo  TEXT,
    hero_image              TEXT,
    hero_title              TEXT NOT NULL DEFAULT '',
    hero_subtitle           TEXT NOT NULL DEFAULT '',
    base_plan_image         TEXT,
    base_plan_description   TEXT NOT NULL DEFAULT '',
    seo                     TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS statistics (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    number      TEXT NOT NULL,
    label       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    is_active   INTEGER NOT NULL DEFAULT 1,
    sort_order  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS gallery_images (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    image       TEXT,
    alt_text    TEXT NOT NULL DEFAULT '',
    position    TEXT NOT NULL DEFAULT 'main'
                CHECK (position IN ('main', 'hero', 'lodge', 'activity')),
    column_name TEXT CHECK (column_name IN ('left', 'center', 'right')),
    sort_order  INTEGER NOT NULL DEFAULT 0,
    is_active   INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS hero_sections (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT NOT NULL DEFAULT '',
    subtitle        TEXT NOT NULL DEFAULT '',
    preview_image   TEXT,
    promo_video     TEXT,
    video_poster    TEXT,
    display_type    TEXT NOT NULL DEFAULT 'image'
                    CHECK (display_type IN ('image', 'video', 'slider')),
    autoplay_video  INTEGER NOT NULL DEFAULT 1,
    loop_video      INTEGER NOT NULL DEFAULT 1,
    mute_video      INTEGER NOT NULL DEFAULT 1,
    is_active       INTEGER NOT NULL DEFAULT 0,
    sort_order      INTEGER NOT NULL DEFAULT 0,
    seo             TEXT NOT NULL DEFAULT '{}'
);

CREATE UNIQUE INDEX IF NOT EXISTS hero_sections_single_active
    ON hero_sections (is_active) WHERE is_active = 1;

CREATE TABLE IF NOT EXISTS hero_images (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    hero_section_id     INTEGER NOT NULL REFERENCES hero_sections (id) ON DELETE CASCADE,
    image               TEXT,
    alt_text            TEXT NOT NULL DEFAULT '',
    sort_order          INTEGER NOT NULL DEFAULT 0,
    is_active           INTEGER NOT NULL DEFAULT 1,
    transition_duration INTEGER NOT NULL DEFAULT 5000
);

CREATE TABLE IF NOT EXISTS lodge_types (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    subtitle    TEXT NOT NULL DEFAULT '',
    hero_image  TEXT,
    description TEXT NOT NULL DEFAULT '',
    is_active   INTEGER NOT NULL DEFAULT 1,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    seo         TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS lodges (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    lodge_type_id        INTEGER NOT NULL REFERENCES lodge_types (id) ON DELETE CASCADE,
    name                 TEXT NOT NULL,
    slug                 TEXT NOT NULL UNIQUE,
    description          TEXT NOT NULL DEFAULT '',
    short_description    TEXT NOT NULL DEFAULT '',
    capacity             INTEGER NOT NULL CHECK (capacity >= 1),
    area                 REAL NOT NULL DEFAULT 0,
    price_from           REAL,
    location_description TEXT NOT NULL DEFAULT '',
    is_active            INTEGER NOT NULL DEFAULT 1,
    sort_order           INTEGER NOT NULL DEFAULT 0,
    seo                  TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS lodge_images (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    lodge_id    INTEGER NOT NULL REFERENCES lodges (id) ON DELETE CASCADE,
    image       TEXT,
    alt_text    TEXT NOT NULL DEFAULT '',
    sort_order  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS activities (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    category    TEXT NOT NULL CHECK (category IN ('active', 'peaceful')),
    season      TEXT CHECK (season IN ('winter', 'summer')),
    title       TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    image       TEXT,
    video       TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    seo         TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS event_types (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    image       TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    seo         TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS news (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    title             TEXT NOT NULL,
    slug              TEXT NOT NULL UNIQUE,
    content           TEXT NOT NULL DEFAULT '',
    short_description TEXT NOT NULL DEFAULT '',
    excerpt           TEXT NOT NULL DEFAULT '',
    image             TEXT,
    published_at      TEXT NOT NULL,
    is_published      INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    seo               TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS restaurant (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    title       TEXT NOT NULL DEFAULT 'Restaurant',
    description TEXT NOT NULL DEFAULT '',
    is_active   INTEGER NOT NULL DEFAULT 1,
    seo         TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS restaurant_images (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    restaurant_id INTEGER NOT NULL REFERENCES restaurant (id) ON DELETE CASCADE,
    image         TEXT,
    alt_text      TEXT NOT NULL DEFAULT '',
    sort_order    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS meal_types (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    icon_name   TEXT,
    description TEXT,
    time_start  TEXT,
    sort_order  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS restaurant_benefits (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    restaurant_id INTEGER NOT NULL REFERENCES restaurant (id) ON DELETE CASCADE,
    text          TEXT NOT NULL,
    sort_order    INTEGER NOT NULL DEFAULT 0
);
"#;
