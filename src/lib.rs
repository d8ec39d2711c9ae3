//! # Resort Content
//!
//! Content backend for a resort marketing site: lodging, activities, events,
//! news, the restaurant and site-wide settings, each exposed as a read-only
//! JSON payload with SEO metadata and multi-resolution WebP image variants.
//!
//! Content lives in SQLite. Uploaded originals and their derived variants
//! live on disk under a media root.
//!
//! # Architecture: Variants on Demand
//!
//! Every image field of every model declares a list of variant specs. Nothing
//! is rendered at upload time; the first payload that asks for a variant
//! renders and caches it:
//!
//! ```text
//! payload builder ─► Resolver ─► Materializer ─► ImageBackend
//!    (api)          (fallback)   (cache check)    (decode, resize, encode)
//!                        │
//!                        └─► original upload URL if anything fails
//! ```
//!
//! A broken upload, a missing file or a failed encode never breaks a payload.
//! The resolver logs the failure and hands out the original upload's URL
//! instead, so the frontend always gets something it can display.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Static table of models, image fields, variant specs and primary chains |
//! | [`imaging`] | Pure-Rust render backend: decode, fill/pad/keep, lossy WebP encode |
//! | [`materialize`] | Lazy, cached rendering of one spec for one source |
//! | [`cache`] | Variant manifest: source and parameter hashes per derived file |
//! | [`resolver`] | URL resolution with fallback; `<field>_*` payload keys |
//! | [`placeholder`] | Inline base64 WebP placeholders |
//! | [`storage`] | Media root: uploads, deletes, path-to-URL mapping |
//! | [`store`] | SQLite content store with singleton and slug invariants |
//! | [`api`] | JSON payload builders, one per resource |
//! | [`maintenance`] | Batch processing, regeneration and cache pruning |
//! | [`import`] | JSON content bundles with local files |
//! | [`config`] | `resort.toml` loading, merging and validation |
//!
//! # Design Decisions
//!
//! ## Explicit Variant Registry
//!
//! Which sizes exist for which field is data, not code: one table in
//! [`registry`]. Payload builders ask for a field's variants by name and
//! never name a size themselves. [`registry::validate`] runs at startup and in
//! tests, so a typo in a primary chain fails loudly instead of silently
//! falling back forever.
//!
//! ## Two Levels of Cache Trust
//!
//! The request path trusts a derived file when it exists and its parameter
//! hash matches, which costs one `stat`. Batch processing also hashes the
//! source bytes, catching originals replaced in place. See
//! [`materialize`] for the table.
//!
//! ## Singletons in the Schema
//!
//! Site settings and the restaurant are exactly-one rows (`CHECK (id = 1)`);
//! the active hero section is at-most-one (a partial unique index). The
//! write path checks first to return a readable error, but the database is
//! what actually holds the line.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and resizing use the `image` crate (Lanczos3); lossy WebP goes
//! through `webp`. No ImageMagick, no system libraries, and SQLite is
//! bundled: the binary runs anywhere it is copied.

pub mod api;
pub mod cache;
pub mod config;
pub mod imaging;
pub mod import;
pub mod maintenance;
pub mod materialize;
pub mod placeholder;
pub mod registry;
pub mod resolver;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
