//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the callers that decide which renditions exist (the
//! [`registry`](crate::registry) and the
//! [`materializer`](crate::materialize)) and the
//! [`backend`](super::backend), which does the actual pixel work. This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing the caching or fallback logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`FitStrategy`]: How the source geometry maps onto the target box.
//! - [`OutputFormat`]: Encoded format of a rendition. Always WebP today.
//! - [`VariantSpec`]: One named rendition: box, fit, format, quality.
//! - [`RenderParams`]: Everything one render needs: source, output, spec.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(u32);

impl Quality {
    pub const fn new(value: u32) -> Self {
        if value < 1 {
            Self(1)
        } else if value > 100 {
            Self(100)
        } else {
            Self(value)
        }
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// RGBA colour used to fill the canvas around a padded rendition.
pub type Background = [u8; 4];

/// Fully transparent white. Collapses to plain white when the output is opaque.
pub const TRANSPARENT: Background = [255, 255, 255, 0];

/// How a source image is fitted into a variant's target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStrategy {
    /// Scale so the shorter side matches, then center-crop the overflow.
    /// Output is always exactly the target dimensions.
    CropFill,
    /// Scale to fit entirely inside the box, then center on a canvas of the
    /// target dimensions filled with `background`.
    FitPadded { background: Background },
    /// Keep the source geometry; only format and quality change.
    NoResize,
}

impl FitStrategy {
    /// Stable tag used when hashing variant parameters.
    pub fn tag(self) -> &'static str {
        match self {
            FitStrategy::CropFill => "crop-fill",
            FitStrategy::FitPadded { .. } => "fit-padded",
            FitStrategy::NoResize => "no-resize",
        }
    }
}

/// Encoded output format of a derived rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    WebP,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Whether the format can carry an alpha channel. Formats that can't get
    /// their input flattened onto an opaque background first.
    pub fn supports_alpha(self) -> bool {
        match self {
            OutputFormat::WebP => true,
        }
    }
}

/// One named rendition of a source image.
///
/// Specs are declared statically in the [`registry`](crate::registry) and
/// never persisted. `width`/`height` are ignored for [`FitStrategy::NoResize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSpec {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub fit: FitStrategy,
    pub format: OutputFormat,
    pub quality: Quality,
}

impl VariantSpec {
    /// Exact-size rendition: fill the box and center-crop.
    pub const fn fill(name: &'static str, width: u32, height: u32, quality: u32) -> Self {
        Self {
            name,
            width,
            height,
            fit: FitStrategy::CropFill,
            format: OutputFormat::WebP,
            quality: Quality::new(quality),
        }
    }

    /// Letterboxed rendition: fit inside the box, pad with `background`.
    pub const fn padded(
        name: &'static str,
        width: u32,
        height: u32,
        quality: u32,
        background: Background,
    ) -> Self {
        Self {
            name,
            width,
            height,
            fit: FitStrategy::FitPadded { background },
            format: OutputFormat::WebP,
            quality: Quality::new(quality),
        }
    }

    /// Original-resolution re-encode. Used for placeholders that crush quality.
    pub const fn original(name: &'static str, quality: u32) -> Self {
        Self {
            name,
            width: 0,
            height: 0,
            fit: FitStrategy::NoResize,
            format: OutputFormat::WebP,
            quality: Quality::new(quality),
        }
    }
}

/// Parameters for rendering one variant to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub spec: VariantSpec,
}
