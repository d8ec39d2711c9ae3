//! Image processing: decode with `image`, encode lossy WebP with libwebp.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Render** | Lanczos3 resample + crop/pad + `webp::Encoder` |
//! | **Placeholder** | flatten onto white + `webp::Encoder` at low quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_fill_dimensions, calculate_fit_dimensions, center_offset};
pub use params::{
    Background, FitStrategy, OutputFormat, Quality, RenderParams, TRANSPARENT, VariantSpec,
};
pub use rust_backend::{RustBackend, SUPPORTED_INPUT_EXTENSIONS};
