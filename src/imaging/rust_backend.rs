//! Production image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with content sniffing |
//! | Resample | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Crop-fill | fill resize + `crop_imm` at the centered window |
//! | Fit-with-padding | fit resize + `imageops::overlay` onto a filled canvas |
//! | Alpha flattening | per-pixel blend onto an opaque background |
//! | Encode → WebP (lossy) | `webp::Encoder` (libwebp) |
//!
//! Rendering is deterministic: the same source bytes and spec always produce
//! the same output bytes.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_fill_dimensions, calculate_fit_dimensions, center_offset};
use super::params::{Background, FitStrategy, OutputFormat, Quality, RenderParams};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Upload extensions with compiled-in decoders.
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

const WHITE: [u8; 3] = [255, 255, 255];

static NEXT_TMP: AtomicU64 = AtomicU64::new(0);

/// Backend built on the `image` crate for pixels and libwebp for encoding.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk. The format is sniffed from content,
/// so a PNG uploaded with a `.jpg` name still decodes.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let decode_err = |reason: String| BackendError::Decode {
        path: path.display().to_string(),
        reason,
    };
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(decode_err("image has zero area".to_string()));
    }
    Ok(img)
}

/// Blend an RGBA image onto an opaque background.
fn flatten(rgba: &RgbaImage, background: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let a = a as u32;
        let blend = |c: u8, bg: u8| ((c as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
        Rgb([
            blend(r, background[0]),
            blend(g, background[1]),
            blend(b, background[2]),
        ])
    })
}

/// Convert any decoded pixel layout to 8-bit RGB or RGBA.
///
/// Alpha survives only when the source has it and the output format can
/// carry it; otherwise transparent pixels are flattened onto white.
fn normalize(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    let has_alpha = img.color().has_alpha();
    if has_alpha && format.supports_alpha() {
        DynamicImage::ImageRgba8(img.into_rgba8())
    } else if has_alpha {
        DynamicImage::ImageRgb8(flatten(&img.into_rgba8(), WHITE))
    } else {
        DynamicImage::ImageRgb8(img.into_rgb8())
    }
}

fn crop_fill(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (fill_w, fill_h) = calculate_fill_dimensions((img.width(), img.height()), (width, height));
    let filled = img.resize_exact(fill_w, fill_h, FilterType::Lanczos3);
    let (x, y) = center_offset((width, height), (fill_w, fill_h));
    filled.crop_imm(x, y, width, height)
}

fn fit_padded(img: &DynamicImage, width: u32, height: u32, background: Background) -> DynamicImage {
    let (fit_w, fit_h) = calculate_fit_dimensions((img.width(), img.height()), (width, height));
    let fitted = img.resize_exact(fit_w, fit_h, FilterType::Lanczos3);
    let (x, y) = center_offset((fit_w, fit_h), (width, height));

    match fitted {
        DynamicImage::ImageRgba8(inner) => {
            let mut canvas = RgbaImage::from_pixel(width, height, Rgba(background));
            imageops::overlay(&mut canvas, &inner, x as i64, y as i64);
            DynamicImage::ImageRgba8(canvas)
        }
        other => {
            let [r, g, b, _] = background;
            let mut canvas = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
            imageops::overlay(&mut canvas, &other.to_rgb8(), x as i64, y as i64);
            DynamicImage::ImageRgb8(canvas)
        }
    }
}

fn apply_fit(img: DynamicImage, params: &RenderParams) -> DynamicImage {
    let spec = &params.spec;
    match spec.fit {
        FitStrategy::CropFill => crop_fill(&img, spec.width, spec.height),
        FitStrategy::FitPadded { background } => {
            fit_padded(&img, spec.width, spec.height, background)
        }
        FitStrategy::NoResize => img,
    }
}

/// Lossy WebP encode. Input must already be Rgb8 or Rgba8.
fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let encoder =
        webp::Encoder::from_image(img).map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(encoder.encode(quality.value() as f32).to_vec())
}

/// Write via a sibling temp file and rename, so readers never observe a
/// partially written variant.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    let tmp = path.with_extension(format!(
        "{}-{}.tmp",
        std::process::id(),
        NEXT_TMP.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| BackendError::Decode {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
        let format = params.spec.format;
        let img = normalize(load_image(&params.source)?, format);
        let fitted = apply_fit(img, params);
        let bytes = match format {
            OutputFormat::WebP => encode_webp(&fitted, params.spec.quality)?,
        };
        write_atomic(&params.output, &bytes)
    }

    fn placeholder(&self, source: &Path, quality: Quality) -> Result<Vec<u8>, BackendError> {
        let img = load_image(source)?;
        let rgb = if img.color().has_alpha() {
            flatten(&img.into_rgba8(), WHITE)
        } else {
            img.into_rgb8()
        };
        encode_webp(&DynamicImage::ImageRgb8(rgb), quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{TRANSPARENT, VariantSpec};
    use crate::test_helpers::{write_jpeg, write_rgba_png};

    fn render_to(
        tmp: &tempfile::TempDir,
        source: &Path,
        spec: VariantSpec,
    ) -> (std::path::PathBuf, DynamicImage) {
        let output = tmp.path().join(format!("{}.webp", spec.name));
        RustBackend::new()
            .render(&RenderParams {
                source: source.to_path_buf(),
                output: output.clone(),
                spec,
            })
            .unwrap();
        let decoded = image::open(&output).unwrap();
        (output, decoded)
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        write_jpeg(&path, 200, 150);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    // =========================================================================
    // Fit strategies
    // =========================================================================

    #[test]
    fn crop_fill_landscape_source_hits_exact_box() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("wide.jpg");
        write_jpeg(&source, 800, 300);

        let (_, out) = render_to(&tmp, &source, VariantSpec::fill("card", 600, 400, 80));
        assert_eq!((out.width(), out.height()), (600, 400));
    }

    #[test]
    fn crop_fill_portrait_source_hits_exact_box() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("tall.jpg");
        write_jpeg(&source, 300, 900);

        let (_, out) = render_to(&tmp, &source, VariantSpec::fill("thumb", 400, 225, 75));
        assert_eq!((out.width(), out.height()), (400, 225));
    }

    #[test]
    fn crop_fill_upscales_small_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("small.jpg");
        write_jpeg(&source, 64, 48);

        let (_, out) = render_to(&tmp, &source, VariantSpec::fill("large", 1410, 940, 85));
        assert_eq!((out.width(), out.height()), (1410, 940));
    }

    #[test]
    fn no_resize_keeps_source_geometry() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        write_jpeg(&source, 321, 123);

        let (_, out) = render_to(&tmp, &source, VariantSpec::original("webp", 85));
        assert_eq!((out.width(), out.height()), (321, 123));
    }

    #[test]
    fn padded_transparent_logo_keeps_alpha_in_margins() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("logo.png");
        write_rgba_png(&source, 200, 100);

        let (_, out) = render_to(
            &tmp,
            &source,
            VariantSpec::padded("webp", 128, 128, 90, TRANSPARENT),
        );
        assert_eq!((out.width(), out.height()), (128, 128));
        let rgba = out.to_rgba8();
        // 200x100 fits as 128x64, leaving 32px bands top and bottom
        assert!(rgba.get_pixel(0, 0)[3] < 16);
        assert!(rgba.get_pixel(64, 64)[3] > 200);
    }

    #[test]
    fn padded_opaque_source_gets_white_bands() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("logo.jpg");
        write_jpeg(&source, 100, 200);

        let (_, out) = render_to(
            &tmp,
            &source,
            VariantSpec::padded("webp", 128, 128, 90, TRANSPARENT),
        );
        let rgb = out.to_rgb8();
        let corner = rgb.get_pixel(0, 127);
        assert!(corner.0.iter().all(|&c| c > 235), "corner was {corner:?}");
    }

    // =========================================================================
    // Encoding behaviour
    // =========================================================================

    #[test]
    fn render_is_deterministic() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        write_jpeg(&source, 400, 300);

        let spec = VariantSpec::fill("medium", 626, 456, 80);
        let (first, _) = render_to(&tmp, &source, spec);
        let first_bytes = std::fs::read(&first).unwrap();
        let (second, _) = render_to(&tmp, &source, spec);
        assert_eq!(first_bytes, std::fs::read(&second).unwrap());
    }

    #[test]
    fn render_leaves_no_temp_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        write_jpeg(&source, 100, 100);

        render_to(&tmp, &source, VariantSpec::fill("small", 50, 50, 75));
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn corrupt_source_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();

        let result = RustBackend::new().render(&RenderParams {
            source,
            output: tmp.path().join("out.webp"),
            spec: VariantSpec::fill("webp", 10, 10, 80),
        });
        assert!(matches!(result, Err(BackendError::Decode { .. })));
        assert!(!tmp.path().join("out.webp").exists());
    }

    #[test]
    fn placeholder_flattens_transparency_onto_white() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("logo.png");
        write_rgba_png(&source, 40, 20);

        let bytes = RustBackend::new()
            .placeholder(&source, Quality::new(50))
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn flatten_blends_alpha() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten(&rgba, WHITE);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }
}
