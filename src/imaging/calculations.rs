//! Pure calculation functions for variant geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).max(tgt_w);
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).max(tgt_h);
        (w, h)
    }
}

/// Calculate dimensions that fit entirely inside a target box.
///
/// The scale factor is the smaller of the two axis ratios, so the result
/// touches the box on one axis and is letterboxed on the other. Dimensions are
/// truncated toward zero and never drop below one pixel.
///
/// ```
/// # use resort_content::imaging::calculate_fit_dimensions;
/// // 1000x500 into 512x512 → 512x256
/// assert_eq!(calculate_fit_dimensions((1000, 500), (512, 512)), (512, 256));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let scale = (tgt_w as f64 / src_w as f64).min(tgt_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale) as u32).clamp(1, tgt_w);
    let h = ((src_h as f64 * scale) as u32).clamp(1, tgt_h);
    (w, h)
}

/// Offset that centers an inner rectangle inside an outer one.
///
/// Used both for the crop window of a fill (inner = target, outer = fill) and
/// for placing a fitted image on a padded canvas (inner = fitted, outer = box).
pub fn center_offset(inner: (u32, u32), outer: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_fill_dimensions tests
    // =========================================================================

    #[test]
    fn fill_wider_source_to_portrait_target() {
        // 800x600 (4:3) → 400x500 target
        // Source is wider, so height matches: 500, width = 500 * (4/3) = 667
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 500)), (667, 500));
    }

    #[test]
    fn fill_taller_source_to_landscape_target() {
        // 600x800 (3:4) → 500x400 target
        assert_eq!(calculate_fill_dimensions((600, 800), (500, 400)), (500, 667));
    }

    #[test]
    fn fill_same_aspect_ratio() {
        assert_eq!(
            calculate_fill_dimensions((3840, 2160), (1920, 1080)),
            (1920, 1080)
        );
    }

    #[test]
    fn fill_upscales_small_source() {
        // 300x200 (3:2) is taller than 16:9, so width matches and height overflows
        assert_eq!(
            calculate_fill_dimensions((300, 200), (1920, 1080)),
            (1920, 1280)
        );
    }

    #[test]
    fn fill_never_undershoots_target() {
        let (w, h) = calculate_fill_dimensions((1001, 667), (1410, 940));
        assert!(w >= 1410);
        assert!(h >= 940);
    }

    // =========================================================================
    // calculate_fit_dimensions tests
    // =========================================================================

    #[test]
    fn fit_wide_source_into_square() {
        assert_eq!(calculate_fit_dimensions((1000, 500), (512, 512)), (512, 256));
    }

    #[test]
    fn fit_tall_source_into_square() {
        assert_eq!(calculate_fit_dimensions((300, 900), (512, 512)), (170, 512));
    }

    #[test]
    fn fit_upscales_small_source() {
        assert_eq!(calculate_fit_dimensions((64, 32), (512, 512)), (512, 256));
    }

    #[test]
    fn fit_extreme_aspect_keeps_one_pixel() {
        assert_eq!(calculate_fit_dimensions((10000, 1), (512, 512)), (512, 1));
    }

    // =========================================================================
    // center_offset tests
    // =========================================================================

    #[test]
    fn offset_centers_letterbox() {
        assert_eq!(center_offset((512, 256), (512, 512)), (0, 128));
    }

    #[test]
    fn offset_centers_crop_window() {
        assert_eq!(center_offset((400, 500), (667, 500)), (133, 0));
    }

    #[test]
    fn offset_is_zero_when_inner_is_larger() {
        assert_eq!(center_offset((600, 600), (500, 500)), (0, 0));
    }
}
