//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale dimensions by a percentage.
///
/// Each side is `floor(side * percent / 100)`, clamped to at least 1px so a
/// tiny image at a small percentage never collapses to zero. Percentages above
/// 100 upscale.
///
/// # Examples
/// ```
/// # use image_variants::imaging::scale_dimensions;
/// assert_eq!(scale_dimensions((1000, 750), 50), (500, 375));
/// assert_eq!(scale_dimensions((5, 5), 10), (1, 1));
/// ```
pub fn scale_dimensions(original: (u32, u32), percent: u32) -> (u32, u32) {
    let (w, h) = original;
    (scale_side(w, percent), scale_side(h, percent))
}

fn scale_side(side: u32, percent: u32) -> u32 {
    let scaled = u64::from(side) * u64::from(percent) / 100;
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// Map a 0-100 quality (higher is better) onto squoosh's AVIF `cqLevel`
/// (0-63, lower is better).
pub fn avif_cq_level(quality: u32) -> u32 {
    let q = quality.min(100);
    ((63 * (100 - q)) as f64 / 100.0).round() as u32
}
