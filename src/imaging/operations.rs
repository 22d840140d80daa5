//! High-level image operations shared by every backend.
//!
//! These functions combine calculations with pixel work: decode a source from
//! disk, plan the parameters of a variant, resize, and prepare the pixel
//! buffer for the target format's color model.

use super::avif_decode::decode_avif;
use super::backend::{BackendError, Dimensions, SourceImage};
use super::calculations::scale_dimensions;
use super::params::{EncodeParams, Speed};
use crate::naming::split_file_name;
use crate::types::{OutputFormat, VariantSpec};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::borrow::Cow;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Load and decode a source image from disk.
///
/// AVIF goes through the rav1d-based decoder; everything else through the
/// `image` crate with content sniffing, so a mislabelled extension still
/// decodes. Any failure to open or decode is a [`BackendError::Decode`].
pub fn load_source(path: &Path) -> Result<SourceImage> {
    let (stem, extension) = split_file_name(path)
        .ok_or_else(|| BackendError::decode(path, "file name has no extension"))?;

    let pixels = if extension == "avif" {
        decode_avif(path)?
    } else {
        ImageReader::open(path)
            .map_err(|e| BackendError::decode(path, e.to_string()))?
            .with_guessed_format()
            .map_err(|e| BackendError::decode(path, e.to_string()))?
            .decode()
            .map_err(|e| BackendError::decode(path, e.to_string()))?
    };

    Ok(SourceImage {
        path: path.to_path_buf(),
        stem,
        extension,
        dimensions: Dimensions::new(pixels.width(), pixels.height()),
        pixels,
    })
}

/// Plan the encode of one variant without executing it.
pub fn plan_encode(source: Dimensions, spec: &VariantSpec, speed: Speed) -> EncodeParams {
    let (width, height) = scale_dimensions((source.width, source.height), spec.scale);
    EncodeParams {
        format: spec.format,
        target: Dimensions::new(width, height),
        quality: spec.quality,
        speed,
    }
}

/// Resize to exact target dimensions with Lanczos3.
///
/// Borrows the input unchanged when it already has the target size.
pub fn resize_to(img: &DynamicImage, target: Dimensions) -> Cow<'_, DynamicImage> {
    if img.width() == target.width && img.height() == target.height {
        Cow::Borrowed(img)
    } else {
        Cow::Owned(img.resize_exact(target.width, target.height, FilterType::Lanczos3))
    }
}

/// Convert a pixel buffer into the 8-bit color model the target format takes.
///
/// Formats without alpha get an opaque RGB buffer (transparency dropped).
/// Formats with alpha keep it; buffers that are already 8-bit RGB/RGBA pass
/// through unchanged.
pub fn prepare_for_format(img: &DynamicImage, format: OutputFormat) -> Cow<'_, DynamicImage> {
    let has_alpha = img.color().has_alpha();
    match (img, format.supports_alpha() && has_alpha) {
        (DynamicImage::ImageRgb8(_), false) | (DynamicImage::ImageRgba8(_), true) => {
            Cow::Borrowed(img)
        }
        (_, true) => Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8())),
        (_, false) => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
    }
}
