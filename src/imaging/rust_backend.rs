//! In-process backend: every codec is linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate |
//! | Decode (AVIF) | `avif-parse` + `rav1d` (see [`avif_decode`](super::avif_decode)) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → WebP (lossy) | `webp` (libwebp) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::operations::{load_source, prepare_for_format, resize_to};
use super::params::{EncodeParams, Quality, Speed};
use crate::types::OutputFormat;
use image::DynamicImage;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use std::path::Path;

/// Pure in-process backend built on the `image` crate ecosystem.
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

impl ImageBackend for RustBackend {
    fn name(&self) -> &'static str {
        "library"
    }

    fn decode(&self, path: &Path) -> Result<SourceImage, BackendError> {
        load_source(path)
    }

    fn encode(&self, source: &SourceImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let resized = resize_to(&source.pixels, params.target);
        let prepared = prepare_for_format(&resized, params.format);
        encode_pixels(&prepared, params.format, params.quality, params.speed)
    }
}

/// Encode an already prepared 8-bit buffer.
pub fn encode_pixels(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
    speed: Speed,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Webp => return encode_webp(img, quality),
        OutputFormat::Avif => img.write_with_encoder(AvifEncoder::new_with_speed_quality(
            &mut buf,
            speed.value(),
            quality.value() as u8,
        )),
        OutputFormat::Jpeg => {
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.value() as u8))
        }
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buf)),
    }
    .map_err(|e| BackendError::encode(format, e.to_string()))?;
    Ok(buf)
}

/// Lossy WebP through libwebp; `image` only ships a lossless WebP encoder.
fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let (width, height) = (img.width(), img.height());
    let encoder = match img {
        DynamicImage::ImageRgba8(rgba) => webp::Encoder::from_rgba(rgba.as_raw(), width, height),
        DynamicImage::ImageRgb8(rgb) => webp::Encoder::from_rgb(rgb.as_raw(), width, height),
        other => {
            return Err(BackendError::encode(
                OutputFormat::Webp,
                format!("unprepared pixel layout {:?}", other.color()),
            ));
        }
    };
    let memory = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| BackendError::encode(OutputFormat::Webp, format!("{e:?}")))?;
    Ok(memory.to_vec())
}
