//! Synthetic image fixtures for unit tests.
//!
//! Every helper writes a small, deterministic image to the given path so
//! tests can build an input directory inside a `TempDir` without shipping
//! binary fixtures.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! write_png_rgba(&tmp.path().join("a.png"), 100, 100);
//! write_corrupt(&tmp.path().join("b.jpg"));
//! ```

use image::codecs::avif::AvifEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            200,
            64 + (x * 128 / width.max(1)) as u8,
        ])
    })
}

/// RGBA gradient whose alpha varies across the image (never fully opaque).
///
/// Alpha runs from 64 at the left edge to just under 192 at the right.
pub fn write_png_rgba(path: &Path, width: u32, height: u32) {
    gradient_rgba(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// Opaque RGB gradient saved as JPEG.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    gradient_rgb(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

/// Opaque RGB gradient encoded as AVIF at the fastest speed.
pub fn write_avif(path: &Path, width: u32, height: u32) {
    let img = DynamicImage::ImageRgb8(gradient_rgb(width, height));
    let file = BufWriter::new(File::create(path).unwrap());
    img.write_with_encoder(AvifEncoder::new_with_speed_quality(file, 10, 80))
        .unwrap();
}

/// The RGBA gradient of [`write_png_rgba`] encoded as AVIF with an alpha item.
pub fn write_avif_rgba(path: &Path, width: u32, height: u32) {
    let img = DynamicImage::ImageRgba8(gradient_rgba(width, height));
    let file = BufWriter::new(File::create(path).unwrap());
    img.write_with_encoder(AvifEncoder::new_with_speed_quality(file, 10, 80))
        .unwrap();
}

/// Bytes no decoder accepts.
pub fn write_corrupt(path: &Path) {
    std::fs::write(path, b"this is not an image, just some text").unwrap();
}
