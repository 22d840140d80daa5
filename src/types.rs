//! Shared types used across scanning, processing, and reporting.
//!
//! A [`VariantSpec`] is one target rendition (format, quality, scale, optional
//! suffix). The list of specs is derived once from the configuration and is
//! the same for every source image.

use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target encoding format of a generated variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Avif,
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
}

impl OutputFormat {
    /// File extension written for this format (also the subdirectory name).
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// Whether the format can carry an alpha channel.
    ///
    /// Pixel buffers bound for formats without alpha are flattened to RGB
    /// before encoding.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Webp => "WebP",
            OutputFormat::Avif => "AVIF",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
        };
        f.write_str(name)
    }
}

/// Where variants land inside the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<output_dir>/<format>/<file>`, one subdirectory per format.
    #[default]
    Subdirs,
    /// `<output_dir>/<file>`, everything side by side.
    Flat,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Subdirs => f.write_str("subdirs"),
            Layout::Flat => f.write_str("flat"),
        }
    }
}

/// One rendition to produce for every source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSpec {
    pub format: OutputFormat,
    pub quality: Quality,
    /// Scale in percent of the original dimensions. May exceed 100.
    pub scale: u32,
    /// Replaces the `_<scale>` filename component when set (e.g. `_thumb`).
    pub suffix: Option<String>,
}

impl VariantSpec {
    pub fn new(format: OutputFormat, quality: Quality, scale: u32) -> Self {
        Self {
            format,
            quality,
            scale,
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}
