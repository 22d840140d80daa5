//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the encoder contract every strategy
//! implements: decode a source once, then encode it into any number of
//! variants. Callers never know which strategy they hold.
//!
//! | Strategy | Type | Encodes via |
//! |---|---|---|
//! | In-process | [`RustBackend`](super::rust_backend::RustBackend) | `image` (JPEG, PNG, AVIF/rav1e) + libwebp |
//! | Subprocess | [`SquooshBackend`](super::squoosh::SquooshBackend) | external squoosh CLI with JSON options |

use super::params::EncodeParams;
use crate::types::OutputFormat;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The source could not be opened or decoded. Skips the file.
    #[error("Failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
    /// One variant could not be produced. Skips the variant.
    #[error("{format} encode failed: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },
    /// The external encoder executable does not exist. Aborts the batch.
    #[error("External encoder `{0}` not found")]
    ToolNotFound(String),
}

impl BackendError {
    pub fn decode(path: &Path, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn encode(format: OutputFormat, message: impl Into<String>) -> Self {
        Self::Encode {
            format,
            message: message.into(),
        }
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A decoded canonical source.
///
/// Created once per stem and dropped after all of its variants are produced.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    /// Filename without extension.
    pub stem: String,
    /// Lowercase extension of `path`.
    pub extension: String,
    pub dimensions: Dimensions,
    pub pixels: DynamicImage,
}

/// Trait for encoding backends.
///
/// `encode` returns the encoded bytes; writing them to disk is the caller's
/// job so every backend gets the same atomic-write and dry-run handling.
pub trait ImageBackend {
    /// Short name shown in the configuration report.
    fn name(&self) -> &'static str;

    /// Decode a source file.
    fn decode(&self, path: &Path) -> Result<SourceImage, BackendError>;

    /// Produce one variant of a decoded source.
    fn encode(&self, source: &SourceImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
