//! Subprocess backend: shells out to the squoosh CLI.
//!
//! Each variant is one invocation:
//!
//! ```text
//! npx @frostoven/squoosh-cli --resize '{...}' --webp '{...}' -d <tmp> <source>
//! ```
//!
//! Options are typed structs here and only become JSON when the command line
//! is built. The encoded file squoosh writes into the temporary directory is
//! read back and handed to the caller like any other encode result.
//!
//! Failure mapping:
//! - executable not found → [`BackendError::ToolNotFound`] (fatal)
//! - non-zero exit, or exit 0 without the expected file → [`BackendError::Encode`]
//!   carrying the captured stderr/stdout

use super::backend::{BackendError, Dimensions, ImageBackend, SourceImage};
use super::calculations::avif_cq_level;
use super::operations::load_source;
use super::params::EncodeParams;
use crate::config::SquooshConfig;
use crate::types::OutputFormat;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

/// `--resize` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeOptions {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub method: String,
    pub fit_method: String,
    pub premultiply: bool,
    #[serde(rename = "linearRGB")]
    pub linear_rgb: bool,
}

impl ResizeOptions {
    /// Lanczos3 stretch to exact dimensions.
    pub fn stretch_to(target: Dimensions) -> Self {
        Self {
            enabled: true,
            width: target.width,
            height: target.height,
            method: "lanczos3".into(),
            fit_method: "stretch".into(),
            premultiply: true,
            linear_rgb: true,
        }
    }
}

/// `--webp` payload: libwebp's `WebPConfig` knobs under their C names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpOptions {
    pub quality: u32,
    pub target_size: u32,
    #[serde(rename = "target_PSNR")]
    pub target_psnr: u32,
    pub method: u32,
    pub sns_strength: u32,
    pub filter_strength: u32,
    pub filter_sharpness: u32,
    pub filter_type: u32,
    pub partitions: u32,
    pub segments: u32,
    pub pass: u32,
    pub show_compressed: u32,
    pub preprocessing: u32,
    pub autofilter: u32,
    pub partition_limit: u32,
    pub alpha_compression: u32,
    pub alpha_filtering: u32,
    pub alpha_quality: u32,
    pub lossless: u32,
    pub exact: u32,
    pub image_hint: u32,
    pub emulate_jpeg_size: u32,
    pub thread_level: u32,
    pub low_memory: u32,
    pub near_lossless: u32,
    pub use_delta_palette: u32,
    pub use_sharp_yuv: u32,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self {
            quality: 75,
            target_size: 0,
            target_psnr: 0,
            method: 4,
            sns_strength: 50,
            filter_strength: 60,
            filter_sharpness: 0,
            filter_type: 1,
            partitions: 0,
            segments: 4,
            pass: 1,
            show_compressed: 0,
            preprocessing: 0,
            autofilter: 0,
            partition_limit: 0,
            alpha_compression: 0,
            alpha_filtering: 1,
            alpha_quality: 100,
            lossless: 0,
            exact: 0,
            image_hint: 0,
            emulate_jpeg_size: 0,
            thread_level: 0,
            low_memory: 0,
            near_lossless: 100,
            use_delta_palette: 0,
            use_sharp_yuv: 0,
        }
    }
}

/// `--avif` payload. Keys are squoosh's camelCase names in config and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct AvifOptions {
    /// 0-63, lower is better. Derived from `avif_quality` at encode time.
    pub cq_level: u32,
    pub cq_alpha_level: i32,
    pub subsample: u32,
    pub tile_cols_log2: u32,
    pub tile_rows_log2: u32,
    /// Derived from `avif_speed` at encode time.
    pub speed: u32,
    pub chroma_delta_q: bool,
    pub sharpness: u32,
    pub denoise_level: u32,
    pub tune: u32,
}

impl Default for AvifOptions {
    fn default() -> Self {
        Self {
            cq_level: 38,
            cq_alpha_level: -1,
            subsample: 1,
            tile_cols_log2: 0,
            tile_rows_log2: 0,
            speed: 6,
            chroma_delta_q: false,
            sharpness: 0,
            denoise_level: 0,
            tune: 0,
        }
    }
}

/// `--mozjpeg` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MozjpegOptions {
    pub quality: u32,
    pub baseline: bool,
    pub arithmetic: bool,
    pub progressive: bool,
    pub optimize_coding: bool,
    pub smoothing: u32,
    pub color_space: u32,
    pub quant_table: u32,
    pub trellis_multipass: bool,
    pub trellis_opt_zero: bool,
    pub trellis_opt_table: bool,
    pub trellis_loops: u32,
    pub auto_subsample: bool,
    pub chroma_subsample: u32,
    pub separate_chroma_quality: bool,
    pub chroma_quality: u32,
}

impl Default for MozjpegOptions {
    fn default() -> Self {
        Self {
            quality: 75,
            baseline: false,
            arithmetic: false,
            progressive: true,
            optimize_coding: true,
            smoothing: 0,
            color_space: 3,
            quant_table: 3,
            trellis_multipass: false,
            trellis_opt_zero: false,
            trellis_opt_table: false,
            trellis_loops: 1,
            auto_subsample: true,
            chroma_subsample: 2,
            separate_chroma_quality: false,
            chroma_quality: 75,
        }
    }
}

/// Backend that runs the squoosh CLI once per variant.
#[derive(Debug, Clone)]
pub struct SquooshBackend {
    program: String,
    args: Vec<String>,
    webp: WebpOptions,
    avif: AvifOptions,
    mozjpeg: MozjpegOptions,
}

impl SquooshBackend {
    pub fn from_config(config: &SquooshConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            webp: config.webp.clone(),
            avif: config.avif.clone(),
            mozjpeg: config.mozjpeg.clone(),
        }
    }

    /// Codec flag and JSON options for one encode, quality knobs applied.
    fn codec_args(&self, params: &EncodeParams) -> Result<(&'static str, String), BackendError> {
        let quality = params.quality.value();
        let json = match params.format {
            OutputFormat::Webp => serde_json::to_string(&WebpOptions {
                quality,
                ..self.webp.clone()
            }),
            OutputFormat::Avif => serde_json::to_string(&AvifOptions {
                cq_level: avif_cq_level(quality),
                speed: u32::from(params.speed.value()),
                ..self.avif.clone()
            }),
            OutputFormat::Jpeg => serde_json::to_string(&MozjpegOptions {
                quality,
                ..self.mozjpeg.clone()
            }),
            OutputFormat::Png => Ok("{}".to_string()),
        }
        .map_err(|e| BackendError::encode(params.format, e.to_string()))?;
        Ok((codec_flag(params.format), json))
    }

    /// Build the full command line for one variant.
    fn build_command(
        &self,
        source: &SourceImage,
        params: &EncodeParams,
        out_dir: &Path,
    ) -> Result<Command, BackendError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if params.target != source.dimensions {
            let resize = serde_json::to_string(&ResizeOptions::stretch_to(params.target))
                .map_err(|e| BackendError::encode(params.format, e.to_string()))?;
            cmd.arg("--resize").arg(resize);
        }
        let (flag, options) = self.codec_args(params)?;
        cmd.arg(flag).arg(options).arg("-d").arg(out_dir).arg(&source.path);
        Ok(cmd)
    }
}

fn codec_flag(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Webp => "--webp",
        OutputFormat::Avif => "--avif",
        OutputFormat::Jpeg => "--mozjpeg",
        OutputFormat::Png => "--oxipng",
    }
}

/// Captured stderr, falling back to stdout, for error messages.
fn diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        "no output".to_string()
    } else {
        stdout.trim().to_string()
    }
}

impl ImageBackend for SquooshBackend {
    fn name(&self) -> &'static str {
        "squoosh"
    }

    fn decode(&self, path: &Path) -> Result<SourceImage, BackendError> {
        load_source(path)
    }

    fn encode(&self, source: &SourceImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let format = params.format;
        let out_dir = tempfile::TempDir::new()?;
        let mut cmd = self.build_command(source, params, out_dir.path())?;
        debug!("running {:?}", cmd);

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackendError::ToolNotFound(self.program.clone()));
            }
            Err(e) => {
                return Err(BackendError::encode(
                    format,
                    format!("failed to run {}: {e}", self.program),
                ));
            }
        };

        if !output.status.success() {
            return Err(BackendError::encode(
                format,
                format!("{} exited with {}: {}", self.program, output.status, diagnostics(&output)),
            ));
        }

        let expected = out_dir
            .path()
            .join(format!("{}.{}", source.stem, format.extension()));
        std::fs::read(&expected).map_err(|_| {
            BackendError::encode(
                format,
                format!(
                    "{} did not write {}: {}",
                    self.program,
                    expected.display(),
                    diagnostics(&output)
                ),
            )
        })
    }
}
