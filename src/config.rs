//! Run configuration.
//!
//! Handles loading, validating, and merging the TOML configuration. Values are
//! layered: the stock defaults of the selected [`Profile`] are overridden by a
//! user file, and the result is validated once. The resulting [`Config`] is
//! immutable and passed by reference into scanning and processing.
//!
//! ## Config File Location
//!
//! `--config <file>` names the file explicitly. Otherwise `image-variants.toml`
//! in the working directory is used if present; otherwise the profile
//! defaults apply unchanged.
//!
//! ## Profiles
//!
//! | Profile | Input → Output | Layout | Variants |
//! |---|---|---|---|
//! | `responsive` | `images_original/chosen` → `public/images` | subdirs | 75/50/25% × WebP+AVIF, 10% WebP thumbnail |
//! | `ensure` | `public/images` in place | flat | 100% × JPEG+WebP+AVIF |
//!
//! ## Configuration Options
//!
//! ```toml
//! input_dir = "images_original/chosen"
//! output_dir = "public/images"
//! layout = "subdirs"            # or "flat"
//! extensions = ["jpg", "jpeg", "png"]
//! resize_percentages = [75, 50, 25]
//! formats = ["webp", "avif"]    # webp, avif, jpeg, png
//! generate_thumbs = true
//! thumb_percentage = 10
//! thumb_suffix = "_thumb"
//! thumb_format = "webp"
//! webp_quality = 70
//! avif_quality = 60
//! avif_speed = 6
//! jpeg_quality = 90
//! backend = "library"           # or "squoosh"
//!
//! [squoosh]
//! program = "npx"
//! args = ["@frostoven/squoosh-cli"]
//! ```
//!
//! Unknown keys are rejected.

use crate::imaging::Quality;
use crate::imaging::squoosh::{AvifOptions, MozjpegOptions, WebpOptions};
use crate::naming::output_label;
use crate::types::{Layout, OutputFormat, VariantSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "image-variants.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Named set of stock defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Profile {
    /// Scaled WebP/AVIF sets plus thumbnails into per-format subdirectories.
    #[default]
    Responsive,
    /// Full-size JPEG/WebP/AVIF siblings next to every source.
    Ensure,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Responsive => f.write_str("responsive"),
            Profile::Ensure => f.write_str("ensure"),
        }
    }
}

/// Which encoder strategy produces the variants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process codecs.
    #[default]
    Library,
    /// External squoosh CLI.
    Squoosh,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Library => f.write_str("library"),
            BackendKind::Squoosh => f.write_str("squoosh"),
        }
    }
}

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub layout: Layout,
    /// Source extensions, matched case-insensitively. A leading dot is ignored.
    pub extensions: Vec<String>,
    /// Scales in percent, each producing one variant per format.
    pub resize_percentages: Vec<u32>,
    pub formats: Vec<OutputFormat>,
    pub generate_thumbs: bool,
    pub thumb_percentage: u32,
    pub thumb_suffix: String,
    pub thumb_format: OutputFormat,
    pub webp_quality: u32,
    pub avif_quality: u32,
    pub avif_speed: u32,
    pub jpeg_quality: u32,
    pub backend: BackendKind,
    pub squoosh: SquooshConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

impl Config {
    /// Stock defaults of a profile.
    pub fn for_profile(profile: Profile) -> Self {
        let base = Self {
            input_dir: PathBuf::from("images_original/chosen"),
            output_dir: PathBuf::from("public/images"),
            layout: Layout::Subdirs,
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            resize_percentages: vec![75, 50, 25],
            formats: vec![OutputFormat::Webp, OutputFormat::Avif],
            generate_thumbs: true,
            thumb_percentage: 10,
            thumb_suffix: "_thumb".into(),
            thumb_format: OutputFormat::Webp,
            webp_quality: 70,
            avif_quality: 60,
            avif_speed: 6,
            jpeg_quality: 90,
            backend: BackendKind::Library,
            squoosh: SquooshConfig::default(),
        };
        match profile {
            Profile::Responsive => base,
            Profile::Ensure => Self {
                input_dir: PathBuf::from("public/images"),
                output_dir: PathBuf::from("public/images"),
                layout: Layout::Flat,
                extensions: ["jpg", "jpeg", "png", "webp", "avif"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                resize_percentages: vec![100],
                formats: vec![OutputFormat::Jpeg, OutputFormat::Webp, OutputFormat::Avif],
                generate_thumbs: false,
                webp_quality: 90,
                avif_quality: 50,
                ..base
            },
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("webp_quality", self.webp_quality),
            ("avif_quality", self.avif_quality),
            ("jpeg_quality", self.jpeg_quality),
        ] {
            if value > 100 {
                return Err(ConfigError::Validation(format!("{key} must be 0-100")));
            }
        }
        if self.avif_speed > 10 {
            return Err(ConfigError::Validation("avif_speed must be 0-10".into()));
        }
        if self.resize_percentages.is_empty() {
            return Err(ConfigError::Validation(
                "resize_percentages must not be empty".into(),
            ));
        }
        if self.resize_percentages.contains(&0) {
            return Err(ConfigError::Validation(
                "resize_percentages values must be greater than 0".into(),
            ));
        }
        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(ConfigError::Validation("extensions must not be empty".into()));
        }
        if self.formats.is_empty() {
            return Err(ConfigError::Validation("formats must not be empty".into()));
        }
        if self.generate_thumbs {
            if self.thumb_percentage == 0 {
                return Err(ConfigError::Validation(
                    "thumb_percentage must be greater than 0".into(),
                ));
            }
            if self.thumb_suffix.is_empty() {
                return Err(ConfigError::Validation(
                    "thumb_suffix must not be empty when generate_thumbs is set".into(),
                ));
            }
        }

        let mut seen = HashSet::new();
        for spec in self.variant_specs() {
            let label = output_label(self.layout, "<stem>", &spec);
            if !seen.insert(label.clone()) {
                return Err(ConfigError::Validation(format!(
                    "two variants map to the same output file {label}"
                )));
            }
        }

        // Flat in-place outputs are rescanned as sources; a renamed variant
        // would become a new stem on the next run.
        if self.layout == Layout::Flat && self.input_dir == self.output_dir {
            let sources = self.normalized_extensions();
            for spec in self.variant_specs() {
                let renamed = spec.suffix.is_some() || spec.scale != 100;
                if renamed && sources.iter().any(|e| e == spec.format.extension()) {
                    return Err(ConfigError::Validation(format!(
                        "{} would be scanned as a new source; use layout = \"subdirs\", \
                         a separate output_dir, or drop \"{}\" from extensions",
                        output_label(self.layout, "<stem>", &spec),
                        spec.format.extension()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Quality used for a format.
    ///
    /// PNG is lossless and ignores it.
    pub fn quality_for(&self, format: OutputFormat) -> Quality {
        match format {
            OutputFormat::Webp => Quality::new(self.webp_quality),
            OutputFormat::Avif => Quality::new(self.avif_quality),
            OutputFormat::Jpeg => Quality::new(self.jpeg_quality),
            OutputFormat::Png => Quality::new(100),
        }
    }

    /// The fixed list of renditions produced for every source.
    ///
    /// Every percentage × every format, in configuration order, followed by
    /// the thumbnail when enabled.
    pub fn variant_specs(&self) -> Vec<VariantSpec> {
        let mut specs: Vec<VariantSpec> = self
            .resize_percentages
            .iter()
            .flat_map(|&scale| {
                self.formats
                    .iter()
                    .map(move |&format| VariantSpec::new(format, self.quality_for(format), scale))
            })
            .collect();
        if self.generate_thumbs {
            specs.push(
                VariantSpec::new(
                    self.thumb_format,
                    self.quality_for(self.thumb_format),
                    self.thumb_percentage,
                )
                .with_suffix(self.thumb_suffix.clone()),
            );
        }
        specs
    }

    /// Normalized source extensions: lowercase, without leading dot.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    /// Apply command-line overrides.
    ///
    /// `target` replaces the output directory. When the configuration works in
    /// place (input == output) the input directory moves with it.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(target) = &overrides.target {
            if self.input_dir == self.output_dir {
                self.input_dir = target.clone();
            }
            self.output_dir = target.clone();
        }
        if let Some(input) = &overrides.input {
            self.input_dir = input.clone();
        }
        if let Some(backend) = overrides.backend {
            self.backend = backend;
        }
        self
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub backend: Option<BackendKind>,
}

/// `[squoosh]` table: how to invoke the external encoder and its tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SquooshConfig {
    /// Executable to spawn.
    pub program: String,
    /// Leading arguments before the squoosh options.
    pub args: Vec<String>,
    pub webp: WebpOptions,
    pub avif: AvifOptions,
    pub mozjpeg: MozjpegOptions,
}

impl Default for SquooshConfig {
    fn default() -> Self {
        Self {
            program: "npx".into(),
            args: vec!["@frostoven/squoosh-cli".into()],
            webp: WebpOptions::default(),
            avif: AvifOptions::default(),
            mozjpeg: MozjpegOptions::default(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock defaults of a profile as a `toml::Value::Table`.
pub fn stock_defaults_value(profile: Profile) -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::for_profile(profile))?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration for a profile, with an optional user file on top.
pub fn load_config(path: Option<&Path>, profile: Profile) -> Result<Config, ConfigError> {
    let base = stock_defaults_value(profile)?;
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(base, overlay)
}

/// `image-variants.toml` in `dir`, if it exists.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(DEFAULT_CONFIG_FILE);
    path.is_file().then_some(path)
}

fn toml_literal<T: Serialize>(value: &T) -> Result<String, ConfigError> {
    Ok(toml::Value::try_from(value)?.to_string())
}

/// A fully-commented stock config file for a profile.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml(profile: Profile) -> Result<String, ConfigError> {
    let c = Config::for_profile(profile);

    #[derive(Serialize)]
    struct SquooshSection<'a> {
        squoosh: &'a SquooshConfig,
    }

    let mut out = format!(
        r#"# image-variants configuration ({profile} profile)
# All settings are optional. Values shown are the defaults of this profile.
# Unknown keys cause an error.

# Directory holding the source images (not searched recursively).
input_dir = {input_dir}
# Directory receiving the variants. May equal input_dir.
output_dir = {output_dir}
# "subdirs": <output_dir>/<format>/<file>   "flat": <output_dir>/<file>
layout = {layout}
# Source extensions to pick up (case-insensitive).
extensions = {extensions}

# Every percentage is produced in every format.
# Files are named <stem>_<percent>.<ext>, or <stem>.<ext> at 100.
resize_percentages = {percentages}
formats = {formats}

# Extra thumbnail variant named <stem><thumb_suffix>.<ext>.
generate_thumbs = {generate_thumbs}
thumb_percentage = {thumb_percentage}
thumb_suffix = {thumb_suffix}
thumb_format = {thumb_format}

# Encoder quality, 0-100 (higher is better). PNG is lossless.
webp_quality = {webp_quality}
avif_quality = {avif_quality}
jpeg_quality = {jpeg_quality}
# AVIF encoder speed, 0 (slowest, smallest) to 10 (fastest).
avif_speed = {avif_speed}

# "library" encodes in-process. "squoosh" runs the squoosh CLI per variant.
backend = {backend}

# ---------------------------------------------------------------------------
# Squoosh backend. Quality and speed above override the matching keys
# (webp.quality, avif.cqLevel, avif.speed, mozjpeg.quality) at encode time.
# The avif table uses squoosh's own camelCase option names.
# ---------------------------------------------------------------------------
"#,
        input_dir = toml_literal(&c.input_dir)?,
        output_dir = toml_literal(&c.output_dir)?,
        layout = toml_literal(&c.layout)?,
        extensions = toml_literal(&c.extensions)?,
        percentages = toml_literal(&c.resize_percentages)?,
        formats = toml_literal(&c.formats)?,
        generate_thumbs = c.generate_thumbs,
        thumb_percentage = c.thumb_percentage,
        thumb_suffix = toml_literal(&c.thumb_suffix)?,
        thumb_format = toml_literal(&c.thumb_format)?,
        webp_quality = c.webp_quality,
        avif_quality = c.avif_quality,
        jpeg_quality = c.jpeg_quality,
        avif_speed = c.avif_speed,
        backend = toml_literal(&c.backend)?,
    );
    out.push_str(&toml::to_string(&SquooshSection {
        squoosh: &c.squoosh,
    })?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn responsive_defaults() {
        let c = Config::default();
        assert_eq!(c.input_dir, PathBuf::from("images_original/chosen"));
        assert_eq!(c.output_dir, PathBuf::from("public/images"));
        assert_eq!(c.layout, Layout::Subdirs);
        assert_eq!(c.resize_percentages, vec![75, 50, 25]);
        assert_eq!(c.formats, vec![OutputFormat::Webp, OutputFormat::Avif]);
        assert!(c.generate_thumbs);
        assert_eq!(c.webp_quality, 70);
        assert_eq!(c.avif_quality, 60);
        assert_eq!(c.avif_speed, 6);
        assert_eq!(c.backend, BackendKind::Library);
    }

    #[test]
    fn ensure_profile_is_in_place_and_flat() {
        let c = Config::for_profile(Profile::Ensure);
        assert_eq!(c.input_dir, c.output_dir);
        assert_eq!(c.layout, Layout::Flat);
        assert_eq!(c.resize_percentages, vec![100]);
        assert!(!c.generate_thumbs);
        assert_eq!(c.webp_quality, 90);
        assert_eq!(c.avif_quality, 50);
        assert_eq!(c.jpeg_quality, 90);
        assert!(c.extensions.contains(&"avif".to_string()));
    }

    #[test]
    fn both_profiles_validate() {
        Config::for_profile(Profile::Responsive).validate().unwrap();
        Config::for_profile(Profile::Ensure).validate().unwrap();
    }

    // =========================================================================
    // VariantSpec derivation
    // =========================================================================

    #[test]
    fn variant_specs_cover_percentages_times_formats_plus_thumb() {
        let specs = Config::default().variant_specs();
        assert_eq!(specs.len(), 3 * 2 + 1);
        assert_eq!(specs[0], VariantSpec::new(OutputFormat::Webp, Quality::new(70), 75));
        assert_eq!(specs[1], VariantSpec::new(OutputFormat::Avif, Quality::new(60), 75));
        let thumb = specs.last().unwrap();
        assert_eq!(thumb.suffix.as_deref(), Some("_thumb"));
        assert_eq!(thumb.scale, 10);
        assert_eq!(thumb.format, OutputFormat::Webp);
    }

    #[test]
    fn variant_specs_without_thumbs() {
        let specs = Config::for_profile(Profile::Ensure).variant_specs();
        let formats: Vec<_> = specs.iter().map(|s| s.format).collect();
        assert_eq!(
            formats,
            vec![OutputFormat::Jpeg, OutputFormat::Webp, OutputFormat::Avif]
        );
        assert!(specs.iter().all(|s| s.scale == 100 && s.suffix.is_none()));
    }

    #[test]
    fn quality_follows_format() {
        let c = Config::for_profile(Profile::Ensure);
        assert_eq!(c.quality_for(OutputFormat::Jpeg).value(), 90);
        assert_eq!(c.quality_for(OutputFormat::Avif).value(), 50);
        assert_eq!(c.quality_for(OutputFormat::Png).value(), 100);
    }

    #[test]
    fn extensions_are_normalized() {
        let c = Config {
            extensions: vec![".JPG".into(), "Png".into(), ".".into()],
            ..Config::default()
        };
        assert_eq!(c.normalized_extensions(), vec!["jpg", "png"]);
    }

    // =========================================================================
    // Overrides
    // =========================================================================

    #[test]
    fn target_moves_only_output_when_directories_differ() {
        let c = Config::default().with_overrides(&Overrides {
            target: Some("dist/img".into()),
            ..Overrides::default()
        });
        assert_eq!(c.output_dir, PathBuf::from("dist/img"));
        assert_eq!(c.input_dir, PathBuf::from("images_original/chosen"));
    }

    #[test]
    fn target_moves_both_for_in_place_config() {
        let c = Config::for_profile(Profile::Ensure).with_overrides(&Overrides {
            target: Some("site/img".into()),
            ..Overrides::default()
        });
        assert_eq!(c.output_dir, PathBuf::from("site/img"));
        assert_eq!(c.input_dir, PathBuf::from("site/img"));
    }

    #[test]
    fn input_and_backend_overrides() {
        let c = Config::default().with_overrides(&Overrides {
            input: Some("raw".into()),
            backend: Some(BackendKind::Squoosh),
            ..Overrides::default()
        });
        assert_eq!(c.input_dir, PathBuf::from("raw"));
        assert_eq!(c.backend, BackendKind::Squoosh);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn assert_invalid(config: Config, needle: &str) {
        match config.validate() {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected validation error containing {needle:?}, got {other:?}"),
        }
    }

    #[test]
    fn validate_quality_boundary_ok() {
        let c = Config {
            webp_quality: 100,
            avif_quality: 0,
            ..Config::default()
        };
        c.validate().unwrap();
    }

    #[test]
    fn validate_quality_too_high() {
        assert_invalid(
            Config {
                avif_quality: 101,
                ..Config::default()
            },
            "avif_quality",
        );
    }

    #[test]
    fn validate_speed_too_high() {
        assert_invalid(
            Config {
                avif_speed: 11,
                ..Config::default()
            },
            "avif_speed",
        );
    }

    #[test]
    fn validate_percentages() {
        assert_invalid(
            Config {
                resize_percentages: vec![],
                ..Config::default()
            },
            "resize_percentages",
        );
        assert_invalid(
            Config {
                resize_percentages: vec![50, 0],
                ..Config::default()
            },
            "greater than 0",
        );
    }

    #[test]
    fn validate_empty_lists() {
        assert_invalid(
            Config {
                extensions: vec![],
                ..Config::default()
            },
            "extensions",
        );
        assert_invalid(
            Config {
                formats: vec![],
                ..Config::default()
            },
            "formats",
        );
    }

    #[test]
    fn validate_thumb_settings() {
        assert_invalid(
            Config {
                thumb_suffix: String::new(),
                ..Config::default()
            },
            "thumb_suffix",
        );
        assert_invalid(
            Config {
                thumb_percentage: 0,
                ..Config::default()
            },
            "thumb_percentage",
        );
        // Ignored while thumbnails are off.
        Config {
            generate_thumbs: false,
            thumb_suffix: String::new(),
            ..Config::default()
        }
        .validate()
        .unwrap();
    }

    #[test]
    fn validate_rejects_colliding_outputs() {
        assert_invalid(
            Config {
                resize_percentages: vec![50, 50],
                ..Config::default()
            },
            "same output file",
        );
        assert_invalid(
            Config {
                resize_percentages: vec![50],
                thumb_suffix: "_50".into(),
                ..Config::default()
            },
            "webp/<stem>_50.webp",
        );
    }

    #[test]
    fn validate_rejects_in_place_flat_outputs_that_rescan_as_sources() {
        let in_place = Config {
            input_dir: "img".into(),
            output_dir: "img".into(),
            layout: Layout::Flat,
            extensions: vec!["png".into(), "webp".into()],
            resize_percentages: vec![50],
            formats: vec![OutputFormat::Webp],
            generate_thumbs: false,
            ..Config::default()
        };
        assert_invalid(in_place.clone(), "<stem>_50.webp would be scanned");

        // Thumbnails are renamed too.
        assert_invalid(
            Config {
                resize_percentages: vec![100],
                generate_thumbs: true,
                thumb_format: OutputFormat::Webp,
                ..in_place.clone()
            },
            "<stem>_thumb.webp",
        );

        // Full-size siblings share the stem, so they are fine.
        Config {
            resize_percentages: vec![100],
            ..in_place.clone()
        }
        .validate()
        .unwrap();
        // Outputs not matching a source extension are never rescanned.
        Config {
            extensions: vec!["png".into()],
            ..in_place.clone()
        }
        .validate()
        .unwrap();
        // Subdirectories are below the scan depth.
        Config {
            layout: Layout::Subdirs,
            ..in_place.clone()
        }
        .validate()
        .unwrap();
        // A separate output directory is never scanned.
        Config {
            output_dir: "out".into(),
            ..in_place
        }
        .validate()
        .unwrap();
    }

    #[test]
    fn target_override_is_revalidated() {
        let flat = Config {
            layout: Layout::Flat,
            extensions: vec!["jpg".into(), "webp".into()],
            ..Config::default()
        };
        flat.validate().unwrap();

        // Moving the output onto the input turns this into an in-place config.
        let moved = flat.with_overrides(&Overrides {
            input: Some("site".into()),
            target: Some("site".into()),
            ..Overrides::default()
        });
        assert!(matches!(moved.validate(), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"webp_quality = 70"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"webp_quality = 80"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("webp_quality").unwrap().as_integer(), Some(80));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[squoosh]
program = "npx"
args = ["@frostoven/squoosh-cli"]
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[squoosh]
program = "squoosh-cli"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let squoosh = merged.get("squoosh").unwrap();
        assert_eq!(squoosh.get("program").unwrap().as_str(), Some("squoosh-cli"));
        // args preserved from base
        assert_eq!(squoosh.get("args").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn merge_toml_arrays_replace_wholesale() {
        let base: toml::Value = toml::from_str(r#"resize_percentages = [75, 50, 25]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"resize_percentages = [50]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(
            merged.get("resize_percentages").unwrap().as_array().unwrap().len(),
            1
        );
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base = stock_defaults_value(Profile::Responsive).unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[squoosh.avif]
subsample = 3
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let avif = merged.get("squoosh").unwrap().get("avif").unwrap();
        assert_eq!(avif.get("subsample").unwrap().as_integer(), Some(3));
        assert_eq!(avif.get("cqAlphaLevel").unwrap().as_integer(), Some(-1));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<Config, _> = toml::from_str("webp_qualty = 70");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
[squoosh.webp]
qualty = 70
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let result: Result<Config, _> = toml::from_str(r#"formats = ["gif"]"#);
        assert!(result.is_err());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_without_file_uses_profile() {
        let c = load_config(None, Profile::Ensure).unwrap();
        assert_eq!(c, Config::for_profile(Profile::Ensure));
    }

    #[test]
    fn load_config_merges_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("variants.toml");
        fs::write(
            &path,
            r#"
output_dir = "dist/images"
resize_percentages = [50]
formats = ["webp", "jpg"]
"#,
        )
        .unwrap();

        let c = load_config(Some(&path), Profile::Responsive).unwrap();
        assert_eq!(c.output_dir, PathBuf::from("dist/images"));
        assert_eq!(c.resize_percentages, vec![50]);
        assert_eq!(c.formats, vec![OutputFormat::Webp, OutputFormat::Jpeg]);
        // untouched keys keep the profile default
        assert_eq!(c.webp_quality, 70);
        assert!(c.generate_thumbs);
    }

    #[test]
    fn load_config_on_top_of_ensure_profile() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("variants.toml");
        fs::write(&path, "avif_quality = 40\n").unwrap();

        let c = load_config(Some(&path), Profile::Ensure).unwrap();
        assert_eq!(c.avif_quality, 40);
        assert_eq!(c.layout, Layout::Flat);
    }

    #[test]
    fn load_config_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")), Profile::Responsive);
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("variants.toml");
        fs::write(&path, "this is not = valid [toml").unwrap();
        let result = load_config(Some(&path), Profile::Responsive);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("variants.toml");
        fs::write(&path, "jpeg_quality = 150\n").unwrap();
        let result = load_config(Some(&path), Profile::Responsive);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn find_config_file_in_directory() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_file(tmp.path()), None);
        fs::write(tmp.path().join(DEFAULT_CONFIG_FILE), "").unwrap();
        assert_eq!(
            find_config_file(tmp.path()),
            Some(tmp.path().join(DEFAULT_CONFIG_FILE))
        );
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_profile_defaults() {
        for profile in [Profile::Responsive, Profile::Ensure] {
            let content = stock_config_toml(profile).unwrap();
            let config: Config = toml::from_str(&content).unwrap();
            assert_eq!(config, Config::for_profile(profile), "{profile}");
        }
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml(Profile::Responsive).unwrap();
        assert!(content.contains("resize_percentages = [75, 50, 25]"));
        assert!(content.contains("[squoosh]"));
        assert!(content.contains("[squoosh.webp]"));
        assert!(content.contains("[squoosh.avif]"));
        assert!(content.contains("[squoosh.mozjpeg]"));
    }

    #[test]
    fn stock_defaults_value_is_table() {
        let val = stock_defaults_value(Profile::Responsive).unwrap();
        assert!(val.is_table());
        assert!(val.get("squoosh").is_some());
    }
}
