//! # image-variants
//!
//! Generates the resized and re-encoded renditions of a directory of source
//! images for web delivery: scaled WebP/AVIF sets, thumbnails, or full-size
//! JPEG/WebP/AVIF siblings. Only missing files are produced, so running the
//! tool twice writes nothing the second time.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan      input_dir   →  stem → [candidate files]
//! 2. Ensure    per stem    →  missing outputs? decode canonical source once
//! 3. Encode    per variant →  resize + encode + atomic write
//! 4. Report    events      →  progress lines + summary
//! ```
//!
//! Each stem is independent. A source that fails to decode or a variant that
//! fails to encode is recorded and the batch moves on; only a missing input
//! directory or a missing external encoder stops the run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Lists the input directory, groups candidates by stem, picks the canonical source |
//! | [`process`] | Ensures every stem's variants exist; per-item results and the batch report |
//! | [`imaging`] | Decode, resize, and the two encoder strategies behind [`imaging::ImageBackend`] |
//! | [`config`] | Profiles, TOML loading, merging and validation |
//! | [`types`] | `OutputFormat`, `Layout`, `VariantSpec` |
//! | [`naming`] | Stem/extension split and deterministic output paths |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Existence Is the Only State
//!
//! There is no index or cache file. An output path that exists counts as done.
//! Writes go through a temporary file and a rename so a path only ever exists
//! with complete content.
//!
//! ## One Canonical Source per Stem
//!
//! `photo.png` and `photo.jpg` in the same directory are the same subject.
//! The source decoded is chosen by a fixed preference
//! (AVIF > WebP > PNG > JPG > JPEG), never by directory order, so two runs
//! over the same files always encode from the same input.
//!
//! ## Two Encoder Strategies, One Contract
//!
//! [`imaging::RustBackend`] links every codec into the binary.
//! [`imaging::SquooshBackend`] runs the squoosh CLI with typed options
//! serialized to JSON. Both decode in-process and return encoded bytes; the
//! ensurer does all writing, so dry runs and atomic writes behave identically.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
