//! Variant generation.
//!
//! For every stem found by the scanner, [`ensure_variants`] computes the
//! output paths of all configured [`VariantSpec`]s and produces only the ones
//! that do not exist yet:
//!
//! ```text
//! stem ──► all outputs exist? ──yes──► AlreadyComplete
//!                │ no
//!                ▼
//!          canonical source ──decode──► failed? ──► DecodeFailed
//!                │
//!                ▼  per variant
//!          exists ─► Satisfied
//!          missing ─► encode ─► write ─► Written | Failed
//!                 (dry run) ─► Planned
//! ```
//!
//! Per-file and per-variant failures are values in the [`BatchReport`]; only
//! conditions that make the whole run pointless (missing input directory,
//! missing external encoder) are [`ProcessError`]s.
//!
//! ## Writes
//!
//! Each encoded variant goes to a temporary file next to its destination and
//! is renamed into place, so an interrupted run never leaves a truncated file
//! at a final output path. Output directories are created on first write.
//!
//! Processing is sequential: one stem completes all its variants before the
//! next begins. Progress is published as [`ProcessEvent`]s over an optional
//! channel so the caller can print while work continues.

use crate::config::Config;
use crate::imaging::{BackendError, ImageBackend, Speed, plan_encode};
use crate::naming::{output_label, output_path};
use crate::scan::{ScanError, canonical_source, scan_sources};
use crate::types::{Layout, VariantSpec};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Input directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("External encoder `{0}` not found")]
    ToolNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ScanError> for ProcessError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::DirectoryNotFound(path) => ProcessError::DirectoryNotFound(path),
            ScanError::Io(e) => ProcessError::Io(e),
        }
    }
}

/// Everything the ensurer needs, derived once from [`Config`].
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub layout: Layout,
    pub extensions: Vec<String>,
    pub specs: Vec<VariantSpec>,
    pub speed: Speed,
    /// Decode sources but write nothing.
    pub dry_run: bool,
}

impl ProcessConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_dir: config.input_dir.clone(),
            output_dir: config.output_dir.clone(),
            layout: config.layout,
            extensions: config.normalized_extensions(),
            specs: config.variant_specs(),
            speed: Speed::new(config.avif_speed),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Terminal state of one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantStatus {
    /// Output already existed; nothing done.
    Satisfied,
    Written,
    /// Would have been written (dry run).
    Planned,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantReport {
    /// Output path relative to the output directory.
    pub label: String,
    pub path: PathBuf,
    pub status: VariantStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StemOutcome {
    /// Every output existed; the source was not opened.
    AlreadyComplete,
    /// Source decoded; one report per configured variant.
    Processed(Vec<VariantReport>),
    /// Canonical source could not be decoded; no variant attempted.
    DecodeFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StemReport {
    pub stem: String,
    /// Canonical source, once one had to be selected.
    pub source: Option<PathBuf>,
    pub outcome: StemOutcome,
}

impl StemReport {
    fn variants(&self) -> &[VariantReport] {
        match &self.outcome {
            StemOutcome::Processed(variants) => variants,
            _ => &[],
        }
    }

    fn count(&self, pred: impl Fn(&VariantStatus) -> bool) -> usize {
        self.variants().iter().filter(|v| pred(&v.status)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|s| *s == VariantStatus::Written)
    }

    pub fn planned(&self) -> usize {
        self.count(|s| *s == VariantStatus::Planned)
    }

    pub fn variant_failures(&self) -> usize {
        self.count(|s| matches!(s, VariantStatus::Failed(_)))
    }

    /// Decode failure or at least one failed variant.
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, StemOutcome::DecodeFailed(_)) || self.variant_failures() > 0
    }

    pub fn is_skipped(&self) -> bool {
        self.outcome == StemOutcome::AlreadyComplete
    }
}

/// Result of a whole run, one entry per stem in scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub stems: Vec<StemReport>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.stems.len()
    }

    /// Stems that needed work and finished without any failure.
    pub fn processed(&self) -> usize {
        self.stems
            .iter()
            .filter(|s| !s.is_skipped() && !s.is_failed())
            .count()
    }

    /// Stems whose outputs all existed.
    pub fn skipped(&self) -> usize {
        self.stems.iter().filter(|s| s.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.stems.iter().filter(|s| s.is_failed()).count()
    }

    pub fn variants_written(&self) -> usize {
        self.stems.iter().map(StemReport::written).sum()
    }

    pub fn variants_planned(&self) -> usize {
        self.stems.iter().map(StemReport::planned).sum()
    }

    pub fn variants_failed(&self) -> usize {
        self.stems.iter().map(StemReport::variant_failures).sum()
    }
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// Scan finished; `total` stems will follow.
    Scanned { total: usize },
    /// One stem reached its terminal state. `index` is 1-based.
    StemFinished {
        index: usize,
        total: usize,
        report: StemReport,
    },
}

/// Run the full batch: scan, then ensure every stem's variants.
pub fn run(
    config: &ProcessConfig,
    backend: &dyn ImageBackend,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BatchReport, ProcessError> {
    let groups = scan_sources(&config.input_dir, &config.extensions)?;
    let total = groups.len();
    debug!(
        "{} stems in {} ({} variants each)",
        total,
        config.input_dir.display(),
        config.specs.len()
    );
    if let Some(tx) = &events {
        tx.send(ProcessEvent::Scanned { total }).ok();
    }

    let mut batch = BatchReport::default();
    for (i, (stem, paths)) in groups.iter().enumerate() {
        let report = ensure_variants(backend, stem, paths, config)?;
        if let Some(tx) = &events {
            tx.send(ProcessEvent::StemFinished {
                index: i + 1,
                total,
                report: report.clone(),
            })
            .ok();
        }
        batch.stems.push(report);
    }
    Ok(batch)
}

/// What a run would find for one stem, computed without decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct StemCheck {
    pub stem: String,
    /// Every matching source file, sorted.
    pub candidates: Vec<PathBuf>,
    pub source: Option<PathBuf>,
    /// Labels of outputs that do not exist yet.
    pub missing: Vec<String>,
}

/// Scan and report missing outputs per stem. Reads nothing but directory
/// entries and writes nothing.
pub fn check(config: &ProcessConfig) -> Result<Vec<StemCheck>, ProcessError> {
    let groups = scan_sources(&config.input_dir, &config.extensions)?;
    Ok(groups
        .into_iter()
        .map(|(stem, candidates)| {
            let missing = config
                .specs
                .iter()
                .filter(|spec| !output_path(&config.output_dir, config.layout, &stem, spec).exists())
                .map(|spec| output_label(config.layout, &stem, spec))
                .collect();
            let source = canonical_source(&candidates).map(Path::to_path_buf);
            StemCheck {
                stem,
                candidates,
                source,
                missing,
            }
        })
        .collect())
}

/// Produce the missing variants of one stem.
///
/// Returns `Err` only for fatal backend conditions or when nothing can be
/// written at all; decode and encode failures are recorded in the report.
pub fn ensure_variants(
    backend: &dyn ImageBackend,
    stem: &str,
    paths: &[PathBuf],
    config: &ProcessConfig,
) -> Result<StemReport, ProcessError> {
    let desired: Vec<(&VariantSpec, PathBuf)> = config
        .specs
        .iter()
        .map(|spec| (spec, output_path(&config.output_dir, config.layout, stem, spec)))
        .collect();

    if desired.iter().all(|(_, path)| path.exists()) {
        debug!("{stem}: already complete");
        return Ok(StemReport {
            stem: stem.to_string(),
            source: None,
            outcome: StemOutcome::AlreadyComplete,
        });
    }

    let Some(source_path) = canonical_source(paths) else {
        return Ok(StemReport {
            stem: stem.to_string(),
            source: None,
            outcome: StemOutcome::DecodeFailed("no source file".into()),
        });
    };
    let report = |outcome| StemReport {
        stem: stem.to_string(),
        source: Some(source_path.to_path_buf()),
        outcome,
    };

    let source = match backend.decode(source_path) {
        Ok(source) => source,
        Err(e) => {
            let e = fatal_or(e)?;
            debug!("{stem}: {e}");
            return Ok(report(StemOutcome::DecodeFailed(e.to_string())));
        }
    };

    let mut variants = Vec::with_capacity(desired.len());
    for (spec, path) in desired {
        let label = output_label(config.layout, stem, spec);
        let status = if path.exists() {
            VariantStatus::Satisfied
        } else {
            let params = plan_encode(source.dimensions, spec, config.speed);
            if config.dry_run {
                debug!(
                    "would write {} ({}x{})",
                    path.display(),
                    params.target.width,
                    params.target.height
                );
                VariantStatus::Planned
            } else {
                match backend.encode(&source, &params) {
                    Ok(bytes) => match write_atomic(&path, &bytes) {
                        Ok(()) => {
                            debug!("wrote {} ({} bytes)", path.display(), bytes.len());
                            VariantStatus::Written
                        }
                        Err(e) => {
                            debug!("{}: {e}", path.display());
                            VariantStatus::Failed(e.to_string())
                        }
                    },
                    Err(e) => {
                        let e = fatal_or(e)?;
                        debug!("{label}: {e}");
                        VariantStatus::Failed(e.to_string())
                    }
                }
            }
        };
        variants.push(VariantReport {
            label,
            path,
            status,
        });
    }

    Ok(report(StemOutcome::Processed(variants)))
}

/// Escalate fatal backend errors, hand back the rest.
fn fatal_or(err: BackendError) -> Result<BackendError, ProcessError> {
    match err {
        BackendError::ToolNotFound(tool) => Err(ProcessError::ToolNotFound(tool)),
        other => Ok(other),
    }
}

/// Write `bytes` to a temporary file in the destination directory, then
/// rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
