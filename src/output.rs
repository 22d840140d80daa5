//! CLI output formatting.
//!
//! The reporter only observes: it turns configuration, progress events and
//! the final [`BatchReport`] into lines of text and makes no decisions.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Configuration
//!     Input: images_original/chosen
//!     Output: public/images (subdirs)
//!     Extensions: jpg, jpeg, png
//!     Backend: library
//!     Variants:
//!         webp/<stem>_75.webp  WebP 75% q70
//!         webp/<stem>_thumb.webp  WebP 10% q70
//!
//! Found 2 images
//! [1/2] beach
//!     Source: beach.png
//!     webp/beach_75.webp: written
//!     avif/beach_75.avif: failed: AVIF encode failed: ...
//! [2/2] forest
//!     already complete
//!
//! Processed 0, skipped 1, failed 1 (1 variant written, 1 failed)
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 beach
//!     Candidates: beach.jpg, beach.png
//!     Source: beach.png
//!     Missing: webp/beach_75.webp, avif/beach_75.avif
//! 002 forest
//!     Complete
//!
//! 2 images, 1 complete, 1 incomplete
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::config::Config;
use crate::naming::output_label;
use crate::process::{
    BatchReport, ProcessEvent, StemCheck, StemOutcome, StemReport, VariantStatus,
};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Format the resolved configuration shown before a run.
pub fn format_config(config: &Config, backend: &str, dry_run: bool) -> Vec<String> {
    let mut lines = vec![
        "Configuration".to_string(),
        format!("{}Input: {}", indent(1), config.input_dir.display()),
        format!(
            "{}Output: {} ({})",
            indent(1),
            config.output_dir.display(),
            config.layout
        ),
        format!("{}Extensions: {}", indent(1), config.normalized_extensions().join(", ")),
        format!("{}Backend: {}", indent(1), backend),
    ];
    if dry_run {
        lines.push(format!("{}Dry run: nothing will be written", indent(1)));
    }
    lines.push(format!("{}Variants:", indent(1)));
    for spec in config.variant_specs() {
        lines.push(format!(
            "{}{}  {} {}% q{}",
            indent(2),
            output_label(config.layout, "<stem>", &spec),
            spec.format,
            spec.scale,
            spec.quality.value()
        ));
    }
    lines
}

pub fn print_config(config: &Config, backend: &str, dry_run: bool) {
    for line in format_config(config, backend, dry_run) {
        println!("{}", line);
    }
}

// ============================================================================
// Progress
// ============================================================================

fn status_text(status: &VariantStatus) -> String {
    match status {
        VariantStatus::Satisfied => "exists".to_string(),
        VariantStatus::Written => "written".to_string(),
        VariantStatus::Planned => "planned".to_string(),
        VariantStatus::Failed(msg) => format!("failed: {msg}"),
    }
}

/// Lines for one finished stem, without the progress prefix.
pub fn format_stem_report(report: &StemReport) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(source) = &report.source {
        lines.push(format!("{}Source: {}", indent(1), file_name(source)));
    }
    match &report.outcome {
        StemOutcome::AlreadyComplete => {
            lines.push(format!("{}already complete", indent(1)));
        }
        StemOutcome::DecodeFailed(msg) => {
            lines.push(format!("{}error: {}", indent(1), msg));
        }
        StemOutcome::Processed(variants) => {
            for v in variants {
                lines.push(format!("{}{}: {}", indent(1), v.label, status_text(&v.status)));
            }
        }
    }
    lines
}

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Scanned { total: 0 } => vec!["No images found".to_string()],
        ProcessEvent::Scanned { total } => vec![format!("Found {}", plural(*total, "image"))],
        ProcessEvent::StemFinished {
            index,
            total,
            report,
        } => {
            let mut lines = vec![format!("[{}/{}] {}", index, total, report.stem)];
            lines.extend(format_stem_report(report));
            lines
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Final summary line of a run.
pub fn format_summary(report: &BatchReport, dry_run: bool) -> Vec<String> {
    let variants = if dry_run {
        format!("{} planned", plural(report.variants_planned(), "variant"))
    } else {
        format!("{} written", plural(report.variants_written(), "variant"))
    };
    vec![format!(
        "Processed {}, skipped {}, failed {} ({}, {} failed)",
        report.processed(),
        report.skipped(),
        report.failed(),
        variants,
        report.variants_failed()
    )]
}

pub fn print_summary(report: &BatchReport, dry_run: bool) {
    for line in format_summary(report, dry_run) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of the `check` command.
pub fn format_check_output(checks: &[StemCheck]) -> Vec<String> {
    if checks.is_empty() {
        return vec!["No images found".to_string()];
    }

    let mut lines = Vec::new();
    for (i, check) in checks.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), check.stem));
        if check.candidates.len() > 1 {
            let names: Vec<String> = check.candidates.iter().map(|p| file_name(p)).collect();
            lines.push(format!("{}Candidates: {}", indent(1), names.join(", ")));
        }
        if check.missing.is_empty() {
            lines.push(format!("{}Complete", indent(1)));
        } else {
            if let Some(source) = &check.source {
                lines.push(format!("{}Source: {}", indent(1), file_name(source)));
            }
            lines.push(format!("{}Missing: {}", indent(1), check.missing.join(", ")));
        }
    }

    let incomplete = checks.iter().filter(|c| !c.missing.is_empty()).count();
    lines.push(String::new());
    lines.push(format!(
        "{}, {} complete, {} incomplete",
        plural(checks.len(), "image"),
        checks.len() - incomplete,
        incomplete
    ));
    lines
}

pub fn print_check_output(checks: &[StemCheck]) {
    for line in format_check_output(checks) {
        println!("{}", line);
    }
}
