//! Centralized filename handling: splitting sources into stem + extension and
//! computing deterministic output paths.
//!
//! ## Output names
//!
//! ```text
//! <stem><suffix>.<ext>     suffix set          photo_thumb.webp
//! <stem>_<scale>.<ext>     scale != 100        photo_75.avif
//! <stem>.<ext>             scale == 100        photo.jpg
//! ```
//!
//! A full-size variant carries no `_100` component: `resize_percentages =
//! [100, 50]` writes `photo.webp` and `photo_50.webp`, never
//! `photo_100.webp`. Earlier responsive setups named it `photo_100.webp`;
//! rename those files or they will be regenerated under the new name.
//!
//! With [`Layout::Subdirs`] the file goes into `<output_dir>/<ext>/`, with
//! [`Layout::Flat`] directly into `<output_dir>/`. The same stem and spec
//! always map to the same path; nothing else feeds into it.

use crate::types::{Layout, VariantSpec};
use std::path::{Path, PathBuf};

/// Split a path into `(stem, lowercase extension)`.
///
/// Returns `None` for paths without a UTF-8 file name or without an extension.
/// Only the last dot separates the extension: `a.b.png` → `("a.b", "png")`.
pub fn split_file_name(path: &Path) -> Option<(String, String)> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem.to_string(), ext.to_ascii_lowercase()))
}

/// File name of a variant for the given stem.
pub fn output_file_name(stem: &str, spec: &VariantSpec) -> String {
    let ext = spec.format.extension();
    match (&spec.suffix, spec.scale) {
        (Some(suffix), _) => format!("{stem}{suffix}.{ext}"),
        (None, 100) => format!("{stem}.{ext}"),
        (None, scale) => format!("{stem}_{scale}.{ext}"),
    }
}

/// Full output path of a variant.
pub fn output_path(output_dir: &Path, layout: Layout, stem: &str, spec: &VariantSpec) -> PathBuf {
    let name = output_file_name(stem, spec);
    match layout {
        Layout::Subdirs => output_dir.join(spec.format.extension()).join(name),
        Layout::Flat => output_dir.join(name),
    }
}

/// Output path relative to the output directory, `/`-separated, for display.
pub fn output_label(layout: Layout, stem: &str, spec: &VariantSpec) -> String {
    let name = output_file_name(stem, spec);
    match layout {
        Layout::Subdirs => format!("{}/{}", spec.format.extension(), name),
        Layout::Flat => name,
    }
}
