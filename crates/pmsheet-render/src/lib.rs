//! # pmsheet-render
//!
//! Output workbooks for pmsheet.
//!
//! This crate provides:
//! - Template reports: a copy of the template per chunk, filled with device
//!   rows, PM dates and header/footer metadata (umya-spreadsheet)
//! - The `TotalModel.xlsx` model summary (rust_xlsxwriter)
//! - Atomic file output
//!
//! ## Example
//!
//! ```rust,ignore
//! use pmsheet_core::Renderer;
//! use pmsheet_plan::ModelSummary;
//! use pmsheet_render::{write_atomic, SummaryRenderer};
//!
//! let summary = ModelSummary::from_rows(&classified.rows);
//! let bytes = SummaryRenderer::new().render(&summary)?;
//! write_atomic(&output_dir.join("TotalModel.xlsx"), &bytes)?;
//! ```

pub mod summary;
pub mod template;

pub use summary::{fitted_width, SummaryRenderer};
pub use template::{range_start_row, unmerge_band, write_value, TemplateRenderer};

use std::fs;
use std::path::{Path, PathBuf};

use pmsheet_core::RenderError;

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Write `bytes` to a temporary sibling, then rename it over `path`
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let temp = temp_sibling(path);
    if let Err(e) = fs::write(&temp, bytes).and_then(|()| fs::rename(&temp, path)) {
        let _ = fs::remove_file(&temp);
        return Err(RenderError::Io(e));
    }
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_file_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("SiteA.xlsx");
        fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn atomic_write_into_missing_directory_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("SiteA.xlsx");
        assert!(matches!(write_atomic(&path, b"x"), Err(RenderError::Io(_))));
    }
}
