//! Persisting the finished report

use chrono::NaiveDate;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DirDiffError, Result};

const PREFIX: &str = "DIR_DIFF";

/// `DIR_DIFF-M-D-YYYY.md` for the given day
pub fn report_file_name(date: NaiveDate) -> String {
    format!("{PREFIX}-{}.md", date.format("%-m-%-d-%Y"))
}

/// Write `contents` into `dir` under the dated name, replacing any report
/// already written for that day.
pub fn write_report(dir: &Path, date: NaiveDate, contents: &str) -> Result<PathBuf> {
    let path = dir.join(report_file_name(date));
    fs::write(&path, contents)
        .map_err(|e| DirDiffError::io(format!("failed to write {}", path.display()), e))?;
    info!("wrote {} bytes to {}", contents.len(), path.display());
    Ok(path)
}
