// walk each directory once, keyed by path relative to its root
// compare every pair of roots (or list a single one)
// write the tables to a dated markdown file

// Metadata docs https://doc.rust-lang.org/std/fs/struct.Metadata.html

pub mod cli;
pub mod error;
pub mod index;
pub mod markdown;
pub mod report;
pub mod writer;

use chrono::{Local, NaiveDate};
use log::debug;
use std::path::{Path, PathBuf};

use crate::cli::DirDiffArgs;
use crate::error::Result;
use crate::index::Session;

/// Build the report for `args.dirs` and return it without writing anything.
///
/// Relative directories are resolved against `cwd`. Every directory is
/// validated before any of them is walked.
pub fn render(args: &DirDiffArgs, cwd: &Path) -> Result<String> {
    let mut session = Session::new(cwd);
    session.validate(&args.dirs)?;

    let roots = session.index_all(&args.dirs)?;
    debug!(
        "indexed {} roots, {} distinct files",
        roots.len(),
        session.files_seen()
    );

    let doc = report::build_report(&roots);
    Ok(if args.format {
        markdown::prettify(&doc)
    } else {
        doc
    })
}

/// Run the dir-diff tool for the given day, returning the report path
pub fn dir_diff_on(args: &DirDiffArgs, cwd: &Path, date: NaiveDate) -> Result<PathBuf> {
    let doc = render(args, cwd)?;
    let out_dir = match &args.out_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => cwd.join(dir),
        None => cwd.to_path_buf(),
    };
    writer::write_report(&out_dir, date, &doc)
}

/// Run the dir-diff tool, stamping the report with today's local date
pub fn dir_diff(args: &DirDiffArgs, cwd: &Path) -> Result<PathBuf> {
    dir_diff_on(args, cwd, Local::now().date_naive())
}
