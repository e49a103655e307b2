//! Command-line surface

use clap::Parser;
use std::path::PathBuf;

use crate::error::{DirDiffError, Result};

pub const DIR_DIFF: &str = "dir-diff";

#[derive(Parser, Debug)]
#[command(version = "0.1")]
#[command(about = "compare file sizes across directories and write a markdown report", long_about = None)]
pub struct Cli {
    /// tool to run, e.g. dir-diff
    #[arg(long, short = 't', value_name = "NAME")]
    pub tool: Option<String>,

    /// comma-separated list of directories, e.g. 1,2,3
    #[arg(long, value_name = "DIRS")]
    pub files: Option<String>,

    /// write the report without tidying the markdown
    #[arg(long)]
    pub no_format: bool,

    /// directory to write the report into (defaults to the current directory)
    #[arg(long, short = 'o', value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

/// A validated request to run the dir-diff tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirDiffArgs {
    pub dirs: Vec<String>,
    pub format: bool,
    pub out_dir: Option<PathBuf>,
}

impl Cli {
    /// Route to a tool, or fail with a usage error
    pub fn dir_diff_args(&self) -> Result<DirDiffArgs> {
        let tool = self.tool.as_deref().ok_or_else(|| {
            DirDiffError::usage("Specify a tool with -t, e.g. -t dir-diff")
        })?;

        if tool != DIR_DIFF {
            return Err(DirDiffError::usage(format!(
                "Unknown tool '{tool}'; available tools: {DIR_DIFF}"
            )));
        }

        let dirs = split_list(self.files.as_deref().unwrap_or(""));
        if dirs.is_empty() {
            return Err(DirDiffError::usage(
                "The dir-diff tool needs one or more directories via --files, e.g. --files 1,2,3",
            ));
        }

        Ok(DirDiffArgs {
            dirs,
            format: !self.no_format,
            out_dir: self.out_dir.clone(),
        })
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
