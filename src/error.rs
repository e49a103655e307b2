//! Error types for the dir-diff tool

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, DirDiffError>;

#[derive(Error, Debug)]
pub enum DirDiffError {
    /// A required argument was not supplied
    #[error("{message}")]
    Usage { message: String },

    #[error("{} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// Traversal or write failure
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DirDiffError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code, following sysexits.h where one applies.
    ///
    /// Usage errors deliberately exit with 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } => 0,
            Self::NotFound { .. } | Self::NotADirectory { .. } => 66, // EX_NOINPUT
            Self::Io { .. } => 74,                                     // EX_IOERR
        }
    }
}

/// Render an error and its cause chain for the terminal
pub fn format_error(error: &anyhow::Error) -> String {
    use console::style;

    if let Some(DirDiffError::Usage { message }) = error.downcast_ref::<DirDiffError>() {
        return message.clone();
    }

    let mut output = format!("{} {}", style("ERROR:").white().on_red().bold(), error);

    let mut source = error.source();
    let mut indent = 1;
    while let Some(err) = source {
        output.push_str(&format!(
            "\n{}{} {}",
            "  ".repeat(indent),
            style("caused by:").yellow(),
            err
        ));
        source = err.source();
        indent += 1;
    }

    output
}

/// Exit code for any error surfaced to `main`
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<DirDiffError>()
        .map_or(1, DirDiffError::exit_code)
}
