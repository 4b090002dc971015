//! Error taxonomy of the split pipeline.

use std::path::{Path, PathBuf};

use crate::go::ParseError;

/// One file the shading walk could not process.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShadeFailure {
    pub path: PathBuf,
    pub message: String,
}

impl std::fmt::Display for ShadeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Split pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// Input file missing or unreadable.
    #[error("cannot read input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is not valid Go.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A generated or rewritten file could not be rendered to valid text.
    #[error("cannot render {file}: {message}")]
    Serialization { file: String, message: String },

    /// The unused-import pruner failed.
    #[error("cannot prune imports of {file}: {message}")]
    Prune { file: String, message: String },

    /// Vendor manifest missing or unreadable.
    #[error("vendor manifest error: {message}")]
    Manifest { message: String },

    /// An external toolchain command failed.
    #[error("`{command}` failed: {message}")]
    Toolchain { command: String, message: String },

    /// Dependencies were left behind or went missing during relocation.
    #[error("dependency relocation incomplete: {}", .problems.join("; "))]
    Relocation { problems: Vec<String> },

    /// Files in the output tree could not be shaded; the tree is not safe to build.
    #[error("import shading failed for {} file(s): {}", .failures.len(), summarize(.failures))]
    Shading { failures: Vec<ShadeFailure> },

    /// Filesystem error on a specific path.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration file or option.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SplitError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        SplitError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Bad input or configuration
            Self::Input { .. } | Self::Parse(_) | Self::Config { .. } => 2,
            // Output generation
            Self::Serialization { .. } | Self::Prune { .. } => 3,
            // Dependency vendoring
            Self::Manifest { .. } | Self::Toolchain { .. } | Self::Relocation { .. } => 4,
            // Tree left partially shaded
            Self::Shading { .. } => 5,
            Self::Io { .. } => 1,
        }
    }

    /// Whether the output tree may have been left partially written
    pub fn leaves_partial_output(&self) -> bool {
        !matches!(
            self,
            Self::Input { .. } | Self::Parse(_) | Self::Config { .. }
        )
    }
}

fn summarize(failures: &[ShadeFailure]) -> String {
    let mut parts: Vec<String> = failures.iter().take(3).map(|f| f.to_string()).collect();
    if failures.len() > 3 {
        parts.push(format!("and {} more", failures.len() - 3));
    }
    parts.join("; ")
}
