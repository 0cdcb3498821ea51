// error.rs — Error types for policy loading.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::Format;

/// Errors that can occur while loading or watching a policy file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file contents are not valid for the detected format.
    #[error("failed to parse {format} policy: {message}")]
    Parse { format: Format, message: String },

    /// The file extension does not name a supported format.
    #[error("unsupported policy file format: {path} (expected .json, .toml, .yaml or .yml)")]
    UnsupportedFormat { path: PathBuf },

    /// The file watcher could not be set up.
    #[error("failed to watch policy file: {0}")]
    Watch(#[from] notify::Error),

    /// The loaded policy could not be installed.
    #[error("policy error: {0}")]
    Policy(#[from] dg_policy::PolicyError),
}
