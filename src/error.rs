use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrataError {
    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("No configuration file found; add a .file() or .search_paths() on the builder")]
    NoConfigFile,

    #[error("App name is required for search paths; call .app_name() on the builder")]
    AppNameRequired,
}
