use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur in refscope-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Can't find a Mendeley database under {0}")]
    DatabaseNotFound(PathBuf),

    #[error("Unsupported platform: only macOS and Linux Mendeley installs can be located")]
    UnsupportedPlatform,

    #[error("Home directory could not be determined")]
    NoHomeDirectory,

    #[error("Document not found: {0}")]
    DocumentNotFound(i64),

    #[error("{0} has no structured column")]
    UnstructuredKind(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
