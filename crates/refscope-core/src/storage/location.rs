use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CoreError, Result};

const MACOS_PATTERN: &str = "Library/Application Support/Mendeley Desktop/*@www.mendeley.com.sqlite";
const LINUX_PATTERN: &str =
    ".local/share/data/Mendeley Ltd./Mendeley Desktop/*@www.mendeley.com.sqlite";

/// Find the signed-in user's Mendeley Desktop database under the home directory.
pub fn locate_database() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(CoreError::NoHomeDirectory)?;
    let pattern = if cfg!(target_os = "macos") {
        MACOS_PATTERN
    } else if cfg!(target_os = "linux") {
        LINUX_PATTERN
    } else {
        return Err(CoreError::UnsupportedPlatform);
    };
    locate_in(&home, pattern)
}

/// First file under `root` matching the relative glob `pattern`.
pub fn locate_in(root: &Path, pattern: &str) -> Result<PathBuf> {
    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let full = format!("{}/{}", escaped.trim_end_matches('/'), pattern);
    debug!(pattern = %full, "searching for database");

    let mut matches: Vec<PathBuf> = glob::glob(&full)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    matches.sort();

    matches
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::DatabaseNotFound(root.to_path_buf()))
}
