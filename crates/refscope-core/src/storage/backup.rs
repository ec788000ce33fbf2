use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{CoreError, Result};

/// Copy the database to `<dir>/<unix-seconds>-<file name>` and return the copy's path.
pub fn backup(db_path: &Path, dir: &Path) -> Result<PathBuf> {
    let file_name = db_path
        .file_name()
        .ok_or_else(|| CoreError::DatabaseNotFound(db_path.to_path_buf()))?;

    std::fs::create_dir_all(dir)?;
    let target = dir.join(format!(
        "{}-{}",
        chrono::Utc::now().timestamp(),
        file_name.to_string_lossy()
    ));
    std::fs::copy(db_path, &target)?;

    info!(from = %db_path.display(), to = %target.display(), "backed up database");
    Ok(target)
}
