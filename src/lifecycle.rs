//! Terminal locations for staged files: quarantine, archive, removal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::naming::next_name;
use crate::{ARCHIVE_DIR, QUARANTINE_DIR};

/// Moves `file` under `dir/quarantined/` for manual handling
///
/// # Returns
/// The new location, or `None` when the file had already been moved away.
pub fn quarantine(file: &Path, dir: &Path) -> io::Result<Option<PathBuf>> {
    let moved = move_into(file, &dir.join(QUARANTINE_DIR))?;
    if let Some(target) = &moved {
        info!(file = %file.display(), to = %target.display(), "Moved file to quarantine");
    }
    Ok(moved)
}

/// Moves a delivered `file` under `dir/transferred/`
///
/// # Returns
/// The new location, or `None` when the file is no longer in the staging
/// directory.
pub fn archive(file: &Path, dir: &Path) -> io::Result<Option<PathBuf>> {
    let moved = move_into(file, &dir.join(ARCHIVE_DIR))?;
    if let Some(target) = &moved {
        info!(file = %file.display(), to = %target.display(), "Backup the data file");
    }
    Ok(moved)
}

/// Deletes a delivered `file`; failures are logged, never returned
pub fn remove(file: &Path) {
    if !file.exists() {
        return;
    }
    match fs::remove_file(file) {
        Ok(()) => info!(file = %file.display(), "Removed data file"),
        Err(e) => error!(file = %file.display(), error = %e, "Unable to remove file"),
    }
}

/// Never replaces an earlier file of the same name; the newcomer takes the
/// next free `-N` suffix instead.
fn move_into(file: &Path, sub_dir: &Path) -> io::Result<Option<PathBuf>> {
    fs::create_dir_all(sub_dir)?;
    if !file.exists() {
        return Ok(None);
    }
    let name = file.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", file.display()),
        )
    })?;
    let target = free_target(sub_dir, &name.to_string_lossy());
    fs::rename(file, &target)?;
    Ok(Some(target))
}

/// `sub_dir/name`, or the first `next_name` variant not already there
fn free_target(sub_dir: &Path, name: &str) -> PathBuf {
    let mut candidate = name.to_string();
    while sub_dir.join(&candidate).exists() {
        candidate = next_name(&candidate);
    }
    sub_dir.join(candidate)
}
