use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::InstanceError;

/// Returns the user-specific runtime directory for lock files
///
/// Priority order:
/// 1. $XDG_RUNTIME_DIR (if set, e.g., /run/user/1000/)
/// 2. /tmp (fallback, with UID suffix added to filename)
fn get_runtime_dir() -> String {
    std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string())
}

/// Default lock file path for this user
///
/// - With XDG_RUNTIME_DIR: $XDG_RUNTIME_DIR/tdsrelay.lock
/// - Without XDG_RUNTIME_DIR: /tmp/tdsrelay_<uid>.lock
pub fn default_lock_path() -> PathBuf {
    let runtime_dir = get_runtime_dir();
    let program_name = crate::PROGRAM_NAME;

    // /tmp is shared between users, so the UID goes into the name
    if runtime_dir != "/tmp" {
        PathBuf::from(format!("{}/{}.lock", runtime_dir, program_name))
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/{}_{}.lock", program_name, uid))
    }
}

/// Exclusive marker for one running relay pass
///
/// Acquiring creates the lock file atomically; it is removed by `release`
/// or, failing that, when the guard is dropped (normal return, early
/// return, or unwinding panic). A crash that skips destructors leaves the
/// file behind; the operator removes it by hand.
#[derive(Debug)]
pub struct InstanceGuard {
    path: PathBuf,
    released: bool,
}

impl InstanceGuard {
    /// Claims the lock at `path`
    ///
    /// # Errors
    /// - `InstanceError::AlreadyRunning` if the lock file already exists
    /// - `InstanceError::Io` if it cannot be created or written
    pub fn acquire(path: &Path) -> Result<Self, InstanceError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(InstanceError::AlreadyRunning {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(InstanceError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        // From here on the file exists; the guard owns its removal.
        let guard = InstanceGuard {
            path: path.to_path_buf(),
            released: false,
        };
        writeln!(
            file,
            "{} {}",
            crate::PROGRAM_NAME,
            chrono::Local::now().to_rfc3339()
        )
        .map_err(|source| InstanceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(lock = %path.display(), "Acquired instance lock");
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the lock file now and reports the result
    pub fn release(mut self) -> Result<(), InstanceError> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|source| InstanceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            error!(lock = %self.path.display(), error = %e, "Failed to remove instance lock");
        }
    }
}
