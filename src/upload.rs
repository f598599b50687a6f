//! Collision-free upload of one local file over an open transport.

use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::error::UploadError;
use crate::naming::next_name;
use crate::protocols::Transport;
use crate::TEMP_SUFFIX;

/// Uploads `local` without overwriting anything already on the server
///
/// # Returns
/// `true` when the file was stored and renamed to its final remote name,
/// `false` on any failure. Errors are logged here and never returned; the
/// caller decides what to do with the file from the boolean alone.
///
/// # Behavior
/// - Removes a leftover `<name>.tmp` from an earlier crashed attempt
/// - Picks the first free name among `a.dat`, `a-1.dat`, `a-2.dat`, ...,
///   re-querying the server for every candidate (no caching, so each
///   collision costs a round trip)
/// - When the free name differs, renames the local file to it for the
///   duration of the upload and always renames it back afterwards
/// - Uploads to `<final>.tmp`, then renames to `<final>` server-side
pub fn upload(local: &Path, transport: &mut dyn Transport) -> bool {
    match try_upload(local, transport) {
        Ok(remote) => {
            info!(file = %local.display(), remote = %remote, "Uploaded file");
            true
        }
        Err(e) => {
            error!(file = %local.display(), error = %e, "Exception uploading file");
            false
        }
    }
}

fn try_upload(local: &Path, transport: &mut dyn Transport) -> Result<String, UploadError> {
    let base = local
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UploadError::BadName {
            path: local.to_path_buf(),
        })?
        .to_string();

    let leftover = format!("{}{}", base, TEMP_SUFFIX);
    if transport.exists(&leftover)? {
        transport.delete(&leftover)?;
        warn!(remote = %leftover, "Found existing temporary upload, removed it");
    }

    let resolved = resolve_free_name(local, &base, transport)?;

    // Scoped local rename: forward now, back on every exit path.
    let renamed = if resolved != base {
        let target = local.with_file_name(&resolved);
        info!(from = %base, to = %resolved, "Temporarily renaming local file");
        fs::rename(local, &target).map_err(|source| UploadError::Local {
            operation: "rename",
            path: local.to_path_buf(),
            source,
        })?;
        Some(target)
    } else {
        None
    };
    let upload_path = scopeguard::guard(renamed, |renamed| {
        if let Some(renamed) = renamed {
            info!(from = %renamed.display(), to = %local.display(), "Renaming back local file");
            if let Err(e) = fs::rename(&renamed, local) {
                error!(file = %renamed.display(), error = %e, "Failed to rename local file back");
            }
        }
    });
    let source = upload_path.as_deref().unwrap_or(local);

    let tmp = format!("{}{}", resolved, TEMP_SUFFIX);
    transport.store(source, &tmp)?;
    transport.rename(&tmp, &resolved)?;
    Ok(resolved)
}

/// First name, starting at `base`, free on the server and not taken by a
/// different local file in the same directory
fn resolve_free_name(
    local: &Path,
    base: &str,
    transport: &mut dyn Transport,
) -> Result<String, UploadError> {
    let mut candidate = base.to_string();
    loop {
        let clashes_locally = candidate != base && local.with_file_name(&candidate).exists();
        if !clashes_locally && !transport.exists(&candidate)? {
            return Ok(candidate);
        }
        candidate = next_name(&candidate);
    }
}
