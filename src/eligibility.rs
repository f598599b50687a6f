//! Candidate selection for a staging directory.

use glob::{MatchOptions, Pattern};
use once_cell::unsync::OnceCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::customer::extract_customer;
use crate::error::ValidationError;
use crate::{DATA_EXTENSION, TEMP_SUFFIX};

/// Which file names are eligible at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Every `*.*` file except in-flight `*.tmp` ones
    Permissive,
    /// Only `*.dat` files
    Strict,
}

impl SelectionMode {
    fn pattern(self) -> String {
        match self {
            SelectionMode::Permissive => "*.*".to_string(),
            SelectionMode::Strict => format!("*.{}", DATA_EXTENSION),
        }
    }

    fn accepts(self, name: &str) -> bool {
        match self {
            SelectionMode::Permissive => !name.ends_with(TEMP_SUFFIX),
            SelectionMode::Strict => Path::new(name)
                .extension()
                .is_some_and(|ext| ext == DATA_EXTENSION),
        }
    }
}

/// A file judged old enough and well-named enough to deliver
#[derive(Debug)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub age: Duration,
    customer: OnceCell<String>,
}

impl CandidateFile {
    pub fn new(path: PathBuf, age: Duration) -> Self {
        CandidateFile {
            path,
            age,
            customer: OnceCell::new(),
        }
    }

    /// Customer identifier embedded in the file, read on first use
    pub fn customer(&self) -> Result<&str, ValidationError> {
        self.customer
            .get_or_try_init(|| extract_customer(&self.path))
            .map(String::as_str)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Age-and-name filter over one staging directory
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter {
    pub mode: SelectionMode,
    /// Files modified less than this long ago may still be written to
    pub delay: Duration,
}

impl EligibilityFilter {
    pub fn new(mode: SelectionMode, delay: Duration) -> Self {
        EligibilityFilter { mode, delay }
    }

    /// Regular files in `dir` that are eligible right now, in name order
    pub fn candidates(&self, dir: &Path) -> io::Result<Vec<CandidateFile>> {
        self.candidates_at(dir, SystemTime::now())
    }

    /// Same as `candidates`, measuring ages against `now`
    ///
    /// # Errors
    /// Only when the directory itself cannot be globbed; unreadable
    /// entries are logged and skipped.
    pub fn candidates_at(&self, dir: &Path, now: SystemTime) -> io::Result<Vec<CandidateFile>> {
        let dir_str = dir.to_str().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not valid UTF-8", dir.display()),
            )
        })?;
        let pattern = Path::new(&Pattern::escape(dir_str)).join(self.mode.pattern());
        let options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };
        let paths = glob::glob_with(&pattern.to_string_lossy(), options)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut selected = Vec::new();
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Cannot read staging entry, skipping");
                    continue;
                }
            };
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Exception getting file modification time");
                    continue;
                }
            };
            if !meta.is_file() || !self.mode.accepts(&name) {
                continue;
            }

            let age = match meta.modified() {
                Ok(mtime) => now.duration_since(mtime).unwrap_or(Duration::ZERO),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Exception getting file modification time");
                    continue;
                }
            };
            if !is_old_enough(age, self.delay) {
                info!(file = %name, age_secs = age.as_secs(), "Skipping over potentially changing file");
                continue;
            }

            debug!(file = %path.display(), "Adding file to file list");
            selected.push(CandidateFile::new(path, age));
        }
        Ok(selected)
    }
}

/// A file exactly `delay` old is eligible
pub fn is_old_enough(age: Duration, delay: Duration) -> bool {
    age >= delay
}
