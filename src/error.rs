//! Error types for the relay pipeline
//!
//! Each enum covers one failure scope. Validation errors are per-file and
//! cause a skip, transport errors surface from session open/close, and
//! `RelayError` is what a staging directory run fails with.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a `Transport` session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("FTP {operation} failed: {source}")]
    Ftp {
        operation: &'static str,
        #[source]
        source: suppaftp::FtpError,
    },
    #[cfg(feature = "sftp")]
    #[error("SFTP {operation} failed: {source}")]
    Ssh {
        operation: &'static str,
        #[source]
        source: ssh2::Error,
    },
    #[error("{operation} failed: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("session to {host} is not open")]
    NotOpen { host: String },
}

impl TransportError {
    pub(crate) fn io(operation: &'static str, source: io::Error) -> Self {
        TransportError::Io { operation, source }
    }
}

/// Failures while uploading a single file. Never leaves `upload::upload`.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("local {operation} of {} failed: {source}", path.display())]
    Local {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} has no usable file name", path.display())]
    BadName { path: PathBuf },
}

/// Per-file content problems found while checking the embedded customer.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a readable archive: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("{} has no {entry} entry", path.display())]
    MissingDescriptor { path: PathBuf, entry: &'static str },
    #[error("malformed descriptor in {}: {source}", path.display())]
    Markup {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },
    #[error("cannot get customer info from {}: no <{node}> node", path.display())]
    MissingIdentifier { path: PathBuf, node: &'static str },
    #[error("customer mismatch in {}: expect {expected:?}, actual {actual:?}", path.display())]
    Mismatch {
        path: PathBuf,
        expected: Vec<String>,
        actual: String,
    },
}

/// Problems reading a per-directory configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}:{line}: {reason}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("{} section [{section}]: {source}", path.display())]
    Section {
        path: PathBuf,
        section: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} section [{section}]: unknown mode {mode:?}, expected FTP or SFTP", path.display())]
    Mode {
        path: PathBuf,
        section: String,
        mode: String,
    },
    #[error("{} section [{section}]: invalid port {port:?}", path.display())]
    Port {
        path: PathBuf,
        section: String,
        port: String,
    },
}

/// Directory-level failures. The root loop logs these and moves on.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("destination [{destination}]: {source}")]
    Transport {
        destination: String,
        #[source]
        source: TransportError,
    },
    #[error("destination [{destination}] uses SFTP but this build lacks SFTP support; rebuild with `--features sftp`")]
    SftpUnavailable { destination: String },
    #[error("cannot scan {}: {source}", dir.display())]
    Scan {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot {operation} {}: {source}", path.display())]
    Lifecycle {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Single-instance guard failures.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("another instance is running or a deadlock has occurred; if certain it is a deadlock, remove {}", path.display())]
    AlreadyRunning { path: PathBuf },
    #[error("lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
