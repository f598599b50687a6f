//! Protocol implementations for upload sessions
//!
//! This module provides a trait-based abstraction over the session protocols
//! a destination can use (FTP, SFTP). Each protocol implements the
//! `Transport` trait, and `Client` selects one by the destination's mode.

pub mod ftp;
#[cfg(test)]
pub mod mock;
#[cfg(feature = "sftp")]
pub mod sftp;

pub use ftp::FtpClient;
#[cfg(feature = "sftp")]
pub use sftp::SftpClient;

use std::path::Path;
use std::time::Duration;

use crate::config::{Destination, Mode};
use crate::error::{RelayError, TransportError};

/// Read timeout applied once a session is established
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Unified session interface over one destination
///
/// `open` and `close` report failures to the caller. Remote names are
/// relative to the destination's output directory.
pub trait Transport {
    /// Connect, authenticate and enter the output directory
    fn open(&mut self) -> Result<(), TransportError>;

    /// Whether `name` is currently present remotely (never cached)
    fn exists(&mut self, name: &str) -> Result<bool, TransportError>;

    /// Remove a remote file
    fn delete(&mut self, name: &str) -> Result<(), TransportError>;

    /// Upload the contents of `local` to `remote`
    fn store(&mut self, local: &Path, remote: &str) -> Result<(), TransportError>;

    /// Rename a remote file
    fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError>;

    /// Disconnect; a no-op when the session is not open
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Enum wrapper over the concrete session clients
///
/// The variant is picked from the destination's `Mode`; there is no other
/// way to construct a transport for a configured destination.
pub enum Client {
    Ftp(FtpClient),
    #[cfg(feature = "sftp")]
    Sftp(SftpClient),
}

impl Client {
    /// Build an unopened client for `dest`
    ///
    /// # Errors
    /// `RelayError::SftpUnavailable` when `dest` is SFTP and the crate was
    /// built without the `sftp` feature.
    pub fn for_destination(dest: &Destination, timeout: Duration) -> Result<Self, RelayError> {
        match dest.mode {
            Mode::Ftp => Ok(Client::Ftp(FtpClient::new(dest, timeout))),
            #[cfg(feature = "sftp")]
            Mode::Sftp => Ok(Client::Sftp(SftpClient::new(dest, timeout))),
            #[cfg(not(feature = "sftp"))]
            Mode::Sftp => Err(RelayError::SftpUnavailable {
                destination: dest.label.clone(),
            }),
        }
    }
}

impl Transport for Client {
    fn open(&mut self) -> Result<(), TransportError> {
        match self {
            Client::Ftp(client) => client.open(),
            #[cfg(feature = "sftp")]
            Client::Sftp(client) => client.open(),
        }
    }

    fn exists(&mut self, name: &str) -> Result<bool, TransportError> {
        match self {
            Client::Ftp(client) => client.exists(name),
            #[cfg(feature = "sftp")]
            Client::Sftp(client) => client.exists(name),
        }
    }

    fn delete(&mut self, name: &str) -> Result<(), TransportError> {
        match self {
            Client::Ftp(client) => client.delete(name),
            #[cfg(feature = "sftp")]
            Client::Sftp(client) => client.delete(name),
        }
    }

    fn store(&mut self, local: &Path, remote: &str) -> Result<(), TransportError> {
        match self {
            Client::Ftp(client) => client.store(local, remote),
            #[cfg(feature = "sftp")]
            Client::Sftp(client) => client.store(local, remote),
        }
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError> {
        match self {
            Client::Ftp(client) => client.rename(from, to),
            #[cfg(feature = "sftp")]
            Client::Sftp(client) => client.rename(from, to),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self {
            Client::Ftp(client) => client.close(),
            #[cfg(feature = "sftp")]
            Client::Sftp(client) => client.close(),
        }
    }
}

/// Creates transports for destinations
///
/// The runners only talk to this seam, which keeps them independent of
/// real network sessions.
pub trait TransportFactory {
    fn create(&self, dest: &Destination) -> Result<Box<dyn Transport>, RelayError>;
}

/// Production factory handing out `Client` sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionFactory {
    pub read_timeout: Duration,
}

impl Default for SessionFactory {
    fn default() -> Self {
        SessionFactory {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl TransportFactory for SessionFactory {
    fn create(&self, dest: &Destination) -> Result<Box<dyn Transport>, RelayError> {
        Ok(Box::new(Client::for_destination(dest, self.read_timeout)?))
    }
}

/// Base name of a path as listed by a server (NLST may return paths)
pub(crate) fn listed_name(entry: &str) -> &str {
    entry.rsplit(['/', '\\']).next().unwrap_or(entry)
}
