//! SFTP (SSH File Transfer Protocol) client implementation
//!
//! This module provides the `SftpClient` which implements the `Transport`
//! trait for SFTP connections using the ssh2 crate. Host keys are not
//! verified and only password authentication is offered.

use secrecy::{ExposeSecret, SecretString};
use ssh2::{ErrorCode, Session, Sftp};
use std::fs::File;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::config::Destination;
use crate::error::TransportError;
use crate::protocols::Transport;

/// libssh2 status for a missing remote path (LIBSSH2_FX_NO_SUCH_FILE)
const SFTP_NO_SUCH_FILE: i32 = 2;

fn ssh_err(operation: &'static str) -> impl FnOnce(ssh2::Error) -> TransportError {
    move |source| TransportError::Ssh { operation, source }
}

/// Live SSH session plus the SFTP channel opened on it
struct Connection {
    session: Session,
    sftp: Sftp,
}

/// SFTP client for SSH File Transfer Protocol connections
pub struct SftpClient {
    host: String,
    port: u16,
    user: String,
    password: SecretString,
    outdir: String,
    timeout: Duration,
    conn: Option<Connection>,
}

impl SftpClient {
    pub fn new(dest: &Destination, timeout: Duration) -> Self {
        SftpClient {
            host: dest.host.clone(),
            port: dest.port,
            user: dest.user.clone(),
            password: dest.password.clone(),
            outdir: dest.outdir.clone(),
            timeout,
            conn: None,
        }
    }

    /// Build full remote path from the output directory and a file name
    fn full_path(&self, name: &str) -> PathBuf {
        Path::new(&self.outdir).join(name)
    }

    fn sftp(&self) -> Result<&Sftp, TransportError> {
        match &self.conn {
            Some(conn) => Ok(&conn.sftp),
            None => Err(TransportError::NotOpen {
                host: self.host.clone(),
            }),
        }
    }

    fn connect_tcp(&self) -> Result<TcpStream, TransportError> {
        let addrs: Vec<std::net::SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::io("resolve", e))?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(TransportError::io(
            "connect",
            last_error.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found")
            }),
        ))
    }
}

impl Transport for SftpClient {
    fn open(&mut self) -> Result<(), TransportError> {
        info!(host = %self.host, port = self.port, "Connecting to SFTP host");
        let stream = self.connect_tcp()?;

        let mut session = Session::new().map_err(ssh_err("session"))?;
        session.set_tcp_stream(stream);
        session.handshake().map_err(ssh_err("handshake"))?;
        session
            .userauth_password(&self.user, self.password.expose_secret())
            .map_err(ssh_err("authentication"))?;
        info!(host = %self.host, "Connected to SFTP host");

        let sftp = session.sftp().map_err(ssh_err("channel"))?;
        sftp.stat(Path::new(&self.outdir))
            .map_err(ssh_err("change directory"))?;
        info!(host = %self.host, dir = %self.outdir, "Changed to SFTP server directory");

        // Only now that the channel is up does the timeout apply to reads.
        session.set_timeout(u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX));

        self.conn = Some(Connection { session, sftp });
        Ok(())
    }

    fn exists(&mut self, name: &str) -> Result<bool, TransportError> {
        let path = self.full_path(name);
        match self.sftp()?.stat(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => Ok(false),
            Err(e) => Err(TransportError::Ssh {
                operation: "stat",
                source: e,
            }),
        }
    }

    fn delete(&mut self, name: &str) -> Result<(), TransportError> {
        let path = self.full_path(name);
        self.sftp()?.unlink(&path).map_err(ssh_err("delete"))
    }

    fn store(&mut self, local: &Path, remote: &str) -> Result<(), TransportError> {
        let mut source =
            File::open(local).map_err(|e| TransportError::io("open local file", e))?;
        let path = self.full_path(remote);
        let mut target = self.sftp()?.create(&path).map_err(ssh_err("store"))?;
        std::io::copy(&mut source, &mut target).map_err(|e| TransportError::io("store", e))?;
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError> {
        let from_path = self.full_path(from);
        let to_path = self.full_path(to);
        self.sftp()?
            .rename(&from_path, &to_path, None)
            .map_err(ssh_err("rename"))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self.conn.take() {
            Some(conn) => {
                drop(conn.sftp);
                conn.session
                    .disconnect(None, "closing", None)
                    .map_err(ssh_err("disconnect"))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    #[test]
    fn test_sftp_client_send() {
        // Verify that SftpClient implements Send
        fn assert_send<T: Send>() {}
        assert_send::<SftpClient>();
    }

    #[test]
    fn test_full_path_joins_outdir() {
        let dest = Destination {
            label: "yms".to_string(),
            mode: Mode::Sftp,
            host: "127.0.0.1".to_string(),
            port: 22,
            user: "u".to_string(),
            password: SecretString::new("p".to_string()),
            outdir: "/incoming/tds".to_string(),
            customers: Vec::new(),
        };
        let client = SftpClient::new(&dest, Duration::from_secs(1));
        assert_eq!(
            client.full_path("a.dat"),
            PathBuf::from("/incoming/tds/a.dat")
        );
    }
}
