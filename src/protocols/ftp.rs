//! Plain FTP client implementation
//!
//! This module provides the `FtpClient` which implements the `Transport`
//! trait for standard (unencrypted) FTP connections in passive mode.

use secrecy::{ExposeSecret, SecretString};
use std::fs::File;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::time::Duration;
use suppaftp::types::{FileType, Mode};
use suppaftp::FtpStream;
use tracing::info;

use crate::config::Destination;
use crate::error::TransportError;
use crate::protocols::{listed_name, Transport};

fn ftp_err(operation: &'static str) -> impl FnOnce(suppaftp::FtpError) -> TransportError {
    move |source| TransportError::Ftp { operation, source }
}

/// FTP client for plain (unencrypted) FTP connections
pub struct FtpClient {
    host: String,
    port: u16,
    user: String,
    password: SecretString,
    outdir: String,
    timeout: Duration,
    stream: Option<FtpStream>,
}

impl FtpClient {
    pub fn new(dest: &Destination, timeout: Duration) -> Self {
        FtpClient {
            host: dest.host.clone(),
            port: dest.port,
            user: dest.user.clone(),
            password: dest.password.clone(),
            outdir: dest.outdir.clone(),
            timeout,
            stream: None,
        }
    }

    fn stream(&mut self) -> Result<&mut FtpStream, TransportError> {
        match self.stream.as_mut() {
            Some(stream) => Ok(stream),
            None => Err(TransportError::NotOpen {
                host: self.host.clone(),
            }),
        }
    }

    fn connect(&self) -> Result<FtpStream, TransportError> {
        // Resolve host to all possible addresses
        let addrs: Vec<std::net::SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::io("resolve", e))?
            .collect();

        // Try each address until one succeeds
        let mut last_error = None;
        for addr in addrs {
            match FtpStream::connect_timeout(addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(source) => TransportError::Ftp {
                operation: "connect",
                source,
            },
            None => TransportError::io(
                "resolve",
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
            ),
        })
    }
}

impl Transport for FtpClient {
    fn open(&mut self) -> Result<(), TransportError> {
        info!(host = %self.host, port = self.port, "Connecting to FTP host");
        let mut stream = self.connect()?;

        stream
            .login(self.user.as_str(), self.password.expose_secret().as_str())
            .map_err(ftp_err("login"))?;
        info!(host = %self.host, "Connected to FTP host");

        stream.set_mode(Mode::Passive);
        stream.cwd(&self.outdir).map_err(ftp_err("cwd"))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(ftp_err("binary mode"))?;
        info!(host = %self.host, dir = %self.outdir, "Changed to FTP server directory");

        stream
            .get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| TransportError::io("set read timeout", e))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn exists(&mut self, name: &str) -> Result<bool, TransportError> {
        let entries = self.stream()?.nlst(None).map_err(ftp_err("nlst"))?;
        Ok(entries.iter().any(|entry| listed_name(entry) == name))
    }

    fn delete(&mut self, name: &str) -> Result<(), TransportError> {
        self.stream()?.rm(name).map_err(ftp_err("delete"))
    }

    fn store(&mut self, local: &Path, remote: &str) -> Result<(), TransportError> {
        let mut file = File::open(local).map_err(|e| TransportError::io("open local file", e))?;
        self.stream()?
            .put_file(remote, &mut file)
            .map_err(ftp_err("store"))?;
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError> {
        self.stream()?.rename(from, to).map_err(ftp_err("rename"))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.take() {
            Some(mut stream) => stream.quit().map_err(ftp_err("quit")),
            None => Ok(()),
        }
    }
}
