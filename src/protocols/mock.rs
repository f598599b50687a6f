//! In-memory transport for tests
//!
//! The remote side is shared through `Rc<RefCell<..>>` so a test keeps a
//! handle to inspect it after the runner has dropped its boxed transport.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::Destination;
use crate::error::{RelayError, TransportError};
use crate::protocols::{Transport, TransportFactory};

/// Scripted remote namespace plus a call log
#[derive(Debug, Default)]
pub struct MockRemote {
    pub entries: BTreeSet<String>,
    pub calls: Vec<String>,
    /// Local path handed to each `store`, and whether it existed then
    pub stored: Vec<(PathBuf, bool)>,
    pub fail_open: bool,
    pub fail_store: bool,
    pub fail_rename: bool,
    pub fail_close: bool,
    /// Checking the key makes the value appear, as if another writer raced us
    pub appear_on_check: HashMap<String, String>,
}

impl MockRemote {
    pub fn with_entries(entries: &[&str]) -> Rc<RefCell<MockRemote>> {
        Rc::new(RefCell::new(MockRemote {
            entries: entries.iter().map(|e| e.to_string()).collect(),
            ..MockRemote::default()
        }))
    }
}

fn injected(operation: &'static str) -> TransportError {
    TransportError::io(operation, io::Error::other("injected failure"))
}

pub struct MockTransport {
    remote: Rc<RefCell<MockRemote>>,
}

impl MockTransport {
    pub fn new(remote: Rc<RefCell<MockRemote>>) -> Self {
        MockTransport { remote }
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        let mut remote = self.remote.borrow_mut();
        remote.calls.push("open".to_string());
        if remote.fail_open {
            return Err(injected("open"));
        }
        Ok(())
    }

    fn exists(&mut self, name: &str) -> Result<bool, TransportError> {
        let mut remote = self.remote.borrow_mut();
        remote.calls.push(format!("exists {}", name));
        let present = remote.entries.contains(name);
        if let Some(other) = remote.appear_on_check.remove(name) {
            remote.entries.insert(other);
        }
        Ok(present)
    }

    fn delete(&mut self, name: &str) -> Result<(), TransportError> {
        let mut remote = self.remote.borrow_mut();
        remote.calls.push(format!("delete {}", name));
        remote.entries.remove(name);
        Ok(())
    }

    fn store(&mut self, local: &Path, name: &str) -> Result<(), TransportError> {
        let mut remote = self.remote.borrow_mut();
        remote.calls.push(format!("store {}", name));
        let present = local.exists();
        remote.stored.push((local.to_path_buf(), present));
        if !present {
            // Same as FtpClient/SftpClient, which open the file first
            return Err(TransportError::io(
                "open local file",
                io::Error::new(io::ErrorKind::NotFound, local.display().to_string()),
            ));
        }
        if remote.fail_store {
            return Err(injected("store"));
        }
        remote.entries.insert(name.to_string());
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError> {
        let mut remote = self.remote.borrow_mut();
        remote.calls.push(format!("rename {} {}", from, to));
        if remote.fail_rename {
            return Err(injected("rename"));
        }
        remote.entries.remove(from);
        remote.entries.insert(to.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut remote = self.remote.borrow_mut();
        remote.calls.push("close".to_string());
        if remote.fail_close {
            return Err(injected("close"));
        }
        Ok(())
    }
}

/// Hands out a `MockTransport` per destination label
#[derive(Default)]
pub struct MockFactory {
    pub remotes: HashMap<String, Rc<RefCell<MockRemote>>>,
}

impl MockFactory {
    pub fn with(mut self, label: &str, remote: Rc<RefCell<MockRemote>>) -> Self {
        self.remotes.insert(label.to_string(), remote);
        self
    }
}

impl TransportFactory for MockFactory {
    fn create(&self, dest: &Destination) -> Result<Box<dyn Transport>, RelayError> {
        let remote = self
            .remotes
            .get(&dest.label)
            .cloned()
            .unwrap_or_else(|| MockRemote::with_entries(&[]));
        Ok(Box::new(MockTransport::new(remote)))
    }
}
