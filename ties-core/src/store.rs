//! Byte-level store backends.
//!
//! The repository and migrator only ever see whole documents as bytes; a
//! backend decides where those bytes live.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Errors from store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store does not exist")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Whole-document byte storage.
pub trait StoreBackend {
    /// Read the full document. Returns [`StoreError::NotFound`] if nothing has
    /// been written yet.
    fn read(&self) -> Result<Vec<u8>, StoreError>;

    /// Replace the full document.
    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Human readable location, used in log lines and status messages.
    fn describe(&self) -> String;
}

/// A JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreBackend for FileStore {
    fn read(&self) -> Result<Vec<u8>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        fs::write(&self.path, bytes)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store for tests.
///
/// Clones share the same contents, so a test can keep a handle and inspect
/// what the repository wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Rc<RefCell<Option<Vec<u8>>>>,
    writes: Rc<Cell<usize>>,
    fail_writes: Rc<Cell<bool>>,
}

impl MemoryStore {
    /// An empty store that reports not-found on read.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `bytes`.
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        let store = Self::default();
        *store.contents.borrow_mut() = Some(bytes.into());
        store
    }

    /// Current contents, if anything was written.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.contents.borrow().clone()
    }

    /// Current contents parsed as JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.contents()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Make subsequent writes fail with an IO error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl StoreBackend for MemoryStore {
    fn read(&self) -> Result<Vec<u8>, StoreError> {
        self.contents.borrow().clone().ok_or(StoreError::NotFound)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "write refused",
            )));
        }
        *self.contents.borrow_mut() = Some(bytes.to_vec());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
