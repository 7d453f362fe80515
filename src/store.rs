//! Persistence boundary for the settings blob.
//!
//! The registry only ever hands a store one opaque blob: the serialized
//! [`Settings`](crate::types::Settings) document.

use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("settings store rejected the write: {0}")]
    Rejected(String),
}

pub trait SettingsStore: Send + Sync {
    /// Returns `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<Vec<u8>>>;
    fn write(&self, blob: &[u8]) -> Result<()>;
}

impl<S: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<S> {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        (**self).read()
    }

    fn write(&self, blob: &[u8]) -> Result<()> {
        (**self).write(blob)
    }
}

/// Stores the blob as a single JSON file, replaced atomically on every write.
#[derive(Debug)]
pub struct FileStore {
    file_path: PathBuf,
}

impl FileStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn io_error(&self, source: io::Error) -> Error {
        Error::Io {
            path: self.file_path.clone(),
            source,
        }
    }
}

impl SettingsStore for FileStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.file_path) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn write(&self, blob: &[u8]) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let tmp_path = self.file_path.with_extension("json.tmp");
        fs::write(&tmp_path, blob).map_err(|err| self.io_error(err))?;
        fs::rename(&tmp_path, &self.file_path).map_err(|err| self.io_error(err))
    }
}

/// In-process store. Writes can be made to fail to exercise rollback paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.blob.lock().clone()
    }
}

impl SettingsStore for MemoryStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.blob.lock().clone())
    }

    fn write(&self, blob: &[u8]) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(Error::Rejected("writes are disabled".to_string()));
        }
        *self.blob.lock() = Some(blob.to_vec());
        Ok(())
    }
}
