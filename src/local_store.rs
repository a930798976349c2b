//! Local fallback store: one JSON text file per logical document key under
//! the configured data directory. No expiry, no size limits, no writer
//! coordination; the workspace serializes all access.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("local store io failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Raw JSON text for a key, or `None` when the key was never written.
    pub fn read(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write(&self, key: &str, body: &str) -> Result<(), LocalStoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), body)?;
        Ok(())
    }
}
