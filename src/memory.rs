//! In-memory [`RemoteStore`] for tests and offline demos.
//!
//! Behaves like a connected folder of named files and supports injecting
//! connect-time or per-operation failures to exercise the adapter's
//! fallback paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::drive::{DriveError, RemoteFile, RemoteStore};

#[derive(Clone, Debug, Default)]
pub struct MemoryRemote {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_connect: Arc<AtomicBool>,
    fail_ops: Arc<AtomicBool>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `connect` call fail, simulating an unreachable or
    /// misconfigured remote store.
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Makes every file operation fail, simulating a session that drops
    /// after a successful connect.
    pub fn fail_ops(&self, fail: bool) {
        self.fail_ops.store(fail, Ordering::SeqCst);
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    fn check_ops(&self) -> Result<(), DriveError> {
        if self.fail_ops.load(Ordering::SeqCst) {
            return Err(DriveError::Protocol("injected operation failure".into()));
        }
        Ok(())
    }
}

impl RemoteStore for MemoryRemote {
    async fn connect(&mut self) -> Result<(), DriveError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(DriveError::Protocol("injected connect failure".into()));
        }
        Ok(())
    }

    async fn read_document(&self, name: &str) -> Result<Option<String>, DriveError> {
        self.check_ops()?;
        let files = self.files.lock().unwrap();
        match files.get(name) {
            Some(bytes) => Ok(Some(
                String::from_utf8(bytes.clone())
                    .map_err(|e| DriveError::Protocol(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn write_document(&self, name: &str, body: &str) -> Result<(), DriveError> {
        self.check_ops()?;
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), body.as_bytes().to_vec());
        Ok(())
    }

    async fn upload_raw(
        &self,
        name: &str,
        bytes: Vec<u8>,
        _description: &str,
    ) -> Result<(), DriveError> {
        self.check_ops()?;
        self.files.lock().unwrap().insert(name.to_string(), bytes);
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, DriveError> {
        self.check_ops()?;
        let files = self.files.lock().unwrap();
        let mut listing: Vec<RemoteFile> = files
            .iter()
            .map(|(name, bytes)| RemoteFile {
                id: name.clone(),
                name: name.clone(),
                mime_type: String::new(),
                created_time: None,
                modified_time: None,
                size: Some(bytes.len().to_string()),
            })
            .collect();
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn delete_file(&self, name: &str) -> Result<(), DriveError> {
        self.check_ops()?;
        self.files.lock().unwrap().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_delete() {
        let mut remote = MemoryRemote::new();
        remote.connect().await.unwrap();

        assert!(remote.read_document("customers.json").await.unwrap().is_none());

        remote.write_document("customers.json", "[]").await.unwrap();
        assert_eq!(
            remote.read_document("customers.json").await.unwrap().as_deref(),
            Some("[]"),
        );
        assert_eq!(remote.file_names(), vec!["customers.json"]);

        remote.delete_file("customers.json").await.unwrap();
        assert!(remote.read_document("customers.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mut remote = MemoryRemote::new();
        remote.fail_connect(true);
        assert!(remote.connect().await.is_err());

        remote.fail_connect(false);
        remote.connect().await.unwrap();

        remote.fail_ops(true);
        assert!(remote.write_document("x", "y").await.is_err());
        assert!(remote.read_document("x").await.is_err());

        remote.fail_ops(false);
        remote.write_document("x", "y").await.unwrap();
    }

    #[tokio::test]
    async fn test_listing_reports_sizes() {
        let remote = MemoryRemote::new();
        remote.upload_raw("report.csv", b"a,b\n1,2\n".to_vec(), "raw upload")
            .await
            .unwrap();

        let listing = remote.list_files().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "report.csv");
        assert_eq!(listing[0].size.as_deref(), Some("8"));
    }
}
