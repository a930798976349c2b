//! Storage adapter: a uniform load/save contract over the remote document
//! store, degrading transparently to the local fallback.
//!
//! `initialize` establishes the remote session once per workspace; when it
//! fails the adapter stays in degraded mode for the rest of the session
//! (no automatic reconnect). Per-operation remote failures fall back for
//! that operation only. No failure propagates past this boundary except
//! [`InitError`] from `initialize`; everything else is logged and served
//! from whichever tier still works, reported in the [`Served`] result.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::drive::{DriveError, RemoteStore};
use crate::local_store::{LocalStore, LocalStoreError};

/// The two logical documents this application persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Customers,
    DashboardData,
}

impl Document {
    /// Key in the local fallback store.
    pub fn key(&self) -> &'static str {
        match self {
            Document::Customers => "customers",
            Document::DashboardData => "dashboardData",
        }
    }

    /// File name in the remote folder.
    pub fn file_name(&self) -> &'static str {
        match self {
            Document::Customers => "customers.json",
            Document::DashboardData => "dashboard-data.json",
        }
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Why the remote session could not be established.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("remote store credentials are missing")]
    CredentialsMissing,

    #[error("remote store authentication failed")]
    AuthFailed,

    #[error("remote store unavailable: {0}")]
    ApiUnavailable(String),
}

impl From<DriveError> for InitError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Credentials => InitError::CredentialsMissing,
            DriveError::Denied(_) => InitError::AuthFailed,
            other => InitError::ApiUnavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not serialize {0}")]
    Serialize(Document),

    #[error("saving {0} failed on every tier: {1}")]
    SaveFailed(Document, LocalStoreError),
}

/// Which tier actually served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Remote,
    Local,
}

pub struct StorageAdapter<R: RemoteStore> {
    remote: Option<R>,
    local: LocalStore,
    ready: bool,
}

impl<R: RemoteStore> StorageAdapter<R> {
    pub fn new(local: LocalStore, remote: Option<R>) -> Self {
        Self {
            remote,
            local,
            ready: false,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// True once `initialize` has succeeded; false means degraded mode.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn remote(&self) -> Option<&R> {
        if self.ready { self.remote.as_ref() } else { None }
    }

    /// Establishes the remote session. Callers must catch the error and
    /// proceed in degraded mode; the adapter never retries on its own.
    pub async fn initialize(&mut self) -> Result<(), InitError> {
        let Some(remote) = self.remote.as_mut() else {
            return Err(InitError::CredentialsMissing);
        };
        remote.connect().await.map_err(InitError::from)?;
        self.ready = true;
        Ok(())
    }

    /// Loads a document, preferring the remote tier. A missing document is
    /// an empty collection, not an error. A successful remote read is
    /// mirrored into the local store so local state never goes stale
    /// relative to the last successful operation.
    pub async fn load_document<T>(&self, doc: Document) -> (T, Served)
    where
        T: DeserializeOwned + Default,
    {
        if let Some(remote) = self.remote() {
            match remote.read_document(doc.file_name()).await {
                Ok(Some(body)) => match serde_json::from_str::<T>(&body) {
                    Ok(value) => {
                        if let Err(e) = self.local.write(doc.key(), &body) {
                            log::warn!("mirror write of {doc} failed: {e}");
                        }
                        return (value, Served::Remote);
                    }
                    Err(e) => {
                        log::warn!("remote {doc} is malformed ({e}), falling back to local");
                    }
                },
                Ok(None) => {
                    log::info!("no {doc} document in the remote folder, starting empty");
                    return (T::default(), Served::Remote);
                }
                Err(e) => {
                    log::warn!("remote load of {doc} failed ({e}), falling back to local");
                }
            }
        }

        (self.load_local(doc), Served::Local)
    }

    fn load_local<T>(&self, doc: Document) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.local.read(doc.key()) {
            Ok(Some(body)) => serde_json::from_str(&body).unwrap_or_else(|e| {
                log::warn!("local {doc} is malformed ({e}), starting empty");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(e) => {
                log::warn!("local read of {doc} failed ({e}), starting empty");
                T::default()
            }
        }
    }

    /// Saves a document. The local write always happens first; the remote
    /// upsert follows when the session is ready. A remote failure is
    /// logged and reported as `Served::Local`; the error surfaces only
    /// when even the local write fails.
    pub async fn save_document<T>(&self, doc: Document, value: &T) -> Result<Served, StorageError>
    where
        T: Serialize,
    {
        let body = serde_json::to_string_pretty(value)
            .map_err(|_| StorageError::Serialize(doc))?;

        let local_result = self.local.write(doc.key(), &body);
        if let Err(e) = &local_result {
            log::error!("local write of {doc} failed: {e}");
        }

        if let Some(remote) = self.remote() {
            match remote.write_document(doc.file_name(), &body).await {
                Ok(()) => return Ok(Served::Remote),
                Err(e) => {
                    log::warn!("remote save of {doc} failed ({e}), kept local copy");
                }
            }
        }

        match local_result {
            Ok(()) => Ok(Served::Local),
            Err(e) => Err(StorageError::SaveFailed(doc, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRemote;
    use crate::records::{AssetCatalog, CustomerBook, demo_assets, demo_customers};

    fn adapter_with_remote(
        dir: &std::path::Path,
    ) -> (StorageAdapter<MemoryRemote>, MemoryRemote) {
        let remote = MemoryRemote::new();
        let adapter = StorageAdapter::new(LocalStore::new(dir), Some(remote.clone()));
        (adapter, remote)
    }

    #[tokio::test]
    async fn test_remote_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut adapter, _remote) = adapter_with_remote(dir.path());
        adapter.initialize().await.unwrap();

        let book = demo_customers();
        let served = adapter
            .save_document(Document::Customers, &book)
            .await
            .unwrap();
        assert_eq!(served, Served::Remote);

        let (loaded, served) = adapter
            .load_document::<CustomerBook>(Document::Customers)
            .await;
        assert_eq!(served, Served::Remote);
        assert_eq!(loaded.len(), book.len());
        assert!(loaded.find_by_username("acme_user").is_some());
    }

    #[tokio::test]
    async fn test_missing_document_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut adapter, _remote) = adapter_with_remote(dir.path());
        adapter.initialize().await.unwrap();

        let (loaded, served) = adapter
            .load_document::<AssetCatalog>(Document::DashboardData)
            .await;
        assert_eq!(served, Served::Remote);
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_failed_initialize_routes_everything_local() {
        let dir = tempfile::tempdir().unwrap();
        let (mut adapter, remote) = adapter_with_remote(dir.path());
        remote.fail_connect(true);

        assert!(adapter.initialize().await.is_err());
        assert!(!adapter.is_ready());

        let catalog = demo_assets();
        let served = adapter
            .save_document(Document::DashboardData, &catalog)
            .await
            .unwrap();
        assert_eq!(served, Served::Local);
        assert!(remote.file_names().is_empty());

        let (loaded, served) = adapter
            .load_document::<AssetCatalog>(Document::DashboardData)
            .await;
        assert_eq!(served, Served::Local);
        assert_eq!(loaded.len(), catalog.len());
    }

    #[tokio::test]
    async fn test_per_operation_fallback_keeps_local_current() {
        let dir = tempfile::tempdir().unwrap();
        let (mut adapter, remote) = adapter_with_remote(dir.path());
        adapter.initialize().await.unwrap();

        let book = demo_customers();
        adapter
            .save_document(Document::Customers, &book)
            .await
            .unwrap();

        // Session drops after a successful connect: reads now come from the
        // local mirror written by the earlier remote save.
        remote.fail_ops(true);
        let (loaded, served) = adapter
            .load_document::<CustomerBook>(Document::Customers)
            .await;
        assert_eq!(served, Served::Local);
        assert_eq!(loaded.len(), 3);

        let served = adapter
            .save_document(Document::Customers, &loaded)
            .await
            .unwrap();
        assert_eq!(served, Served::Local);
    }

    #[tokio::test]
    async fn test_remote_load_mirrors_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let (mut adapter, remote) = adapter_with_remote(dir.path());
        adapter.initialize().await.unwrap();

        // Document exists only remotely.
        let body = serde_json::to_string(&demo_customers()).unwrap();
        remote.write_document("customers.json", &body).await.unwrap();

        let (_, served) = adapter
            .load_document::<CustomerBook>(Document::Customers)
            .await;
        assert_eq!(served, Served::Remote);

        let mirrored = LocalStore::new(dir.path()).read("customers").unwrap();
        assert!(mirrored.is_some());
    }

    #[tokio::test]
    async fn test_malformed_documents_fall_back_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let (mut adapter, remote) = adapter_with_remote(dir.path());
        adapter.initialize().await.unwrap();

        remote
            .write_document("customers.json", "{not json")
            .await
            .unwrap();
        LocalStore::new(dir.path())
            .write("customers", "also not json")
            .unwrap();

        let (loaded, served) = adapter
            .load_document::<CustomerBook>(Document::Customers)
            .await;
        assert_eq!(served, Served::Local);
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_no_remote_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut adapter: StorageAdapter<MemoryRemote> =
            StorageAdapter::new(LocalStore::new(dir.path()), None);

        assert!(matches!(
            adapter.initialize().await,
            Err(InitError::CredentialsMissing),
        ));

        let (loaded, served) = adapter
            .load_document::<CustomerBook>(Document::Customers)
            .await;
        assert_eq!(served, Served::Local);
        assert!(loaded.is_empty());
    }
}
