//! Session-scoped store object.
//!
//! A [`Workspace`] owns the storage adapter plus the two in-memory
//! collections for the life of a server session, replacing the ambient
//! module-level arrays of earlier iterations. All mutation goes through
//! its methods: mutate the collection, then save through the adapter.
//! The web layer keeps one workspace behind an async mutex, so each user
//! action runs at most one load/save sequence to completion.

use chrono::Utc;
use thiserror::Error;

use crate::drive::{DriveError, RemoteFile, RemoteStore};
use crate::local_store::LocalStore;
use crate::records::{
    self, AssetCatalog, CustomerBook, CustomerRecord, DataAsset,
};
use crate::settings::Settings;
use crate::storage::{Document, Served, StorageAdapter, StorageError};

/// Persistence mode surfaced to the UI banner and `/api/status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageStatus {
    /// Remote session established; saves go to the remote folder with a
    /// local mirror.
    Connected,
    /// Everything routes to the local fallback store.
    LocalOnly { reason: String },
}

impl StorageStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, StorageStatus::Connected)
    }

    pub fn describe(&self) -> String {
        match self {
            StorageStatus::Connected => "connected to remote storage".to_string(),
            StorageStatus::LocalOnly { reason } => {
                format!("using local storage ({reason})")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("no customer with id {0}")]
    UnknownCustomer(i64),

    #[error("no data asset with id {0}")]
    UnknownAsset(i64),

    #[error("username is already in use")]
    DuplicateUsername,

    #[error("username must be 3-32 letters, digits or underscores")]
    InvalidUsername,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct Workspace<R: RemoteStore> {
    adapter: StorageAdapter<R>,
    pub customers: CustomerBook,
    pub assets: AssetCatalog,
    status: StorageStatus,
    folder_name: String,
}

impl<R: RemoteStore> Workspace<R> {
    /// Opens a session: initialize the adapter, load both documents, and
    /// seed demo data into empty collections when enabled (persisting the
    /// seed so the next load returns it unchanged).
    pub async fn open(settings: &Settings, remote: Option<R>) -> Self {
        let local = LocalStore::new(&settings.data_dir);
        let mut adapter = StorageAdapter::new(local, remote);

        let status = if !settings.drive.enabled {
            log::info!("remote store disabled by configuration, using local storage");
            StorageStatus::LocalOnly {
                reason: "remote store disabled".to_string(),
            }
        } else if !adapter.has_remote() {
            StorageStatus::LocalOnly {
                reason: "no remote store configured".to_string(),
            }
        } else {
            match adapter.initialize().await {
                Ok(()) => {
                    log::info!("remote storage session established");
                    StorageStatus::Connected
                }
                Err(e) => {
                    log::warn!("remote initialize failed: {e}; continuing in degraded mode");
                    StorageStatus::LocalOnly {
                        reason: e.to_string(),
                    }
                }
            }
        };

        let (mut customers, _) = adapter.load_document::<CustomerBook>(Document::Customers).await;
        let (mut assets, _) = adapter
            .load_document::<AssetCatalog>(Document::DashboardData)
            .await;

        if settings.demo_data {
            if customers.is_empty() {
                customers = records::demo_customers();
                log::info!("seeded {} demo customers", customers.len());
                if let Err(e) = adapter.save_document(Document::Customers, &customers).await {
                    log::warn!("could not persist seeded customers: {e}");
                }
            }
            if assets.is_empty() {
                assets = records::demo_assets();
                log::info!("seeded {} demo data assets", assets.len());
                if let Err(e) = adapter
                    .save_document(Document::DashboardData, &assets)
                    .await
                {
                    log::warn!("could not persist seeded data assets: {e}");
                }
            }
        }

        Self {
            adapter,
            customers,
            assets,
            status,
            folder_name: settings.drive.folder_name.clone(),
        }
    }

    pub fn status(&self) -> &StorageStatus {
        &self.status
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    async fn save_customers(&self) -> Result<Served, StorageError> {
        self.adapter
            .save_document(Document::Customers, &self.customers)
            .await
    }

    async fn save_assets(&self) -> Result<Served, StorageError> {
        self.adapter
            .save_document(Document::DashboardData, &self.assets)
            .await
    }

    /// Re-loads the customers document, the server-side analogue of the
    /// old 30-second polling refresh.
    pub async fn refresh_customers(&mut self) {
        let (customers, served) = self
            .adapter
            .load_document::<CustomerBook>(Document::Customers)
            .await;
        log::debug!("refreshed customers from {:?}", served);
        self.customers = customers;
    }

    pub async fn refresh_assets(&mut self) {
        let (assets, served) = self
            .adapter
            .load_document::<AssetCatalog>(Document::DashboardData)
            .await;
        log::debug!("refreshed data assets from {:?}", served);
        self.assets = assets;
    }

    /// Validates and adds a customer record, then persists the book.
    /// Usernames must be well-formed and unused; login resolves by first
    /// match, so a duplicate would shadow an existing account.
    pub async fn add_customer(&mut self, record: CustomerRecord) -> Result<i64, WorkspaceError> {
        if !records::valid_username(&record.username) {
            return Err(WorkspaceError::InvalidUsername);
        }
        if !record.email.is_empty() && !records::valid_email(&record.email) {
            return Err(WorkspaceError::InvalidEmail);
        }
        if self.customers.find_by_username(&record.username).is_some() {
            return Err(WorkspaceError::DuplicateUsername);
        }

        let id = self.customers.add(record);
        self.save_customers().await?;
        Ok(id)
    }

    /// Applies an admin edit to an existing record. A blank
    /// `password_hash` in `update` keeps the stored hash.
    pub async fn update_customer(
        &mut self,
        id: i64,
        mut update: CustomerRecord,
    ) -> Result<(), WorkspaceError> {
        if !update.email.is_empty() && !records::valid_email(&update.email) {
            return Err(WorkspaceError::InvalidEmail);
        }
        if let Some(other) = self.customers.find_by_username(&update.username) {
            if other.id != id {
                return Err(WorkspaceError::DuplicateUsername);
            }
        }

        let record = self
            .customers
            .find_mut(id)
            .ok_or(WorkspaceError::UnknownCustomer(id))?;

        update.id = record.id;
        update.created_at = record.created_at;
        update.last_login = record.last_login;
        if update.password_hash.is_empty() {
            update.password_hash = record.password_hash.clone();
        }
        update.updated_at = Some(Utc::now());
        *record = update;

        self.save_customers().await?;
        Ok(())
    }

    /// Removes exactly one customer record.
    pub async fn delete_customer(&mut self, id: i64) -> Result<CustomerRecord, WorkspaceError> {
        let removed = self
            .customers
            .remove(id)
            .ok_or(WorkspaceError::UnknownCustomer(id))?;
        self.save_customers().await?;
        Ok(removed)
    }

    /// Stamps a successful portal sign-in. Best-effort: a save failure is
    /// logged but never blocks the login.
    pub async fn record_login(&mut self, id: i64) {
        if let Some(record) = self.customers.find_mut(id) {
            record.last_login = Some(Utc::now());
            if let Err(e) = self.save_customers().await {
                log::warn!("could not persist last_login for customer {id}: {e}");
            }
        }
    }

    /// Registers an uploaded asset. When raw file bytes accompany the
    /// metadata and the remote session is ready, the file itself is
    /// forwarded to the remote folder; only metadata enters the document.
    pub async fn upload_asset(
        &mut self,
        mut asset: DataAsset,
        raw: Option<Vec<u8>>,
    ) -> Result<i64, WorkspaceError> {
        // Tolerate stale assignment sets but drop ids that no longer exist.
        asset
            .assigned_customers
            .retain(|id| self.customers.contains(*id));

        let name = asset.name.clone();
        let description = asset.description.clone();
        let id = self.assets.add(asset);
        self.save_assets().await?;

        if let Some(bytes) = raw {
            if let Some(remote) = self.adapter.remote() {
                if let Err(e) = remote.upload_raw(&name, bytes, &description).await {
                    log::warn!("raw upload of '{name}' failed: {e}; metadata was kept");
                }
            } else {
                log::info!("remote store not ready, skipped raw upload of '{name}'");
            }
        }

        Ok(id)
    }

    pub async fn delete_asset(&mut self, id: i64) -> Result<DataAsset, WorkspaceError> {
        let removed = self
            .assets
            .remove(id)
            .ok_or(WorkspaceError::UnknownAsset(id))?;
        self.save_assets().await?;
        Ok(removed)
    }

    /// Assigns a customer to an asset. Unknown customer ids are rejected
    /// here; dangling ids already in a loaded document are tolerated and
    /// simply never match a signed-in customer.
    pub async fn assign_asset(
        &mut self,
        asset_id: i64,
        customer_id: i64,
    ) -> Result<(), WorkspaceError> {
        if !self.customers.contains(customer_id) {
            return Err(WorkspaceError::UnknownCustomer(customer_id));
        }
        if !self.assets.contains(asset_id) {
            return Err(WorkspaceError::UnknownAsset(asset_id));
        }
        self.assets.assign(asset_id, customer_id);
        self.save_assets().await?;
        Ok(())
    }

    pub async fn unassign_asset(
        &mut self,
        asset_id: i64,
        customer_id: i64,
    ) -> Result<(), WorkspaceError> {
        if !self.assets.contains(asset_id) {
            return Err(WorkspaceError::UnknownAsset(asset_id));
        }
        self.assets.unassign(asset_id, customer_id);
        self.save_assets().await?;
        Ok(())
    }

    /// Listing of the remote folder for the admin data section; empty in
    /// degraded mode.
    pub async fn remote_files(&self) -> Vec<RemoteFile> {
        match self.adapter.remote() {
            Some(remote) => match remote.list_files().await {
                Ok(files) => files,
                Err(e) => {
                    log::warn!("remote listing failed: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }

    pub async fn delete_remote_file(&self, name: &str) -> Result<(), DriveError> {
        match self.adapter.remote() {
            Some(remote) => remote.delete_file(name).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRemote;
    use crate::records::{AssetFormat, CustomerStatus, DataCategory, Plan};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn test_settings(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.data_dir = dir.to_string_lossy().into_owned();
        settings
    }

    fn new_customer(name: &str, username: &str) -> CustomerRecord {
        CustomerRecord {
            id: 0,
            name: name.to_string(),
            contact: String::new(),
            title: String::new(),
            email: format!("{username}@example.com"),
            phone: String::new(),
            company: name.to_string(),
            plan: Plan::Starter,
            industry: "Testing".to_string(),
            username: username.to_string(),
            password_hash: String::new(),
            status: CustomerStatus::Active,
            notes: String::new(),
            last_login: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn new_asset(name: &str) -> DataAsset {
        DataAsset {
            id: 0,
            name: name.to_string(),
            category: DataCategory::Sales,
            format: AssetFormat::Csv,
            description: String::new(),
            assigned_customers: BTreeSet::new(),
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_degraded_open_seeds_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let remote = MemoryRemote::new();
        remote.fail_connect(true);

        let ws = Workspace::open(&settings, Some(remote.clone())).await;
        assert!(!ws.status().is_connected());
        assert_eq!(ws.customers.len(), 3);
        assert_eq!(ws.assets.len(), 2);
        drop(ws);

        // Second degraded open returns the persisted seed unchanged.
        let ws = Workspace::open(&settings, Some(remote)).await;
        assert_eq!(ws.customers.len(), 3);
        assert!(ws.customers.find_by_username("localbiz_user").is_some());
        assert_eq!(ws.assets.len(), 2);
    }

    #[tokio::test]
    async fn test_connected_open_saves_seed_remotely() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let remote = MemoryRemote::new();

        let ws = Workspace::open(&settings, Some(remote.clone())).await;
        assert!(ws.status().is_connected());
        assert_eq!(
            remote.file_names(),
            vec!["customers.json", "dashboard-data.json"],
        );
    }

    #[tokio::test]
    async fn test_demo_data_disabled_stays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = test_settings(dir.path());
        settings.demo_data = false;

        let ws = Workspace::open(&settings, Some(MemoryRemote::new())).await;
        assert!(ws.customers.is_empty());
        assert!(ws.assets.is_empty());
    }

    #[tokio::test]
    async fn test_customer_crud_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = test_settings(dir.path());
        settings.demo_data = false;
        let remote = MemoryRemote::new();
        let mut ws = Workspace::open(&settings, Some(remote)).await;

        let id = ws
            .add_customer(new_customer("Globex", "globex_user"))
            .await
            .unwrap();
        assert!(ws.customers.contains(id));

        assert!(matches!(
            ws.add_customer(new_customer("Shadow", "globex_user")).await,
            Err(WorkspaceError::DuplicateUsername),
        ));
        assert!(matches!(
            ws.add_customer(new_customer("Bad", "x")).await,
            Err(WorkspaceError::InvalidUsername),
        ));

        let mut edit = new_customer("Globex LLC", "globex_user");
        edit.notes = "renamed".to_string();
        ws.update_customer(id, edit).await.unwrap();
        let record = ws.customers.find(id).unwrap();
        assert_eq!(record.name, "Globex LLC");
        assert!(record.updated_at.is_some());

        let removed = ws.delete_customer(id).await.unwrap();
        assert_eq!(removed.id, id);
        assert!(ws.customers.is_empty());
        assert!(matches!(
            ws.delete_customer(id).await,
            Err(WorkspaceError::UnknownCustomer(_)),
        ));
    }

    #[tokio::test]
    async fn test_blank_password_keeps_old_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = test_settings(dir.path());
        settings.demo_data = false;
        let mut ws = Workspace::open(&settings, Some(MemoryRemote::new())).await;

        let mut record = new_customer("Acme", "acme_user");
        record.password_hash = "$argon2id$stub".to_string();
        let id = ws.add_customer(record).await.unwrap();

        let edit = new_customer("Acme", "acme_user");
        ws.update_customer(id, edit).await.unwrap();
        assert_eq!(ws.customers.find(id).unwrap().password_hash, "$argon2id$stub");
    }

    #[tokio::test]
    async fn test_assignment_enforces_known_customers() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = test_settings(dir.path());
        settings.demo_data = false;
        let mut ws = Workspace::open(&settings, Some(MemoryRemote::new())).await;

        let customer_id = ws
            .add_customer(new_customer("Acme", "acme_user"))
            .await
            .unwrap();
        let asset_id = ws.upload_asset(new_asset("Q1 Report"), None).await.unwrap();

        ws.assign_asset(asset_id, customer_id).await.unwrap();
        assert!(ws.assets.find(asset_id).unwrap().is_assigned_to(customer_id));

        assert!(matches!(
            ws.assign_asset(asset_id, 99_999).await,
            Err(WorkspaceError::UnknownCustomer(_)),
        ));
        assert!(matches!(
            ws.assign_asset(99_999, customer_id).await,
            Err(WorkspaceError::UnknownAsset(_)),
        ));

        ws.unassign_asset(asset_id, customer_id).await.unwrap();
        assert!(!ws.assets.find(asset_id).unwrap().is_assigned_to(customer_id));
    }

    #[tokio::test]
    async fn test_upload_drops_dangling_assignments_and_forwards_raw() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = test_settings(dir.path());
        settings.demo_data = false;
        let remote = MemoryRemote::new();
        let mut ws = Workspace::open(&settings, Some(remote.clone())).await;

        let customer_id = ws
            .add_customer(new_customer("Acme", "acme_user"))
            .await
            .unwrap();

        let mut asset = new_asset("traffic.csv");
        asset.assigned_customers = BTreeSet::from([customer_id, 424242]);
        let asset_id = ws
            .upload_asset(asset, Some(b"date,views\n".to_vec()))
            .await
            .unwrap();

        let stored = ws.assets.find(asset_id).unwrap();
        assert_eq!(stored.assigned_customers, BTreeSet::from([customer_id]));
        assert!(remote.file_names().contains(&"traffic.csv".to_string()));
    }

    #[tokio::test]
    async fn test_record_login_survives_save_failure() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let remote = MemoryRemote::new();
        let mut ws = Workspace::open(&settings, Some(remote.clone())).await;

        remote.fail_ops(true);
        ws.record_login(1).await;
        assert!(ws.customers.find(1).unwrap().last_login.is_some());
    }
}
