//! Remote document store client.
//!
//! [`RemoteStore`] is the seam the storage adapter talks through: connect,
//! then find/read/write/list/delete files by name inside one named folder.
//! [`DriveClient`] implements it against the Google Drive v3 REST surface
//! with a bearer token from [`crate::settings::Drive`]. Calls are sequential
//! with no retry, no backoff and no caching; every failure is reported to
//! the caller as a [`DriveError`] and handled at the adapter boundary.

use std::future::Future;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::settings;

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// A remote-call failure. Not-found is modelled as `Option::None` on the
/// read path, never as an error.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("remote store credentials are missing or placeholder values")]
    Credentials,

    #[error("remote store denied the request (http {0})")]
    Denied(u16),

    #[error("remote store unreachable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("unexpected response from the remote store: {0}")]
    Protocol(String),
}

/// Metadata for one file in the managed folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Operation surface of the remote store.
///
/// `connect` must be called once per session before any other operation;
/// everything else addresses files by exact name within the connected
/// folder.
pub trait RemoteStore {
    fn connect(&mut self) -> impl Future<Output = Result<(), DriveError>>;
    fn read_document(&self, name: &str)
    -> impl Future<Output = Result<Option<String>, DriveError>>;
    fn write_document(
        &self,
        name: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), DriveError>>;
    fn upload_raw(
        &self,
        name: &str,
        bytes: Vec<u8>,
        description: &str,
    ) -> impl Future<Output = Result<(), DriveError>>;
    fn list_files(&self) -> impl Future<Output = Result<Vec<RemoteFile>, DriveError>>;
    fn delete_file(&self, name: &str) -> impl Future<Output = Result<(), DriveError>>;
}

/// Google Drive v3 client scoped to one folder.
#[derive(Debug)]
pub struct DriveClient {
    http: reqwest::Client,
    api_key: String,
    access_token: String,
    folder_name: String,
    folder_id: Option<String>,
    credentials_missing: bool,
}

impl DriveClient {
    pub fn new(drive: &settings::Drive) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: drive.api_key.clone(),
            access_token: drive.access_token.clone(),
            folder_name: drive.folder_name.clone(),
            folder_id: None,
            credentials_missing: drive.credentials_missing(),
        }
    }

    fn folder_id(&self) -> Result<&str, DriveError> {
        self.folder_id
            .as_deref()
            .ok_or_else(|| DriveError::Protocol("folder not resolved; connect first".into()))
    }

    fn check_status(status: StatusCode) -> Result<(), DriveError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DriveError::Denied(status.as_u16()));
        }
        if !status.is_success() {
            return Err(DriveError::Protocol(format!("http {}", status.as_u16())));
        }
        Ok(())
    }

    async fn list_query(&self, query: &str, fields: &str) -> Result<FileList, DriveError> {
        let resp = self
            .http
            .get(format!("{API_BASE}/files"))
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("fields", fields), ("key", self.api_key.as_str())])
            .send()
            .await?;
        Self::check_status(resp.status())?;
        resp.json::<FileList>()
            .await
            .map_err(|e| DriveError::Protocol(e.to_string()))
    }

    /// Exact-name lookup within the connected folder.
    async fn find_file(&self, name: &str) -> Result<Option<RemoteFile>, DriveError> {
        let query = format!(
            "name='{}' and '{}' in parents and trashed=false",
            escape_query_value(name),
            self.folder_id()?,
        );
        let list = self.list_query(&query, "files(id, name)").await?;
        Ok(list.files.into_iter().next())
    }

    /// Creates an empty file entry in the folder and returns its id. The
    /// content goes up in a second, media-upload request.
    async fn create_file_entry(
        &self,
        name: &str,
        description: &str,
    ) -> Result<String, DriveError> {
        let mut metadata = json!({
            "name": name,
            "parents": [self.folder_id()?],
        });
        if !description.is_empty() {
            metadata["description"] = json!(description);
        }

        let resp = self
            .http
            .post(format!("{API_BASE}/files"))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id"), ("key", self.api_key.as_str())])
            .json(&metadata)
            .send()
            .await?;
        Self::check_status(resp.status())?;
        let created = resp
            .json::<CreatedFile>()
            .await
            .map_err(|e| DriveError::Protocol(e.to_string()))?;
        Ok(created.id)
    }

    async fn upload_media(
        &self,
        file_id: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), DriveError> {
        let resp = self
            .http
            .patch(format!("{UPLOAD_BASE}/files/{file_id}"))
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "media"), ("key", self.api_key.as_str())])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        Self::check_status(resp.status())
    }
}

impl RemoteStore for DriveClient {
    /// Identity probe, then find-or-create the named folder. Placeholder
    /// credentials short-circuit before any network call.
    async fn connect(&mut self) -> Result<(), DriveError> {
        if self.credentials_missing {
            return Err(DriveError::Credentials);
        }

        let resp = self
            .http
            .get(format!("{API_BASE}/about"))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "user"), ("key", self.api_key.as_str())])
            .send()
            .await?;
        Self::check_status(resp.status())?;

        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query_value(&self.folder_name),
            FOLDER_MIME,
        );
        let list = self.list_query(&query, "files(id, name)").await?;

        let folder_id = match list.files.into_iter().next() {
            Some(folder) => {
                log::info!("found existing folder '{}' ({})", self.folder_name, folder.id);
                folder.id
            }
            None => {
                let resp = self
                    .http
                    .post(format!("{API_BASE}/files"))
                    .bearer_auth(&self.access_token)
                    .query(&[("fields", "id"), ("key", self.api_key.as_str())])
                    .json(&json!({ "name": self.folder_name, "mimeType": FOLDER_MIME }))
                    .send()
                    .await?;
                Self::check_status(resp.status())?;
                let created = resp
                    .json::<CreatedFile>()
                    .await
                    .map_err(|e| DriveError::Protocol(e.to_string()))?;
                log::info!("created folder '{}' ({})", self.folder_name, created.id);
                created.id
            }
        };

        self.folder_id = Some(folder_id);
        Ok(())
    }

    async fn read_document(&self, name: &str) -> Result<Option<String>, DriveError> {
        let Some(file) = self.find_file(name).await? else {
            return Ok(None);
        };

        let resp = self
            .http
            .get(format!("{API_BASE}/files/{}", file.id))
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media"), ("key", self.api_key.as_str())])
            .send()
            .await?;
        Self::check_status(resp.status())?;
        Ok(Some(resp.text().await?))
    }

    /// Update in place when the file exists, otherwise create it. Last
    /// writer wins; there is no versioning or conflict detection.
    async fn write_document(&self, name: &str, body: &str) -> Result<(), DriveError> {
        let file_id = match self.find_file(name).await? {
            Some(file) => file.id,
            None => self.create_file_entry(name, "").await?,
        };
        self.upload_media(&file_id, "application/json", body.as_bytes().to_vec())
            .await
    }

    async fn upload_raw(
        &self,
        name: &str,
        bytes: Vec<u8>,
        description: &str,
    ) -> Result<(), DriveError> {
        let file_id = match self.find_file(name).await? {
            Some(file) => file.id,
            None => self.create_file_entry(name, description).await?,
        };
        self.upload_media(&file_id, "application/octet-stream", bytes)
            .await
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, DriveError> {
        let query = format!("'{}' in parents and trashed=false", self.folder_id()?);
        let resp = self
            .http
            .get(format!("{API_BASE}/files"))
            .bearer_auth(&self.access_token)
            .query(&[
                (
                    "fields",
                    "files(id, name, mimeType, createdTime, modifiedTime, size)",
                ),
                ("q", query.as_str()),
                ("orderBy", "modifiedTime desc"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        Self::check_status(resp.status())?;
        let list = resp
            .json::<FileList>()
            .await
            .map_err(|e| DriveError::Protocol(e.to_string()))?;
        Ok(list.files)
    }

    async fn delete_file(&self, name: &str) -> Result<(), DriveError> {
        let Some(file) = self.find_file(name).await? else {
            return Ok(());
        };

        let resp = self
            .http
            .delete(format!("{API_BASE}/files/{}", file.id))
            .bearer_auth(&self.access_token)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        Self::check_status(resp.status())
    }
}

/// Names are interpolated into search queries as single-quoted strings, so
/// embedded quotes must be escaped.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_escaping() {
        assert_eq!(escape_query_value("customers.json"), "customers.json");
        assert_eq!(escape_query_value("O'Reilly Report"), "O\\'Reilly Report");
        assert_eq!(escape_query_value("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_placeholder_credentials_are_detected_at_build() {
        let client = DriveClient::new(&crate::settings::Drive::default());
        assert!(client.credentials_missing);
        assert!(client.folder_id().is_err());
    }

    #[tokio::test]
    async fn test_connect_with_placeholders_fails_without_network() {
        let mut client = DriveClient::new(&crate::settings::Drive::default());
        match client.connect().await {
            Err(DriveError::Credentials) => {}
            other => panic!("expected Credentials error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_file_list_parsing() {
        let raw = r#"{"files": [{"id": "abc123", "name": "customers.json",
            "mimeType": "application/json", "modifiedTime": "2025-01-05T10:00:00Z"}]}"#;
        let list: FileList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].name, "customers.json");
        assert!(list.files[0].size.is_none());

        let empty: FileList = serde_json::from_str("{}").unwrap();
        assert!(empty.files.is_empty());
    }
}
