//! Document library (folder and file) operations
//!
//! Files and folders are addressed by server-relative URL, e.g.
//! `/sites/qa/Shared Documents/JOB-2025-001`.

use std::sync::Arc;

use serde_json::{json, Value};
use siteqa_domain::{Result, SiteQaError};
use tracing::debug;

use super::classify;
use super::client::SharePointClient;

/// File and folder operations on one site's document libraries.
#[derive(Clone)]
pub struct DocumentLibraryService {
    client: Arc<SharePointClient>,
}

impl DocumentLibraryService {
    pub fn new(client: Arc<SharePointClient>) -> Self {
        Self { client }
    }

    /// Upload a file into a folder, returning the file's metadata.
    pub async fn upload_file(
        &self,
        folder_path: &str,
        file_name: &str,
        content: Vec<u8>,
        overwrite: bool,
    ) -> Result<Value> {
        let endpoint = format!(
            "{}/Files/add(url='{}',overwrite={})",
            folder_endpoint(folder_path),
            escape_path(file_name),
            overwrite
        );
        debug!(folder_path, file_name, bytes = content.len(), "uploading document");
        self.client.upload(&endpoint, content).await
    }

    /// Download a file's content.
    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>> {
        let endpoint = format!("{}/$value", file_endpoint(file_path));
        debug!(file_path, "downloading document");
        let response = self.client.download(&endpoint).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| SiteQaError::from(classify::classify_transport(&err)))?;
        Ok(bytes.to_vec())
    }

    /// Fetch the list item fields behind a file.
    pub async fn file_metadata(&self, file_path: &str) -> Result<Value> {
        let endpoint = format!("{}/ListItemAllFields", file_endpoint(file_path));
        self.client.get(&endpoint, None).await
    }

    /// Merge fields into the list item behind a file. The payload must
    /// carry the `__metadata.type` of the library's item type.
    pub async fn update_file_metadata(&self, file_path: &str, fields: &Value) -> Result<()> {
        let endpoint = format!("{}/ListItemAllFields", file_endpoint(file_path));
        debug!(file_path, "updating document metadata");
        self.client.patch(&endpoint, fields, None).await?;
        Ok(())
    }

    /// Delete a file. A missing file surfaces as an error.
    pub async fn delete_file(&self, file_path: &str) -> Result<()> {
        debug!(file_path, "deleting document");
        self.client.delete(&file_endpoint(file_path), None).await?;
        Ok(())
    }

    /// Whether a file exists at the given server-relative URL.
    pub async fn file_exists(&self, file_path: &str) -> Result<bool> {
        match self.client.get(&file_endpoint(file_path), None).await {
            Ok(_) => Ok(true),
            Err(SiteQaError::Api(api)) if api.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// List the files directly inside a folder.
    pub async fn list_files(&self, folder_path: &str) -> Result<Vec<Value>> {
        let endpoint = format!("{}/Files", folder_endpoint(folder_path));
        let payload = self.client.get(&endpoint, None).await?;
        Ok(match payload {
            Value::Object(mut map) => match map.remove("results") {
                Some(Value::Array(files)) => files,
                _ => Vec::new(),
            },
            Value::Array(files) => files,
            _ => Vec::new(),
        })
    }

    /// Create a subfolder under an existing folder.
    pub async fn create_folder(&self, parent_path: &str, folder_name: &str) -> Result<Value> {
        let endpoint = format!("{}/Folders", folder_endpoint(parent_path));
        let body = json!({
            "__metadata": { "type": "SP.Folder" },
            "ServerRelativeUrl": format!("{}/{}", parent_path.trim_end_matches('/'), folder_name),
        });
        debug!(parent_path, folder_name, "creating folder");
        self.client.post(&endpoint, &body, None).await
    }

    /// Create every missing folder along a server-relative path.
    ///
    /// The leading segment (the site or library root) is assumed to
    /// exist; each deeper segment is created when absent. Already
    /// existing folders are left untouched.
    pub async fn ensure_folder_path(&self, folder_path: &str) -> Result<()> {
        let mut current = String::new();
        for segment in folder_path.split('/').filter(|segment| !segment.is_empty()) {
            let candidate = format!("{current}/{segment}");
            if !current.is_empty() && !self.folder_exists(&candidate).await? {
                self.create_folder(&current, segment).await?;
            }
            current = candidate;
        }
        Ok(())
    }

    /// Delete a folder and its contents. A missing folder surfaces as
    /// an error.
    pub async fn delete_folder(&self, folder_path: &str) -> Result<()> {
        debug!(folder_path, "deleting folder");
        self.client.delete(&folder_endpoint(folder_path), None).await?;
        Ok(())
    }

    /// Whether a folder exists at the given server-relative URL.
    pub async fn folder_exists(&self, folder_path: &str) -> Result<bool> {
        match self.client.get(&folder_endpoint(folder_path), None).await {
            Ok(_) => Ok(true),
            Err(SiteQaError::Api(api)) if api.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

fn folder_endpoint(folder_path: &str) -> String {
    format!("/_api/web/GetFolderByServerRelativeUrl('{}')", escape_path(folder_path))
}

fn file_endpoint(file_path: &str) -> String {
    format!("/_api/web/GetFileByServerRelativeUrl('{}')", escape_path(file_path))
}

fn escape_path(path: &str) -> String {
    path.replace('\'', "''")
}
