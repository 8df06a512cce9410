//! Clients for the document/folder service and the chat service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod chat;
pub mod http;
pub mod memory;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("status {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request cancelled")]
    Cancelled,
}

impl ServiceError {
    /// Human-readable message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ServiceError::Status { message, .. } => message.as_deref(),
            ServiceError::NotFound(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_size: u64,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub folder_path: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl DocumentRecord {
    pub fn new(id: i64, original_filename: impl Into<String>) -> Self {
        Self {
            id,
            original_filename: original_filename.into(),
            file_size: 0,
            file_type: None,
            folder_path: None,
            created_at: None,
            summary: None,
            tags: None,
        }
    }

    pub fn in_folder(mut self, folder_path: impl Into<String>) -> Self {
        self.folder_path = Some(folder_path.into());
        self
    }

    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /api/documents/folders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub folder_name: String,
    pub parent_folder: String,
}

/// Body of the per-document move and copy endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationRequest {
    pub destination_folder: String,
}

/// Body of the server-side batch endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRequest {
    pub document_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_folder: Option<String>,
}

#[async_trait::async_trait]
pub trait DocumentService: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ServiceError>;
    async fn list_folders(&self) -> Result<Vec<String>, ServiceError>;
    async fn create_folder(&self, folder_name: &str, parent_folder: &str)
        -> Result<(), ServiceError>;
    async fn delete_folder(&self, path: &str) -> Result<(), ServiceError>;
    async fn move_document(&self, id: i64, destination: &str) -> Result<(), ServiceError>;
    async fn copy_document(&self, id: i64, destination: &str) -> Result<(), ServiceError>;
    async fn delete_document(&self, id: i64) -> Result<(), ServiceError>;
    async fn cleanup_folders(&self) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_fields_decode_as_missing() {
        let docs: Vec<DocumentRecord> = serde_json::from_str(
            r#"[
                {"id": 1, "original_filename": "a.pdf", "file_size": null, "folder_path": null},
                {"id": 2, "original_filename": null, "file_size": 10, "tags": null},
                {"id": 3}
            ]"#,
        )
        .unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].file_size, 0);
        assert_eq!(docs[0].folder_path, None);
        assert_eq!(docs[1].original_filename, "");
        assert!(docs[1].tags().is_empty());
        assert_eq!(docs[2], DocumentRecord::new(3, ""));
    }
}
