use crate::{
    BulkRequest, CreateFolderRequest, DestinationRequest, DocumentRecord, DocumentService,
    ServiceError,
};
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct HttpServiceConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

/// REST client for the document/folder endpoints under `/api/documents`.
#[derive(Clone)]
pub struct HttpDocumentService {
    client: Client,
    cfg: Arc<HttpServiceConfig>,
}

impl HttpDocumentService {
    pub fn new(cfg: HttpServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            cfg: Arc::new(cfg),
        })
    }

    pub fn base_url(&self) -> &str {
        self.cfg.base_url.trim_end_matches('/')
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// `/api/documents/folders/{path}` with each path segment percent-encoded.
    fn folder_url(&self, path: &str) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&self.endpoint("/api/documents/folders"))
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ServiceError::Transport("base url cannot hold a path".into()))?;
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.cfg.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let resp = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        check_status(resp).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let url = self.endpoint(path);
        debug!(%url, "GET");
        let resp = self.send(self.client.get(url)).await?;
        resp.json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<(), ServiceError> {
        let url = self.endpoint(path);
        debug!(%url, "POST");
        self.send(self.client.post(url).json(body)).await?;
        Ok(())
    }

    /// Server-side batch move. The response carries no per-item accounting.
    pub async fn bulk_move_remote(&self, ids: &[i64], destination: &str) -> Result<(), ServiceError> {
        let body = BulkRequest {
            document_ids: ids.to_vec(),
            destination_folder: Some(destination.to_string()),
        };
        self.post_json("/api/documents/bulk/move", &body).await
    }

    pub async fn bulk_delete_remote(&self, ids: &[i64]) -> Result<(), ServiceError> {
        let body = BulkRequest {
            document_ids: ids.to_vec(),
            destination_folder: None,
        };
        self.post_json("/api/documents/bulk/delete", &body).await
    }
}

#[async_trait::async_trait]
impl DocumentService for HttpDocumentService {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ServiceError> {
        let listing: DocumentListing = self.get_json("/api/documents").await?;
        Ok(listing.into_records())
    }

    async fn list_folders(&self) -> Result<Vec<String>, ServiceError> {
        let listing: FolderListing = match self.get_json("/api/documents/folders").await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(error = %e, "folder listing failed, trying fallback endpoint");
                self.get_json("/api/documents/folders/list").await?
            }
        };
        Ok(listing.into_paths())
    }

    async fn create_folder(
        &self,
        folder_name: &str,
        parent_folder: &str,
    ) -> Result<(), ServiceError> {
        let body = CreateFolderRequest {
            folder_name: folder_name.to_string(),
            parent_folder: parent_folder.to_string(),
        };
        self.post_json("/api/documents/folders", &body).await
    }

    async fn delete_folder(&self, path: &str) -> Result<(), ServiceError> {
        let url = self.folder_url(path)?;
        debug!(%url, "DELETE");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn move_document(&self, id: i64, destination: &str) -> Result<(), ServiceError> {
        let body = DestinationRequest {
            destination_folder: destination.to_string(),
        };
        self.post_json(&format!("/api/documents/{id}/move"), &body)
            .await
    }

    async fn copy_document(&self, id: i64, destination: &str) -> Result<(), ServiceError> {
        let body = DestinationRequest {
            destination_folder: destination.to_string(),
        };
        self.post_json(&format!("/api/documents/{id}/copy"), &body)
            .await
    }

    async fn delete_document(&self, id: i64) -> Result<(), ServiceError> {
        let url = self.endpoint(&format!("/api/documents/{id}"));
        debug!(%url, "DELETE");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn cleanup_folders(&self) -> Result<(), ServiceError> {
        let url = self.endpoint("/api/documents/folders/cleanup");
        debug!(%url, "POST");
        self.send(self.client.post(url)).await?;
        Ok(())
    }
}

pub(crate) async fn check_status(resp: Response) -> Result<Response, ServiceError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
    Err(ServiceError::Status {
        status: status.as_u16(),
        message: extract_message(&body),
    })
}

/// Pulls a human-readable message out of an error response body.
///
/// JSON bodies are searched for `detail`, `message` and `error`; a `detail`
/// list (validation errors) is joined by `msg`. Short plain-text bodies are
/// used as-is; HTML pages are ignored.
pub fn extract_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return Some(s.trim().to_string())
                }
                Some(serde_json::Value::Array(items)) => {
                    let joined = items
                        .iter()
                        .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
                        .collect::<Vec<_>>()
                        .join("; ");
                    if !joined.is_empty() {
                        return Some(joined);
                    }
                }
                _ => {}
            }
        }
        return None;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() || text.starts_with('<') || text.len() > 200 {
        None
    } else {
        Some(text.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentListing {
    List(Vec<DocumentRecord>),
    Wrapped { documents: Vec<DocumentRecord> },
}

impl DocumentListing {
    fn into_records(self) -> Vec<DocumentRecord> {
        match self {
            DocumentListing::List(docs) | DocumentListing::Wrapped { documents: docs } => docs,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FolderEntry {
    Path(String),
    Object {
        #[serde(alias = "folder_path")]
        path: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FolderListing {
    List(Vec<FolderEntry>),
    Wrapped { folders: Vec<FolderEntry> },
}

impl FolderListing {
    fn into_paths(self) -> Vec<String> {
        let entries = match self {
            FolderListing::List(entries) | FolderListing::Wrapped { folders: entries } => entries,
        };
        entries
            .into_iter()
            .map(|e| match e {
                FolderEntry::Path(p) | FolderEntry::Object { path: p } => p,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_detail_string() {
        let body = br#"{"detail": "Folder already exists"}"#;
        assert_eq!(extract_message(body).as_deref(), Some("Folder already exists"));
    }

    #[test]
    fn joins_validation_detail_list() {
        let body = br#"{"detail": [{"msg": "field required"}, {"msg": "bad id"}]}"#;
        assert_eq!(
            extract_message(body).as_deref(),
            Some("field required; bad id")
        );
    }

    #[test]
    fn ignores_html_and_empty_bodies() {
        assert_eq!(extract_message(b"<html>oops</html>"), None);
        assert_eq!(extract_message(b"   "), None);
        assert_eq!(extract_message(br#"{"ok": false}"#), None);
        assert_eq!(extract_message(b"gateway timeout").as_deref(), Some("gateway timeout"));
    }

    #[test]
    fn folder_listing_accepts_every_shape() {
        let bare: FolderListing = serde_json::from_str(r#"["/", "/A"]"#).unwrap();
        assert_eq!(bare.into_paths(), vec!["/", "/A"]);

        let objects: FolderListing =
            serde_json::from_str(r#"[{"path": "/A"}, {"folder_path": "/B"}]"#).unwrap();
        assert_eq!(objects.into_paths(), vec!["/A", "/B"]);

        let wrapped: FolderListing =
            serde_json::from_str(r#"{"folders": ["/A/B"]}"#).unwrap();
        assert_eq!(wrapped.into_paths(), vec!["/A/B"]);
    }

    #[test]
    fn document_listing_tolerates_missing_fields() {
        let listing: DocumentListing = serde_json::from_str(
            r#"{"documents": [{"id": 1, "original_filename": "a.pdf", "folder_path": null}]}"#,
        )
        .unwrap();
        let docs = listing.into_records();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].folder_path, None);
        assert!(docs[0].tags().is_empty());
    }

    #[test]
    fn folder_url_encodes_segments() {
        let svc = HttpDocumentService::new(HttpServiceConfig {
            base_url: "http://localhost:8000/".into(),
            token: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let url = svc.folder_url("/Contracts/Q1 2024").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/documents/folders/Contracts/Q1%202024"
        );
    }
}
