//! In-process document service with failure injection.

use crate::{DocumentRecord, DocumentService, ServiceError};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListDocuments,
    ListFolders,
    CreateFolder,
    DeleteFolder,
    Move,
    Copy,
    Delete,
    Cleanup,
}

#[derive(Default)]
struct State {
    folders: BTreeSet<String>,
    documents: Vec<DocumentRecord>,
    failing_ids: HashSet<i64>,
    failing_ops: HashSet<Operation>,
}

#[derive(Default)]
pub struct MemoryDocumentService {
    state: Mutex<State>,
    requests: AtomicUsize,
}

fn canonical(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

fn within(path: &str, ancestor: &str) -> bool {
    ancestor == "/" || path == ancestor || path.starts_with(&format!("{ancestor}/"))
}

impl MemoryDocumentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folders<I, S>(self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        {
            let mut state = self.lock();
            for f in folders {
                let path = canonical(f.as_ref());
                if path != "/" {
                    state.folders.insert(path);
                }
            }
        }
        self
    }

    pub fn with_documents(self, documents: Vec<DocumentRecord>) -> Self {
        self.lock().documents.extend(documents);
        self
    }

    /// Makes every per-document request for `id` fail with a 500.
    pub fn fail_document(&self, id: i64) {
        self.lock().failing_ids.insert(id);
    }

    pub fn fail_operation(&self, op: Operation) {
        self.lock().failing_ops.insert(op);
    }

    pub fn recover_operation(&self, op: Operation) {
        self.lock().failing_ops.remove(&op);
    }

    /// Number of requests received so far, successful or not.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn folder_of(&self, id: i64) -> Option<Option<String>> {
        self.lock()
            .documents
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.folder_path.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, op: Operation, id: Option<i64>) -> Result<MutexGuard<'_, State>, ServiceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        let id_fails = id.map(|i| state.failing_ids.contains(&i)).unwrap_or(false);
        if state.failing_ops.contains(&op) || id_fails {
            return Err(ServiceError::Status {
                status: 500,
                message: Some(format!("{op:?} failed")),
            });
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl DocumentService for MemoryDocumentService {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ServiceError> {
        let state = self.begin(Operation::ListDocuments, None)?;
        Ok(state.documents.clone())
    }

    async fn list_folders(&self) -> Result<Vec<String>, ServiceError> {
        let state = self.begin(Operation::ListFolders, None)?;
        let mut out = vec!["/".to_string()];
        out.extend(state.folders.iter().cloned());
        Ok(out)
    }

    async fn create_folder(
        &self,
        folder_name: &str,
        parent_folder: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.begin(Operation::CreateFolder, None)?;
        let path = canonical(&format!("{parent_folder}/{folder_name}"));
        if path == "/" || !state.folders.insert(path) {
            return Err(ServiceError::Status {
                status: 409,
                message: Some("Folder already exists".into()),
            });
        }
        Ok(())
    }

    /// Removes the folder and everything below it; documents inside fall back to root.
    async fn delete_folder(&self, path: &str) -> Result<(), ServiceError> {
        let mut state = self.begin(Operation::DeleteFolder, None)?;
        let path = canonical(path);
        if !state.folders.contains(&path) {
            return Err(ServiceError::NotFound(format!("Folder {path} not found")));
        }
        state.folders.retain(|f| !within(f, &path));
        for doc in state.documents.iter_mut() {
            let folder = canonical(doc.folder_path.as_deref().unwrap_or("/"));
            if within(&folder, &path) {
                doc.folder_path = Some("/".into());
            }
        }
        Ok(())
    }

    async fn move_document(&self, id: i64, destination: &str) -> Result<(), ServiceError> {
        let mut state = self.begin(Operation::Move, Some(id))?;
        let dest = canonical(destination);
        let doc = state
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("Document {id} not found")))?;
        doc.folder_path = Some(dest.clone());
        if dest != "/" {
            state.folders.insert(dest);
        }
        Ok(())
    }

    async fn copy_document(&self, id: i64, destination: &str) -> Result<(), ServiceError> {
        let mut state = self.begin(Operation::Copy, Some(id))?;
        let dest = canonical(destination);
        let mut copy = state
            .documents
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Document {id} not found")))?;
        copy.id = state.documents.iter().map(|d| d.id).max().unwrap_or(0) + 1;
        copy.folder_path = Some(dest.clone());
        state.documents.push(copy);
        if dest != "/" {
            state.folders.insert(dest);
        }
        Ok(())
    }

    async fn delete_document(&self, id: i64) -> Result<(), ServiceError> {
        let mut state = self.begin(Operation::Delete, Some(id))?;
        let before = state.documents.len();
        state.documents.retain(|d| d.id != id);
        if state.documents.len() == before {
            return Err(ServiceError::NotFound(format!("Document {id} not found")));
        }
        Ok(())
    }

    async fn cleanup_folders(&self) -> Result<(), ServiceError> {
        let mut state = self.begin(Operation::Cleanup, None)?;
        let occupied: Vec<String> = state
            .documents
            .iter()
            .map(|d| canonical(d.folder_path.as_deref().unwrap_or("/")))
            .collect();
        state
            .folders
            .retain(|f| occupied.iter().any(|o| within(o, f)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cleanup_keeps_ancestors_of_occupied_folders() {
        let svc = MemoryDocumentService::new()
            .with_folders(["/A", "/A/B", "/C"])
            .with_documents(vec![DocumentRecord::new(1, "x.pdf").in_folder("/A/B")]);
        svc.cleanup_folders().await.unwrap();
        assert_eq!(svc.list_folders().await.unwrap(), vec!["/", "/A", "/A/B"]);
    }

    #[tokio::test]
    async fn failing_ids_only_affect_their_document() {
        let svc = MemoryDocumentService::new().with_documents(vec![
            DocumentRecord::new(1, "a.pdf"),
            DocumentRecord::new(2, "b.pdf"),
        ]);
        svc.fail_document(2);
        svc.move_document(1, "/X").await.unwrap();
        assert!(svc.move_document(2, "/X").await.is_err());
        assert_eq!(svc.folder_of(1), Some(Some("/X".into())));
        assert_eq!(svc.folder_of(2), Some(None));
        assert_eq!(svc.request_count(), 2);
    }
}
