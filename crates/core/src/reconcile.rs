//! Folder and document mutations against the document service.
//!
//! Every mutation is one request (or one request per item for batches)
//! followed by a full re-fetch of documents and folders. Nothing is patched
//! locally: the tree shown is always the one the server last returned.

use crate::error::BrowserError;
use crate::models::DocumentRecord;
use crate::paths::{self, ROOT};
use crate::tree::FolderTree;
use crate::view::{self, ViewState};
use providers::{DocumentService, ServiceError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Submitting,
    Resyncing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchAction {
    Move,
    Copy,
    Delete,
}

impl BatchAction {
    fn past(self) -> &'static str {
        match self {
            BatchAction::Move => "Moved",
            BatchAction::Copy => "Copied",
            BatchAction::Delete => "Deleted",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            BatchAction::Move => "move",
            BatchAction::Copy => "copy",
            BatchAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub action: BatchAction,
    pub succeeded: Vec<i64>,
    pub failed: Vec<i64>,
}

impl BatchSummary {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// "Moved 2, failed to move 1", or "Moved 3 documents" when nothing failed.
    pub fn message(&self) -> String {
        let ok = self.succeeded.len();
        if self.failed.is_empty() {
            let noun = if ok == 1 { "document" } else { "documents" };
            format!("{} {ok} {noun}", self.action.past())
        } else {
            format!(
                "{} {ok}, failed to {} {}",
                self.action.past(),
                self.action.verb(),
                self.failed.len()
            )
        }
    }

    pub fn into_result(self) -> Result<Self, BrowserError> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(BrowserError::PartialBatch {
                succeeded: self.succeeded.len(),
                failed: self.failed.len(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameOutcome {
    pub path: String,
    pub documents_moved: usize,
    pub failures: usize,
    /// False when a failure forced the old folder to be kept.
    pub old_removed: bool,
}

/// Documents page state: latest server snapshot plus the view over it.
pub struct FolderBrowser {
    service: Arc<dyn DocumentService>,
    documents: Vec<DocumentRecord>,
    folders: Vec<String>,
    tree: FolderTree,
    view: ViewState,
    phase: Phase,
    notices: Vec<Notice>,
}

impl FolderBrowser {
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self {
            service,
            documents: Vec::new(),
            folders: Vec::new(),
            tree: FolderTree::default(),
            view: ViewState::new(),
            phase: Phase::Idle,
            notices: Vec::new(),
        }
    }

    pub fn documents(&self) -> &[DocumentRecord] {
        &self.documents
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    pub fn tree(&self) -> &FolderTree {
        &self.tree
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> &str {
        self.view.cursor()
    }

    pub fn open_folder(&mut self, path: &str) {
        self.view.set_cursor(path, &self.tree);
    }

    pub fn visible_documents(&self) -> Vec<&DocumentRecord> {
        view::visible_documents(&self.documents, self.view.cursor())
    }

    pub fn visible_children(&self) -> &[String] {
        view::visible_children(&self.tree, self.view.cursor())
    }

    pub fn document(&self, id: i64) -> Option<&DocumentRecord> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "notice");
        self.notices.push(Notice { level, message });
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "phase");
            self.phase = phase;
        }
    }

    fn reject(&mut self, message: impl Into<String>) -> BrowserError {
        let err = BrowserError::validation(message);
        self.notify(NoticeLevel::Error, err.to_string());
        err
    }

    fn fail(&mut self, action: &'static str, fallback: &str, err: ServiceError) -> BrowserError {
        warn!(action, error = %err, "request failed");
        let err = BrowserError::request(action, fallback, err);
        self.notify(NoticeLevel::Error, err.to_string());
        self.set_phase(Phase::Idle);
        err
    }

    /// Fetches documents and folders together and rebuilds the tree.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&mut self) -> Result<(), BrowserError> {
        let (documents, folders) = tokio::join!(
            self.service.list_documents(),
            self.service.list_folders()
        );
        let documents = match documents {
            Ok(d) => d,
            Err(e) => return Err(self.stale("list_documents", "Failed to load documents", e)),
        };
        let folders = match folders {
            Ok(f) => f,
            Err(e) => return Err(self.stale("list_folders", "Failed to load folders", e)),
        };
        self.tree = FolderTree::build(&folders);
        self.folders = folders;
        self.documents = documents;
        self.view.prune_selection(&self.documents);
        debug!(
            documents = self.documents.len(),
            folders = self.tree.len(),
            "snapshot refreshed"
        );
        Ok(())
    }

    fn stale(&mut self, action: &'static str, fallback: &str, err: ServiceError) -> BrowserError {
        warn!(action, error = %err, "refresh failed, keeping previous snapshot");
        let err = BrowserError::request(action, fallback, err);
        self.notify(NoticeLevel::Error, err.to_string());
        err
    }

    /// Returns whether the re-fetch succeeded.
    async fn resync(&mut self) -> bool {
        self.set_phase(Phase::Resyncing);
        // A failed re-fetch is already reported as a notice; the mutation itself succeeded.
        let refreshed = self.refresh().await.is_ok();
        self.set_phase(Phase::Idle);
        refreshed
    }

    /// Creates `name` inside the current folder and returns its path.
    pub async fn create_folder(&mut self, name: &str) -> Result<String, BrowserError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject("Folder name is required"));
        }
        if name.contains('/') || name == "." || name == ".." {
            return Err(self.reject(format!("\"{name}\" is not a valid folder name")));
        }
        let parent = self.view.cursor().to_string();
        let path = paths::join(&parent, name);
        if self.tree.children(&parent).iter().any(|c| *c == path) {
            return Err(self.reject(format!("A folder named \"{name}\" already exists here")));
        }

        self.set_phase(Phase::Submitting);
        if let Err(e) = self.service.create_folder(name, &parent).await {
            return Err(self.fail("create_folder", "Failed to create folder", e));
        }
        info!(%path, "folder created");
        self.notify(NoticeLevel::Success, format!("Created folder {path}"));
        self.resync().await;
        Ok(path)
    }

    pub async fn delete_folder(&mut self, path: &str) -> Result<(), BrowserError> {
        let path = paths::normalize(Some(path));
        if path == ROOT {
            return Err(self.reject("The root folder cannot be deleted"));
        }

        self.set_phase(Phase::Submitting);
        if let Err(e) = self.service.delete_folder(&path).await {
            return Err(self.fail("delete_folder", "Failed to delete folder", e));
        }
        info!(%path, "folder deleted");
        self.notify(NoticeLevel::Success, format!("Deleted folder {path}"));
        self.resync().await;
        if paths::is_within(self.view.cursor(), &path) {
            self.view.reset_cursor();
        }
        self.reset_cursor_if_missing();
        Ok(())
    }

    fn reset_cursor_if_missing(&mut self) {
        if !self.tree.contains(self.view.cursor()) {
            debug!(cursor = self.view.cursor(), "cursor folder gone, back to root");
            self.view.reset_cursor();
        }
    }

    fn require_document(&mut self, id: i64) -> Result<DocumentRecord, BrowserError> {
        match self.document(id) {
            Some(doc) => Ok(doc.clone()),
            None => Err(self.reject(format!("Document {id} not found"))),
        }
    }

    /// Moves one document and returns the normalized destination.
    ///
    /// Moving a document to the folder it is already in is rejected locally.
    pub async fn move_document(
        &mut self,
        id: i64,
        destination: &str,
    ) -> Result<String, BrowserError> {
        let doc = self.require_document(id)?;
        let dest = paths::normalize_destination(destination);
        if view::folder_of(&doc) == dest {
            return Err(self.reject("Document is already in this folder"));
        }

        self.set_phase(Phase::Submitting);
        if let Err(e) = self.service.move_document(id, &dest).await {
            return Err(self.fail("move_document", "Failed to move document", e));
        }
        info!(id, %dest, "document moved");
        self.notify(
            NoticeLevel::Success,
            format!("Moved {} to {dest}", doc.original_filename),
        );
        self.resync().await;
        Ok(dest)
    }

    pub async fn copy_document(
        &mut self,
        id: i64,
        destination: &str,
    ) -> Result<String, BrowserError> {
        let doc = self.require_document(id)?;
        let dest = paths::normalize_destination(destination);

        self.set_phase(Phase::Submitting);
        if let Err(e) = self.service.copy_document(id, &dest).await {
            return Err(self.fail("copy_document", "Failed to copy document", e));
        }
        info!(id, %dest, "document copied");
        self.notify(
            NoticeLevel::Success,
            format!("Copied {} to {dest}", doc.original_filename),
        );
        self.resync().await;
        Ok(dest)
    }

    pub async fn delete_document(&mut self, id: i64) -> Result<(), BrowserError> {
        let doc = self.require_document(id)?;

        self.set_phase(Phase::Submitting);
        if let Err(e) = self.service.delete_document(id).await {
            return Err(self.fail("delete_document", "Failed to delete document", e));
        }
        info!(id, "document deleted");
        self.view.deselect(id);
        self.notify(
            NoticeLevel::Success,
            format!("Deleted {}", doc.original_filename),
        );
        self.resync().await;
        Ok(())
    }

    pub async fn bulk_move(
        &mut self,
        ids: &[i64],
        destination: &str,
    ) -> Result<BatchSummary, BrowserError> {
        let dest = paths::normalize_destination(destination);
        self.run_batch(BatchAction::Move, ids, &dest).await
    }

    pub async fn bulk_copy(
        &mut self,
        ids: &[i64],
        destination: &str,
    ) -> Result<BatchSummary, BrowserError> {
        let dest = paths::normalize_destination(destination);
        self.run_batch(BatchAction::Copy, ids, &dest).await
    }

    pub async fn bulk_delete(&mut self, ids: &[i64]) -> Result<BatchSummary, BrowserError> {
        self.run_batch(BatchAction::Delete, ids, ROOT).await
    }

    pub async fn bulk_move_selected(
        &mut self,
        destination: &str,
    ) -> Result<BatchSummary, BrowserError> {
        let ids = self.view.selected_ids();
        self.bulk_move(&ids, destination).await
    }

    pub async fn bulk_copy_selected(
        &mut self,
        destination: &str,
    ) -> Result<BatchSummary, BrowserError> {
        let ids = self.view.selected_ids();
        self.bulk_copy(&ids, destination).await
    }

    pub async fn bulk_delete_selected(&mut self) -> Result<BatchSummary, BrowserError> {
        let ids = self.view.selected_ids();
        self.bulk_delete(&ids).await
    }

    /// One request per document; a failure never stops the rest of the batch.
    async fn run_batch(
        &mut self,
        action: BatchAction,
        ids: &[i64],
        dest: &str,
    ) -> Result<BatchSummary, BrowserError> {
        let mut unique: Vec<i64> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        if unique.is_empty() {
            return Err(self.reject("No documents selected"));
        }

        self.set_phase(Phase::Submitting);
        let mut summary = BatchSummary {
            action,
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        for id in unique {
            let result = match action {
                BatchAction::Move => self.service.move_document(id, dest).await,
                BatchAction::Copy => self.service.copy_document(id, dest).await,
                BatchAction::Delete => self.service.delete_document(id).await,
            };
            match result {
                Ok(()) => summary.succeeded.push(id),
                Err(e) => {
                    warn!(id, action = action.verb(), error = %e, "batch item failed");
                    summary.failed.push(id);
                }
            }
        }
        for id in &summary.succeeded {
            self.view.deselect(*id);
        }
        info!(
            action = action.verb(),
            succeeded = summary.succeeded_count(),
            failed = summary.failed_count(),
            "batch finished"
        );
        let level = if summary.failed.is_empty() {
            NoticeLevel::Success
        } else if summary.succeeded.is_empty() {
            NoticeLevel::Error
        } else {
            NoticeLevel::Warning
        };
        self.notify(level, summary.message());
        self.resync().await;
        Ok(summary)
    }

    /// Renames or relocates a folder.
    ///
    /// Folders are identified only by path, so the new path is materialized
    /// (with its subfolders), every document is moved across, and the old
    /// folders are deleted deepest first. If any document fails to move the
    /// old folders are kept so nothing is stranded.
    ///
    /// `new_name` without a slash renames in place; with a slash it is a full
    /// destination path.
    pub async fn rename_folder(
        &mut self,
        path: &str,
        new_name: &str,
    ) -> Result<RenameOutcome, BrowserError> {
        let old = paths::normalize(Some(path));
        if old == ROOT {
            return Err(self.reject("The root folder cannot be renamed"));
        }
        if !self.tree.contains(&old) {
            return Err(self.reject(format!("Folder {old} not found")));
        }
        let new_name = new_name.trim();
        if new_name.is_empty() || paths::is_root(new_name) {
            return Err(self.reject("Folder name is required"));
        }
        let new = if new_name.contains('/') {
            paths::normalize_destination(new_name)
        } else {
            paths::join(&paths::parent_of(&old), new_name)
        };
        if new == old {
            return Err(self.reject("Folder name unchanged"));
        }
        if paths::is_within(&new, &old) {
            return Err(self.reject("A folder cannot be moved into itself"));
        }
        if self.tree.contains(&new) {
            return Err(self.reject(format!("A folder named {new} already exists")));
        }
        let new_parent = paths::parent_of(&new);
        if !self.tree.contains(&new_parent) {
            return Err(self.reject(format!("Folder {new_parent} does not exist")));
        }

        let mut subtree = vec![old.clone()];
        subtree.extend(self.tree.descendants(&old));
        let moves: Vec<(i64, String)> = self
            .documents
            .iter()
            .filter_map(|d| {
                let folder = view::folder_of(d);
                paths::rebase(&folder, &old, &new).map(|target| (d.id, target))
            })
            .collect();

        self.set_phase(Phase::Submitting);
        let mut failures = 0usize;
        for (i, folder) in subtree.iter().enumerate() {
            let Some(target) = paths::rebase(folder, &old, &new) else {
                continue;
            };
            let created = self
                .service
                .create_folder(paths::name_of(&target), &paths::parent_of(&target))
                .await;
            if let Err(e) = created {
                if i == 0 {
                    return Err(self.fail("rename_folder", "Failed to rename folder", e));
                }
                warn!(%target, error = %e, "could not materialize subfolder");
                failures += 1;
            }
        }

        let mut moved = 0usize;
        for (id, target) in &moves {
            match self.service.move_document(*id, target).await {
                Ok(()) => moved += 1,
                Err(e) => {
                    warn!(id, %target, error = %e, "could not move document during rename");
                    failures += 1;
                }
            }
        }

        let mut old_removed = false;
        if failures == 0 {
            old_removed = true;
            for folder in subtree.iter().rev() {
                if let Err(e) = self.service.delete_folder(folder).await {
                    warn!(%folder, error = %e, "could not remove old folder");
                    failures += 1;
                    old_removed = false;
                }
            }
        }

        let follow = if old_removed {
            paths::rebase(self.view.cursor(), &old, &new)
        } else {
            None
        };
        if old_removed {
            info!(%old, %new, moved, "folder renamed");
            self.notify(NoticeLevel::Success, format!("Renamed {old} to {new}"));
        } else {
            self.notify(
                NoticeLevel::Warning,
                format!("Renamed {old} to {new} with {failures} failures; {old} was kept"),
            );
        }
        self.resync().await;
        if let Some(cursor) = follow {
            self.view.set_cursor(&cursor, &self.tree);
        }
        Ok(RenameOutcome {
            path: new,
            documents_moved: moved,
            failures,
            old_removed,
        })
    }

    /// Asks the server to drop empty folder records.
    pub async fn cleanup_folders(&mut self) -> Result<(), BrowserError> {
        self.set_phase(Phase::Submitting);
        if let Err(e) = self.service.cleanup_folders().await {
            return Err(self.fail("cleanup_folders", "Failed to clean up folders", e));
        }
        let before = self.tree.len();
        if self.resync().await {
            let removed = before.saturating_sub(self.tree.len());
            info!(removed, "empty folders cleaned up");
            let noun = if removed == 1 { "folder" } else { "folders" };
            self.notify(
                NoticeLevel::Success,
                format!("Removed {removed} empty {noun}"),
            );
            self.reset_cursor_if_missing();
        } else {
            info!("empty folders cleaned up, count unknown");
            self.notify(NoticeLevel::Success, "Cleaned up empty folders");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(action: BatchAction, ok: &[i64], failed: &[i64]) -> BatchSummary {
        BatchSummary {
            action,
            succeeded: ok.to_vec(),
            failed: failed.to_vec(),
        }
    }

    #[test]
    fn batch_messages() {
        assert_eq!(
            summary(BatchAction::Move, &[1, 2], &[3]).message(),
            "Moved 2, failed to move 1"
        );
        assert_eq!(
            summary(BatchAction::Copy, &[], &[3]).message(),
            "Copied 0, failed to copy 1"
        );
        assert_eq!(
            summary(BatchAction::Delete, &[1, 2, 3], &[]).message(),
            "Deleted 3 documents"
        );
        assert_eq!(summary(BatchAction::Move, &[1], &[]).message(), "Moved 1 document");
    }

    #[test]
    fn partial_batch_becomes_error_on_request() {
        let err = summary(BatchAction::Move, &[1, 2], &[3])
            .into_result()
            .unwrap_err();
        assert!(matches!(
            err,
            BrowserError::PartialBatch {
                succeeded: 2,
                failed: 1
            }
        ));
        assert!(summary(BatchAction::Move, &[1], &[]).into_result().is_ok());
    }
}
