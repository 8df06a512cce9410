//! Current-folder cursor, expanded branches and selected documents.

use crate::models::DocumentRecord;
use crate::paths::{self, ROOT};
use crate::tree::FolderTree;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct ViewState {
    cursor: String,
    expanded: BTreeSet<String>,
    selected: BTreeSet<i64>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            cursor: ROOT.to_string(),
            expanded: BTreeSet::new(),
            selected: BTreeSet::new(),
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Opens `path`. The folder does not have to exist: a deleted folder
    /// simply shows no documents and no children.
    ///
    /// A folder with children is expanded, as is its direct parent.
    pub fn set_cursor(&mut self, path: &str, tree: &FolderTree) {
        let path = paths::normalize(Some(path));
        if tree.has_children(&path) {
            self.expanded.insert(path.clone());
        }
        let parent = paths::parent_of(&path);
        if parent != ROOT {
            self.expanded.insert(parent);
        }
        self.cursor = path;
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = ROOT.to_string();
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(&paths::normalize(Some(path)))
    }

    pub fn expand(&mut self, path: &str) {
        self.expanded.insert(paths::normalize(Some(path)));
    }

    /// Returns the new state of the branch.
    pub fn toggle_expanded(&mut self, path: &str) -> bool {
        let path = paths::normalize(Some(path));
        if self.expanded.remove(&path) {
            false
        } else {
            self.expanded.insert(path);
            true
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn expanded(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }

    pub fn toggle_selected(&mut self, id: i64) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn select_all<I: IntoIterator<Item = i64>>(&mut self, ids: I) {
        self.selected.extend(ids);
    }

    pub fn deselect(&mut self, id: i64) {
        self.selected.remove(&id);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected_ids(&self) -> Vec<i64> {
        self.selected.iter().copied().collect()
    }

    /// Drops selected ids that no longer exist in `docs`.
    pub fn prune_selection(&mut self, docs: &[DocumentRecord]) {
        self.selected.retain(|id| docs.iter().any(|d| d.id == *id));
    }
}

/// Folder a document lives in; `null`, `""` and `/` all mean root.
pub fn folder_of(doc: &DocumentRecord) -> String {
    paths::normalize(doc.folder_path.as_deref())
}

pub fn visible_documents<'a>(docs: &'a [DocumentRecord], cursor: &str) -> Vec<&'a DocumentRecord> {
    let cursor = paths::normalize(Some(cursor));
    docs.iter().filter(|d| folder_of(d) == cursor).collect()
}

pub fn visible_children<'a>(tree: &'a FolderTree, cursor: &str) -> &'a [String] {
    tree.children(cursor)
}

pub fn document_count(docs: &[DocumentRecord], path: &str) -> usize {
    let path = paths::normalize(Some(path));
    docs.iter().filter(|d| folder_of(d) == path).count()
}

/// Documents per folder, for badges.
pub fn folder_counts(docs: &[DocumentRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for doc in docs {
        *counts.entry(folder_of(doc)).or_insert(0) += 1;
    }
    counts
}
