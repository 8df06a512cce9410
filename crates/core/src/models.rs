use crate::paths::{self, FolderKey};
use crate::tree::FolderTree;
use crate::view;
use serde::Serialize;

pub use providers::DocumentRecord;

/// Serializable folder hierarchy with per-folder document counts.
#[derive(Debug, Clone, Serialize)]
pub struct FolderEntry {
    pub key: FolderKey,
    pub path: String,
    pub name: String,
    pub document_count: usize,
    pub children: Vec<FolderEntry>,
}

impl FolderEntry {
    /// Snapshot of the subtree rooted at `path`, children in display order.
    pub fn snapshot(tree: &FolderTree, docs: &[DocumentRecord], path: &str) -> Self {
        let path = paths::normalize(Some(path));
        let counts = view::folder_counts(docs);
        Self::build(tree, &counts, &path)
    }

    fn build(
        tree: &FolderTree,
        counts: &std::collections::BTreeMap<String, usize>,
        path: &str,
    ) -> Self {
        Self {
            key: FolderKey::of(path),
            path: path.to_string(),
            name: paths::name_of(path).to_string(),
            document_count: counts.get(path).copied().unwrap_or(0),
            children: tree
                .sorted_children(path)
                .into_iter()
                .map(|child| Self::build(tree, counts, child))
                .collect(),
        }
    }
}
