//! Folder hierarchy derived from a flat set of path strings.

use crate::paths::{self, ROOT};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Parent path → direct child paths. Rebuilt from scratch on every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FolderTree {
    children: HashMap<String, Vec<String>>,
    known: HashSet<String>,
}

impl FolderTree {
    /// Builds the adjacency map. Duplicates and root spellings are dropped;
    /// children keep first-seen input order.
    pub fn build<S: AsRef<str>>(folders: &[S]) -> Self {
        let mut tree = FolderTree::default();
        for raw in folders {
            let path = paths::normalize(Some(raw.as_ref()));
            if path == ROOT || !tree.known.insert(path.clone()) {
                continue;
            }
            let parent = paths::parent_of(&path);
            let siblings = tree.children.entry(parent).or_default();
            if !siblings.contains(&path) {
                siblings.push(path);
            }
        }
        tree
    }

    pub fn has_folders(&self) -> bool {
        !self.known.is_empty()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Root always exists; other paths exist when the folder list named them.
    pub fn contains(&self, path: &str) -> bool {
        let path = paths::normalize(Some(path));
        path == ROOT || self.known.contains(&path)
    }

    pub fn children(&self, path: &str) -> &[String] {
        self.children
            .get(&paths::normalize(Some(path)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_children(&self, path: &str) -> bool {
        !self.children(path).is_empty()
    }

    /// Children ordered for display: by folder name, case-insensitive.
    pub fn sorted_children(&self, path: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self.children(path).iter().map(String::as_str).collect();
        out.sort_by(|a, b| {
            let (na, nb) = (paths::name_of(a), paths::name_of(b));
            na.to_lowercase()
                .cmp(&nb.to_lowercase())
                .then_with(|| na.cmp(nb))
        });
        out
    }

    /// Every known folder, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.known.iter().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    /// Folders strictly below `path`, parents before children.
    pub fn descendants(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self.sorted_children(path).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next.to_string());
            stack.extend(self.sorted_children(next).into_iter().rev());
        }
        out
    }
}
