//! Plain-text rendering for terminal output.

use lexdocs_core::filter::{format_size, parse_timestamp};
use lexdocs_core::models::DocumentRecord;
use lexdocs_core::paths::{self, ROOT};
use lexdocs_core::{FolderTree, Notice, NoticeLevel};
use providers::chat::ChatSession;
use std::collections::BTreeMap;

/// Draws the folder hierarchy with per-folder document counts.
///
/// ```text
/// / (2)
/// ├── Contracts (3)
/// │   └── 2024 (1)
/// └── Pleadings (1)
/// ```
pub fn tree_lines(tree: &FolderTree, counts: &BTreeMap<String, usize>) -> Vec<String> {
    let mut lines = vec![format!("{ROOT} ({})", count(counts, ROOT))];
    push_children(tree, counts, ROOT, "", &mut lines);
    lines
}

fn push_children(
    tree: &FolderTree,
    counts: &BTreeMap<String, usize>,
    path: &str,
    prefix: &str,
    lines: &mut Vec<String>,
) {
    let children = tree.sorted_children(path);
    let last = children.len().saturating_sub(1);
    for (i, child) in children.into_iter().enumerate() {
        let (branch, indent) = if i == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        lines.push(format!(
            "{prefix}{branch}{} ({})",
            paths::name_of(child),
            count(counts, child)
        ));
        push_children(tree, counts, child, &format!("{prefix}{indent}"), lines);
    }
}

fn count(counts: &BTreeMap<String, usize>, path: &str) -> usize {
    counts.get(path).copied().unwrap_or(0)
}

/// `id  name  size  date`, tab separated.
pub fn document_line(doc: &DocumentRecord) -> String {
    let date = doc
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\t{}\t{}\t{}",
        doc.id,
        doc.original_filename,
        format_size(doc.file_size),
        date
    )
}

/// Subfolders first (with a trailing slash), then documents.
pub fn listing_lines(folders: &[&str], docs: &[&DocumentRecord]) -> Vec<String> {
    let mut lines: Vec<String> = folders
        .iter()
        .map(|f| format!("{}/", paths::name_of(f)))
        .collect();
    lines.extend(docs.iter().map(|d| document_line(d)));
    if lines.is_empty() {
        lines.push("(empty)".to_string());
    }
    lines
}

pub fn notice_line(notice: &Notice) -> String {
    let label = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!("{label}: {}", notice.message)
}

pub fn session_line(session: &ChatSession, archived: bool) -> String {
    let mut line = format!(
        "{}\t{}\t{}",
        session.id,
        session.title.as_deref().unwrap_or("(untitled)"),
        session.updated_at.as_deref().unwrap_or("-")
    );
    if archived {
        line.push_str("\t[archived]");
    }
    line
}

/// Errors and warnings go to stderr, everything else to stdout.
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Error | NoticeLevel::Warning => eprintln!("{}", notice_line(notice)),
            _ => println!("{}", notice_line(notice)),
        }
    }
}
