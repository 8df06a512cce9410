//! Client-side filtering and sorting of the document list.

use crate::models::DocumentRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Date,
    Size,
    Type,
}

impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "date" | "created" | "created_at" => SortKey::Date,
            "size" => SortKey::Size,
            "type" => SortKey::Type,
            _ => SortKey::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub query: Option<String>,
    pub file_type: Option<String>,
    pub tag: Option<String>,
    pattern: Option<GlobMatcher>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Filename glob such as `*.pdf`, matched case-insensitively.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, globset::Error> {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()?;
        self.pattern = Some(glob.compile_matcher());
        Ok(self)
    }

    pub fn matches(&self, doc: &DocumentRecord) -> bool {
        if let Some(q) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let q = q.to_lowercase();
            let in_name = doc.original_filename.to_lowercase().contains(&q);
            let in_summary = doc
                .summary
                .as_deref()
                .map(|s| s.to_lowercase().contains(&q))
                .unwrap_or(false);
            let in_tags = doc.tags().iter().any(|t| t.to_lowercase().contains(&q));
            if !(in_name || in_summary || in_tags) {
                return false;
            }
        }
        if let Some(ft) = self.file_type.as_deref().filter(|f| !f.is_empty()) {
            let wanted = ft.trim_start_matches('.').to_lowercase();
            let declared = doc
                .file_type
                .as_deref()
                .map(str::to_lowercase)
                .map(|t| t == wanted || t.ends_with(&format!("/{wanted}")))
                .unwrap_or(false);
            if !declared && extension(&doc.original_filename).as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
            if !doc.tags().iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        if let Some(glob) = &self.pattern {
            if !glob.is_match(&doc.original_filename) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a, I>(&self, docs: I) -> Vec<&'a DocumentRecord>
    where
        I: IntoIterator<Item = &'a DocumentRecord>,
    {
        docs.into_iter().filter(|d| self.matches(d)).collect()
    }
}

fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

fn type_label(doc: &DocumentRecord) -> String {
    doc.file_type
        .clone()
        .or_else(|| extension(&doc.original_filename))
        .unwrap_or_default()
        .to_lowercase()
}

/// Accepts RFC 3339 and the zone-less ISO form many backends emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|n| n.and_utc())
}

/// Stable sort. Undated documents go last in ascending date order.
pub fn sort_documents<D>(docs: &mut [D], key: SortKey, order: SortOrder)
where
    D: Borrow<DocumentRecord>,
{
    docs.sort_by(|a, b| {
        let (a, b): (&DocumentRecord, &DocumentRecord) = (a.borrow(), b.borrow());
        let ord = match key {
            SortKey::Name => a
                .original_filename
                .to_lowercase()
                .cmp(&b.original_filename.to_lowercase()),
            SortKey::Size => a.file_size.cmp(&b.file_size),
            SortKey::Type => type_label(a).cmp(&type_label(b)),
            SortKey::Date => {
                let da = a.created_at.as_deref().and_then(parse_timestamp);
                let db = b.created_at.as_deref().and_then(parse_timestamp);
                match (da, db) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
