//! Folder path strings.
//!
//! Folders have no identity besides their path. A canonical path starts with
//! `/`, has no trailing slash (except the root itself) and no empty segments.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ROOT: &str = "/";

/// Canonical form of a folder path. `None`, `""` and blank strings are the root.
pub fn normalize(path: Option<&str>) -> String {
    let segs = match path {
        Some(p) if !p.trim().is_empty() => segments(p),
        _ => Vec::new(),
    };
    if segs.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", segs.join("/"))
    }
}

/// Non-empty segments of `path`, whether or not it has a leading slash.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub fn is_root(path: &str) -> bool {
    segments(path).is_empty()
}

pub fn parent_of(path: &str) -> String {
    let segs = segments(path);
    if segs.len() <= 1 {
        ROOT.to_string()
    } else {
        format!("/{}", segs[..segs.len() - 1].join("/"))
    }
}

/// Last segment of the path; the root is named `/`.
pub fn name_of(path: &str) -> &str {
    segments(path).last().copied().unwrap_or(ROOT)
}

pub fn join(parent: &str, name: &str) -> String {
    let mut segs = segments(parent);
    segs.extend(segments(name));
    if segs.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", segs.join("/"))
    }
}

/// Destination for move, copy and rename requests.
///
/// Blank means root; a missing leading slash is added.
pub fn normalize_destination(dest: &str) -> String {
    normalize(Some(dest))
}

/// True when `path` is `ancestor` or lies below it, comparing whole segments.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    let path = segments(path);
    let ancestor = segments(ancestor);
    path.len() >= ancestor.len() && path[..ancestor.len()] == ancestor[..]
}

/// Re-roots `path` from under `from` to under `to`. `None` if `path` is not within `from`.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if !is_within(path, from) {
        return None;
    }
    let rest = segments(path)[segments(from).len()..].join("/");
    Some(join(to, &rest))
}

/// Stable surrogate key for a folder, the BLAKE3 hash of its canonical path.
///
/// Two spellings of the same folder (`/A/`, `A`, `/A`) share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderKey(blake3::Hash);

impl FolderKey {
    pub fn of(path: &str) -> Self {
        let canonical = normalize(Some(path));
        Self(blake3::hash(canonical.as_bytes()))
    }

    /// Parses the 64-character hex form produced by `Display`.
    pub fn from_hex(hex: &str) -> Result<Self, blake3::HexError> {
        blake3::Hash::from_hex(hex).map(Self)
    }
}

impl fmt::Display for FolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.to_hex().as_str())
    }
}

impl Serialize for FolderKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FolderKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_root_spellings() {
        assert_eq!(normalize(None), "/");
        assert_eq!(normalize(Some("")), "/");
        assert_eq!(normalize(Some("  ")), "/");
        assert_eq!(normalize(Some("/")), "/");
        assert_eq!(normalize(Some("//")), "/");
    }

    #[test]
    fn normalize_trims_and_prefixes() {
        assert_eq!(normalize(Some("/Contracts/")), "/Contracts");
        assert_eq!(normalize(Some("Contracts/2024")), "/Contracts/2024");
        assert_eq!(normalize(Some("//Contracts//2024")), "/Contracts/2024");
    }

    #[test]
    fn parent_derivation() {
        assert_eq!(parent_of("/A/B/C"), "/A/B");
        assert_eq!(parent_of("/A"), "/");
        assert_eq!(parent_of("/"), "/");
        assert_eq!(parent_of("A/B"), "/A");
    }

    #[test]
    fn names_and_joins() {
        assert_eq!(name_of("/Contracts/2024"), "2024");
        assert_eq!(name_of("/"), "/");
        assert_eq!(join("/Contracts", "2025"), "/Contracts/2025");
        assert_eq!(join("/", "Contracts"), "/Contracts");
    }

    #[test]
    fn destination_normalization() {
        assert_eq!(normalize_destination(""), "/");
        assert_eq!(normalize_destination("sub"), "/sub");
        assert_eq!(normalize_destination("/sub/"), "/sub");
    }

    #[test]
    fn within_compares_whole_segments() {
        assert!(is_within("/Contracts/2024", "/Contracts"));
        assert!(is_within("/Contracts", "/Contracts"));
        assert!(is_within("/anything", "/"));
        assert!(!is_within("/Contracts2", "/Contracts"));
        assert!(!is_within("/Contracts", "/Contracts/2024"));
    }

    #[test]
    fn rebase_moves_subtrees() {
        assert_eq!(
            rebase("/Old/2024/Q1", "/Old", "/New").as_deref(),
            Some("/New/2024/Q1")
        );
        assert_eq!(rebase("/Old", "/Old", "/New").as_deref(), Some("/New"));
        assert_eq!(rebase("/Other", "/Old", "/New"), None);
    }

    #[test]
    fn folder_key_is_spelling_independent() {
        assert_eq!(FolderKey::of("/A/B/"), FolderKey::of("A/B"));
        assert_ne!(FolderKey::of("/A/B"), FolderKey::of("/A/C"));
        let key = FolderKey::of("/Contracts");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(serde_json::from_str::<FolderKey>(&json).unwrap(), key);
        assert_eq!(key.to_string().len(), 64);
    }

    #[test]
    fn folder_key_rejects_non_hex() {
        let signed = format!("\"{}\"", "+f".repeat(32));
        assert!(serde_json::from_str::<FolderKey>(&signed).is_err());
        let short = format!("\"{}\"", "ab".repeat(16));
        assert!(serde_json::from_str::<FolderKey>(&short).is_err());
        assert!(FolderKey::from_hex(&"zz".repeat(32)).is_err());
        let key = FolderKey::of("/Contracts");
        assert_eq!(FolderKey::from_hex(&key.to_string()).unwrap(), key);
    }
}
