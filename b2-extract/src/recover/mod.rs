//! Asset path recovery
//!
//! Two independent heuristics reconstruct where an asset originally
//! lived: parsing the asset header's folder name and name table
//! ([`from_header`]), and scanning the decompressed bytes for path-like
//! strings ([`from_content`]). The driver runs them in that order and
//! takes the first directory produced. Both suggest a *directory*; the
//! output filename is always the entry's own stem plus its original
//! extension. Classification from the header's name tokens is kept
//! even when no directory could be recovered, because the router's
//! material handling depends on it.

mod content;
mod header;
pub mod sanitize;
mod strings;

pub use content::from_content;
pub use header::{HeaderScan, from_header};

/// Coarse classification from name-table tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetClass {
    Material,
    Mesh,
    #[default]
    Unknown,
}

/// Combined result of the recovery strategies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recovery {
    /// Suggested directory (forward-slash, relative once sanitized).
    pub dir: Option<String>,
    /// Classification from the header scan, if it ran.
    pub class: AssetClass,
}

/// Extensions whose payloads carry a parseable asset header.
pub const ASSET_EXTENSIONS: &[&str] = &["uasset", "uasset2", "umap"];

/// Whether `ext` (lowercase or not) is in the asset family.
pub fn is_asset_extension(ext: &str) -> bool {
    ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Run the enabled strategies in order for an asset-family payload.
pub fn recover(
    payload: &[u8],
    stem: &str,
    header_enabled: bool,
    content_enabled: bool,
) -> Recovery {
    let mut class = AssetClass::Unknown;

    if header_enabled
        && let Some(scan) = from_header(payload, stem)
    {
        class = scan.class;
        if scan.dir.is_some() {
            return Recovery {
                dir: scan.dir,
                class,
            };
        }
    }

    if content_enabled
        && let Some(dir) = from_content(payload, stem)
    {
        return Recovery {
            dir: Some(dir),
            class,
        };
    }

    Recovery { dir: None, class }
}

// Candidate handling shared by both strategies.

/// Normalize separators, collapse doubled leading slashes, and strip a
/// `Foo/Bar.Bar` duplicate suffix.
pub(crate) fn normalize_candidate(raw: &str) -> String {
    let mut s = raw.replace('\\', "/");
    while s.starts_with("//") {
        s.remove(0);
    }
    trim_duplicate_suffix(&s)
}

fn trim_duplicate_suffix(s: &str) -> String {
    if let Some((path, tail)) = s.rsplit_once('.') {
        let last = path.rsplit('/').next().unwrap_or(path);
        if !tail.is_empty() && last.eq_ignore_ascii_case(tail) {
            return path.to_string();
        }
    }
    s.to_string()
}

pub(crate) fn last_segment(s: &str) -> &str {
    s.trim_end_matches('/').rsplit('/').next().unwrap_or(s)
}

/// Derive the suggested directory from a winning candidate.
///
/// A candidate ending in the asset stem contributes its parent; a
/// trailing slash marks the candidate as already being a directory;
/// anything else is taken as a directory whole.
pub(crate) fn derive_dir(winner: &str, stem: &str) -> Option<String> {
    let trimmed = winner.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let dir = if winner.ends_with('/') {
        trimmed
    } else if last_segment(trimmed).eq_ignore_ascii_case(stem) {
        match trimmed.rsplit_once('/') {
            Some((parent, _)) => parent,
            None => return None,
        }
    } else {
        trimmed
    };

    if dir.chars().all(|c| c == '/') {
        None
    } else {
        Some(dir.to_string())
    }
}
