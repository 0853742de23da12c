//! Content-scan path recovery
//!
//! Fallback for assets whose headers carry no usable paths: scan the
//! decompressed bytes for separator-led printable runs and score them
//! against the asset stem.

use tracing::trace;

use super::{derive_dir, normalize_candidate};

/// Longest run of bytes considered one candidate.
const MAX_CANDIDATE_LEN: usize = 512;

/// A candidate must contain at least this many path separators.
const MIN_SEPARATORS: usize = 2;

/// Recover a directory suggestion by scanning the payload bytes.
pub fn from_content(payload: &[u8], stem: &str) -> Option<String> {
    let mut best: Option<(i64, String)> = None;

    let mut i = 0usize;
    while i < payload.len() {
        let b = payload[i];
        if b != b'/' && b != b'\\' {
            i += 1;
            continue;
        }

        let start = i;
        let mut end = i;
        while end < payload.len() && end - start < MAX_CANDIDATE_LEN && is_path_byte(payload[end])
        {
            end += 1;
        }
        let run = &payload[start..end];
        i = end.max(start + 1);

        let separators = run.iter().filter(|&&b| b == b'/' || b == b'\\').count();
        if separators < MIN_SEPARATORS {
            continue;
        }
        let Ok(text) = std::str::from_utf8(run) else {
            continue;
        };

        let candidate = normalize_candidate(text);
        let candidate_score = score(&candidate, stem);
        if best.as_ref().is_none_or(|(top, _)| candidate_score > *top) {
            best = Some((candidate_score, candidate));
        }
    }

    let (_, winner) = best?;
    let dir = derive_dir(&winner, stem)?;
    trace!("content recovery for {stem}: {winner} -> {dir}");
    Some(dir)
}

/// Printable, non-quote, non-whitespace.
fn is_path_byte(b: u8) -> bool {
    b.is_ascii_graphic() && b != b'"' && b != b'\''
}

fn score(candidate: &str, stem: &str) -> i64 {
    let mut total = 0i64;
    let suffix = format!("/{}", stem.to_ascii_lowercase());
    if candidate.to_ascii_lowercase().ends_with(&suffix) {
        total += 10;
    }
    total += candidate.matches('/').count() as i64;
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_stem_matching_path() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0u8, 1, 2]);
        payload.extend_from_slice(b"/Engine/Transient/Deep/Nested/Junk ");
        payload.extend_from_slice(&[0xFF, 0x00]);
        payload.extend_from_slice(b"\\Game\\World\\Rocks\\BigRock\0");
        payload.extend_from_slice(&[7u8; 16]);

        let dir = from_content(&payload, "BigRock").expect("recovered");
        assert_eq!(dir, "/Game/World/Rocks");
    }

    #[test]
    fn test_requires_two_separators() {
        let payload = b"ratio 1/2 looks like a path but is not";
        assert!(from_content(payload, "X").is_none());
    }

    #[test]
    fn test_candidates_stop_at_quotes_and_whitespace() {
        let payload = b"path=\"/Game/Props/Crate\" rest";
        let dir = from_content(payload, "Crate").expect("recovered");
        assert_eq!(dir, "/Game/Props");
    }

    #[test]
    fn test_duplicate_suffix_trimmed() {
        let payload = b"ref /Game/Props/Crate.Crate end";
        let dir = from_content(payload, "Crate").expect("recovered");
        assert_eq!(dir, "/Game/Props");
    }

    #[test]
    fn test_empty_payload() {
        assert!(from_content(&[], "X").is_none());
    }
}
