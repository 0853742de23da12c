//! Output path sanitization
//!
//! Recovered paths come from game data and cannot be trusted as
//! filesystem paths: they may carry drive prefixes, reserved device
//! names, separators doubling as content, or characters the platform
//! rejects. Everything routed to disk passes through here first.

/// Characters replaced with `_` in path segments.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Reserved device names (case-insensitive) prefixed with `_`.
const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Sanitize a recovered path into a safe forward-slash relative path.
///
/// Strips drive prefixes and leading slashes, drops empty and
/// dots-only segments, replaces invalid characters, and defuses
/// reserved device names. Returns an empty string when nothing
/// survives.
pub fn sanitize_relative(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let rest = strip_drive(&normalized);

    let mut segments: Vec<String> = Vec::new();
    for segment in rest.split('/') {
        if segment.is_empty() || segment.chars().all(|c| c == '.') {
            continue;
        }

        let mut cleaned: String = segment
            .chars()
            .map(|c| {
                if c.is_control() || INVALID_CHARS.contains(&c) {
                    '_'
                } else {
                    c
                }
            })
            .collect();

        let bare = cleaned
            .split('.')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        if RESERVED_NAMES.contains(&bare.as_str()) {
            cleaned.insert(0, '_');
        }

        segments.push(cleaned);
    }

    segments.join("/")
}

fn strip_drive(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &s[2..]
    } else {
        s
    }
}
