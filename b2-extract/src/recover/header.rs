//! Header-based path recovery
//!
//! Walks the asset package summary far enough to reach the folder name
//! and the name table, then scores path-like names against the asset's
//! own stem. The summary walk is strictly best-effort: any truncation
//! or garbage field abandons the strategy instead of failing the entry.

use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::trace;

use super::strings::read_prefixed_string;
use super::{AssetClass, derive_dir, last_segment, normalize_candidate};

/// Version pair that introduces the custom-version block and an extra
/// post-summary skip.
const CUSTOM_VERSION_PAIR: (i32, i32) = (502, 67);

/// Legacy marker that suppresses the optional engine-version int.
const LEGACY_NO_ENGINE_VERSION: i32 = -4;

/// Engine versions above this carry localization and gatherable-text
/// metadata in the summary.
const GATHERABLE_TEXT_VERSION: i32 = 459;

/// Bytes per custom-version record (five i32 fields).
const CUSTOM_VERSION_RECORD_SIZE: i64 = 20;

/// Caps applied to counts read from possibly corrupt headers.
const MAX_CUSTOM_VERSIONS: i32 = 4096;
const MAX_NAMES: i32 = 262_144;

struct Summary {
    folder_name: Option<String>,
    name_count: i32,
    name_offset: i32,
}

/// Result of the header strategy: the summary parsed, the names were
/// scanned, and a directory may or may not have fallen out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderScan {
    pub dir: Option<String>,
    pub class: AssetClass,
}

/// Scan an asset header; `None` when the summary itself is unusable.
pub fn from_header(payload: &[u8], stem: &str) -> Option<HeaderScan> {
    let mut cursor = Cursor::new(payload);
    let summary = parse_summary(&mut cursor)?;
    let names = scan_names(payload, &summary);
    let class = classify(&names);

    let mut candidates: Vec<String> = names
        .iter()
        .map(|n| normalize_candidate(n))
        .filter(|n| n.contains('/'))
        .collect();
    if let Some(folder) = &summary.folder_name {
        let folder = normalize_candidate(folder);
        if folder.contains('/') {
            candidates.push(folder);
        }
    }

    let dir = candidates
        .iter()
        .max_by_key(|c| score(c, stem, class))
        .and_then(|winner| {
            let dir = derive_dir(winner, stem);
            trace!("header recovery for {stem}: {winner} -> {dir:?} ({class:?})");
            dir
        });
    Some(HeaderScan { dir, class })
}

/// Walk the package summary up to the export table metadata.
fn parse_summary(cursor: &mut Cursor<&[u8]>) -> Option<Summary> {
    let _tag = cursor.read_u32::<LittleEndian>().ok()?;

    let legacy = cursor.read_i32::<LittleEndian>().ok()?;
    if legacy < 0 && legacy != LEGACY_NO_ENGINE_VERSION {
        let _legacy_engine = cursor.read_i32::<LittleEndian>().ok()?;
    }

    let version = cursor.read_i32::<LittleEndian>().ok()?;
    let licensee = cursor.read_i32::<LittleEndian>().ok()?;
    let custom_layout = (version, licensee) == CUSTOM_VERSION_PAIR;
    if custom_layout {
        let count = cursor.read_i32::<LittleEndian>().ok()?;
        if !(0..=MAX_CUSTOM_VERSIONS).contains(&count) {
            return None;
        }
        cursor
            .seek(SeekFrom::Current(i64::from(count) * CUSTOM_VERSION_RECORD_SIZE))
            .ok()?;
    }

    let _total_header_size = cursor.read_i32::<LittleEndian>().ok()?;

    let folder_name = read_prefixed_string(cursor)?;
    let folder_name = (!folder_name.is_empty()).then_some(folder_name);

    let _package_flags = cursor.read_u32::<LittleEndian>().ok()?;

    // The name count/offset pair appears in either order; both are
    // positive in well-formed files, so a non-positive first int means
    // the pair is swapped.
    let first = cursor.read_i32::<LittleEndian>().ok()?;
    let second = cursor.read_i32::<LittleEndian>().ok()?;
    let (name_count, name_offset) = if first > 0 && second > 0 {
        (first, second)
    } else {
        (second, first)
    };

    if version > GATHERABLE_TEXT_VERSION {
        read_prefixed_string(cursor)?; // localization id
        cursor.seek(SeekFrom::Current(8)).ok()?; // gatherable text count/offset
    }
    if custom_layout {
        cursor.seek(SeekFrom::Current(4)).ok()?;
    }

    let export_count = cursor.read_i32::<LittleEndian>().ok()?;
    let _export_offset = cursor.read_i32::<LittleEndian>().ok()?;
    let import_count = cursor.read_i32::<LittleEndian>().ok()?;
    let _import_offset = cursor.read_i32::<LittleEndian>().ok()?;
    trace!(
        "summary: names={name_count}@{name_offset}, exports={export_count}, imports={import_count}"
    );

    Some(Summary {
        folder_name,
        name_count,
        name_offset,
    })
}

/// Read the name table at its absolute offset: length-prefixed strings
/// each followed by 4 bytes of auxiliary data.
fn scan_names(payload: &[u8], summary: &Summary) -> Vec<String> {
    if summary.name_count <= 0 || summary.name_offset <= 0 {
        return Vec::new();
    }
    let offset = summary.name_offset as usize;
    if offset >= payload.len() {
        return Vec::new();
    }

    let count = summary.name_count.min(MAX_NAMES);
    let mut cursor = Cursor::new(&payload[offset..]);
    let mut names = Vec::new();
    for _ in 0..count {
        let Some(name) = read_prefixed_string(&mut cursor) else {
            break;
        };
        if !name.is_empty() {
            names.push(name);
        }
        if cursor.seek(SeekFrom::Current(4)).is_err() {
            break;
        }
    }
    names
}

const MATERIAL_TOKENS: &[&str] = &["materialexpression", "texture2d", "shader", "material"];
const MESH_TOKENS: &[&str] = &["agggeom", "staticmesh", "skeletalmesh"];

fn classify(names: &[String]) -> AssetClass {
    let lowered: Vec<String> = names.iter().map(|n| n.to_ascii_lowercase()).collect();
    if lowered
        .iter()
        .any(|n| MATERIAL_TOKENS.iter().any(|t| n.contains(t)))
    {
        return AssetClass::Material;
    }
    if lowered
        .iter()
        .any(|n| MESH_TOKENS.iter().any(|t| n.contains(t)))
    {
        return AssetClass::Mesh;
    }
    AssetClass::Unknown
}

fn score(candidate: &str, stem: &str, class: AssetClass) -> i64 {
    let mut total = 0i64;
    if last_segment(candidate).eq_ignore_ascii_case(stem) {
        total += 5;
    }
    if candidate.starts_with('/') {
        total += 3;
    }
    if candidate.contains("/Game/") || candidate.contains("/Engine/") {
        total += 2;
    }
    let class_token = match class {
        AssetClass::Material => Some("material"),
        AssetClass::Mesh => Some("mesh"),
        AssetClass::Unknown => None,
    };
    if class_token.is_some_and(|t| candidate.to_ascii_lowercase().contains(t)) {
        total += 2;
    }
    total += (candidate.matches('/').count() as i64).min(10);
    total += (candidate.len() as i64).min(10);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::asset_header;

    #[test]
    fn test_folder_name_recovery() {
        let payload = asset_header("/Game/Props/", &["M_Foo", "/Script/CoreUObject"]);
        let found = from_header(&payload, "M_Foo").expect("recovered");
        assert_eq!(found.dir.as_deref(), Some("/Game/Props"));
    }

    #[test]
    fn test_stem_matching_name_wins_over_folder() {
        let payload = asset_header(
            "/Game/Fallback/",
            &["/Game/World/Rocks/SM_Boulder", "StaticMesh"],
        );
        let found = from_header(&payload, "SM_Boulder").expect("recovered");
        assert_eq!(found.dir.as_deref(), Some("/Game/World/Rocks"));
        assert_eq!(found.class, AssetClass::Mesh);
    }

    #[test]
    fn test_material_classification() {
        let payload = asset_header("/Game/Surfaces/", &["MaterialExpressionScalar", "M_Stone"]);
        let found = from_header(&payload, "M_Stone").expect("recovered");
        assert_eq!(found.class, AssetClass::Material);
    }

    #[test]
    fn test_classification_survives_without_candidates() {
        let payload = asset_header("", &["Texture2D", "Default__Thing"]);
        let found = from_header(&payload, "T_Wood").expect("parsed");
        assert!(found.dir.is_none());
        assert_eq!(found.class, AssetClass::Material);
    }

    #[test]
    fn test_swapped_name_pair_is_accepted() {
        let mut payload = asset_header("/Game/Props/", &["M_Foo"]);
        // The pair sits after: tag(4) legacy(4) version(8) custom-count(4)
        // header-size(4) folder(4 + len + 1) flags(4).
        let folder = "/Game/Props/";
        let pair_pos = 4 + 4 + 8 + 4 + 4 + (4 + folder.len() + 1) + 4;
        let count = i32::from_le_bytes(payload[pair_pos..pair_pos + 4].try_into().unwrap());
        let offset = i32::from_le_bytes(payload[pair_pos + 4..pair_pos + 8].try_into().unwrap());
        // Both ints positive but reversed: the reader takes them in
        // stored order, finds no usable names, and must not panic.
        payload[pair_pos..pair_pos + 4].copy_from_slice(&offset.to_le_bytes());
        payload[pair_pos + 4..pair_pos + 8].copy_from_slice(&count.to_le_bytes());
        let _ = from_header(&payload, "M_Foo");

        // Now a genuinely swapped pair with a non-positive second int.
        let mut payload = asset_header("/Game/Props/", &["M_Foo"]);
        payload[pair_pos..pair_pos + 4].copy_from_slice(&offset.to_le_bytes());
        payload[pair_pos + 4..pair_pos + 8].copy_from_slice(&0i32.to_le_bytes());
        // Pair (offset, 0) swaps to count=0, offset=offset: names empty,
        // folder name still recovers the directory.
        let found = from_header(&payload, "M_Foo").expect("recovered");
        assert_eq!(found.dir.as_deref(), Some("/Game/Props"));
    }

    #[test]
    fn test_garbage_payload_yields_none() {
        assert!(from_header(b"tiny", "X").is_none());
    }
}
