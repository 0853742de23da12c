//! Bulk reconcile pass
//!
//! Bulk satellites extracted before their owning asset wait in the
//! `_ubulks` staging directory. After the main loop this pass rescans
//! the output tree, rebuilds the material memo from what is actually
//! on disk, and moves each staged bulk next to its owner. Bulk stems
//! often carry trailing indices (`X_01.ubulk`, `X.LOD2.ubulk`) that
//! the owning asset's stem lacks, so matching strips up to three such
//! suffixes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::events::EventSink;
use crate::route::{self, BULK_STAGING_DIR, StemMemo, UsedPaths, unique_path};

/// Trailing index-like suffix: `_01`, `-2`, `.7`, `_LOD3`, ...
static INDEX_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([_\-.](lod)?\d+)$").expect("valid suffix pattern"));

/// Suffix-stripping attempts per bulk file.
const MAX_SUFFIX_STRIPS: usize = 3;

/// Totals from one reconcile pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileStats {
    pub moved: u64,
    pub unmatched: u64,
}

/// Rescan the output tree and rehome staged bulk files.
pub fn reconcile_bulks(
    output_root: &Path,
    materials: &mut StemMemo,
    sink: &mut EventSink,
) -> std::io::Result<ReconcileStats> {
    let mut all_assets = StemMemo::default();

    for entry in WalkDir::new(output_root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let ext = route::file_extension(name);
        if ext != "uasset" && ext != "uasset2" {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let stem = route::file_stem(name);
        all_assets.insert(stem, dir.to_path_buf());

        if materials.get(stem).is_none() {
            let rel_dir = dir
                .strip_prefix(output_root)
                .unwrap_or(dir)
                .to_string_lossy()
                .replace('\\', "/");
            if route::material_by_name(stem, &rel_dir) {
                materials.insert(stem, dir.to_path_buf());
            }
        }
    }
    debug!(
        "reconcile: {} material stem(s), {} asset stem(s) on disk",
        materials.len(),
        all_assets.len()
    );

    let mut stats = ReconcileStats::default();
    let staging = output_root.join(BULK_STAGING_DIR);
    if !staging.is_dir() {
        return Ok(stats);
    }

    let used = UsedPaths::default();
    for entry in fs::read_dir(&staging)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };

        let stem = route::file_stem(name);
        let Some(owner_dir) = find_owner(stem, materials, &all_assets) else {
            stats.unmatched += 1;
            continue;
        };

        let dest = unique_path(&owner_dir.join(name), &used);
        match fs::rename(entry.path(), &dest) {
            Ok(()) => {
                sink.log(&format!("🗃️ Rehomed {name} -> {}", dest.display()));
                stats.moved += 1;
            }
            Err(e) => {
                sink.log(&format!("⚠️ Could not rehome {name}: {e}"));
            }
        }
    }

    if fs::read_dir(&staging)?.next().is_none() {
        fs::remove_dir(&staging)?;
        debug!("removed empty bulk staging directory");
    }

    Ok(stats)
}

/// Try the material memo first, then every asset: exact stem, then
/// progressively suffix-stripped variants.
fn find_owner(stem: &str, materials: &StemMemo, all_assets: &StemMemo) -> Option<PathBuf> {
    let variants = stem_variants(stem);
    for memo in [materials, all_assets] {
        for variant in &variants {
            if let Some(dir) = memo.get(variant) {
                return Some(dir.clone());
            }
        }
    }
    None
}

fn stem_variants(stem: &str) -> Vec<String> {
    let mut variants = vec![stem.to_string()];
    let mut current = stem.to_string();
    for _ in 0..MAX_SUFFIX_STRIPS {
        let stripped = INDEX_SUFFIX.replace(&current, "").to_string();
        if stripped == current || stripped.is_empty() {
            break;
        }
        variants.push(stripped.clone());
        current = stripped;
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LogLevel;

    fn silent_sink() -> EventSink {
        EventSink::new(LogLevel::Silent)
    }

    #[test]
    fn test_stem_variants() {
        assert_eq!(stem_variants("X"), vec!["X"]);
        assert_eq!(stem_variants("X_01"), vec!["X_01", "X"]);
        assert_eq!(stem_variants("X_lod2"), vec!["X_lod2", "X"]);
        assert_eq!(stem_variants("X.LOD2"), vec!["X.LOD2", "X"]);
        assert_eq!(stem_variants("X-1_2.3"), vec!["X-1_2.3", "X-1_2", "X-1", "X"]);
        // A fourth suffix survives the three allowed strips.
        assert_eq!(
            stem_variants("X_1_2_3_4"),
            vec!["X_1_2_3_4", "X_1_2_3", "X_1_2", "X_1"]
        );
    }

    #[test]
    fn test_orphan_rescue_and_staging_removal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("Materials")).expect("mkdir");
        fs::create_dir_all(root.join(BULK_STAGING_DIR)).expect("mkdir");
        fs::write(root.join("Materials/M_Rock.uasset"), b"asset").expect("write");
        fs::write(root.join(BULK_STAGING_DIR).join("M_Rock.ubulk"), b"bulk").expect("write");
        fs::write(root.join(BULK_STAGING_DIR).join("M_Rock_01.ubulk"), b"bulk1").expect("write");

        let mut materials = StemMemo::default();
        let mut sink = silent_sink();
        let stats = reconcile_bulks(root, &mut materials, &mut sink).expect("reconcile");

        assert_eq!(stats.moved, 2);
        assert_eq!(stats.unmatched, 0);
        assert!(root.join("Materials/M_Rock.ubulk").is_file());
        assert!(root.join("Materials/M_Rock_01.ubulk").is_file());
        assert!(!root.join(BULK_STAGING_DIR).exists());
    }

    #[test]
    fn test_unmatched_bulk_stays_staged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join(BULK_STAGING_DIR)).expect("mkdir");
        fs::write(root.join(BULK_STAGING_DIR).join("Orphan.ubulk"), b"bulk").expect("write");

        let mut materials = StemMemo::default();
        let mut sink = silent_sink();
        let stats = reconcile_bulks(root, &mut materials, &mut sink).expect("reconcile");

        assert_eq!(stats.moved, 0);
        assert_eq!(stats.unmatched, 1);
        assert!(root.join(BULK_STAGING_DIR).join("Orphan.ubulk").is_file());
    }

    #[test]
    fn test_non_material_asset_still_owns_bulk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("misc")).expect("mkdir");
        fs::create_dir_all(root.join(BULK_STAGING_DIR)).expect("mkdir");
        fs::write(root.join("misc/Tree.uasset"), b"asset").expect("write");
        fs::write(root.join(BULK_STAGING_DIR).join("Tree_2.ubulk"), b"bulk").expect("write");

        let mut materials = StemMemo::default();
        let mut sink = silent_sink();
        let stats = reconcile_bulks(root, &mut materials, &mut sink).expect("reconcile");

        assert_eq!(stats.moved, 1);
        assert!(root.join("misc/Tree_2.ubulk").is_file());
        // "Tree" has no material marker, so it lands in the all-assets
        // memo only.
        assert!(materials.get("tree").is_none());
    }
}
