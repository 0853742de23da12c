//! Per-entry output routing
//!
//! Applies the skip filters and placement rules in priority order and
//! remembers where material assets land so their bulk satellites can
//! be placed (or later reconciled) next to them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::existing::ExistingIndex;
use crate::options::ExtractOptions;
use crate::recover::sanitize::sanitize_relative;
use crate::recover::{AssetClass, Recovery, is_asset_extension};

/// Staging directory for bulk files whose owner is not yet known.
pub const BULK_STAGING_DIR: &str = "_ubulks";

/// Directory for configuration-format files.
pub const CONFIG_DIR: &str = "Configs";

/// Default directory for materials without a recovered path.
pub const MATERIAL_DIR: &str = "Materials";

/// Default directory for everything else without a recovered path.
pub const MISC_DIR: &str = "misc";

const CONFIG_EXTENSIONS: &[&str] = &[
    "ini", "json", "cfg", "xml", "toml", "yaml", "yml", "properties", "conf",
];

const LOCALIZATION_TOKENS: &[&str] = &[
    "localized",
    "unlocalized",
    "localisation",
    "localization",
    "loc",
];

/// Two- and four-letter language segments treated as localization markers.
const LANGUAGE_SEGMENTS: &[&str] = &[
    "en", "fr", "de", "es", "it", "ja", "ko", "pl", "pt", "ru", "zh", "tr", "ar", "cs", "th",
    "enus", "engb", "frfr", "dede", "eses", "esmx", "itit", "jajp", "kokr", "plpl", "ptbr",
    "ruru", "zhcn", "zhtw", "trtr", "arsa", "cscz", "thth",
];

const WWISE_SEGMENTS: &[&str] = &["wwiseaudio", "wwisetriton"];

const MATERIAL_STEM_PREFIXES: &[&str] = &["M_", "MI_", "MIC_", "MF_"];

/// Routing decision for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Skip { reason: String },
    Directory(PathBuf),
    File { path: PathBuf, is_material: bool },
}

/// Case-insensitive memo of asset stems to the directory they landed in.
#[derive(Debug, Default)]
pub struct StemMemo {
    dirs: HashMap<String, PathBuf>,
}

impl StemMemo {
    pub fn insert(&mut self, stem: &str, dir: PathBuf) {
        self.dirs.insert(stem.to_ascii_lowercase(), dir);
    }

    pub fn get(&self, stem: &str) -> Option<&PathBuf> {
        self.dirs.get(&stem.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Case-insensitive set of output paths already chosen this run.
#[derive(Debug, Default)]
pub struct UsedPaths {
    set: HashSet<String>,
}

impl UsedPaths {
    fn key(path: &Path) -> String {
        path.to_string_lossy().replace('\\', "/").to_ascii_lowercase()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.set.contains(&Self::key(path))
    }

    pub fn insert(&mut self, path: &Path) {
        self.set.insert(Self::key(path));
    }
}

/// First free variant of `path`: the path itself, then `stem_1.ext`,
/// `stem_2.ext`, ... checked against both the filesystem and the paths
/// already chosen this run.
pub fn unique_path(path: &Path, used: &UsedPaths) -> PathBuf {
    if !path.exists() && !used.contains(path) {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or(Path::new(""));
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), Some(ext.to_string())),
        None => (name.to_string(), None),
    };

    let mut n = 1u32;
    loop {
        let candidate_name = match &ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = parent.join(candidate_name);
        if !candidate.exists() && !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Part of the entry name after the final separator.
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Lowercased extension of the entry's basename; empty when absent.
pub fn file_extension(name: &str) -> String {
    match base_name(name).rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Basename without its extension.
pub fn file_stem(name: &str) -> &str {
    let base = base_name(name);
    match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    }
}

/// `.ubulk` plus its numbered variants (`.ubulk0`, `.ubulk12`, ...).
pub fn is_bulk_extension(ext: &str) -> bool {
    ext.to_ascii_lowercase()
        .strip_prefix("ubulk")
        .is_some_and(|rest| rest.is_empty() || rest.chars().all(|c| c.is_ascii_digit()))
}

fn is_config_extension(ext: &str) -> bool {
    CONFIG_EXTENSIONS.contains(&ext)
}

/// Material detection by name alone: stem prefix or a materials
/// directory in the routed path. Shared with the reconcile rescan.
pub fn material_by_name(stem: &str, rel_dir: &str) -> bool {
    let upper = stem.to_ascii_uppercase();
    if MATERIAL_STEM_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return true;
    }
    format!("/{}", rel_dir.to_ascii_lowercase()).contains("/material")
}

fn has_wwise_segment(text: &str) -> bool {
    text.split(['/', '\\'])
        .any(|seg| WWISE_SEGMENTS.contains(&seg.to_ascii_lowercase().as_str()))
}

fn has_localization_token(text: &str) -> bool {
    text.split(['/', '\\', '.', '_', '-']).any(|seg| {
        let seg = seg.to_ascii_lowercase();
        LOCALIZATION_TOKENS.contains(&seg.as_str()) || LANGUAGE_SEGMENTS.contains(&seg.as_str())
    })
}

/// Applies the routing rules for one run.
pub struct Router<'a> {
    options: &'a ExtractOptions,
    existing: &'a ExistingIndex,
}

impl<'a> Router<'a> {
    pub fn new(options: &'a ExtractOptions, existing: &'a ExistingIndex) -> Self {
        Self { options, existing }
    }

    /// Name-only filters (extension toggles and the existing-output
    /// check), applicable before the entry is read.
    pub fn prefilter_name(&self, entry_name: &str) -> Option<String> {
        let name = base_name(entry_name);
        let ext = file_extension(entry_name);

        if self.options.only_assets && !is_asset_extension(&ext) && !is_bulk_extension(&ext) {
            return Some("Only Assets Mode".to_string());
        }
        if self.options.skips_res_and_ace() && matches!(ext.as_str(), "res" | "ace") {
            return Some("Res/Ace".to_string());
        }
        if self.options.skips_configs() && is_config_extension(&ext) {
            return Some("Config".to_string());
        }
        if self.options.skips_bink() && matches!(ext.as_str(), "bik" | "bk2") {
            return Some("Bink".to_string());
        }
        if self.options.skips_wem() && has_wwise_segment(entry_name) {
            return Some("Wwise".to_string());
        }
        if self.options.skips_existing() && self.existing.contains_basename(name) {
            return Some("Existing".to_string());
        }
        None
    }

    /// Localization filter; needs the resolved container name.
    pub fn prefilter_container(&self, entry_name: &str, container_path: &Path) -> Option<String> {
        if !self.options.skips_localized() {
            return None;
        }
        let container_name = container_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if has_localization_token(&container_name) || has_localization_token(entry_name) {
            return Some("Localized".to_string());
        }
        None
    }

    /// Directory records become (possibly empty) output directories.
    pub fn route_directory(&self, entry_name: &str) -> Route {
        let rel = sanitize_relative(entry_name);
        if rel.is_empty() {
            Route::Skip {
                reason: "Empty Directory Name".to_string(),
            }
        } else {
            Route::Directory(self.options.output_dir.join(rel))
        }
    }

    /// Full routing, rules in priority order. Material placements are
    /// memoized into `materials` for bulk satellites.
    pub fn route(
        &self,
        entry_name: &str,
        container_path: &Path,
        recovery: &Recovery,
        materials: &mut StemMemo,
    ) -> Route {
        let skip = |reason: String| Route::Skip { reason };

        let name = base_name(entry_name);
        let ext = file_extension(entry_name);
        let stem = file_stem(entry_name);
        let root = &self.options.output_dir;

        let suggested = recovery.dir.as_ref().and_then(|dir| {
            let rel = sanitize_relative(dir);
            (!rel.is_empty()).then_some(rel)
        });

        // Rules 1-3, now also covering the recovered directory.
        if let Some(reason) = self.prefilter_name(entry_name) {
            return skip(reason);
        }
        if self.options.skips_wem()
            && suggested.as_deref().is_some_and(has_wwise_segment)
        {
            return skip("Wwise".to_string());
        }
        if let Some(reason) = self.prefilter_container(entry_name, container_path) {
            return skip(reason);
        }

        // Rule 4: everything written must have an extension.
        if ext.is_empty() {
            return skip("No Extension".to_string());
        }

        // Rule 5: configs are collected flat.
        if is_config_extension(&ext) {
            return Route::File {
                path: root.join(CONFIG_DIR).join(name),
                is_material: false,
            };
        }

        // Rule 6: bulk satellites follow their memoized owner or stage.
        if is_bulk_extension(&ext) {
            let path = match materials.get(stem) {
                Some(dir) => dir.join(name),
                None => root.join(BULK_STAGING_DIR).join(name),
            };
            return Route::File {
                path,
                is_material: false,
            };
        }

        // Rules 7 and 8.
        let rel_dir = suggested.clone().unwrap_or_default();
        let material = is_asset_extension(&ext)
            && (recovery.class == AssetClass::Material || material_by_name(stem, &rel_dir));

        if material {
            let dir = match &suggested {
                Some(rel) => root.join(rel),
                None => root.join(MATERIAL_DIR),
            };
            materials.insert(stem, dir.clone());
            Route::File {
                path: dir.join(name),
                is_material: true,
            }
        } else {
            let dir = match &suggested {
                Some(rel) => root.join(rel),
                None => root.join(MISC_DIR),
            };
            Route::File {
                path: dir.join(name),
                is_material: false,
            }
        }
    }
}
