//! Extraction options

use std::path::PathBuf;

/// Filter applied to messages forwarded to the host's log callback.
///
/// The side log file in the output directory always receives the full
/// trace; this level only throttles the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Every message.
    #[default]
    Full,
    /// Warnings, errors, and the completion line.
    Warnings,
    /// Errors and the completion line.
    Error,
    /// Only the completion line.
    Minimal,
    /// Nothing.
    Silent,
    /// Nothing (alias kept for host configuration compatibility).
    None,
}

/// Configuration record consumed by the extraction driver.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Destination root; created if absent.
    pub output_dir: PathBuf,
    /// Recover asset paths from package headers.
    pub enable_header_path: bool,
    /// Fall back to scanning decompressed bytes for paths.
    pub enable_content_path: bool,
    /// Skip Wwise audio outputs; also enables localization skipping.
    pub skip_wem_files: bool,
    /// Skip Bink video files (.bik / .bk2).
    pub skip_bink_files: bool,
    /// Pre-scan the output tree and skip entries already present.
    pub skip_existing_files: bool,
    /// Skip .res / .ace entries.
    pub skip_res_and_ace: bool,
    /// Skip configuration-format entries.
    pub skip_config_files: bool,
    /// Emit only asset, map, and bulk families; implies all other skips.
    pub only_assets: bool,
    /// Host log callback filter.
    pub log_level: LogLevel,
}

impl ExtractOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            enable_header_path: true,
            enable_content_path: true,
            skip_wem_files: false,
            skip_bink_files: false,
            skip_existing_files: false,
            skip_res_and_ace: false,
            skip_config_files: false,
            only_assets: false,
            log_level: LogLevel::Full,
        }
    }

    // Only-assets mode implies every other skip toggle.

    pub fn skips_res_and_ace(&self) -> bool {
        self.only_assets || self.skip_res_and_ace
    }

    pub fn skips_configs(&self) -> bool {
        self.only_assets || self.skip_config_files
    }

    pub fn skips_bink(&self) -> bool {
        self.only_assets || self.skip_bink_files
    }

    pub fn skips_wem(&self) -> bool {
        self.only_assets || self.skip_wem_files
    }

    /// Localization skipping rides on the Wwise toggle.
    pub fn skips_localized(&self) -> bool {
        self.only_assets || self.skip_wem_files
    }

    pub fn skips_existing(&self) -> bool {
        self.only_assets || self.skip_existing_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_assets_implies_other_skips() {
        let mut opts = ExtractOptions::new("out");
        assert!(!opts.skips_configs());
        assert!(!opts.skips_localized());

        opts.only_assets = true;
        assert!(opts.skips_res_and_ace());
        assert!(opts.skips_configs());
        assert!(opts.skips_bink());
        assert!(opts.skips_wem());
        assert!(opts.skips_localized());
        assert!(opts.skips_existing());
    }
}
