//! Extraction driver
//!
//! One strictly sequential pass over the name table: filter, assemble,
//! recover, route, write; then the bulk reconcile pass. Every
//! per-entry fault is caught, logged, and skipped; only a malformed
//! index or an unusable output directory aborts the run. Container
//! handles are released on every exit path.

use std::fs;
use std::path::Path;

use b2_archive::{ArchiveError, ContainerCache, IndexFile, NameRecord, assemble};
use oodle_lz::{LzCodec, OodleLz};
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::events::EventSink;
use crate::existing::ExistingIndex;
use crate::options::ExtractOptions;
use crate::reconcile;
use crate::recover;
use crate::route::{self, Route, Router, StemMemo, UsedPaths, unique_path};

/// Totals reported at the end of a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
    pub directories: u64,
    pub bulk_rehomed: u64,
}

/// Run-scoped state: created at run start, released at run end.
struct RunState {
    containers: ContainerCache,
    materials: StemMemo,
    used: UsedPaths,
    existing: ExistingIndex,
    summary: RunSummary,
}

/// Extracts one index/container pair into an output directory.
pub struct Extractor {
    options: ExtractOptions,
    sink: EventSink,
    codec: Box<dyn LzCodec>,
}

impl Extractor {
    /// Extractor with the native Oodle codec (or its disabled fallback).
    pub fn new(options: ExtractOptions) -> Self {
        Self::with_codec(options, Box::new(OodleLz::load()))
    }

    /// Extractor with an injected codec, for tests and hosts that
    /// manage the library themselves.
    pub fn with_codec(options: ExtractOptions, codec: Box<dyn LzCodec>) -> Self {
        let sink = EventSink::new(options.log_level);
        Self {
            options,
            sink,
            codec,
        }
    }

    /// Install the advisory progress callback (0 to 100).
    pub fn on_progress(mut self, callback: impl Fn(f64) + Send + 'static) -> Self {
        self.sink.set_progress(callback);
        self
    }

    /// Install the log callback; messages are filtered by the
    /// configured [`crate::LogLevel`].
    pub fn on_log(mut self, callback: impl Fn(&str) + Send + 'static) -> Self {
        self.sink.set_log(callback);
        self
    }

    /// Run the full extraction.
    pub fn run(&mut self, index_path: &Path) -> Result<RunSummary> {
        fs::create_dir_all(&self.options.output_dir).map_err(|source| {
            ExtractError::OutputDir {
                path: self.options.output_dir.clone(),
                source,
            }
        })?;
        let log_path = self
            .sink
            .open_side_log(&self.options.output_dir)
            .map_err(|source| ExtractError::OutputDir {
                path: self.options.output_dir.clone(),
                source,
            })?;
        debug!("side log at {}", log_path.display());

        let index = match IndexFile::open(index_path) {
            Ok(index) => index,
            Err(e) => {
                self.sink
                    .log(&format!("💥 Cannot read index {}: {e}", index_path.display()));
                self.sink.finish();
                return Err(e.into());
            }
        };

        let names = index.names();
        let file_count = names.iter().filter(|r| !r.is_dir).count();
        self.sink.log(&format!(
            "📦 Extracting {file_count} entries from {}",
            index_path.display()
        ));

        let existing = if self.options.skips_existing() {
            ExistingIndex::scan(&self.options.output_dir)
        } else {
            ExistingIndex::empty()
        };

        let mut state = RunState {
            containers: ContainerCache::new(),
            materials: StemMemo::default(),
            used: UsedPaths::default(),
            existing,
            summary: RunSummary::default(),
        };

        let total = names.len().max(1) as f64;
        for (i, record) in names.iter().enumerate() {
            self.sink.progress(i as f64 / total * 100.0);
            if let Err(e) = self.process_record(&index, record, &mut state) {
                state.summary.failed += 1;
                self.sink.log(&format!("⚠️ {}: {e}", record.name));
            }
        }
        self.sink.progress(100.0);

        // Handles are released before the reconcile pass touches disk,
        // and regardless of how the loop went.
        state.containers.close_all();

        match reconcile::reconcile_bulks(
            &self.options.output_dir,
            &mut state.materials,
            &mut self.sink,
        ) {
            Ok(stats) => state.summary.bulk_rehomed = stats.moved,
            Err(e) => self.sink.log(&format!("⚠️ Bulk reconcile failed: {e}")),
        }

        let summary = state.summary;
        self.sink.log(&format!(
            "✅ Done: {} written, {} skipped, {} failed, {} bulk rehomed",
            summary.written, summary.skipped, summary.failed, summary.bulk_rehomed
        ));
        self.sink.finish();
        Ok(summary)
    }

    fn process_record(
        &mut self,
        index: &IndexFile,
        record: &NameRecord,
        state: &mut RunState,
    ) -> std::result::Result<(), ArchiveError> {
        let router = Router::new(&self.options, &state.existing);

        if record.is_dir {
            match router.route_directory(&record.name) {
                Route::Directory(path) => {
                    fs::create_dir_all(&path)?;
                    state.summary.directories += 1;
                    self.sink.log(&format!("📁 {}", path.display()));
                }
                _ => {
                    state.summary.skipped += 1;
                }
            }
            return Ok(());
        }

        // Cheap name-only filters before any index or container reads.
        if let Some(reason) = router.prefilter_name(&record.name) {
            state.summary.skipped += 1;
            self.sink
                .log(&format!("⏭️ Skipping ({reason}): {}", record.name));
            return Ok(());
        }

        let row = index.entry_row(record.entry_index)?;
        let layout = index.entry_layout(record.entry_index, &row)?;

        if let Some(reason) = router.prefilter_container(&record.name, &layout.container_path) {
            state.summary.skipped += 1;
            self.sink
                .log(&format!("⏭️ Skipping ({reason}): {}", record.name));
            return Ok(());
        }

        let window = assemble(
            &mut state.containers,
            self.codec.as_mut(),
            &layout.container_path,
            &layout.chunks,
            layout.needed(&row),
        )?;
        let payload = window.payload(row.abs_offset as u64, row.abs_size as u64)?;

        let ext = route::file_extension(&record.name);
        let stem = route::file_stem(&record.name);
        let recovery = if recover::is_asset_extension(&ext) {
            recover::recover(
                payload,
                stem,
                self.options.enable_header_path,
                self.options.enable_content_path,
            )
        } else {
            recover::Recovery::default()
        };
        if let Some(dir) = &recovery.dir {
            self.sink.log(&format!("🧭 {} -> {dir}", record.name));
        }

        let route = router.route(
            &record.name,
            &layout.container_path,
            &recovery,
            &mut state.materials,
        );
        match route {
            Route::Skip { reason } => {
                state.summary.skipped += 1;
                self.sink
                    .log(&format!("⏭️ Skipping ({reason}): {}", record.name));
            }
            Route::Directory(path) => {
                fs::create_dir_all(&path)?;
                state.summary.directories += 1;
                self.sink.log(&format!("📁 {}", path.display()));
            }
            Route::File { path, .. } => {
                // Second existing-output guard, this time on the full
                // relative path the route chose.
                if self.options.skips_existing()
                    && let Ok(rel) = path.strip_prefix(&self.options.output_dir)
                    && state.existing.contains_relative(&rel.to_string_lossy())
                {
                    state.summary.skipped += 1;
                    self.sink
                        .log(&format!("⏭️ Skipping (Existing): {}", record.name));
                    return Ok(());
                }

                let path = unique_path(&path, &state.used);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, payload)?;
                state.used.insert(&path);
                state.summary.written += 1;
                self.sink.log(&format!("✔ {}", path.display()));
            }
        }
        Ok(())
    }
}
