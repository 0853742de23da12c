//! Shared fixtures for b2 archive tests
//!
//! Provides stub codecs, a builder that writes a minimal valid
//! `.b2index` / `.b2container` pair, and a builder for synthetic asset
//! headers. The archive builder doubles as documentation of the
//! on-disk layout: header fields at fixed offsets, entry table, block
//! descriptors, size tables, archive spec, then the name table.

use std::path::{Path, PathBuf};

use oodle_lz::LzCodec;

/// "Decompress" by cycling the compressed bytes up to `len`.
///
/// Gives stub decompression a deterministic, verifiable expansion.
pub fn cycle_bytes(comp: &[u8], len: usize) -> Vec<u8> {
    if comp.is_empty() {
        return vec![0u8; len];
    }
    comp.iter().copied().cycle().take(len).collect()
}

/// Stub codec whose decompression is [`cycle_bytes`].
pub struct CycleCodec;

impl LzCodec for CycleCodec {
    fn try_decompress(&mut self, comp: &[u8], raw_len: usize) -> oodle_lz::Result<Vec<u8>> {
        Ok(cycle_bytes(comp, raw_len))
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Stub codec that always fails, like a missing Oodle runtime.
pub struct FailingCodec;

impl LzCodec for FailingCodec {
    fn try_decompress(&mut self, _comp: &[u8], _raw_len: usize) -> oodle_lz::Result<Vec<u8>> {
        Err(oodle_lz::Error::Disabled("stub codec".into()))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// One extractable file in the fixture archive.
pub struct EntrySpec {
    pub name: String,
    /// Base chunk: compressed bytes placed in the container, plus the
    /// uncompressed size recorded in the size table.
    pub base: (Vec<u8>, u64),
    /// Extra chunks following the base.
    pub extras: Vec<(Vec<u8>, u64)>,
    pub abs_offset: i32,
    pub abs_size: i32,
}

enum Record {
    File(EntrySpec),
    Dir(String),
}

/// Builds a matched `.b2index` / `.b2container` pair.
pub struct ArchiveBuilder {
    container_name: String,
    records: Vec<Record>,
}

const HEADER_SIZE: u64 = 100;

impl ArchiveBuilder {
    /// `container_name` is stored verbatim in the index; pass it
    /// without the `.b2container` extension to exercise appending.
    pub fn new(container_name: &str) -> Self {
        Self {
            container_name: container_name.to_string(),
            records: Vec::new(),
        }
    }

    /// Add a directory record to the name table.
    pub fn dir(mut self, name: &str) -> Self {
        self.records.push(Record::Dir(name.to_string()));
        self
    }

    /// Add a file entry.
    pub fn file(mut self, spec: EntrySpec) -> Self {
        self.records.push(Record::File(spec));
        self
    }

    /// Add a single store-mode entry covering all of `bytes`.
    pub fn store_file(self, name: &str, bytes: &[u8]) -> Self {
        let len = bytes.len();
        self.file(EntrySpec {
            name: name.to_string(),
            base: (bytes.to_vec(), len as u64),
            extras: Vec::new(),
            abs_offset: 0,
            abs_size: len as i32,
        })
    }

    /// Produce the index and container images.
    pub fn build(&self) -> (Vec<u8>, Vec<u8>) {
        let files: Vec<&EntrySpec> = self
            .records
            .iter()
            .filter_map(|r| match r {
                Record::File(spec) => Some(spec),
                Record::Dir(_) => None,
            })
            .collect();
        let n = files.len() as u64;

        // Container: each entry's chunks laid out contiguously.
        let mut container = Vec::new();
        let mut payload_offsets = Vec::with_capacity(files.len());
        for spec in &files {
            payload_offsets.push(container.len() as u64);
            container.extend_from_slice(&spec.base.0);
            for (comp, _) in &spec.extras {
                container.extend_from_slice(comp);
            }
        }

        // Index section offsets.
        let entry_table_offset = HEADER_SIZE;
        let blocks_offset = entry_table_offset + n * 16;
        let size_tables_offset = blocks_offset + n * 40;
        let mut size_table_offsets = Vec::with_capacity(files.len());
        let mut pos = size_tables_offset;
        for spec in &files {
            size_table_offsets.push(pos);
            pos += 12 + spec.extras.len() as u64 * 12;
        }
        let spec_offset = pos;
        let container_name_offset = spec_offset + 4;
        let mut pos = container_name_offset + self.container_name.len() as u64 + 1;
        let mut name_offsets = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let name = match record {
                Record::File(spec) => &spec.name,
                Record::Dir(name) => name,
            };
            name_offsets.push(pos);
            pos += name.len() as u64 + 1;
        }
        let names_table_offset = pos;

        let mut index = vec![0u8; HEADER_SIZE as usize];
        index[68..72].copy_from_slice(&(entry_table_offset as u32).to_le_bytes());
        index[72..76].copy_from_slice(&(files.len() as i32).to_le_bytes());
        index[92..96].copy_from_slice(&(names_table_offset as u32).to_le_bytes());
        index[96..100].copy_from_slice(&(self.records.len() as i32).to_le_bytes());

        // Entry table.
        for (i, spec) in files.iter().enumerate() {
            let block_offset = (blocks_offset + i as u64 * 40) as i32;
            index.extend_from_slice(&block_offset.to_le_bytes());
            index.extend_from_slice(&0i32.to_le_bytes());
            index.extend_from_slice(&spec.abs_offset.to_le_bytes());
            index.extend_from_slice(&spec.abs_size.to_le_bytes());
        }

        // Block descriptors: spec pointer, payload offset, container id,
        // size table offset, extra count.
        for (i, spec) in files.iter().enumerate() {
            index.extend_from_slice(&spec_offset.to_le_bytes());
            index.extend_from_slice(&[0u8; 8]);
            index.extend_from_slice(&payload_offsets[i].to_le_bytes());
            index.extend_from_slice(&(i as i32).to_le_bytes());
            index.extend_from_slice(&size_table_offsets[i].to_le_bytes());
            index.extend_from_slice(&(spec.extras.len() as i32).to_le_bytes());
        }

        // Size tables.
        for spec in &files {
            index.extend_from_slice(&spec.base.1.to_le_bytes());
            index.extend_from_slice(&(spec.base.0.len() as i32).to_le_bytes());
            let mut start = spec.base.0.len() as i32;
            for (comp, unc) in &spec.extras {
                let end = start + comp.len() as i32;
                index.extend_from_slice(&(*unc as i32).to_le_bytes());
                index.extend_from_slice(&start.to_le_bytes());
                index.extend_from_slice(&end.to_le_bytes());
                start = end;
            }
        }

        // Archive spec and string heap.
        index.extend_from_slice(&(container_name_offset as u32).to_le_bytes());
        index.extend_from_slice(self.container_name.as_bytes());
        index.push(0);
        for record in &self.records {
            let name = match record {
                Record::File(spec) => &spec.name,
                Record::Dir(name) => name,
            };
            index.extend_from_slice(name.as_bytes());
            index.push(0);
        }

        // Name table.
        let mut file_number = 0i32;
        for (i, record) in self.records.iter().enumerate() {
            index.extend_from_slice(&name_offsets[i].to_le_bytes());
            match record {
                Record::File(_) => {
                    index.extend_from_slice(&file_number.to_le_bytes());
                    index.extend_from_slice(&0i32.to_le_bytes());
                    file_number += 1;
                }
                Record::Dir(_) => {
                    index.extend_from_slice(&0i32.to_le_bytes());
                    index.extend_from_slice(&1i32.to_le_bytes());
                }
            }
        }

        (index, container)
    }

    /// Write the pair into `dir`, returning (index path, container path).
    pub fn write_to(&self, dir: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
        let (index, container) = self.build();

        let index_path = dir.join("archive.b2index");
        std::fs::write(&index_path, index)?;

        let container_file = if self.container_name.ends_with(".b2container") {
            self.container_name.clone()
        } else {
            format!("{}.b2container", self.container_name)
        };
        let container_path = dir.join(container_file);
        std::fs::write(&container_path, container)?;

        Ok((index_path, container_path))
    }
}

/// Build a synthetic asset header whose summary carries `folder_name`
/// and whose name table holds `names`, matching what the header
/// recovery strategy parses: tag, legacy version -4, version pair
/// (502, 67) with an empty custom-version block, total header size,
/// folder name, package flags, name count/offset, localization and
/// gatherable-text skips, export and import pairs.
pub fn asset_header(folder_name: &str, names: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0x9E2A_83C1u32.to_le_bytes()); // tag
    buf.extend_from_slice(&(-4i32).to_le_bytes()); // legacy version, no engine int
    buf.extend_from_slice(&502i32.to_le_bytes());
    buf.extend_from_slice(&67i32.to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes()); // custom versions
    buf.extend_from_slice(&0i32.to_le_bytes()); // total header size (unused)
    push_string(&mut buf, folder_name);
    buf.extend_from_slice(&0u32.to_le_bytes()); // package flags

    let pair_pos = buf.len();
    buf.extend_from_slice(&(names.len() as i32).to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes()); // name offset patched below

    push_string(&mut buf, ""); // localization id
    buf.extend_from_slice(&[0u8; 8]); // gatherable text count/offset
    buf.extend_from_slice(&[0u8; 4]); // extra skip for the (502, 67) layout
    buf.extend_from_slice(&[0u8; 16]); // export and import pairs

    let names_offset = buf.len() as i32;
    buf[pair_pos + 4..pair_pos + 8].copy_from_slice(&names_offset.to_le_bytes());
    for name in names {
        push_string(&mut buf, name);
        buf.extend_from_slice(&[0u8; 4]); // per-name auxiliary data
    }
    buf
}

/// Write a positive length-prefixed UTF-8 string with trailing NUL.
fn push_string(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() {
        buf.extend_from_slice(&0i32.to_le_bytes());
        return;
    }
    buf.extend_from_slice(&((s.len() + 1) as i32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}
