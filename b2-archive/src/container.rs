//! Cached random-access reads over `.b2container` payload files
//!
//! Containers are opened lazily on first use and stay open for the
//! whole run; the driver owns the cache and must release it on every
//! exit path. The cache is strictly additive, which bounds open
//! handles by the number of distinct containers an index references.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ArchiveError, Result};

/// Read buffer attached to each container handle.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

struct Handle {
    reader: BufReader<File>,
    len: u64,
}

/// Keyed cache of open container files.
#[derive(Default)]
pub struct ContainerCache {
    handles: HashMap<PathBuf, Handle>,
}

impl ContainerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read exactly `len` bytes at `offset` from the container at `path`,
    /// opening and caching the handle on first use.
    pub fn read(&mut self, path: &Path, offset: u64, len: u64) -> Result<Vec<u8>> {
        let handle = match self.handles.entry(path.to_path_buf()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let file = File::open(path).map_err(|err| {
                    if err.kind() == ErrorKind::NotFound {
                        ArchiveError::MissingContainer(path.to_path_buf())
                    } else {
                        ArchiveError::Io(err)
                    }
                })?;
                let file_len = file.metadata()?.len();
                debug!("opened container {} ({file_len} bytes)", path.display());
                e.insert(Handle {
                    reader: BufReader::with_capacity(READ_BUFFER_SIZE, file),
                    len: file_len,
                })
            }
        };

        let end = offset.checked_add(len);
        if end.is_none_or(|end| end > handle.len) {
            return Err(ArchiveError::ContainerIo {
                path: path.to_path_buf(),
                offset,
                len,
                size: handle.len,
            });
        }

        handle.reader.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        handle.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Number of containers currently open.
    pub fn open_count(&self) -> usize {
        self.handles.len()
    }

    /// Drop every cached handle.
    pub fn close_all(&mut self) {
        if !self.handles.is_empty() {
            debug!("closing {} container handle(s)", self.handles.len());
        }
        self.handles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn container_with(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("payload.b2container");
        let mut f = File::create(&path).expect("create container");
        f.write_all(bytes).expect("write container");
        (dir, path)
    }

    #[test]
    fn test_read_and_reuse_handle() {
        let (_dir, path) = container_with(b"0123456789");
        let mut cache = ContainerCache::new();

        assert_eq!(cache.read(&path, 2, 4).unwrap(), b"2345");
        assert_eq!(cache.open_count(), 1);
        assert_eq!(cache.read(&path, 0, 1).unwrap(), b"0");
        assert_eq!(cache.open_count(), 1);

        cache.close_all();
        assert_eq!(cache.open_count(), 0);
    }

    #[test]
    fn test_read_past_end() {
        let (_dir, path) = container_with(b"0123456789");
        let mut cache = ContainerCache::new();

        let err = cache.read(&path, 8, 4).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::ContainerIo {
                offset: 8,
                len: 4,
                size: 10,
                ..
            }
        ));

        // Offset overflow must not wrap into a successful read.
        let err = cache.read(&path, u64::MAX, 2).unwrap_err();
        assert!(matches!(err, ArchiveError::ContainerIo { .. }));
    }

    #[test]
    fn test_missing_container() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.b2container");
        let mut cache = ContainerCache::new();

        let err = cache.read(&path, 0, 1).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingContainer(p) if p == path));
        assert_eq!(cache.open_count(), 0);
    }
}
