/*
 * RAM Filesystem
 *
 * Flat, memory-backed filesystem used by early boot and the test suite.
 * Files live in a single namespace keyed by absolute path; directories
 * exist only as path prefixes, which is enough for chdir/getcwd and
 * relative opens.
 */

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::errno::Errno;
use crate::vfs::{
    FileSystem, O_CREAT, O_EXCL, O_TRUNC, S_IFREG, Stat, Vnode,
};

/// A regular file held in memory
#[derive(Debug)]
struct RamFile {
    data: Mutex<Vec<u8>>,
}

impl RamFile {
    fn new() -> Arc<RamFile> {
        Arc::new(RamFile { data: Mutex::new(Vec::new()) })
    }
}

impl Vnode for RamFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, Errno> {
        let data = self.data.lock();
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize, Errno> {
        let mut data = self.data.lock();
        let offset = offset as usize;
        // Writing past the end zero-fills the gap, like a sparse file
        // without the sparseness.
        if offset > data.len() {
            data.resize(offset, 0);
        }
        let end = offset + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn stat(&self) -> Stat {
        let size = self.data.lock().len() as u64;
        Stat {
            st_mode: S_IFREG | 0o644,
            st_size: size,
            st_blksize: 4096,
            st_blocks: size.div_ceil(512),
        }
    }
}

struct RamFsInner {
    files: BTreeMap<String, Arc<RamFile>>,
    cwd: String,
}

/// The filesystem: a path table plus the current directory
pub struct RamFs {
    inner: Mutex<RamFsInner>,
}

impl RamFs {
    pub fn new() -> Arc<RamFs> {
        Arc::new(RamFs {
            inner: Mutex::new(RamFsInner {
                files: BTreeMap::new(),
                cwd: String::from("/"),
            }),
        })
    }

    /// Absolute form of `path`, joined against the current directory
    fn resolve(inner: &RamFsInner, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else if inner.cwd.ends_with('/') {
            alloc::format!("{}{}", inner.cwd, path)
        } else {
            alloc::format!("{}/{}", inner.cwd, path)
        }
    }

    /// Number of files, for diagnostics
    pub fn file_count(&self) -> usize {
        self.inner.lock().files.len()
    }
}

impl FileSystem for RamFs {
    fn open(&self, path: &str, flags: u32, _mode: u32) -> Result<Arc<dyn Vnode>, Errno> {
        let mut inner = self.inner.lock();
        let abs = Self::resolve(&inner, path);

        if let Some(file) = inner.files.get(&abs) {
            if flags & O_CREAT != 0 && flags & O_EXCL != 0 {
                return Err(Errno::EEXIST);
            }
            if flags & O_TRUNC != 0 {
                file.data.lock().clear();
            }
            return Ok(file.clone());
        }

        if flags & O_CREAT == 0 {
            return Err(Errno::ENOENT);
        }

        let file = RamFile::new();
        inner.files.insert(abs, file.clone());
        Ok(file)
    }

    fn chdir(&self, path: &str) -> Result<(), Errno> {
        let mut inner = self.inner.lock();
        let abs = Self::resolve(&inner, path);
        // Directories are implicit here, so any path names one.
        inner.cwd = abs;
        Ok(())
    }

    fn getcwd(&self, buf: &mut [u8]) -> Result<usize, Errno> {
        let inner = self.inner.lock();
        let bytes = inner.cwd.as_bytes();
        let n = buf.len().min(bytes.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }
}
