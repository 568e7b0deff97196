/*
 * File Descriptor Table
 *
 * Per-process table mapping small integers to open file handles. A handle
 * is the sharable object: dup2 and fork alias additional slots to the same
 * handle, so its Arc count always equals the number of slots that reference
 * it, and the underlying vnode is released when the last slot lets go.
 *
 * Standard FDs:
 * - 0: stdin  (read)
 * - 1: stdout (write)
 * - 2: stderr (write)
 *
 * FDs 3+ are allocated lowest-first for opened files.
 */

use alloc::string::String;
use alloc::sync::Arc;
use spin::Mutex;

use crate::config::OPEN_MAX;
use crate::errno::Errno;
use crate::vfs::{AccessMode, SEEK_CUR, SEEK_END, SEEK_SET, Vnode};

/// A sharable open-file object
///
/// Carries the vnode reference, the access mode derived from the open
/// flags, and the cursor. The cursor lock also serialises the transfer
/// itself, so concurrent operations on one handle land in some serial
/// order.
#[derive(Debug)]
pub struct FileHandle {
    /// Path the handle was opened with; used in diagnostics
    name: String,
    vnode: Arc<dyn Vnode>,
    access: AccessMode,
    offset: Mutex<i64>,
}

impl FileHandle {
    pub fn new(name: String, vnode: Arc<dyn Vnode>, access: AccessMode) -> Arc<FileHandle> {
        Arc::new(FileHandle {
            name,
            vnode,
            access,
            offset: Mutex::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vnode(&self) -> &Arc<dyn Vnode> {
        &self.vnode
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    /// Cursor position right now; later operations may move it
    pub fn current_offset(&self) -> i64 {
        *self.offset.lock()
    }

    /// Read at the cursor, advancing it by the bytes transferred
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, Errno> {
        if !self.access.allows_read() {
            return Err(Errno::EBADF);
        }
        let mut offset = self.offset.lock();
        let n = self.vnode.read_at(buf, *offset as u64)?;
        *offset += n as i64;
        Ok(n)
    }

    /// Write at the cursor, advancing it by the bytes transferred
    pub fn write(&self, buf: &[u8]) -> Result<usize, Errno> {
        if !self.access.allows_write() {
            return Err(Errno::EBADF);
        }
        let mut offset = self.offset.lock();
        let n = self.vnode.write_at(buf, *offset as u64)?;
        *offset += n as i64;
        Ok(n)
    }

    /// Move the cursor. Rejects unknown whence values, refuses devices that
    /// cannot seek, and leaves the cursor untouched when the target would
    /// be negative.
    pub fn seek(&self, pos: i64, whence: i32) -> Result<i64, Errno> {
        if whence != SEEK_SET && whence != SEEK_CUR && whence != SEEK_END {
            return Err(Errno::EINVAL);
        }
        if !self.vnode.is_seekable() {
            return Err(Errno::ESPIPE);
        }
        let mut offset = self.offset.lock();
        let new = match whence {
            SEEK_SET => pos,
            SEEK_CUR => *offset + pos,
            _ => self.vnode.stat().st_size as i64 + pos,
        };
        if new < 0 {
            return Err(Errno::EINVAL);
        }
        *offset = new;
        Ok(new)
    }
}

/// Per-process file descriptor table
pub struct FileTable {
    slots: [Option<Arc<FileHandle>>; OPEN_MAX],
}

impl FileTable {
    /// Empty table; the caller wires up the standard descriptors
    pub fn new() -> Self {
        Self { slots: [const { None }; OPEN_MAX] }
    }

    /// Table with descriptors 0-2 attached to the given console node
    pub fn with_console(console: Arc<dyn Vnode>) -> Self {
        let mut table = Self::new();
        table.slots[0] = Some(FileHandle::new(
            String::from("con:stdin"),
            console.clone(),
            AccessMode::ReadOnly,
        ));
        table.slots[1] = Some(FileHandle::new(
            String::from("con:stdout"),
            console.clone(),
            AccessMode::WriteOnly,
        ));
        table.slots[2] = Some(FileHandle::new(
            String::from("con:stderr"),
            console,
            AccessMode::WriteOnly,
        ));
        table
    }

    fn index(fd: i32) -> Result<usize, Errno> {
        if fd < 0 || fd as usize >= OPEN_MAX {
            return Err(Errno::EBADF);
        }
        Ok(fd as usize)
    }

    /// Handle at `fd`, or EBADF
    pub fn get(&self, fd: i32) -> Result<Arc<FileHandle>, Errno> {
        self.slots[Self::index(fd)?].clone().ok_or(Errno::EBADF)
    }

    /// Place `handle` in the first free slot at or above 3
    pub fn install(&mut self, handle: Arc<FileHandle>) -> Result<i32, Errno> {
        for fd in 3..OPEN_MAX {
            if self.slots[fd].is_none() {
                self.slots[fd] = Some(handle);
                return Ok(fd as i32);
            }
        }
        Err(Errno::ENFILE)
    }

    /// Alias `fd` to `handle`, returning what the slot held before
    pub fn set(&mut self, fd: i32, handle: Arc<FileHandle>) -> Result<Option<Arc<FileHandle>>, Errno> {
        let i = Self::index(fd)?;
        Ok(self.slots[i].replace(handle))
    }

    /// Vacate `fd`, returning the handle it held. EBADF when empty.
    pub fn remove(&mut self, fd: i32) -> Result<Arc<FileHandle>, Errno> {
        self.slots[Self::index(fd)?].take().ok_or(Errno::EBADF)
    }

    /// Share every slot by reference, for fork. Handles (and with them the
    /// cursors) stay common to parent and child.
    pub fn share(&self) -> FileTable {
        FileTable { slots: self.slots.clone() }
    }

    /// Number of occupied slots
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::Stat;

    #[derive(Debug)]
    struct NullNode;

    impl Vnode for NullNode {
        fn read_at(&self, _buf: &mut [u8], _offset: u64) -> Result<usize, Errno> {
            Ok(0)
        }
        fn write_at(&self, buf: &[u8], _offset: u64) -> Result<usize, Errno> {
            Ok(buf.len())
        }
        fn stat(&self) -> Stat {
            Stat::default()
        }
    }

    fn handle() -> Arc<FileHandle> {
        FileHandle::new(String::from("null"), Arc::new(NullNode), AccessMode::ReadWrite)
    }

    #[test]
    fn install_starts_at_three() {
        let mut table = FileTable::new();
        assert_eq!(table.install(handle()).unwrap(), 3);
        assert_eq!(table.install(handle()).unwrap(), 4);
    }

    #[test]
    fn out_of_range_fds() {
        let table = FileTable::new();
        assert_eq!(table.get(-1).unwrap_err(), Errno::EBADF);
        assert_eq!(table.get(OPEN_MAX as i32).unwrap_err(), Errno::EBADF);
        assert_eq!(table.get(7).unwrap_err(), Errno::EBADF);
    }

    #[test]
    fn table_fills_to_enfile() {
        let mut table = FileTable::new();
        for _ in 3..OPEN_MAX {
            table.install(handle()).unwrap();
        }
        assert_eq!(table.install(handle()).unwrap_err(), Errno::ENFILE);
    }

    #[test]
    fn share_aliases_handles() {
        let mut table = FileTable::new();
        let fd = table.install(handle()).unwrap();
        let shared = table.share();
        let a = table.get(fd).unwrap();
        let b = shared.get(fd).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn handle_refcount_tracks_slots() {
        let mut table = FileTable::new();
        let h = handle();
        // One reference here, plus one per slot.
        table.set(5, h.clone()).unwrap();
        table.set(9, h.clone()).unwrap();
        assert_eq!(Arc::strong_count(&h), 3);
        table.remove(5).unwrap();
        assert_eq!(Arc::strong_count(&h), 2);
    }
}
