/*
 * Virtual File System Contract
 *
 * The file descriptor layer talks to storage through two traits: `Vnode`
 * for an open file object and `FileSystem` for the name space (open, chdir,
 * getcwd). A real disk filesystem, the RAM filesystem in this module, and
 * the console device all sit behind the same pair.
 *
 * Node lifetime is reference counted through `Arc`: every descriptor slot
 * that references a node holds a clone, and the node is torn down when the
 * last clone drops.
 */

pub mod console;
pub mod ramfs;

use alloc::sync::Arc;
use spin::RwLock;

use crate::errno::Errno;

// Open flags (kernel ABI values)
pub const O_RDONLY: u32 = 0;
pub const O_WRONLY: u32 = 1;
pub const O_RDWR: u32 = 2;
pub const O_ACCMODE: u32 = 3; // mask selecting the access mode
pub const O_CREAT: u32 = 4;
pub const O_EXCL: u32 = 8;
pub const O_TRUNC: u32 = 16;
pub const O_APPEND: u32 = 32;
pub const O_NOCTTY: u32 = 64;

/// Every flag bit the kernel knows about
pub const O_KNOWN_FLAGS: u32 =
    O_ACCMODE | O_CREAT | O_EXCL | O_TRUNC | O_APPEND | O_NOCTTY;

/// Direction a handle was opened for, derived from the open flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    /// Decode `flags & O_ACCMODE`; 3 is no valid mode
    pub fn from_flags(flags: u32) -> Result<AccessMode, Errno> {
        match flags & O_ACCMODE {
            O_RDONLY => Ok(AccessMode::ReadOnly),
            O_WRONLY => Ok(AccessMode::WriteOnly),
            O_RDWR => Ok(AccessMode::ReadWrite),
            _ => Err(Errno::EINVAL),
        }
    }

    pub fn allows_read(self) -> bool {
        self != AccessMode::WriteOnly
    }

    pub fn allows_write(self) -> bool {
        self != AccessMode::ReadOnly
    }
}

/// Minimal stat structure
///
/// Subset of POSIX struct stat, focusing on st_mode for type checking.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Stat {
    pub st_mode: u32,    // File type and mode
    pub st_size: u64,    // File size in bytes
    pub st_blksize: u64, // Block size for I/O
    pub st_blocks: u64,  // Number of 512B blocks allocated
}

// File type constants (POSIX)
pub const S_IFMT: u32 = 0o170000; // File type mask
pub const S_IFCHR: u32 = 0o020000; // Character device
pub const S_IFREG: u32 = 0o100000; // Regular file
pub const S_IFDIR: u32 = 0o040000; // Directory

// Seek whence constants (POSIX)
pub const SEEK_SET: i32 = 0; // Seek from beginning
pub const SEEK_CUR: i32 = 1; // Seek from current position
pub const SEEK_END: i32 = 2; // Seek from end

/// Check if mode indicates a character device
#[inline]
pub fn s_ischr(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFCHR
}

/// Check if mode indicates a regular file
#[inline]
pub fn s_isreg(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFREG
}

/// An open file object
///
/// Implementations are position-less: the descriptor layer owns the cursor
/// and passes an explicit offset, so several handles can share one node
/// without trampling each other.
pub trait Vnode: Send + Sync + core::fmt::Debug {
    /// Read up to `buf.len()` bytes at `offset`; 0 means end of file
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, Errno>;

    /// Write `buf` at `offset`, returning the bytes accepted
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize, Errno>;

    /// File metadata
    fn stat(&self) -> Stat;

    /// Whether lseek makes sense on this node. Character devices say no.
    fn is_seekable(&self) -> bool {
        true
    }
}

/// The name-space side of the VFS
pub trait FileSystem: Send + Sync {
    /// Open (and with O_CREAT possibly create) the node at `path`
    fn open(&self, path: &str, flags: u32, mode: u32) -> Result<Arc<dyn Vnode>, Errno>;

    /// Change the current directory
    fn chdir(&self, path: &str) -> Result<(), Errno>;

    /// Write the current directory into `buf`, returning the bytes written
    fn getcwd(&self, buf: &mut [u8]) -> Result<usize, Errno>;
}

/// The mounted root filesystem
static ROOT: RwLock<Option<Arc<dyn FileSystem>>> = RwLock::new(None);

/// Mount the root filesystem. Boot calls this once; later mounts replace
/// the root (used by the test harness).
pub fn mount_root(fs: Arc<dyn FileSystem>) {
    *ROOT.write() = Some(fs);
    log::info!("vfs: root filesystem mounted");
}

/// The mounted root, or ENODEV before any mount
pub fn root() -> Result<Arc<dyn FileSystem>, Errno> {
    ROOT.read().as_ref().cloned().ok_or(Errno::ENODEV)
}
