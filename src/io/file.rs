/*
 * File Syscall Layer
 *
 * The open/close/read/write/lseek/dup2/chdir/getcwd operations, acting on
 * the calling process's descriptor table. Argument validation (pointers,
 * descriptors, flags) happens here; the transfer mechanics live on the
 * handle, and storage behind the VFS traits.
 */

use alloc::sync::Arc;

use crate::config::PATH_MAX;
use crate::errno::Errno;
use crate::io::fd::FileHandle;
use crate::io::usercopy;
use crate::process;
use crate::vfs::{self, AccessMode, O_KNOWN_FLAGS};

fn current_process() -> Result<Arc<process::Process>, Errno> {
    // Syscalls only arrive from a running process; missing current means
    // the trap glue is miswired.
    process::current().ok_or(Errno::ESRCH)
}

/// Open the file at the user path, returning the new descriptor (>= 3)
pub fn open(path: *const u8, flags: u32, mode: u32) -> Result<i32, Errno> {
    if path.is_null() {
        return Err(Errno::EFAULT);
    }
    if flags & !O_KNOWN_FLAGS != 0 {
        return Err(Errno::EINVAL);
    }
    let access = AccessMode::from_flags(flags)?;

    let path = usercopy::copy_in_str(path, PATH_MAX)?;
    if path.is_empty() {
        return Err(Errno::EINVAL);
    }

    let proc = current_process()?;
    let vnode = vfs::root()?.open(&path, flags, mode)?;
    let handle = FileHandle::new(path, vnode, access);

    let fd = proc.files().lock().install(handle)?;
    log::debug!("pid {} open fd {}", proc.pid().0, fd);
    Ok(fd)
}

/// Close a descriptor. The handle, and with it the vnode reference, is
/// released when the last slot pointing at it is gone.
pub fn close(fd: i32) -> Result<(), Errno> {
    let proc = current_process()?;
    let handle = proc.files().lock().remove(fd)?;
    log::debug!("pid {} close fd {} ({})", proc.pid().0, fd, handle.name());
    Ok(())
}

/// Read up to `len` bytes into the user buffer at the handle's cursor
pub fn read(fd: i32, buf: *mut u8, len: usize) -> Result<usize, Errno> {
    let proc = current_process()?;
    let handle = proc.files().lock().get(fd)?;
    let buf = usercopy::user_slice_mut(buf, len)?;
    handle.read(buf)
}

/// Write `len` bytes from the user buffer at the handle's cursor
pub fn write(fd: i32, buf: *const u8, len: usize) -> Result<usize, Errno> {
    let proc = current_process()?;
    let handle = proc.files().lock().get(fd)?;
    let buf = usercopy::user_slice(buf, len)?;
    handle.write(buf)
}

/// Reposition the handle's cursor. `whence` arrives as a user pointer to a
/// 32-bit selector, per the syscall ABI.
pub fn lseek(fd: i32, pos: i64, whence: *const i32) -> Result<i64, Errno> {
    let proc = current_process()?;
    let handle = proc.files().lock().get(fd)?;
    let whence = usercopy::copy_in(whence)?;
    handle.seek(pos, whence)
}

/// Make `newfd` refer to the same handle as `oldfd`.
///
/// An occupied `newfd` is closed first. `dup2(fd, fd)` is a no-op that
/// returns `fd`, per POSIX.
pub fn dup2(oldfd: i32, newfd: i32) -> Result<i32, Errno> {
    let proc = current_process()?;
    let mut files = proc.files().lock();
    let handle = files.get(oldfd)?;
    if oldfd == newfd {
        return Ok(newfd);
    }
    // Replacing the slot drops the previous occupant, which is the close.
    files.set(newfd, handle)?;
    Ok(newfd)
}

/// Change the current directory
pub fn chdir(path: *const u8) -> Result<(), Errno> {
    if path.is_null() {
        return Err(Errno::EFAULT);
    }
    let path = usercopy::copy_in_str(path, PATH_MAX)?;
    if path.is_empty() {
        return Err(Errno::EINVAL);
    }
    vfs::root()?.chdir(&path)
}

/// Write the current directory into the user buffer, returning the bytes
/// written
pub fn getcwd(buf: *mut u8, len: usize) -> Result<usize, Errno> {
    let buf = usercopy::user_slice_mut(buf, len)?;
    vfs::root()?.getcwd(buf)
}
