/*
 * System Call Numbers
 *
 * Syscall numbers following the System V AMD64 ABI convention used by
 * Linux and most Unix-like systems.
 *
 * Syscall Mechanism:
 * - RAX register contains syscall number
 * - Arguments in RDI, RSI, RDX, R10, R8, R9 (6 args max)
 * - Return value in RAX (signed: negative = error code)
 */

/// Read from file descriptor
///
/// Arguments: (fd: i32, buf: *mut u8, count: usize)
/// Returns: number of bytes read, or negative error code
pub const SYS_READ: usize = 0;

/// Write to file descriptor
///
/// Arguments: (fd: i32, buf: *const u8, count: usize)
/// Returns: number of bytes written, or negative error code
pub const SYS_WRITE: usize = 1;

/// Open a file
///
/// Arguments: (path: *const u8, flags: u32, mode: u32)
/// Returns: new descriptor (>= 3), or negative error code
pub const SYS_OPEN: usize = 2;

/// Close file descriptor
///
/// Arguments: (fd: i32)
/// Returns: 0 on success, or negative error code
pub const SYS_CLOSE: usize = 3;

/// Seek to position in file
///
/// Arguments: (fd: i32, offset: i64, whence: *const i32)
/// Returns: new file position, or negative error code
pub const SYS_LSEEK: usize = 8;

/// Duplicate a descriptor onto a chosen slot
///
/// Arguments: (oldfd: i32, newfd: i32)
/// Returns: newfd, or negative error code
pub const SYS_DUP2: usize = 33;

/// Pid of the calling process
pub const SYS_GETPID: usize = 39;

/// Duplicate the calling process
///
/// The trap frame of the caller is the implicit argument.
/// Returns: child pid in the parent, 0 in the child
pub const SYS_FORK: usize = 57;

/// Exit current process
///
/// Arguments: (status: i32)
/// Does not return
pub const SYS_EXIT: usize = 60;

/// Wait for a process to exit
///
/// Arguments: (pid: i32, status: *mut i32, options: i32)
/// Returns: the pid waited on, or negative error code
pub const SYS_WAITPID: usize = 61;

/// Current directory into a user buffer
///
/// Arguments: (buf: *mut u8, len: usize)
/// Returns: bytes written, or negative error code
pub const SYS_GETCWD: usize = 79;

/// Change the current directory
///
/// Arguments: (path: *const u8)
/// Returns: 0 on success, or negative error code
pub const SYS_CHDIR: usize = 80;
