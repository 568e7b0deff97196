/*
 * Kernel Error Codes
 *
 * POSIX errno values used across every subsystem. Syscall handlers flatten
 * these into the negative-return convention at the dispatch boundary; inside
 * the kernel everything travels as `Result<T, Errno>`.
 */

/// POSIX errno values
///
/// Subset of standard POSIX error codes for syscall compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    EPERM = 1,         // Operation not permitted
    ENOENT = 2,        // No such file or directory
    ESRCH = 3,         // No such process
    EINTR = 4,         // Interrupted system call
    EIO = 5,           // I/O error
    EBADF = 9,         // Bad file descriptor
    ECHILD = 10,       // No child processes
    EAGAIN = 11,       // Try again
    ENOMEM = 12,       // Out of memory
    EACCES = 13,       // Permission denied
    EFAULT = 14,       // Bad address
    EEXIST = 17,       // File exists
    ENODEV = 19,       // No such device
    EINVAL = 22,       // Invalid argument
    ENFILE = 23,       // File table overflow
    EMFILE = 24,       // Too many open files
    ENOTTY = 25,       // Not a typewriter
    ENOSPC = 28,       // No space left on device
    ESPIPE = 29,       // Illegal seek
    ENAMETOOLONG = 36, // File name too long
    ENOSYS = 38,       // Function not implemented
}

impl Errno {
    /// Raw errno value
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Negative value for the syscall return convention
    pub fn as_isize(self) -> isize {
        -(self.code() as isize)
    }
}

impl core::fmt::Display for Errno {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}
