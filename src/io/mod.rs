/*
 * Kernel I/O Layer
 *
 * Per-process file descriptors and the file syscall surface:
 *  - fd:       handle and descriptor-table types
 *  - file:     open/close/read/write/lseek/dup2/chdir/getcwd
 *  - usercopy: user-pointer validation and copy-in/copy-out
 */

pub mod fd;
pub mod file;
pub mod usercopy;

pub use fd::{FileHandle, FileTable};
