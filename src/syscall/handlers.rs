/*
 * System Call Handlers
 *
 * The sys_* functions the dispatcher invokes. Each one validates nothing
 * itself: the subsystem operations do, returning Result, and the handlers
 * flatten that into the ABI convention (value in RAX, negative errno on
 * failure).
 */

use crate::errno::Errno;
use crate::io::file;
use crate::process;
use crate::process::TrapFrame;
use crate::thread;

pub fn sys_open(path: *const u8, flags: u32, mode: u32) -> isize {
    file::open(path, flags, mode)
        .map(|fd| fd as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_close(fd: i32) -> isize {
    file::close(fd).map(|_| 0).unwrap_or_else(Errno::as_isize)
}

pub fn sys_read(fd: i32, buf: *mut u8, count: usize) -> isize {
    file::read(fd, buf, count)
        .map(|n| n as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_write(fd: i32, buf: *const u8, count: usize) -> isize {
    file::write(fd, buf, count)
        .map(|n| n as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_lseek(fd: i32, offset: i64, whence: *const i32) -> isize {
    file::lseek(fd, offset, whence)
        .map(|pos| pos as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_dup2(oldfd: i32, newfd: i32) -> isize {
    file::dup2(oldfd, newfd)
        .map(|fd| fd as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_chdir(path: *const u8) -> isize {
    file::chdir(path).map(|_| 0).unwrap_or_else(Errno::as_isize)
}

pub fn sys_getcwd(buf: *mut u8, len: usize) -> isize {
    file::getcwd(buf, len)
        .map(|n| n as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_getpid() -> isize {
    process::getpid()
        .map(|pid| pid as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_fork(frame: &TrapFrame) -> isize {
    process::fork(frame)
        .map(|pid| pid.0 as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_waitpid(pid: i32, status: *mut i32, options: i32) -> isize {
    process::waitpid(pid, status, options)
        .map(|pid| pid as isize)
        .unwrap_or_else(Errno::as_isize)
}

pub fn sys_exit(status: i32) -> ! {
    process::exit_current(status);
    thread::exit_thread()
}
