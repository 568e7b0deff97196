/*
 * File Syscall Tests
 *
 * The literal end-to-end descriptor scenarios, run against the RAM root
 * filesystem through the same entry points the dispatcher uses. Every test
 * runs as its own process (ProcGuard) with the console on descriptors 0-2,
 * and uses distinct absolute paths so tests stay independent.
 */

use alloc::format;
use alloc::sync::Arc;

use super::ProcGuard;
use crate::config::OPEN_MAX;
use crate::errno::Errno;
use crate::io::file;
use crate::vfs::{O_CREAT, O_RDONLY, O_RDWR, O_WRONLY, SEEK_CUR, SEEK_END, SEEK_SET};

fn open(path: &[u8], flags: u32) -> Result<i32, Errno> {
    file::open(path.as_ptr(), flags, 0o644)
}

fn write(fd: i32, data: &[u8]) -> Result<usize, Errno> {
    file::write(fd, data.as_ptr(), data.len())
}

fn read(fd: i32, buf: &mut [u8]) -> Result<usize, Errno> {
    file::read(fd, buf.as_mut_ptr(), buf.len())
}

fn lseek(fd: i32, pos: i64, whence: i32) -> Result<i64, Errno> {
    file::lseek(fd, pos, &whence)
}

#[test]
fn open_write_seek_read_roundtrip() {
    let _proc = ProcGuard::new("roundtrip");

    let fd = open(b"/roundtrip\0", O_RDWR | O_CREAT).unwrap();
    assert_eq!(fd, 3);
    assert_eq!(write(fd, b"hello").unwrap(), 5);
    assert_eq!(lseek(fd, 0, SEEK_SET).unwrap(), 0);

    let mut buf = [0u8; 5];
    assert_eq!(read(fd, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"hello");

    file::close(fd).unwrap();
    // The slot is free again and the descriptor is dead.
    assert_eq!(read(fd, &mut buf).unwrap_err(), Errno::EBADF);
}

#[test]
fn arbitrary_bytes_survive_the_cursor_dance() {
    let _proc = ProcGuard::new("bytes");
    let payload: Vec<u8> = (0u16..700).map(|i| (i % 251) as u8).collect();

    let fd = open(b"/bytes\0", O_RDWR | O_CREAT).unwrap();
    assert_eq!(write(fd, &payload).unwrap(), payload.len());
    assert_eq!(lseek(fd, 0, SEEK_SET).unwrap(), 0);

    let mut back = vec![0u8; payload.len()];
    assert_eq!(read(fd, &mut back).unwrap(), payload.len());
    assert_eq!(back, payload);
    file::close(fd).unwrap();
}

#[test]
fn write_on_read_only_descriptor_is_ebadf() {
    let _proc = ProcGuard::new("ro-writer");
    let fd = open(b"/ro-writer\0", O_RDONLY | O_CREAT).unwrap();
    assert_eq!(write(fd, b"x").unwrap_err(), Errno::EBADF);
    file::close(fd).unwrap();
}

#[test]
fn read_on_write_only_descriptor_is_ebadf() {
    let _proc = ProcGuard::new("wo-reader");
    let fd = open(b"/wo-reader\0", O_WRONLY | O_CREAT).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(read(fd, &mut buf).unwrap_err(), Errno::EBADF);
    file::close(fd).unwrap();
}

#[test]
fn seek_on_stdin_is_espipe() {
    let _proc = ProcGuard::new("seek-stdin");
    assert_eq!(lseek(0, 0, SEEK_SET).unwrap_err(), Errno::ESPIPE);
}

#[test]
fn seek_validates_whence_and_result() {
    let _proc = ProcGuard::new("seeker");
    let fd = open(b"/seeker\0", O_RDWR | O_CREAT).unwrap();
    write(fd, b"abcdef").unwrap();

    assert_eq!(lseek(fd, 0, 42).unwrap_err(), Errno::EINVAL);
    // A negative target leaves the cursor where it was.
    assert_eq!(lseek(fd, -100, SEEK_CUR).unwrap_err(), Errno::EINVAL);
    assert_eq!(lseek(fd, 0, SEEK_CUR).unwrap(), 6);

    assert_eq!(lseek(fd, 0, SEEK_END).unwrap(), 6);
    assert_eq!(lseek(fd, -2, SEEK_END).unwrap(), 4);
    let mut buf = [0u8; 2];
    assert_eq!(read(fd, &mut buf).unwrap(), 2);
    assert_eq!(&buf, b"ef");
    file::close(fd).unwrap();
}

#[test]
fn open_argument_validation() {
    let _proc = ProcGuard::new("opener");
    assert_eq!(
        file::open(core::ptr::null(), O_RDONLY, 0).unwrap_err(),
        Errno::EFAULT
    );
    assert_eq!(open(b"\0", O_RDONLY).unwrap_err(), Errno::EINVAL);
    // Access mode 3 is no mode at all.
    assert_eq!(open(b"/x\0", 3).unwrap_err(), Errno::EINVAL);
    // Bits outside the known flag set.
    assert_eq!(open(b"/x\0", O_RDONLY | 0x80).unwrap_err(), Errno::EINVAL);
    assert_eq!(open(b"/missing\0", O_RDONLY).unwrap_err(), Errno::ENOENT);
}

#[test]
fn descriptors_fill_lowest_first() {
    let _proc = ProcGuard::new("slots");
    let a = open(b"/slots-a\0", O_RDWR | O_CREAT).unwrap();
    let b = open(b"/slots-b\0", O_RDWR | O_CREAT).unwrap();
    assert_eq!((a, b), (3, 4));

    file::close(a).unwrap();
    let c = open(b"/slots-c\0", O_RDWR | O_CREAT).unwrap();
    assert_eq!(c, 3);
}

#[test]
fn table_exhaustion_is_enfile() {
    let _proc = ProcGuard::new("hog");
    for i in 3..OPEN_MAX {
        let path = format!("/hog-{}\0", i);
        open(path.as_bytes(), O_RDWR | O_CREAT).unwrap();
    }
    assert_eq!(
        open(b"/hog-overflow\0", O_RDWR | O_CREAT).unwrap_err(),
        Errno::ENFILE
    );
}

#[test]
fn operations_on_bad_descriptors() {
    let _proc = ProcGuard::new("badfd");
    let mut buf = [0u8; 4];
    for fd in [-1, 99, OPEN_MAX as i32] {
        assert_eq!(read(fd, &mut buf).unwrap_err(), Errno::EBADF);
        assert_eq!(write(fd, b"x").unwrap_err(), Errno::EBADF);
        assert_eq!(lseek(fd, 0, SEEK_SET).unwrap_err(), Errno::EBADF);
        assert_eq!(file::close(fd).unwrap_err(), Errno::EBADF);
    }
    // Closing twice: the second close finds the slot empty.
    let fd = open(b"/badfd\0", O_RDWR | O_CREAT).unwrap();
    file::close(fd).unwrap();
    assert_eq!(file::close(fd).unwrap_err(), Errno::EBADF);
}

#[test]
fn null_buffers_are_efault() {
    let _proc = ProcGuard::new("nullbuf");
    let fd = open(b"/nullbuf\0", O_RDWR | O_CREAT).unwrap();
    assert_eq!(
        file::read(fd, core::ptr::null_mut(), 4).unwrap_err(),
        Errno::EFAULT
    );
    assert_eq!(
        file::write(fd, core::ptr::null(), 4).unwrap_err(),
        Errno::EFAULT
    );
    file::close(fd).unwrap();
}

#[test]
fn dup2_onto_itself_succeeds() {
    let _proc = ProcGuard::new("dup-self");
    let fd = open(b"/dup-self\0", O_RDWR | O_CREAT).unwrap();
    write(fd, b"keep").unwrap();
    assert_eq!(file::dup2(fd, fd).unwrap(), fd);
    // Still the same live handle, cursor untouched.
    assert_eq!(lseek(fd, 0, SEEK_CUR).unwrap(), 4);
    file::close(fd).unwrap();
}

#[test]
fn dup2_aliases_share_one_cursor() {
    let guard = ProcGuard::new("dup-alias");
    let fd = open(b"/dup-alias\0", O_RDWR | O_CREAT).unwrap();
    write(fd, b"abcd").unwrap();

    assert_eq!(file::dup2(fd, 10).unwrap(), 10);
    assert_eq!(lseek(10, 0, SEEK_CUR).unwrap(), 4);

    let a = guard.proc().files().lock().get(fd).unwrap();
    let b = guard.proc().files().lock().get(10).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    // Rewind through one descriptor, read through the other.
    assert_eq!(lseek(10, 0, SEEK_SET).unwrap(), 0);
    let mut buf = [0u8; 4];
    assert_eq!(read(fd, &mut buf).unwrap(), 4);
    assert_eq!(&buf, b"abcd");
}

#[test]
fn dup2_closes_the_previous_occupant() {
    let guard = ProcGuard::new("dup-close");
    let a = open(b"/dup-close-a\0", O_RDWR | O_CREAT).unwrap();
    let b = open(b"/dup-close-b\0", O_RDWR | O_CREAT).unwrap();
    write(a, b"from-a").unwrap();

    let old = guard.proc().files().lock().get(b).unwrap();
    assert_eq!(Arc::strong_count(&old), 2); // our probe + the slot

    assert_eq!(file::dup2(a, b).unwrap(), b);
    assert_eq!(Arc::strong_count(&old), 1); // slot released

    // b now reads a's file.
    assert_eq!(lseek(b, 0, SEEK_SET).unwrap(), 0);
    let mut buf = [0u8; 6];
    assert_eq!(read(b, &mut buf).unwrap(), 6);
    assert_eq!(&buf, b"from-a");
}

#[test]
fn dup2_rejects_bad_descriptors() {
    let _proc = ProcGuard::new("dup-bad");
    let fd = open(b"/dup-bad\0", O_RDWR | O_CREAT).unwrap();
    assert_eq!(file::dup2(99, 5).unwrap_err(), Errno::EBADF);
    assert_eq!(file::dup2(-1, 5).unwrap_err(), Errno::EBADF);
    assert_eq!(file::dup2(fd, OPEN_MAX as i32).unwrap_err(), Errno::EBADF);
    assert_eq!(file::dup2(fd, -2).unwrap_err(), Errno::EBADF);
}

#[test]
fn close_restores_the_node_reference() {
    let guard = ProcGuard::new("release");
    let fd = open(b"/release\0", O_RDWR | O_CREAT).unwrap();

    let handle = guard.proc().files().lock().get(fd).unwrap();
    let node = handle.vnode().clone();
    let before = Arc::strong_count(&node);

    file::close(fd).unwrap();
    drop(handle);
    // Only our probe and the filesystem's own entry remain.
    assert_eq!(Arc::strong_count(&node), before - 1);
}

#[test]
fn chdir_and_getcwd() {
    let _proc = ProcGuard::new("cwd");
    assert_eq!(
        file::chdir(core::ptr::null()).unwrap_err(),
        Errno::EFAULT
    );
    assert_eq!(file::chdir(b"\0".as_ptr()).unwrap_err(), Errno::EINVAL);

    file::chdir(b"/lair\0".as_ptr()).unwrap();
    let mut buf = [0u8; 32];
    let n = file::getcwd(buf.as_mut_ptr(), buf.len()).unwrap();
    assert_eq!(&buf[..n], b"/lair");

    // Relative opens resolve under the new directory.
    let fd = open(b"nest\0", O_RDWR | O_CREAT).unwrap();
    file::close(fd).unwrap();
    assert!(open(b"/lair/nest\0", O_RDONLY).is_ok());

    // Leave the shared namespace tidy for other tests.
    file::chdir(b"/\0".as_ptr()).unwrap();
}

#[test]
fn getcwd_rejects_bad_buffers() {
    let _proc = ProcGuard::new("cwd-bad");
    assert_eq!(
        file::getcwd(core::ptr::null_mut(), 16).unwrap_err(),
        Errno::EFAULT
    );
}
