/*
 * Kernel Test Suite
 *
 * Cross-subsystem scenario tests, run hosted. The harness here stands in
 * for boot: it initialises the global coremap over an owned RAM image,
 * mounts a RAM filesystem as root, installs a recording thread host and
 * TLB, and resolves the current process through a thread-local so every
 * test thread is its own CPU.
 *
 * Leaf-level unit tests live next to their modules; these files cover the
 * end-to-end behavior of the syscall surface, the VM fault path, and the
 * process lifecycle.
 */

mod file_tests;

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard, OnceLock};

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::PAGE_SIZE;
use crate::errno::Errno;
use crate::io::fd::FileTable;
use crate::memory::{self, tlb};
use crate::process::{self, Process, ProcessId, TrapFrame};
use crate::thread::{self, ThreadHost};
use crate::vfs::{self, console::Console, ramfs::RamFs};

/// RAM handed to the global coremap by the harness
pub const TEST_RAM_BYTES: usize = 8 * 1024 * 1024;

/// Simulated end of the kernel image inside that RAM
pub const TEST_FIRST_FREE: usize = 4 * PAGE_SIZE;

thread_local! {
    static CURRENT_PID: Cell<Option<i32>> = const { Cell::new(None) };
}

fn current_pid_hook() -> Option<ProcessId> {
    CURRENT_PID.with(|c| c.get().map(ProcessId))
}

/// Make `pid` current on this test thread
pub fn set_current(pid: Option<ProcessId>) {
    CURRENT_PID.with(|c| c.set(pid.map(|p| p.0)));
}

/// Thread host that records fork handoffs instead of launching threads
pub struct RecordingHost {
    spawns: StdMutex<Vec<(ProcessId, TrapFrame)>>,
}

impl RecordingHost {
    /// Claim the recorded trap frame for `pid`, if fork handed one off
    pub fn take_spawn_for(&self, pid: ProcessId) -> Option<TrapFrame> {
        let mut spawns = self.spawns.lock().unwrap();
        let idx = spawns.iter().position(|(p, _)| *p == pid)?;
        Some(spawns.remove(idx).1)
    }
}

impl ThreadHost for RecordingHost {
    fn spawn_user(&self, pid: ProcessId, frame: Box<TrapFrame>) -> Result<(), Errno> {
        self.spawns.lock().unwrap().push((pid, *frame));
        Ok(())
    }

    fn exit_thread(&self) -> ! {
        panic!("exit_thread called in hosted tests");
    }
}

static HOST: RecordingHost = RecordingHost { spawns: StdMutex::new(Vec::new()) };

pub fn host() -> &'static RecordingHost {
    &HOST
}

/// TLB that records loads and flushes
pub struct RecordingTlb {
    loads: StdMutex<Vec<(u64, u64)>>,
    flushes: AtomicUsize,
}

impl RecordingTlb {
    pub fn saw_load(&self, vpn: u64, pfn: u64) -> bool {
        self.loads.lock().unwrap().contains(&(vpn, pfn))
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl tlb::TlbOps for RecordingTlb {
    fn load(&self, vpn: u64, pfn: u64) {
        self.loads.lock().unwrap().push((vpn, pfn));
    }

    fn invalidate_all(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }
}

static TLB: RecordingTlb = RecordingTlb {
    loads: StdMutex::new(Vec::new()),
    flushes: AtomicUsize::new(0),
};

pub fn tlb_log() -> &'static RecordingTlb {
    &TLB
}

/// Bring the shared kernel state up exactly once for the whole test run
pub fn init_kernel() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let layout = Layout::from_size_align(TEST_RAM_BYTES, PAGE_SIZE).unwrap();
        // Lives for the rest of the test run; the coremap owns it.
        let ram = unsafe { alloc_zeroed(layout) };
        assert!(!ram.is_null());
        unsafe { memory::init(ram, TEST_RAM_BYTES, TEST_FIRST_FREE).unwrap() };
        tlb::set_handler(&TLB);
        vfs::mount_root(RamFs::new());
        thread::set_host(&HOST);
        process::set_current_pid_hook(current_pid_hook);
    });
}

/// Tests that measure global coremap usage take this to keep their deltas
/// clean.
pub fn vm_serial() -> MutexGuard<'static, ()> {
    static LOCK: StdMutex<()> = StdMutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// A process made current for the duration of a test
///
/// Created with the standard console descriptors, like a freshly spawned
/// user process. Dropping restores the previous current process and reaps
/// the entry if it is still in the table.
pub struct ProcGuard {
    proc: Arc<Process>,
    prev: Option<ProcessId>,
}

impl ProcGuard {
    pub fn new(name: &str) -> ProcGuard {
        init_kernel();
        let proc = process::table::create(name).unwrap();
        *proc.files().lock() = FileTable::with_console(Console::new());
        let prev = current_pid_hook();
        set_current(Some(proc.pid()));
        ProcGuard { proc, prev }
    }

    pub fn pid(&self) -> ProcessId {
        self.proc.pid()
    }

    pub fn proc(&self) -> &Arc<Process> {
        &self.proc
    }
}

impl Drop for ProcGuard {
    fn drop(&mut self) {
        set_current(self.prev);
        process::table::remove(self.proc.pid());
    }
}

/// Page-aligned RAM image for private allocator instances
pub struct TestRam {
    ptr: *mut u8,
    layout: Layout,
}

impl TestRam {
    pub fn new(bytes: usize) -> TestRam {
        let layout = Layout::from_size_align(bytes, PAGE_SIZE).unwrap();
        let ptr = unsafe { alloc_zeroed(layout) };
        assert!(!ptr.is_null());
        TestRam { ptr, layout }
    }

    pub fn base(&self) -> *mut u8 {
        self.ptr
    }
}

impl Drop for TestRam {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) };
    }
}
