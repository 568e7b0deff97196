/*
 * Thread System Seam
 *
 * The low-level thread primitive is owned by the embedding kernel; the
 * process layer only needs two operations from it: launch a user thread for
 * a forked child, and terminate the calling thread. The platform installs
 * its implementation at boot; the test harness installs one that records
 * the handoff.
 *
 * The trap frame travels as an owned Box: fork builds it, the thread system
 * adopts it, and the child's entry trampoline consumes it when it drops
 * into user mode. Nobody shares it.
 */

use alloc::boxed::Box;
use spin::RwLock;

use crate::errno::Errno;
use crate::process::{ProcessId, TrapFrame};

/// What the process layer needs from the thread system
pub trait ThreadHost: Send + Sync {
    /// Start the thread of a freshly forked process. The thread must make
    /// `pid` current and resume user mode from `frame`.
    fn spawn_user(&self, pid: ProcessId, frame: Box<TrapFrame>) -> Result<(), Errno>;

    /// Terminate the calling thread. Called after exit bookkeeping.
    fn exit_thread(&self) -> !;
}

static HOST: RwLock<Option<&'static dyn ThreadHost>> = RwLock::new(None);

/// Install the thread system. Called once at boot, before the first fork.
pub fn set_host(host: &'static dyn ThreadHost) {
    *HOST.write() = Some(host);
}

/// Hand a forked child to the thread system
pub fn spawn_user(pid: ProcessId, frame: Box<TrapFrame>) -> Result<(), Errno> {
    match *HOST.read() {
        Some(host) => host.spawn_user(pid, frame),
        None => {
            log::error!("thread: fork with no thread host installed");
            Err(Errno::ENOSYS)
        }
    }
}

/// Terminate the calling thread; never returns
pub fn exit_thread() -> ! {
    if let Some(host) = *HOST.read() {
        host.exit_thread();
    }
    // No thread system to hand control to; park forever.
    loop {
        core::hint::spin_loop();
    }
}
